use crate::compression::vbyte::{VByteEncoder, VByteReader};
use crate::core::error::{Error, ErrorKind, Result};

/// Delta + vbyte encoding for ascending integer lists (token positions, column indices).
///
/// Layout: count, first value, then the gaps between neighbours. Everything is vbyte.
pub struct DeltaEncoder;

impl DeltaEncoder {
    pub fn encode_u32_list(output: &mut Vec<u8>, nums: &[u32]) -> Result<()> {
        VByteEncoder::encode_u64(output, nums.len() as u64);

        let mut prev = 0u32;
        for (i, &num) in nums.iter().enumerate() {
            if i > 0 && num <= prev {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("Delta list not strictly ascending at {}: {} after {}", i, num, prev),
                ));
            }
            VByteEncoder::encode_u32(output, num - if i == 0 { 0 } else { prev });
            prev = num;
        }

        Ok(())
    }

    pub fn decode_u32_list(reader: &mut VByteReader<'_>) -> Result<Vec<u32>> {
        let count = reader.read_len()?;
        let mut nums = Vec::with_capacity(count);
        let mut prev = 0u32;

        for i in 0..count {
            let delta = reader.read_u32()?;
            let value = if i == 0 {
                delta
            } else {
                prev.checked_add(delta)
                    .ok_or_else(|| Error::new(ErrorKind::Parse, "Delta list overflow".to_string()))?
            };
            nums.push(value);
            prev = value;
        }

        Ok(nums)
    }
}
