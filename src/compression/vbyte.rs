use crate::core::error::{Error, ErrorKind, Result};

/// Variable byte encoding for integers (7 bits per byte, high bit = continuation)
pub struct VByteEncoder;

impl VByteEncoder {
    /// Values < 128 use 1 byte, < 16384 use 2 bytes, etc.
    pub fn encode_u64(output: &mut Vec<u8>, mut value: u64) {
        while value >= 128 {
            output.push((value & 127) as u8 | 128);
            value >>= 7;
        }
        output.push(value as u8);
    }

    pub fn encode_u32(output: &mut Vec<u8>, value: u32) {
        Self::encode_u64(output, value as u64)
    }

    /// Returns (value, bytes_consumed)
    pub fn decode_u64(input: &[u8]) -> Result<(u64, usize)> {
        let mut value = 0u64;
        let mut shift = 0;

        for (i, &byte) in input.iter().enumerate() {
            value |= ((byte & 127) as u64) << shift;

            if byte & 128 == 0 {
                return Ok((value, i + 1));
            }

            shift += 7;
            if shift > 63 {  // Max 10 bytes for u64
                return Err(Error::new(ErrorKind::Parse, "VByte overflow".to_string()));
            }
        }

        Err(Error::new(ErrorKind::Parse, "Incomplete VByte".to_string()))
    }

    pub fn decode_u32(input: &[u8]) -> Result<(u32, usize)> {
        let (value, consumed) = Self::decode_u64(input)?;
        let value = u32::try_from(value)
            .map_err(|_| Error::new(ErrorKind::Parse, format!("VByte value {} exceeds u32", value)))?;
        Ok((value, consumed))
    }
}

/// Cursor over an encoded buffer; every read advances past what it consumed
pub struct VByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> VByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        VByteReader { data, pos: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let (value, consumed) = VByteEncoder::decode_u64(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let (value, consumed) = VByteEncoder::decode_u32(&self.data[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    /// Count prefix that sizes a following allocation; bounded by what is left in the buffer
    pub fn read_len(&mut self) -> Result<usize> {
        let len = self.read_u64()? as usize;
        if len > self.data.len() - self.pos {
            return Err(Error::new(ErrorKind::Parse, format!("Length {} runs past end of buffer", len)));
        }
        Ok(len)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let bytes = self.data.get(self.pos..self.pos + 4)
            .ok_or_else(|| Error::new(ErrorKind::Parse, "Truncated f32".to_string()))?;
        self.pos += 4;
        Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values_take_one_byte() {
        let mut out = Vec::new();
        VByteEncoder::encode_u32(&mut out, 127);
        assert_eq!(out, vec![127]);

        out.clear();
        VByteEncoder::encode_u32(&mut out, 300);
        assert_eq!(out.len(), 2);
        assert_eq!(VByteEncoder::decode_u32(&out).unwrap(), (300, 2));
    }

    #[test]
    fn test_incomplete_input_is_rejected() {
        let err = VByteEncoder::decode_u64(&[0x80, 0x80]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
    }

    #[test]
    fn test_u32_overflow_is_rejected() {
        let mut out = Vec::new();
        VByteEncoder::encode_u64(&mut out, u64::from(u32::MAX) + 1);
        assert!(VByteEncoder::decode_u32(&out).is_err());
    }

    #[test]
    fn test_reader_walks_mixed_buffer() {
        let mut out = Vec::new();
        VByteEncoder::encode_u64(&mut out, 1 << 40);
        out.extend_from_slice(&1.5f32.to_le_bytes());
        VByteEncoder::encode_u32(&mut out, 7);

        let mut reader = VByteReader::new(&out);
        assert_eq!(reader.read_u64().unwrap(), 1 << 40);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.read_u32().unwrap(), 7);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_len_bounds_check() {
        let mut out = Vec::new();
        VByteEncoder::encode_u64(&mut out, 1_000);
        let mut reader = VByteReader::new(&out);
        assert!(reader.read_len().is_err());
    }
}
