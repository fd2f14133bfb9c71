use std::fs;
use std::path::Path;
use crc32fast::Hasher;
use tracing::debug;
use crate::compression::delta::DeltaEncoder;
use crate::compression::vbyte::{VByteEncoder, VByteReader};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::index::positional::PositionalIndex;
use crate::index::posting::{Posting, PostingList};
use crate::storage::layout::write_atomic;

const MAGIC: &[u8; 4] = b"PPOS";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 16;
/// lz4 never expands a byte of input into more than this many bytes of output
const MAX_LZ4_RATIO: usize = 255;

/// Positional index file codec.
///
/// ```text
/// [ "PPOS" | version u32 | vocab_size u32 | crc32(body) u32 ]
/// [ lz4 body ]
/// body, per slot: n_docs, then per doc (ascending): id delta, positions (count + gaps)
/// ```
pub struct IndexFile;

impl IndexFile {
    pub fn encode(index: &PositionalIndex) -> Result<Vec<u8>> {
        let mut body = Vec::with_capacity(index.posting_count() * 8 + index.vocab_size());
        for list in index.slots() {
            VByteEncoder::encode_u64(&mut body, list.len() as u64);
            let mut prev = 0u64;
            for posting in list.iter() {
                VByteEncoder::encode_u64(&mut body, posting.doc_id.0 - prev);
                DeltaEncoder::encode_u32_list(&mut body, &posting.positions)?;
                prev = posting.doc_id.0;
            }
        }

        let compressed = lz4_flex::compress_prepend_size(&body);
        let mut hasher = Hasher::new();
        hasher.update(&compressed);

        let mut data = Vec::with_capacity(HEADER_SIZE + compressed.len());
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&VERSION.to_le_bytes());
        data.extend_from_slice(&(index.vocab_size() as u32).to_le_bytes());
        data.extend_from_slice(&hasher.finalize().to_le_bytes());
        data.extend_from_slice(&compressed);
        Ok(data)
    }

    pub fn decode(data: &[u8]) -> Result<PositionalIndex> {
        if data.len() < HEADER_SIZE || &data[0..4] != MAGIC {
            return Err(Error::new(ErrorKind::Parse, "Not a positional index file".to_string()));
        }
        let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
        if version != VERSION {
            return Err(Error::new(
                ErrorKind::Parse,
                format!("Unsupported positional index version {}", version),
            ));
        }
        let vocab_size = u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize;
        let crc = u32::from_le_bytes([data[12], data[13], data[14], data[15]]);

        let compressed = &data[HEADER_SIZE..];
        let mut hasher = Hasher::new();
        hasher.update(compressed);
        if hasher.finalize() != crc {
            return Err(Error::new(ErrorKind::Parse, "Positional index checksum mismatch".to_string()));
        }

        // Sizes come from the file: bound them by what the bytes can hold before allocating
        if compressed.len() < 4 {
            return Err(Error::new(ErrorKind::Parse, "Positional index body too short".to_string()));
        }
        let body_size = u32::from_le_bytes([compressed[0], compressed[1], compressed[2], compressed[3]]) as usize;
        if body_size > (compressed.len() - 4).saturating_mul(MAX_LZ4_RATIO) {
            return Err(Error::new(
                ErrorKind::Parse,
                format!("Positional index claims {} bytes from {} compressed", body_size, compressed.len()),
            ));
        }
        let body = lz4_flex::decompress_size_prepended(compressed)?;
        // Every slot takes at least one byte (its document count)
        if vocab_size > body.len() {
            return Err(Error::new(
                ErrorKind::Parse,
                format!("Positional index claims {} slots in {} bytes", vocab_size, body.len()),
            ));
        }
        let mut reader = VByteReader::new(&body);
        let mut slots = Vec::with_capacity(vocab_size);

        for _ in 0..vocab_size {
            let n_docs = reader.read_len()?;
            let mut list = PostingList::new();
            let mut prev = 0u64;
            for i in 0..n_docs {
                let delta = reader.read_u64()?;
                if i > 0 && delta == 0 {
                    return Err(Error::new(ErrorKind::Parse, "Duplicate document in posting list".to_string()));
                }
                let doc_id = prev.checked_add(delta).ok_or_else(|| {
                    Error::new(ErrorKind::Parse, "Document id overflow in posting list".to_string())
                })?;
                let positions = DeltaEncoder::decode_u32_list(&mut reader)?;
                list.insert(Posting { doc_id: DocId(doc_id), positions });
                prev = doc_id;
            }
            slots.push(list);
        }

        if !reader.is_empty() {
            return Err(Error::new(ErrorKind::Parse, "Trailing bytes after positional index body".to_string()));
        }

        Ok(PositionalIndex::from_slots(slots))
    }

    pub fn save(path: &Path, index: &PositionalIndex) -> Result<()> {
        let data = Self::encode(index)?;
        write_atomic(path, &data)?;
        debug!(path = %path.display(), bytes = data.len(), docs = index.doc_count(), "saved positional index");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<PositionalIndex> {
        let data = fs::read(path)?;
        Self::decode(&data)
    }
}
