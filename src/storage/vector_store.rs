use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use crc32fast::Hasher;
use tracing::{debug, warn};
use crate::compression::delta::DeltaEncoder;
use crate::compression::vbyte::{VByteEncoder, VByteReader};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::storage::layout::write_atomic;
use crate::vector::SparseVector;

const MAGIC: &[u8; 4] = b"PVEC";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 16;
const FRAME_HEADER_SIZE: usize = 8;

/// One row of a pod matrix, tagged with the document that owns it
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub doc_id: DocId,
    pub vector: SparseVector,
}

/// Ordered rows of one pod, addressed by position.
///
/// Positions are not stable: removing a row shifts every later row down by one.
/// Rows are never edited in place.
///
/// File layout:
/// ```text
/// [ "PVEC" | version u32 | width u32 | reserved u32 ]      <- 16 bytes
/// [ len u32 | crc32 u32 | doc_id, indices, values ]        <- one frame per row
/// ```
pub struct VectorStore {
    path: PathBuf,
    width: usize,
    rows: Vec<StoredRow>,
}

impl VectorStore {
    /// Create an empty store file, replacing whatever was there
    pub fn create(path: &Path, width: usize) -> Result<Self> {
        write_atomic(path, &encode_header(width))?;
        debug!(path = %path.display(), width, "created vector store");

        Ok(VectorStore {
            path: path.to_path_buf(),
            width,
            rows: Vec::new(),
        })
    }

    /// Load every row. A torn final frame (crash during append) is cut off;
    /// a damaged frame anywhere else is an error.
    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let width = decode_header(&data)?;

        let mut rows = Vec::new();
        let mut pos = HEADER_SIZE;

        while pos < data.len() {
            match decode_frame(&data[pos..], width)? {
                Frame::Row(row, consumed) => {
                    rows.push(row);
                    pos += consumed;
                }
                Frame::Torn => {
                    warn!(
                        path = %path.display(),
                        kept_rows = rows.len(),
                        dropped_bytes = data.len() - pos,
                        "truncating torn vector store tail"
                    );
                    let file = OpenOptions::new().write(true).open(path)?;
                    file.set_len(pos as u64)?;
                    file.sync_all()?;
                    break;
                }
            }
        }

        Ok(VectorStore {
            path: path.to_path_buf(),
            width,
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&StoredRow> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[StoredRow] {
        &self.rows
    }

    /// Add a row at the end; returns its position (new row count - 1)
    pub fn append(&mut self, doc_id: DocId, vector: SparseVector) -> Result<usize> {
        if vector.width() != self.width {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("Vector width {} does not match store width {}", vector.width(), self.width),
            ));
        }

        let frame = encode_frame(doc_id, &vector)?;
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        append_or_cut_back(&mut file, |f| {
            f.write_all(&frame)?;
            f.sync_data()
        })?;

        self.rows.push(StoredRow { doc_id, vector });
        Ok(self.rows.len() - 1)
    }

    /// Remove the row at `index`; every later row moves down one position.
    /// Rewrites the whole file (before + after), O(store size).
    pub fn remove(&mut self, index: usize) -> Result<StoredRow> {
        if index >= self.rows.len() {
            return Err(Error::inconsistent(format!(
                "Row {} out of range for {} ({} rows)",
                index,
                self.path.display(),
                self.rows.len()
            )));
        }

        let mut data = encode_header(self.width);
        for (i, row) in self.rows.iter().enumerate() {
            if i != index {
                data.extend_from_slice(&encode_frame(row.doc_id, &row.vector)?);
            }
        }
        write_atomic(&self.path, &data)?;

        Ok(self.rows.remove(index))
    }

    /// Element-wise sum of all rows
    pub fn aggregate(&self) -> SparseVector {
        let mut dense = vec![0.0f32; self.width];
        for row in &self.rows {
            for (idx, value) in row.vector.iter() {
                dense[idx as usize] += value;
            }
        }
        SparseVector::from_dense(&dense)
    }
}

/// Run `write` at the end of `file`. On failure the file is cut back to its old
/// length so a partial frame never ends up in front of later rows.
fn append_or_cut_back(file: &mut File, write: impl FnOnce(&mut File) -> io::Result<()>) -> Result<()> {
    let before = file.metadata()?.len();
    if let Err(e) = write(file) {
        if let Err(undo) = file.set_len(before).and_then(|_| file.sync_data()) {
            return Err(Error::inconsistent(format!(
                "Append failed ({}) and the partial frame could not be cut off: {}",
                e, undo
            )));
        }
        warn!(error = %e, "append failed, partial frame cut off");
        return Err(e.into());
    }
    Ok(())
}

fn encode_header(width: usize) -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_SIZE);
    header.extend_from_slice(MAGIC);
    header.extend_from_slice(&VERSION.to_le_bytes());
    header.extend_from_slice(&(width as u32).to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes());
    header
}

fn decode_header(data: &[u8]) -> Result<usize> {
    if data.len() < HEADER_SIZE || &data[0..4] != MAGIC {
        return Err(Error::new(ErrorKind::Parse, "Not a vector store file".to_string()));
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != VERSION {
        return Err(Error::new(
            ErrorKind::Parse,
            format!("Unsupported vector store version {}", version),
        ));
    }
    Ok(u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize)
}

fn encode_frame(doc_id: DocId, vector: &SparseVector) -> Result<Vec<u8>> {
    let mut payload = Vec::with_capacity(8 + vector.nnz() * 6);
    VByteEncoder::encode_u64(&mut payload, doc_id.0);
    DeltaEncoder::encode_u32_list(&mut payload, vector.indices())?;
    for value in vector.values() {
        payload.extend_from_slice(&value.to_le_bytes());
    }

    let mut hasher = Hasher::new();
    hasher.update(&payload);

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&hasher.finalize().to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

enum Frame {
    Row(StoredRow, usize),
    Torn,
}

fn decode_frame(data: &[u8], width: usize) -> Result<Frame> {
    if data.len() < FRAME_HEADER_SIZE {
        return Ok(Frame::Torn);
    }
    let len = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let crc = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    let end = FRAME_HEADER_SIZE + len;
    if data.len() < end {
        return Ok(Frame::Torn);
    }

    let payload = &data[FRAME_HEADER_SIZE..end];
    let mut hasher = Hasher::new();
    hasher.update(payload);
    if hasher.finalize() != crc {
        if data.len() == end {
            return Ok(Frame::Torn);
        }
        return Err(Error::new(ErrorKind::Parse, "Vector store row checksum mismatch".to_string()));
    }

    let mut reader = VByteReader::new(payload);
    let doc_id = DocId(reader.read_u64()?);
    let indices = DeltaEncoder::decode_u32_list(&mut reader)?;
    let mut values = Vec::with_capacity(indices.len());
    for _ in 0..indices.len() {
        values.push(reader.read_f32()?);
    }

    let vector = SparseVector::from_pairs(width, indices.into_iter().zip(values))?;
    Ok(Frame::Row(StoredRow { doc_id, vector }, end))
}
