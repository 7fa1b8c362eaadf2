//! Documents stored in the doclist.

use serde::{Deserialize, Serialize};

use crate::error::{FlashError, Result};
use crate::storage::StructReader;

/// An indexed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identity of the file, usually its inode.
    pub id: u64,
    pub path: String,
    /// Number of tokens.
    pub length: u32,
}

impl Document {
    pub fn new<S: Into<String>>(id: u64, path: S, length: u32) -> Self {
        Document {
            id,
            path: path.into(),
            length,
        }
    }

    /// `[u64 id][u32 length][u32 pathLen][path]`.
    pub fn encode(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(16 + self.path.len());
        data.extend_from_slice(&self.id.to_le_bytes());
        data.extend_from_slice(&self.length.to_le_bytes());
        data.extend_from_slice(&(self.path.len() as u32).to_le_bytes());
        data.extend_from_slice(self.path.as_bytes());
        data
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = StructReader::new(data);
        let id = reader.read_u64()?;
        let length = reader.read_u32()?;
        let path = reader.read_string()?;

        if reader.position() != data.len() as u64 {
            return Err(FlashError::corrupted(format!(
                "document {id}: {} trailing bytes",
                data.len() as u64 - reader.position()
            )));
        }
        Ok(Document { id, path, length })
    }
}
