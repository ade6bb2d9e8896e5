//! Protobuf messages to and from binary files.

use std::path::{Path, PathBuf};

use prost::Message;

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        source: prost::DecodeError,
    },
}

/// Encode `message` in the protobuf wire format and write it to `path`,
/// replacing any existing file.
pub fn write_binary_file<M: Message>(message: &M, path: &Path) -> Result<(), SerializeError> {
    std::fs::write(path, message.encode_to_vec()).map_err(|source| SerializeError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Read `path` and decode it as an `M`.
pub fn read_binary_file<M: Message + Default>(path: &Path) -> Result<M, SerializeError> {
    let data = std::fs::read(path).map_err(|source| SerializeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    M::decode(data.as_slice()).map_err(|source| SerializeError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
