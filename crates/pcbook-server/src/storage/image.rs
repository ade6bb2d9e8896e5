//! Laptop image storage: bytes on disk, metadata in memory.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info, warn};

use super::StoreError;

/// Longest accepted type hint, dot included.
const MAX_IMAGE_TYPE_LEN: usize = 16;

/// Where an uploaded image lives and whom it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub laptop_id: String,
    pub image_type: String,
    pub path: PathBuf,
}

pub trait ImageStore: Send + Sync {
    /// Persist `data` and return the new image id.
    ///
    /// Metadata is recorded only after every byte has been written.
    fn save(&self, laptop_id: &str, image_type: &str, data: &[u8]) -> Result<String, StoreError>;

    fn find(&self, image_id: &str) -> Result<Option<ImageRecord>, StoreError>;
}

/// Writes each image to `{image_dir}/{image_id}{image_type}`.
#[derive(Debug)]
pub struct DiskImageStore {
    image_dir: PathBuf,
    images: RwLock<HashMap<String, ImageRecord>>,
}

impl DiskImageStore {
    /// Open a store rooted at `image_dir`, creating the directory if needed.
    pub fn open(image_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(image_dir)?;
        info!(path = %image_dir.display(), "Image store opened");
        Ok(Self {
            image_dir: image_dir.to_path_buf(),
            images: RwLock::new(HashMap::new()),
        })
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }
}

impl ImageStore for DiskImageStore {
    fn save(&self, laptop_id: &str, image_type: &str, data: &[u8]) -> Result<String, StoreError> {
        if !is_valid_image_type(image_type) {
            return Err(StoreError::InvalidImageType(image_type.to_string()));
        }

        let image_id = uuid::Uuid::new_v4().to_string();
        let path = self.image_dir.join(format!("{image_id}{image_type}"));

        if let Err(e) = write_new_file(&path, data) {
            if path.exists() {
                if let Err(cleanup) = std::fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %cleanup, "Failed to remove partial image");
                }
            }
            return Err(e.into());
        }

        self.images.write()?.insert(
            image_id.clone(),
            ImageRecord {
                laptop_id: laptop_id.to_string(),
                image_type: image_type.to_string(),
                path: path.clone(),
            },
        );
        debug!(image_id = %image_id, path = %path.display(), bytes = data.len(), "Image written");
        Ok(image_id)
    }

    fn find(&self, image_id: &str) -> Result<Option<ImageRecord>, StoreError> {
        Ok(self.images.read()?.get(image_id).cloned())
    }
}

fn write_new_file(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create_new(path)?;
    file.write_all(data)?;
    file.sync_all()
}

/// A type hint is either empty or a dot followed by ASCII alphanumerics,
/// so it can never escape the image directory.
pub fn is_valid_image_type(image_type: &str) -> bool {
    if image_type.is_empty() {
        return true;
    }
    let Some(ext) = image_type.strip_prefix('.') else {
        return false;
    };
    !ext.is_empty()
        && image_type.len() <= MAX_IMAGE_TYPE_LEN
        && ext.bytes().all(|b| b.is_ascii_alphanumeric())
}
