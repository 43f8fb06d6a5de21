use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use roomlist_core::{CacheError, ImageCache};

mod disk_cache;

pub use disk_cache::{DEFAULT_CAPACITY_BYTES, DiskImageCache};

/// Process-local image cache, mostly useful for tests and ephemeral sessions.
#[derive(Clone, Default)]
pub struct InMemoryImageCache {
    data: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl ImageCache for InMemoryImageCache {
    fn image(&self, url: &str) -> Option<Vec<u8>> {
        let data = self.data.read().ok()?;
        data.get(url).filter(|bytes| !bytes.is_empty()).cloned()
    }

    fn save_image(&self, url: &str, bytes: &[u8]) -> Result<(), CacheError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| CacheError::Backend("poisoned lock".to_owned()))?;
        data.insert(url.to_owned(), bytes.to_vec());
        Ok(())
    }
}
