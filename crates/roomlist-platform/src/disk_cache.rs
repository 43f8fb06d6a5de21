//! Disk-backed avatar cache.
//!
//! Image bytes live one file per URL under `<data_dir>/image-cache`; a JSON
//! index maps URLs to files and records a logical access tick for LRU
//! eviction. The index is kept in memory and written back on inserts,
//! evictions and [`DiskImageCache::flush`]; cache hits only mark it dirty.

use std::{
    collections::HashMap,
    fs,
    hash::{DefaultHasher, Hash, Hasher},
    io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use image::ImageFormat;
use roomlist_core::{CacheError, ImageCache};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

const IMAGE_CACHE_DIR: &str = "image-cache";
const INDEX_FILE: &str = "index.json";
/// Default cache budget.
pub const DEFAULT_CAPACITY_BYTES: u64 = 256 * 1_024 * 1_024;

/// Image cache persisted under `<data_dir>/image-cache`.
pub struct DiskImageCache {
    root: PathBuf,
    capacity_bytes: u64,
    state: Mutex<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    index: CacheIndex,
    dirty: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheIndex {
    next_tick: u64,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    file_name: String,
    size: u64,
    last_access: u64,
}

impl CacheIndex {
    fn tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick = self.next_tick.saturating_add(1);
        tick
    }

    fn total_size_bytes(&self) -> u64 {
        self.entries
            .values()
            .fold(0u64, |total, entry| total.saturating_add(entry.size))
    }
}

impl CacheState {
    fn write_index(&mut self, root: &Path) -> Result<(), CacheError> {
        if !self.dirty {
            return Ok(());
        }
        let encoded = serde_json::to_vec(&self.index)
            .map_err(|err| CacheError::Serialization(err.to_string()))?;
        fs::write(root.join(INDEX_FILE), encoded)?;
        self.dirty = false;
        Ok(())
    }
}

impl DiskImageCache {
    pub fn new(data_dir: &Path) -> Result<Self, CacheError> {
        Self::with_capacity(data_dir, DEFAULT_CAPACITY_BYTES)
    }

    pub fn with_capacity(data_dir: &Path, capacity_bytes: u64) -> Result<Self, CacheError> {
        let root = data_dir.join(IMAGE_CACHE_DIR);
        fs::create_dir_all(&root)?;

        let mut index = read_index(&root.join(INDEX_FILE));
        let indexed = index.entries.len();
        index
            .entries
            .retain(|_, entry| root.join(&entry.file_name).is_file());

        let cache = Self {
            root,
            capacity_bytes: capacity_bytes.max(1),
            state: Mutex::new(CacheState {
                dirty: index.entries.len() != indexed,
                index,
            }),
        };
        {
            let mut state = cache.lock()?;
            cache.evict(&mut state, None)?;
            state.write_index(&cache.root)?;
            debug!(
                root = %cache.root.display(),
                entries = state.index.entries.len(),
                size = state.index.total_size_bytes(),
                "opened image cache"
            );
        }
        Ok(cache)
    }

    /// Total bytes of image data tracked by the index.
    pub fn total_size_bytes(&self) -> u64 {
        self.lock()
            .map(|state| state.index.total_size_bytes())
            .unwrap_or(0)
    }

    /// Write access ticks recorded by cache hits back to disk.
    pub fn flush(&self) -> Result<(), CacheError> {
        self.lock()?.write_index(&self.root)
    }

    fn lock(&self) -> Result<MutexGuard<'_, CacheState>, CacheError> {
        self.state
            .lock()
            .map_err(|_| CacheError::Backend("poisoned lock".to_owned()))
    }

    fn store(&self, state: &mut CacheState, url: &str, bytes: &[u8]) -> Result<(), CacheError> {
        let extension =
            image_extension(bytes).ok_or_else(|| CacheError::UnsupportedFormat(url.to_owned()))?;
        let size = bytes.len() as u64;
        if size > self.capacity_bytes {
            debug!(%url, size, capacity = self.capacity_bytes, "image larger than cache; not stored");
            return Ok(());
        }

        let file_name = format!("{:016x}.{extension}", url_hash(url));
        fs::write(self.root.join(&file_name), bytes)?;

        let last_access = state.index.tick();
        let previous = state.index.entries.insert(
            url.to_owned(),
            CacheEntry {
                file_name: file_name.clone(),
                size,
                last_access,
            },
        );
        if let Some(previous) = previous
            && previous.file_name != file_name
        {
            remove_file(&self.root.join(previous.file_name))?;
        }
        state.dirty = true;

        self.evict(state, Some(url))?;
        state.write_index(&self.root)
    }

    /// Drop least recently used entries until the cache fits its budget.
    fn evict(&self, state: &mut CacheState, keep: Option<&str>) -> Result<(), CacheError> {
        let mut total = state.index.total_size_bytes();
        if total <= self.capacity_bytes {
            return Ok(());
        }

        let mut by_age: Vec<(u64, String)> = state
            .index
            .entries
            .iter()
            .filter(|(url, _)| Some(url.as_str()) != keep)
            .map(|(url, entry)| (entry.last_access, url.clone()))
            .collect();
        by_age.sort_unstable();

        for (_, url) in by_age {
            if total <= self.capacity_bytes {
                break;
            }
            let Some(entry) = state.index.entries.remove(&url) else {
                continue;
            };
            debug!(%url, size = entry.size, "evicting cached image");
            total = total.saturating_sub(entry.size);
            state.dirty = true;
            remove_file(&self.root.join(entry.file_name))?;
        }
        Ok(())
    }
}

impl ImageCache for DiskImageCache {
    fn image(&self, url: &str) -> Option<Vec<u8>> {
        let mut state = match self.lock() {
            Ok(state) => state,
            Err(err) => {
                warn!(%url, error = %err, "image cache unavailable");
                return None;
            }
        };
        let file_name = state.index.entries.get(url)?.file_name.clone();

        match fs::read(self.root.join(&file_name)) {
            Ok(bytes) if !bytes.is_empty() => {
                let tick = state.index.tick();
                if let Some(entry) = state.index.entries.get_mut(url) {
                    entry.last_access = tick;
                }
                state.dirty = true;
                Some(bytes)
            }
            _ => {
                trace!(%url, "dropping image cache entry without data");
                state.index.entries.remove(url);
                state.dirty = true;
                None
            }
        }
    }

    fn save_image(&self, url: &str, bytes: &[u8]) -> Result<(), CacheError> {
        let mut state = self.lock()?;
        self.store(&mut state, url, bytes)
    }
}

impl Drop for DiskImageCache {
    fn drop(&mut self) {
        if let Ok(state) = self.state.get_mut()
            && let Err(err) = state.write_index(&self.root)
        {
            warn!(error = %err, "failed to write image cache index");
        }
    }
}

fn read_index(path: &Path) -> CacheIndex {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return CacheIndex::default(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "image cache index unreadable; starting empty");
            return CacheIndex::default();
        }
    };
    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        warn!(path = %path.display(), error = %err, "image cache index corrupt; starting empty");
        CacheIndex::default()
    })
}

/// File extension for bytes in a format the avatar decoder can read.
fn image_extension(bytes: &[u8]) -> Option<&'static str> {
    let format = image::guess_format(bytes).ok()?;
    let supported = matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP
    );
    if !supported {
        return None;
    }
    format.extensions_str().first().copied()
}

fn url_hash(url: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    hasher.finish()
}

fn remove_file(path: &Path) -> Result<(), CacheError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
