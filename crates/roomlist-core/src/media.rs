use crate::{
    error::{CacheError, MediaError},
    types::ThumbnailRequest,
};

/// Completion callback for thumbnail requests.
///
/// May be invoked on any thread.
pub type ThumbnailCallback = Box<dyn FnOnce(Result<Vec<u8>, MediaError>) + Send + 'static>;

/// Local image store keyed by `mxc://` URI.
pub trait ImageCache: Send + Sync {
    /// Cached bytes for `url`, or `None` when absent or empty.
    fn image(&self, url: &str) -> Option<Vec<u8>>;

    /// Store bytes for `url`.
    fn save_image(&self, url: &str, bytes: &[u8]) -> Result<(), CacheError>;
}

/// Asynchronous media client used to fetch room avatar thumbnails.
pub trait ThumbnailClient: Send + Sync {
    /// Start fetching a thumbnail; `callback` receives the outcome.
    fn get_thumbnail(&self, request: ThumbnailRequest, callback: ThumbnailCallback);
}
