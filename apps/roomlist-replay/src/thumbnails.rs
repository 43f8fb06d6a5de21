//! Directory-backed thumbnail client.

use std::path::{Path, PathBuf};

use roomlist_core::{
    MediaError, MediaErrorCategory, ThumbnailCallback, ThumbnailClient, ThumbnailRequest,
};
use tokio::runtime::Handle;
use tracing::trace;

/// Serves `mxc://<server>/<media id>` from `<root>/<server>/<media id>`.
pub struct FsThumbnailClient {
    root: PathBuf,
    runtime: Handle,
}

impl FsThumbnailClient {
    pub fn new(root: impl Into<PathBuf>, runtime: Handle) -> Self {
        Self {
            root: root.into(),
            runtime,
        }
    }
}

impl ThumbnailClient for FsThumbnailClient {
    fn get_thumbnail(&self, request: ThumbnailRequest, callback: ThumbnailCallback) {
        let path = match media_path(&self.root, &request.mxc_url) {
            Ok(path) => path,
            Err(err) => {
                callback(Err(err));
                return;
            }
        };

        self.runtime.spawn(async move {
            trace!(mxc_url = %request.mxc_url, path = %path.display(), "reading thumbnail");
            let result = match tokio::fs::read(&path).await {
                Ok(bytes) if !bytes.is_empty() => Ok(bytes),
                Ok(_) => Err(MediaError::not_found(&request.mxc_url)),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    Err(MediaError::not_found(&request.mxc_url))
                }
                Err(err) => Err(MediaError::new(
                    MediaErrorCategory::Internal,
                    "M_UNKNOWN",
                    err.to_string(),
                )),
            };
            // Callbacks may write to a disk-backed image cache.
            let _ = tokio::task::spawn_blocking(move || callback(result)).await;
        });
    }
}

/// Resolve an `mxc://` URI under `root`, rejecting anything that could escape it.
fn media_path(root: &Path, mxc_url: &str) -> Result<PathBuf, MediaError> {
    let invalid = || {
        MediaError::new(
            MediaErrorCategory::InvalidRequest,
            "M_INVALID_PARAM",
            format!("'{mxc_url}' is not a valid mxc url"),
        )
    };

    let rest = mxc_url.strip_prefix("mxc://").ok_or_else(invalid)?;
    let (server, media_id) = rest.split_once('/').ok_or_else(invalid)?;
    let is_safe = |part: &str| {
        !part.is_empty() && part != "." && part != ".." && !part.contains(['/', '\\'])
    };
    if !is_safe(server) || !is_safe(media_id) {
        return Err(invalid());
    }
    Ok(root.join(server).join(media_id))
}
