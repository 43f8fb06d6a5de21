//! Avatar decoding and hand-off of fetched thumbnails to the owning thread.

use image::ImageError;
use roomlist_core::AvatarImage;
use tokio::sync::mpsc;

/// Thumbnail bytes fetched for a room, waiting to be applied by the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarFetch {
    pub room_id: String,
    pub url: String,
    pub bytes: Vec<u8>,
}

pub(crate) type AvatarSender = mpsc::UnboundedSender<AvatarFetch>;
pub(crate) type AvatarReceiver = mpsc::UnboundedReceiver<AvatarFetch>;

pub(crate) fn avatar_channel() -> (AvatarSender, AvatarReceiver) {
    mpsc::unbounded_channel()
}

/// Decode encoded image bytes into an RGBA avatar.
pub fn decode_avatar(source: &str, bytes: &[u8]) -> Result<AvatarImage, ImageError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(AvatarImage {
        source: source.to_owned(),
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    use std::io::Cursor;

    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 90, 255]));
    let mut out = Vec::new();
    img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .expect("png encoding should work");
    out
}
