use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{DynamicImage, ImageOutputFormat};
use murmur_common::{Error, Result};
use tracing::{info, warn};
use uuid::Uuid;

/// URL namespace generated images are served under.
pub const GENERATED_IMAGES_ROUTE: &str = "/static/generated_images";

const JPEG_QUALITY: u8 = 85;

/// Decode an image payload that is either a `data:image/...;base64,XXXX`
/// URI or a bare base64 string.
pub fn decode_image_payload(payload: &str) -> Result<Vec<u8>> {
    let encoded = if payload.starts_with("data:image") {
        payload
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| Error::Media("malformed data URI in image payload".to_string()))?
    } else {
        payload
    };

    BASE64
        .decode(encoded.trim())
        .map_err(|e| Error::Media(format!("invalid base64 image payload: {e}")))
}

/// Decode a generated-image payload, flatten any alpha channel to opaque RGB,
/// and persist it as a JPEG under a globally unique filename. Returns the
/// filename.
pub fn store_generated_image(images_dir: &Path, payload: &str) -> Result<String> {
    let bytes = decode_image_payload(payload)?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| Error::Media(format!("failed to decode generated image: {e}")))?;

    // JPEG has no alpha; RGBA and paletted inputs are flattened first.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut encoded = Vec::new();
    rgb.write_to(
        &mut Cursor::new(&mut encoded),
        ImageOutputFormat::Jpeg(JPEG_QUALITY),
    )
    .map_err(|e| Error::Media(format!("failed to encode JPEG: {e}")))?;

    std::fs::create_dir_all(images_dir)?;
    let filename = format!("{}.jpg", Uuid::new_v4());
    std::fs::write(images_dir.join(&filename), &encoded)?;

    Ok(filename)
}

/// Build the retrievable URL for a stored image: absolute when an external
/// base address is configured, root-relative otherwise.
pub fn public_image_url(base_url: Option<&str>, filename: &str) -> String {
    match base_url {
        Some(base) => format!(
            "{}{}/{}",
            base.trim_end_matches('/'),
            GENERATED_IMAGES_ROUTE,
            filename
        ),
        None => format!("{GENERATED_IMAGES_ROUTE}/{filename}"),
    }
}

/// Content type for a generated-image filename, derived from its extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/png"
    }
}

/// Delete generated images older than `max_age`. Returns the number removed.
/// A missing directory is not an error.
pub fn cleanup_old_images(images_dir: &Path, max_age: Duration) -> Result<usize> {
    let entries = match std::fs::read_dir(images_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let modified = entry.metadata().and_then(|m| m.modified());
        let expired = match modified {
            Ok(modified) => modified
                .elapsed()
                .map(|age| age >= max_age)
                .unwrap_or(false),
            Err(e) => {
                warn!("skipping {} during cleanup: {e}", path.display());
                continue;
            }
        };

        if expired {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!("failed to remove {}: {e}", path.display());
            } else {
                removed += 1;
            }
        }
    }

    if removed > 0 {
        info!("image cleanup removed {removed} expired file(s)");
    }
    Ok(removed)
}
