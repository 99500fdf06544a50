use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;

use crate::error::{Error, Result};

/// Bounding box for generated previews; aspect ratio is preserved and
/// images already inside the box are not upscaled.
pub const THUMBNAIL_MAX_EDGE: u32 = 400;

const JPEG_QUALITY: u8 = 85;

/// Derives a JPEG preview of `original` at `dest`, written atomically.
///
/// Alpha and palette images are flattened to RGB before encoding. A source
/// that cannot be decoded yields `Error::Decode`; the caller degrades that
/// to "thumbnail not found" rather than failing the request.
pub fn generate(original: &Path, dest: &Path) -> Result<()> {
    let img = image::open(original).map_err(|e| Error::Decode(e.to_string()))?;

    let img = if img.width() > THUMBNAIL_MAX_EDGE || img.height() > THUMBNAIL_MAX_EDGE {
        img.thumbnail(THUMBNAIL_MAX_EDGE, THUMBNAIL_MAX_EDGE)
    } else {
        img
    };
    let rgb = img.into_rgb8();

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = dest.with_extension("partial");
    let result = (|| -> Result<()> {
        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
        rgb.write_with_encoder(encoder)
            .map_err(|e| Error::Decode(e.to_string()))?;
        writer.flush()?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            fs::rename(&temp_path, dest)?;
            Ok(())
        }
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            Err(e)
        }
    }
}
