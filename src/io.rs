use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::{DynamicImage, ImageError, RgbaImage};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::canvas::MAX_PIXELS;
use crate::components::layers::Layer;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug)]
pub enum IoError {
    Io(std::io::Error),
    Decode(String),
    Encode(String),
    UnsupportedFormat(String),
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::Io(e) => write!(f, "I/O error: {}", e),
            IoError::Decode(e) => write!(f, "Decode error: {}", e),
            IoError::Encode(e) => write!(f, "Encode error: {}", e),
            IoError::UnsupportedFormat(e) => write!(f, "Unsupported format: {}", e),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IoError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        IoError::Io(e)
    }
}

impl From<ImageError> for IoError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::IoError(io) => IoError::Io(io),
            ImageError::Unsupported(u) => IoError::UnsupportedFormat(u.to_string()),
            ImageError::Encoding(enc) => IoError::Encode(enc.to_string()),
            other => IoError::Decode(other.to_string()),
        }
    }
}

// ============================================================================
// FORMATS
// ============================================================================

/// Output formats for the flattened render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    Tga,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tga => "tga",
        }
    }

    pub fn supports_quality(&self) -> bool {
        matches!(self, SaveFormat::Jpeg)
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpg" | "jpeg" => Some(SaveFormat::Jpeg),
            "bmp" => Some(SaveFormat::Bmp),
            "tga" => Some(SaveFormat::Tga),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Decode an in-memory image (any enabled format) to RGBA.
pub fn decode_image(bytes: &[u8]) -> Result<RgbaImage, IoError> {
    let img = image::load_from_memory(bytes)?;
    check_size(img.width(), img.height())?;
    Ok(img.to_rgba8())
}

/// Load an image file as a raster layer named after the file stem.
pub fn load_layer(path: &Path) -> Result<Layer, IoError> {
    let img = image::open(path)?;
    check_size(img.width(), img.height())?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Background")
        .to_string();
    crate::log_info!("loaded '{}' ({}×{})", path.display(), img.width(), img.height());
    Ok(Layer::raster(name, img.to_rgba8()))
}

fn check_size(width: u32, height: u32) -> Result<(), IoError> {
    if width as u64 * height as u64 > MAX_PIXELS {
        return Err(IoError::Decode(format!(
            "image {}×{} exceeds the {} pixel limit",
            width, height, MAX_PIXELS
        )));
    }
    Ok(())
}

// ============================================================================
// SAVING
// ============================================================================

/// Encode and write an image to a file.  `quality` (1–100) only affects JPEG.
pub fn save_image(
    image: &RgbaImage,
    path: &Path,
    format: SaveFormat,
    quality: u8,
) -> Result<(), IoError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Png => {
            let encoder = PngEncoder::new(&mut writer);
            #[allow(deprecated)]
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Jpeg => {
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder.encode(
                rgb_image.as_raw(),
                rgb_image.width(),
                rgb_image.height(),
                image::ColorType::Rgb8,
            )?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Tga => {
            let encoder = TgaEncoder::new(&mut writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
    }
    crate::log_info!("saved '{}' as {}", path.display(), format.extension());
    Ok(())
}
