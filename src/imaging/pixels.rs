//! Decoded RGBA pixel access shared by every extractor.

use image::GenericImageView;
use tracing::debug;

use super::ImagingError;

/// Maximum encoded image size accepted for decoding.
/// Prevents OOM on corrupt/adversarial files.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Smallest byte count that can hold a valid PNG (~67 bytes).
const MIN_IMAGE_BYTES: usize = 67;

const CHANNELS: usize = 4;

/// Immutable `width x height` RGBA buffer, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes. The length must be exactly `width * height * 4`.
    /// A zero-area buffer is accepted; extractors return neutral values for it.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, ImagingError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(CHANNELS))
            .ok_or(ImagingError::DimensionsTooLarge { width, height })?;
        if data.len() != expected {
            return Err(ImagingError::BufferMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a buffer by evaluating `f(x, y) -> [r, g, b, a]` per pixel.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> [u8; 4],
    {
        let mut data = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Buffer filled with a single opaque gray level.
    pub fn uniform(width: u32, height: u32, level: u8) -> Self {
        Self::from_fn(width, height, |_, _| [level, level, level, 255])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    /// RGBA at linear pixel index (row-major).
    pub fn rgba_at(&self, index: usize) -> [u8; 4] {
        let i = index * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    pub fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        self.rgba_at(self.linear_index(x, y))
    }

    pub fn red_at(&self, index: usize) -> u8 {
        self.data[index * CHANNELS]
    }

    /// `round((R + G + B) / 3)` at linear pixel index.
    pub fn brightness_at(&self, index: usize) -> u8 {
        let [r, g, b, _] = self.rgba_at(index);
        brightness_of(r, g, b)
    }

    pub fn brightness(&self, x: u32, y: u32) -> u8 {
        let [r, g, b, _] = self.rgba(x, y);
        brightness_of(r, g, b)
    }

    fn linear_index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// Channel mean rounded to the nearest integer. The sum of three channels
/// divided by 3 never lands on .5, so `(sum + 1) / 3` is exact rounding.
pub fn brightness_of(r: u8, g: u8, b: u8) -> u8 {
    let sum = r as u16 + g as u16 + b as u16;
    ((sum + 1) / 3) as u8
}

/// Reject byte inputs that cannot be a decodable image.
pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), ImagingError> {
    if bytes.is_empty() {
        return Err(ImagingError::EmptyInput("No image bytes supplied".into()));
    }
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(ImagingError::DecodeFailure(
            "Image data too small to be valid".into(),
        ));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImagingError::InputTooLarge {
            size: bytes.len(),
            max: MAX_IMAGE_BYTES,
        });
    }
    Ok(())
}

/// Decode PNG/JPEG/TIFF bytes into an RGBA buffer.
///
/// Unlike `PixelBuffer::new`, a decoded image with zero width or height is an
/// error here: the decoder handed us nothing to analyze.
pub fn decode_image(bytes: &[u8]) -> Result<PixelBuffer, ImagingError> {
    validate_image_bytes(bytes)?;

    let img = image::load_from_memory(bytes)
        .map_err(|e| ImagingError::DecodeFailure(e.to_string()))?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(ImagingError::EmptyInput(format!(
            "Decoded image has zero area ({width}x{height})"
        )));
    }

    let rgba = img.to_rgba8();
    debug!(width, height, encoded_bytes = bytes.len(), "Image decoded to RGBA");
    PixelBuffer::new(width, height, rgba.into_raw())
}
