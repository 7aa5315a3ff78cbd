//! Shape features: aspect ratio, brightness-weighted centroid, mirror
//! symmetry about both midlines, and the anatomical flags built on them.

use tracing::debug;

use super::pixels::PixelBuffer;
use super::profile::ThresholdProfile;
use super::types::{AnatomicalFlags, CenterMass, StructuralFeatures};

/// Centroid sampling stride, both axes.
const CENTER_MASS_STRIDE: usize = 2;

pub fn extract_structural_features(
    pixels: &PixelBuffer,
    profile: &ThresholdProfile,
) -> StructuralFeatures {
    if pixels.is_empty() {
        return StructuralFeatures::default();
    }

    let aspect_ratio = pixels.width() as f64 / pixels.height() as f64;
    let center_mass = compute_center_mass(pixels);
    let stride = profile.symmetry_stride as usize;
    let bilateral_symmetry = compute_bilateral_symmetry(pixels, stride);
    let vertical_symmetry = compute_vertical_symmetry(pixels, stride);
    let anatomy = detect_anatomy(aspect_ratio, center_mass, bilateral_symmetry);

    debug!(
        aspect_ratio,
        center_x = center_mass.x,
        center_y = center_mass.y,
        bilateral_symmetry,
        vertical_symmetry,
        "Structural features extracted"
    );

    StructuralFeatures {
        aspect_ratio,
        center_mass,
        bilateral_symmetry,
        vertical_symmetry,
        anatomy,
    }
}

/// Brightness²-weighted centroid over a stride-2 grid, divided by the image
/// dimensions. All-black images have no mass and report (0, 0).
pub fn compute_center_mass(pixels: &PixelBuffer) -> CenterMass {
    let (w, h) = (pixels.width(), pixels.height());
    let mut sum_x = 0.0f64;
    let mut sum_y = 0.0f64;
    let mut total_mass = 0.0f64;

    for y in (0..h).step_by(CENTER_MASS_STRIDE) {
        for x in (0..w).step_by(CENTER_MASS_STRIDE) {
            let b = pixels.brightness(x, y) as f64;
            let mass = b * b;
            sum_x += x as f64 * mass;
            sum_y += y as f64 * mass;
            total_mass += mass;
        }
    }

    if total_mass == 0.0 {
        return CenterMass::default();
    }

    CenterMass {
        x: sum_x / total_mass / w as f64,
        y: sum_y / total_mass / h as f64,
    }
}

/// Similarity of two brightness values: 1 when equal, 0 at full swing.
fn pair_similarity(a: u8, b: u8) -> f64 {
    (255.0 - a.abs_diff(b) as f64).max(0.0) / 255.0
}

/// Mean similarity of each sampled pixel in the left half to its mirror in
/// the right half. 0 when the image is too narrow to form a pair. A stride
/// of 0 samples every pixel.
pub fn compute_bilateral_symmetry(pixels: &PixelBuffer, stride: usize) -> f64 {
    let stride = stride.max(1);
    let (w, h) = (pixels.width(), pixels.height());
    let mut total = 0.0f64;
    let mut pairs = 0u64;

    for y in (0..h).step_by(stride) {
        for x in (0..w / 2).step_by(stride) {
            let left = pixels.brightness(x, y);
            let right = pixels.brightness(w - 1 - x, y);
            total += pair_similarity(left, right);
            pairs += 1;
        }
    }

    if pairs == 0 {
        return 0.0;
    }
    total / pairs as f64
}

/// Same as bilateral symmetry, mirrored across the horizontal midline.
pub fn compute_vertical_symmetry(pixels: &PixelBuffer, stride: usize) -> f64 {
    let stride = stride.max(1);
    let (w, h) = (pixels.width(), pixels.height());
    let mut total = 0.0f64;
    let mut pairs = 0u64;

    for x in (0..w).step_by(stride) {
        for y in (0..h / 2).step_by(stride) {
            let top = pixels.brightness(x, y);
            let bottom = pixels.brightness(x, h - 1 - y);
            total += pair_similarity(top, bottom);
            pairs += 1;
        }
    }

    if pairs == 0 {
        return 0.0;
    }
    total / pairs as f64
}

pub fn detect_anatomy(
    aspect_ratio: f64,
    center_mass: CenterMass,
    bilateral_symmetry: f64,
) -> AnatomicalFlags {
    let off_center_x = (center_mass.x - 0.5).abs();
    let off_center_y = (center_mass.y - 0.5).abs();

    AnatomicalFlags {
        chest_like: aspect_ratio > 1.2 && aspect_ratio < 1.8,
        brain_like: (aspect_ratio - 1.0).abs() < 0.2 && bilateral_symmetry > 0.7,
        spine_like: aspect_ratio < 0.6 && bilateral_symmetry > 0.6,
        dental_like: aspect_ratio >= 1.8,
        mammography_like: aspect_ratio > 0.6 && aspect_ratio < 0.85 && off_center_x > 0.08,
        centered_mass: off_center_x < 0.1 && off_center_y < 0.1,
        high_symmetry: bilateral_symmetry > 0.85,
    }
}
