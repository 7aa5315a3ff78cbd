//! Whole-image brightness statistics: histogram, contrast, edge density,
//! brightness bands, and the pathology pattern flags derived from them.

use tracing::debug;

use super::pixels::PixelBuffer;
use super::profile::ThresholdProfile;
use super::types::{PathologyIndicators, VisualFeatures};

/// Contrast normalizer: a standard deviation of 128 maps to 1.0.
const CONTRAST_SCALE: f64 = 128.0;

/// Single pass over every pixel.
///
/// Brightness bands use the profile's dark/bright cuts. An edge is counted
/// when a pixel's red channel differs from the next pixel's (row-major, so
/// the last pixel of a row compares against the first of the next) by more
/// than `edge_threshold`.
pub fn extract_visual_features(pixels: &PixelBuffer, profile: &ThresholdProfile) -> VisualFeatures {
    let total = pixels.pixel_count();
    if total == 0 {
        return VisualFeatures::default();
    }

    let mut histogram = vec![0u64; 256];
    let mut sum = 0u64;
    let mut dark = 0u64;
    let mut bright = 0u64;
    let mut medium = 0u64;
    let mut edges = 0u64;

    for i in 0..total {
        let b = pixels.brightness_at(i);
        histogram[b as usize] += 1;
        sum += b as u64;

        if b < profile.dark_threshold {
            dark += 1;
        } else if b > profile.bright_threshold {
            bright += 1;
        } else {
            medium += 1;
        }

        if i + 1 < total {
            let jump = pixels.red_at(i).abs_diff(pixels.red_at(i + 1));
            if jump > profile.edge_threshold {
                edges += 1;
            }
        }
    }

    let n = total as f64;
    let brightness = sum as f64 / n;
    let contrast = histogram_contrast(&histogram, brightness, n);
    let dark_ratio = dark as f64 / n;
    let bright_ratio = bright as f64 / n;
    let medium_ratio = medium as f64 / n;
    let indicators = detect_indicators(dark_ratio, bright_ratio, medium_ratio, contrast);

    let features = VisualFeatures {
        brightness,
        contrast,
        edge_density: edges as f64 / n,
        histogram,
        dark_ratio,
        bright_ratio,
        medium_ratio,
        indicators,
    };

    debug!(
        brightness = features.brightness,
        contrast = features.contrast,
        edge_density = features.edge_density,
        dark_ratio,
        bright_ratio,
        indicators = features.indicators.any(),
        "Visual features extracted"
    );

    features
}

/// Population standard deviation of brightness, from the histogram,
/// scaled by 1/128 and clamped to [0, 1].
fn histogram_contrast(histogram: &[u64], mean: f64, n: f64) -> f64 {
    let variance = histogram
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(|(level, &count)| {
            let d = level as f64 - mean;
            count as f64 * d * d
        })
        .sum::<f64>()
        / n;
    (variance.max(0.0).sqrt() / CONTRAST_SCALE).clamp(0.0, 1.0)
}

/// Pattern flags over brightness bands and contrast.
pub fn detect_indicators(
    dark_ratio: f64,
    bright_ratio: f64,
    medium_ratio: f64,
    contrast: f64,
) -> PathologyIndicators {
    PathologyIndicators {
        pneumonia: dark_ratio < 0.6 && contrast > 0.4,
        pleural_effusion: dark_ratio > 0.8 && contrast < 0.3,
        cardiomegaly: medium_ratio > 0.5 && bright_ratio > 0.1 && contrast > 0.25,
        consolidation: bright_ratio > 0.3 && contrast > 0.35,
        normal: (0.6..=0.8).contains(&dark_ratio) && contrast > 0.25 && contrast < 0.45,
    }
}
