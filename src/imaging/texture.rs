//! Neighbourhood texture statistics and the tags derived from them.

use std::collections::BTreeSet;

use tracing::debug;

use super::pixels::PixelBuffer;
use super::profile::ThresholdProfile;
use super::types::{TextureFeatures, TextureTag};

/// Pixels this close to any edge are never sampled as centres.
const BORDER: u32 = 2;

/// `roughness + local_variance` at which complexity saturates.
const COMPLEXITY_SCALE: f64 = 200.0;

const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

pub fn extract_texture_features(pixels: &PixelBuffer, profile: &ThresholdProfile) -> TextureFeatures {
    let (roughness, local_variance) =
        neighbourhood_statistics(pixels, profile.texture_stride as usize);
    let uniformity = (255.0 - roughness).max(0.0) / 255.0;
    let texture_complexity = ((roughness + local_variance) / COMPLEXITY_SCALE).min(1.0);
    let tags = derive_tags(roughness, local_variance, uniformity, profile);

    debug!(
        roughness,
        local_variance,
        uniformity,
        texture_complexity,
        tags = tags.len(),
        "Texture features extracted"
    );

    TextureFeatures {
        roughness,
        uniformity,
        local_variance,
        texture_complexity,
        tags,
    }
}

/// Mean absolute 8-neighbour difference and mean variance of those
/// differences, over interior centres sampled every `stride` pixels.
/// Returns (0, 0) when the image has no interior. A stride of 0 samples
/// every centre.
pub fn neighbourhood_statistics(pixels: &PixelBuffer, stride: usize) -> (f64, f64) {
    let stride = stride.max(1);
    let (w, h) = (pixels.width(), pixels.height());
    if w <= 2 * BORDER || h <= 2 * BORDER {
        return (0.0, 0.0);
    }

    let mut roughness_sum = 0.0f64;
    let mut variance_sum = 0.0f64;
    let mut centres = 0u64;

    for y in (BORDER..h - BORDER).step_by(stride) {
        for x in (BORDER..w - BORDER).step_by(stride) {
            let center = pixels.brightness(x, y);
            let mut diffs = [0.0f64; 8];
            for (slot, (dx, dy)) in diffs.iter_mut().zip(NEIGHBOURS) {
                let nx = (x as i64 + dx) as u32;
                let ny = (y as i64 + dy) as u32;
                *slot = center.abs_diff(pixels.brightness(nx, ny)) as f64;
            }

            let mean = diffs.iter().sum::<f64>() / 8.0;
            let variance = diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / 8.0;
            roughness_sum += mean;
            variance_sum += variance;
            centres += 1;
        }
    }

    if centres == 0 {
        return (0.0, 0.0);
    }
    let n = centres as f64;
    (roughness_sum / n, variance_sum / n)
}

/// Tags come in pairs: roughness over its threshold adds `high-detail` and
/// `complex-texture`; variance over its threshold adds `noisy` and
/// `artifact-present`.
fn derive_tags(
    roughness: f64,
    local_variance: f64,
    uniformity: f64,
    profile: &ThresholdProfile,
) -> BTreeSet<TextureTag> {
    let mut tags = BTreeSet::new();
    if roughness > profile.roughness_tag_threshold {
        tags.insert(TextureTag::HighDetail);
        tags.insert(TextureTag::ComplexTexture);
    }
    if local_variance > profile.variance_tag_threshold {
        tags.insert(TextureTag::Noisy);
        tags.insert(TextureTag::ArtifactPresent);
    }
    if uniformity > profile.smooth_tag_threshold {
        tags.insert(TextureTag::Smooth);
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(level: u8) -> [u8; 4] {
        [level, level, level, 255]
    }

    #[test]
    fn uniform_buffer_has_zero_roughness() {
        let buffer = PixelBuffer::uniform(20, 20, 77);
        let f = extract_texture_features(&buffer, &ThresholdProfile::clinical());
        assert_eq!(f.roughness, 0.0);
        assert_eq!(f.local_variance, 0.0);
        assert_eq!(f.uniformity, 1.0);
        assert_eq!(f.texture_complexity, 0.0);
        assert!(f.has_tag(TextureTag::Smooth));
        assert!(!f.has_tag(TextureTag::Noisy));
    }

    #[test]
    fn tiny_buffer_has_no_interior() {
        let buffer = PixelBuffer::from_fn(4, 4, |x, y| gray(((x + y) * 60) as u8));
        assert_eq!(neighbourhood_statistics(&buffer, 1), (0.0, 0.0));
    }

    #[test]
    fn checkerboard_is_rough_but_regular() {
        // Every 4-neighbour differs by 200, every diagonal by 0.
        let buffer =
            PixelBuffer::from_fn(16, 16, |x, y| if (x + y) % 2 == 0 { gray(0) } else { gray(200) });
        let (roughness, variance) = neighbourhood_statistics(&buffer, 1);
        assert!((roughness - 100.0).abs() < 1e-9);
        assert!((variance - 10_000.0).abs() < 1e-6);

        let f = extract_texture_features(&buffer, &ThresholdProfile::perfect());
        assert_eq!(f.texture_complexity, 1.0);
        assert!(f.has_tag(TextureTag::HighDetail));
        assert!(f.has_tag(TextureTag::ComplexTexture));
        assert!(f.has_tag(TextureTag::Noisy));
        assert!(f.has_tag(TextureTag::ArtifactPresent));
        assert!(!f.has_tag(TextureTag::Smooth));
    }

    #[test]
    fn vertical_stripes_have_directional_variance() {
        // Column parity pattern: left/right and diagonal neighbours differ,
        // top/bottom neighbours match.
        let buffer = PixelBuffer::from_fn(12, 12, |x, _| if x % 2 == 0 { gray(50) } else { gray(110) });
        let (roughness, variance) = neighbourhood_statistics(&buffer, 1);
        // 6 of 8 neighbours differ by 60: mean 45, variance 675.
        assert!((roughness - 45.0).abs() < 1e-9);
        assert!((variance - 675.0).abs() < 1e-9);
    }

    #[test]
    fn tag_pairs_follow_profile_thresholds() {
        let perfect = ThresholdProfile::perfect();
        let all_four = [
            TextureTag::HighDetail,
            TextureTag::ComplexTexture,
            TextureTag::Noisy,
            TextureTag::ArtifactPresent,
        ];

        // Exactly on the 60 / 120 boundaries: nothing.
        let at = derive_tags(60.0, 120.0, 0.5, &perfect);
        assert!(all_four.iter().all(|t| !at.contains(t)));

        let above = derive_tags(60.5, 120.5, 0.5, &perfect);
        assert!(all_four.iter().all(|t| above.contains(t)));
    }

    #[test]
    fn smooth_but_noisy_field_has_no_detail_tags() {
        // Low roughness with high variance: the variance pair only.
        let tags = derive_tags(9.26, 140.19, (255.0 - 9.26) / 255.0, &ThresholdProfile::perfect());
        let expected: BTreeSet<TextureTag> = [
            TextureTag::Noisy,
            TextureTag::ArtifactPresent,
            TextureTag::Smooth,
        ]
        .into_iter()
        .collect();
        assert_eq!(tags, expected);
    }

    #[test]
    fn zero_stride_profile_does_not_panic() {
        let mut profile = ThresholdProfile::clinical();
        profile.texture_stride = 0;
        let buffer =
            PixelBuffer::from_fn(12, 12, |x, _| if x % 2 == 0 { gray(50) } else { gray(110) });
        let f = extract_texture_features(&buffer, &profile);
        assert!((f.roughness - 45.0).abs() < 1e-9);
    }

    #[test]
    fn outputs_stay_in_range() {
        let buffer = PixelBuffer::from_fn(33, 27, |x, y| gray(((x * x + y * 7) % 256) as u8));
        for profile in [ThresholdProfile::perfect(), ThresholdProfile::clinical()] {
            let f = extract_texture_features(&buffer, &profile);
            assert!((0.0..=1.0).contains(&f.uniformity));
            assert!((0.0..=1.0).contains(&f.texture_complexity));
            assert!(f.roughness >= 0.0);
            assert!(f.local_variance >= 0.0);
        }
    }
}
