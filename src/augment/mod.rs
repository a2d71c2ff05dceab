//! Random cutout augmentation.
//!
//! Each iteration scores the render through a batch of random crops resized
//! to the critic's input resolution. The random sizes and offsets act as an
//! ensembling regularizer against the critic's fixed input size. Cropping
//! and nearest-neighbor resizing are linear maps, so the backward pass is a
//! plain scatter-add (the adjoint of the gather).

use crate::Image;
use rand::Rng;

/// When center bias is on, offsets are drawn from a Gaussian around the
/// image center with σ = max_offset / CENTER_FOCUS.
const CENTER_FOCUS: f32 = 2.0;

/// A square crop window inside a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoutSpec {
    /// Left edge in pixels.
    pub x: usize,
    /// Top edge in pixels.
    pub y: usize,
    /// Side length in pixels.
    pub size: usize,
}

fn normal<R: Rng>(rng: &mut R, mean: f32, std: f32) -> f32 {
    let u1: f64 = rng.random::<f64>().max(1e-10);
    let u2: f64 = rng.random::<f64>();
    let z = ((-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()) as f32;
    mean + std * z
}

fn sample_offset<R: Rng>(rng: &mut R, max_offset: usize, center_bias: bool) -> usize {
    if max_offset == 0 {
        return 0;
    }
    if center_bias {
        let center = max_offset as f32 / 2.0;
        let offset = normal(rng, center, center / CENTER_FOCUS).round() as i64;
        if (0..=max_offset as i64).contains(&offset) {
            return offset as usize;
        }
        // Over the boundary: resample uniformly
    }
    rng.random_range(0..=max_offset)
}

/// Sample `count` random cutout windows for an image of side `image_size`.
///
/// Sizes follow `image_size · clamp(N(0.8, 0.3), 0.5, 0.95)`; offsets are
/// uniform, or center-biased Gaussian when requested.
pub fn sample_specs<R: Rng>(
    rng: &mut R,
    image_size: usize,
    count: usize,
    center_bias: bool,
) -> Vec<CutoutSpec> {
    (0..count)
        .map(|_| {
            let factor = normal(rng, 0.8, 0.3).clamp(0.5, 0.95);
            let size = ((image_size as f32 * factor) as usize).max(1);
            let max_offset = image_size - size;
            CutoutSpec {
                x: sample_offset(rng, max_offset, center_bias),
                y: sample_offset(rng, max_offset, center_bias),
                size,
            }
        })
        .collect()
}

/// The canonical crop used for best-result scoring: the full frame.
///
/// Deterministic and never augmented, so scores stay comparable across
/// iterations.
#[must_use]
pub fn center_spec(image_size: usize) -> CutoutSpec {
    CutoutSpec { x: 0, y: 0, size: image_size }
}

/// Crop a window out of `image` and resize it to `out_size` with
/// nearest-neighbor sampling.
#[must_use]
pub fn extract(image: &Image, spec: CutoutSpec, out_size: usize) -> Image {
    let mut crop = Image::zeros(out_size);
    for c in 0..3 {
        for i in 0..out_size {
            let src_y = spec.y + i * spec.size / out_size;
            for j in 0..out_size {
                let src_x = spec.x + j * spec.size / out_size;
                crop.data_mut()[[c, i, j]] = image.data()[[c, src_y, src_x]];
            }
        }
    }
    crop
}

/// Adjoint of [`extract`]: scatter-add a crop-sized gradient back into an
/// image-sized buffer.
#[must_use]
pub fn extract_vjp(grad_crop: &Image, spec: CutoutSpec, image_size: usize) -> Image {
    let out_size = grad_crop.size();
    let mut grad = Image::zeros(image_size);
    for c in 0..3 {
        for i in 0..out_size {
            let src_y = spec.y + i * spec.size / out_size;
            for j in 0..out_size {
                let src_x = spec.x + j * spec.size / out_size;
                grad.data_mut()[[c, src_y, src_x]] += grad_crop.data()[[c, i, j]];
            }
        }
    }
    grad
}

/// Scatter-add a crop gradient into an existing image-sized buffer.
pub fn accumulate_vjp(acc: &mut Image, grad_crop: &Image, spec: CutoutSpec) {
    let out_size = grad_crop.size();
    for c in 0..3 {
        for i in 0..out_size {
            let src_y = spec.y + i * spec.size / out_size;
            for j in 0..out_size {
                let src_x = spec.x + j * spec.size / out_size;
                acc.data_mut()[[c, src_y, src_x]] += grad_crop.data()[[c, i, j]];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ramp_image(size: usize) -> Image {
        let mut img = Image::zeros(size);
        for (i, v) in img.data_mut().iter_mut().enumerate() {
            *v = (i as f32 * 0.37).sin();
        }
        img
    }

    #[test]
    fn test_extract_identity_when_full_frame() {
        let img = ramp_image(8);
        let crop = extract(&img, center_spec(8), 8);
        assert_eq!(crop, img);
    }

    #[test]
    fn test_extract_output_size() {
        let img = ramp_image(16);
        let crop = extract(&img, CutoutSpec { x: 2, y: 3, size: 10 }, 4);
        assert_eq!(crop.size(), 4);
    }

    #[test]
    fn test_extract_reads_from_window() {
        let mut img = Image::zeros(8);
        img.data_mut()[[0, 4, 4]] = 1.0;
        // Crop the bottom-right quadrant at native resolution
        let crop = extract(&img, CutoutSpec { x: 4, y: 4, size: 4 }, 4);
        assert_eq!(crop.data()[[0, 0, 0]], 1.0);
    }

    #[test]
    fn test_vjp_is_adjoint_of_extract() {
        // <extract(A), G> == <A, extract_vjp(G)> for linear maps
        let img = ramp_image(12);
        let spec = CutoutSpec { x: 1, y: 2, size: 9 };
        let crop = extract(&img, spec, 5);

        let grad_crop = ramp_image(5);
        let grad_img = extract_vjp(&grad_crop, spec, 12);

        let lhs: f32 = crop
            .data()
            .iter()
            .zip(grad_crop.data().iter())
            .map(|(a, b)| a * b)
            .sum();
        let rhs: f32 = img
            .data()
            .iter()
            .zip(grad_img.data().iter())
            .map(|(a, b)| a * b)
            .sum();
        assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-4);
    }

    #[test]
    fn test_accumulate_matches_extract_vjp() {
        let grad_crop = ramp_image(5);
        let spec = CutoutSpec { x: 3, y: 0, size: 7 };
        let standalone = extract_vjp(&grad_crop, spec, 12);

        let mut acc = Image::zeros(12);
        accumulate_vjp(&mut acc, &grad_crop, spec);
        assert_eq!(acc, standalone);
    }

    #[test]
    fn test_center_spec_covers_frame() {
        let spec = center_spec(64);
        assert_eq!(spec, CutoutSpec { x: 0, y: 0, size: 64 });
    }

    proptest! {
        #[test]
        fn test_sampled_specs_stay_in_bounds(
            seed in 0u64..200,
            image_size in 8usize..64,
            center_bias in proptest::bool::ANY,
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            for spec in sample_specs(&mut rng, image_size, 16, center_bias) {
                prop_assert!(spec.size >= 1);
                prop_assert!(spec.x + spec.size <= image_size);
                prop_assert!(spec.y + spec.size <= image_size);
                // Size distribution is clamped to [0.5, 0.95] of the frame
                prop_assert!(spec.size <= (image_size as f32 * 0.95) as usize + 1);
            }
        }
    }
}
