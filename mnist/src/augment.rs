//! Randomized image augmentation.
//!
//! Each augmented sample is produced by a fixed pipeline: a small random
//! rotation, an integer translation, and an isotropic Gaussian smoothing pass,
//! with the result clamped back into the byte intensity range. All randomness
//! comes from the caller's RNG so a single process-wide seed reproduces the
//! full run.

use crate::dataset::Dataset;
use crate::idx::MnistError;
use crate::{IMAGE_DIM, INPUT_SIZE, NUM_CLASSES};
use rand::seq::SliceRandom;
use rand::Rng;

/// Largest rotation applied during augmentation, in degrees either way.
pub const ROTATION_MAX_DEG: f64 = 10.0;
/// Largest translation applied during augmentation, in pixels either way.
pub const SHIFT_MAX: i32 = 2;
/// Standard deviation of the smoothing kernel.
pub const GAUSSIAN_SIGMA: f64 = 0.3;

/// Rotation pivot. The 28-pixel grid has no center pixel, so the pivot sits
/// between the two middle pixels.
const IMAGE_CENTER: f64 = (IMAGE_DIM as f64 - 1.0) / 2.0;

/// Rotates a 28x28 image about its center by `angle` degrees.
///
/// Output pixels are inverse-mapped into the source and sampled bilinearly;
/// source coordinates outside `[0, dim-1)` produce zero.
#[must_use]
pub fn rotate_image(input: &[u8], angle: f64) -> Vec<u8> {
    assert_eq!(input.len(), INPUT_SIZE, "Image must be INPUT_SIZE bytes");

    let radians = angle.to_radians();
    let (sin_theta, cos_theta) = radians.sin_cos();
    let mut output = vec![0u8; INPUT_SIZE];

    for y in 0..IMAGE_DIM {
        for x in 0..IMAGE_DIM {
            let xc = x as f64 - IMAGE_CENTER;
            let yc = y as f64 - IMAGE_CENTER;
            let xr = xc * cos_theta - yc * sin_theta + IMAGE_CENTER;
            let yr = xc * sin_theta + yc * cos_theta + IMAGE_CENTER;

            let limit = (IMAGE_DIM - 1) as f64;
            if xr >= 0.0 && xr < limit && yr >= 0.0 && yr < limit {
                let x0 = xr as usize;
                let y0 = yr as usize;
                let dx = xr - x0 as f64;
                let dy = yr - y0 as f64;

                let v00 = f64::from(input[y0 * IMAGE_DIM + x0]);
                let v01 = f64::from(input[y0 * IMAGE_DIM + x0 + 1]);
                let v10 = f64::from(input[(y0 + 1) * IMAGE_DIM + x0]);
                let v11 = f64::from(input[(y0 + 1) * IMAGE_DIM + x0 + 1]);

                let value = v00 * (1.0 - dx) * (1.0 - dy)
                    + v01 * dx * (1.0 - dy)
                    + v10 * (1.0 - dx) * dy
                    + v11 * dx * dy;
                output[y * IMAGE_DIM + x] = value as u8;
            }
        }
    }

    output
}

/// Translates the image by whole pixels, zero-filling vacated cells and
/// dropping pixels shifted out of frame.
#[must_use]
pub fn shift_image(input: &[u8], shift_x: i32, shift_y: i32) -> Vec<u8> {
    assert_eq!(input.len(), INPUT_SIZE, "Image must be INPUT_SIZE bytes");

    let mut output = vec![0u8; INPUT_SIZE];
    let dim = IMAGE_DIM as i32;

    for y in 0..dim {
        for x in 0..dim {
            let new_x = x + shift_x;
            let new_y = y + shift_y;
            if (0..dim).contains(&new_x) && (0..dim).contains(&new_y) {
                output[(new_y * dim + new_x) as usize] = input[(y * dim + x) as usize];
            }
        }
    }

    output
}

/// Builds the truncated, renormalized smoothing kernel for `sigma`.
///
/// The kernel spans `floor(6 sigma)` cells rounded up to odd, so a small sigma
/// collapses to a 1x1 identity kernel. Weights always sum to 1.
fn gaussian_kernel(sigma: f64) -> (Vec<f64>, usize) {
    assert!(sigma > 0.0, "Sigma must be positive");

    let mut size = (6.0 * sigma) as usize;
    if size % 2 == 0 {
        size += 1;
    }
    let half = (size / 2) as i32;

    let mut kernel = Vec::with_capacity(size * size);
    let mut sum = 0.0;
    for y in -half..=half {
        for x in -half..=half {
            let weight = (-(f64::from(x * x + y * y)) / (2.0 * sigma * sigma)).exp();
            kernel.push(weight);
            sum += weight;
        }
    }
    for weight in &mut kernel {
        *weight /= sum;
    }

    (kernel, size)
}

/// Convolves a `[0,1]`-normalized image with an isotropic Gaussian,
/// zero-padding at the borders.
#[must_use]
pub fn gaussian_blur(input: &[f64], sigma: f64) -> Vec<f64> {
    assert_eq!(input.len(), INPUT_SIZE, "Image must be INPUT_SIZE values");

    let (kernel, size) = gaussian_kernel(sigma);
    let half = (size / 2) as i32;
    let dim = IMAGE_DIM as i32;
    let mut output = vec![0.0; INPUT_SIZE];

    for y in 0..dim {
        for x in 0..dim {
            let mut value = 0.0;
            for ky in -half..=half {
                for kx in -half..=half {
                    let py = y + ky;
                    let px = x + kx;
                    if (0..dim).contains(&px) && (0..dim).contains(&py) {
                        let weight = kernel[((ky + half) * size as i32 + kx + half) as usize];
                        value += input[(py * dim + px) as usize] * weight;
                    }
                }
            }
            output[(y * dim + x) as usize] = value;
        }
    }

    output
}

/// Produces one randomly perturbed variant of an image.
///
/// Pipeline order is rotate, translate, smooth, then rescale with a saturating
/// clamp back to `[0, 255]`.
#[must_use]
pub fn augment_image(input: &[u8], rng: &mut impl Rng) -> Vec<u8> {
    let angle = rng.random_range(-ROTATION_MAX_DEG..=ROTATION_MAX_DEG);
    let rotated = rotate_image(input, angle);

    let shift_x = rng.random_range(-SHIFT_MAX..=SHIFT_MAX);
    let shift_y = rng.random_range(-SHIFT_MAX..=SHIFT_MAX);
    let shifted = shift_image(&rotated, shift_x, shift_y);

    let normalized: Vec<f64> = shifted.iter().map(|&p| f64::from(p) / 255.0).collect();
    let smoothed = gaussian_blur(&normalized, GAUSSIAN_SIGMA);

    smoothed
        .iter()
        .map(|&v| (v * 255.0).clamp(0.0, 255.0) as u8)
        .collect()
}

/// Builds the class-balanced augmented training set.
///
/// For each digit class, `samples_per_class` distinct source images are drawn
/// at random; each is emitted once verbatim and once through
/// [`augment_image`], so exactly half the output is untouched originals and
/// the per-class counts stay equal.
///
/// # Errors
///
/// Returns [`MnistError::NotEnoughSamples`] if any class has fewer than
/// `samples_per_class` source images.
pub fn build_augmented_dataset(
    source: &Dataset,
    samples_per_class: usize,
    rng: &mut impl Rng,
) -> Result<Dataset, MnistError> {
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); NUM_CLASSES];
    for i in 0..source.len() {
        let label = source.label(i) as usize;
        if let Some(bucket) = by_class.get_mut(label) {
            bucket.push(i);
        }
    }

    for (digit, bucket) in by_class.iter().enumerate() {
        if bucket.len() < samples_per_class {
            return Err(MnistError::NotEnoughSamples {
                digit: digit as u8,
                available: bucket.len(),
                requested: samples_per_class,
            });
        }
    }

    let mut augmented = Dataset::with_capacity(2 * samples_per_class * NUM_CLASSES);
    for (digit, bucket) in by_class.iter_mut().enumerate() {
        let (selected, _) = bucket.partial_shuffle(rng, samples_per_class);
        for &idx in selected.iter() {
            augmented.push_sample(source.image(idx), digit as u8);
            augmented.push_sample(&augment_image(source.image(idx), rng), digit as u8);
        }
    }

    Ok(augmented)
}
