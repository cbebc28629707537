use crate::idx::MnistError;
use crate::INPUT_SIZE;
use rand::Rng;

/// A labeled image collection stored as two parallel flat buffers.
///
/// Images are `INPUT_SIZE` bytes each, concatenated in sample order; labels
/// hold one class byte per sample at the same index. Samples are immutable
/// once produced; the only mutation the dataset supports is an in-place
/// shuffle that keeps the two buffers aligned.
#[derive(Debug, Clone)]
pub struct Dataset {
    images: Vec<u8>,
    labels: Vec<u8>,
}

impl Dataset {
    /// Builds a dataset from pre-filled flat buffers.
    ///
    /// # Errors
    ///
    /// Returns [`MnistError::DataMismatch`] if the image buffer is not exactly
    /// `INPUT_SIZE` bytes per label.
    pub fn from_parts(images: Vec<u8>, labels: Vec<u8>) -> Result<Self, MnistError> {
        if images.len() != labels.len() * INPUT_SIZE {
            return Err(MnistError::DataMismatch(format!(
                "image buffer holds {} bytes, expected {} for {} labels",
                images.len(),
                labels.len() * INPUT_SIZE,
                labels.len()
            )));
        }
        Ok(Self { images, labels })
    }

    /// An empty dataset with room reserved for `capacity` samples.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            images: Vec::with_capacity(capacity * INPUT_SIZE),
            labels: Vec::with_capacity(capacity),
        }
    }

    /// Appends one sample.
    pub fn push_sample(&mut self, image: &[u8], label: u8) {
        assert_eq!(image.len(), INPUT_SIZE, "Image must be INPUT_SIZE bytes");
        self.images.extend_from_slice(image);
        self.labels.push(label);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Pixel bytes of the `i`-th image.
    #[must_use]
    pub fn image(&self, i: usize) -> &[u8] {
        &self.images[i * INPUT_SIZE..(i + 1) * INPUT_SIZE]
    }

    #[must_use]
    pub fn label(&self, i: usize) -> u8 {
        self.labels[i]
    }

    /// Image bytes for the contiguous sample range `[start, start + count)`.
    #[must_use]
    pub fn image_range(&self, start: usize, count: usize) -> &[u8] {
        &self.images[start * INPUT_SIZE..(start + count) * INPUT_SIZE]
    }

    /// Labels for the contiguous sample range `[start, start + count)`.
    #[must_use]
    pub fn label_range(&self, start: usize, count: usize) -> &[u8] {
        &self.labels[start..start + count]
    }

    /// Fisher–Yates shuffle of both buffers in lockstep.
    pub fn shuffle(&mut self, rng: &mut impl Rng) {
        for i in (1..self.len()).rev() {
            let j = rng.random_range(0..=i);
            if i == j {
                continue;
            }
            for k in 0..INPUT_SIZE {
                self.images.swap(i * INPUT_SIZE + k, j * INPUT_SIZE + k);
            }
            self.labels.swap(i, j);
        }
    }
}
