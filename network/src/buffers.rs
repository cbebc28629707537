use tensor::Matrix;

/// Gradients of all four parameter tensors for one batch.
///
/// Shapes mirror the parameters they belong to; every value is a batch mean,
/// not a batch sum, so the effective learning-rate scale is independent of the
/// batch size.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub hidden_weights: Matrix,
    pub hidden_bias: Matrix,
    pub output_weights: Matrix,
    pub output_bias: Matrix,
}

impl Gradients {
    #[must_use]
    pub fn zeros(input_size: usize, hidden_size: usize, output_size: usize) -> Self {
        Self {
            hidden_weights: Matrix::zeros(input_size, hidden_size),
            hidden_bias: Matrix::zeros(1, hidden_size),
            output_weights: Matrix::zeros(hidden_size, output_size),
            output_bias: Matrix::zeros(1, output_size),
        }
    }
}

/// Reusable scratch tensors for one training step.
///
/// The arena is allocated once by the training loop, sized to the batch, and
/// overwritten on every step; it is never resized during a run. Engines borrow
/// it mutably, so no two steps can overlap.
#[derive(Debug)]
pub struct BatchBuffers {
    /// Normalized input batch, `batch_size x input_size`.
    pub input: Matrix,
    /// One-hot targets, `batch_size x output_size`.
    pub targets: Matrix,
    /// True class labels for the batch.
    pub labels: Vec<u8>,
    /// Hidden activations after ReLU, `batch_size x hidden_size`.
    pub hidden: Matrix,
    /// Output probabilities after softmax, `batch_size x output_size`.
    pub output: Matrix,
    /// Backpropagated hidden-layer error, `batch_size x hidden_size`.
    pub hidden_error: Matrix,
    /// Softmax/cross-entropy output error, `batch_size x output_size`.
    pub output_error: Matrix,
    /// Parameter gradients accumulated from this batch.
    pub grads: Gradients,
}

impl BatchBuffers {
    #[must_use]
    pub fn new(
        batch_size: usize,
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
    ) -> Self {
        Self {
            input: Matrix::zeros(batch_size, input_size),
            targets: Matrix::zeros(batch_size, output_size),
            labels: vec![0; batch_size],
            hidden: Matrix::zeros(batch_size, hidden_size),
            output: Matrix::zeros(batch_size, output_size),
            hidden_error: Matrix::zeros(batch_size, hidden_size),
            output_error: Matrix::zeros(batch_size, output_size),
            grads: Gradients::zeros(input_size, hidden_size, output_size),
        }
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.input.rows()
    }

    /// Fills the input and target buffers from raw sample bytes.
    ///
    /// Pixel intensities are normalized to `[0, 1]`; labels are one-hot
    /// encoded into the target matrix and kept verbatim for accuracy checks.
    pub fn load(&mut self, images: &[u8], labels: &[u8]) {
        let batch_size = self.batch_size();
        assert_eq!(labels.len(), batch_size, "Label count must match batch");
        assert_eq!(
            images.len(),
            batch_size * self.input.cols(),
            "Image bytes must match batch"
        );

        for (value, &pixel) in self.input.data_mut().iter_mut().zip(images.iter()) {
            *value = f64::from(pixel) / 255.0;
        }

        self.targets.fill(0.0);
        for (i, &label) in labels.iter().enumerate() {
            self.targets.set(i, label as usize, 1.0);
        }
        self.labels.copy_from_slice(labels);
    }
}
