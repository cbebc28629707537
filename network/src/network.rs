//! The two-layer perceptron and its forward/backward computation.
//!
//! The network is a fixed topology: one dense hidden layer with ReLU and a
//! dense output layer with softmax. Both passes operate on whole batches and
//! write into the caller's [`BatchBuffers`] arena, so the training loop incurs
//! no per-batch allocation.

use crate::buffers::BatchBuffers;
use rand::Rng;
use rand_distr::StandardNormal;
use tensor::{Gemm, Matrix, ParallelGemm};

/// Weights and biases for the two dense layers.
///
/// Weight matrices are row-major with the input index as the row: the hidden
/// weight for `(input i, unit j)` lives at `i * hidden_size + j`, and likewise
/// for the output layer. The checkpoint format preserves exactly this layout.
pub struct Network {
    pub(crate) input_size: usize,
    pub(crate) hidden_size: usize,
    pub(crate) output_size: usize,
    pub(crate) hidden_weights: Matrix,
    pub(crate) hidden_bias: Matrix,
    pub(crate) output_weights: Matrix,
    pub(crate) output_bias: Matrix,
    pub(crate) backend: Box<dyn Gemm>,
}

#[inline]
fn relu(x: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Softmax over one row, with the max subtracted before exponentiating so
/// large scores cannot overflow.
fn softmax_row(row: &mut [f64]) {
    let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for value in row.iter_mut() {
        *value = (*value - max).exp();
        sum += *value;
    }
    for value in row.iter_mut() {
        *value /= sum;
    }
}

impl Network {
    /// Creates a network with He-initialized weights and zero biases.
    ///
    /// Weights are drawn from `N(0, 1)` scaled by `sqrt(2 / input_size)`. The
    /// rayon-parallel matmul backend is used by default.
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        rng: &mut impl Rng,
    ) -> Self {
        Self::with_backend(
            input_size,
            hidden_size,
            output_size,
            rng,
            Box::new(ParallelGemm),
        )
    }

    /// As [`Network::new`], but with an explicit matmul backend.
    pub fn with_backend(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        rng: &mut impl Rng,
        backend: Box<dyn Gemm>,
    ) -> Self {
        let scale = (2.0 / input_size as f64).sqrt();
        let mut init = |rows: usize, cols: usize| {
            let data = (0..rows * cols)
                .map(|_| rng.sample::<f64, _>(StandardNormal) * scale)
                .collect();
            Matrix::new(rows, cols, data)
        };

        let hidden_weights = init(input_size, hidden_size);
        let output_weights = init(hidden_size, output_size);

        Self {
            input_size,
            hidden_size,
            output_size,
            hidden_weights,
            hidden_bias: Matrix::zeros(1, hidden_size),
            output_weights,
            output_bias: Matrix::zeros(1, output_size),
            backend,
        }
    }

    #[must_use]
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    #[must_use]
    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    #[must_use]
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    #[must_use]
    pub fn hidden_weights(&self) -> &Matrix {
        &self.hidden_weights
    }

    #[must_use]
    pub fn hidden_bias(&self) -> &Matrix {
        &self.hidden_bias
    }

    #[must_use]
    pub fn output_weights(&self) -> &Matrix {
        &self.output_weights
    }

    #[must_use]
    pub fn output_bias(&self) -> &Matrix {
        &self.output_bias
    }

    /// Forward pass over the batch held in `bufs`.
    ///
    /// Computes ReLU hidden activations into `bufs.hidden` and softmax class
    /// probabilities into `bufs.output`; each output row sums to 1 within
    /// floating-point tolerance.
    pub fn forward(&self, bufs: &mut BatchBuffers) {
        let BatchBuffers {
            input,
            hidden,
            output,
            ..
        } = bufs;

        self.backend.gemm(input, &self.hidden_weights, hidden);
        hidden.add_row_broadcast(self.hidden_bias.data());
        hidden.map_inplace(relu);

        self.backend.gemm(hidden, &self.output_weights, output);
        output.add_row_broadcast(self.output_bias.data());
        for i in 0..output.rows() {
            softmax_row(output.row_mut(i));
        }
    }

    /// Backward pass for the batch most recently run through [`forward`].
    ///
    /// Leaves batch-mean gradients of all four parameter tensors in
    /// `bufs.grads`. Relies on `bufs.hidden` and `bufs.output` still holding
    /// the forward activations.
    ///
    /// [`forward`]: Network::forward
    pub fn backward(&self, bufs: &mut BatchBuffers) {
        let BatchBuffers {
            input,
            targets,
            hidden,
            output,
            hidden_error,
            output_error,
            grads,
            ..
        } = bufs;

        let batch_scale = 1.0 / input.rows() as f64;

        // Combined softmax + cross-entropy gradient: probabilities minus
        // one-hot targets.
        output_error.data_mut().copy_from_slice(output.data());
        output_error.sub_assign(targets);

        self.backend
            .gemm_at_b(hidden, output_error, &mut grads.output_weights);
        grads.output_weights.scale(batch_scale);
        grads
            .output_bias
            .data_mut()
            .copy_from_slice(&output_error.column_means());

        // Hidden error, masked by the ReLU derivative at the stored
        // activation.
        self.backend
            .gemm_a_bt(output_error, &self.output_weights, hidden_error);
        for (err, &act) in hidden_error.data_mut().iter_mut().zip(hidden.data()) {
            if act <= 0.0 {
                *err = 0.0;
            }
        }

        self.backend
            .gemm_at_b(input, hidden_error, &mut grads.hidden_weights);
        grads.hidden_weights.scale(batch_scale);
        grads
            .hidden_bias
            .data_mut()
            .copy_from_slice(&hidden_error.column_means());
    }
}
