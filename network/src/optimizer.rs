//! Momentum stochastic gradient descent.

use crate::buffers::Gradients;
use crate::network::Network;
use tensor::Matrix;

/// Momentum SGD with one velocity accumulator per parameter tensor.
///
/// Each step applies `velocity = momentum * velocity - lr * gradient` followed
/// by `parameter += velocity`, identically and independently to all four
/// tensors. The learning rate is supplied per step so the training loop can
/// decay it between epochs.
pub struct MomentumSgd {
    momentum: f64,
    velocity: Gradients,
}

impl MomentumSgd {
    /// Creates an optimizer with zeroed velocity for the given topology.
    #[must_use]
    pub fn new(momentum: f64, input_size: usize, hidden_size: usize, output_size: usize) -> Self {
        Self {
            momentum,
            velocity: Gradients::zeros(input_size, hidden_size, output_size),
        }
    }

    #[must_use]
    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    /// Applies one momentum update to every parameter tensor of `network`.
    pub fn step(&mut self, network: &mut Network, grads: &Gradients, learning_rate: f64) {
        update_tensor(
            &mut network.hidden_weights,
            &mut self.velocity.hidden_weights,
            &grads.hidden_weights,
            self.momentum,
            learning_rate,
        );
        update_tensor(
            &mut network.hidden_bias,
            &mut self.velocity.hidden_bias,
            &grads.hidden_bias,
            self.momentum,
            learning_rate,
        );
        update_tensor(
            &mut network.output_weights,
            &mut self.velocity.output_weights,
            &grads.output_weights,
            self.momentum,
            learning_rate,
        );
        update_tensor(
            &mut network.output_bias,
            &mut self.velocity.output_bias,
            &grads.output_bias,
            self.momentum,
            learning_rate,
        );
    }
}

fn update_tensor(
    param: &mut Matrix,
    velocity: &mut Matrix,
    grad: &Matrix,
    momentum: f64,
    learning_rate: f64,
) {
    assert_eq!(param.rows(), grad.rows(), "Gradient shape must match");
    assert_eq!(param.cols(), grad.cols(), "Gradient shape must match");

    for ((p, v), &g) in param
        .data_mut()
        .iter_mut()
        .zip(velocity.data_mut().iter_mut())
        .zip(grad.data().iter())
    {
        *v = momentum * *v - learning_rate * g;
        *p += *v;
    }
}
