//! Cross-entropy loss and top-1 accuracy for a predicted batch.

use tensor::Matrix;

/// Guard against `ln(0)` when a predicted probability collapses to zero.
pub const EPS: f64 = 1e-10;

/// Index of the largest value, ties broken by lowest index.
#[must_use]
pub fn argmax(row: &[f64]) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, &value) in row.iter().enumerate() {
        if value > best_value {
            best_value = value;
            best = i;
        }
    }
    best
}

/// Mean cross-entropy `-ln(p_true + EPS)` over the batch.
#[must_use]
pub fn batch_loss(output: &Matrix, labels: &[u8]) -> f64 {
    assert_eq!(output.rows(), labels.len(), "Label count must match batch");

    let total: f64 = labels
        .iter()
        .enumerate()
        .map(|(i, &label)| -(output.get(i, label as usize) + EPS).ln())
        .sum();
    total / labels.len() as f64
}

/// Fraction of samples whose argmax prediction equals the true label.
#[must_use]
pub fn batch_accuracy(output: &Matrix, labels: &[u8]) -> f64 {
    assert_eq!(output.rows(), labels.len(), "Label count must match batch");

    let correct = labels
        .iter()
        .enumerate()
        .filter(|&(i, &label)| argmax(output.row(i)) == label as usize)
        .count();
    correct as f64 / labels.len() as f64
}
