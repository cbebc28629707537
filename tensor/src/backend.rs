//! Interchangeable dense matrix-multiply backends.
//!
//! The forward and backward passes of the network are expressed in terms of
//! three product shapes: `A·B`, `Aᵗ·B` and `A·Bᵗ`. A [`Gemm`] implementation
//! supplies all three, writing into a caller-owned output matrix so the hot
//! loop never allocates. Callers must not depend on which backend is active,
//! only on the numeric results agreeing within floating-point tolerance.

use crate::matrix::Matrix;
use rayon::prelude::*;

/// Dense matrix product kernels writing into a preallocated output.
pub trait Gemm: Send + Sync {
    /// `out = a · b` where `a` is `m×k`, `b` is `k×n` and `out` is `m×n`.
    fn gemm(&self, a: &Matrix, b: &Matrix, out: &mut Matrix);

    /// `out = aᵗ · b` where `a` is `k×m`, `b` is `k×n` and `out` is `m×n`.
    fn gemm_at_b(&self, a: &Matrix, b: &Matrix, out: &mut Matrix);

    /// `out = a · bᵗ` where `a` is `m×k`, `b` is `n×k` and `out` is `m×n`.
    fn gemm_a_bt(&self, a: &Matrix, b: &Matrix, out: &mut Matrix);
}

fn check_gemm_dims(a: &Matrix, b: &Matrix, out: &Matrix) {
    assert_eq!(a.cols(), b.rows(), "Inner dimensions must match");
    assert_eq!(out.rows(), a.rows(), "Output rows must match lhs rows");
    assert_eq!(out.cols(), b.cols(), "Output columns must match rhs columns");
}

fn check_at_b_dims(a: &Matrix, b: &Matrix, out: &Matrix) {
    assert_eq!(a.rows(), b.rows(), "Reduction dimensions must match");
    assert_eq!(out.rows(), a.cols(), "Output rows must match lhs columns");
    assert_eq!(out.cols(), b.cols(), "Output columns must match rhs columns");
}

fn check_a_bt_dims(a: &Matrix, b: &Matrix, out: &Matrix) {
    assert_eq!(a.cols(), b.cols(), "Inner dimensions must match");
    assert_eq!(out.rows(), a.rows(), "Output rows must match lhs rows");
    assert_eq!(out.cols(), b.rows(), "Output columns must match rhs rows");
}

/// Accumulates one output row of `a · b`.
#[inline]
fn gemm_row(a_row: &[f64], b: &Matrix, out_row: &mut [f64]) {
    out_row.fill(0.0);
    for (k, &aik) in a_row.iter().enumerate() {
        if aik == 0.0 {
            continue;
        }
        for (o, &bkj) in out_row.iter_mut().zip(b.row(k).iter()) {
            *o += aik * bkj;
        }
    }
}

/// Accumulates row `i` of `aᵗ · b`, reducing over all rows of `a` and `b`.
#[inline]
fn at_b_row(a: &Matrix, b: &Matrix, i: usize, out_row: &mut [f64]) {
    out_row.fill(0.0);
    for k in 0..a.rows() {
        let aki = a.get(k, i);
        if aki == 0.0 {
            continue;
        }
        for (o, &bkj) in out_row.iter_mut().zip(b.row(k).iter()) {
            *o += aki * bkj;
        }
    }
}

/// Accumulates one output row of `a · bᵗ` as dot products of row slices.
#[inline]
fn a_bt_row(a_row: &[f64], b: &Matrix, out_row: &mut [f64]) {
    for (j, o) in out_row.iter_mut().enumerate() {
        *o = a_row
            .iter()
            .zip(b.row(j).iter())
            .map(|(&x, &y)| x * y)
            .sum();
    }
}

/// Straightforward scalar loops. The reference backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct NaiveGemm;

impl Gemm for NaiveGemm {
    fn gemm(&self, a: &Matrix, b: &Matrix, out: &mut Matrix) {
        check_gemm_dims(a, b, out);
        let n = out.cols();
        for (i, out_row) in out.data_mut().chunks_exact_mut(n).enumerate() {
            gemm_row(a.row(i), b, out_row);
        }
    }

    fn gemm_at_b(&self, a: &Matrix, b: &Matrix, out: &mut Matrix) {
        check_at_b_dims(a, b, out);
        let n = out.cols();
        for (i, out_row) in out.data_mut().chunks_exact_mut(n).enumerate() {
            at_b_row(a, b, i, out_row);
        }
    }

    fn gemm_a_bt(&self, a: &Matrix, b: &Matrix, out: &mut Matrix) {
        check_a_bt_dims(a, b, out);
        let n = out.cols();
        for (i, out_row) in out.data_mut().chunks_exact_mut(n).enumerate() {
            a_bt_row(a.row(i), b, out_row);
        }
    }
}

/// Rayon-parallel variant. Each worker owns a disjoint slice of output rows,
/// so the fan-out is data-race free by construction.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParallelGemm;

impl Gemm for ParallelGemm {
    fn gemm(&self, a: &Matrix, b: &Matrix, out: &mut Matrix) {
        check_gemm_dims(a, b, out);
        let n = out.cols();
        out.data_mut()
            .par_chunks_exact_mut(n)
            .enumerate()
            .for_each(|(i, out_row)| gemm_row(a.row(i), b, out_row));
    }

    fn gemm_at_b(&self, a: &Matrix, b: &Matrix, out: &mut Matrix) {
        check_at_b_dims(a, b, out);
        let n = out.cols();
        out.data_mut()
            .par_chunks_exact_mut(n)
            .enumerate()
            .for_each(|(i, out_row)| at_b_row(a, b, i, out_row));
    }

    fn gemm_a_bt(&self, a: &Matrix, b: &Matrix, out: &mut Matrix) {
        check_a_bt_dims(a, b, out);
        let n = out.cols();
        out.data_mut()
            .par_chunks_exact_mut(n)
            .enumerate()
            .for_each(|(i, out_row)| a_bt_row(a.row(i), b, out_row));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_matrix(rng: &mut StdRng, rows: usize, cols: usize) -> Matrix {
        let data = (0..rows * cols)
            .map(|_| rng.random_range(-1.0..1.0))
            .collect();
        Matrix::new(rows, cols, data)
    }

    #[test]
    fn test_gemm_known_product() {
        let a = matrix![
            1.0, 2.0, 3.0;
            4.0, 5.0, 6.0
        ];
        let b = matrix![
            7.0, 8.0;
            9.0, 10.0;
            11.0, 12.0
        ];
        let mut out = Matrix::zeros(2, 2);

        NaiveGemm.gemm(&a, &b, &mut out);

        let expected = matrix![
            58.0, 64.0;
            139.0, 154.0
        ];
        assert_eq!(out, expected);
    }

    #[test]
    fn test_gemm_at_b_matches_explicit_transpose() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = random_matrix(&mut rng, 5, 3);
        let b = random_matrix(&mut rng, 5, 4);

        let mut out = Matrix::zeros(3, 4);
        NaiveGemm.gemm_at_b(&a, &b, &mut out);

        let mut expected = Matrix::zeros(3, 4);
        NaiveGemm.gemm(&a.transpose(), &b, &mut expected);

        for (x, y) in out.data().iter().zip(expected.data().iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gemm_a_bt_matches_explicit_transpose() {
        let mut rng = StdRng::seed_from_u64(11);
        let a = random_matrix(&mut rng, 4, 6);
        let b = random_matrix(&mut rng, 3, 6);

        let mut out = Matrix::zeros(4, 3);
        NaiveGemm.gemm_a_bt(&a, &b, &mut out);

        let mut expected = Matrix::zeros(4, 3);
        NaiveGemm.gemm(&a, &b.transpose(), &mut expected);

        for (x, y) in out.data().iter().zip(expected.data().iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_backends_agree() {
        let mut rng = StdRng::seed_from_u64(42);
        let a = random_matrix(&mut rng, 9, 17);
        let b = random_matrix(&mut rng, 17, 5);

        let mut naive = Matrix::zeros(9, 5);
        let mut parallel = Matrix::zeros(9, 5);
        NaiveGemm.gemm(&a, &b, &mut naive);
        ParallelGemm.gemm(&a, &b, &mut parallel);

        for (x, y) in naive.data().iter().zip(parallel.data().iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }

        let c = random_matrix(&mut rng, 9, 7);
        let mut naive_at = Matrix::zeros(17, 7);
        let mut parallel_at = Matrix::zeros(17, 7);
        // a is 9x17, c is 9x7: reduce over the batch dimension.
        NaiveGemm.gemm_at_b(&a, &c, &mut naive_at);
        ParallelGemm.gemm_at_b(&a, &c, &mut parallel_at);

        for (x, y) in naive_at.data().iter().zip(parallel_at.data().iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    #[should_panic(expected = "Inner dimensions must match")]
    fn test_gemm_dimension_mismatch() {
        let a = Matrix::zeros(2, 3);
        let b = Matrix::zeros(4, 2);
        let mut out = Matrix::zeros(2, 2);
        NaiveGemm.gemm(&a, &b, &mut out);
    }
}
