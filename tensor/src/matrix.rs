use serde::{Deserialize, Serialize};
use std::fmt;

/// A dense row-major matrix of `f64` values.
///
/// The element at `(row, col)` lives at `row * cols + col` in the backing
/// vector. That layout is a contract: the weight checkpoints written by the
/// training engine index their arrays the same way, so the inference side can
/// embed them without any reshuffling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Matrix {
    pub(crate) rows: usize,
    pub(crate) cols: usize,
    pub(crate) data: Vec<f64>,
}

impl Matrix {
    #[must_use]
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "Data length must match rows * cols"
        );
        Self { rows, cols, data }
    }

    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    #[inline(always)]
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline(always)]
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline(always)]
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Returns the `i`-th row as a slice.
    #[inline]
    #[must_use]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    #[inline]
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// Overwrites every element with `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Multiplies every element by `factor` in place.
    pub fn scale(&mut self, factor: f64) {
        for value in &mut self.data {
            *value *= factor;
        }
    }

    /// Applies `f` to every element in place.
    pub fn map_inplace<F>(&mut self, f: F)
    where
        F: Fn(f64) -> f64,
    {
        for value in &mut self.data {
            *value = f(*value);
        }
    }

    #[must_use]
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64,
    {
        let data = self.data.iter().map(|&x| f(x)).collect();

        Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }

    /// Element-wise `self -= other`.
    pub fn sub_assign(&mut self, other: &Matrix) {
        assert_eq!(self.rows, other.rows, "Matrix rows must match");
        assert_eq!(self.cols, other.cols, "Matrix columns must match");

        for (a, &b) in self.data.iter_mut().zip(other.data.iter()) {
            *a -= b;
        }
    }

    /// Element-wise `self *= other` (Hadamard product).
    pub fn mul_assign(&mut self, other: &Matrix) {
        assert_eq!(self.rows, other.rows, "Matrix rows must match");
        assert_eq!(self.cols, other.cols, "Matrix columns must match");

        for (a, &b) in self.data.iter_mut().zip(other.data.iter()) {
            *a *= b;
        }
    }

    /// Adds `row` to every row of the matrix.
    pub fn add_row_broadcast(&mut self, row: &[f64]) {
        assert_eq!(self.cols, row.len(), "Row length must match matrix columns");

        for chunk in self.data.chunks_exact_mut(self.cols) {
            for (a, &b) in chunk.iter_mut().zip(row.iter()) {
                *a += b;
            }
        }
    }

    /// The mean of each column, reducing over the row dimension.
    #[must_use]
    pub fn column_means(&self) -> Vec<f64> {
        let mut means = vec![0.0; self.cols];
        for chunk in self.data.chunks_exact(self.cols) {
            for (m, &v) in means.iter_mut().zip(chunk.iter()) {
                *m += v;
            }
        }
        let scale = 1.0 / self.rows as f64;
        for m in &mut means {
            *m *= scale;
        }
        means
    }

    #[must_use]
    pub fn transpose(&self) -> Self {
        let mut data = vec![0.0; self.rows * self.cols];

        for i in 0..self.rows {
            for j in 0..self.cols {
                data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }

        Matrix {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::zeros(0, 0)
    }
}

impl PartialEq for Matrix {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.cols == other.cols && self.data == other.data
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.rows {
            for j in 0..self.cols {
                write!(f, "{:8.4}", self.data[i * self.cols + j])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix;
    use approx::assert_relative_eq;

    #[test]
    fn test_row_major_layout() {
        let m = matrix![
            1.0, 2.0, 3.0;
            4.0, 5.0, 6.0
        ];
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.data(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(m.get(1, 2), 6.0);
        assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_sub_assign() {
        let mut a = matrix![
            5.0, 6.0;
            7.0, 8.0
        ];
        let b = matrix![
            1.0, 2.0;
            3.0, 4.0
        ];

        a.sub_assign(&b);

        let expected = matrix![
            4.0, 4.0;
            4.0, 4.0
        ];
        assert_eq!(a, expected);
    }

    #[test]
    fn test_mul_assign() {
        let mut a = Matrix::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        let b = Matrix::new(2, 2, vec![5.0, 6.0, 7.0, 8.0]);

        a.mul_assign(&b);

        assert_eq!(a, Matrix::new(2, 2, vec![5.0, 12.0, 21.0, 32.0]));
    }

    #[test]
    #[should_panic(expected = "Matrix columns must match")]
    fn test_sub_assign_different_dimensions() {
        let mut a = matrix![
            1.0, 2.0;
            3.0, 4.0
        ];
        let b = matrix![
            5.0, 6.0, 7.0;
            8.0, 9.0, 10.0
        ];

        a.sub_assign(&b);
    }

    #[test]
    fn test_add_row_broadcast() {
        let mut m = matrix![
            1.0, 2.0;
            3.0, 4.0;
            5.0, 6.0
        ];

        m.add_row_broadcast(&[10.0, 20.0]);

        let expected = matrix![
            11.0, 22.0;
            13.0, 24.0;
            15.0, 26.0
        ];
        assert_eq!(m, expected);
    }

    #[test]
    fn test_column_means() {
        let m = matrix![
            1.0, 2.0;
            3.0, 4.0;
            5.0, 6.0
        ];

        let means = m.column_means();

        assert_relative_eq!(means[0], 3.0);
        assert_relative_eq!(means[1], 4.0);
    }

    #[test]
    fn test_transpose_2x3() {
        let m = matrix![
            1.0, 2.0, 3.0;
            4.0, 5.0, 6.0
        ];
        let transposed = m.transpose();

        let expected = matrix![
            1.0, 4.0;
            2.0, 5.0;
            3.0, 6.0
        ];
        assert_eq!(transposed, expected);
    }

    #[test]
    fn test_map_and_scale() {
        let mut m = Matrix::new(2, 2, vec![1.0, -2.0, 3.0, -4.0]);

        let squared = m.map(|x| x * x);
        assert_eq!(squared, Matrix::new(2, 2, vec![1.0, 4.0, 9.0, 16.0]));

        m.scale(2.0);
        assert_eq!(m, Matrix::new(2, 2, vec![2.0, -4.0, 6.0, -8.0]));
    }

    #[test]
    fn test_fill() {
        let mut m = Matrix::zeros(2, 3);
        m.fill(7.0);
        assert!(m.data().iter().all(|&x| x == 7.0));
    }
}
