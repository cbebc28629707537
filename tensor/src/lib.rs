// Modules
pub mod backend;
mod macros;
pub mod matrix;

pub use backend::{Gemm, NaiveGemm, ParallelGemm};
pub use matrix::Matrix;
