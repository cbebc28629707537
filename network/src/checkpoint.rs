//! Weight checkpoint artifact.
//!
//! A checkpoint is a self-contained, human-diffable JSON document holding the
//! three size constants and the four parameter tensors in the same row-major
//! layout the forward pass indexes. Saving overwrites any prior checkpoint at
//! the same path, so only the best state seen so far is retained on disk;
//! loading reconstructs an equivalent network with no extra parsing.

use crate::network::Network;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tensor::{Gemm, Matrix, ParallelGemm};
use thiserror::Error;

/// Errors raised while persisting or restoring a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// An array's length disagrees with the declared size constants.
    #[error("{name} holds {actual} values, expected {expected}")]
    ShapeMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Serialized form of a trained [`Network`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    /// Row-major, indexed `input * hidden_size + hidden`.
    pub hidden_weights: Vec<f64>,
    pub hidden_bias: Vec<f64>,
    /// Row-major, indexed `hidden * output_size + output`.
    pub output_weights: Vec<f64>,
    pub output_bias: Vec<f64>,
}

impl Checkpoint {
    /// Snapshots the current network parameters.
    #[must_use]
    pub fn from_network(network: &Network) -> Self {
        Self {
            input_size: network.input_size(),
            hidden_size: network.hidden_size(),
            output_size: network.output_size(),
            hidden_weights: network.hidden_weights().data().to_vec(),
            hidden_bias: network.hidden_bias().data().to_vec(),
            output_weights: network.output_weights().data().to_vec(),
            output_bias: network.output_bias().data().to_vec(),
        }
    }

    /// Writes the checkpoint as pretty JSON, replacing any previous file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CheckpointError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reads a checkpoint back from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn check_len(
        name: &'static str,
        expected: usize,
        actual: usize,
    ) -> Result<(), CheckpointError> {
        if expected != actual {
            return Err(CheckpointError::ShapeMismatch {
                name,
                expected,
                actual,
            });
        }
        Ok(())
    }
}

impl Network {
    /// Reconstructs a network from a checkpoint, validating every array
    /// length against the declared size constants.
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Result<Self, CheckpointError> {
        Self::from_checkpoint_with_backend(checkpoint, Box::new(ParallelGemm))
    }

    /// As [`Network::from_checkpoint`], but with an explicit matmul backend.
    pub fn from_checkpoint_with_backend(
        checkpoint: Checkpoint,
        backend: Box<dyn Gemm>,
    ) -> Result<Self, CheckpointError> {
        let Checkpoint {
            input_size,
            hidden_size,
            output_size,
            hidden_weights,
            hidden_bias,
            output_weights,
            output_bias,
        } = checkpoint;

        Checkpoint::check_len(
            "hidden_weights",
            input_size * hidden_size,
            hidden_weights.len(),
        )?;
        Checkpoint::check_len("hidden_bias", hidden_size, hidden_bias.len())?;
        Checkpoint::check_len(
            "output_weights",
            hidden_size * output_size,
            output_weights.len(),
        )?;
        Checkpoint::check_len("output_bias", output_size, output_bias.len())?;

        Ok(Self {
            input_size,
            hidden_size,
            output_size,
            hidden_weights: Matrix::new(input_size, hidden_size, hidden_weights),
            hidden_bias: Matrix::new(1, hidden_size, hidden_bias),
            output_weights: Matrix::new(hidden_size, output_size, output_weights),
            output_bias: Matrix::new(1, output_size, output_bias),
            backend,
        })
    }
}
