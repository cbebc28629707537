use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration parameters for neural network training.
///
/// Defaults reproduce the reference digit-recognition run; every field can be
/// overridden programmatically or through a JSON config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Size of each training batch. A trailing partial batch is dropped.
    pub batch_size: usize,
    /// Number of training epochs.
    pub epochs: u32,
    /// Number of nodes in the hidden layer.
    pub hidden_size: usize,
    /// Source images drawn per digit class when building the augmented set.
    pub samples_per_digit: usize,
    /// Learning rate at epoch zero.
    pub base_learning_rate: f64,
    /// Per-epoch multiplicative learning-rate decay.
    pub lr_decay: f64,
    /// Momentum coefficient for the optimizer.
    pub momentum: f64,
    /// Number of epochs without an accuracy improvement before stopping.
    pub patience: u32,
    /// Seed for the process-wide random stream.
    pub seed: u64,
    /// Batches between progress-message refreshes.
    pub print_interval: usize,
    /// Where the best-so-far checkpoint is written.
    pub checkpoint_path: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            epochs: 10,
            hidden_size: 256,
            samples_per_digit: 1500,
            base_learning_rate: 0.1,
            lr_decay: 0.95,
            momentum: 0.9,
            patience: 3,
            seed: 42,
            print_interval: 50,
            checkpoint_path: PathBuf::from("weights.json"),
        }
    }
}

impl TrainingConfig {
    /// Loads a configuration from a JSON file; absent fields keep their
    /// defaults.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let config_str = fs::read_to_string(path)?;
        let config: TrainingConfig = serde_json::from_str(&config_str)?;
        Ok(config)
    }
}
