//! Training loop for the digit-recognition network.
//!
//! The trainer owns the network, the momentum optimizer, the batch scratch
//! arena and the process RNG for the duration of one run. Each epoch shuffles
//! the dataset in place, walks it in whole batches (a trailing partial batch
//! is dropped), and checkpoints the network whenever the epoch accuracy sets a
//! new best. Training ends when the epoch budget is exhausted or accuracy has
//! not improved for `patience` consecutive epochs.

use crate::config::TrainingConfig;
use crate::history::TrainingHistory;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use mnist::Dataset;
use network::metrics::{batch_accuracy, batch_loss};
use network::{BatchBuffers, Checkpoint, MomentumSgd, Network};
use rand::rngs::StdRng;
use thiserror::Error;

/// Errors that abort a training run.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// The dataset cannot fill even one batch.
    #[error("dataset holds {samples} samples, need at least one batch of {batch_size}")]
    DatasetTooSmall { samples: usize, batch_size: usize },
    /// A batch produced a non-finite loss, so the gradients are corrupt.
    #[error("non-finite loss at epoch {epoch}, batch {batch}")]
    NonFiniteLoss { epoch: u32, batch: usize },
}

/// Patience counter for the early-stopping transition.
struct EarlyStopping {
    patience: u32,
    stale_epochs: u32,
}

impl EarlyStopping {
    fn new(patience: u32) -> Self {
        Self {
            patience,
            stale_epochs: 0,
        }
    }

    /// Feeds one epoch-end observation; returns `true` when training should
    /// stop.
    fn observe(&mut self, improved: bool) -> bool {
        if improved {
            self.stale_epochs = 0;
            return false;
        }
        self.stale_epochs += 1;
        self.stale_epochs >= self.patience
    }
}

/// Trainer manages the network training process.
pub struct Trainer {
    network: Network,
    optimizer: MomentumSgd,
    buffers: BatchBuffers,
    config: TrainingConfig,
    history: TrainingHistory,
    rng: StdRng,
}

impl Trainer {
    /// Creates a trainer around an initialized network.
    ///
    /// The RNG continues the process-wide stream used for weight init and
    /// augmentation, so a single seed reproduces the entire run.
    pub fn new(config: TrainingConfig, network: Network, rng: StdRng) -> Self {
        let optimizer = MomentumSgd::new(
            config.momentum,
            network.input_size(),
            network.hidden_size(),
            network.output_size(),
        );
        let buffers = BatchBuffers::new(
            config.batch_size,
            network.input_size(),
            network.hidden_size(),
            network.output_size(),
        );

        Self {
            network,
            optimizer,
            buffers,
            config,
            history: TrainingHistory::new(),
            rng,
        }
    }

    /// Returns the training history containing accuracy and loss metrics.
    pub fn history(&self) -> &TrainingHistory {
        &self.history
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Runs the training loop over `data`.
    ///
    /// The dataset is shuffled in place every epoch. The best-so-far
    /// checkpoint is written to `config.checkpoint_path`; a failed checkpoint
    /// write is reported but does not abort training, since the in-memory
    /// state remains valid.
    pub fn train(&mut self, data: &mut Dataset) -> Result<(), TrainingError> {
        let batch_size = self.config.batch_size;
        // A zero interval from a config file would divide by zero; treat it
        // as "every batch".
        let print_interval = self.config.print_interval.max(1);
        let num_batches = data.len() / batch_size;
        if num_batches == 0 {
            return Err(TrainingError::DatasetTooSmall {
                samples: data.len(),
                batch_size,
            });
        }

        let multi_progress = MultiProgress::new();
        let epoch_style = create_progress_style(
            "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} Epoch {msg}",
        );
        let batch_style = create_progress_style(
            "{spinner:.yellow} [{elapsed_precise}] {bar:40.yellow/blue} {pos:>7}/{len:7} Batch {msg}",
        );

        let epoch_progress = multi_progress.add(ProgressBar::new(self.config.epochs as u64));
        let batch_progress = multi_progress.add(ProgressBar::new(num_batches as u64));
        epoch_progress.set_style(epoch_style);
        batch_progress.set_style(batch_style);

        let mut early_stopping = EarlyStopping::new(self.config.patience);

        for epoch in 1..=self.config.epochs {
            let learning_rate =
                self.config.base_learning_rate * self.config.lr_decay.powi(epoch as i32 - 1);

            data.shuffle(&mut self.rng);
            let mut epoch_loss = 0.0;
            let mut epoch_accuracy = 0.0;

            batch_progress.set_position(0);
            batch_progress.set_message(format!("in Epoch {epoch}"));

            for batch in 0..num_batches {
                let start = batch * batch_size;
                self.buffers.load(
                    data.image_range(start, batch_size),
                    data.label_range(start, batch_size),
                );

                self.network.forward(&mut self.buffers);
                let loss = batch_loss(&self.buffers.output, &self.buffers.labels);
                let accuracy = batch_accuracy(&self.buffers.output, &self.buffers.labels);
                if !loss.is_finite() {
                    return Err(TrainingError::NonFiniteLoss { epoch, batch });
                }
                epoch_loss += loss;
                epoch_accuracy += accuracy;

                self.network.backward(&mut self.buffers);
                self.optimizer
                    .step(&mut self.network, &self.buffers.grads, learning_rate);

                if batch % print_interval == 0 {
                    batch_progress.set_message(format!(
                        "in Epoch {epoch} - Loss: {loss:.4}, Accuracy: {:.2}%",
                        accuracy * 100.0
                    ));
                }
                batch_progress.inc(1);
            }

            epoch_loss /= num_batches as f64;
            epoch_accuracy /= num_batches as f64;

            let improved = self.history.record_epoch(epoch, epoch_accuracy, epoch_loss);
            epoch_progress.set_message(format!(
                "- Accuracy: {:.2}%, Loss: {epoch_loss:.4}",
                epoch_accuracy * 100.0
            ));
            epoch_progress.inc(1);

            if improved {
                if let Err(e) = Checkpoint::from_network(&self.network).save(&self.config.checkpoint_path)
                {
                    eprintln!("warning: failed to save checkpoint: {e}");
                }
            }

            if early_stopping.observe(improved) {
                epoch_progress.finish_with_message(format!(
                    "Early stopping at epoch {epoch} with best accuracy: {:.2}%",
                    self.history.best_accuracy * 100.0
                ));
                batch_progress.finish_and_clear();
                return Ok(());
            }
        }

        epoch_progress.finish_with_message("Training completed!");
        batch_progress.finish_and_clear();
        Ok(())
    }
}

/// Creates a progress bar style with the specified template.
fn create_progress_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap()
        .progress_chars("##-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnist::{Dataset, INPUT_SIZE, NUM_CLASSES};
    use rand::SeedableRng;
    use tempfile::tempdir;

    /// Two trivially separable patterns: blank images are class 0, bright
    /// images are class 1.
    fn toy_dataset(pairs: usize) -> Dataset {
        let mut data = Dataset::with_capacity(pairs * 2);
        for _ in 0..pairs {
            data.push_sample(&vec![0u8; INPUT_SIZE], 0);
            data.push_sample(&vec![255u8; INPUT_SIZE], 1);
        }
        data
    }

    fn toy_config(checkpoint_path: std::path::PathBuf) -> TrainingConfig {
        TrainingConfig {
            batch_size: 64,
            epochs: 80,
            hidden_size: 16,
            // Early stopping disabled: accuracy saturates at 1.0 long before
            // the loss target is reached.
            patience: 80,
            checkpoint_path,
            ..TrainingConfig::default()
        }
    }

    fn make_trainer(config: TrainingConfig) -> Trainer {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let network = Network::new(INPUT_SIZE, config.hidden_size, NUM_CLASSES, &mut rng);
        Trainer::new(config, network, rng)
    }

    #[test]
    fn test_early_stopping_counter() {
        let mut stopper = EarlyStopping::new(3);

        // Strictly decreasing accuracy: no improvements at all.
        assert!(!stopper.observe(false));
        assert!(!stopper.observe(false));
        assert!(stopper.observe(false), "must stop exactly at patience");
    }

    #[test]
    fn test_early_stopping_resets_on_improvement() {
        let mut stopper = EarlyStopping::new(2);

        assert!(!stopper.observe(false));
        assert!(!stopper.observe(true));
        assert!(!stopper.observe(false));
        assert!(stopper.observe(false));
    }

    #[test]
    fn test_dataset_too_small() {
        let dir = tempdir().unwrap();
        let mut trainer = make_trainer(toy_config(dir.path().join("weights.json")));

        let mut data = toy_dataset(4); // 8 samples, batch size 64
        let result = trainer.train(&mut data);
        assert!(matches!(
            result,
            Err(TrainingError::DatasetTooSmall { samples: 8, .. })
        ));
    }

    #[test]
    fn test_partial_trailing_batch_is_dropped() {
        let dir = tempdir().unwrap();
        let mut config = toy_config(dir.path().join("weights.json"));
        config.epochs = 1;
        config.patience = 1;
        let mut trainer = make_trainer(config);

        // 96 samples with batch size 64: one whole batch, 32 dropped.
        let mut data = toy_dataset(48);
        trainer.train(&mut data).unwrap();

        assert_eq!(trainer.history().accuracies.len(), 1);
    }

    #[test]
    fn test_end_to_end_toy_convergence() {
        let dir = tempdir().unwrap();
        let checkpoint_path = dir.path().join("weights.json");
        let mut trainer = make_trainer(toy_config(checkpoint_path.clone()));

        let mut data = toy_dataset(64); // 128 samples, two batches per epoch
        trainer.train(&mut data).unwrap();

        let history = trainer.history();
        assert_eq!(history.best_accuracy, 1.0);
        let final_loss = *history.losses.last().unwrap();
        assert!(final_loss < 0.1, "final loss {final_loss} not converged");

        // The persisted checkpoint is the best state: it must reproduce the
        // perfect accuracy when restored.
        let restored = Network::from_checkpoint(Checkpoint::load(&checkpoint_path).unwrap()).unwrap();
        let mut bufs = BatchBuffers::new(64, INPUT_SIZE, 16, NUM_CLASSES);
        bufs.load(data.image_range(0, 64), data.label_range(0, 64));
        restored.forward(&mut bufs);
        assert_eq!(batch_accuracy(&bufs.output, &bufs.labels), 1.0);
    }

    #[test]
    fn test_training_run_stops_early_and_keeps_best_checkpoint() {
        let dir = tempdir().unwrap();
        let checkpoint_path = dir.path().join("weights.json");
        let mut config = toy_config(checkpoint_path.clone());
        // The epoch budget is far larger than convergence needs, so the only
        // way out of the loop is the patience transition.
        config.epochs = 50;
        config.patience = 2;
        let mut trainer = make_trainer(config);

        let mut data = toy_dataset(64);
        trainer.train(&mut data).unwrap();

        let history = trainer.history();
        assert_eq!(history.best_accuracy, 1.0);
        assert!(
            (history.accuracies.len() as u32) < 50,
            "training must stop before the epoch budget"
        );
        // Accuracy saturates, so every epoch after the best is stale and the
        // run ends exactly `patience` epochs later.
        assert_eq!(
            history.accuracies.len() as u32,
            history.best_epoch + 2,
            "run must end patience epochs after the last improvement"
        );

        // The checkpoint on disk is the best-epoch state and must reproduce
        // its predictions.
        let restored = Network::from_checkpoint(Checkpoint::load(&checkpoint_path).unwrap()).unwrap();
        let mut bufs = BatchBuffers::new(64, INPUT_SIZE, 16, NUM_CLASSES);
        bufs.load(data.image_range(0, 64), data.label_range(0, 64));
        restored.forward(&mut bufs);
        assert_eq!(batch_accuracy(&bufs.output, &bufs.labels), 1.0);
    }

    #[test]
    fn test_zero_print_interval_does_not_panic() {
        let dir = tempdir().unwrap();
        let mut config = toy_config(dir.path().join("weights.json"));
        config.epochs = 1;
        config.patience = 1;
        config.print_interval = 0;
        let mut trainer = make_trainer(config);

        let mut data = toy_dataset(32);
        trainer.train(&mut data).unwrap();
        assert_eq!(trainer.history().accuracies.len(), 1);
    }

    #[test]
    fn test_checkpoint_failure_is_not_fatal() {
        // A checkpoint path inside a nonexistent directory cannot be written,
        // but training must still run to completion.
        let mut config = toy_config("/nonexistent-dir/weights.json".into());
        config.epochs = 2;
        config.patience = 2;
        let mut trainer = make_trainer(config);

        let mut data = toy_dataset(32);
        trainer.train(&mut data).unwrap();
        assert!(!trainer.history().accuracies.is_empty());
    }
}
