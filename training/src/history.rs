/// Training history containing metrics recorded during training.
#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    /// Accuracy values for each epoch, as fractions in `[0, 1]`.
    pub accuracies: Vec<f64>,
    /// Mean loss values for each epoch.
    pub losses: Vec<f64>,
    /// Best accuracy achieved during training.
    pub best_accuracy: f64,
    /// Epoch where best accuracy was achieved (1-based).
    pub best_epoch: u32,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one epoch's metrics. Returns `true` when the accuracy strictly
    /// exceeds the best seen so far.
    pub fn record_epoch(&mut self, epoch: u32, accuracy: f64, loss: f64) -> bool {
        self.accuracies.push(accuracy);
        self.losses.push(loss);

        if accuracy > self.best_accuracy {
            self.best_accuracy = accuracy;
            self.best_epoch = epoch;
            return true;
        }
        false
    }

    /// Prints a summary of the training history.
    pub fn print_summary(&self) {
        println!("\nTraining History Summary:");
        println!("------------------------");
        println!(
            "Best accuracy: {:.2}% (epoch {})",
            self.best_accuracy * 100.0,
            self.best_epoch
        );
        println!(
            "Final accuracy: {:.2}%",
            self.accuracies.last().unwrap_or(&0.0) * 100.0
        );
        println!("Final loss: {:.4}", self.losses.last().unwrap_or(&0.0));
    }
}
