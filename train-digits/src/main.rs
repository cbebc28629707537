use anyhow::{Context, Result};
use clap::Parser;
use mnist::{build_augmented_dataset, load_training_set, INPUT_SIZE, NUM_CLASSES};
use network::Network;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use training::{Trainer, TrainingConfig};

/// Trains the digit-recognition network on the MNIST training set.
#[derive(Debug, Parser)]
#[command(name = "train-digits")]
struct Cli {
    /// Directory holding the MNIST IDX files (gzipped or plain).
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Optional JSON training configuration; absent fields keep defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where the best-so-far weights checkpoint is written.
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Override the number of training epochs.
    #[arg(long)]
    epochs: Option<u32>,

    /// Override the random seed.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => TrainingConfig::load(path)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => TrainingConfig::default(),
    };
    if let Some(checkpoint) = cli.checkpoint {
        config.checkpoint_path = checkpoint;
    }
    if let Some(epochs) = cli.epochs {
        config.epochs = epochs;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    // One seeded stream drives weight init, augmentation and shuffling, so a
    // run is reproducible end to end.
    let mut rng = StdRng::seed_from_u64(config.seed);
    let network = Network::new(INPUT_SIZE, config.hidden_size, NUM_CLASSES, &mut rng);

    println!("Loading MNIST dataset...");
    let data = load_training_set(&cli.data_dir).with_context(|| {
        format!(
            "failed to load MNIST training data from {}",
            cli.data_dir.display()
        )
    })?;
    println!("Successfully loaded {} training examples", data.len());

    println!(
        "Building augmented dataset ({} samples per digit)...",
        config.samples_per_digit
    );
    let mut augmented = build_augmented_dataset(&data, config.samples_per_digit, &mut rng)
        .context("failed to build augmented dataset")?;
    println!("Augmented dataset holds {} samples", augmented.len());

    let mut trainer = Trainer::new(config, network, rng);
    trainer.train(&mut augmented).context("training failed")?;

    trainer.history().print_summary();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "train-digits",
            "--data-dir",
            "/tmp/mnist",
            "--epochs",
            "3",
            "--seed",
            "7",
        ]);
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/mnist"));
        assert_eq!(cli.epochs, Some(3));
        assert_eq!(cli.seed, Some(7));
        assert!(cli.config.is_none());
    }
}
