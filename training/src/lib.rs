mod config;
mod history;
mod trainer;

pub use config::TrainingConfig;
pub use history::TrainingHistory;
pub use trainer::{Trainer, TrainingError};

pub mod prelude {
    pub use crate::Trainer;
    pub use crate::TrainingConfig;
    pub use crate::TrainingHistory;
}
