// Modules
pub mod buffers;
pub mod checkpoint;
pub mod metrics;
pub mod network;
pub mod optimizer;

pub use buffers::{BatchBuffers, Gradients};
pub use checkpoint::{Checkpoint, CheckpointError};
pub use network::Network;
pub use optimizer::MomentumSgd;
