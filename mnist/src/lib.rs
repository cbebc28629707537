pub mod augment;
pub mod dataset;
pub mod idx;

pub use crate::augment::{augment_image, build_augmented_dataset};
pub use crate::dataset::Dataset;
pub use crate::idx::{load_training_set, read_idx_file, MnistError};

/// Side length of one image in pixels.
pub const IMAGE_DIM: usize = 28;
/// Pixels per image, the network's input width.
pub const INPUT_SIZE: usize = IMAGE_DIM * IMAGE_DIM;
/// Number of digit classes.
pub const NUM_CLASSES: usize = 10;
/// Images in the standard MNIST training set.
pub const TRAIN_SET_SIZE: usize = 60_000;
