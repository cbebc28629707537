//! IDX dataset file loader.
//!
//! MNIST ships its images and labels in the IDX binary format: a 4-byte magic
//! value whose low byte encodes the number of dimension fields, followed by
//! that many 4-byte big-endian dimensions, followed by the raw payload. Files
//! may optionally be gzip-compressed; compression is detected from the gzip
//! magic bytes rather than the file name. Loading is all-or-nothing per file.

use flate2::read::GzDecoder;
use indicatif::ProgressBar;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::dataset::Dataset;
use crate::{INPUT_SIZE, TRAIN_SET_SIZE};

/// Errors that can occur while handling MNIST data.
#[derive(Debug, Error)]
pub enum MnistError {
    /// Wrapper for standard I/O errors, including short header or payload reads.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The header's dimension product disagrees with the caller's expectation.
    #[error(
        "unexpected size for {path}: header declares {actual} elements, caller expected {expected}"
    )]
    SizeMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
    /// Error for mismatches between images and labels.
    #[error("data mismatch: {0}")]
    DataMismatch(String),
    /// A digit class has fewer source samples than the augmentation plan needs.
    #[error("class {digit} has only {available} samples, {requested} requested")]
    NotEnoughSamples {
        digit: u8,
        available: usize,
        requested: usize,
    },
}

/// Reads a 32-bit unsigned integer in big-endian format.
fn read_u32(reader: &mut impl Read) -> std::io::Result<u32> {
    let mut buffer = [0; 4];
    reader.read_exact(&mut buffer)?;
    Ok(u32::from_be_bytes(buffer))
}

/// Reads an IDX file and returns its payload as a flat byte buffer.
///
/// The low byte of the magic value gives the number of dimension fields; the
/// product of all dimensions must equal `expected_len` or loading fails before
/// the payload is touched. Gzip-compressed files are decompressed
/// transparently.
///
/// # Errors
///
/// Returns [`MnistError::Io`] if the file cannot be opened or a header or
/// payload read comes up short, and [`MnistError::SizeMismatch`] if the
/// declared dimensions do not multiply out to `expected_len`.
pub fn read_idx_file(path: impl AsRef<Path>, expected_len: usize) -> Result<Vec<u8>, MnistError> {
    let path = path.as_ref();
    let raw = fs::read(path)?;

    // 0x1f 0x8b is the gzip magic.
    let mut reader: Box<dyn Read> = if raw.starts_with(&[0x1f, 0x8b]) {
        Box::new(GzDecoder::new(Cursor::new(raw)))
    } else {
        Box::new(Cursor::new(raw))
    };

    let magic = read_u32(&mut reader)?;
    let dim_count = (magic & 0xff) as usize;

    let mut declared_len = 1usize;
    for _ in 0..dim_count {
        declared_len = declared_len.saturating_mul(read_u32(&mut reader)? as usize);
    }

    if declared_len != expected_len {
        return Err(MnistError::SizeMismatch {
            path: path.to_path_buf(),
            expected: expected_len,
            actual: declared_len,
        });
    }

    let mut payload = vec![0u8; expected_len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

/// Picks the gzipped file if present, otherwise the uncompressed name.
fn resolve_idx_path(dir: &Path, name: &str) -> PathBuf {
    let gz = dir.join(format!("{name}.gz"));
    if gz.exists() {
        gz
    } else {
        dir.join(name)
    }
}

/// Loads the standard MNIST training set from `dir` into a [`Dataset`].
///
/// Looks for `train-images-idx3-ubyte` and `train-labels-idx1-ubyte`,
/// preferring `.gz` variants when both exist.
pub fn load_training_set(dir: impl AsRef<Path>) -> Result<Dataset, MnistError> {
    let dir = dir.as_ref();

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Loading MNIST images...");
    let images = read_idx_file(
        resolve_idx_path(dir, "train-images-idx3-ubyte"),
        TRAIN_SET_SIZE * INPUT_SIZE,
    )?;

    spinner.set_message("Loading MNIST labels...");
    let labels = read_idx_file(
        resolve_idx_path(dir, "train-labels-idx1-ubyte"),
        TRAIN_SET_SIZE,
    )?;
    spinner.finish_with_message(format!("Loaded {TRAIN_SET_SIZE} training samples"));

    Dataset::from_parts(images, labels)
}
