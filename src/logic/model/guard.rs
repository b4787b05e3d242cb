//! Model integrity check (SHA-256 of the model file)

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::classifier::ClassifierError;

/// Hex SHA-256 of a file, streamed
pub fn file_sha256(path: &Path) -> Result<String, std::io::Error> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compare the file's digest against `expected` (hex, case-insensitive).
/// Returns the actual digest on success.
pub fn verify_model_checksum(path: &Path, expected: &str) -> Result<String, ClassifierError> {
    let actual = file_sha256(path)?;
    let expected = expected.trim().to_lowercase();

    if actual != expected {
        log::error!("Model checksum mismatch for {:?}", path);
        return Err(ClassifierError::Integrity { expected, actual });
    }

    log::info!("Model checksum verified: {}...", &actual[..12]);
    Ok(actual)
}
