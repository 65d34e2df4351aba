//! Validation functions for configuration values.
//!
//! Provides custom validation functions for the directories an operator
//! hands to the backup, plus the separator normalisation applied to them.

use validator::ValidationError;

use std::path::{Path, PathBuf};

pub fn validate_dir_exist<P: AsRef<Path>>(dir: P) -> Result<(), ValidationError> {
    let dir = dir.as_ref();
    if dir.exists() {
        if !dir.is_dir() {
            return Err(ValidationError::new("InvalidDirectory")
                .with_message(format!("{:?} is not a directory", dir).into()));
        }
    } else {
        return Err(ValidationError::new("InvalidDirectory")
            .with_message(format!("{:?} not found", dir).into()));
    }

    Ok(())
}

/// Turns operator input into a path, accepting Windows style `\` separators.
pub fn normalize_separators<S: AsRef<str>>(raw: S) -> PathBuf {
    PathBuf::from(raw.as_ref().trim().replace('\\', "/"))
}
