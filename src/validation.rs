//! Validation for caller-supplied inputs

use std::path::Path;

use anyhow::{anyhow, Result};

use crate::models::DuplicatePolicy;

/// Validation utilities for command-line and configuration inputs.
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate the backup owner identifier
    pub fn validate_owner_identifier(owner: &str) -> Result<()> {
        if owner.trim().is_empty() {
            return Err(anyhow!("Owner identifier cannot be empty"));
        }

        if owner.len() > 100 {
            return Err(anyhow!("Owner identifier too long (max 100 characters)"));
        }

        if owner.contains('\0') || owner.contains('\r') || owner.contains('\n') {
            return Err(anyhow!("Owner identifier contains invalid characters"));
        }

        Ok(())
    }

    /// Validate a duplicate policy name
    pub fn validate_duplicate_policy(name: &str) -> Result<()> {
        name.parse::<DuplicatePolicy>()?;
        Ok(())
    }

    /// Validate a backup store path
    pub fn validate_backup_path(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(anyhow!("Backup store does not exist: {path:?}"));
        }

        if !path.is_file() {
            return Err(anyhow!("Backup store is not a file: {path:?}"));
        }

        Ok(())
    }
}
