//! Upload admission validation.
//!
//! Checks are declared-metadata only: size against the configured ceiling and
//! filename extension against the allow-set. No content sniffing.

use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("File extension not allowed: {extension} (allowed: {allowed:?})")]
    ExtensionNotAllowed {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Filename has no extension: {0}")]
    MissingExtension(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),
}

/// Upload validator
///
/// Holds the admission policy for a single upload surface without coupling
/// to storage or transport details.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size_bytes: usize,
    allowed_extensions: Vec<String>,
}

impl UploadValidator {
    pub fn new(max_file_size_bytes: usize, allowed_extensions: Vec<String>) -> Self {
        Self {
            max_file_size_bytes,
            allowed_extensions,
        }
    }

    /// Validate file size. Callers may pass a running total to abort a
    /// stream as soon as the ceiling is crossed.
    pub fn validate_size(&self, size: usize) -> Result<(), ValidationError> {
        if size > self.max_file_size_bytes {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size_bytes,
            });
        }

        Ok(())
    }

    /// Validate the declared filename and return its normalized
    /// (lowercase) extension.
    pub fn validate_filename(&self, filename: &str) -> Result<String, ValidationError> {
        if filename.trim().is_empty() {
            return Err(ValidationError::InvalidFilename(filename.to_string()));
        }

        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .ok_or_else(|| ValidationError::MissingExtension(filename.to_string()))?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::ExtensionNotAllowed {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_validator() -> UploadValidator {
        UploadValidator::new(
            1024 * 1024, // 1MB
            vec!["jpg".to_string(), "png".to_string(), "pdf".to_string()],
        )
    }

    #[test]
    fn test_validate_size_ok() {
        let validator = test_validator();
        assert!(validator.validate_size(512 * 1024).is_ok());
    }

    #[test]
    fn test_validate_size_at_limit() {
        let validator = test_validator();
        assert!(validator.validate_size(1024 * 1024).is_ok());
    }

    #[test]
    fn test_validate_size_too_large() {
        let validator = test_validator();
        assert!(matches!(
            validator.validate_size(2 * 1024 * 1024),
            Err(ValidationError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_size_accepts_empty() {
        let validator = test_validator();
        assert!(validator.validate_size(0).is_ok());
    }

    #[test]
    fn test_validate_filename_ok() {
        let validator = test_validator();
        assert_eq!(validator.validate_filename("photo.jpg").unwrap(), "jpg");
        assert_eq!(validator.validate_filename("photo.JPG").unwrap(), "jpg"); // case insensitive
        assert_eq!(
            validator.validate_filename("archive.backup.pdf").unwrap(),
            "pdf"
        );
    }

    #[test]
    fn test_validate_filename_extension_not_allowed() {
        let validator = test_validator();
        assert!(matches!(
            validator.validate_filename("malware.exe"),
            Err(ValidationError::ExtensionNotAllowed { .. })
        ));
    }

    #[test]
    fn test_validate_filename_missing_extension() {
        let validator = test_validator();
        assert!(matches!(
            validator.validate_filename("README"),
            Err(ValidationError::MissingExtension(_))
        ));
        assert!(matches!(
            validator.validate_filename(".gitignore"),
            Err(ValidationError::MissingExtension(_))
        ));
    }

    #[test]
    fn test_validate_filename_empty() {
        let validator = test_validator();
        assert!(matches!(
            validator.validate_filename("  "),
            Err(ValidationError::InvalidFilename(_))
        ));
    }
}
