//! Secret wrapper for signing keys and other sensitive material

use std::fmt;
use std::path::Path;

use zeroize::Zeroize;

use crate::error::{Error, Result};

/// Sensitive value - redacted in Debug/Display/logs, zeroized on drop
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the inner value (use sparingly)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl Secret<String> {
    /// Read a secret from an environment variable.
    ///
    /// Unset and whitespace-only values both yield `None`.
    pub fn from_env(var: &str) -> Option<Self> {
        let mut value = std::env::var(var).ok()?;
        let trimmed = value.trim().to_owned();
        value.zeroize();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed))
        }
    }

    /// Read a secret from a file, trimming surrounding whitespace.
    ///
    /// A missing file is an error; an empty file yields `None`.
    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        let mut contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read secret file {}: {e}", path.display()))
        })?;
        let trimmed = contents.trim().to_owned();
        contents.zeroize();
        if trimmed.is_empty() {
            tracing::warn!(path = %path.display(), "secret file is empty");
            return Ok(None);
        }
        Ok(Some(Self(trimmed)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_are_redacted() {
        let secret = Secret::new(String::from("hmac-signing-key"));
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn expose_returns_inner_value() {
        let secret = Secret::new(String::from("hmac-signing-key"));
        assert_eq!(secret.expose(), "hmac-signing-key");
        assert_eq!(secret.as_bytes(), b"hmac-signing-key");
    }

    #[test]
    fn from_file_trims_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("access");
        std::fs::write(&path, "  file-secret\n").unwrap();

        let secret = Secret::from_file(&path).unwrap().unwrap();
        assert_eq!(secret.expose(), "file-secret");
    }

    #[test]
    fn from_file_empty_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, " \n\t ").unwrap();

        assert!(Secret::from_file(&path).unwrap().is_none());
    }

    #[test]
    fn from_file_missing_is_error() {
        let result = Secret::from_file(Path::new("/nonexistent/secret/file"));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("failed to read secret file"), "got: {err}");
    }

    #[test]
    fn from_env_unset_yields_none() {
        assert!(Secret::from_env("COMMON_TEST_SECRET_THAT_IS_NEVER_SET").is_none());
    }
}
