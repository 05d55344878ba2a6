use crate::config::ConfigError;
use log::debug;
use std::io;
use std::path::Path;

/// Reads a required environment variable.
pub fn get_env_var(key: &str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnvVar(key.to_string())),
    }
}

/// Creates `path` (and its parents) unless it already is a directory.
pub async fn ensure_dir_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("Path exists but is not a directory: {}", path.display()),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Creating directory: {}", path.display());
            tokio::fs::create_dir_all(path).await
        }
        Err(e) => Err(e),
    }
}

/// Ensures the parent directory of a file path exists.
pub async fn ensure_parent_exists(file: &Path) -> io::Result<()> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir_exists(parent).await,
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_var_missing() {
        let err = get_env_var("AEMET_ETL_TEST_SURELY_UNSET_VARIABLE").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "AEMET_ETL_TEST_SURELY_UNSET_VARIABLE"));
    }

    #[tokio::test]
    async fn test_ensure_dir_exists() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let nested = tmp.path().join("a").join("b");
        ensure_dir_exists(&nested).await?;
        assert!(nested.is_dir());
        // Idempotent
        ensure_dir_exists(&nested).await?;

        let file = tmp.path().join("plain.txt");
        tokio::fs::write(&file, b"x").await?;
        assert!(ensure_dir_exists(&file).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_parent_exists() -> Result<(), Box<dyn std::error::Error>> {
        let tmp = tempfile::tempdir()?;
        let file = tmp.path().join("data").join("raw.csv");
        ensure_parent_exists(&file).await?;
        assert!(tmp.path().join("data").is_dir());
        ensure_parent_exists(Path::new("relative.csv")).await?;
        Ok(())
    }
}
