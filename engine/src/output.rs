use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{config::Config, error::Result};

/// Picks where generated files are written.
///
/// The preferred directory is used only if it already exists; otherwise files
/// go to the fallback. Filenames are trusted as given and may contain
/// subdirectories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputResolver {
    preferred: PathBuf,
    fallback: PathBuf,
}

impl OutputResolver {
    pub fn new(preferred: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        Self {
            preferred: preferred.into(),
            fallback: fallback.into(),
        }
    }

    /// `output_dir` from the config, else `~/Projects/tmp`, falling back to the
    /// system temp directory
    pub fn from_config(config: &Config) -> Self {
        let preferred = config
            .output_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join("Projects").join("tmp")))
            .unwrap_or_default();
        Self::new(preferred, std::env::temp_dir())
    }

    pub fn base_dir(&self) -> &Path {
        if !self.preferred.as_os_str().is_empty() && self.preferred.is_dir() {
            &self.preferred
        } else {
            &self.fallback
        }
    }

    /// Absolute path for `filename`, with its parent directory created
    pub fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let out = std::path::absolute(self.base_dir().join(filename))?;
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn prefers_existing_directory() -> Result<()> {
        let preferred = TempDir::new()?;
        let fallback = TempDir::new()?;
        let resolver = OutputResolver::new(preferred.path(), fallback.path());

        let path = resolver.resolve("image.png")?;
        assert_eq!(path, preferred.path().join("image.png"));
        Ok(())
    }

    #[test]
    fn missing_preferred_uses_fallback_and_creates_it() -> Result<()> {
        let root = TempDir::new()?;
        let fallback = root.path().join("shared").join("tmp");
        let resolver = OutputResolver::new(root.path().join("Projects/tmp"), &fallback);

        let path = resolver.resolve("video.mp4")?;
        assert_eq!(path, fallback.join("video.mp4"));
        assert!(fallback.is_dir());
        assert!(!root.path().join("Projects").exists());
        Ok(())
    }

    #[test]
    fn resolving_twice_is_stable() -> Result<()> {
        let root = TempDir::new()?;
        let resolver = OutputResolver::new(root.path().join("absent"), root.path().join("out"));

        let first = resolver.resolve("renders/cat.png")?;
        let second = resolver.resolve("renders/cat.png")?;
        assert_eq!(first, second);
        assert!(first.is_absolute());
        assert!(root.path().join("out/renders").is_dir());
        Ok(())
    }

    #[test]
    fn config_output_dir_is_preferred() {
        let cfg = Config {
            output_dir: Some("/srv/renders".into()),
            ..Config::default()
        };
        let resolver = OutputResolver::from_config(&cfg);
        assert_eq!(resolver.preferred, PathBuf::from("/srv/renders"));
        assert_eq!(resolver.fallback, std::env::temp_dir());
    }
}
