use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lapboard_game::{BundledData, CatalogError, DataLoader, StageCatalog};
use thiserror::Error;

/// Failure reading a stage catalog from disk.
#[derive(Debug, Error)]
pub enum StageFileError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Loads a stage catalog JSON file.
#[derive(Debug, Clone)]
pub struct StageFileLoader {
    path: PathBuf,
}

impl StageFileLoader {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataLoader for StageFileLoader {
    type Error = StageFileError;

    fn load_stage_catalog(&self) -> Result<StageCatalog, Self::Error> {
        let json = fs::read_to_string(&self.path).map_err(|source| StageFileError::Io {
            path: self.path.clone(),
            source,
        })?;
        Ok(StageCatalog::from_json(&json)?)
    }
}

/// Collection of immutable data required to run a simulation.
#[derive(Debug, Clone)]
pub struct TesterAssets {
    catalog: StageCatalog,
}

impl TesterAssets {
    #[must_use]
    pub fn load_default() -> Self {
        let catalog = BundledData.load_stage_catalog().unwrap_or_else(|err| {
            log::warn!("bundled stage catalog rejected: {err}");
            StageCatalog::default()
        });
        Self { catalog }
    }

    /// Load the catalog at `path`, or the bundled one when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::load_default());
        };
        let catalog = StageFileLoader::new(path)
            .load_stage_catalog()
            .with_context(|| format!("loading stage catalog from {}", path.display()))?;
        log::info!(
            "loaded {} stages from {}",
            catalog.stage_count(),
            path.display()
        );
        Ok(Self { catalog })
    }

    #[must_use]
    pub const fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }
}
