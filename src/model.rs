//! The fitted per-country model and its on-disk representation.
//!
//! A saved model is a directory holding two JSON documents: `metadata.json`, which describes
//! the model and the feature layout needed to reproduce its inputs, and `data.json`, which
//! holds the fitted coefficients and the fit summary.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;
use tracing::debug;

use crate::encode::EncodeError;
use crate::features::FeatureLayout;
use crate::file::{replace_dir, ReadJsonFile, WriteJsonFile};
use crate::ingest::MatchRecord;
use crate::linear::glm::{GlmFit, GlmOptions};

pub const CLASS: &str = "halftime::FirstHalfModel";
pub const FORMAT_VERSION: u32 = 1;

const METADATA_FILE: &str = "metadata.json";
const DATA_FILE: &str = "data.json";

/// Behaviour when the target directory of a save already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SaveMode {
    #[default]
    ErrorIfExists,
    Overwrite,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{0} already exists")]
    AlreadyExists(PathBuf),

    #[error("{path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("unsupported model format {class} v{version}")]
    UnsupportedFormat { class: String, version: u32 },

    #[error("{path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> PersistError + '_ {
    move |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Metadata {
    class: String,
    format_version: u32,
    timestamp: DateTime<Utc>,
    country: String,
    options: GlmOptions,
    layout: FeatureLayout,
    feature_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Data {
    rows: usize,
    positives: usize,
    fit: GlmFit,
}

/// A logistic model of a first-half goal, fitted to one country's matches.
#[derive(Debug, Clone, PartialEq)]
pub struct FirstHalfModel {
    pub country: String,
    pub options: GlmOptions,
    pub layout: FeatureLayout,
    pub fit: GlmFit,

    /// Number of matches the model was fitted to.
    pub rows: usize,

    /// Of those, the number with a first-half goal.
    pub positives: usize,
}
impl FirstHalfModel {
    pub fn coefficients(&self) -> &[f64] {
        &self.fit.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.fit.intercept
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.layout.feature_names()
    }

    /// Probability of a first-half goal in `record`, given its recency weight.
    pub fn predict_probability(&self, record: &MatchRecord, weight: f64) -> Result<f64, EncodeError> {
        let encoded = self.layout.encode(record)?;
        let features = self.layout.assemble(&encoded, record.matchday, weight);
        Ok(self.fit.predict(&self.options.link, &features))
    }

    /// Writes the model to `dir`. The documents are first written to a staging directory (under
    /// `staging` if given, otherwise alongside `dir`) which then replaces `dir`.
    pub fn save(&self, dir: &Path, mode: SaveMode, staging: Option<&Path>) -> Result<(), PersistError> {
        if mode == SaveMode::ErrorIfExists && dir.exists() {
            return Err(PersistError::AlreadyExists(dir.to_path_buf()));
        }

        let name = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.country.clone());
        let staging_parent = match staging {
            Some(staging) => staging.to_path_buf(),
            None => dir.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        let staged = staging_parent.join(format!(".{name}.staging"));
        if staged.exists() {
            std::fs::remove_dir_all(&staged).map_err(io_error(&staged))?;
        }
        std::fs::create_dir_all(&staged).map_err(io_error(&staged))?;

        let metadata = Metadata {
            class: CLASS.to_string(),
            format_version: FORMAT_VERSION,
            timestamp: Utc::now(),
            country: self.country.clone(),
            options: self.options.clone(),
            layout: self.layout.clone(),
            feature_names: self.feature_names(),
        };
        let metadata_path = staged.join(METADATA_FILE);
        metadata
            .write_json_file(&metadata_path)
            .map_err(io_error(&metadata_path))?;

        let data = Data {
            rows: self.rows,
            positives: self.positives,
            fit: self.fit.clone(),
        };
        let data_path = staged.join(DATA_FILE);
        data.write_json_file(&data_path).map_err(io_error(&data_path))?;

        replace_dir(&staged, dir).map_err(io_error(dir))?;
        debug!("saved model for {} to {}", self.country, dir.display());
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self, PersistError> {
        let metadata_path = dir.join(METADATA_FILE);
        let metadata = Metadata::read_json_file(&metadata_path).map_err(io_error(&metadata_path))?;
        if metadata.class != CLASS || metadata.format_version != FORMAT_VERSION {
            return Err(PersistError::UnsupportedFormat {
                class: metadata.class,
                version: metadata.format_version,
            });
        }

        let data_path = dir.join(DATA_FILE);
        let data = Data::read_json_file(&data_path).map_err(io_error(&data_path))?;
        let layout = metadata.layout.reindex();
        if data.fit.coefficients.len() != layout.len() {
            return Err(PersistError::Corrupt {
                path: data_path,
                reason: format!(
                    "{} coefficients for {} features",
                    data.fit.coefficients.len(),
                    layout.len()
                ),
            });
        }
        Ok(Self {
            country: metadata.country,
            options: metadata.options,
            layout,
            fit: data.fit,
            rows: data.rows,
            positives: data.positives,
        })
    }
}
