//! Job configuration: built-in defaults, optionally overlaid by a JSON file and then by
//! command-line flags.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::features::{EncodingOptions, WeightUsage};
use crate::file::{list_files, read_json};
use crate::linear::glm::GlmOptions;
use crate::model::SaveMode;
use crate::session::SessionConfig;

pub const DATA_EXTENSION: &str = "csv";
pub const MODEL_SUFFIX: &str = "_modelo";

/// Everything that determines how a country's model is trained.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingOptions {
    pub glm: GlmOptions,
    pub encoding: EncodingOptions,
    pub weight_usage: WeightUsage,
}
impl TrainingOptions {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.glm.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub countries: Vec<String>,
    pub data_dir: PathBuf,
    pub models_dir: PathBuf,
    pub scratch_dir: Option<PathBuf>,
    pub partitions: usize,
    pub training: TrainingOptions,
    pub save_mode: SaveMode,

    /// Carry on with the remaining countries after one fails.
    pub keep_going: bool,
}
impl Default for JobConfig {
    fn default() -> Self {
        Self {
            countries: vec!["francia".into()],
            data_dir: PathBuf::from("datos"),
            models_dir: PathBuf::from("modelos"),
            scratch_dir: None,
            partitions: 6,
            training: TrainingOptions::default(),
            save_mode: SaveMode::default(),
            keep_going: false,
        }
    }
}
impl JobConfig {
    /// Reads a configuration file. Fields absent from the file take their default values.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        read_json(path).with_context(|| format!("cannot read config from {}", path.display()))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.countries.is_empty() {
            bail!("at least one country must be specified");
        }
        if let Some(country) = self.countries.iter().find(|country| !is_valid_country(country)) {
            bail!("invalid country name '{country}'");
        }
        if self.partitions == 0 {
            bail!("number of partitions must be at least 1");
        }
        self.training.validate()
    }

    pub fn input_path(&self, country: &str) -> PathBuf {
        self.data_dir.join(format!("{country}.{DATA_EXTENSION}"))
    }

    pub fn model_path(&self, country: &str) -> PathBuf {
        self.models_dir.join(format!("{country}{MODEL_SUFFIX}"))
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            partitions: self.partitions,
            scratch_dir: self.scratch_dir.clone(),
        }
    }

    /// Replaces the country list with every data file in the data directory.
    pub fn discover_countries(&mut self) -> anyhow::Result<()> {
        let files = list_files(&self.data_dir, DATA_EXTENSION)
            .with_context(|| format!("cannot list {}", self.data_dir.display()))?;
        self.countries = files
            .iter()
            .filter_map(|file| file.file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .collect();
        if self.countries.is_empty() {
            bail!("no .{DATA_EXTENSION} files in {}", self.data_dir.display());
        }
        Ok(())
    }
}

/// A country name doubles as a file stem, so it must be a single non-empty path component.
fn is_valid_country(country: &str) -> bool {
    !country.is_empty()
        && country != "."
        && country != ".."
        && !country.contains(['/', '\\'])
}
