//! The per-country training run: load, label, encode, weight, assemble, fit and save.

use std::path::PathBuf;
use std::time::Duration;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{JobConfig, TrainingOptions};
use crate::encode::EncodeError;
use crate::features::{FeatureLayout, WeightUsage};
use crate::ingest::{load_matches, IngestError, MatchRecord};
use crate::label::{HalfTimeLabel, LabelError};
use crate::linear::glm;
use crate::linear::glm::GlmError;
use crate::linear::Matrix;
use crate::model::{FirstHalfModel, PersistError};
use crate::partition::Partitioned;
use crate::recency::{rank_within_season, weight, SeasonKey};
use crate::session::Session;
use crate::timed::Timed;

#[cfg(test)]
mod tests;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Ingest(#[from] IngestError),

    #[error("{season} matchday {matchday}, {home} v {away}: {source}")]
    Label {
        season: String,
        matchday: u32,
        home: String,
        away: String,
        source: LabelError,
    },

    #[error("{0}")]
    Encode(#[from] EncodeError),

    #[error("{0}")]
    Glm(#[from] GlmError),

    #[error("{0}")]
    Persist(#[from] PersistError),

    #[error("no matches for {0}")]
    NoMatches(String),
}

/// A match together with its first-half goal label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelledMatch {
    pub record: MatchRecord,
    pub label: u8,
}

/// Labels every match, one partition per worker. The result is in partition-major order.
pub fn derive_labels(
    session: &Session,
    records: Vec<MatchRecord>,
) -> Result<Vec<LabelledMatch>, PipelineError> {
    let partitioned = Partitioned::round_robin(records, session.partitions());
    debug!("partition sizes: {:?}", partitioned.partition_sizes());
    let labelled = partitioned.try_map(session, |record| {
        match HalfTimeLabel::derive(&record.home_goals, &record.away_goals) {
            Ok(label) => Ok(LabelledMatch {
                label: label.value(),
                record,
            }),
            Err(source) => Err(PipelineError::Label {
                season: record.season,
                matchday: record.matchday,
                home: record.home,
                away: record.away,
                source,
            }),
        }
    })?;
    Ok(labelled.collect())
}

/// The design matrix, labels and recency weights of a country's matches.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub layout: FeatureLayout,
    pub features: Matrix,
    pub labels: Vec<f64>,
    pub weights: Vec<f64>,
}
impl TrainingSet {
    pub fn rows(&self) -> usize {
        self.labels.len()
    }

    /// Number of matches with a first-half goal.
    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&label| label > 0.0).count()
    }
}

/// Labels, encodes and weights `records`, assembling one feature row per match.
pub fn prepare(
    session: &Session,
    records: Vec<MatchRecord>,
    options: &TrainingOptions,
) -> Result<TrainingSet, PipelineError> {
    let labelled = derive_labels(session, records)?;

    let keys: Vec<_> = labelled
        .iter()
        .map(|labelled| SeasonKey {
            season: &labelled.record.season,
            matchday: labelled.record.matchday,
        })
        .collect();
    let weights: Vec<_> = rank_within_season(&keys).into_iter().map(weight).collect();

    let records: Vec<_> = labelled.iter().map(|labelled| labelled.record.clone()).collect();
    let layout = FeatureLayout::fit(&records, &options.encoding, options.weight_usage);
    debug!(
        "{} seasons, {} home teams, {} away teams; {} features",
        layout.season.labels.len(),
        layout.home.labels.len(),
        layout.away.labels.len(),
        layout.len()
    );

    let rows = session.install(|| {
        records
            .par_iter()
            .zip(weights.par_iter())
            .map(|(record, &weight)| {
                let encoded = layout.encode(record)?;
                Ok(layout.assemble(&encoded, record.matchday, weight))
            })
            .collect::<Result<Vec<_>, EncodeError>>()
    })?;
    let features = Matrix::from_rows(&rows, layout.len());
    let labels = labelled
        .iter()
        .map(|labelled| f64::from(labelled.label))
        .collect();

    Ok(TrainingSet {
        layout,
        features,
        labels,
        weights,
    })
}

/// Fits the GLM to a prepared training set.
fn fit_model(
    country: &str,
    set: TrainingSet,
    options: &TrainingOptions,
) -> Result<FirstHalfModel, PipelineError> {
    let instance_weights = match options.weight_usage {
        WeightUsage::Feature => None,
        WeightUsage::Instance => Some(&set.weights[..]),
    };
    let fit = glm::fit(&options.glm, &set.features, &set.labels, instance_weights)?;
    if !fit.converged {
        warn!(
            "{country} model did not converge in {} iterations",
            fit.iterations
        );
    }
    info!(
        "fitted {country} model to {} matches in {} iterations, deviance {:.4}",
        set.rows(),
        fit.iterations,
        fit.deviance
    );
    Ok(FirstHalfModel {
        country: country.to_string(),
        options: options.glm.clone(),
        rows: set.rows(),
        positives: set.positives(),
        layout: set.layout,
        fit,
    })
}

/// Trains a model on an already-loaded set of matches.
pub fn train(
    session: &Session,
    country: &str,
    records: Vec<MatchRecord>,
    options: &TrainingOptions,
) -> Result<FirstHalfModel, PipelineError> {
    if records.is_empty() {
        return Err(PipelineError::NoMatches(country.to_string()));
    }
    let set = prepare(session, records, options)?;
    fit_model(country, set, options)
}

#[derive(Debug, Clone)]
pub struct CountryOutcome {
    pub country: String,
    pub model: FirstHalfModel,
    pub path: PathBuf,
    pub elapsed: Duration,
}
impl CountryOutcome {
    pub fn rows(&self) -> usize {
        self.model.rows
    }
}

/// Runs the whole pipeline for one country, saving the model under the configured models
/// directory.
pub fn run_country(
    session: &Session,
    config: &JobConfig,
    country: &str,
) -> Result<CountryOutcome, PipelineError> {
    let input = config.input_path(country);
    let path = config.model_path(country);
    let timed = Timed::result(|| -> Result<_, PipelineError> {
        let records = load_matches(&input)?;
        info!("loaded {} matches from {}", records.len(), input.display());
        let model = train(session, country, records, &config.training)?;
        model.save(&path, config.save_mode, session.scratch_dir())?;
        Ok(model)
    })?;
    info!("saved {country} model to {} in {:?}", path.display(), timed.elapsed);
    Ok(CountryOutcome {
        country: country.to_string(),
        model: timed.value,
        path,
        elapsed: timed.elapsed,
    })
}
