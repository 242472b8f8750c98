//! Assembly of the model's feature vector from an encoded match.
//!
//! The vector is laid out as
//!
//! ```text
//! one-hot(Temporada) ‖ Jornada ‖ one-hot(Local) ‖ one-hot(Visitante) ‖ peso
//! ```
//!
//! where the trailing recency weight is present only when it is used as a feature.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::encode::{EncodeError, HandleInvalid, OneHotEncoder, SparseVector, StringIndexer, StringOrder};
use crate::ingest::{MatchRecord, AWAY, HOME, MATCHDAY, SEASON};

/// Name of the recency weight column.
pub const WEIGHT: &str = "peso";

/// How the recency weight enters the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WeightUsage {
    /// Appended to the feature vector as an ordinary regressor.
    #[default]
    Feature,
    /// Passed to the solver as a per-row instance weight.
    Instance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingOptions {
    pub order: StringOrder,
    pub handle_invalid: HandleInvalid,
    pub drop_last: bool,
}
impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            order: StringOrder::default(),
            handle_invalid: HandleInvalid::default(),
            drop_last: true,
        }
    }
}

/// The category indices of a match and their one-hot vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedMatch {
    pub season_index: usize,
    pub home_index: usize,
    pub away_index: usize,
    pub season_vec: SparseVector,
    pub home_vec: SparseVector,
    pub away_vec: SparseVector,
}

/// Fitted vocabularies and encoder settings that determine the feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureLayout {
    pub season: StringIndexer,
    pub home: StringIndexer,
    pub away: StringIndexer,
    pub encoder: OneHotEncoder,
    pub weight_usage: WeightUsage,
}
impl FeatureLayout {
    pub fn fit(records: &[MatchRecord], options: &EncodingOptions, weight_usage: WeightUsage) -> Self {
        let indexer = |column: &str, value: fn(&MatchRecord) -> &str| {
            StringIndexer::fit(
                column,
                records.iter().map(value),
                options.order,
                options.handle_invalid,
            )
        };
        Self {
            season: indexer(SEASON, |record| record.season.as_str()),
            home: indexer(HOME, |record| record.home.as_str()),
            away: indexer(AWAY, |record| record.away.as_str()),
            encoder: OneHotEncoder {
                drop_last: options.drop_last,
            },
            weight_usage,
        }
    }

    /// Rebuilds the lookup tables of the indexers after deserialisation.
    pub(crate) fn reindex(self) -> Self {
        Self {
            season: self.season.reindex(),
            home: self.home.reindex(),
            away: self.away.reindex(),
            ..self
        }
    }

    fn segment_sizes(&self) -> [usize; 3] {
        [
            self.encoder.size(self.season.categories()),
            self.encoder.size(self.home.categories()),
            self.encoder.size(self.away.categories()),
        ]
    }

    fn weight_is_feature(&self) -> bool {
        self.weight_usage == WeightUsage::Feature
    }

    /// Length of the assembled feature vector.
    pub fn len(&self) -> usize {
        let [season, home, away] = self.segment_sizes();
        season + 1 + home + away + usize::from(self.weight_is_feature())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encode(&self, record: &MatchRecord) -> Result<EncodedMatch, EncodeError> {
        let season_index = self.season.transform(&record.season)?;
        let home_index = self.home.transform(&record.home)?;
        let away_index = self.away.transform(&record.away)?;
        Ok(EncodedMatch {
            season_index,
            home_index,
            away_index,
            season_vec: self.encoder.encode(season_index, self.season.categories())?,
            home_vec: self.encoder.encode(home_index, self.home.categories())?,
            away_vec: self.encoder.encode(away_index, self.away.categories())?,
        })
    }

    /// Concatenates the encoded vectors, the matchday and (if used as a feature) the weight
    /// into `row`, which must be [`len`](Self::len) elements long.
    pub fn assemble_into(&self, encoded: &EncodedMatch, matchday: u32, weight: f64, row: &mut [f64]) {
        assert_eq!(self.len(), row.len(), "feature row has the wrong length");
        row.fill(0.0);
        let [season, home, away] = self.segment_sizes();
        let mut offset = 0;
        encoded.season_vec.scatter(&mut row[offset..offset + season]);
        offset += season;
        row[offset] = matchday as f64;
        offset += 1;
        encoded.home_vec.scatter(&mut row[offset..offset + home]);
        offset += home;
        encoded.away_vec.scatter(&mut row[offset..offset + away]);
        offset += away;
        if self.weight_is_feature() {
            row[offset] = weight;
        }
    }

    pub fn assemble(&self, encoded: &EncodedMatch, matchday: u32, weight: f64) -> Vec<f64> {
        let mut row = vec![0.0; self.len()];
        self.assemble_into(encoded, matchday, weight, &mut row);
        row
    }

    /// Human-readable names of the assembled features, in vector order.
    pub fn feature_names(&self) -> Vec<String> {
        let [season, home, away] = self.segment_sizes();
        let mut names = Vec::with_capacity(self.len());
        let one_hot = |names: &mut Vec<String>, indexer: &StringIndexer, size: usize| {
            for index in 0..size {
                let label = indexer.label(index).unwrap_or("__unknown");
                names.push(format!("{}={label}", indexer.column));
            }
        };
        one_hot(&mut names, &self.season, season);
        names.push(MATCHDAY.to_string());
        one_hot(&mut names, &self.home, home);
        one_hot(&mut names, &self.away, away);
        if self.weight_is_feature() {
            names.push(WEIGHT.to_string());
        }
        names
    }
}
