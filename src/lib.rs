//! Per-country logistic models of a goal being scored in the first half of a football match.
//! Match data is labelled from its goal minutes, encoded into categorical and recency-weighted
//! features, and fitted with a regularised binomial GLM.

pub mod config;
pub mod display;
pub mod encode;
pub mod features;
pub mod file;
pub mod ingest;
pub mod label;
pub mod linear;
pub mod model;
pub mod partition;
pub mod pipeline;
pub mod print;
pub mod recency;
pub mod session;
pub mod timed;

#[cfg(test)]
pub(crate) mod testing;

#[doc = include_str!("../README.md")]
#[cfg(doc)]
fn readme() {}
