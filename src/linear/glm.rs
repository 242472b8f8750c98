//! Generalised linear models fitted by iteratively reweighted least squares (IRLS).
//!
//! Each iteration solves a weighted least squares problem on the working response
//!
//! ```text
//! z = η + (y − μ)·g′(μ),  w = prior / (g′(μ)²·V(μ))
//! ```
//!
//! minimising `Σ wᵢ(zᵢ − ηᵢ)² / 2W + reg_param·Σ βⱼ²/2`, where `W = Σ wᵢ`. The penalty applies to
//! the coefficients on the scale of the features as given, and never to the intercept. The
//! penalised problem is handed to `linregress` as an ordinary least squares fit on rows scaled
//! by `√wᵢ`, augmented with one `√(reg_param·W)` row per penalised coefficient.

use anyhow::bail;
use linregress::fit_low_level_regression_model;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use thiserror::Error;
use tracing::trace;

use crate::linear::{dot, Matrix};


/// Lower bound on a binomial mean, keeping the logit finite.
const BINOMIAL_EPSILON: f64 = 1e-16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Family {
    Binomial,
    Gaussian,
}
impl Family {
    pub fn canonical_link(&self) -> Link {
        match self {
            Family::Binomial => Link::Logit,
            Family::Gaussian => Link::Identity,
        }
    }

    fn supports(&self, link: &Link) -> bool {
        matches!(
            (self, link),
            (Family::Binomial, Link::Logit) | (Family::Gaussian, Link::Identity)
        )
    }

    fn validate_label(&self, label: f64) -> bool {
        match self {
            Family::Binomial => (0.0..=1.0).contains(&label),
            Family::Gaussian => label.is_finite(),
        }
    }

    /// Starting mean for a given label and prior weight.
    fn initialize(&self, label: f64, weight: f64) -> f64 {
        match self {
            Family::Binomial => (weight * label + 0.5) / (weight + 1.0),
            Family::Gaussian => label,
        }
    }

    fn project(&self, mu: f64) -> f64 {
        match self {
            Family::Binomial => mu.clamp(BINOMIAL_EPSILON, 1.0 - BINOMIAL_EPSILON),
            Family::Gaussian => mu,
        }
    }

    fn variance(&self, mu: f64) -> f64 {
        match self {
            Family::Binomial => mu * (1.0 - mu),
            Family::Gaussian => 1.0,
        }
    }

    /// Contribution of a single observation to the deviance.
    fn unit_deviance(&self, label: f64, mu: f64, weight: f64) -> f64 {
        match self {
            Family::Binomial => {
                2.0 * weight
                    * (y_log_y(label, mu) + y_log_y(1.0 - label, 1.0 - mu))
            }
            Family::Gaussian => weight * (label - mu).powi(2),
        }
    }

    /// Akaike information criterion of a fit with `rank` estimated parameters.
    fn aic(&self, labels: &[f64], mus: &[f64], weights: &[f64], deviance: f64, rank: usize) -> f64 {
        let penalty = 2.0 * rank as f64;
        match self {
            Family::Binomial => {
                let log_likelihood: f64 = labels
                    .iter()
                    .zip(mus)
                    .zip(weights)
                    .map(|((&y, &mu), &weight)| {
                        weight * (y * mu.ln() + (1.0 - y) * (1.0 - mu).ln())
                    })
                    .sum();
                -2.0 * log_likelihood + penalty
            }
            Family::Gaussian => {
                let weight_sum: f64 = weights.iter().sum();
                weight_sum * ((deviance / weight_sum * 2.0 * std::f64::consts::PI).ln() + 1.0)
                    + 2.0
                    + penalty
            }
        }
    }
}

/// `y·ln(y/μ)`, taken as 0 when `y` is 0.
fn y_log_y(y: f64, mu: f64) -> f64 {
    if y == 0.0 {
        0.0
    } else {
        y * (y / mu).ln()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Link {
    Logit,
    Identity,
}
impl Link {
    pub fn link(&self, mu: f64) -> f64 {
        match self {
            Link::Logit => (mu / (1.0 - mu)).ln(),
            Link::Identity => mu,
        }
    }

    pub fn inverse(&self, eta: f64) -> f64 {
        match self {
            Link::Logit => 1.0 / (1.0 + (-eta).exp()),
            Link::Identity => eta,
        }
    }

    /// dη/dμ evaluated at `mu`.
    fn derivative(&self, mu: f64) -> f64 {
        match self {
            Link::Logit => 1.0 / (mu * (1.0 - mu)),
            Link::Identity => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlmOptions {
    pub family: Family,
    pub link: Link,
    pub max_iter: usize,
    pub reg_param: f64,
    pub tol: f64,
    pub fit_intercept: bool,
}
impl GlmOptions {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.family.supports(&self.link) {
            bail!(
                "the {} family does not support the {} link, use {}",
                self.family,
                self.link,
                self.family.canonical_link()
            );
        }
        if self.max_iter == 0 {
            bail!("maximum number of iterations must be at least 1");
        }
        if !(self.reg_param >= 0.0 && self.reg_param.is_finite()) {
            bail!("regularisation parameter must be non-negative, got {}", self.reg_param);
        }
        if !(self.tol > 0.0) {
            bail!("convergence tolerance must be positive, got {}", self.tol);
        }
        Ok(())
    }
}

impl Default for GlmOptions {
    fn default() -> Self {
        Self {
            family: Family::Binomial,
            link: Link::Logit,
            max_iter: 10,
            reg_param: 0.3,
            tol: 1e-6,
            fit_intercept: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum GlmError {
    #[error("invalid options: {0}")]
    InvalidOptions(#[from] anyhow::Error),

    #[error("no observations with positive weight")]
    Empty,

    #[error("{rows} feature rows but {labels} labels")]
    LabelMismatch { rows: usize, labels: usize },

    #[error("{rows} feature rows but {weights} instance weights")]
    WeightMismatch { rows: usize, weights: usize },

    #[error("label {label} at row {row} is not valid for the {family} family")]
    InvalidLabel { row: usize, label: f64, family: Family },

    #[error("instance weight {weight} at row {row} must be non-negative")]
    InvalidWeight { row: usize, weight: f64 },

    #[error("least squares solve failed: {0}")]
    Solve(#[from] linregress::Error),
}

/// The outcome of fitting a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlmFit {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub iterations: usize,
    pub converged: bool,
    pub deviance: f64,
    pub null_deviance: f64,
    pub aic: f64,
}
impl GlmFit {
    pub fn linear_predictor(&self, features: &[f64]) -> f64 {
        self.intercept + dot(&self.coefficients, features)
    }

    pub fn predict(&self, link: &Link, features: &[f64]) -> f64 {
        link.inverse(self.linear_predictor(features))
    }
}

/// Fits a GLM to the rows of `features` against `labels`, optionally weighting each row.
pub fn fit(
    options: &GlmOptions,
    features: &Matrix,
    labels: &[f64],
    weights: Option<&[f64]>,
) -> Result<GlmFit, GlmError> {
    options.validate()?;
    let rows = features.rows();
    if labels.len() != rows {
        return Err(GlmError::LabelMismatch {
            rows,
            labels: labels.len(),
        });
    }
    let prior = match weights {
        Some(weights) if weights.len() != rows => {
            return Err(GlmError::WeightMismatch {
                rows,
                weights: weights.len(),
            })
        }
        Some(weights) => weights.to_vec(),
        None => vec![1.0; rows],
    };
    for (row, &weight) in prior.iter().enumerate() {
        if !(weight >= 0.0 && weight.is_finite()) {
            return Err(GlmError::InvalidWeight { row, weight });
        }
    }
    if prior.iter().sum::<f64>() <= 0.0 {
        return Err(GlmError::Empty);
    }
    for (row, &label) in labels.iter().enumerate() {
        if !options.family.validate_label(label) {
            return Err(GlmError::InvalidLabel {
                row,
                label,
                family: options.family,
            });
        }
    }

    let (family, link) = (options.family, options.link);
    let initial_eta: Vec<_> = labels
        .iter()
        .zip(&prior)
        .map(|(&label, &weight)| link.link(family.initialize(label, weight)))
        .collect();
    let mut model = weighted_least_squares(features, &initial_eta, &prior, options)?;

    let mut mus = means(features, &model, options);
    let mut iterations = 0;
    let mut converged = false;
    let mut working_response = vec![0.0; rows];
    let mut working_weights = vec![0.0; rows];
    while iterations < options.max_iter {
        iterations += 1;
        for row in 0..rows {
            let mu = mus[row];
            let derivative = link.derivative(mu);
            let eta = link.link(mu);
            working_response[row] = eta + (labels[row] - mu) * derivative;
            working_weights[row] =
                prior[row] / (derivative.powi(2) * family.variance(mu));
        }
        let updated = weighted_least_squares(features, &working_response, &working_weights, options)?;
        let max_delta = updated
            .coefficients
            .iter()
            .zip(&model.coefficients)
            .map(|(new, old)| (new - old).abs())
            .fold((updated.intercept - model.intercept).abs(), f64::max);
        trace!("iteration {iterations}: max coefficient change {max_delta:e}");
        model = updated;
        mus = means(features, &model, options);
        if max_delta < options.tol {
            converged = true;
            break;
        }
    }

    let deviance = deviance(family, labels, &mus, &prior);
    let null_mu = if options.fit_intercept {
        let weight_sum: f64 = prior.iter().sum();
        let mean = labels.iter().zip(&prior).map(|(y, w)| y * w).sum::<f64>() / weight_sum;
        family.project(mean)
    } else {
        family.project(link.inverse(0.0))
    };
    let null_deviance = deviance_at(family, labels, null_mu, &prior);
    let rank = features.cols() + usize::from(options.fit_intercept);
    let aic = family.aic(labels, &mus, &prior, deviance, rank);

    Ok(GlmFit {
        coefficients: model.coefficients,
        intercept: model.intercept,
        iterations,
        converged,
        deviance,
        null_deviance,
        aic,
    })
}

struct LinearModel {
    coefficients: Vec<f64>,
    intercept: f64,
}

fn means(features: &Matrix, model: &LinearModel, options: &GlmOptions) -> Vec<f64> {
    features
        .iter_rows()
        .map(|row| {
            let eta = model.intercept + dot(&model.coefficients, row);
            options.family.project(options.link.inverse(eta))
        })
        .collect()
}

fn deviance(family: Family, labels: &[f64], mus: &[f64], weights: &[f64]) -> f64 {
    labels
        .iter()
        .zip(mus)
        .zip(weights)
        .map(|((&label, &mu), &weight)| family.unit_deviance(label, mu, weight))
        .sum()
}

fn deviance_at(family: Family, labels: &[f64], mu: f64, weights: &[f64]) -> f64 {
    labels
        .iter()
        .zip(weights)
        .map(|(&label, &weight)| family.unit_deviance(label, mu, weight))
        .sum()
}

/// `(value, weight)` pairs of feature `col` over the rows with positive weight.
fn weighted_column<'a>(
    features: &'a Matrix,
    weights: &'a [f64],
    col: usize,
) -> impl Iterator<Item = (f64, f64)> + 'a {
    features
        .iter_rows()
        .zip(weights)
        .filter(|(_, weight)| **weight > 0.0)
        .map(move |(row, &weight)| (row[col], weight))
}

/// Whether feature `col` carries no information for the solve: constant (with an intercept) or
/// identically zero (without).
fn is_degenerate(features: &Matrix, weights: &[f64], weight_sum: f64, col: usize, fit_intercept: bool) -> bool {
    if fit_intercept {
        let mean = weighted_column(features, weights, col)
            .map(|(value, weight)| weight * value)
            .sum::<f64>()
            / weight_sum;
        let variance = weighted_column(features, weights, col)
            .map(|(value, weight)| weight * (value - mean).powi(2))
            .sum::<f64>()
            / weight_sum;
        variance <= f64::EPSILON * (1.0 + mean.powi(2))
    } else {
        weighted_column(features, weights, col).all(|(value, _)| value == 0.0)
    }
}

/// Solves the penalised weighted least squares problem for `response`. Degenerate features are
/// left out of the solve and get a coefficient of 0.
fn weighted_least_squares(
    features: &Matrix,
    response: &[f64],
    weights: &[f64],
    options: &GlmOptions,
) -> Result<LinearModel, GlmError> {
    let weight_sum: f64 = weights.iter().sum();
    if weight_sum <= 0.0 {
        return Err(GlmError::Empty);
    }

    let kept: Vec<_> = (0..features.cols())
        .filter(|&col| !is_degenerate(features, weights, weight_sum, col, options.fit_intercept))
        .collect();
    let mut coefficients = vec![0.0; features.cols()];
    if kept.is_empty() {
        let intercept = if options.fit_intercept {
            response.iter().zip(weights).map(|(z, w)| z * w).sum::<f64>() / weight_sum
        } else {
            0.0
        };
        return Ok(LinearModel {
            coefficients,
            intercept,
        });
    }

    // column 0 is the response, column 1 the intercept (zeros without one), then the kept features
    let observations = weights.iter().filter(|&&weight| weight > 0.0).count();
    let penalised = if options.reg_param > 0.0 { kept.len() } else { 0 };
    let mut design = Matrix::allocate(observations + penalised, 2 + kept.len());
    let mut row_index = 0;
    for ((row, &weight), &response) in features.iter_rows().zip(weights).zip(response) {
        if weight == 0.0 {
            continue;
        }
        let scale = weight.sqrt();
        let design_row = design.row_slice_mut(row_index);
        design_row[0] = scale * response;
        design_row[1] = if options.fit_intercept { scale } else { 0.0 };
        for (value, &col) in design_row[2..].iter_mut().zip(&kept) {
            *value = scale * row[col];
        }
        row_index += 1;
    }
    let penalty = (options.reg_param * weight_sum).sqrt();
    for offset in 0..penalised {
        design[(row_index + offset, 2 + offset)] = penalty;
    }

    let model = fit_low_level_regression_model(design.flatten(), design.rows(), design.cols())?;
    let parameters = model.parameters();
    for (&col, &parameter) in kept.iter().zip(&parameters[1..]) {
        coefficients[col] = parameter;
    }
    let intercept = if options.fit_intercept { parameters[0] } else { 0.0 };
    Ok(LinearModel {
        coefficients,
        intercept,
    })
}
