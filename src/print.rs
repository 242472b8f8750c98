//! Console reporting of fitted models.

use stanza::style::{HAlign, Header, MinWidth, Separator, Styles};
use stanza::table::{Col, Row, Table};

use crate::display::DisplaySlice;
use crate::model::FirstHalfModel;
use crate::pipeline::CountryOutcome;

/// The plain-text report of a model: a header, the coefficient vector and the intercept,
/// followed by a blank line.
pub fn coefficient_report(country: &str, model: &FirstHalfModel) -> Vec<String> {
    vec![
        format!("Modelo para {country}:"),
        format!(
            "Coeficientes: {}",
            DisplaySlice::from(model.coefficients()).with_separator(",")
        ),
        format!("Intersección: {}", model.intercept()),
        String::new(),
    ]
}

pub fn tabulate_coefficients(model: &FirstHalfModel) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(20)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)).with(Separator(true)),
            vec!["Feature".into(), "Coefficient".into()],
        ));
    for (name, coefficient) in model.feature_names().into_iter().zip(model.coefficients()) {
        table.push_row(Row::new(
            Styles::default(),
            vec![name.into(), format!("{coefficient:.6}").into()],
        ));
    }
    table.push_row(Row::new(
        Styles::default().with(Separator(true)),
        vec!["(intercept)".into(), format!("{:.6}", model.intercept()).into()],
    ));
    table
}

pub fn tabulate_summary(outcomes: &[CountryOutcome]) -> Table {
    let numeric = || Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Right));
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Left)),
            numeric(),
            numeric(),
            numeric(),
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Centred)),
            numeric(),
            numeric(),
            numeric(),
            numeric(),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)).with(Separator(true)),
            vec![
                "Country".into(),
                "Matches".into(),
                "Positives".into(),
                "Iterations".into(),
                "Converged".into(),
                "Deviance".into(),
                "Null dev.".into(),
                "AIC".into(),
                "Time (ms)".into(),
            ],
        ));
    for outcome in outcomes {
        let fit = &outcome.model.fit;
        table.push_row(Row::new(
            Styles::default(),
            vec![
                outcome.country.clone().into(),
                format!("{}", outcome.rows()).into(),
                format!("{}", outcome.model.positives).into(),
                format!("{}", fit.iterations).into(),
                if fit.converged { "yes" } else { "no" }.into(),
                format!("{:.4}", fit.deviance).into(),
                format!("{:.4}", fit.null_deviance).into(),
                format!("{:.4}", fit.aic).into(),
                format!("{}", outcome.elapsed.as_millis()).into(),
            ],
        ));
    }
    table
}
