use std::fs;
use std::path::Path;

use crate::config::JobConfig;
use crate::model::SaveMode;
use crate::session::SessionConfig;
use crate::testing::{assert_slice_f64_relative, write_matches};

use super::*;

const FRANCIA: [&str; 12] = [
    "2020,1,PSG,Lyon,10.-,-",
    "2020,1,Nice,Lens,-,-",
    "2020,2,Lyon,Nice,50.-,20.-",
    "2020,2,Lens,PSG,-,80.-",
    "2020,3,PSG,Nice,44.90.-,-",
    "2020,3,Lyon,Lens,-,-",
    "2021,1,Lyon,PSG,-,33.-",
    "2021,1,Lens,Nice,70.-,-",
    "2021,2,PSG,Lens,-,-",
    "2021,2,Nice,Lyon,5.-,60.-",
    "2021,3,Lens,Lyon,-,46.-",
    "2021,3,Nice,PSG,12.-,-",
];

fn session(partitions: usize) -> Session {
    Session::open(&SessionConfig {
        partitions,
        scratch_dir: None,
    })
    .unwrap()
}

fn record(season: &str, matchday: u32, home: &str, away: &str, home_goals: &str, away_goals: &str) -> MatchRecord {
    MatchRecord {
        season: season.into(),
        matchday,
        home: home.into(),
        away: away.into(),
        home_goals: home_goals.into(),
        away_goals: away_goals.into(),
    }
}

fn config(root: &Path) -> JobConfig {
    let config = JobConfig {
        data_dir: root.join("datos"),
        models_dir: root.join("modelos"),
        ..JobConfig::default()
    };
    fs::create_dir_all(&config.data_dir).unwrap();
    write_matches(&config.input_path("francia"), &FRANCIA);
    config
}

#[test]
fn labels_follow_goal_minutes() {
    let records = vec![
        record("2020", 1, "A", "B", "30.-", "-"),
        record("2020", 1, "C", "D", "60.-", "-"),
        record("2020", 1, "E", "F", "-", "10.-"),
        record("2020", 1, "G", "H", "50.70.-", "46.-"),
        record("2020", 1, "I", "J", "", ""),
    ];
    let labelled = derive_labels(&session(3), records).unwrap();
    assert_eq!(5, labelled.len());
    let label_of = |home: &str| {
        labelled
            .iter()
            .find(|labelled| labelled.record.home == home)
            .map(|labelled| labelled.label)
            .unwrap()
    };
    assert_eq!(1, label_of("A"));
    assert_eq!(0, label_of("C"));
    assert_eq!(1, label_of("E"));
    assert_eq!(0, label_of("G"));
    assert_eq!(0, label_of("I"));
}

#[test]
fn label_error_names_the_match() {
    let records = vec![
        record("2020", 1, "PSG", "Lyon", "-", "-"),
        record("2020", 2, "Lyon", "PSG", "xx.-", "-"),
    ];
    let err = derive_labels(&session(2), records).unwrap_err();
    assert!(matches!(err, PipelineError::Label { matchday: 2, .. }), "{err:?}");
    assert_eq!(
        "2020 matchday 2, Lyon v PSG: invalid goal minute 'xx'",
        err.to_string()
    );
}

#[test]
fn prepare_assembles_rows() {
    let records = vec![
        record("2020", 1, "A", "B", "10.-", "-"),
        record("2020", 2, "B", "A", "-", "-"),
        record("2021", 1, "A", "B", "-", "50.-"),
    ];
    let set = prepare(&session(1), records, &TrainingOptions::default()).unwrap();
    assert_eq!(3, set.rows());
    assert_eq!(1, set.positives());
    assert_eq!(vec![1.0, 0.0, 0.0], set.labels);
    assert_eq!(vec![0.5, 1.0, 1.0], set.weights);
    assert_eq!(
        vec!["Temporada=2020", "Jornada", "Local=A", "Visitante=B", "peso"],
        set.layout.feature_names()
    );
    assert_eq!(&[1.0, 1.0, 1.0, 1.0, 0.5], set.features.row_slice(0));
    assert_eq!(&[1.0, 2.0, 0.0, 0.0, 1.0], set.features.row_slice(1));
    assert_eq!(&[0.0, 1.0, 1.0, 1.0, 1.0], set.features.row_slice(2));
}

#[test]
fn partitioning_does_not_change_the_weights() {
    let records: Vec<_> = crate::ingest::read_matches(
        format!(
            "Temporada,Jornada,Local,Visitante,Local_gol,Visitante_gol\n{}\n",
            FRANCIA.join("\n")
        )
        .as_bytes(),
    )
    .unwrap();
    let options = TrainingOptions::default();
    let weights = |partitions| {
        let set = prepare(&session(partitions), records.clone(), &options).unwrap();
        let positives = set.positives();
        let mut weights = set.weights;
        weights.sort_by(f64::total_cmp);
        (weights, positives)
    };
    let (single, single_positives) = weights(1);
    let (six, six_positives) = weights(6);
    assert_slice_f64_relative(&single, &six, 1e-15);
    assert_eq!(single_positives, six_positives);
    assert_eq!(6, six_positives);
}

#[test]
fn run_country_saves_the_model() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    let session = session(6);

    let outcome = run_country(&session, &config, "francia").unwrap();
    assert_eq!("francia", outcome.country);
    assert_eq!(12, outcome.rows());
    assert_eq!(6, outcome.model.positives);
    assert_eq!(root.path().join("modelos").join("francia_modelo"), outcome.path);
    assert!(outcome.model.fit.iterations <= config.training.glm.max_iter);
    assert_eq!(outcome.model.layout.len(), outcome.model.coefficients().len());
    assert!(outcome.model.coefficients().iter().all(|coefficient| coefficient.is_finite()));
    assert!(outcome.model.intercept().is_finite());

    let loaded = FirstHalfModel::load(&outcome.path).unwrap();
    assert_eq!(outcome.model, loaded);
}

#[test]
fn rerun_respects_save_mode() {
    let root = tempfile::tempdir().unwrap();
    let mut config = config(root.path());
    let session = session(2);
    run_country(&session, &config, "francia").unwrap();

    let err = run_country(&session, &config, "francia").unwrap_err();
    assert!(matches!(err, PipelineError::Persist(PersistError::AlreadyExists(_))), "{err:?}");

    config.save_mode = SaveMode::Overwrite;
    run_country(&session, &config, "francia").unwrap();
}

#[test]
fn rerun_is_deterministic() {
    let root = tempfile::tempdir().unwrap();
    let mut config = config(root.path());
    config.save_mode = SaveMode::Overwrite;

    let mut runs = vec![];
    for partitions in [6, 6, 1] {
        let outcome = run_country(&session(partitions), &config, "francia").unwrap();
        let loaded = FirstHalfModel::load(&outcome.path).unwrap();
        assert_eq!(outcome.model.coefficients(), loaded.coefficients());
        runs.push(loaded);
    }
    let bits = |model: &FirstHalfModel| {
        let mut bits: Vec<_> = model.coefficients().iter().map(|c| c.to_bits()).collect();
        bits.push(model.intercept().to_bits());
        bits
    };
    assert_eq!(bits(&runs[0]), bits(&runs[1]));
    assert_eq!(runs[0].feature_names(), runs[1].feature_names());
    assert_eq!(runs[0].feature_names(), runs[2].feature_names());
}

#[test]
fn instance_weights() {
    let root = tempfile::tempdir().unwrap();
    let mut config = config(root.path());
    config.training.weight_usage = WeightUsage::Instance;
    let outcome = run_country(&session(3), &config, "francia").unwrap();
    let names = outcome.model.feature_names();
    assert!(!names.iter().any(|name| name == "peso"));
    assert_eq!(names.len(), outcome.model.coefficients().len());
}

#[test]
fn header_only_file() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    write_matches(&config.input_path("italia"), &[]);
    let err = run_country(&session(1), &config, "italia").unwrap_err();
    assert!(matches!(err, PipelineError::NoMatches(ref country) if country == "italia"));
    assert!(!config.model_path("italia").exists());
}

#[test]
fn missing_file() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    let err = run_country(&session(1), &config, "espana").unwrap_err();
    assert!(matches!(err, PipelineError::Ingest(IngestError::Open { .. })), "{err:?}");
}

#[test]
fn train_without_matches() {
    let err = train(&session(1), "francia", vec![], &TrainingOptions::default()).unwrap_err();
    assert_eq!("no matches for francia", err.to_string());
}
