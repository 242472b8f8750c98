use std::env;
use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail};
use clap::Parser;
use stanza::renderer::console::Console;
use stanza::renderer::Renderer;
use strum::IntoEnumIterator;
use tracing::{debug, error, info};

use halftime::config::JobConfig;
use halftime::features::WeightUsage;
use halftime::model::SaveMode;
use halftime::pipeline::run_country;
use halftime::print::{coefficient_report, tabulate_coefficients, tabulate_summary};
use halftime::session::Session;

#[derive(Debug, clap::Parser, Clone)]
struct Args {
    /// JSON file to load the job configuration from
    #[clap(long)]
    config: Option<PathBuf>,

    /// comma-separated list of countries to train
    #[clap(short = 'c', long, value_delimiter = ',')]
    countries: Vec<String>,

    /// train every country with a data file in the data directory
    #[clap(short = 'a', long)]
    all: bool,

    /// directory holding the {country}.csv files
    #[clap(long)]
    data_dir: Option<PathBuf>,

    /// directory to save the models to
    #[clap(long)]
    models_dir: Option<PathBuf>,

    /// directory for staging model writes
    #[clap(long)]
    scratch_dir: Option<PathBuf>,

    /// number of partitions (and worker threads)
    #[clap(short = 'p', long)]
    partitions: Option<usize>,

    /// maximum number of solver iterations
    #[clap(long)]
    max_iter: Option<usize>,

    /// L2 regularisation parameter
    #[clap(long)]
    reg_param: Option<f64>,

    /// what to do when a model already exists: error-if-exists or overwrite
    #[clap(long, value_parser = parse_variant::<SaveMode>)]
    save_mode: Option<SaveMode>,

    /// how the recency weight is used: feature or instance
    #[clap(long, value_parser = parse_variant::<WeightUsage>)]
    weight_usage: Option<WeightUsage>,

    /// continue with the remaining countries if one fails
    #[clap(short = 'k', long)]
    keep_going: bool,
}
impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.all && !self.countries.is_empty() {
            bail!("--all cannot be combined with --countries");
        }
        Ok(())
    }

    fn to_config(&self) -> anyhow::Result<JobConfig> {
        let mut config = match &self.config {
            None => JobConfig::default(),
            Some(path) => JobConfig::load(path)?,
        };
        if !self.countries.is_empty() {
            config.countries = self.countries.clone();
        }
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(models_dir) = &self.models_dir {
            config.models_dir = models_dir.clone();
        }
        if let Some(scratch_dir) = &self.scratch_dir {
            config.scratch_dir = Some(scratch_dir.clone());
        }
        if let Some(partitions) = self.partitions {
            config.partitions = partitions;
        }
        if let Some(max_iter) = self.max_iter {
            config.training.glm.max_iter = max_iter;
        }
        if let Some(reg_param) = self.reg_param {
            config.training.glm.reg_param = reg_param;
        }
        if let Some(save_mode) = self.save_mode {
            config.save_mode = save_mode;
        }
        if let Some(weight_usage) = self.weight_usage {
            config.training.weight_usage = weight_usage;
        }
        if self.keep_going {
            config.keep_going = true;
        }
        if self.all {
            config.discover_countries()?;
        }
        Ok(config)
    }
}

fn parse_variant<E: FromStr + IntoEnumIterator + Display>(s: &str) -> anyhow::Result<E> {
    E::from_str(s).map_err(|_| {
        let variants: Vec<_> = E::iter().map(|variant| variant.to_string()).collect();
        anyhow!("unsupported value {s}, expected one of: {}", variants.join(", "))
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    if env::var("RUST_BACKTRACE").is_err() {
        env::set_var("RUST_BACKTRACE", "full")
    }
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info")
    }
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    args.validate()?;
    debug!("args: {args:?}");

    let config = args.to_config()?;
    config.validate()?;
    debug!("config: {config:?}");

    let session = Session::open(&config.session_config())?;
    let num_countries = config.countries.len();
    let mut outcomes = Vec::with_capacity(num_countries);
    let mut failed = vec![];
    for (index, country) in config.countries.iter().enumerate() {
        info!("training {country} ({} of {num_countries})", index + 1);
        match run_country(&session, &config, country) {
            Ok(outcome) => {
                for line in coefficient_report(country, &outcome.model) {
                    println!("{line}");
                }
                println!("{}", Console::default().render(&tabulate_coefficients(&outcome.model)));
                outcomes.push(outcome);
            }
            Err(err) if config.keep_going => {
                error!("failed to train {country}: {err}");
                failed.push(country.as_str());
            }
            Err(err) => return Err(err.into()),
        }
    }

    if !outcomes.is_empty() {
        println!("Summary:\n{}", Console::default().render(&tabulate_summary(&outcomes)));
    }
    session.close()?;

    if !failed.is_empty() {
        return Err(anyhow!("failed to train {}", failed.join(", ")).into());
    }
    Ok(())
}
