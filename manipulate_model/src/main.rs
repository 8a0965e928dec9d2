use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{ArgGroup, Parser};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trellis::{Model, ProbabilityTable};

#[derive(Parser, Debug)]
#[command(
    name = "manipulate_model",
    about = "A program to convert, inspect, and edit HMM models.",
    group = ArgGroup::new("input").required(true),
)]
struct Args {
    /// Basename of the text tables (`<BASENAME>.trans` and `<BASENAME>.emit`)
    #[arg(long, group = "input")]
    model_in: Option<PathBuf>,

    /// Input path of a compressed binary model
    #[arg(long, group = "input")]
    binary_in: Option<PathBuf>,

    /// Output path of the compressed binary model
    #[arg(long)]
    model_out: Option<PathBuf>,

    /// Output basename of the text tables
    #[arg(long)]
    tables_out: Option<PathBuf>,

    /// Output the transition table as CSV
    #[arg(long)]
    dump_trans: Option<PathBuf>,

    /// Output the emission table as CSV
    #[arg(long)]
    dump_emit: Option<PathBuf>,

    /// Replace the transition table with a CSV file
    #[arg(long)]
    replace_trans: Option<PathBuf>,

    /// Replace the emission table with a CSV file
    #[arg(long)]
    replace_emit: Option<PathBuf>,

    /// Check that every row of the model is a probability distribution
    #[arg(long)]
    check: bool,

    /// The number of workers for zstd (0 means multithreaded will be disabled)
    #[arg(long, default_value = "0")]
    zstd_workers: u32,
}

#[derive(Deserialize, Serialize)]
struct TransitionRecord {
    source: String,
    dest: String,
    probability: f64,
}

#[derive(Deserialize, Serialize)]
struct EmissionRecord {
    state: String,
    symbol: String,
    probability: f64,
}

fn dump_transitions(
    table: &ProbabilityTable,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_writer(File::create(path)?);
    for (source, dest, probability) in table.iter() {
        wtr.serialize(TransitionRecord {
            source: source.to_string(),
            dest: dest.to_string(),
            probability,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

fn dump_emissions(
    table: &ProbabilityTable,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_writer(File::create(path)?);
    for (state, symbol, probability) in table.iter() {
        wtr.serialize(EmissionRecord {
            state: state.to_string(),
            symbol: symbol.to_string(),
            probability,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

fn load_transitions(path: &Path) -> Result<ProbabilityTable, Box<dyn std::error::Error>> {
    let mut rdr = csv::Reader::from_reader(File::open(path)?);
    let mut table = ProbabilityTable::new();
    for result in rdr.deserialize() {
        let record: TransitionRecord = result?;
        table.insert(record.source, record.dest, record.probability);
    }
    Ok(table)
}

fn load_emissions(path: &Path) -> Result<ProbabilityTable, Box<dyn std::error::Error>> {
    let mut rdr = csv::Reader::from_reader(File::open(path)?);
    let mut table = ProbabilityTable::new();
    for result in rdr.deserialize() {
        let record: EmissionRecord = result?;
        table.insert(record.state, record.symbol, record.probability);
    }
    Ok(table)
}

fn with_extension(basename: &Path, ext: &str) -> PathBuf {
    let mut path = basename.as_os_str().to_os_string();
    path.push(ext);
    path.into()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    tracing::info!("Loading model file...");
    let mut model = match (args.model_in, args.binary_in) {
        (Some(basename), _) => Model::load(basename)?,
        (None, Some(path)) => {
            let mut f = zstd::Decoder::new(File::open(path)?)?;
            Model::read(&mut f)?
        }
        (None, None) => unreachable!(),
    };

    if let Some(path) = args.dump_trans {
        tracing::info!("Saving transition table...");
        dump_transitions(model.transitions(), &path)?;
    }
    if let Some(path) = args.dump_emit {
        tracing::info!("Saving emission table...");
        dump_emissions(model.emissions(), &path)?;
    }

    if args.replace_trans.is_some() || args.replace_emit.is_some() {
        let transitions = match args.replace_trans {
            Some(path) => {
                tracing::info!("Loading transition table...");
                load_transitions(&path)?
            }
            None => model.transitions().clone(),
        };
        let emissions = match args.replace_emit {
            Some(path) => {
                tracing::info!("Loading emission table...");
                load_emissions(&path)?
            }
            None => model.emissions().clone(),
        };
        model = Model::new(transitions, emissions);
    }

    if args.check {
        model.validate()?;
        tracing::info!(
            states = model.states().len(),
            symbols = model.symbols().len(),
            "All rows are probability distributions"
        );
    }

    if let Some(basename) = args.tables_out {
        tracing::info!("Saving text tables...");
        let mut f = BufWriter::new(File::create(with_extension(&basename, ".trans"))?);
        model.transitions().write(&mut f)?;
        f.flush()?;
        let mut f = BufWriter::new(File::create(with_extension(&basename, ".emit"))?);
        model.emissions().write(&mut f)?;
        f.flush()?;
    }

    if let Some(path) = args.model_out {
        tracing::info!("Saving model file...");
        let mut f = zstd::Encoder::new(File::create(path)?, 19)?;
        f.multithread(args.zstd_workers)?;
        model.write(&mut f)?;
        f.finish()?;
    }

    Ok(())
}
