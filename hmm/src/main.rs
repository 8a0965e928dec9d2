use std::fs::File;
use std::io::{prelude::*, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trellis::errors::Result as HmmResult;
use trellis::{
    split_symbols, DecodedPath, Decoder, ForwardResult, Generator, Model, MultithreadDecoder,
};

#[derive(Parser, Debug)]
#[command(
    name = "hmm",
    about = "A program to sample from and decode hidden Markov models."
)]
struct Args {
    /// The model basename; `<MODEL>.trans` and `<MODEL>.emit` are read
    model: PathBuf,

    /// Read MODEL as a compressed binary model written by manipulate_model
    #[arg(long)]
    binary: bool,

    /// Generate a random observation of the given length
    #[arg(long)]
    generate: Option<usize>,

    /// Print the most probable final state of each line of the given file
    #[arg(long)]
    forward: Option<PathBuf>,

    /// Print the most probable state sequence of each line of the given file
    #[arg(long)]
    viterbi: Option<PathBuf>,

    /// Seed of the random number generator (random if not specified)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of threads (0 decodes on the main thread)
    #[arg(long, default_value = "0")]
    n_threads: usize,

    /// Print debug logs
    #[arg(long)]
    verbose: bool,
}

enum Runner {
    Single(Decoder),
    Multi(MultithreadDecoder),
}

impl Runner {
    fn forward(&mut self, sequences: &[Vec<String>]) -> Vec<HmmResult<ForwardResult>> {
        match self {
            Self::Single(decoder) => sequences.iter().map(|s| decoder.forward(s)).collect(),
            Self::Multi(decoder) => decoder.forward_batch(sequences.to_vec()),
        }
    }

    fn viterbi(&mut self, sequences: &[Vec<String>]) -> Vec<HmmResult<DecodedPath>> {
        match self {
            Self::Single(decoder) => sequences.iter().map(|s| decoder.viterbi(s)).collect(),
            Self::Multi(decoder) => decoder.viterbi_batch(sequences.to_vec()),
        }
    }
}

fn load_model(path: &Path, binary: bool) -> Result<Model, Box<dyn std::error::Error>> {
    if binary {
        let mut f = zstd::Decoder::new(File::open(path)?)?;
        Ok(Model::read(&mut f)?)
    } else {
        Ok(Model::load(path)?)
    }
}

fn read_sequences(path: &Path) -> Result<Vec<Vec<String>>, Box<dyn std::error::Error>> {
    let f = BufReader::new(File::open(path)?);
    let mut sequences = vec![];
    for line in f.lines() {
        if let Some(symbols) = split_symbols(&line?) {
            sequences.push(symbols);
        }
    }
    Ok(sequences)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    tracing::info!("Loading model file...");
    let model = load_model(&args.model, args.binary)?;

    if let Some(n) = args.generate {
        let mut rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let observation = Generator::new(&model).generate(n, &mut rng)?;
        println!("{observation}");
    }

    if args.forward.is_none() && args.viterbi.is_none() {
        return Ok(());
    }

    let decoder = Decoder::new(model)?;
    let mut runner = if args.n_threads == 0 {
        Runner::Single(decoder)
    } else {
        tracing::info!(n_threads = args.n_threads, "Starting worker threads");
        Runner::Multi(decoder.multithreading(args.n_threads))
    };

    if let Some(path) = args.forward {
        let sequences = read_sequences(&path)?;
        tracing::info!(n_sequences = sequences.len(), "Start Forward algorithm");
        let start = Instant::now();
        let results = runner.forward(&sequences);
        for (symbols, result) in sequences.iter().zip(results) {
            let result = result?;
            println!("{}", symbols.join(" "));
            println!(
                "The best final state given the observation is: {} (likelihood: {:e})",
                result.best_state(),
                result.likelihood(),
            );
            println!();
        }
        tracing::info!("Elapsed: {} [sec]", start.elapsed().as_secs_f64());
    }

    if let Some(path) = args.viterbi {
        let sequences = read_sequences(&path)?;
        tracing::info!(n_sequences = sequences.len(), "Start Viterbi algorithm");
        let start = Instant::now();
        let results = runner.viterbi(&sequences);
        for (symbols, path) in sequences.into_iter().zip(results) {
            println!("{}", path?.into_observation(symbols)?);
            println!();
        }
        tracing::info!("Elapsed: {} [sec]", start.elapsed().as_secs_f64());
    }

    Ok(())
}
