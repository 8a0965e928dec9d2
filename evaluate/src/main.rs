use std::fs::File;
use std::io::{prelude::*, stdin};
use std::path::{Path, PathBuf};

use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trellis::{Decoder, Generator, Model, Observation};

#[derive(Parser, Debug)]
#[command(
    name = "evaluate",
    about = "A program to evaluate the accuracy of Viterbi decoding."
)]
struct Args {
    /// The model basename; `<MODEL>.trans` and `<MODEL>.emit` are read
    #[arg(long)]
    model: PathBuf,

    /// Read MODEL as a compressed binary model written by manipulate_model
    #[arg(long)]
    binary: bool,

    /// Evaluate on observations sampled from the model instead of `symbol/state` lines from
    /// stdin
    #[arg(long)]
    samples: Option<usize>,

    /// Length of each sampled observation
    #[arg(long, default_value = "20")]
    length: usize,

    /// Seed of the random number generator used for sampling
    #[arg(long, default_value = "0")]
    seed: u64,
}

fn load_model(path: &Path, binary: bool) -> Result<Model, Box<dyn std::error::Error>> {
    if binary {
        let mut f = zstd::Decoder::new(File::open(path)?)?;
        Ok(Model::read(&mut f)?)
    } else {
        Ok(Model::load(path)?)
    }
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
    let model = load_model(&args.model, args.binary)?;

    let mut references = vec![];
    if let Some(n_samples) = args.samples {
        tracing::info!(n_samples, length = args.length, "Sampling observations");
        let generator = Generator::new(&model);
        let mut rng = StdRng::seed_from_u64(args.seed);
        for _ in 0..n_samples {
            references.push(generator.generate(args.length, &mut rng)?);
        }
    } else {
        for line in stdin().lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            references.push(Observation::from_tagged(line)?);
        }
    }

    tracing::info!("Start decoding");
    let decoder = Decoder::new(model)?;
    let mut n_tokens = 0;
    let mut n_correct_tokens = 0;
    let mut n_correct_sequences = 0;
    for reference in &references {
        let path = decoder.viterbi(reference.symbols())?;
        let n_correct = path
            .states()
            .iter()
            .zip(reference.states())
            .filter(|(h, r)| h == r)
            .count();
        if n_correct == reference.len() {
            n_correct_sequences += 1;
        }
        n_tokens += reference.len();
        n_correct_tokens += n_correct;
    }

    let token_accuracy = n_correct_tokens as f64 / n_tokens as f64;
    let sequence_accuracy = n_correct_sequences as f64 / references.len() as f64;
    println!("Token accuracy: {}", token_accuracy);
    println!("Sequence accuracy: {}", sequence_accuracy);
    println!(
        "Tokens: {}/{}, Sequences: {}/{}",
        n_correct_tokens,
        n_tokens,
        n_correct_sequences,
        references.len()
    );

    Ok(())
}
