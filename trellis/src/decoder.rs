#[cfg(feature = "multithreading")]
use std::sync::Arc;
#[cfg(feature = "multithreading")]
use std::thread;

#[cfg(feature = "multithreading")]
use crossbeam_channel::{Receiver, Sender};

use crate::errors::{HmmError, Result};
use crate::lattice::Trellis;
use crate::model::{Model, START_MARKER};
use crate::utils::StringIdManager;

#[cfg(feature = "multithreading")]
use crate::{forward::ForwardResult, viterbi::DecodedPath};

/// Inference engine running the Forward and Viterbi algorithms over a model.
///
/// States are numbered in canonical order, which is also the tie-break order of every argmax.
/// Missing table entries are kept as `None` so that an undefined probability can be told apart
/// from a zero probability.
pub struct Decoder {
    model: Model,
    states: Vec<String>,
    symbol_ids: StringIdManager,

    // initial[s]
    initial: Vec<Option<f64>>,
    // transitions[prev * n_states + s]
    transitions: Vec<Option<f64>>,
    // emissions[symbol_id][s]
    emissions: Vec<Vec<Option<f64>>>,
}

impl Decoder {
    /// Creates a new decoder.
    ///
    /// # Arguments
    ///
    /// * `model` - A model data.
    ///
    /// # Errors
    ///
    /// If the model has no states, an error variant will be returned.
    pub fn new(model: Model) -> Result<Self> {
        let states: Vec<String> = model.states().into_iter().map(String::from).collect();
        if states.is_empty() {
            return Err(HmmError::invalid_model("the model has no states"));
        }
        let n_states = states.len();

        let initial = states
            .iter()
            .map(|s| model.transitions().get(START_MARKER, s))
            .collect();

        let mut transitions = Vec::with_capacity(n_states * n_states);
        for prev in &states {
            for s in &states {
                transitions.push(model.transitions().get(prev, s));
            }
        }

        let mut symbol_ids = StringIdManager::new();
        let mut emissions: Vec<Vec<Option<f64>>> = vec![];
        for symbol in model.symbols() {
            let id = symbol_ids.get_id(symbol);
            debug_assert_eq!(id, emissions.len());
            emissions.push(
                states
                    .iter()
                    .map(|s| model.emissions().get(s, symbol))
                    .collect(),
            );
        }

        tracing::debug!(
            states = n_states,
            symbols = symbol_ids.len(),
            "decoder compiled"
        );

        Ok(Self {
            model,
            states,
            symbol_ids,
            initial,
            transitions,
            emissions,
        })
    }

    /// Gets the model data.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Gets the state labels, indexed like the rows of a [`Trellis`].
    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub(crate) fn n_states(&self) -> usize {
        self.states.len()
    }

    #[inline(always)]
    pub(crate) fn transition(&self, prev: usize, state: usize) -> Option<f64> {
        self.transitions[prev * self.states.len() + state]
    }

    /// Emission probabilities of a symbol for each state, or `None` for an unknown symbol.
    pub(crate) fn emission_column(&self, symbol: &str) -> Option<&[Option<f64>]> {
        self.symbol_ids
            .find(symbol)
            .map(|id| self.emissions[id].as_slice())
    }

    /// Allocates a trellis and fills its first column with `initial[s] * emission[s][symbol]`.
    pub(crate) fn init_trellis<S>(&self, symbols: &[S], with_backpointers: bool) -> Result<Trellis>
    where
        S: AsRef<str>,
    {
        let first = symbols
            .first()
            .ok_or_else(|| HmmError::invalid_argument("symbols", "is empty"))?;
        let mut trellis = Trellis::new(self.n_states(), symbols.len(), with_backpointers);
        if let Some(emit) = self.emission_column(first.as_ref()) {
            for (s, (&init, &e)) in self.initial.iter().zip(emit).enumerate() {
                if let (Some(init), Some(e)) = (init, e) {
                    trellis.set_score(s, 0, init * e);
                }
            }
        }
        self.trace_zero_column(&trellis, 0);
        Ok(trellis)
    }

    /// Reports the first column of a run of all-zero columns.
    pub(crate) fn trace_zero_column(&self, trellis: &Trellis, t: usize) {
        if trellis.is_zero_column(t) && (t == 0 || !trellis.is_zero_column(t - 1)) {
            tracing::debug!(t, "trellis column collapsed to zero");
        }
    }

    /// Creates a multithreading decoder. This function is the alias of
    /// [`MultithreadDecoder::new()`].
    #[cfg(feature = "multithreading")]
    #[cfg_attr(docsrs, doc(cfg(feature = "multithreading")))]
    pub fn multithreading(self, n_threads: usize) -> MultithreadDecoder {
        MultithreadDecoder::new(self, n_threads)
    }
}

#[cfg(feature = "multithreading")]
#[derive(Clone, Copy)]
enum Job {
    Forward,
    Viterbi,
}

#[cfg(feature = "multithreading")]
enum Outcome {
    Forward(ForwardResult),
    Viterbi(DecodedPath),
}

/// Decoder evaluating batches of sequences on worker threads.
///
/// Each sequence is evaluated independently with its own trellis, and results are returned in
/// input order.
#[cfg(feature = "multithreading")]
#[cfg_attr(docsrs, doc(cfg(feature = "multithreading")))]
pub struct MultithreadDecoder {
    task_tx: Sender<(usize, Job, Vec<String>)>,
    result_rx: Receiver<(usize, Result<Outcome>)>,
}

#[cfg(feature = "multithreading")]
impl MultithreadDecoder {
    /// Creates a multithreading decoder.
    ///
    /// # Arguments
    ///
    /// * `decoder` - A normal decoder.
    /// * `n_threads` - The number of threads. At least one thread is spawned.
    pub fn new(decoder: Decoder, n_threads: usize) -> Self {
        let decoder = Arc::new(decoder);

        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let (task_tx, task_rx) = crossbeam_channel::unbounded::<(usize, Job, Vec<String>)>();
        for _ in 0..n_threads.max(1) {
            let decoder = Arc::clone(&decoder);
            let result_tx = result_tx.clone();
            let task_rx = task_rx.clone();
            thread::spawn(move || {
                for (i, job, symbols) in task_rx {
                    let outcome = match job {
                        Job::Forward => decoder.forward(&symbols).map(Outcome::Forward),
                        Job::Viterbi => decoder.viterbi(&symbols).map(Outcome::Viterbi),
                    };
                    if result_tx.send((i, outcome)).is_err() {
                        break;
                    }
                }
            });
        }

        Self { task_tx, result_rx }
    }

    fn run(&mut self, job: Job, sequences: Vec<Vec<String>>) -> Vec<Result<Outcome>> {
        let n = sequences.len();
        for (i, symbols) in sequences.into_iter().enumerate() {
            if self.task_tx.send((i, job, symbols)).is_err() {
                break;
            }
        }
        let mut results: Vec<Option<Result<Outcome>>> = (0..n).map(|_| None).collect();
        for _ in 0..n {
            match self.result_rx.recv() {
                Ok((i, outcome)) => results[i] = Some(outcome),
                Err(_) => break,
            }
        }
        results
            .into_iter()
            .map(|r| {
                r.unwrap_or_else(|| {
                    Err(HmmError::invalid_argument(
                        "sequences",
                        "worker threads terminated",
                    ))
                })
            })
            .collect()
    }

    /// Runs the Forward algorithm over each sequence.
    pub fn forward_batch(&mut self, sequences: Vec<Vec<String>>) -> Vec<Result<ForwardResult>> {
        self.run(Job::Forward, sequences)
            .into_iter()
            .map(|r| match r? {
                Outcome::Forward(result) => Ok(result),
                Outcome::Viterbi(_) => unreachable!(),
            })
            .collect()
    }

    /// Runs the Viterbi algorithm over each sequence.
    pub fn viterbi_batch(&mut self, sequences: Vec<Vec<String>>) -> Vec<Result<DecodedPath>> {
        self.run(Job::Viterbi, sequences)
            .into_iter()
            .map(|r| match r? {
                Outcome::Viterbi(path) => Ok(path),
                Outcome::Forward(_) => unreachable!(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::tests::cv_model;

    #[test]
    fn test_decoder_new() {
        let decoder = Decoder::new(cv_model()).unwrap();
        assert_eq!(&["C".to_string(), "V".to_string()], decoder.states());
        assert_eq!(Some(0.4), decoder.transition(0, 1));
        assert_eq!(Some(0.3), decoder.transition(1, 0));
        assert_eq!(
            Some(&[Some(0.1), Some(0.8)][..]),
            decoder.emission_column("a")
        );
        assert_eq!(None, decoder.emission_column("z"));
    }

    #[test]
    fn test_decoder_new_empty_model() {
        assert!(matches!(
            Decoder::new(Model::default()),
            Err(HmmError::InvalidModel(_))
        ));
    }

    #[test]
    fn test_decoder_keeps_undefined_entries() {
        let model =
            Model::from_readers("# A 1\nA A 0\n".as_bytes(), "A x 1\nB y 1\n".as_bytes()).unwrap();
        let decoder = Decoder::new(model).unwrap();
        assert_eq!(Some(0.0), decoder.transition(0, 0));
        assert_eq!(None, decoder.transition(0, 1));
        assert_eq!(None, decoder.transition(1, 0));
        assert_eq!(Some(&[None, Some(1.0)][..]), decoder.emission_column("y"));
    }

    #[test]
    fn test_init_trellis() {
        let decoder = Decoder::new(cv_model()).unwrap();
        let trellis = decoder.init_trellis(&["b", "a"], false).unwrap();
        assert_eq!(2, trellis.n_steps());
        assert!((trellis.score(0, 0) - 0.45).abs() < 1e-12);
        assert!((trellis.score(1, 0) - 0.10).abs() < 1e-12);
        assert_eq!(&[0.0, 0.0], trellis.column(1));
    }

    #[test]
    fn test_init_trellis_empty() {
        let decoder = Decoder::new(cv_model()).unwrap();
        let symbols: [&str; 0] = [];
        assert!(matches!(
            decoder.init_trellis(&symbols, false),
            Err(HmmError::InvalidArgument(_))
        ));
    }

    #[cfg(feature = "multithreading")]
    #[test]
    fn test_multithread_decoder_order() {
        let decoder = Decoder::new(cv_model()).unwrap();
        let sequences: Vec<Vec<String>> = ["b a", "a", "b b a a b", "a a a"]
            .iter()
            .map(|line| crate::utils::split_symbols(line).unwrap())
            .collect();
        let expected: Vec<_> = sequences
            .iter()
            .map(|seq| decoder.viterbi(seq).unwrap().states().to_vec())
            .collect();
        let expected_forward: Vec<_> = sequences
            .iter()
            .map(|seq| decoder.forward(seq).unwrap().best_state().to_string())
            .collect();

        let mut decoder = decoder.multithreading(3);
        let paths: Vec<_> = decoder
            .viterbi_batch(sequences.clone())
            .into_iter()
            .map(|r| r.unwrap().states().to_vec())
            .collect();
        assert_eq!(expected, paths);
        let finals: Vec<_> = decoder
            .forward_batch(sequences)
            .into_iter()
            .map(|r| r.unwrap().best_state().to_string())
            .collect();
        assert_eq!(expected_forward, finals);
    }

    #[cfg(feature = "multithreading")]
    #[test]
    fn test_multithread_decoder_errors() {
        let mut decoder = Decoder::new(cv_model()).unwrap().multithreading(2);
        let results = decoder.viterbi_batch(vec![vec![], vec!["a".to_string()]]);
        assert!(matches!(results[0], Err(HmmError::InvalidArgument(_))));
        assert!(results[1].is_ok());
    }
}
