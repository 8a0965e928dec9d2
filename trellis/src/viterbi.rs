use crate::decoder::Decoder;
use crate::errors::{HmmError, Result};
use crate::lattice::Trellis;
use crate::observation::Observation;
use crate::utils;

/// The most probable state sequence found by the Viterbi algorithm.
#[derive(Clone, Debug)]
pub struct DecodedPath {
    states: Vec<String>,
    score: f64,
    trellis: Trellis,
}

impl DecodedPath {
    /// Decoded states, one for each observed symbol.
    pub fn states(&self) -> &[String] {
        &self.states
    }

    /// Joint probability of the path and the observed symbols.
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn trellis(&self) -> &Trellis {
        &self.trellis
    }

    /// Pairs the decoded states with the observed symbols.
    ///
    /// # Errors
    ///
    /// If `symbols` is not as long as the path, an error variant will be returned.
    pub fn into_observation(self, symbols: Vec<String>) -> Result<Observation> {
        Observation::new(self.states, symbols)
    }
}

impl Decoder {
    /// Runs the Viterbi algorithm.
    ///
    /// A cell without any predecessor having both a defined transition and a defined emission
    /// scores 0 and has no backpointer. When the backward walk meets such a cell, it continues
    /// from the best state of the previous column, so the path always has one state per symbol.
    ///
    /// # Arguments
    ///
    /// * `symbols` - An observed symbol sequence.
    ///
    /// # Errors
    ///
    /// If `symbols` is empty, an error variant will be returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis::{Decoder, Model};
    ///
    /// let model = Model::from_readers(
    ///     "# C 0.5\n# V 0.5\nC C 0.6\nC V 0.4\nV C 0.3\nV V 0.7\n".as_bytes(),
    ///     "C b 0.9\nC a 0.1\nV a 0.8\nV b 0.2\n".as_bytes(),
    /// ).unwrap();
    /// let decoder = Decoder::new(model).unwrap();
    ///
    /// let path = decoder.viterbi(&["b", "a"]).unwrap();
    /// assert_eq!(&["C", "V"], path.states());
    /// ```
    pub fn viterbi<S>(&self, symbols: &[S]) -> Result<DecodedPath>
    where
        S: AsRef<str>,
    {
        let mut trellis = self.init_trellis(symbols, true)?;
        let n_states = self.n_states();
        for (t, symbol) in symbols.iter().enumerate().skip(1) {
            let emit = self.emission_column(symbol.as_ref());
            for s in 0..n_states {
                let Some(e) = emit.and_then(|col| col[s]) else {
                    continue;
                };
                let mut best: Option<(usize, f64)> = None;
                for prev in 0..n_states {
                    if let Some(a) = self.transition(prev, s) {
                        let candidate = trellis.score(prev, t - 1) * a * e;
                        match best {
                            Some((_, score)) if candidate <= score => (),
                            _ => best = Some((prev, candidate)),
                        }
                    }
                }
                if let Some((prev, score)) = best {
                    trellis.set_score(s, t, score);
                    trellis.set_backpointer(s, t, prev);
                }
            }
            self.trace_zero_column(&trellis, t);
        }

        let last = trellis
            .best_final()
            .ok_or_else(|| HmmError::invalid_model("the model has no states"))?;
        let mut path = Vec::with_capacity(symbols.len());
        let mut state = last;
        path.push(state);
        for t in (1..symbols.len()).rev() {
            state = match trellis.backpointer(state, t) {
                Some(prev) => prev,
                None => utils::argmax(trellis.column(t - 1)).unwrap_or(0),
            };
            path.push(state);
        }
        path.reverse();

        Ok(DecodedPath {
            states: path.into_iter().map(|s| self.states()[s].clone()).collect(),
            score: trellis.score(last, symbols.len() - 1),
            trellis,
        })
    }
}
