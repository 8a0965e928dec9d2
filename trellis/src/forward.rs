use crate::decoder::Decoder;
use crate::errors::{HmmError, Result};
use crate::lattice::Trellis;

/// Result of the Forward algorithm.
#[derive(Clone, Debug)]
pub struct ForwardResult {
    best_state: String,
    best_score: f64,
    likelihood: f64,
    trellis: Trellis,
}

impl ForwardResult {
    /// The most probable state at the last time step.
    ///
    /// If the last column is all zero, the first state in canonical order is returned.
    pub fn best_state(&self) -> &str {
        &self.best_state
    }

    /// Forward probability of [`Self::best_state()`] at the last time step.
    pub fn best_score(&self) -> f64 {
        self.best_score
    }

    /// Probability of the whole symbol sequence, summed over all paths.
    pub fn likelihood(&self) -> f64 {
        self.likelihood
    }

    pub fn trellis(&self) -> &Trellis {
        &self.trellis
    }
}

impl Decoder {
    /// Runs the Forward algorithm.
    ///
    /// Symbols that no state emits are not errors: their column collapses to zero, and so do
    /// all following columns.
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
    /// let result = decoder.forward(&["b", "a"]).unwrap();
    /// assert_eq!("V", result.best_state());
    /// ```
    pub fn forward<S>(&self, symbols: &[S]) -> Result<ForwardResult>
    where
        S: AsRef<str>,
    {
        let mut trellis = self.init_trellis(symbols, false)?;
        let n_states = self.n_states();
        for (t, symbol) in symbols.iter().enumerate().skip(1) {
            let emit = self.emission_column(symbol.as_ref());
            for s in 0..n_states {
                let Some(e) = emit.and_then(|col| col[s]) else {
                    continue;
                };
                let mut sum = 0.0;
                for prev in 0..n_states {
                    if let Some(a) = self.transition(prev, s) {
                        sum += trellis.score(prev, t - 1) * a * e;
                    }
                }
                trellis.set_score(s, t, sum);
            }
            self.trace_zero_column(&trellis, t);
        }

        let best = trellis
            .best_final()
            .ok_or_else(|| HmmError::invalid_model("the model has no states"))?;
        let last = trellis.column(trellis.n_steps() - 1);
        Ok(ForwardResult {
            best_state: self.states()[best].clone(),
            best_score: last[best],
            likelihood: last.iter().sum(),
            trellis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::tests::cv_model;
    use crate::model::Model;

    const EPS: f64 = 1e-12;

    #[test]
    fn test_forward_cv() {
        let decoder = Decoder::new(cv_model()).unwrap();
        let result = decoder.forward(&["b", "a"]).unwrap();
        let trellis = result.trellis();
        assert!((trellis.score(0, 0) - 0.45).abs() < EPS);
        assert!((trellis.score(1, 0) - 0.10).abs() < EPS);
        // 0.45 * 0.6 * 0.1 + 0.10 * 0.3 * 0.1
        assert!((trellis.score(0, 1) - 0.030).abs() < EPS);
        // 0.45 * 0.4 * 0.8 + 0.10 * 0.7 * 0.8
        assert!((trellis.score(1, 1) - 0.200).abs() < EPS);
        assert_eq!("V", result.best_state());
        assert!((result.best_score() - 0.200).abs() < EPS);
        assert!((result.likelihood() - 0.230).abs() < EPS);
    }

    #[test]
    fn test_forward_one_symbol() {
        let decoder = Decoder::new(cv_model()).unwrap();
        let result = decoder.forward(&["b"]).unwrap();
        assert_eq!("C", result.best_state());
        assert!((result.best_score() - 0.45).abs() < EPS);
        let result = decoder.forward(&["a"]).unwrap();
        assert_eq!("V", result.best_state());
        assert!((result.best_score() - 0.40).abs() < EPS);
    }

    #[test]
    fn test_forward_idempotent() {
        let decoder = Decoder::new(cv_model()).unwrap();
        let symbols = ["b", "a", "a", "b", "b", "a"];
        let a = decoder.forward(&symbols).unwrap();
        let b = decoder.forward(&symbols).unwrap();
        assert_eq!(a.best_state(), b.best_state());
        assert_eq!(a.trellis(), b.trellis());
    }

    #[test]
    fn test_forward_likelihood_sums_to_one() {
        let decoder = Decoder::new(cv_model()).unwrap();
        let mut total = 0.0;
        for x in ["a", "b"] {
            for y in ["a", "b"] {
                for z in ["a", "b"] {
                    total += decoder.forward(&[x, y, z]).unwrap().likelihood();
                }
            }
        }
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_forward_unknown_symbol() {
        let decoder = Decoder::new(cv_model()).unwrap();
        let result = decoder.forward(&["b", "z", "a", "b"]).unwrap();
        let trellis = result.trellis();
        assert!(!trellis.is_zero_column(0));
        for t in 1..4 {
            assert_eq!(&[0.0, 0.0], trellis.column(t));
        }
        assert_eq!("C", result.best_state());
        assert_eq!(0.0, result.likelihood());
    }

    #[test]
    fn test_forward_unknown_first_symbol() {
        let decoder = Decoder::new(cv_model()).unwrap();
        let result = decoder.forward(&["z", "a"]).unwrap();
        assert_eq!(0.0, result.likelihood());
    }

    #[test]
    fn test_forward_undefined_transition() {
        let model = Model::from_readers(
            "# A 1\nA B 1\nB B 1\n".as_bytes(),
            "A x 1\nB x 0.5\nB y 0.5\n".as_bytes(),
        )
        .unwrap();
        let decoder = Decoder::new(model).unwrap();
        let result = decoder.forward(&["x", "x"]).unwrap();
        assert_eq!(0.0, result.trellis().score(0, 1));
        assert!((result.trellis().score(1, 1) - 0.5).abs() < EPS);
        assert_eq!("B", result.best_state());
    }

    #[test]
    fn test_forward_empty() {
        let decoder = Decoder::new(cv_model()).unwrap();
        let symbols: Vec<String> = vec![];
        assert!(matches!(
            decoder.forward(&symbols),
            Err(HmmError::InvalidArgument(_))
        ));
    }
}
