use std::collections::BTreeMap;

use hashbrown::HashMap;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::errors::{HmmError, Result};
use crate::model::{Model, START_MARKER};
use crate::observation::Observation;
use crate::table::ProbabilityTable;

/// Categorical distribution over labels.
struct Categorical {
    labels: Vec<String>,
    dist: WeightedIndex<f64>,
}

impl Categorical {
    /// Returns `None` if the row has no positive probability mass.
    fn from_row(row: &BTreeMap<String, f64>) -> Option<Self> {
        let dist = WeightedIndex::new(row.values()).ok()?;
        Some(Self {
            labels: row.keys().cloned().collect(),
            dist,
        })
    }

    fn sample<R>(&self, rng: &mut R) -> &str
    where
        R: Rng + ?Sized,
    {
        &self.labels[self.dist.sample(rng)]
    }
}

fn prepare(table: &ProbabilityTable) -> HashMap<String, Option<Categorical>> {
    table
        .outer_keys()
        .map(|outer| {
            let dist = table.row(outer).and_then(Categorical::from_row);
            (outer.to_string(), dist)
        })
        .collect()
}

/// Ancestral sampler of observations.
pub struct Generator {
    transitions: HashMap<String, Option<Categorical>>,
    emissions: HashMap<String, Option<Categorical>>,
}

impl Generator {
    /// Creates a new generator.
    ///
    /// Weights are normalized by the sampler, so rows slightly off from 1 are accepted.
    ///
    /// # Arguments
    ///
    /// * `model` - A model data.
    pub fn new(model: &Model) -> Self {
        Self {
            transitions: prepare(model.transitions()),
            emissions: prepare(model.emissions()),
        }
    }

    fn next_state<R>(&self, state: &str, rng: &mut R) -> Result<String>
    where
        R: Rng + ?Sized,
    {
        match self.transitions.get(state) {
            Some(Some(dist)) => Ok(dist.sample(rng).to_string()),
            Some(None) => Err(HmmError::undefined_state(
                state,
                "transition row has no positive probability",
            )),
            None => Err(HmmError::undefined_state(state, "no transition row")),
        }
    }

    fn emit<R>(&self, state: &str, rng: &mut R) -> Result<String>
    where
        R: Rng + ?Sized,
    {
        match self.emissions.get(state) {
            Some(Some(dist)) => Ok(dist.sample(rng).to_string()),
            Some(None) => Err(HmmError::undefined_state(
                state,
                "emission row has no positive probability",
            )),
            None => Err(HmmError::undefined_state(state, "no emission row")),
        }
    }

    /// Generates an observation of the given length.
    ///
    /// # Arguments
    ///
    /// * `n` - The number of time steps.
    /// * `rng` - A random number generator.
    ///
    /// # Errors
    ///
    /// [`HmmError::UndefinedState`] is returned when a visited state has no transition or
    /// emission distribution. [`HmmError::InvalidArgument`] is returned when `n` is 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use rand::{rngs::StdRng, SeedableRng};
    /// use trellis::{Generator, Model};
    ///
    /// let model = Model::from_readers(
    ///     "# C 1\nC C 1\n".as_bytes(),
    ///     "C b 1\n".as_bytes(),
    /// ).unwrap();
    /// let mut rng = StdRng::seed_from_u64(42);
    /// let o = Generator::new(&model).generate(3, &mut rng).unwrap();
    /// assert_eq!("C C C\nb b b", o.to_string());
    /// ```
    pub fn generate<R>(&self, n: usize, rng: &mut R) -> Result<Observation>
    where
        R: Rng + ?Sized,
    {
        if n == 0 {
            return Err(HmmError::invalid_argument("n", "must be at least 1"));
        }
        let mut states = Vec::with_capacity(n);
        let mut symbols = Vec::with_capacity(n);
        let mut state = self.next_state(START_MARKER, rng)?;
        symbols.push(self.emit(&state, rng)?);
        for _ in 1..n {
            let next = self.next_state(&state, rng)?;
            symbols.push(self.emit(&next, rng)?);
            states.push(state);
            state = next;
        }
        states.push(state);
        Observation::new(states, symbols)
    }
}
