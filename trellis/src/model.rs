use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use bincode::{Decode, Encode};

use crate::errors::{HmmError, Result};
use crate::table::ProbabilityTable;

/// Label of the pseudo-state preceding the first observation.
pub const START_MARKER: &str = "#";

/// Tolerance used when checking that a row is a distribution.
pub const EPSILON: f64 = 1e-6;

/// Hidden Markov model with discrete states and emissions.
///
/// The transition row of [`START_MARKER`] is the initial state distribution.
#[derive(Clone, Debug, Default, PartialEq, Encode, Decode)]
pub struct Model {
    pub(crate) transitions: ProbabilityTable,
    pub(crate) emissions: ProbabilityTable,
}

impl Model {
    /// Creates a model from transition and emission tables.
    ///
    /// # Arguments
    ///
    /// * `transitions` - Source state to destination state probabilities.
    /// * `emissions` - State to symbol probabilities.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis::{Model, ProbabilityTable};
    ///
    /// let mut transitions = ProbabilityTable::new();
    /// transitions.insert("#", "C", 1.0);
    /// transitions.insert("C", "C", 1.0);
    /// let mut emissions = ProbabilityTable::new();
    /// emissions.insert("C", "b", 1.0);
    ///
    /// let model = Model::new(transitions, emissions);
    /// assert_eq!(vec!["C"], model.states());
    /// ```
    pub fn new(transitions: ProbabilityTable, emissions: ProbabilityTable) -> Self {
        Self {
            transitions,
            emissions,
        }
    }

    /// Loads a model from `<basename>.trans` and `<basename>.emit`.
    ///
    /// # Errors
    ///
    /// I/O errors are returned as is. [`HmmError::MalformedTable`] is returned when a line cannot
    /// be parsed.
    pub fn load<P>(basename: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let basename = basename.as_ref().as_os_str();
        let mut trans_path = basename.to_os_string();
        trans_path.push(".trans");
        let mut emit_path = basename.to_os_string();
        emit_path.push(".emit");
        tracing::debug!(?trans_path, ?emit_path, "loading model tables");
        Self::from_readers(
            BufReader::new(File::open(trans_path)?),
            BufReader::new(File::open(emit_path)?),
        )
    }

    /// Parses a model from a transition table and an emission table.
    ///
    /// # Arguments
    ///
    /// * `trans` - Transition table in the `source dest probability` format.
    /// * `emit` - Emission table in the `state symbol probability` format.
    pub fn from_readers<R, S>(trans: R, emit: S) -> Result<Self>
    where
        R: BufRead,
        S: BufRead,
    {
        Ok(Self::new(
            ProbabilityTable::read(trans)?,
            ProbabilityTable::read(emit)?,
        ))
    }

    /// Exports the model data.
    ///
    /// # Errors
    ///
    /// When `wtr` generates an error, it will be returned as is.
    pub fn write<W>(&self, wtr: &mut W) -> Result<()>
    where
        W: Write,
    {
        bincode::encode_into_std_write(self, wtr, bincode::config::standard())?;
        Ok(())
    }

    /// Creates a model from a reader of exported model data.
    ///
    /// # Errors
    ///
    /// When `rdr` generates an error, it will be returned as is.
    pub fn read<R>(rdr: &mut R) -> Result<Self>
    where
        R: Read,
    {
        Ok(bincode::decode_from_std_read(
            rdr,
            bincode::config::standard(),
        )?)
    }

    pub fn transitions(&self) -> &ProbabilityTable {
        &self.transitions
    }

    pub fn emissions(&self) -> &ProbabilityTable {
        &self.emissions
    }

    /// Returns all hidden states in canonical order, excluding [`START_MARKER`].
    pub fn states(&self) -> Vec<&str> {
        let mut states = BTreeSet::new();
        for (src, dst, _) in self.transitions.iter() {
            states.insert(src);
            states.insert(dst);
        }
        states.extend(self.emissions.outer_keys());
        states.remove(START_MARKER);
        states.into_iter().collect()
    }

    /// Returns all emitted symbols in canonical order.
    pub fn symbols(&self) -> Vec<&str> {
        let symbols: BTreeSet<_> = self.emissions.iter().map(|(_, sym, _)| sym).collect();
        symbols.into_iter().collect()
    }

    /// Checks that the start row exists and that every row of both tables sums to 1.
    ///
    /// # Errors
    ///
    /// [`HmmError::InvalidModel`] is returned for the first violation.
    pub fn validate(&self) -> Result<()> {
        if !self.transitions.contains_row(START_MARKER) {
            return Err(HmmError::invalid_model(format!(
                "no transitions from the start marker `{START_MARKER}`"
            )));
        }
        for (name, table) in [
            ("transition", &self.transitions),
            ("emission", &self.emissions),
        ] {
            for (outer, sum) in table.row_sums() {
                if (sum - 1.0).abs() > EPSILON {
                    return Err(HmmError::invalid_model(format!(
                        "{name} row `{outer}` sums to {sum}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const CV_TRANS: &str = "\
# C 0.5
# V 0.5
C C 0.6
C V 0.4
V C 0.3
V V 0.7
";

    pub(crate) const CV_EMIT: &str = "\
C b 0.9
C a 0.1
V a 0.8
V b 0.2
";

    pub(crate) fn cv_model() -> Model {
        Model::from_readers(CV_TRANS.as_bytes(), CV_EMIT.as_bytes()).unwrap()
    }

    #[test]
    fn test_from_readers() {
        let model = cv_model();
        assert_eq!(Some(0.5), model.transitions().get(START_MARKER, "C"));
        assert_eq!(Some(0.7), model.transitions().get("V", "V"));
        assert_eq!(Some(0.9), model.emissions().get("C", "b"));
        assert_eq!(None, model.emissions().get("C", "z"));
    }

    #[test]
    fn test_states_and_symbols() {
        let model = cv_model();
        assert_eq!(vec!["C", "V"], model.states());
        assert_eq!(vec!["a", "b"], model.symbols());
    }

    #[test]
    fn test_states_include_destinations() {
        let model = Model::from_readers("# A 1\nA B 1\n".as_bytes(), "A x 1\n".as_bytes()).unwrap();
        assert_eq!(vec!["A", "B"], model.states());
    }

    #[test]
    fn test_validate() {
        assert!(cv_model().validate().is_ok());
    }

    #[test]
    fn test_validate_bad_row() {
        let model =
            Model::from_readers("# C 1\nC C 0.6\nC V 0.3\n".as_bytes(), CV_EMIT.as_bytes())
                .unwrap();
        assert!(matches!(model.validate(), Err(HmmError::InvalidModel(_))));
    }

    #[test]
    fn test_validate_no_start() {
        let model = Model::from_readers("C C 1\n".as_bytes(), "C b 1\n".as_bytes()).unwrap();
        assert!(matches!(model.validate(), Err(HmmError::InvalidModel(_))));
    }

    #[test]
    fn test_validate_tolerates_rounding() {
        let model =
            Model::from_readers("# C 0.3333333\n# V 0.6666667\n".as_bytes(), "".as_bytes())
                .unwrap();
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Model::load("/nonexistent/model"),
            Err(HmmError::IOError(_))
        ));
    }

    #[test]
    fn test_write_read() {
        let model = cv_model();
        let mut buf = vec![];
        model.write(&mut buf).unwrap();
        let restored = Model::read(&mut buf.as_slice()).unwrap();
        assert_eq!(model, restored);
    }
}
