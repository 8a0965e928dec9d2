use std::fmt;

use crate::errors::{HmmError, Result};

/// A state sequence paired with the symbols emitted along it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    states: Vec<String>,
    symbols: Vec<String>,
}

impl Observation {
    /// Creates a new [`Observation`].
    ///
    /// # Errors
    ///
    /// If `states` and `symbols` have different lengths, an error variant will be returned.
    pub fn new(states: Vec<String>, symbols: Vec<String>) -> Result<Self> {
        if states.len() != symbols.len() {
            return Err(HmmError::invalid_argument(
                "states",
                format!(
                    "{} states for {} symbols",
                    states.len(),
                    symbols.len()
                ),
            ));
        }
        Ok(Self { states, symbols })
    }

    /// Creates a new [`Observation`] from `symbol/state` tokens separated by whitespaces.
    ///
    /// Each token is split at its last slash, so symbols may contain slashes.
    ///
    /// # Errors
    ///
    /// This function will return an error variant when:
    ///
    /// * `tagged_text` contains no tokens.
    /// * a token has no slash, or an empty symbol or state.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis::Observation;
    ///
    /// let o = Observation::from_tagged("the/DET dog/NOUN").unwrap();
    /// assert_eq!(&["DET", "NOUN"], o.states());
    /// assert_eq!(&["the", "dog"], o.symbols());
    ///
    /// assert!(Observation::from_tagged("the dog").is_err());
    /// ```
    pub fn from_tagged<S>(tagged_text: S) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let mut states = vec![];
        let mut symbols = vec![];
        for token in tagged_text.as_ref().split_whitespace() {
            match token.rsplit_once('/') {
                Some((symbol, state)) if !symbol.is_empty() && !state.is_empty() => {
                    symbols.push(symbol.to_string());
                    states.push(state.to_string());
                }
                _ => {
                    return Err(HmmError::invalid_argument(
                        "tagged_text",
                        format!("invalid token: {token}"),
                    ));
                }
            }
        }
        if states.is_empty() {
            return Err(HmmError::invalid_argument("tagged_text", "is empty"));
        }
        Ok(Self { states, symbols })
    }

    /// Generates a string of `symbol/state` tokens.
    pub fn to_tagged_string(&self) -> String {
        self.symbols
            .iter()
            .zip(&self.states)
            .map(|(symbol, state)| format!("{symbol}/{state}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// The state line followed by the symbol line.
impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.states.join(" "))?;
        write!(f, "{}", self.symbols.join(" "))
    }
}
