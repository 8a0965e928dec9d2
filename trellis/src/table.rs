use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use bincode::{Decode, Encode};

use crate::errors::{HmmError, Result};

/// Two-level probability table.
///
/// Rows are keyed by an outer label (a source state) and hold a distribution over inner labels
/// (destination states or symbols). Both levels are kept in lexicographic order, so iteration is
/// deterministic.
#[derive(Clone, Debug, Default, PartialEq, Encode, Decode)]
pub struct ProbabilityTable {
    rows: BTreeMap<String, BTreeMap<String, f64>>,
}

impl ProbabilityTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a probability. An existing entry for the same pair is replaced.
    ///
    /// # Arguments
    ///
    /// * `outer` - Row label.
    /// * `inner` - Column label.
    /// * `prob` - Probability.
    ///
    /// # Returns
    ///
    /// The replaced probability, if any.
    pub fn insert<S, T>(&mut self, outer: S, inner: T, prob: f64) -> Option<f64>
    where
        S: Into<String>,
        T: Into<String>,
    {
        self.rows
            .entry(outer.into())
            .or_default()
            .insert(inner.into(), prob)
    }

    /// Gets the probability of a pair. `None` means the pair is undefined.
    pub fn get(&self, outer: &str, inner: &str) -> Option<f64> {
        self.rows.get(outer)?.get(inner).copied()
    }

    /// Gets a whole row.
    pub fn row(&self, outer: &str) -> Option<&BTreeMap<String, f64>> {
        self.rows.get(outer)
    }

    pub fn contains_row(&self, outer: &str) -> bool {
        self.rows.contains_key(outer)
    }

    /// Iterates over row labels in canonical order.
    pub fn outer_keys(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    /// Iterates over all `(outer, inner, probability)` triples in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.rows.iter().flat_map(|(outer, row)| {
            row.iter()
                .map(move |(inner, &prob)| (outer.as_str(), inner.as_str(), prob))
        })
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of defined pairs.
    pub fn n_entries(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    /// Sums each row.
    pub fn row_sums(&self) -> impl Iterator<Item = (&str, f64)> {
        self.rows
            .iter()
            .map(|(outer, row)| (outer.as_str(), row.values().sum()))
    }

    /// Parses a table in the `key1 key2 probability` text format.
    ///
    /// Blank lines are skipped. Rows are not checked to sum to 1.
    ///
    /// # Arguments
    ///
    /// * `rdr` - A data source.
    ///
    /// # Errors
    ///
    /// [`HmmError::MalformedTable`] is returned when a line does not consist of exactly three
    /// fields or when its probability is not a finite value in `[0, 1]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use trellis::ProbabilityTable;
    ///
    /// let table = ProbabilityTable::read("# C 0.5\n# V 0.5\n".as_bytes()).unwrap();
    /// assert_eq!(Some(0.5), table.get("#", "V"));
    ///
    /// assert!(ProbabilityTable::read("# C\n".as_bytes()).is_err());
    /// ```
    pub fn read<R>(rdr: R) -> Result<Self>
    where
        R: BufRead,
    {
        let mut table = Self::new();
        for (i, line) in rdr.lines().enumerate() {
            let line = line?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            let [outer, inner, prob] = fields[..] else {
                return Err(HmmError::malformed_table(
                    i + 1,
                    format!("expected 3 fields, found {}", fields.len()),
                ));
            };
            let prob = parse_probability(prob).ok_or_else(|| {
                HmmError::malformed_table(i + 1, format!("invalid probability: {prob}"))
            })?;
            if table.insert(outer, inner, prob).is_some() {
                tracing::warn!(line = i + 1, outer, inner, "duplicate entry replaced");
            }
        }
        tracing::debug!(
            rows = table.len(),
            entries = table.n_entries(),
            "probability table loaded"
        );
        Ok(table)
    }

    /// Exports the table in the `key1 key2 probability` text format.
    ///
    /// # Errors
    ///
    /// When `wtr` generates an error, it will be returned as is.
    pub fn write<W>(&self, mut wtr: W) -> Result<()>
    where
        W: Write,
    {
        for (outer, inner, prob) in self.iter() {
            writeln!(wtr, "{outer} {inner} {prob}")?;
        }
        Ok(())
    }
}

fn parse_probability(s: &str) -> Option<f64> {
    let prob: f64 = s.parse().ok()?;
    (prob.is_finite() && (0.0..=1.0).contains(&prob)).then_some(prob)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANS: &str = "\
# C 0.814506898514
# V 0.185493101486
C C 0.625840873591
C V 0.374159126409
V C 0.603126993184
V V 0.396873006816
";

    #[test]
    fn test_read() {
        let table = ProbabilityTable::read(TRANS.as_bytes()).unwrap();
        assert_eq!(3, table.len());
        assert_eq!(6, table.n_entries());
        assert_eq!(Some(0.374159126409), table.get("C", "V"));
        assert_eq!(None, table.get("C", "#"));
        assert_eq!(None, table.get("X", "C"));
        assert_eq!(vec!["#", "C", "V"], table.outer_keys().collect::<Vec<_>>());
    }

    #[test]
    fn test_read_rows_sum_to_one() {
        let table = ProbabilityTable::read(TRANS.as_bytes()).unwrap();
        for (outer, sum) in table.row_sums() {
            assert!((sum - 1.0).abs() < 1e-6, "row {outer} sums to {sum}");
        }
    }

    #[test]
    fn test_read_skips_blank_lines() {
        let table = ProbabilityTable::read("\nC b 0.9\n   \nC a 0.1\n\n".as_bytes()).unwrap();
        assert_eq!(2, table.n_entries());
    }

    #[test]
    fn test_read_tabs() {
        let table = ProbabilityTable::read("C\tb\t0.9\n".as_bytes()).unwrap();
        assert_eq!(Some(0.9), table.get("C", "b"));
    }

    #[test]
    fn test_read_duplicate_replaces() {
        let table = ProbabilityTable::read("C b 0.9\nC b 0.2\n".as_bytes()).unwrap();
        assert_eq!(Some(0.2), table.get("C", "b"));
        assert_eq!(1, table.n_entries());
    }

    #[test]
    fn test_read_two_fields() {
        let err = ProbabilityTable::read("C b 0.9\nC a\n".as_bytes()).unwrap_err();
        match err {
            HmmError::MalformedTable(e) => assert_eq!(2, e.line()),
            e => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_read_four_fields() {
        assert!(ProbabilityTable::read("C b 0.9 x\n".as_bytes()).is_err());
    }

    #[test]
    fn test_read_invalid_probability() {
        assert!(ProbabilityTable::read("C b zero\n".as_bytes()).is_err());
        assert!(ProbabilityTable::read("C b 1.5\n".as_bytes()).is_err());
        assert!(ProbabilityTable::read("C b -0.1\n".as_bytes()).is_err());
        assert!(ProbabilityTable::read("C b NaN\n".as_bytes()).is_err());
        assert!(ProbabilityTable::read("C b inf\n".as_bytes()).is_err());
    }

    #[test]
    fn test_read_bounds() {
        let table = ProbabilityTable::read("C b 0\nC a 1\n".as_bytes()).unwrap();
        assert_eq!(Some(0.0), table.get("C", "b"));
        assert_eq!(Some(1.0), table.get("C", "a"));
    }

    #[test]
    fn test_write() {
        let mut table = ProbabilityTable::new();
        table.insert("V", "a", 0.8);
        table.insert("C", "b", 0.9);
        table.insert("V", "b", 0.2);
        let mut buf = vec![];
        table.write(&mut buf).unwrap();
        assert_eq!("C b 0.9\nV a 0.8\nV b 0.2\n", String::from_utf8(buf).unwrap());
    }

    #[test]
    fn test_write_read() {
        let table = ProbabilityTable::read(TRANS.as_bytes()).unwrap();
        let mut buf = vec![];
        table.write(&mut buf).unwrap();
        assert_eq!(table, ProbabilityTable::read(buf.as_slice()).unwrap());
    }
}
