use crate::utils;

// Scores are stored column by column:
//
//        t=0  t=1  t=2 ...
//
// s=0     0    3    6
// s=1     1    4    .
// s=2     2    5    .
//
// Column `t` holds the scores after observing `t + 1` symbols. The start marker is not a row;
// its transition row only seeds column 0.

/// State-by-time matrix of scores computed by the Forward and Viterbi algorithms.
#[derive(Clone, Debug, PartialEq)]
pub struct Trellis {
    n_states: usize,
    n_steps: usize,
    scores: Vec<f64>,
    backpointers: Option<Vec<Option<usize>>>,
}

impl Trellis {
    pub(crate) fn new(n_states: usize, n_steps: usize, with_backpointers: bool) -> Self {
        let size = n_states * n_steps;
        Self {
            n_states,
            n_steps,
            scores: vec![0.0; size],
            backpointers: with_backpointers.then(|| vec![None; size]),
        }
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Gets the score of `state` at time step `t` (0-origin).
    ///
    /// # Panics
    ///
    /// Panics if `state` or `t` is out of range.
    pub fn score(&self, state: usize, t: usize) -> f64 {
        self.scores[self.index(state, t)]
    }

    /// Gets the scores of all states at time step `t`.
    pub fn column(&self, t: usize) -> &[f64] {
        let start = t * self.n_states;
        &self.scores[start..start + self.n_states]
    }

    /// Gets the predecessor of `state` at time step `t` on the best path reaching it.
    ///
    /// `None` is returned for the first time step, for cells without any valid predecessor, and
    /// for trellises computed by the Forward algorithm.
    pub fn backpointer(&self, state: usize, t: usize) -> Option<usize> {
        self.backpointers
            .as_ref()
            .and_then(|bps| bps[self.index(state, t)])
    }

    /// Returns the best state at the last time step, preferring lower indices on ties.
    pub fn best_final(&self) -> Option<usize> {
        self.n_steps
            .checked_sub(1)
            .and_then(|t| utils::argmax(self.column(t)))
    }

    pub(crate) fn set_score(&mut self, state: usize, t: usize, score: f64) {
        let idx = self.index(state, t);
        self.scores[idx] = score;
    }

    pub(crate) fn set_backpointer(&mut self, state: usize, t: usize, prev: usize) {
        let idx = self.index(state, t);
        if let Some(bps) = self.backpointers.as_mut() {
            bps[idx] = Some(prev);
        }
    }

    pub(crate) fn is_zero_column(&self, t: usize) -> bool {
        self.column(t).iter().all(|&x| x == 0.0)
    }

    #[inline(always)]
    fn index(&self, state: usize, t: usize) -> usize {
        assert!(state < self.n_states, "state out of range: {state}");
        t * self.n_states + state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trellis_new() {
        let trellis = Trellis::new(2, 3, false);
        assert_eq!(2, trellis.n_states());
        assert_eq!(3, trellis.n_steps());
        assert_eq!(&[0.0, 0.0], trellis.column(2));
        assert_eq!(None, trellis.backpointer(1, 2));
    }

    #[test]
    fn test_trellis_column_layout() {
        let mut trellis = Trellis::new(3, 2, false);
        trellis.set_score(0, 1, 0.1);
        trellis.set_score(2, 1, 0.3);
        assert_eq!(&[0.0, 0.0, 0.0], trellis.column(0));
        assert_eq!(&[0.1, 0.0, 0.3], trellis.column(1));
        assert_eq!(0.3, trellis.score(2, 1));
    }

    #[test]
    fn test_trellis_backpointer() {
        let mut trellis = Trellis::new(2, 2, true);
        trellis.set_backpointer(1, 1, 0);
        assert_eq!(Some(0), trellis.backpointer(1, 1));
        assert_eq!(None, trellis.backpointer(0, 1));
    }

    #[test]
    fn test_trellis_backpointer_ignored_without_storage() {
        let mut trellis = Trellis::new(2, 2, false);
        trellis.set_backpointer(1, 1, 0);
        assert_eq!(None, trellis.backpointer(1, 1));
    }

    #[test]
    fn test_trellis_best_final() {
        let mut trellis = Trellis::new(3, 2, false);
        assert_eq!(Some(0), trellis.best_final());
        trellis.set_score(1, 1, 0.2);
        trellis.set_score(2, 1, 0.2);
        assert_eq!(Some(1), trellis.best_final());
        assert_eq!(None, Trellis::new(3, 0, false).best_final());
    }

    #[test]
    fn test_trellis_is_zero_column() {
        let mut trellis = Trellis::new(2, 2, false);
        trellis.set_score(1, 0, 0.5);
        assert!(!trellis.is_zero_column(0));
        assert!(trellis.is_zero_column(1));
    }

    #[test]
    #[should_panic]
    fn test_trellis_state_out_of_range() {
        Trellis::new(2, 2, false).score(2, 0);
    }
}
