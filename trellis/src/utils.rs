use hashbrown::HashMap;

/// Assigns dense IDs to labels in insertion order.
#[derive(Clone, Debug, Default)]
pub struct StringIdManager {
    map: HashMap<String, usize>,
}

impl StringIdManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_id(&mut self, label: &str) -> usize {
        if let Some(&id) = self.map.get(label) {
            return id;
        }
        let id = self.map.len();
        self.map.insert(label.to_string(), id);
        id
    }

    pub fn find(&self, label: &str) -> Option<usize> {
        self.map.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

/// Returns the index of the maximum value. On ties the smallest index wins.
#[inline]
pub fn argmax(xs: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &x) in xs.iter().enumerate() {
        match best {
            Some((_, y)) if x <= y => (),
            _ => best = Some((i, x)),
        }
    }
    best.map(|(i, _)| i)
}

/// Splits a line of observed symbols. Returns `None` for blank lines.
///
/// # Examples
///
/// ```
/// use trellis::split_symbols;
///
/// assert_eq!(Some(vec!["b".to_string(), "a".to_string()]), split_symbols(" b  a\n"));
/// assert_eq!(None, split_symbols("  \n"));
/// ```
pub fn split_symbols(line: &str) -> Option<Vec<String>> {
    let symbols: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    (!symbols.is_empty()).then_some(symbols)
}
