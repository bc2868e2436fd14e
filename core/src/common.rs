//! Enumeration of common parameter combinations.
//!
//! A combination spec gives one value domain per free parameter; the
//! combinations are the cross product of those domains, enumerated lazily in
//! odometer order (last position varies fastest).

use crate::Value;

/// Lazy cross product over a list of value domains.
///
/// Clone it before consuming to enumerate a second time.
///
/// # Examples
///
/// ```
/// use bolts_core::{Combinations, Value};
///
/// let combos: Vec<_> = Combinations::new(vec![
///     vec![Value::from("M3"), Value::from("M4")],
///     vec![Value::Bool(true), Value::Bool(false)],
/// ])
/// .collect();
/// assert_eq!(combos.len(), 4);
/// assert_eq!(combos[1], vec![Value::from("M3"), Value::Bool(false)]);
/// ```
#[derive(Debug, Clone)]
pub struct Combinations {
    domains: Vec<Vec<Value>>,
    cursor: Vec<usize>,
    exhausted: bool,
}

impl Combinations {
    pub fn new(domains: Vec<Vec<Value>>) -> Self {
        let exhausted = domains.iter().any(Vec::is_empty);
        let cursor = vec![0; domains.len()];
        Self {
            domains,
            cursor,
            exhausted,
        }
    }

    /// Number of combinations still to be produced.
    ///
    /// Saturates at `usize::MAX` for cross products too large to count.
    pub fn remaining(&self) -> usize {
        if self.exhausted {
            return 0;
        }
        let mut remaining: usize = 1;
        let mut consumed: usize = 0;
        for (domain, &pos) in self.domains.iter().zip(&self.cursor) {
            consumed = consumed.saturating_mul(domain.len()).saturating_add(pos);
            remaining = remaining.saturating_mul(domain.len());
        }
        remaining.saturating_sub(consumed)
    }
}

impl Iterator for Combinations {
    type Item = Vec<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let item = self
            .domains
            .iter()
            .zip(&self.cursor)
            .map(|(domain, &pos)| domain[pos].clone())
            .collect();

        // advance the odometer
        let mut position = self.domains.len();
        loop {
            if position == 0 {
                self.exhausted = true;
                break;
            }
            position -= 1;
            self.cursor[position] += 1;
            if self.cursor[position] < self.domains[position].len() {
                break;
            }
            self.cursor[position] = 0;
        }

        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Combinations {}
