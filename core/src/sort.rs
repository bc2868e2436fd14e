//! Ordering of discrete choices.
//!
//! Table keys such as `M2`, `M2.5`, `M10` should be presented by size rather
//! than alphabetically. A fixed list of [`SortStrategy`]s is tried in order and
//! the first applicable one sorts the candidates.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

static NUMERIC_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^0-9]*([0-9]+(?:\.[0-9]*)?)$").expect("static regex must compile")
});

/// Strategy for ordering a set of choice strings.
pub trait SortStrategy: Sync {
    fn name(&self) -> &'static str;
    fn is_applicable(&self, candidates: &[String]) -> bool;
    fn sort(&self, candidates: Vec<String>) -> Vec<String>;
}

/// Sorts by a trailing decimal number, e.g. `M2.5` → 2.5, `#10` → 10.
#[derive(Debug, Clone, Copy, Default)]
pub struct Numerical;

impl Numerical {
    fn key(candidate: &str) -> Option<f64> {
        NUMERIC_SUFFIX
            .captures(candidate)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

impl SortStrategy for Numerical {
    fn name(&self) -> &'static str {
        "numerical"
    }

    fn is_applicable(&self, candidates: &[String]) -> bool {
        candidates.iter().all(|c| Self::key(c).is_some())
    }

    fn sort(&self, mut candidates: Vec<String>) -> Vec<String> {
        candidates.sort_by(|a, b| {
            let ka = Self::key(a).unwrap_or(f64::INFINITY);
            let kb = Self::key(b).unwrap_or(f64::INFINITY);
            ka.partial_cmp(&kb).unwrap_or(Ordering::Equal).then_with(|| a.cmp(b))
        });
        candidates
    }
}

/// Plain lexicographic order; always applicable.
#[derive(Debug, Clone, Copy, Default)]
pub struct Alphabetical;

impl SortStrategy for Alphabetical {
    fn name(&self) -> &'static str {
        "alphabetical"
    }

    fn is_applicable(&self, _candidates: &[String]) -> bool {
        true
    }

    fn sort(&self, mut candidates: Vec<String>) -> Vec<String> {
        candidates.sort();
        candidates
    }
}

/// Strategies in the order they are tried.
pub static SORT_STRATEGIES: [&dyn SortStrategy; 2] = [&Numerical, &Alphabetical];

/// Sorts `candidates` with the first applicable strategy in [`SORT_STRATEGIES`].
///
/// # Examples
///
/// ```
/// use bolts_core::sort_choices;
///
/// let sorted = sort_choices(vec!["M10".into(), "M2.5".into(), "M3".into()]);
/// assert_eq!(sorted, vec!["M2.5", "M3", "M10"]);
///
/// let sorted = sort_choices(vec!["steel".into(), "brass".into()]);
/// assert_eq!(sorted, vec!["brass", "steel"]);
/// ```
pub fn sort_choices(candidates: Vec<String>) -> Vec<String> {
    match SORT_STRATEGIES
        .iter()
        .find(|strategy| strategy.is_applicable(&candidates))
    {
        Some(strategy) => strategy.sort(candidates),
        None => candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_numerical_applicability() {
        assert!(Numerical.is_applicable(&strings(&["M2.5", "#10", "12"])));
        assert!(!Numerical.is_applicable(&strings(&["M2", "M3x0.5"])));
        assert!(!Numerical.is_applicable(&strings(&["M2", "large"])));
    }

    #[test]
    fn test_numerical_sorts_by_suffix() {
        let sorted = Numerical.sort(strings(&["M10", "M2", "M2.5", "M1.6"]));
        assert_eq!(sorted, strings(&["M1.6", "M2", "M2.5", "M10"]));
    }

    #[test]
    fn test_alphabetical_is_fallback() {
        let sorted = sort_choices(strings(&["M3x0.5", "M10x1", "M2x0.4"]));
        assert_eq!(sorted, strings(&["M10x1", "M2x0.4", "M3x0.5"]));
    }

    #[test]
    fn test_first_applicable_strategy_wins() {
        let candidates = strings(&["#10", "#4"]);
        let chosen = SORT_STRATEGIES
            .iter()
            .find(|s| s.is_applicable(&candidates))
            .map(|s| s.name());
        assert_eq!(chosen, Some("numerical"));
        assert_eq!(sort_choices(candidates), strings(&["#4", "#10"]));
    }

    #[test]
    fn test_empty_candidates() {
        assert!(sort_choices(Vec::new()).is_empty());
    }
}
