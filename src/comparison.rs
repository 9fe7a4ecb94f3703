use std::{cmp::Ordering, fmt};

use serde::Serialize;

/// One candidate column scored against an unnamed column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub column: String,
    pub comparable_records: usize,
    /// Records actually compared; zero matches may be excluded.
    pub records_compared: usize,
    pub matches: usize,
    pub unique_matches: usize,
    pub percentage: f32,
    /// Scored without any non-zero match; ranks below regular scores.
    pub zero_count_fallback: bool,
}

impl Comparison {
    /// A mapping known to be correct without scoring, e.g. id to id.
    pub fn confirmed(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            comparable_records: 0,
            records_compared: 0,
            matches: 0,
            unique_matches: 0,
            percentage: 1.0,
            zero_count_fallback: false,
        }
    }

    pub fn scalar(&self, other: &Comparison) -> f32 {
        let mut scalar = self.unique_matches as f32 / (other.unique_matches.max(1) as f32);
        scalar *= self.matches as f32 / (other.matches.max(1) as f32);
        scalar *= self.records_compared as f32 / (other.records_compared.max(1) as f32);
        if scalar == 0.0 { 1.0 } else { scalar }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}%]",
            self.column,
            format_significant(self.percentage, 2)
        )
    }
}

/// Orders two comparisons best first.
///
/// Regular scores precede zero-count fallbacks. Within a group the
/// percentages are weighted by [`Comparison::scalar`], then ties fall through
/// to unique matches, matches, records compared and comparable records.
pub fn rank(a: &Comparison, b: &Comparison) -> Ordering {
    a.zero_count_fallback
        .cmp(&b.zero_count_fallback)
        .then_with(|| {
            let scalar = a.scalar(b);
            (b.percentage / scalar).total_cmp(&(a.percentage * scalar))
        })
        .then_with(|| b.unique_matches.cmp(&a.unique_matches))
        .then_with(|| b.matches.cmp(&a.matches))
        .then_with(|| b.records_compared.cmp(&a.records_compared))
        .then_with(|| b.comparable_records.cmp(&a.comparable_records))
}

/// Stable insertion sort by [`rank`].
///
/// `rank` is not transitive once scalars differ, and the standard library
/// sorts may panic on such orderings.
pub fn sort_ranked(list: &mut [Comparison]) {
    for i in 1..list.len() {
        let mut j = i;
        while j > 0 && rank(&list[j], &list[j - 1]) == Ordering::Less {
            list.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// Formats `value` with at most `digits` significant digits, trailing zeros
/// removed.
pub fn format_significant(value: f32, digits: i32) -> String {
    if value == 0.0 || !value.is_finite() {
        return "0".to_string();
    }
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = (digits - 1 - magnitude).max(0) as usize;
    let mut rendered = format!("{value:.decimals$}");
    if rendered.contains('.') {
        while rendered.ends_with('0') {
            rendered.pop();
        }
        if rendered.ends_with('.') {
            rendered.pop();
        }
    }
    rendered
}
