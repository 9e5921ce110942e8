//! Month labels and their calendar ordering.
//!
//! Months are free text. They are trimmed and title-cased on the way in, but they are not mapped
//! onto a fixed vocabulary, so `Jan` and `January` are stored as different values. Ordering uses
//! a fixed rank table in which both spellings of a month sit next to each other.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// Recognized month names, in the order they sort. Abbreviation first, then the full name.
pub const MONTH_ORDER: &[&str] = &[
    "Jan",
    "January",
    "Feb",
    "February",
    "Mar",
    "March",
    "Apr",
    "April",
    "May",
    "Jun",
    "June",
    "Jul",
    "July",
    "Aug",
    "August",
    "Sep",
    "September",
    "Oct",
    "October",
    "Nov",
    "November",
    "Dec",
    "December",
];

/// Rank given to labels that are not in `MONTH_ORDER`; they sort after every recognized name.
pub const UNRECOGNIZED_RANK: usize = usize::MAX;

/// A normalized month label, e.g. `March`.
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MonthLabel(String);

impl MonthLabel {
    /// Trims and title-cases `raw`.
    pub fn normalize(raw: impl AsRef<str>) -> Self {
        Self(title_case(raw.as_ref().trim()))
    }

    /// Wraps a label that was normalized before it was stored.
    pub(crate) fn from_stored(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The position of this label in `MONTH_ORDER`, or `UNRECOGNIZED_RANK`.
    pub fn rank(&self) -> usize {
        month_rank(&self.0)
    }

    /// Calendar order: rank first, then the label text.
    pub fn chronological_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl AsRef<str> for MonthLabel {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for MonthLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Looks `label` up in `MONTH_ORDER`. The match is exact; labels are expected to be normalized.
pub fn month_rank(label: &str) -> usize {
    MONTH_ORDER
        .iter()
        .position(|&m| m == label)
        .unwrap_or(UNRECOGNIZED_RANK)
}

/// Upper-cases the first letter of every word and lower-cases the rest. A word starts after any
/// character that is not cased, so `mid-year` becomes `Mid-Year`, `2nd` becomes `2Nd` and `ß` at
/// the start of a word becomes `Ss`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut previous_is_cased = false;
    for c in s.chars() {
        if previous_is_cased {
            out.extend(c.to_lowercase());
        } else {
            let mut upper = c.to_uppercase();
            out.extend(upper.next());
            out.extend(upper.flat_map(char::to_lowercase));
        }
        previous_is_cased = c.is_lowercase() || c.is_uppercase();
    }
    out
}
