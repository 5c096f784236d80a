use std::cmp::Ordering;

/// Ranking key used to approximate how recently an id was issued.
///
/// Portal ids are integers handed out in increasing order, so a larger value
/// means a newer item. An id made only of ASCII digits is numeric whatever its
/// length; anything else (signs, spaces, letters, empty) ranks below every
/// numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Recency<'a> {
    Opaque,
    Numeric(Digits<'a>),
}

impl<'a> Recency<'a> {
    pub fn of(id: &'a str) -> Self {
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Recency::Opaque;
        }
        Recency::Numeric(Digits(id.trim_start_matches('0')))
    }
}

/// Decimal digits without leading zeros, compared by numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digits<'a>(&'a str);

impl Ord for Digits<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .len()
            .cmp(&other.0.len())
            .then_with(|| self.0.cmp(other.0))
    }
}

impl PartialOrd for Digits<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
