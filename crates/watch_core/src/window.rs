use std::collections::HashSet;

use crate::Recency;

/// Folds `observed` ids into `seen` and trims the result to `capacity`.
///
/// When the union fits it is returned as is. Otherwise ids are ranked by
/// [`Recency`], highest first, and the top `capacity` are kept. Equal ranks
/// keep ids from `observed` (in first-occurrence order) ahead of inherited
/// ones, and inherited ones in text order, so the result is deterministic.
pub fn merge_window(
    seen: &HashSet<String>,
    observed: &[String],
    capacity: usize,
) -> HashSet<String> {
    let mut union: HashSet<String> = seen.clone();
    union.extend(observed.iter().cloned());
    if union.len() <= capacity {
        return union;
    }

    let mut candidates: Vec<&str> = Vec::with_capacity(union.len());
    let mut placed: HashSet<&str> = HashSet::with_capacity(union.len());
    for id in observed {
        if placed.insert(id.as_str()) {
            candidates.push(id.as_str());
        }
    }
    let mut inherited: Vec<&str> = seen
        .iter()
        .map(String::as_str)
        .filter(|id| !placed.contains(id))
        .collect();
    inherited.sort_unstable();
    candidates.extend(inherited);

    // Stable sort: equal ranks keep the candidate order built above.
    candidates.sort_by(|a, b| Recency::of(b).cmp(&Recency::of(a)));
    candidates
        .into_iter()
        .take(capacity)
        .map(ToOwned::to_owned)
        .collect()
}
