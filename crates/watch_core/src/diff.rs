use std::collections::HashSet;

use crate::NotificationItem;

/// Returns the fetched items whose id is not in `seen`, newest first.
///
/// `seen` must be the set as it stood before this listing was merged in.
/// An id repeated within `fetched` yields one item, the first occurrence.
pub fn diff_new_items(seen: &HashSet<String>, fetched: &[NotificationItem]) -> Vec<NotificationItem> {
    let mut emitted: HashSet<&str> = HashSet::new();
    let mut fresh = Vec::new();
    for item in fetched {
        if seen.contains(&item.id) || !emitted.insert(item.id.as_str()) {
            continue;
        }
        fresh.push(item.clone());
    }
    sort_by_recency(&mut fresh);
    fresh
}

/// Orders items by descending numeric id; non-numeric ids go last in their
/// original relative order.
pub fn sort_by_recency(items: &mut [NotificationItem]) {
    items.sort_by(|a, b| b.recency().cmp(&a.recency()));
}
