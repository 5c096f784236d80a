//! Watch core: pure deduplication logic for the portal poller.
mod diff;
mod item;
mod recency;
mod state;
mod window;

pub use diff::{diff_new_items, sort_by_recency};
pub use item::NotificationItem;
pub use recency::{Digits, Recency};
pub use state::{SeenState, SeenStats, DEFAULT_WINDOW_CAPACITY};
pub use window::merge_window;
