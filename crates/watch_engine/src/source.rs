use watch_core::NotificationItem;

use crate::CycleError;

/// Where a poll cycle gets its listing from.
///
/// `authenticate` produces a session handle that lives for one cycle only;
/// `fetch` borrows it. Implementations must not keep sessions between cycles.
pub trait FeedSource {
    type Session;

    fn authenticate(&self) -> Result<Self::Session, CycleError>;

    fn fetch(&self, session: &Self::Session) -> Result<Vec<NotificationItem>, CycleError>;
}
