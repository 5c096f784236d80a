use crate::Recency;

/// One entry of the portal feed, as handed to the delivery side.
///
/// Display fields are carried verbatim from the source; only `id` is
/// interpreted, and only for ordering.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NotificationItem {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub link: String,
    pub date: String,
}

impl NotificationItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn recency(&self) -> Recency<'_> {
        Recency::of(&self.id)
    }
}
