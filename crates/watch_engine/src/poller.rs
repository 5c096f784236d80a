use watch_core::{diff_new_items, merge_window, NotificationItem, SeenState};
use watch_logging::{watch_debug, watch_error, watch_info, watch_warn};

use crate::{
    Batch, CycleError, FailureKind, FeedSource, LoadStatus, LoadedState, Stage, StateStore,
    StoreError,
};

/// Result of one poll cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Stopped before committing; the stored state was not touched.
    Aborted(CycleError),
    /// Fetched and diffed. `persisted` reports whether the new seen state
    /// reached disk; the items are valid either way.
    Completed {
        new_items: Vec<NotificationItem>,
        persisted: Result<(), StoreError>,
    },
}

impl CycleOutcome {
    pub fn new_items(&self) -> &[NotificationItem] {
        match self {
            CycleOutcome::Aborted(_) => &[],
            CycleOutcome::Completed { new_items, .. } => new_items,
        }
    }

    /// `None` is the explicit "nothing new" signal, whatever the reason.
    pub fn into_new_items(self) -> Option<Vec<NotificationItem>> {
        match self {
            CycleOutcome::Completed { new_items, .. } if !new_items.is_empty() => Some(new_items),
            _ => None,
        }
    }

    pub fn batch(&self) -> Batch<'_> {
        Batch::from_items(self.new_items())
    }

    pub fn error(&self) -> Option<&CycleError> {
        match self {
            CycleOutcome::Aborted(err) => Some(err),
            CycleOutcome::Completed { .. } => None,
        }
    }
}

/// Runs lock, auth, fetch, diff and commit against one state file.
pub struct Poller<S> {
    source: S,
    store: StateStore,
    use_lock: bool,
}

impl<S: FeedSource> Poller<S> {
    pub fn new(source: S, store: StateStore) -> Self {
        Self {
            source,
            store,
            use_lock: true,
        }
    }

    /// Skip the advisory lock; only safe when nothing else polls this file.
    pub fn without_lock(mut self) -> Self {
        self.use_lock = false;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn check_for_update(&self) -> CycleOutcome {
        let _lock = if self.use_lock {
            match self.store.lock() {
                Ok(lock) => Some(lock),
                Err(err) => {
                    let kind = match err {
                        StoreError::Locked { .. } => FailureKind::Busy,
                        _ => FailureKind::Storage,
                    };
                    let err = CycleError::new(Stage::Lock, kind, err.to_string());
                    watch_warn!("Cycle aborted: {}", err);
                    return CycleOutcome::Aborted(err);
                }
            }
        } else {
            None
        };

        let LoadedState { mut state, status } = self.store.load();
        watch_logging::set_cycle(state.total_checked + 1);
        let outcome = self.run_cycle(&mut state, &status);
        watch_logging::set_cycle(0);
        outcome
    }

    fn run_cycle(&self, state: &mut SeenState, status: &LoadStatus) -> CycleOutcome {
        let fetched = match self.collect() {
            Ok(items) => items,
            Err(err) => {
                watch_warn!("Cycle aborted: {}", err);
                return CycleOutcome::Aborted(err);
            }
        };

        let new_items = diff_new_items(&state.seen_ids, &fetched);
        watch_debug!(
            "{} fetched, {} new against {} seen",
            fetched.len(),
            new_items.len(),
            state.seen_ids.len()
        );

        let current_ids: Vec<String> = fetched.into_iter().map(|item| item.id).collect();
        state.seen_ids = merge_window(&state.seen_ids, &current_ids, state.window_capacity);
        state.total_checked += 1;

        let persisted = if status.is_damaged() {
            self.store
                .preserve_corrupt()
                .inspect_err(|err| {
                    watch_error!(
                        "Could not keep a copy of the damaged seen state ({}); leaving it in place",
                        err
                    )
                })
                .and_then(|_| self.store.save(state))
        } else {
            self.store.save(state)
        };
        if let Err(err) = &persisted {
            watch_error!(
                "Could not persist seen state ({}); these {} items may be announced again next cycle",
                err,
                new_items.len()
            );
        }

        if new_items.is_empty() {
            watch_info!("No new notifications");
        } else {
            watch_info!("{} new notifications", new_items.len());
        }
        CycleOutcome::Completed {
            new_items,
            persisted,
        }
    }

    fn collect(&self) -> Result<Vec<NotificationItem>, CycleError> {
        let session = self.source.authenticate()?;
        self.source.fetch(&session)
    }
}
