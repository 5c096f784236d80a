//! Watch engine: persistence, portal I/O and the poll cycle.
mod delivery;
mod persist;
mod poller;
mod portal;
mod source;
mod store;
mod types;

pub use delivery::{render_message, Batch, DeliveryAdapter, DeliveryError, LogDelivery, TelegramDelivery};
pub use persist::{ensure_parent_dir, AtomicFileWriter, PersistError};
pub use poller::{CycleOutcome, Poller};
pub use portal::{parse_listing, PortalClient, PortalSession, PortalSettings};
pub use source::FeedSource;
pub use store::{Clock, LoadStatus, LoadedState, StateLock, StateStore, StoreError};
pub use types::{CycleError, FailureKind, Stage};
