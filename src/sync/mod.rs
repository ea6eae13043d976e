//! The sync controller.
//!
//! [`SyncDriver::run_pass`] pulls a bounded batch of keys through
//! [`resolver`] → [`projector`] → [`coordinator`] and reports what
//! happened to each in a [`PassSummary`].

pub mod connector;
pub mod coordinator;
pub mod driver;
pub mod outcome;
pub mod projector;
pub mod resolver;

pub use connector::{LiveConnector, StoreConnector};
pub use coordinator::{SyncCoordinator, SyncUnit};
pub use driver::{SyncDriver, DEFAULT_CONNECT_TIMEOUT};
pub use outcome::{
    BindingOutcome, FailureReason, KeyDisposition, KeyReport, PassSummary, SkipReason,
    SyncOutcome,
};
pub use projector::{project, project_for_binding};
pub use resolver::resolve_destinations;
