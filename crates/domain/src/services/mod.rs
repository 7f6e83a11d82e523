//! Domain services.
//!
//! Business rules that operate on domain models without touching storage
//! or the network.

pub mod calendar_sync;
pub mod mail_import;
pub mod notification;
pub mod subsidy_lifecycle;

pub use calendar_sync::CalendarSyncError;
pub use notification::{EmailContent, EmailError, EmailSender, MockEmailSender};
pub use subsidy_lifecycle::{AlertCandidate, SubsidyError};
