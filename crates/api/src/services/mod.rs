//! Application services and external integrations.

pub mod calendar_sync;
pub mod drive;
pub mod email;
pub mod gmail_import;
pub mod google;
pub mod notification;
pub mod subsidy;

pub use calendar_sync::CalendarSyncService;
pub use drive::DriveService;
pub use email::build_email_sender;
pub use gmail_import::GmailTaskImporter;
pub use google::GoogleClient;
pub use notification::NotificationService;
pub use subsidy::SubsidyService;
