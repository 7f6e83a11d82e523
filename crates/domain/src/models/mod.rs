//! Domain models for the labor-consultant office backend.

pub mod calendar;
pub mod client;
pub mod drive;
pub mod gmail;
pub mod google;
pub mod notification;
pub mod project;
pub mod subsidy;
pub mod subsidy_application;
pub mod task;
pub mod user;

pub use calendar::{CalendarEvent, EventDateTime, EventPayload, SyncReport};
pub use client::Client;
pub use drive::{DriveFile, TaskAttachment};
pub use gmail::{EmailMessage, GmailMessage};
pub use google::GoogleToken;
pub use notification::{NotificationLog, NotificationSettings, NotificationType, ScheduledNotification};
pub use project::Project;
pub use subsidy::Subsidy;
pub use subsidy_application::{ApplicationStatus, ChecklistItem, SubsidyApplication};
pub use task::{Task, TaskPriority, TaskStatus, TaskType};
pub use user::User;
