//! Repository implementations.

pub mod client;
pub mod kv_cache;
pub mod notification;
pub mod project;
pub mod subsidy;
pub mod subsidy_application;
pub mod task;
pub mod task_attachment;
pub mod user;

pub use client::ClientRepository;
pub use kv_cache::KvCacheRepository;
pub use notification::{NewNotificationLog, NotificationRepository};
pub use project::{ProjectFields, ProjectRepository};
pub use subsidy::{SubsidyDeleteOutcome, SubsidyFields, SubsidyRepository};
pub use subsidy_application::{
    ApplicationFilter, NewApplication, StatusChange, SubsidyApplicationRepository,
};
pub use task::{TaskChanges, TaskFilter, TaskRepository};
pub use task_attachment::{NewAttachment, TaskAttachmentRepository};
pub use user::UserRepository;
