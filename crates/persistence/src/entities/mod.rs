//! Database entity definitions.

pub mod client;
pub mod notification;
pub mod project;
pub mod subsidy;
pub mod subsidy_application;
pub mod task;
pub mod task_attachment;
pub mod user;

pub use client::ClientEntity;
pub use notification::{NotificationLogEntity, NotificationSettingsEntity, ScheduledNotificationEntity};
pub use project::ProjectEntity;
pub use subsidy::{SubsidyEntity, SubsidyStatisticsEntity};
pub use subsidy_application::{
    AlertCandidateEntity, ApplicationSummaryEntity, ChecklistItemEntity, SubsidyApplicationEntity,
};
pub use task::{TaskDetailEntity, TaskEntity};
pub use task_attachment::TaskAttachmentEntity;
pub use user::UserEntity;
