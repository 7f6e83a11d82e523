//! Turning received mail into tasks.

use chrono::{DateTime, Utc};
use domain::models::gmail::{EmailMessage, MailImportReport};
use domain::models::task::Task;
use domain::services::mail_import::{client_mail_query, extract_email_address, new_task_from_email};
use persistence::repositories::{ClientRepository, TaskRepository};
use persistence::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::middleware::metrics::record_task_import;
use crate::services::google::gmail::{flatten_message, GmailApi};
use crate::services::google::GoogleClient;

/// Messages fetched per client in one import run.
const MAX_MESSAGES_PER_CLIENT: u32 = 20;

#[derive(Clone)]
pub struct GmailTaskImporter {
    tasks: TaskRepository,
    clients: ClientRepository,
    google: GoogleClient,
}

impl GmailTaskImporter {
    pub fn new(pool: SqlitePool, google: GoogleClient) -> Self {
        Self {
            tasks: TaskRepository::new(pool.clone()),
            clients: ClientRepository::new(pool),
            google,
        }
    }

    /// Creates a task from one message. The sender is matched to a client
    /// by address when possible.
    pub async fn message_to_task(
        &self,
        user_id: i64,
        message_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Task, ApiError> {
        if self.tasks.find_by_gmail_message_id(message_id).await?.is_some() {
            return Err(ApiError::Conflict(format!(
                "Message {} was already imported",
                message_id
            )));
        }

        let gmail = self.google.gmail(user_id).await?;
        let message = flatten_message(&gmail.get_message(message_id).await?);

        let client_id = match message.from.as_deref().and_then(extract_email_address) {
            Some(address) => self.clients.find_by_email(&address).await?.map(|c| c.id),
            None => None,
        };

        let task = self.insert(&message, user_id, client_id, now).await?;
        record_task_import("gmail", 1);
        Ok(task)
    }

    async fn insert(
        &self,
        message: &EmailMessage,
        user_id: i64,
        client_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Task, ApiError> {
        let new_task = new_task_from_email(message, user_id, client_id);
        let task: Task = self.tasks.insert(&new_task, now).await?.into();
        info!(
            task_id = task.id,
            message_id = %message.id,
            client_id = ?client_id,
            "Task created from email"
        );
        Ok(task)
    }

    /// Imports unread recent mail from every client with an address.
    ///
    /// Clients are handled one after another; a failing client or message
    /// is recorded in the report and the run continues.
    pub async fn process_client_emails(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<MailImportReport, ApiError> {
        let gmail = self.google.gmail(user_id).await?;
        let lookback = self.google.config().mail_lookback_days;
        let mut report = MailImportReport::default();

        for client in self.clients.list_with_email().await? {
            let Some(address) = client.email.as_deref() else {
                continue;
            };

            match self
                .import_from_client(&gmail, user_id, client.id, address, lookback, now, &mut report)
                .await
            {
                Ok(()) => report.clients_processed += 1,
                Err(e) => {
                    warn!(client_id = client.id, error = %e, "Client mail import failed");
                    report.errors.push(format!("client {}: {}", client.id, e));
                }
            }
        }

        record_task_import("gmail", report.tasks_created);
        info!(
            user_id,
            clients = report.clients_processed,
            created = report.tasks_created,
            errors = report.errors.len(),
            "Client mail import finished"
        );
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn import_from_client(
        &self,
        gmail: &GmailApi,
        user_id: i64,
        client_id: i64,
        address: &str,
        lookback_days: u32,
        now: DateTime<Utc>,
        report: &mut MailImportReport,
    ) -> Result<(), ApiError> {
        let query = client_mail_query(address, lookback_days);
        let messages = gmail.search(&query, MAX_MESSAGES_PER_CLIENT).await?;

        for message in messages {
            let imported = match self.tasks.find_by_gmail_message_id(&message.id).await {
                Ok(Some(_)) => {
                    debug!(message_id = %message.id, "Message already imported");
                    continue;
                }
                Ok(None) => self.insert(&message, user_id, Some(client_id), now).await,
                Err(e) => Err(e.into()),
            };

            match imported {
                Ok(_) => {
                    report.tasks_created += 1;
                    if let Err(e) = gmail.mark_read(&message.id).await {
                        warn!(message_id = %message.id, error = %e, "Could not mark message read");
                    }
                }
                Err(e) => {
                    warn!(message_id = %message.id, error = %e, "Message import failed");
                    report.errors.push(format!("message {}: {}", message.id, e));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GoogleConfig;
    use domain::models::client::CreateClientRequest;
    use domain::models::google::GoogleToken;
    use domain::models::task::{NewTask, TaskPriority, TaskStatus, TaskType};
    use persistence::repositories::UserRepository;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixture {
        importer: GmailTaskImporter,
        tasks: TaskRepository,
        clients: ClientRepository,
        user_id: i64,
    }

    async fn fixture(server: &MockServer) -> Fixture {
        let pool = persistence::db::create_memory_pool().await.unwrap();
        let user = UserRepository::new(pool.clone())
            .insert("山田", Some("yamada@example.com"), "staff")
            .await
            .unwrap();

        let config = GoogleConfig {
            gmail_base_url: server.uri(),
            ..Default::default()
        };
        let google = GoogleClient::new(config, pool.clone()).unwrap();
        google
            .tokens()
            .put(
                user.id,
                &GoogleToken {
                    access_token: "token".into(),
                    expires_at: None,
                },
                Utc::now(),
            )
            .await
            .unwrap();

        Fixture {
            importer: GmailTaskImporter::new(pool.clone(), google),
            tasks: TaskRepository::new(pool.clone()),
            clients: ClientRepository::new(pool),
            user_id: user.id,
        }
    }

    async fn client(f: &Fixture, name: &str, email: &str) -> i64 {
        f.clients
            .create(
                &CreateClientRequest {
                    name: name.into(),
                    contact_person: None,
                    email: Some(email.into()),
                    phone: None,
                    address: None,
                    employee_count: 10,
                    monthly_fee: 0,
                    notes: None,
                },
                Utc::now(),
            )
            .await
            .unwrap()
            .id
    }

    fn message(id: &str, from: &str, subject: &str) -> Value {
        json!({
            "id": id,
            "threadId": id,
            "snippet": "お世話になっております",
            "payload": {
                "mimeType": "text/plain",
                "headers": [
                    { "name": "From", "value": from },
                    { "name": "Subject", "value": subject }
                ],
                "body": { "size": 12, "data": "aGVsbG8" }
            }
        })
    }

    async fn mount_message(server: &MockServer, id: &str, from: &str, subject: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/users/me/messages/{}", id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(message(id, from, subject)))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_message_to_task_matches_client() {
        let server = MockServer::start().await;
        let f = fixture(&server).await;
        let client_id = client(&f, "ABC社", "info@abc.example").await;
        mount_message(&server, "m1", "ABC社 <INFO@abc.example>", "Re: 入社手続き").await;

        let task = f.importer.message_to_task(f.user_id, "m1", Utc::now()).await.unwrap();
        assert_eq!(task.title, "入社手続き");
        assert_eq!(task.client_id, Some(client_id));
        assert_eq!(task.task_type, TaskType::Consultation);

        let err = f
            .importer
            .message_to_task(f.user_id, "m1", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_process_client_emails_isolates_failures() {
        let server = MockServer::start().await;
        let f = fixture(&server).await;
        client(&f, "ABC社", "info@abc.example").await;
        client(&f, "XYZ商事", "xyz@xyz.example").await;

        f.tasks
            .insert(
                &NewTask {
                    title: "取込済み".into(),
                    description: None,
                    client_id: None,
                    project_id: None,
                    assignee_id: None,
                    created_by: f.user_id,
                    priority: TaskPriority::Medium,
                    task_type: TaskType::Other,
                    status: TaskStatus::Pending,
                    due_date: None,
                    calendar_event_id: None,
                    gmail_message_id: Some("m2".into()),
                },
                Utc::now(),
            )
            .await
            .unwrap();

        Mock::given(method("GET"))
            .and(path("/users/me/messages"))
            .and(query_param("q", "from:info@abc.example is:unread newer_than:7d"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [ { "id": "m1" }, { "id": "m2" } ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages"))
            .and(query_param("q", "from:xyz@xyz.example is:unread newer_than:7d"))
            .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
            .mount(&server)
            .await;
        mount_message(&server, "m1", "info@abc.example", "給与計算の件").await;
        mount_message(&server, "m2", "info@abc.example", "取込済み").await;
        Mock::given(method("POST"))
            .and(path("/users/me/messages/m1/modify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "m1" })))
            .expect(1)
            .mount(&server)
            .await;

        let report = f
            .importer
            .process_client_emails(f.user_id, Utc::now())
            .await
            .unwrap();
        assert_eq!(report.clients_processed, 1);
        assert_eq!(report.tasks_created, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("client "));

        let imported = f.tasks.find_by_gmail_message_id("m1").await.unwrap().unwrap();
        assert_eq!(imported.title, "給与計算の件");
    }
}
