use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use shared::jwt::JwtConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::EmailSender;

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, security_headers_middleware, trace_id};
use crate::routes::{
    calendar, clients, drive, gmail, google_token, health, notifications, pages, projects,
    subsidies, subsidy_applications, tasks, users,
};
use crate::services::{
    CalendarSyncService, DriveService, GmailTaskImporter, GoogleClient, NotificationService,
    SubsidyService,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    pub email: Arc<dyn EmailSender>,
    pub google: GoogleClient,
}

impl AppState {
    pub fn subsidies(&self) -> SubsidyService {
        SubsidyService::new(
            self.pool.clone(),
            self.config.subsidies.strict_status_transitions,
            self.config.google.tz(),
        )
    }

    pub fn calendar_sync(&self) -> CalendarSyncService {
        CalendarSyncService::new(self.pool.clone(), self.google.clone())
    }

    pub fn notifications(&self) -> NotificationService {
        NotificationService::new(
            self.pool.clone(),
            self.email.clone(),
            self.config.google.tz(),
            self.config.notifications.default_reminder_days_before,
            self.config.notifications.scheduled_batch_size,
        )
    }

    pub fn mail_import(&self) -> GmailTaskImporter {
        GmailTaskImporter::new(self.pool.clone(), self.google.clone())
    }

    pub fn drive(&self) -> DriveService {
        DriveService::new(self.pool.clone(), self.google.clone())
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Office data (session token required, checked per handler by UserAuth)
    let office_routes = Router::new()
        .route("/api/users", get(users::list_users))
        .route("/api/users/me", get(users::current_user))
        .route(
            "/api/clients",
            get(clients::list_clients).post(clients::create_client),
        )
        .route(
            "/api/clients/:id",
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route(
            "/api/clients/:id/drive-folders",
            post(drive::provision_client_folders),
        )
        .route(
            "/api/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/projects/:id",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/api/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/api/tasks/:id",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/api/tasks/:id/status", put(tasks::update_task_status))
        .route(
            "/api/tasks/:id/attachments",
            get(drive::list_attachments).post(drive::upload_attachment),
        )
        .route(
            "/api/tasks/:id/attachments/:attachment_id",
            axum::routing::delete(drive::delete_attachment),
        );

    let subsidy_routes = Router::new()
        .route(
            "/api/subsidies",
            get(subsidies::list_subsidies).post(subsidies::create_subsidy),
        )
        .route("/api/subsidies/statistics", get(subsidies::catalog_statistics))
        .route(
            "/api/subsidies/applications",
            get(subsidy_applications::list_applications)
                .post(subsidy_applications::create_application),
        )
        .route(
            "/api/subsidies/applications/alerts",
            get(subsidy_applications::list_alerts),
        )
        .route(
            "/api/subsidies/applications/:id",
            get(subsidy_applications::get_application)
                .put(subsidy_applications::update_application),
        )
        .route(
            "/api/subsidies/applications/:id/status",
            put(subsidy_applications::update_status),
        )
        .route(
            "/api/subsidies/applications/:id/checklist",
            post(subsidy_applications::add_checklist_item),
        )
        .route(
            "/api/subsidies/applications/:id/checklist/:item_id",
            put(subsidy_applications::update_checklist_item)
                .delete(subsidy_applications::delete_checklist_item),
        )
        .route(
            "/api/subsidies/:id",
            get(subsidies::get_subsidy)
                .put(subsidies::update_subsidy)
                .delete(subsidies::delete_subsidy),
        )
        .route("/api/subsidies/:id/deactivate", put(subsidies::deactivate_subsidy))
        .route("/api/subsidies/:id/statistics", get(subsidies::subsidy_statistics));

    let google_routes = Router::new()
        .route(
            "/api/google/token",
            put(google_token::store_token).delete(google_token::remove_token),
        )
        .route(
            "/api/calendar/events",
            get(calendar::list_events).post(calendar::create_event),
        )
        .route("/api/calendar/events/quick-add", post(calendar::quick_add))
        .route(
            "/api/calendar/events/:event_id",
            get(calendar::get_event)
                .put(calendar::update_event)
                .delete(calendar::delete_event),
        )
        .route("/api/calendar/free-busy", post(calendar::free_busy))
        .route("/api/calendar/sync-task/:task_id", post(calendar::sync_task))
        .route("/api/calendar/import-event", post(calendar::import_event))
        .route("/api/calendar/full-sync", post(calendar::full_sync))
        .route("/api/gmail/messages", get(gmail::list_messages))
        .route("/api/gmail/messages/:id", get(gmail::get_message))
        .route("/api/gmail/messages/:id/modify", post(gmail::modify_labels))
        .route("/api/gmail/messages/:id/trash", post(gmail::trash_message))
        .route("/api/gmail/messages/:id/to-task", post(gmail::message_to_task))
        .route("/api/gmail/send", post(gmail::send_message))
        .route("/api/gmail/process-client-emails", post(gmail::process_client_emails))
        .route("/api/drive/files", get(drive::list_files).post(drive::upload_file))
        .route("/api/drive/folders", post(drive::create_folder))
        .route(
            "/api/drive/files/:file_id",
            get(drive::get_file).delete(drive::delete_file),
        )
        .route("/api/drive/files/:file_id/move", post(drive::move_file))
        .route("/api/drive/files/:file_id/rename", post(drive::rename_file))
        .route("/api/drive/files/:file_id/share", post(drive::share_file))
        .route("/api/drive/files/:file_id/download", get(drive::download_file));

    let notification_routes = Router::new()
        .route("/api/notifications", get(notifications::list_notifications))
        .route("/api/notifications/read-all", post(notifications::mark_all_read))
        .route("/api/notifications/:id/read", post(notifications::mark_read))
        .route(
            "/api/notifications/settings",
            get(notifications::get_settings).put(notifications::update_settings),
        )
        .route(
            "/api/notifications/check-overdue",
            post(notifications::check_overdue),
        )
        .route(
            "/api/notifications/process-scheduled",
            post(notifications::process_scheduled),
        )
        .route(
            "/api/notifications/daily-summary",
            post(notifications::daily_summary),
        )
        .route(
            "/api/notifications/tasks/:id/remind",
            post(notifications::remind_task),
        );

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // HTML shells; their scripts authenticate against the JSON API
    let page_routes = Router::new()
        .route("/", get(pages::root_redirect))
        .route("/admin-dashboard", get(pages::admin_dashboard))
        .route("/clients", get(pages::clients))
        .route("/projects", get(pages::projects))
        .route("/subsidies", get(pages::subsidies))
        .route("/subsidy-master", get(pages::subsidy_master))
        .route("/calendar", get(pages::calendar))
        .route("/gmail", get(pages::gmail));

    Router::new()
        .merge(public_routes)
        .merge(page_routes)
        .merge(office_routes)
        .merge(subsidy_routes)
        .merge(google_routes)
        .merge(notification_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
