//! HTTP route handlers.

use axum::Json;
use serde_json::{Map, Value};

pub mod calendar;
pub mod clients;
pub mod drive;
pub mod gmail;
pub mod google_token;
pub mod health;
pub mod notifications;
pub mod pages;
pub mod projects;
pub mod subsidies;
pub mod subsidy_applications;
pub mod tasks;
pub mod users;

/// Mutation response: `{ "success": true, "message": ..., ...data }`.
///
/// `data` must be a JSON object (or null); its keys are merged into the
/// envelope.
pub fn success(message: impl Into<String>, data: Value) -> Json<Value> {
    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(true));
    body.insert("message".into(), Value::String(message.into()));
    if let Value::Object(fields) = data {
        body.extend(fields);
    }
    Json(Value::Object(body))
}
