//! Client (company) domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A client company served by the office.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub employee_count: i64,
    pub monthly_fee: i64,
    /// Root folder of the client in external file storage.
    pub drive_folder_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request payload for creating a client.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub name: String,

    #[validate(length(max = 100, message = "Contact person must be at most 100 characters"))]
    pub contact_person: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    pub address: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0, message = "Employee count must not be negative"))]
    pub employee_count: i64,

    #[serde(default)]
    #[validate(range(min = 0, message = "Monthly fee must not be negative"))]
    pub monthly_fee: i64,

    pub notes: Option<String>,
}

/// Request payload for updating a client (partial update).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 100, message = "Contact person must be at most 100 characters"))]
    pub contact_person: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 30, message = "Phone must be at most 30 characters"))]
    pub phone: Option<String>,

    pub address: Option<String>,

    #[validate(range(min = 0, message = "Employee count must not be negative"))]
    pub employee_count: Option<i64>,

    #[validate(range(min = 0, message = "Monthly fee must not be negative"))]
    pub monthly_fee: Option<i64>,

    pub notes: Option<String>,
}

/// Query parameters for listing clients.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListClientsQuery {
    /// Substring match on the client name.
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_client_request_defaults() {
        let json = r#"{ "name": "ABC社" }"#;
        let request: CreateClientRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.name, "ABC社");
        assert_eq!(request.employee_count, 0);
        assert_eq!(request.monthly_fee, 0);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_client_request_rejects_blank_name() {
        let request = CreateClientRequest {
            name: "   ".to_string(),
            contact_person: None,
            email: None,
            phone: None,
            address: None,
            employee_count: 10,
            monthly_fee: 30000,
            notes: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_create_client_request_rejects_bad_email() {
        let json = r#"{ "name": "ABC社", "email": "not-an-email" }"#;
        let request: CreateClientRequest = serde_json::from_str(json).unwrap();
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn test_update_client_request_negative_fee() {
        let request = UpdateClientRequest {
            monthly_fee: Some(-1),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }
}
