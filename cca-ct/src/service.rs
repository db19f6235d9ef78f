//! Contact form validation and storage

use crate::db::contacts::{self, Contact, NewContact};
use cca_common::api::{ApiError, ApiResult};
use cca_common::pagination::{calculate_pagination, Pagination};
use cca_common::validation::{is_valid_email, normalize_email};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::info;

pub const MAX_SUBJECT_CHARS: usize = 200;
pub const MIN_MESSAGE_CHARS: usize = 10;
pub const MAX_MESSAGE_CHARS: usize = 5000;

#[derive(Debug, Clone, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ContactPage {
    pub contacts: Vec<Contact>,
    pub total: i64,
    #[serde(flatten)]
    pub pagination: Pagination,
}

/// Trim fields and check lengths; lengths count characters, not bytes
pub fn validate(req: &ContactRequest) -> ApiResult<NewContact> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }

    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest(format!(
            "Invalid email address: {}",
            req.email.trim()
        )));
    }

    let subject = req.subject.trim();
    if subject.is_empty() {
        return Err(ApiError::BadRequest("Subject is required".to_string()));
    }
    if subject.chars().count() > MAX_SUBJECT_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Subject must be at most {} characters",
            MAX_SUBJECT_CHARS
        )));
    }

    let message = req.message.trim();
    let length = message.chars().count();
    if !(MIN_MESSAGE_CHARS..=MAX_MESSAGE_CHARS).contains(&length) {
        return Err(ApiError::BadRequest(format!(
            "Message must be between {} and {} characters",
            MIN_MESSAGE_CHARS, MAX_MESSAGE_CHARS
        )));
    }

    Ok(NewContact {
        name: name.to_string(),
        email,
        subject: subject.to_string(),
        message: message.to_string(),
    })
}

pub async fn submit(pool: &SqlitePool, req: &ContactRequest) -> ApiResult<Contact> {
    let contact = contacts::insert_contact(pool, &validate(req)?).await?;
    info!(contact_id = %contact.id, email = %contact.email, "Contact message received");
    Ok(contact)
}

pub async fn get(pool: &SqlitePool, id: &str) -> ApiResult<Contact> {
    contacts::find_contact(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Contact not found: {}", id)))
}

pub async fn list(pool: &SqlitePool, page: i64) -> ApiResult<ContactPage> {
    let total = contacts::count_contacts(pool).await?;
    let pagination = calculate_pagination(total, page);
    let contacts = contacts::list_contacts(pool, &pagination).await?;
    Ok(ContactPage {
        contacts,
        total,
        pagination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(subject: &str, message: &str) -> ContactRequest {
        ContactRequest {
            name: " Ada ".to_string(),
            email: " Ada@Example.com ".to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_validate_normalizes() {
        let contact = validate(&request("Hello", "  A question about my report  ")).unwrap();
        assert_eq!(contact.name, "Ada");
        assert_eq!(contact.email, "ada@example.com");
        assert_eq!(contact.message, "A question about my report");
    }

    #[test]
    fn test_subject_limit() {
        assert!(validate(&request(&"s".repeat(200), "long enough message")).is_ok());
        assert!(validate(&request(&"s".repeat(201), "long enough message")).is_err());
        assert!(validate(&request("   ", "long enough message")).is_err());
    }

    #[test]
    fn test_message_bounds_count_characters() {
        assert!(validate(&request("Hi", "too short")).is_err());
        assert!(validate(&request("Hi", "exactly 10")).is_ok());
        assert!(validate(&request("Hi", &"é".repeat(5000))).is_ok());
        assert!(validate(&request("Hi", &"é".repeat(5001))).is_err());
    }

    #[test]
    fn test_invalid_email_rejected() {
        let mut req = request("Hi", "long enough message");
        req.email = "not-an-email".to_string();
        assert!(matches!(validate(&req), Err(ApiError::BadRequest(_))));
    }
}
