/// Contact form submission: parse body, append, persist
use crate::contact_store::{ContactEntry, ContactStore, ContactSubmission};
use crate::error::{Result, SiteError};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub const THANK_YOU: &str = "Thank you! We will contact you soon.";
const GENERIC_FAILURE: &str = "Internal server error";

/// JSON body returned by `POST /api/contact`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

impl ApiResponse {
    fn success(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }

    fn error(message: String) -> Self {
        Self {
            success: false,
            message,
        }
    }
}

/// Result of handling one submission
#[derive(Debug)]
pub enum SubmissionOutcome {
    Accepted(ContactEntry),
    Failed(SiteError),
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted(_))
    }

    /// Body to send back. With `expose_errors` the raw error text reaches the client.
    pub fn to_api_response(&self, expose_errors: bool) -> ApiResponse {
        match self {
            SubmissionOutcome::Accepted(_) => ApiResponse::success(THANK_YOU),
            SubmissionOutcome::Failed(e) if expose_errors => ApiResponse::error(e.to_string()),
            SubmissionOutcome::Failed(_) => ApiResponse::error(GENERIC_FAILURE.to_string()),
        }
    }
}

/// Parse a request body into a submission.
///
/// The body has to be a JSON object. Field values are not checked; unknown
/// keys are ignored, including any `timestamp` the client sends.
pub fn parse_submission(body: &[u8]) -> Result<ContactSubmission> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(SiteError::InvalidBody("request body is empty".to_string()));
    }

    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| SiteError::InvalidBody(e.to_string()))?;
    if !value.is_object() {
        return Err(SiteError::InvalidBody(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }

    let submission = serde_json::from_value(value).map_err(SiteError::Serialization)?;
    Ok(submission)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Handle one submission against the store
pub async fn submit(store: &ContactStore, body: &[u8]) -> SubmissionOutcome {
    let result = match parse_submission(body) {
        Ok(submission) => store.append(submission).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(entry) => {
            info!(
                "New contact inquiry ({}) stored at {}",
                entry.text("event_type").unwrap_or("unspecified"),
                entry.timestamp().unwrap_or_default()
            );
            SubmissionOutcome::Accepted(entry)
        }
        Err(e) => {
            error!("Contact submission failed: {}", e);
            SubmissionOutcome::Failed(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_reads_known_fields() {
        let sub = parse_submission(
            br#"{"name":"Jane Doe","email":"jane@example.com","event_type":"wedding","event_date":"2025-06-01"}"#,
        )
        .unwrap();
        assert_eq!(sub.name, Some(json!("Jane Doe")));
        assert_eq!(sub.event_type, Some(json!("wedding")));
        assert!(sub.phone.is_none());
        assert!(sub.message.is_none());
    }

    #[test]
    fn test_parse_ignores_client_timestamp() {
        let sub = parse_submission(br#"{"name":"x","timestamp":"1999-01-01T00:00:00"}"#).unwrap();
        assert_eq!(sub.name, Some(json!("x")));
    }

    #[test]
    fn test_parse_rejects_bad_bodies() {
        let bodies: [&[u8]; 6] = [b"", b"   ", b"not json", b"null", b"[1,2]", b"\"text\""];
        for body in bodies {
            let err = parse_submission(body).unwrap_err();
            assert!(
                matches!(err, SiteError::InvalidBody(_)),
                "body {:?} gave {:?}",
                String::from_utf8_lossy(body),
                err
            );
        }
    }

    #[test]
    fn test_parse_keeps_any_json_value() {
        let sub = parse_submission(br#"{"phone": 5551234, "name": ["A", "B"], "message": null}"#).unwrap();
        assert_eq!(sub.phone, Some(json!(5551234)));
        assert_eq!(sub.name, Some(json!(["A", "B"])));
        assert_eq!(sub.message, Some(serde_json::Value::Null));
        assert!(sub.email.is_none());
    }

    #[tokio::test]
    async fn test_submit_accepts_numeric_phone() {
        let temp_dir = TempDir::new().unwrap();
        let store = ContactStore::open(temp_dir.path().join("contacts.json")).unwrap();

        let outcome = submit(&store, br#"{"name":"Jane","phone":5551234}"#).await;
        assert!(outcome.is_success());
        let entries = store.entries().await;
        assert_eq!(entries[0].get("phone"), Some(&json!(5551234)));
        assert_eq!(entries[0].text("message"), Some(""));
    }

    #[tokio::test]
    async fn test_submit_accepts_and_stores() {
        let temp_dir = TempDir::new().unwrap();
        let store = ContactStore::open(temp_dir.path().join("contacts.json")).unwrap();

        let outcome = submit(&store, br#"{"name":"Jane Doe","message":"Hello"}"#).await;
        assert!(outcome.is_success());
        assert_eq!(
            outcome.to_api_response(true),
            ApiResponse {
                success: true,
                message: THANK_YOU.to_string()
            }
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_submit_failure_leaves_store_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let store = ContactStore::open(temp_dir.path().join("contacts.json")).unwrap();

        let outcome = submit(&store, b"<html>").await;
        assert!(!outcome.is_success());
        assert_eq!(store.len().await, 0);

        let exposed = outcome.to_api_response(true);
        assert!(!exposed.success);
        assert!(exposed.message.starts_with("Invalid request body:"));

        let hidden = outcome.to_api_response(false);
        assert_eq!(hidden.message, "Internal server error");
    }
}
