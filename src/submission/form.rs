//! Comment form fields and their validation

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SubmitError;

lazy_static! {
    /// Deliberately loose: something, an `@`, something, no whitespace
    static ref EMAIL: Regex = Regex::new(r"^\S+@\S+$").unwrap();
}

/// One failed field check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

/// The four fields of a comment submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentForm {
    /// Id of the post being commented on
    #[serde(rename = "_id", default)]
    pub post_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub comment: String,
}

impl CommentForm {
    /// Parse a JSON submission body.
    ///
    /// The body must be a JSON object carrying `_id`, `name`, `email` and
    /// `comment` as strings. Each missing or mistyped field yields its own
    /// error.
    pub fn from_json(body: &[u8]) -> Result<Self, SubmitError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| SubmitError::Payload(e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(SubmitError::Payload("expected a JSON object".to_string()));
        };

        let mut errors = Vec::new();
        let mut take = |key: &'static str| -> String {
            match fields.get(key) {
                Some(Value::String(s)) => s.clone(),
                Some(_) => {
                    let message = format!("The {} must be a string", label(key));
                    errors.push(ValidationError::new(key, &message));
                    String::new()
                }
                None => {
                    errors.push(required(key));
                    String::new()
                }
            }
        };

        let form = Self {
            post_id: take("_id"),
            name: take("name"),
            email: take("email"),
            comment: take("comment"),
        };

        if errors.is_empty() {
            Ok(form)
        } else {
            Err(SubmitError::Validation(errors))
        }
    }

    /// Field checks run before anything is submitted
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(required("name"));
        }
        if self.email.trim().is_empty() {
            errors.push(required("email"));
        } else if !EMAIL.is_match(self.email.trim()) {
            errors.push(ValidationError::new("email", "The email is invalid"));
        }
        if self.comment.trim().is_empty() {
            errors.push(required("comment"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn label(field: &str) -> &str {
    match field {
        "_id" => "post id",
        other => other,
    }
}

fn required(field: &'static str) -> ValidationError {
    ValidationError::new(field, &format!("The {} is required", label(field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, comment: &str) -> CommentForm {
        CommentForm {
            post_id: "post-1".to_string(),
            name: name.to_string(),
            email: email.to_string(),
            comment: comment.to_string(),
        }
    }

    #[test]
    fn test_valid_form() {
        assert!(form("Alice", "a@x.com", "Nice post!").validate().is_ok());
    }

    #[test]
    fn test_one_message_per_field() {
        let errors = form("", " ", "").validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "email", "comment"]);
        assert_eq!(errors[0].message, "The name is required");
        assert_eq!(errors[1].message, "The email is required");
        assert_eq!(errors[2].message, "The comment is required");
    }

    #[test]
    fn test_email_shape_is_loose() {
        assert!(form("A", "a@b", "c").validate().is_ok());
        assert!(form("A", "weird+tag@sub.example", "c").validate().is_ok());

        let errors = form("A", "not-an-email", "c").validate().unwrap_err();
        assert_eq!(errors, vec![ValidationError::new("email", "The email is invalid")]);
        assert!(form("A", "a @b", "c").validate().is_err());
    }

    #[test]
    fn test_from_json() {
        let body = br#"{"_id":"post-1","name":"Alice","email":"a@x.com","comment":"Nice post!"}"#;
        let form = CommentForm::from_json(body).unwrap();
        assert_eq!(form.post_id, "post-1");
        assert_eq!(form.comment, "Nice post!");
    }

    #[test]
    fn test_from_json_missing_field() {
        let body = br#"{"_id":"post-1","name":"Alice","email":"a@x.com"}"#;
        match CommentForm::from_json(body) {
            Err(SubmitError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "comment");
                assert_eq!(errors[0].message, "The comment is required");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_from_json_malformed() {
        assert!(matches!(
            CommentForm::from_json(b"not json"),
            Err(SubmitError::Payload(_))
        ));
        assert!(matches!(
            CommentForm::from_json(b"[1, 2]"),
            Err(SubmitError::Payload(_))
        ));
        assert!(matches!(
            CommentForm::from_json(br#"{"_id":1,"name":"a","email":"a@b","comment":"c"}"#),
            Err(SubmitError::Validation(errors)) if errors[0].field == "_id"
        ));
    }
}
