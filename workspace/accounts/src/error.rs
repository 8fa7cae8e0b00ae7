use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Message used when a required form field is missing or empty.
pub const REQUIRED_MESSAGE: &str = "This field is required.";

/// Field name to the messages a form should show next to it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set holding a single message.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// Drop any messages for `field` and keep only `message`.
    pub fn replace(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), vec![message.into()]);
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when empty, otherwise a validation error carrying these messages.
    pub fn into_result(self) -> Result<(), AccountError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AccountError::Validation(self))
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, kind) in errors.into_errors() {
            if let ValidationErrorsKind::Field(list) = kind {
                for err in list {
                    let message = err
                        .message
                        .map(|m| m.into_owned())
                        .unwrap_or_else(|| format!("Invalid value ({}).", err.code));
                    fields.add(&field, message);
                }
            }
        }
        fields
    }
}

/// Error types for account operations
#[derive(Error, Debug)]
pub enum AccountError {
    /// Form input was rejected; recovered by re-rendering the form
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    /// Uploaded bytes are not a decodable PNG or JPEG
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// The resized picture could not be written to the storage directory
    #[error("Failed to store image: {0}")]
    StorageWrite(#[source] std::io::Error),

    /// Unknown email or wrong password; callers must not tell the two apart
    #[error("Authentication failed")]
    AuthenticationFailure,

    #[error("User {0} not found")]
    UserNotFound(i32),

    #[error("Password is {0} bytes long, over the bcrypt limit")]
    PasswordTooLong(usize),

    #[error("Password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AccountError {
    pub(crate) fn storage(err: std::io::Error) -> Self {
        let err = AccountError::StorageWrite(err);
        error!(?err, "Image storage error");
        err
    }

    /// Field errors for a validation failure, `None` otherwise.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            AccountError::Validation(fields) => Some(fields),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 2, message = "Too short."))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn converts_validator_errors_to_field_messages() {
        let probe = Probe {
            name: "a".to_string(),
            email: "not-an-email".to_string(),
        };
        let fields = FieldErrors::from(probe.validate().unwrap_err());

        assert_eq!(fields.get("name"), Some(&["Too short.".to_string()][..]));
        assert_eq!(
            fields.get("email"),
            Some(&["Invalid value (email).".to_string()][..])
        );
    }

    #[test]
    fn merge_and_into_result() {
        let mut fields = FieldErrors::new();
        assert!(fields.clone().into_result().is_ok());

        fields.merge(FieldErrors::single("username", "taken"));
        fields.add("username", "again");
        assert_eq!(fields.get("username").map(|m| m.len()), Some(2));

        let err = fields.into_result().unwrap_err();
        assert!(err.field_errors().is_some());
    }
}
