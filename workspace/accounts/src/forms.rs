//! Form payloads and their validation rules.
//!
//! Every field defaults to empty so that a missing field becomes a
//! "This field is required." message instead of a rejected request.

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::credentials::MAX_PASSWORD_BYTES;
use crate::error::{FieldErrors, REQUIRED_MESSAGE};
use crate::images::Upload;

/// Trim and lower-case an email so lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Run `validator` rules, then collapse empty required fields to one message.
fn check<F: Validate>(form: &F, required: &[(&str, &str)]) -> FieldErrors {
    let mut fields = match form.validate() {
        Ok(()) => FieldErrors::new(),
        Err(errors) => FieldErrors::from(errors),
    };
    for (name, value) in required {
        if value.trim().is_empty() {
            fields.replace(name, REQUIRED_MESSAGE);
        }
    }
    fields
}

/// bcrypt ignores everything past [`MAX_PASSWORD_BYTES`].
fn fits_bcrypt(password: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::new("password_too_long"));
    }
    Ok(())
}

/// HTML checkboxes send a value only when ticked.
fn deserialize_checkbox<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(match value.as_deref().map(str::trim) {
        Some(v) => ["on", "y", "yes", "true", "1"]
            .iter()
            .any(|t| t.eq_ignore_ascii_case(v)),
        None => false,
    })
}

/// Sign-up form
#[derive(Clone, Debug, Default, Deserialize, Serialize, Validate, ToSchema)]
#[serde(default)]
pub struct RegistrationForm {
    #[validate(length(
        min = 2,
        max = 20,
        message = "Field must be between 2 and 20 characters long."
    ))]
    pub username: String,
    #[validate(
        email(message = "Invalid email address."),
        length(max = 120, message = "Field cannot be longer than 120 characters.")
    )]
    pub email: String,
    #[validate(custom(
        function = "fits_bcrypt",
        message = "Password cannot be longer than 72 bytes."
    ))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Field must be equal to password."))]
    pub confirm_password: String,
}

impl RegistrationForm {
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = normalize_email(&self.email);
        self
    }

    pub fn check(&self) -> FieldErrors {
        check(
            self,
            &[
                ("username", self.username.as_str()),
                ("email", self.email.as_str()),
                ("password", self.password.as_str()),
                ("confirm_password", self.confirm_password.as_str()),
            ],
        )
    }

    /// Copy safe to echo back to the client: passwords blanked.
    pub fn redacted(&self) -> Self {
        Self {
            username: self.username.clone(),
            email: self.email.clone(),
            password: String::new(),
            confirm_password: String::new(),
        }
    }
}

/// Sign-in form
#[derive(Clone, Debug, Default, Deserialize, Serialize, Validate, ToSchema)]
#[serde(default)]
pub struct LoginForm {
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(custom(
        function = "fits_bcrypt",
        message = "Password cannot be longer than 72 bytes."
    ))]
    pub password: String,
    /// Keep the session past the browser session
    #[serde(deserialize_with = "deserialize_checkbox")]
    pub remember: bool,
}

impl LoginForm {
    pub fn check(&self) -> FieldErrors {
        check(
            self,
            &[("email", self.email.as_str()), ("password", self.password.as_str())],
        )
    }

    pub fn redacted(&self) -> Self {
        Self {
            email: self.email.clone(),
            password: String::new(),
            remember: self.remember,
        }
    }
}

/// Editable account fields, also used to pre-populate the account page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, Validate, ToSchema)]
#[serde(default)]
pub struct AccountForm {
    #[validate(length(
        min = 2,
        max = 20,
        message = "Field must be between 2 and 20 characters long."
    ))]
    pub username: String,
    #[validate(
        email(message = "Invalid email address."),
        length(max = 120, message = "Field cannot be longer than 120 characters.")
    )]
    pub email: String,
}

impl AccountForm {
    pub fn normalized(mut self) -> Self {
        self.username = self.username.trim().to_string();
        self.email = normalize_email(&self.email);
        self
    }

    pub fn check(&self) -> FieldErrors {
        check(
            self,
            &[("username", self.username.as_str()), ("email", self.email.as_str())],
        )
    }
}

/// Submitted account form plus an optional new picture.
#[derive(Clone, Debug, Default)]
pub struct AccountUpdate {
    pub form: AccountForm,
    pub picture: Option<Upload>,
}
