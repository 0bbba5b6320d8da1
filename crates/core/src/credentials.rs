//! Email/password pair posted by the login and registration forms.

use serde::Serialize;
use validator::Validate;

use crate::error::CoreError;

#[derive(Clone, PartialEq, Eq, Serialize, Validate)]
pub struct Credentials {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

impl Credentials {
    /// Build credentials and check them before anything is sent.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Result<Self, CoreError> {
        let credentials = Self {
            email: email.into().trim().to_string(),
            password: password.into(),
        };
        credentials.validate()?;
        Ok(credentials)
    }
}

// Keep the password out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
