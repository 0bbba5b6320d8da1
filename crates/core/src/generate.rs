//! The "quick generate" form: target URL plus how many codes to create.

use serde::Serialize;
use validator::Validate;

use crate::error::CoreError;

/// Count the form starts with and resets to after a successful submit.
pub const DEFAULT_GENERATE_COUNT: u32 = 1;

/// Validated body of `POST /generate_qrs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
pub struct GenerateRequest {
    #[validate(url)]
    pub url: String,
    #[validate(range(min = 1))]
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateForm {
    pub url: String,
    pub count: u32,
    submitting: bool,
}

impl Default for GenerateForm {
    fn default() -> Self {
        Self {
            url: String::new(),
            count: DEFAULT_GENERATE_COUNT,
            submitting: false,
        }
    }
}

impl GenerateForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the current inputs into a request body.
    pub fn request(&self) -> Result<GenerateRequest, CoreError> {
        let request = GenerateRequest {
            url: self.url.trim().to_string(),
            count: self.count,
        };
        request.validate()?;
        Ok(request)
    }

    /// Mark the form as in flight and hand out the request body.
    ///
    /// Refused while another submit is still in flight.
    pub fn begin_submit(&mut self) -> Result<GenerateRequest, CoreError> {
        if self.submitting {
            return Err(CoreError::Conflict(
                "a generate request is already in flight".into(),
            ));
        }
        let request = self.request()?;
        self.submitting = true;
        Ok(request)
    }

    /// Clear the in-flight flag. A successful submit also resets the inputs;
    /// a failed one keeps them so the user can retry.
    pub fn finish_submit(&mut self, succeeded: bool) {
        self.submitting = false;
        if succeeded {
            self.reset();
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn reset(&mut self) {
        self.url.clear();
        self.count = DEFAULT_GENERATE_COUNT;
    }
}
