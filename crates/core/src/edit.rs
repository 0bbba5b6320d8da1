//! Single-slot edit mode for renaming a QR code.
//!
//! At most one code can be in edit mode. Beginning a new edit replaces
//! whatever draft was open before.

use crate::error::CoreError;
use crate::types::DbId;

/// The label being typed for one QR code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub id: DbId,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSlot {
    current: Option<EditDraft>,
}

impl EditSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter edit mode for `id`, seeding the typed value.
    pub fn begin(&mut self, id: DbId, seed: impl Into<String>) {
        self.current = Some(EditDraft {
            id,
            text: seed.into(),
        });
    }

    /// Replace the typed value of the open draft.
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), CoreError> {
        match self.current.as_mut() {
            Some(draft) => {
                draft.text = text.into();
                Ok(())
            }
            None => Err(CoreError::Conflict("no QR code is being edited".into())),
        }
    }

    /// Leave edit mode, returning the abandoned draft.
    pub fn cancel(&mut self) -> Option<EditDraft> {
        self.current.take()
    }

    /// Leave edit mode only if `id` is the one being edited.
    pub fn cancel_if(&mut self, id: DbId) -> Option<EditDraft> {
        if self.editing_id() == Some(id) {
            self.current.take()
        } else {
            None
        }
    }

    pub fn editing_id(&self) -> Option<DbId> {
        self.current.as_ref().map(|draft| draft.id)
    }

    pub fn draft(&self) -> Option<&EditDraft> {
        self.current.as_ref()
    }

    pub fn is_editing(&self, id: DbId) -> bool {
        self.editing_id() == Some(id)
    }
}
