use uuid::Uuid;

use crate::{error::AppError, stored_object};

pub const MAX_COLLECTION_NAME_CHARS: usize = 256;

stored_object!(Collection, "collection", {
    name: String
});

impl Collection {
    /// Builds a new collection with a server generated identifier.
    ///
    /// The name is trimmed and must be non-empty and at most
    /// [`MAX_COLLECTION_NAME_CHARS`] characters long.
    pub fn new(name: &str) -> Result<Self, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("name must be provided".into()));
        }
        if name.chars().count() > MAX_COLLECTION_NAME_CHARS {
            return Err(AppError::Validation(format!(
                "name must not be more than {MAX_COLLECTION_NAME_CHARS} characters long"
            )));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            name: name.to_string(),
        })
    }
}
