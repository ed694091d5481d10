//! Order entity.
//!
//! An order is identified by a caller-assigned `id`, which is used verbatim
//! as the state store key and as a URL path segment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of an order id, in characters.
pub const MAX_ID_LEN: usize = 128;

/// Purchase order.
///
/// Unknown fields are rejected on decode; `quantity` is omitted on encode
/// when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Order {
    /// Caller-assigned unique id
    pub id: String,
    /// What is being ordered
    pub item: String,
    /// How many
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

/// Field-level validation failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `id` is empty
    #[error("id must not be empty")]
    EmptyId,

    /// `id` is longer than [`MAX_ID_LEN`]
    #[error("id must be at most {MAX_ID_LEN} characters")]
    IdTooLong,

    /// `id` contains `/` or whitespace
    #[error("id must not contain '/' or whitespace")]
    InvalidIdCharacter,

    /// `item` is empty or blank
    #[error("item must not be empty")]
    EmptyItem,

    /// `quantity` is zero
    #[error("quantity must be greater than zero")]
    ZeroQuantity,
}

impl Order {
    /// Create an order without a quantity.
    #[must_use]
    pub fn new(id: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            item: item.into(),
            quantity: None,
        }
    }

    /// Set the quantity.
    #[must_use]
    pub const fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id(&self.id)?;
        if self.item.trim().is_empty() {
            return Err(ValidationError::EmptyItem);
        }
        if self.quantity == Some(0) {
            return Err(ValidationError::ZeroQuantity);
        }
        Ok(())
    }
}

/// Check that `id` can be used as a state key and path segment.
///
/// # Errors
///
/// Returns [`ValidationError`] for empty, over-long, or ill-formed ids.
pub fn validate_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::EmptyId);
    }
    if id.chars().count() > MAX_ID_LEN {
        return Err(ValidationError::IdTooLong);
    }
    if id.chars().any(|c| c == '/' || c.is_whitespace()) {
        return Err(ValidationError::InvalidIdCharacter);
    }
    Ok(())
}
