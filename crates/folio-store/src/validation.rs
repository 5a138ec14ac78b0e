//! Validation for book drafts and updates.
//!
//! This module checks:
//! - Required text fields are present (non-blank)
//! - ISBNs have the shape of an ISBN-10 or ISBN-13
//!
//! ISBN checksums are not verified; catalogs routinely carry placeholder
//! numbers such as `123-1234567890`.

use crate::types::{BookDraft, BookUpdate};

// ─────────────────────────────────────────────────────────────────────────────
// Validation Error
// ─────────────────────────────────────────────────────────────────────────────

/// Specific validation failures for book input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required text field is empty or whitespace.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// The ISBN is not 10 or 13 characters once separators are removed.
    #[error("'{0}' is not a valid ISBN-10 or ISBN-13")]
    InvalidIsbn(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Field Validation
// ─────────────────────────────────────────────────────────────────────────────

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

/// Validate an ISBN.
///
/// Hyphens and spaces are ignored. The remainder must be 13 digits, or 10
/// characters of which the first nine are digits and the last is a digit or
/// `X`.
pub fn validate_isbn(isbn: &str) -> Result<(), ValidationError> {
    require("isbn", isbn)?;

    let compact: Vec<char> = isbn.chars().filter(|c| *c != '-' && *c != ' ').collect();
    let valid = match compact.len() {
        13 => compact.iter().all(char::is_ascii_digit),
        10 => {
            compact[..9].iter().all(char::is_ascii_digit)
                && (compact[9].is_ascii_digit() || compact[9] == 'X' || compact[9] == 'x')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidIsbn(isbn.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Record Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Validate a draft before it is stored.
pub fn validate_draft(draft: &BookDraft) -> Result<(), ValidationError> {
    require("title", &draft.title)?;
    require("author", &draft.author)?;
    validate_isbn(&draft.isbn)
}

/// Validate the fields an update sets. Absent fields are not checked.
pub fn validate_update(update: &BookUpdate) -> Result<(), ValidationError> {
    if let Some(title) = &update.title {
        require("title", title)?;
    }
    if let Some(author) = &update.author {
        require("author", author)?;
    }
    if let Some(isbn) = &update.isbn {
        validate_isbn(isbn)?;
    }
    Ok(())
}
