// crates/bookmarky-workspaces/src/records.rs
// ============================================================================
// Module: Workspace Records
// Description: Workspace, column, link, and note record types.
// Purpose: Define the stored record shapes and their field constraints.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Records serialize with the stored field names (`_id`, `favIconUrl`,
//! `noteData`) so collections written by other clients read back unchanged.
//! Constraints:
//! - identifiers are non-empty and at most [`MAX_ID_CHARS`] characters;
//! - `created` is within `0..=MAX_CREATED`;
//! - workspace column ids and column link ids are unique.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum identifier length in characters.
pub const MAX_ID_CHARS: usize = 50;
/// Largest accepted `created` value.
pub const MAX_CREATED: u64 = 100_000_000;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// A record failed field validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {record}: {reason}")]
pub struct InvalidRecord {
    /// Record kind.
    pub record: &'static str,
    /// Violated constraint.
    pub reason: String,
}

impl InvalidRecord {
    /// Builds an error for `record`.
    fn new(record: &'static str, reason: impl Into<String>) -> Self {
        Self {
            record,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// A named group of columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Workspace identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Ids of the columns shown in this workspace, in display order.
    #[serde(default)]
    pub columns: Vec<String>,
    /// Creation stamp.
    pub created: u64,
}

impl Workspace {
    /// Creates an empty workspace.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, created: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            columns: Vec::new(),
            created,
        }
    }

    /// Checks field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRecord`] when a constraint is violated.
    pub fn validate(&self) -> Result<(), InvalidRecord> {
        validate_id("workspace", "_id", &self.id)?;
        if self.name.trim().is_empty() {
            return Err(InvalidRecord::new("workspace", "name must be non-empty"));
        }
        validate_created("workspace", self.created)?;
        for column in &self.columns {
            validate_id("workspace", "columns entry", column)?;
        }
        ensure_unique("workspace", "columns", self.columns.iter().map(String::as_str))
    }
}

/// A titled list of links inside a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Owning workspace id.
    pub workspace: String,
    /// Display title.
    pub title: String,
    /// Links in display order.
    #[serde(default)]
    pub links: Vec<Link>,
    /// Creation stamp.
    pub created: u64,
}

impl Column {
    /// Creates an empty column in `workspace`.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        workspace: impl Into<String>,
        title: impl Into<String>,
        created: u64,
    ) -> Self {
        Self {
            id: id.into(),
            workspace: workspace.into(),
            title: title.into(),
            links: Vec::new(),
            created,
        }
    }

    /// Checks field constraints, including every link.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRecord`] when a constraint is violated.
    pub fn validate(&self) -> Result<(), InvalidRecord> {
        validate_id("column", "_id", &self.id)?;
        validate_id("column", "workspace", &self.workspace)?;
        if self.title.trim().is_empty() {
            return Err(InvalidRecord::new("column", "title must be non-empty"));
        }
        validate_created("column", self.created)?;
        for link in &self.links {
            link.validate()?;
        }
        ensure_unique("column", "link ids", self.links.iter().map(|link| link.id.as_str()))
    }
}

/// A bookmarked page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Link identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Page title.
    pub title: String,
    /// Page address.
    pub url: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional favicon address.
    #[serde(rename = "favIconUrl", default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    /// Optional creation stamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
}

impl Link {
    /// Checks field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRecord`] when a constraint is violated.
    pub fn validate(&self) -> Result<(), InvalidRecord> {
        validate_id("link", "_id", &self.id)?;
        if self.url.trim().is_empty() {
            return Err(InvalidRecord::new("link", "url must be non-empty"));
        }
        if let Some(created) = self.created {
            validate_created("link", created)?;
        }
        Ok(())
    }
}

/// Free-form note attached to a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Note identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Owning workspace id.
    pub workspace: String,
    /// Editor payload.
    #[serde(rename = "noteData", default)]
    pub note_data: Map<String, Value>,
    /// Creation stamp.
    pub created: u64,
}

impl Note {
    /// Checks field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidRecord`] when a constraint is violated.
    pub fn validate(&self) -> Result<(), InvalidRecord> {
        validate_id("note", "_id", &self.id)?;
        validate_id("note", "workspace", &self.workspace)?;
        validate_created("note", self.created)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates an identifier field.
fn validate_id(record: &'static str, field: &str, value: &str) -> Result<(), InvalidRecord> {
    if value.is_empty() {
        return Err(InvalidRecord::new(record, format!("{field} must be non-empty")));
    }
    if value.chars().count() > MAX_ID_CHARS {
        return Err(InvalidRecord::new(
            record,
            format!("{field} exceeds {MAX_ID_CHARS} characters"),
        ));
    }
    Ok(())
}

/// Validates a creation stamp.
fn validate_created(record: &'static str, created: u64) -> Result<(), InvalidRecord> {
    if created > MAX_CREATED {
        return Err(InvalidRecord::new(record, format!("created exceeds {MAX_CREATED}")));
    }
    Ok(())
}

/// Rejects duplicate values.
fn ensure_unique<'a>(
    record: &'static str,
    field: &str,
    values: impl Iterator<Item = &'a str>,
) -> Result<(), InvalidRecord> {
    let mut seen = BTreeSet::new();
    for value in values {
        if !seen.insert(value) {
            return Err(InvalidRecord::new(record, format!("duplicate {field} entry {value}")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
