// crates/bookmarky-workspaces/src/lib.rs
// ============================================================================
// Module: Bookmarky Workspaces
// Description: Bookmark workspace records and their repository.
// Purpose: Keep workspaces, columns, and notes consistent over chunked storage.
// Dependencies: bookmarky-store, serde, serde_json, tokio
// ============================================================================

//! ## Overview
//! A workspace groups columns of links and free-form notes. Each record kind
//! lives in its own chunked collection, and [`WorkspaceRepository`] keeps the
//! cross-collection references (workspace column lists, the active workspace
//! pointer) consistent by serializing every operation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod records;
pub mod repository;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use records::Column;
pub use records::InvalidRecord;
pub use records::Link;
pub use records::MAX_CREATED;
pub use records::MAX_ID_CHARS;
pub use records::Note;
pub use records::Workspace;
pub use repository::ACTIVE_WORKSPACE_COLLECTION;
pub use repository::COLUMNS_COLLECTION;
pub use repository::NOTES_COLLECTION;
pub use repository::RepositoryError;
pub use repository::WORKSPACES_COLLECTION;
pub use repository::WorkspaceRepository;
