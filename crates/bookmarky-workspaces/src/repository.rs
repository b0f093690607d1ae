// crates/bookmarky-workspaces/src/repository.rs
// ============================================================================
// Module: Workspace Repository
// Description: Workspace, column, and note operations over chunked collections.
// Purpose: Keep cross-collection references consistent under serialized access.
// Dependencies: bookmarky-store, thiserror, tokio
// ============================================================================

//! ## Overview
//! [`WorkspaceRepository`] persists each record kind in its own collection
//! and owns the references between them:
//! - a workspace lists the ids of its columns;
//! - columns and notes name their owning workspace;
//! - the active workspace pointer names one workspace.
//!
//! Every operation holds a single async mutex for its whole duration, so
//! read-modify-write sequences never interleave and readers never observe a
//! collection while its chunks are being replaced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use bookmarky_store::ChunkedStore;
use bookmarky_store::ChunkedStoreError;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::records::Column;
use crate::records::InvalidRecord;
use crate::records::Note;
use crate::records::Workspace;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Collection holding workspaces.
pub const WORKSPACES_COLLECTION: &str = "workspaces";
/// Collection holding columns of every workspace.
pub const COLUMNS_COLLECTION: &str = "columns";
/// Collection holding notes of every workspace.
pub const NOTES_COLLECTION: &str = "notes";
/// Collection holding at most one workspace id.
pub const ACTIVE_WORKSPACE_COLLECTION: &str = "active_workspace";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Repository errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying chunked store failure.
    #[error(transparent)]
    Store(#[from] ChunkedStoreError),
    /// Record failed validation.
    #[error(transparent)]
    Invalid(#[from] InvalidRecord),
    /// Referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Record kind.
        kind: &'static str,
        /// Missing identifier.
        id: String,
    },
}

impl RepositoryError {
    /// Builds a not-found error.
    fn not_found(kind: &'static str, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Repository
// ============================================================================

/// Workspace repository over a chunked store.
pub struct WorkspaceRepository {
    /// Collection store.
    store: ChunkedStore,
    /// Serializes every operation.
    lock: Mutex<()>,
}

impl WorkspaceRepository {
    /// Creates a repository over `store`.
    #[must_use]
    pub fn new(store: ChunkedStore) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &ChunkedStore {
        &self.store
    }

    // ------------------------------------------------------------------------
    // Workspaces
    // ------------------------------------------------------------------------

    /// Returns every workspace.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] when the collection cannot be read.
    pub async fn workspaces(&self) -> Result<Vec<Workspace>, RepositoryError> {
        let _guard = self.lock.lock().await;
        self.load_workspaces().await
    }

    /// Returns the workspace `id`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] when the collection cannot be read.
    pub async fn workspace(&self, id: &str) -> Result<Option<Workspace>, RepositoryError> {
        let _guard = self.lock.lock().await;
        self.find_workspace(id).await
    }

    /// Inserts or replaces a workspace, returning `true` on replacement.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Invalid`] for an invalid record, or
    /// [`RepositoryError::Store`] when the write fails.
    pub async fn upsert_workspace(&self, workspace: Workspace) -> Result<bool, RepositoryError> {
        workspace.validate()?;
        let _guard = self.lock.lock().await;
        self.save_workspace(workspace).await
    }

    /// Removes a workspace together with its columns and notes.
    ///
    /// Clears the active workspace pointer when it named the removed
    /// workspace. Returns the removed workspace, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] when a read or write fails.
    pub async fn remove_workspace(&self, id: &str) -> Result<Option<Workspace>, RepositoryError> {
        let _guard = self.lock.lock().await;
        let removed: Option<Workspace> = self
            .store
            .remove_collection_entry(WORKSPACES_COLLECTION, |workspace: &Workspace| {
                workspace.id == id
            })
            .await?;
        let Some(workspace) = removed else {
            return Ok(None);
        };

        let columns = self.load_columns().await?;
        let kept: Vec<Column> = columns
            .iter()
            .filter(|column| column.workspace != id && !workspace.columns.contains(&column.id))
            .cloned()
            .collect();
        if kept.len() != columns.len() {
            self.store.write_collection(COLUMNS_COLLECTION, &kept).await?;
        }

        let notes = self.load_notes().await?;
        let kept: Vec<Note> = notes.iter().filter(|note| note.workspace != id).cloned().collect();
        if kept.len() != notes.len() {
            self.store.write_collection(NOTES_COLLECTION, &kept).await?;
        }

        if self.active_id().await?.as_deref() == Some(id) {
            self.store.write_collection::<String>(ACTIVE_WORKSPACE_COLLECTION, &[]).await?;
        }
        Ok(Some(workspace))
    }

    // ------------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------------

    /// Returns every column across workspaces.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] when the collection cannot be read.
    pub async fn columns(&self) -> Result<Vec<Column>, RepositoryError> {
        let _guard = self.lock.lock().await;
        self.load_columns().await
    }

    /// Returns the column `id`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] when the collection cannot be read.
    pub async fn column(&self, id: &str) -> Result<Option<Column>, RepositoryError> {
        let _guard = self.lock.lock().await;
        Ok(self.load_columns().await?.into_iter().find(|column| column.id == id))
    }

    /// Returns the columns owned by `workspace_id` in stored order.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] when the collection cannot be read.
    pub async fn workspace_columns(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<Column>, RepositoryError> {
        let _guard = self.lock.lock().await;
        let columns = self.load_columns().await?;
        Ok(columns.into_iter().filter(|column| column.workspace == workspace_id).collect())
    }

    /// Inserts or replaces a column and lists it in its workspace.
    ///
    /// A column moved to another workspace is unlisted from the old one.
    /// Returns `true` when an existing column was replaced.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Invalid`] for an invalid record,
    /// [`RepositoryError::NotFound`] when the workspace does not exist, or
    /// [`RepositoryError::Store`] when a read or write fails.
    pub async fn upsert_column(&self, column: Column) -> Result<bool, RepositoryError> {
        column.validate()?;
        let _guard = self.lock.lock().await;
        let mut workspaces = self.load_workspaces().await?;
        let Some(target) = workspaces.iter().position(|workspace| workspace.id == column.workspace)
        else {
            return Err(RepositoryError::not_found("workspace", &column.workspace));
        };

        let mut columns = self.load_columns().await?;
        let previous = columns.iter().position(|existing| existing.id == column.id);
        let mut workspaces_changed = false;
        if let Some(index) = previous
            && columns[index].workspace != column.workspace
        {
            let old_owner = columns[index].workspace.clone();
            for workspace in workspaces.iter_mut().filter(|workspace| workspace.id == old_owner) {
                workspace.columns.retain(|id| id != &column.id);
                workspaces_changed = true;
            }
        }
        if !workspaces[target].columns.contains(&column.id) {
            workspaces[target].columns.push(column.id.clone());
            workspaces_changed = true;
        }

        match previous {
            Some(index) => columns[index] = column,
            None => columns.push(column),
        }
        self.store.write_collection(COLUMNS_COLLECTION, &columns).await?;
        if workspaces_changed {
            self.store.write_collection(WORKSPACES_COLLECTION, &workspaces).await?;
        }
        Ok(previous.is_some())
    }

    /// Removes a column and unlists it from its workspace.
    ///
    /// Returns the removed column, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] when a read or write fails.
    pub async fn remove_column(&self, id: &str) -> Result<Option<Column>, RepositoryError> {
        let _guard = self.lock.lock().await;
        let removed: Option<Column> = self
            .store
            .remove_collection_entry(COLUMNS_COLLECTION, |column: &Column| column.id == id)
            .await?;
        let Some(column) = removed else {
            return Ok(None);
        };
        if let Some(mut workspace) = self.find_workspace(&column.workspace).await?
            && workspace.columns.iter().any(|listed| listed == id)
        {
            workspace.columns.retain(|listed| listed != id);
            self.save_workspace(workspace).await?;
        }
        Ok(Some(column))
    }

    // ------------------------------------------------------------------------
    // Notes
    // ------------------------------------------------------------------------

    /// Returns the notes of `workspace_id` in stored order.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] when the collection cannot be read.
    pub async fn notes(&self, workspace_id: &str) -> Result<Vec<Note>, RepositoryError> {
        let _guard = self.lock.lock().await;
        let notes = self.load_notes().await?;
        Ok(notes.into_iter().filter(|note| note.workspace == workspace_id).collect())
    }

    /// Inserts or replaces a note, returning `true` on replacement.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Invalid`] for an invalid record,
    /// [`RepositoryError::NotFound`] when the workspace does not exist, or
    /// [`RepositoryError::Store`] when a read or write fails.
    pub async fn upsert_note(&self, note: Note) -> Result<bool, RepositoryError> {
        note.validate()?;
        let _guard = self.lock.lock().await;
        if self.find_workspace(&note.workspace).await?.is_none() {
            return Err(RepositoryError::not_found("workspace", &note.workspace));
        }
        Ok(self
            .store
            .upsert_collection_entry(NOTES_COLLECTION, note, |existing: &Note, new: &Note| {
                existing.id == new.id
            })
            .await?)
    }

    /// Removes a note, returning it when present.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] when a read or write fails.
    pub async fn remove_note(&self, id: &str) -> Result<Option<Note>, RepositoryError> {
        let _guard = self.lock.lock().await;
        Ok(self
            .store
            .remove_collection_entry(NOTES_COLLECTION, |note: &Note| note.id == id)
            .await?)
    }

    // ------------------------------------------------------------------------
    // Active workspace
    // ------------------------------------------------------------------------

    /// Points the active workspace at `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when the workspace does not
    /// exist, or [`RepositoryError::Store`] when a read or write fails.
    pub async fn set_active_workspace(&self, id: &str) -> Result<(), RepositoryError> {
        let _guard = self.lock.lock().await;
        if self.find_workspace(id).await?.is_none() {
            return Err(RepositoryError::not_found("workspace", id));
        }
        self.store.write_collection(ACTIVE_WORKSPACE_COLLECTION, &[id.to_string()]).await?;
        Ok(())
    }

    /// Returns the active workspace, or `None` when unset or dangling.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] when a read fails.
    pub async fn active_workspace(&self) -> Result<Option<Workspace>, RepositoryError> {
        let _guard = self.lock.lock().await;
        match self.active_id().await? {
            Some(id) => self.find_workspace(&id).await,
            None => Ok(None),
        }
    }

    /// Clears every collection, returning the number of chunk keys removed.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Store`] when a clear fails.
    pub async fn reset(&self) -> Result<usize, RepositoryError> {
        let _guard = self.lock.lock().await;
        let mut cleared = 0;
        for name in [
            WORKSPACES_COLLECTION,
            COLUMNS_COLLECTION,
            NOTES_COLLECTION,
            ACTIVE_WORKSPACE_COLLECTION,
        ] {
            cleared += self.store.clear_collection(name).await?;
        }
        Ok(cleared)
    }

    // ------------------------------------------------------------------------
    // Helpers (caller holds the lock)
    // ------------------------------------------------------------------------

    /// Reads the workspaces collection.
    async fn load_workspaces(&self) -> Result<Vec<Workspace>, RepositoryError> {
        Ok(self.store.read_collection(WORKSPACES_COLLECTION).await?)
    }

    /// Reads the columns collection.
    async fn load_columns(&self) -> Result<Vec<Column>, RepositoryError> {
        Ok(self.store.read_collection(COLUMNS_COLLECTION).await?)
    }

    /// Reads the notes collection.
    async fn load_notes(&self) -> Result<Vec<Note>, RepositoryError> {
        Ok(self.store.read_collection(NOTES_COLLECTION).await?)
    }

    /// Looks up one workspace.
    async fn find_workspace(&self, id: &str) -> Result<Option<Workspace>, RepositoryError> {
        Ok(self.load_workspaces().await?.into_iter().find(|workspace| workspace.id == id))
    }

    /// Upserts a workspace by id.
    async fn save_workspace(&self, workspace: Workspace) -> Result<bool, RepositoryError> {
        Ok(self
            .store
            .upsert_collection_entry(
                WORKSPACES_COLLECTION,
                workspace,
                |existing: &Workspace, new: &Workspace| existing.id == new.id,
            )
            .await?)
    }

    /// Reads the active workspace id.
    async fn active_id(&self) -> Result<Option<String>, RepositoryError> {
        let ids: Vec<String> = self.store.read_collection(ACTIVE_WORKSPACE_COLLECTION).await?;
        Ok(ids.into_iter().next())
    }
}
