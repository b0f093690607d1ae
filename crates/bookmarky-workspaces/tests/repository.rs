// crates/bookmarky-workspaces/tests/repository.rs
// ============================================================================
// Module: Workspace Repository Tests
// Description: Validate record operations and cross-collection consistency.
// Purpose: Ensure cascades and references survive full collection rewrites.
// Dependencies: bookmarky-store, bookmarky-workspaces, serde_json, tokio
// ============================================================================

//! ## Overview
//! Drives the repository over an in-memory backend with small chunks so every
//! collection spans several chunk keys.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use bookmarky_store::ChunkedStore;
use bookmarky_store::ChunkedStoreConfig;
use bookmarky_store::InMemoryBackend;
use bookmarky_workspaces::Column;
use bookmarky_workspaces::Link;
use bookmarky_workspaces::Note;
use bookmarky_workspaces::RepositoryError;
use bookmarky_workspaces::Workspace;
use bookmarky_workspaces::WorkspaceRepository;
use serde_json::Map;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn repository() -> (WorkspaceRepository, InMemoryBackend) {
    let backend = InMemoryBackend::new();
    let config = ChunkedStoreConfig {
        max_chunk_size: 16,
        ..ChunkedStoreConfig::default()
    };
    let store = ChunkedStore::new(Arc::new(backend.clone()), config);
    (WorkspaceRepository::new(store), backend)
}

fn note(id: &str, workspace: &str) -> Note {
    let mut data = Map::new();
    data.insert("text".to_string(), json!(format!("note {id}")));
    Note {
        id: id.to_string(),
        workspace: workspace.to_string(),
        note_data: data,
        created: 1,
    }
}

fn link(id: &str) -> Link {
    Link {
        id: id.to_string(),
        title: format!("Link {id}"),
        url: format!("https://{id}.example"),
        description: Some("saved page".to_string()),
        fav_icon_url: None,
        created: Some(5),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn workspaces_upsert_and_lookup() {
    let (repo, backend) = repository();
    assert!(repo.workspaces().await.unwrap().is_empty());

    assert!(!repo.upsert_workspace(Workspace::new("w1", "Home", 10)).await.unwrap());
    assert!(!repo.upsert_workspace(Workspace::new("w2", "Work", 11)).await.unwrap());
    assert!(repo.upsert_workspace(Workspace::new("w1", "Home page", 10)).await.unwrap());

    let all = repo.workspaces().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(repo.workspace("w1").await.unwrap().unwrap().name, "Home page");
    assert!(repo.workspace("missing").await.unwrap().is_none());
    assert!(backend.peek("workspaces_1").is_some());
}

#[tokio::test]
async fn invalid_records_are_rejected_before_writing() {
    let (repo, backend) = repository();
    let err = repo.upsert_workspace(Workspace::new("", "Home", 1)).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Invalid(_)));
    let err = repo.upsert_workspace(Workspace::new("w", "Home", 100_000_001)).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Invalid(_)));
    assert!(backend.keys().is_empty());
}

#[tokio::test]
async fn upsert_column_lists_it_in_workspace_once() {
    let (repo, _) = repository();
    repo.upsert_workspace(Workspace::new("w1", "Home", 1)).await.unwrap();

    let mut column = Column::new("c1", "w1", "Reading", 2);
    assert!(!repo.upsert_column(column.clone()).await.unwrap());
    column.links.push(link("l1"));
    assert!(repo.upsert_column(column.clone()).await.unwrap());
    repo.upsert_column(Column::new("c2", "w1", "Tools", 3)).await.unwrap();

    let workspace = repo.workspace("w1").await.unwrap().unwrap();
    assert_eq!(workspace.columns, vec!["c1".to_string(), "c2".to_string()]);
    assert_eq!(repo.column("c1").await.unwrap(), Some(column));
    assert_eq!(repo.workspace_columns("w1").await.unwrap().len(), 2);
    assert_eq!(repo.columns().await.unwrap().len(), 2);
}

#[tokio::test]
async fn upsert_column_requires_existing_workspace() {
    let (repo, _) = repository();
    let err = repo.upsert_column(Column::new("c1", "nope", "Reading", 1)).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::NotFound {
            kind: "workspace",
            ..
        }
    ));
    assert!(repo.columns().await.unwrap().is_empty());
}

#[tokio::test]
async fn moving_column_updates_both_workspaces() {
    let (repo, _) = repository();
    repo.upsert_workspace(Workspace::new("w1", "Home", 1)).await.unwrap();
    repo.upsert_workspace(Workspace::new("w2", "Work", 1)).await.unwrap();
    repo.upsert_column(Column::new("c1", "w1", "Reading", 2)).await.unwrap();

    repo.upsert_column(Column::new("c1", "w2", "Reading", 2)).await.unwrap();
    assert!(repo.workspace("w1").await.unwrap().unwrap().columns.is_empty());
    assert_eq!(repo.workspace("w2").await.unwrap().unwrap().columns, vec!["c1".to_string()]);
    assert!(repo.workspace_columns("w1").await.unwrap().is_empty());
}

#[tokio::test]
async fn remove_column_unlists_it() {
    let (repo, _) = repository();
    repo.upsert_workspace(Workspace::new("w1", "Home", 1)).await.unwrap();
    repo.upsert_column(Column::new("c1", "w1", "Reading", 2)).await.unwrap();
    repo.upsert_column(Column::new("c2", "w1", "Tools", 3)).await.unwrap();

    let removed = repo.remove_column("c1").await.unwrap().unwrap();
    assert_eq!(removed.title, "Reading");
    assert!(repo.remove_column("c1").await.unwrap().is_none());
    assert_eq!(repo.workspace("w1").await.unwrap().unwrap().columns, vec!["c2".to_string()]);
}

#[tokio::test]
async fn remove_workspace_cascades_and_clears_active_pointer() {
    let (repo, backend) = repository();
    repo.upsert_workspace(Workspace::new("w1", "Home", 1)).await.unwrap();
    repo.upsert_workspace(Workspace::new("w2", "Work", 1)).await.unwrap();
    repo.upsert_column(Column::new("c1", "w1", "Reading", 2)).await.unwrap();
    repo.upsert_column(Column::new("c2", "w2", "Tools", 2)).await.unwrap();
    repo.upsert_note(note("n1", "w1")).await.unwrap();
    repo.upsert_note(note("n2", "w2")).await.unwrap();
    repo.set_active_workspace("w1").await.unwrap();

    let removed = repo.remove_workspace("w1").await.unwrap().unwrap();
    assert_eq!(removed.columns, vec!["c1".to_string()]);

    let columns = repo.columns().await.unwrap();
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].id, "c2");
    assert!(repo.notes("w1").await.unwrap().is_empty());
    assert_eq!(repo.notes("w2").await.unwrap().len(), 1);
    assert!(repo.active_workspace().await.unwrap().is_none());
    assert!(backend.peek("active_workspace_0").is_some());
    assert!(backend.peek("active_workspace_1").is_none());
    assert!(repo.remove_workspace("w1").await.unwrap().is_none());
}

#[tokio::test]
async fn remove_workspace_keeps_unrelated_active_pointer() {
    let (repo, _) = repository();
    repo.upsert_workspace(Workspace::new("w1", "Home", 1)).await.unwrap();
    repo.upsert_workspace(Workspace::new("w2", "Work", 1)).await.unwrap();
    repo.set_active_workspace("w2").await.unwrap();

    repo.remove_workspace("w1").await.unwrap();
    assert_eq!(repo.active_workspace().await.unwrap().unwrap().id, "w2");
}

#[tokio::test]
async fn notes_round_trip_and_remove() {
    let (repo, _) = repository();
    repo.upsert_workspace(Workspace::new("w1", "Home", 1)).await.unwrap();
    let err = repo.upsert_note(note("n1", "w9")).await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));

    assert!(!repo.upsert_note(note("n1", "w1")).await.unwrap());
    let mut edited = note("n1", "w1");
    edited.note_data.insert("pinned".to_string(), json!(true));
    assert!(repo.upsert_note(edited.clone()).await.unwrap());
    assert_eq!(repo.notes("w1").await.unwrap(), vec![edited.clone()]);

    assert_eq!(repo.remove_note("n1").await.unwrap(), Some(edited));
    assert!(repo.remove_note("n1").await.unwrap().is_none());
}

#[tokio::test]
async fn active_workspace_requires_existing_workspace() {
    let (repo, _) = repository();
    assert!(repo.active_workspace().await.unwrap().is_none());
    let err = repo.set_active_workspace("w1").await.unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { .. }));

    repo.upsert_workspace(Workspace::new("w1", "Home", 1)).await.unwrap();
    repo.set_active_workspace("w1").await.unwrap();
    assert_eq!(repo.active_workspace().await.unwrap().unwrap().name, "Home");
}

#[tokio::test]
async fn reset_clears_every_collection() {
    let (repo, backend) = repository();
    repo.upsert_workspace(Workspace::new("w1", "Home", 1)).await.unwrap();
    repo.upsert_column(Column::new("c1", "w1", "Reading", 2)).await.unwrap();
    repo.upsert_note(note("n1", "w1")).await.unwrap();
    repo.set_active_workspace("w1").await.unwrap();

    let cleared = repo.reset().await.unwrap();
    assert!(cleared >= 4);
    assert!(backend.keys().is_empty());
    assert!(repo.workspaces().await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_column_upserts_all_land() {
    let (repo, _) = repository();
    repo.upsert_workspace(Workspace::new("w1", "Home", 1)).await.unwrap();

    let (a, b, c) = tokio::join!(
        repo.upsert_column(Column::new("c1", "w1", "One", 1)),
        repo.upsert_column(Column::new("c2", "w1", "Two", 1)),
        repo.upsert_column(Column::new("c3", "w1", "Three", 1)),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    let mut listed = repo.workspace("w1").await.unwrap().unwrap().columns;
    listed.sort();
    assert_eq!(listed, vec!["c1".to_string(), "c2".to_string(), "c3".to_string()]);
    assert_eq!(repo.columns().await.unwrap().len(), 3);
}
