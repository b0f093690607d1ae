// crates/bookmarky-config/src/lib.rs
// ============================================================================
// Module: Bookmarky Config
// Description: Configuration loading and component wiring.
// Purpose: Turn a validated bookmarky.toml into a ready chunked store.
// Dependencies: bookmarky-store, bookmarky-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Loads `bookmarky.toml`, validates every section fail-closed, and builds the
//! configured backend, event sink, and [`bookmarky_store::ChunkedStore`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::BackendConfig;
pub use config::BackendKind;
pub use config::BookmarkyConfig;
pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::EventSinkKind;
pub use config::EventsConfig;
pub use config::StoreSection;
