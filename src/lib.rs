//! ModKeeper - load order and activation manager for game mod collections
//!
//! This crate keeps one ordered collection of mods and separators per
//! profile and provides:
//! - Dependency-aware activation with optional confirmation
//! - Drag-and-drop reordering of single items, selections and collapsed sections
//! - Collapsible separator groups with group-wide toggling
//! - Search, activation filtering and alternative sort modes
//! - SQLite persistence through a serialized background writer

pub const APP_VERSION: &str = "0.1.0";

pub mod activation;
pub mod app;
pub mod collection;
pub mod config;
pub mod db;
pub mod ordering;
pub mod session;
pub mod view;

pub use app::App;
pub use config::Config;
pub use session::Session;
