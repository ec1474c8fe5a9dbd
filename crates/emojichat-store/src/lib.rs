//! # emojichat-store
//!
//! The shared real-time document store the chat client talks to: collection
//! addressing, the [`RealtimeStore`] contract, and [`LocalStore`], an
//! in-process implementation with optional SQLite persistence.
//!
//! Documents are JSON objects. Every change to a collection is delivered to
//! its subscribers as a full snapshot, never as a delta.

pub mod database;
pub mod documents;
pub mod local;
pub mod migrations;
pub mod models;
pub mod realtime;
pub mod subscription;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use local::LocalStore;
pub use models::*;
pub use realtime::RealtimeStore;
pub use subscription::Subscription;
