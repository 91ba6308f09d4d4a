//! FloraFind server library
//!
//! This module provides the core components of the FloraFind backend:
//! - REST API handlers
//! - Account authentication (password hashing, signed tokens, account mail)
//! - Storage backends
//! - PlantNet identification client
//! - Server lifecycle management

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod identify;
pub mod secret;
pub mod server;
pub mod storage;

pub use config::Settings;
pub use error::{ApiError, ServerError, StorageError};
pub use server::Server;
pub use storage::{InMemoryStorage, Storage};
