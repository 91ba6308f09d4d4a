//! Storage layer for florafind-server
//!
//! Provides persistent storage for users, gardens, plants, notes and posts.

mod memory;
mod postgres;
mod traits;

pub use memory::InMemoryStorage;
pub use postgres::PostgresStorage;
pub use traits::{
    GardenStorage, NoteStorage, Page, PlantStorage, PostStorage, Storage, StorageResult,
    UserStorage,
};
