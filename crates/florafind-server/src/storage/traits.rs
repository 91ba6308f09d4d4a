//! Storage trait definitions

use crate::error::StorageError;
use async_trait::async_trait;
use florafind_types::{
    Garden, GardenId, PasswordHistoryEntry, Plant, PlantId, PlantNote, NoteId, Post, PostId, User,
    UserId,
};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Offset pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(skip: usize, limit: usize) -> Self {
        Self { skip, limit }
    }
}

/// Combined storage trait
#[async_trait]
pub trait Storage:
    UserStorage + GardenStorage + PlantStorage + NoteStorage + PostStorage + Send + Sync
{
    /// Cheap round-trip used by the health endpoint
    async fn ping(&self) -> StorageResult<()>;
}

/// Storage for user accounts and their password history
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Get a user by ID
    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>>;

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>>;

    /// Insert a new user; `Conflict` if email or username is taken
    async fn insert_user(&self, user: User) -> StorageResult<()>;

    /// Replace an existing user; `NotFound` if it does not exist
    async fn update_user(&self, user: User) -> StorageResult<()>;

    async fn add_password_history(&self, entry: PasswordHistoryEntry) -> StorageResult<()>;

    /// Most recent password hashes first
    async fn recent_password_hashes(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> StorageResult<Vec<String>>;
}

/// Storage for gardens
#[async_trait]
pub trait GardenStorage: Send + Sync {
    /// Insert a garden; `Conflict` if the user already has one with that name
    async fn insert_garden(&self, garden: Garden) -> StorageResult<()>;

    async fn get_garden(&self, id: &GardenId) -> StorageResult<Option<Garden>>;

    async fn get_garden_by_name(
        &self,
        user_id: &UserId,
        name: &str,
    ) -> StorageResult<Option<Garden>>;

    /// Gardens of one user, newest first
    async fn list_gardens(&self, user_id: &UserId) -> StorageResult<Vec<Garden>>;

    async fn update_garden(&self, garden: Garden) -> StorageResult<()>;

    /// Delete a garden together with its plants and their notes
    async fn delete_garden(&self, id: &GardenId) -> StorageResult<bool>;
}

/// Storage for plants
#[async_trait]
pub trait PlantStorage: Send + Sync {
    /// Insert a plant; `Conflict` if the user already uses the alias
    async fn insert_plant(&self, plant: Plant) -> StorageResult<()>;

    async fn get_plant(&self, id: &PlantId) -> StorageResult<Option<Plant>>;

    async fn get_plant_by_alias(
        &self,
        user_id: &UserId,
        alias: &str,
    ) -> StorageResult<Option<Plant>>;

    /// Plants of one garden, newest first
    async fn list_plants_for_garden(
        &self,
        garden_id: &GardenId,
        page: Page,
    ) -> StorageResult<Vec<Plant>>;

    async fn count_plants_for_garden(&self, garden_id: &GardenId) -> StorageResult<usize>;

    /// Plants of one user across all gardens, newest first
    async fn list_plants_for_user(&self, user_id: &UserId, page: Page)
        -> StorageResult<Vec<Plant>>;

    async fn count_plants_for_user(&self, user_id: &UserId) -> StorageResult<usize>;

    async fn update_plant(&self, plant: Plant) -> StorageResult<()>;

    /// Delete a plant together with its notes
    async fn delete_plant(&self, id: &PlantId) -> StorageResult<bool>;
}

/// Storage for plant notes
#[async_trait]
pub trait NoteStorage: Send + Sync {
    async fn insert_note(&self, note: PlantNote) -> StorageResult<()>;

    async fn get_note(&self, id: &NoteId) -> StorageResult<Option<PlantNote>>;

    async fn update_note(&self, note: PlantNote) -> StorageResult<()>;

    /// Notes of one plant, latest observation first
    async fn list_notes_for_plant(&self, plant_id: &PlantId) -> StorageResult<Vec<PlantNote>>;
}

/// Storage for posts
#[async_trait]
pub trait PostStorage: Send + Sync {
    async fn insert_post(&self, post: Post) -> StorageResult<()>;

    async fn get_post(&self, id: &PostId) -> StorageResult<Option<Post>>;

    /// All posts, newest first
    async fn list_posts(&self, page: Page) -> StorageResult<Vec<Post>>;

    async fn update_post(&self, post: Post) -> StorageResult<()>;

    async fn delete_post(&self, id: &PostId) -> StorageResult<bool>;
}
