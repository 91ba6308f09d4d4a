//! In-memory storage implementation

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use florafind_types::{
    Garden, GardenId, NoteId, PasswordHistoryEntry, Plant, PlantId, PlantNote, Post, PostId, User,
    UserId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage for development and testing
#[derive(Debug)]
pub struct InMemoryStorage {
    users: Arc<RwLock<HashMap<UserId, User>>>,
    password_history: Arc<RwLock<Vec<PasswordHistoryEntry>>>,
    gardens: Arc<RwLock<HashMap<GardenId, Garden>>>,
    plants: Arc<RwLock<HashMap<PlantId, Plant>>>,
    notes: Arc<RwLock<HashMap<NoteId, PlantNote>>>,
    posts: Arc<RwLock<HashMap<PostId, Post>>>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    /// Create a new in-memory storage
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            password_history: Arc::new(RwLock::new(Vec::new())),
            gardens: Arc::new(RwLock::new(HashMap::new())),
            plants: Arc::new(RwLock::new(HashMap::new())),
            notes: Arc::new(RwLock::new(HashMap::new())),
            posts: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

fn paginate<T>(items: Vec<T>, page: Page) -> Vec<T> {
    items.into_iter().skip(page.skip).take(page.limit).collect()
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn ping(&self) -> StorageResult<()> {
        Ok(())
    }
}

#[async_trait]
impl UserStorage for InMemoryStorage {
    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn insert_user(&self, user: User) -> StorageResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(StorageError::Conflict("Email already registered".to_string()));
        }
        if users.values().any(|u| u.username == user.username) {
            return Err(StorageError::Conflict("Username already taken".to_string()));
        }
        users.insert(user.id, user);
        Ok(())
    }

    async fn update_user(&self, user: User) -> StorageResult<()> {
        let mut users = self.users.write().await;
        if !users.contains_key(&user.id) {
            return Err(StorageError::NotFound(format!("User {}", user.id)));
        }
        if users
            .values()
            .any(|u| u.id != user.id && (u.email == user.email || u.username == user.username))
        {
            return Err(StorageError::Conflict(
                "Email or username already in use".to_string(),
            ));
        }
        users.insert(user.id, user);
        Ok(())
    }

    async fn add_password_history(&self, entry: PasswordHistoryEntry) -> StorageResult<()> {
        let mut history = self.password_history.write().await;
        history.push(entry);
        Ok(())
    }

    async fn recent_password_hashes(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> StorageResult<Vec<String>> {
        let history = self.password_history.read().await;
        let mut entries: Vec<&PasswordHistoryEntry> =
            history.iter().filter(|e| &e.user_id == user_id).collect();
        // Stable sort keeps insertion order for equal timestamps; reverse puts newest first
        entries.sort_by_key(|e| e.created_at);
        Ok(entries
            .into_iter()
            .rev()
            .take(limit)
            .map(|e| e.password_hash.clone())
            .collect())
    }
}

#[async_trait]
impl GardenStorage for InMemoryStorage {
    async fn insert_garden(&self, garden: Garden) -> StorageResult<()> {
        let mut gardens = self.gardens.write().await;
        if gardens
            .values()
            .any(|g| g.user_id == garden.user_id && g.name == garden.name)
        {
            return Err(StorageError::Conflict(
                "A garden with this name already exists".to_string(),
            ));
        }
        gardens.insert(garden.id, garden);
        Ok(())
    }

    async fn get_garden(&self, id: &GardenId) -> StorageResult<Option<Garden>> {
        let gardens = self.gardens.read().await;
        Ok(gardens.get(id).cloned())
    }

    async fn get_garden_by_name(
        &self,
        user_id: &UserId,
        name: &str,
    ) -> StorageResult<Option<Garden>> {
        let gardens = self.gardens.read().await;
        Ok(gardens
            .values()
            .find(|g| &g.user_id == user_id && g.name == name)
            .cloned())
    }

    async fn list_gardens(&self, user_id: &UserId) -> StorageResult<Vec<Garden>> {
        let gardens = self.gardens.read().await;
        let mut result: Vec<Garden> = gardens
            .values()
            .filter(|g| &g.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn update_garden(&self, garden: Garden) -> StorageResult<()> {
        let mut gardens = self.gardens.write().await;
        if !gardens.contains_key(&garden.id) {
            return Err(StorageError::NotFound(format!("Garden {}", garden.id)));
        }
        if gardens
            .values()
            .any(|g| g.id != garden.id && g.user_id == garden.user_id && g.name == garden.name)
        {
            return Err(StorageError::Conflict(
                "A garden with this name already exists".to_string(),
            ));
        }
        gardens.insert(garden.id, garden);
        Ok(())
    }

    async fn delete_garden(&self, id: &GardenId) -> StorageResult<bool> {
        // Lock order: gardens, plants, notes
        let mut gardens = self.gardens.write().await;
        if gardens.remove(id).is_none() {
            return Ok(false);
        }
        let mut plants = self.plants.write().await;
        let mut notes = self.notes.write().await;
        let removed: Vec<PlantId> = plants
            .values()
            .filter(|p| &p.garden_id == id)
            .map(|p| p.id)
            .collect();
        for plant_id in &removed {
            plants.remove(plant_id);
        }
        notes.retain(|_, n| !removed.contains(&n.plant_id));
        Ok(true)
    }
}

#[async_trait]
impl PlantStorage for InMemoryStorage {
    async fn insert_plant(&self, plant: Plant) -> StorageResult<()> {
        let gardens = self.gardens.read().await;
        if !gardens.contains_key(&plant.garden_id) {
            return Err(StorageError::NotFound(format!("Garden {}", plant.garden_id)));
        }
        let mut plants = self.plants.write().await;
        if plants
            .values()
            .any(|p| p.user_id == plant.user_id && p.alias == plant.alias)
        {
            return Err(StorageError::Conflict(
                "A plant with this alias already exists".to_string(),
            ));
        }
        plants.insert(plant.id, plant);
        Ok(())
    }

    async fn get_plant(&self, id: &PlantId) -> StorageResult<Option<Plant>> {
        let plants = self.plants.read().await;
        Ok(plants.get(id).cloned())
    }

    async fn get_plant_by_alias(
        &self,
        user_id: &UserId,
        alias: &str,
    ) -> StorageResult<Option<Plant>> {
        let plants = self.plants.read().await;
        Ok(plants
            .values()
            .find(|p| &p.user_id == user_id && p.alias == alias)
            .cloned())
    }

    async fn list_plants_for_garden(
        &self,
        garden_id: &GardenId,
        page: Page,
    ) -> StorageResult<Vec<Plant>> {
        let plants = self.plants.read().await;
        let mut result: Vec<Plant> = plants
            .values()
            .filter(|p| &p.garden_id == garden_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(result, page))
    }

    async fn count_plants_for_garden(&self, garden_id: &GardenId) -> StorageResult<usize> {
        let plants = self.plants.read().await;
        Ok(plants.values().filter(|p| &p.garden_id == garden_id).count())
    }

    async fn list_plants_for_user(
        &self,
        user_id: &UserId,
        page: Page,
    ) -> StorageResult<Vec<Plant>> {
        let plants = self.plants.read().await;
        let mut result: Vec<Plant> = plants
            .values()
            .filter(|p| &p.user_id == user_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(result, page))
    }

    async fn count_plants_for_user(&self, user_id: &UserId) -> StorageResult<usize> {
        let plants = self.plants.read().await;
        Ok(plants.values().filter(|p| &p.user_id == user_id).count())
    }

    async fn update_plant(&self, plant: Plant) -> StorageResult<()> {
        let mut plants = self.plants.write().await;
        if !plants.contains_key(&plant.id) {
            return Err(StorageError::NotFound(format!("Plant {}", plant.id)));
        }
        if plants
            .values()
            .any(|p| p.id != plant.id && p.user_id == plant.user_id && p.alias == plant.alias)
        {
            return Err(StorageError::Conflict(
                "A plant with this alias already exists".to_string(),
            ));
        }
        plants.insert(plant.id, plant);
        Ok(())
    }

    async fn delete_plant(&self, id: &PlantId) -> StorageResult<bool> {
        let mut plants = self.plants.write().await;
        if plants.remove(id).is_none() {
            return Ok(false);
        }
        let mut notes = self.notes.write().await;
        notes.retain(|_, n| &n.plant_id != id);
        Ok(true)
    }
}

#[async_trait]
impl NoteStorage for InMemoryStorage {
    async fn insert_note(&self, note: PlantNote) -> StorageResult<()> {
        let plants = self.plants.read().await;
        if !plants.contains_key(&note.plant_id) {
            return Err(StorageError::NotFound(format!("Plant {}", note.plant_id)));
        }
        let mut notes = self.notes.write().await;
        notes.insert(note.id, note);
        Ok(())
    }

    async fn get_note(&self, id: &NoteId) -> StorageResult<Option<PlantNote>> {
        let notes = self.notes.read().await;
        Ok(notes.get(id).cloned())
    }

    async fn update_note(&self, note: PlantNote) -> StorageResult<()> {
        let mut notes = self.notes.write().await;
        if !notes.contains_key(&note.id) {
            return Err(StorageError::NotFound(format!("Note {}", note.id)));
        }
        notes.insert(note.id, note);
        Ok(())
    }

    async fn list_notes_for_plant(&self, plant_id: &PlantId) -> StorageResult<Vec<PlantNote>> {
        let notes = self.notes.read().await;
        let mut result: Vec<PlantNote> = notes
            .values()
            .filter(|n| &n.plant_id == plant_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.observation_date.cmp(&a.observation_date));
        Ok(result)
    }
}

#[async_trait]
impl PostStorage for InMemoryStorage {
    async fn insert_post(&self, post: Post) -> StorageResult<()> {
        let mut posts = self.posts.write().await;
        posts.insert(post.id, post);
        Ok(())
    }

    async fn get_post(&self, id: &PostId) -> StorageResult<Option<Post>> {
        let posts = self.posts.read().await;
        Ok(posts.get(id).cloned())
    }

    async fn list_posts(&self, page: Page) -> StorageResult<Vec<Post>> {
        let posts = self.posts.read().await;
        let mut result: Vec<Post> = posts.values().cloned().collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(result, page))
    }

    async fn update_post(&self, post: Post) -> StorageResult<()> {
        let mut posts = self.posts.write().await;
        if !posts.contains_key(&post.id) {
            return Err(StorageError::NotFound(format!("Post {}", post.id)));
        }
        posts.insert(post.id, post);
        Ok(())
    }

    async fn delete_post(&self, id: &PostId) -> StorageResult<bool> {
        let mut posts = self.posts.write().await;
        Ok(posts.remove(id).is_some())
    }
}
