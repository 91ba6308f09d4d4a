//! PostgreSQL storage implementation

use super::traits::*;
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use florafind_types::{
    Garden, GardenId, NoteId, PasswordHistoryEntry, Plant, PlantId, PlantNote, Post, PostId,
    Taxonomy, User, UserId,
};
use serde_json::Value;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Row,
};
use std::time::Duration;
use uuid::Uuid;

/// PostgreSQL-backed storage
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect to PostgreSQL and initialize schema
    pub async fn new(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let storage = Self { pool };
        storage.initialize_schema().await?;
        Ok(storage)
    }

    async fn initialize_schema(&self) -> Result<(), StorageError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                full_name TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS password_history (
                id BIGSERIAL PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS password_history_user ON password_history(user_id, created_at DESC);"#,
            r#"
            CREATE TABLE IF NOT EXISTS gardens (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                description TEXT,
                image_url TEXT,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                UNIQUE (user_id, name)
            );
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS plants (
                id UUID PRIMARY KEY,
                garden_id UUID NOT NULL REFERENCES gardens(id) ON DELETE CASCADE,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                alias TEXT NOT NULL,
                image_url TEXT,
                scientific_name_without_author TEXT NOT NULL,
                genus TEXT NOT NULL,
                family TEXT NOT NULL,
                common_names JSONB NOT NULL DEFAULT '[]'::jsonb,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                UNIQUE (user_id, alias)
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS plants_garden_id ON plants(garden_id);"#,
            r#"
            CREATE TABLE IF NOT EXISTS plant_notes (
                id UUID PRIMARY KEY,
                plant_id UUID NOT NULL REFERENCES plants(id) ON DELETE CASCADE,
                text TEXT NOT NULL,
                color TEXT,
                observation_date TIMESTAMPTZ NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS plant_notes_plant ON plant_notes(plant_id, observation_date DESC);"#,
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id UUID PRIMARY KEY,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                published BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS posts_created_at ON posts(created_at DESC);"#,
        ];

        for stmt in statements {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Query(e.to_string()))?;
        }

        Ok(())
    }

    /// Map write failures, surfacing constraint violations as domain errors
    fn write_err(e: sqlx::Error, conflict: &str) -> StorageError {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return StorageError::Conflict(conflict.to_string());
            }
            if db_err.is_foreign_key_violation() {
                return StorageError::NotFound("Referenced record does not exist".to_string());
            }
        }
        StorageError::Query(e.to_string())
    }

    fn get<'r, T>(row: &'r PgRow, column: &str) -> Result<T, StorageError>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        row.try_get(column)
            .map_err(|e| StorageError::Query(e.to_string()))
    }

    fn page_params(page: Page) -> (i64, i64) {
        (
            i64::try_from(page.limit).unwrap_or(i64::MAX),
            i64::try_from(page.skip).unwrap_or(i64::MAX),
        )
    }

    fn count_from_row(row: &PgRow) -> Result<usize, StorageError> {
        let count: i64 = Self::get(row, "count")?;
        usize::try_from(count).map_err(|e| StorageError::InvalidData(e.to_string()))
    }

    fn user_from_row(row: &PgRow) -> Result<User, StorageError> {
        Ok(User {
            id: UserId::from_uuid(Self::get::<Uuid>(row, "id")?),
            email: Self::get(row, "email")?,
            username: Self::get(row, "username")?,
            password_hash: Self::get(row, "password_hash")?,
            full_name: Self::get(row, "full_name")?,
            is_active: Self::get(row, "is_active")?,
            is_superuser: Self::get(row, "is_superuser")?,
            created_at: Self::get(row, "created_at")?,
            updated_at: Self::get(row, "updated_at")?,
        })
    }

    fn garden_from_row(row: &PgRow) -> Result<Garden, StorageError> {
        Ok(Garden {
            id: GardenId::from_uuid(Self::get::<Uuid>(row, "id")?),
            user_id: UserId::from_uuid(Self::get::<Uuid>(row, "user_id")?),
            name: Self::get(row, "name")?,
            description: Self::get(row, "description")?,
            image_url: Self::get(row, "image_url")?,
            created_at: Self::get(row, "created_at")?,
            updated_at: Self::get(row, "updated_at")?,
        })
    }

    fn plant_from_row(row: &PgRow) -> Result<Plant, StorageError> {
        let common_names: Value = Self::get(row, "common_names")?;
        let common_names: Vec<String> = serde_json::from_value(common_names)
            .map_err(|e| StorageError::InvalidData(format!("json deserialize error: {}", e)))?;

        Ok(Plant {
            id: PlantId::from_uuid(Self::get::<Uuid>(row, "id")?),
            garden_id: GardenId::from_uuid(Self::get::<Uuid>(row, "garden_id")?),
            user_id: UserId::from_uuid(Self::get::<Uuid>(row, "user_id")?),
            alias: Self::get(row, "alias")?,
            image_url: Self::get(row, "image_url")?,
            taxonomy: Taxonomy {
                scientific_name_without_author: Self::get(row, "scientific_name_without_author")?,
                genus: Self::get(row, "genus")?,
                family: Self::get(row, "family")?,
                common_names,
            },
            created_at: Self::get(row, "created_at")?,
            updated_at: Self::get(row, "updated_at")?,
        })
    }

    fn note_from_row(row: &PgRow) -> Result<PlantNote, StorageError> {
        Ok(PlantNote {
            id: NoteId::from_uuid(Self::get::<Uuid>(row, "id")?),
            plant_id: PlantId::from_uuid(Self::get::<Uuid>(row, "plant_id")?),
            text: Self::get(row, "text")?,
            color: Self::get(row, "color")?,
            observation_date: Self::get::<DateTime<Utc>>(row, "observation_date")?,
            created_at: Self::get(row, "created_at")?,
            updated_at: Self::get(row, "updated_at")?,
        })
    }

    fn post_from_row(row: &PgRow) -> Result<Post, StorageError> {
        Ok(Post {
            id: PostId::from_uuid(Self::get::<Uuid>(row, "id")?),
            user_id: UserId::from_uuid(Self::get::<Uuid>(row, "user_id")?),
            title: Self::get(row, "title")?,
            content: Self::get(row, "content")?,
            published: Self::get(row, "published")?,
            created_at: Self::get(row, "created_at")?,
            updated_at: Self::get(row, "updated_at")?,
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl UserStorage for PostgresStorage {
    async fn get_user(&self, id: &UserId) -> StorageResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        row.as_ref().map(Self::user_from_row).transpose()
    }

    async fn insert_user(&self, user: User) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, username, password_hash, full_name,
                               is_active, is_superuser, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id.into_uuid())
        .bind(user.email)
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.full_name)
        .bind(user.is_active)
        .bind(user.is_superuser)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_err(e, "Email or username already registered"))?;

        Ok(())
    }

    async fn update_user(&self, user: User) -> StorageResult<()> {
        let id = user.id;
        let result = sqlx::query(
            r#"
            UPDATE users SET
                email = $2,
                username = $3,
                password_hash = $4,
                full_name = $5,
                is_active = $6,
                is_superuser = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(id.into_uuid())
        .bind(user.email)
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.full_name)
        .bind(user.is_active)
        .bind(user.is_superuser)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_err(e, "Email or username already in use"))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("User {}", id)));
        }
        Ok(())
    }

    async fn add_password_history(&self, entry: PasswordHistoryEntry) -> StorageResult<()> {
        sqlx::query(
            "INSERT INTO password_history (user_id, password_hash, created_at) VALUES ($1, $2, $3)",
        )
        .bind(entry.user_id.into_uuid())
        .bind(entry.password_hash)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_err(e, "Duplicate password history entry"))?;

        Ok(())
    }

    async fn recent_password_hashes(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> StorageResult<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT password_hash FROM password_history
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id.into_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| Self::get(row, "password_hash"))
            .collect()
    }
}

#[async_trait]
impl GardenStorage for PostgresStorage {
    async fn insert_garden(&self, garden: Garden) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO gardens (id, user_id, name, description, image_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(garden.id.into_uuid())
        .bind(garden.user_id.into_uuid())
        .bind(garden.name)
        .bind(garden.description)
        .bind(garden.image_url)
        .bind(garden.created_at)
        .bind(garden.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_err(e, "A garden with this name already exists"))?;

        Ok(())
    }

    async fn get_garden(&self, id: &GardenId) -> StorageResult<Option<Garden>> {
        let row = sqlx::query("SELECT * FROM gardens WHERE id = $1")
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        row.as_ref().map(Self::garden_from_row).transpose()
    }

    async fn get_garden_by_name(
        &self,
        user_id: &UserId,
        name: &str,
    ) -> StorageResult<Option<Garden>> {
        let row = sqlx::query("SELECT * FROM gardens WHERE user_id = $1 AND name = $2")
            .bind(user_id.into_uuid())
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        row.as_ref().map(Self::garden_from_row).transpose()
    }

    async fn list_gardens(&self, user_id: &UserId) -> StorageResult<Vec<Garden>> {
        let rows = sqlx::query("SELECT * FROM gardens WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id.into_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter().map(Self::garden_from_row).collect()
    }

    async fn update_garden(&self, garden: Garden) -> StorageResult<()> {
        let id = garden.id;
        let result = sqlx::query(
            r#"
            UPDATE gardens SET
                name = $2,
                description = $3,
                image_url = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id.into_uuid())
        .bind(garden.name)
        .bind(garden.description)
        .bind(garden.image_url)
        .bind(garden.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_err(e, "A garden with this name already exists"))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("Garden {}", id)));
        }
        Ok(())
    }

    async fn delete_garden(&self, id: &GardenId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM gardens WHERE id = $1")
            .bind(id.into_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PlantStorage for PostgresStorage {
    async fn insert_plant(&self, plant: Plant) -> StorageResult<()> {
        let common_names = serde_json::to_value(&plant.taxonomy.common_names)
            .map_err(|e| StorageError::InvalidData(format!("json serialize error: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO plants (id, garden_id, user_id, alias, image_url,
                                scientific_name_without_author, genus, family, common_names,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(plant.id.into_uuid())
        .bind(plant.garden_id.into_uuid())
        .bind(plant.user_id.into_uuid())
        .bind(plant.alias)
        .bind(plant.image_url)
        .bind(plant.taxonomy.scientific_name_without_author)
        .bind(plant.taxonomy.genus)
        .bind(plant.taxonomy.family)
        .bind(common_names)
        .bind(plant.created_at)
        .bind(plant.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_err(e, "A plant with this alias already exists"))?;

        Ok(())
    }

    async fn get_plant(&self, id: &PlantId) -> StorageResult<Option<Plant>> {
        let row = sqlx::query("SELECT * FROM plants WHERE id = $1")
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        row.as_ref().map(Self::plant_from_row).transpose()
    }

    async fn get_plant_by_alias(
        &self,
        user_id: &UserId,
        alias: &str,
    ) -> StorageResult<Option<Plant>> {
        let row = sqlx::query("SELECT * FROM plants WHERE user_id = $1 AND alias = $2")
            .bind(user_id.into_uuid())
            .bind(alias)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        row.as_ref().map(Self::plant_from_row).transpose()
    }

    async fn list_plants_for_garden(
        &self,
        garden_id: &GardenId,
        page: Page,
    ) -> StorageResult<Vec<Plant>> {
        let (limit, offset) = Self::page_params(page);
        let rows = sqlx::query(
            "SELECT * FROM plants WHERE garden_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(garden_id.into_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter().map(Self::plant_from_row).collect()
    }

    async fn count_plants_for_garden(&self, garden_id: &GardenId) -> StorageResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM plants WHERE garden_id = $1")
            .bind(garden_id.into_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        Self::count_from_row(&row)
    }

    async fn list_plants_for_user(
        &self,
        user_id: &UserId,
        page: Page,
    ) -> StorageResult<Vec<Plant>> {
        let (limit, offset) = Self::page_params(page);
        let rows = sqlx::query(
            "SELECT * FROM plants WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id.into_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter().map(Self::plant_from_row).collect()
    }

    async fn count_plants_for_user(&self, user_id: &UserId) -> StorageResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM plants WHERE user_id = $1")
            .bind(user_id.into_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        Self::count_from_row(&row)
    }

    async fn update_plant(&self, plant: Plant) -> StorageResult<()> {
        let id = plant.id;
        let common_names = serde_json::to_value(&plant.taxonomy.common_names)
            .map_err(|e| StorageError::InvalidData(format!("json serialize error: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE plants SET
                garden_id = $2,
                alias = $3,
                image_url = $4,
                scientific_name_without_author = $5,
                genus = $6,
                family = $7,
                common_names = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(id.into_uuid())
        .bind(plant.garden_id.into_uuid())
        .bind(plant.alias)
        .bind(plant.image_url)
        .bind(plant.taxonomy.scientific_name_without_author)
        .bind(plant.taxonomy.genus)
        .bind(plant.taxonomy.family)
        .bind(common_names)
        .bind(plant.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_err(e, "A plant with this alias already exists"))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("Plant {}", id)));
        }
        Ok(())
    }

    async fn delete_plant(&self, id: &PlantId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM plants WHERE id = $1")
            .bind(id.into_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl NoteStorage for PostgresStorage {
    async fn insert_note(&self, note: PlantNote) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO plant_notes (id, plant_id, text, color, observation_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(note.id.into_uuid())
        .bind(note.plant_id.into_uuid())
        .bind(note.text)
        .bind(note.color)
        .bind(note.observation_date)
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_err(e, "Duplicate note"))?;

        Ok(())
    }

    async fn get_note(&self, id: &NoteId) -> StorageResult<Option<PlantNote>> {
        let row = sqlx::query("SELECT * FROM plant_notes WHERE id = $1")
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        row.as_ref().map(Self::note_from_row).transpose()
    }

    async fn update_note(&self, note: PlantNote) -> StorageResult<()> {
        let id = note.id;
        let result = sqlx::query(
            r#"
            UPDATE plant_notes SET
                text = $2,
                color = $3,
                observation_date = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id.into_uuid())
        .bind(note.text)
        .bind(note.color)
        .bind(note.observation_date)
        .bind(note.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("Note {}", id)));
        }
        Ok(())
    }

    async fn list_notes_for_plant(&self, plant_id: &PlantId) -> StorageResult<Vec<PlantNote>> {
        let rows = sqlx::query(
            "SELECT * FROM plant_notes WHERE plant_id = $1 ORDER BY observation_date DESC",
        )
        .bind(plant_id.into_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter().map(Self::note_from_row).collect()
    }
}

#[async_trait]
impl PostStorage for PostgresStorage {
    async fn insert_post(&self, post: Post) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, user_id, title, content, published, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(post.id.into_uuid())
        .bind(post.user_id.into_uuid())
        .bind(post.title)
        .bind(post.content)
        .bind(post.published)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_err(e, "Duplicate post"))?;

        Ok(())
    }

    async fn get_post(&self, id: &PostId) -> StorageResult<Option<Post>> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = $1")
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        row.as_ref().map(Self::post_from_row).transpose()
    }

    async fn list_posts(&self, page: Page) -> StorageResult<Vec<Post>> {
        let (limit, offset) = Self::page_params(page);
        let rows = sqlx::query("SELECT * FROM posts ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;

        rows.iter().map(Self::post_from_row).collect()
    }

    async fn update_post(&self, post: Post) -> StorageResult<()> {
        let id = post.id;
        let result = sqlx::query(
            r#"
            UPDATE posts SET
                title = $2,
                content = $3,
                published = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(id.into_uuid())
        .bind(post.title)
        .bind(post.content)
        .bind(post.published)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("Post {}", id)));
        }
        Ok(())
    }

    async fn delete_post(&self, id: &PostId) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id.into_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Query(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }
}
