//! Gardens and the plants they hold

use crate::{GardenId, PlantId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named garden owned by one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Garden {
    pub id: GardenId,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Garden {
    pub fn new(
        user_id: UserId,
        name: impl Into<String>,
        description: Option<String>,
        image_url: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: GardenId::generate(),
            user_id,
            name: name.into(),
            description,
            image_url,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Botanical identification of a plant, as reported by PlantNet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub scientific_name_without_author: String,
    pub genus: String,
    pub family: String,
    pub common_names: Vec<String>,
}

/// A plant living in a garden
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    pub id: PlantId,
    pub garden_id: GardenId,
    pub user_id: UserId,
    /// Unique per user
    pub alias: String,
    pub image_url: Option<String>,
    #[serde(flatten)]
    pub taxonomy: Taxonomy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plant {
    pub fn new(
        user_id: UserId,
        garden_id: GardenId,
        alias: impl Into<String>,
        image_url: Option<String>,
        taxonomy: Taxonomy,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: PlantId::generate(),
            garden_id,
            user_id,
            alias: alias.into(),
            image_url,
            taxonomy,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plant_serializes_taxonomy_flat() {
        let plant = Plant::new(
            UserId::generate(),
            GardenId::generate(),
            "Fern",
            None,
            Taxonomy {
                scientific_name_without_author: "Nephrolepis exaltata".into(),
                genus: "Nephrolepis".into(),
                family: "Nephrolepidaceae".into(),
                common_names: vec!["Boston fern".into()],
            },
        );

        let json = serde_json::to_value(&plant).unwrap();
        assert_eq!(json["genus"], "Nephrolepis");
        assert_eq!(json["common_names"][0], "Boston fern");
        assert!(json.get("taxonomy").is_none());
    }
}
