//! Dated observations attached to a plant

use crate::{NoteId, PlantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantNote {
    pub id: NoteId,
    pub plant_id: PlantId,
    pub text: String,
    /// Display color chosen by the user, e.g. `green`
    pub color: Option<String>,
    pub observation_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlantNote {
    pub fn new(
        plant_id: PlantId,
        text: impl Into<String>,
        color: Option<String>,
        observation_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: NoteId::generate(),
            plant_id,
            text: text.into(),
            color,
            observation_date,
            created_at: now,
            updated_at: now,
        }
    }
}
