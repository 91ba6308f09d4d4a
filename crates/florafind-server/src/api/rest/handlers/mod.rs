//! API request handlers

mod auth;
mod gardens;
mod health;
mod identify;
mod plants;
mod posts;

pub use auth::*;
pub use gardens::*;
pub use health::*;
pub use identify::*;
pub use plants::*;
pub use posts::*;

use crate::storage::Page;
use serde::{Deserialize, Serialize};

/// `?skip=&limit=` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
}

impl PageQuery {
    pub fn page(&self, default_limit: usize) -> Page {
        Page::new(self.skip.unwrap_or(0), self.limit.unwrap_or(default_limit))
    }
}

/// Body returned by actions that only report an outcome
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A page of items with the unpaginated total
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}
