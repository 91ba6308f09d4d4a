//! FloraFind Types - Core domain model
//!
//! ## Key Concepts
//!
//! - **User**: an account; exposed publicly only as a [`UserProfile`]
//! - **Garden**: a named collection of plants owned by one user
//! - **Plant**: a garden resident with a per-user unique alias and its
//!   botanical [`Taxonomy`]
//! - **PlantNote**: a dated observation about a plant
//! - **Post**: a short article written by a user

#![deny(unsafe_code)]

pub mod garden;
pub mod ids;
pub mod note;
pub mod post;
pub mod user;
pub mod validation;

pub use garden::{Garden, Plant, Taxonomy};
pub use ids::{GardenId, NoteId, PlantId, PostId, UserId};
pub use note::PlantNote;
pub use post::Post;
pub use user::{PasswordHistoryEntry, User, UserProfile};
pub use validation::{ValidationError, ValidationResult};
