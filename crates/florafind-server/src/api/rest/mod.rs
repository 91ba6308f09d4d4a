//! REST API: router, shared state, extractors and handlers

mod extract;
mod handlers;
mod router;
mod state;

#[cfg(test)]
mod tests;

pub use extract::{ActiveUser, ApiJson, ApiQuery, CurrentUser};
pub use router::create_router;
pub use state::{AppState, IdentifyLimits};
