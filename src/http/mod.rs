mod error;
mod handlers;
mod router;

pub use handlers::AppState;
pub use router::build_router;
