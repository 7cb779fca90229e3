pub mod bootstrap;
pub mod router;
pub mod server;
pub mod state;

pub use router::build_router;
pub use state::{AppState, SharedState};
