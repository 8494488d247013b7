//! axum HTTP surface: route wiring (`routes`) and shared application
//! state (`state`).

pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
