pub mod app;
pub mod clock;
pub mod config;
pub mod errors;
pub mod gauge;
pub mod gesture;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod reminder;
pub mod rollover;
pub mod state;
pub mod stats;
pub mod storage;
pub mod store;
pub mod tracker;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
pub use storage::{load_data, persist_data};
pub use tracker::Tracker;
