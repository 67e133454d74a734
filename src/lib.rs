pub mod app;
pub mod bookmark;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod prayer;
pub mod remote;
pub mod stats;
pub mod storage;
pub mod sync;
pub mod ui;
pub mod state;

pub use app::router;
pub use config::Config;
pub use ledger::Ledger;
pub use state::AppState;
pub use storage::{load_data, persist_data};
