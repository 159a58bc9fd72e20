pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod remote;
pub mod state;
pub mod storage;
pub mod store;
pub mod theme;
pub mod view;

pub use error::AppError;
pub use store::{Outcome, StoreState, TaskStore};
