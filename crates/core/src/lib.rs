pub mod config;
pub mod error;
pub mod tokenize;
pub mod types;

pub use config::AppConfig;
pub use error::SearchError;
pub use types::*;
