pub mod analytics;
pub mod config;
pub mod error;
pub mod exercise;
pub mod user;
pub mod webhook;
pub mod workout;

pub use analytics::*;
pub use config::*;
pub use error::*;
pub use exercise::*;
pub use user::*;
pub use webhook::*;
pub use workout::*;
