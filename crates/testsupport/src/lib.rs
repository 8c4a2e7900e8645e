pub mod daemon;
pub mod helpers;
pub mod http_client;
pub mod metrics;

pub use daemon::*;
pub use helpers::*;
pub use http_client::*;
pub use metrics::*;
