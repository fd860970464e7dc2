//! Dependency injection providers for service management.
//!
//! Providers build the application state and the long-running services
//! that the coordinator starts through the task manager.

pub mod app_state;
pub mod http;
pub mod traits;

pub use app_state::AppStateProvider;
pub use http::HttpServiceProvider;
pub use traits::{AsyncProvider, ServiceProvider};
