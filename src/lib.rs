//! # mirror_displayd
//!
//! A small Linux daemon that lets a display be controlled over HTTP:
//! power it on or off, apply a rotation when powering on, and refresh the
//! browser window shown on it.
//!
//! ## Architecture
//!
//! - [`DisplayStateStore`](display_state::DisplayStateStore) - last committed on/off state
//! - [`XorgActuator`](actuator::XorgActuator) - `xrandr`/`xdotool` invocations
//! - [`DisplayController`](controller::DisplayController) - commits a state only after the actuator succeeded
//! - [`interface`] - HTTP routes
//! - [`SystemCoordinator`](coordinator::SystemCoordinator) - service lifecycle
//!
//! ## Example
//!
//! ```no_run
//! use mirror_displayd::{application::Application, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     Application::builder()
//!         .with_config(config)
//!         .build()?
//!         .run()
//!         .await
//! }
//! ```

pub mod actuator;
pub mod app_context;
pub mod application;
pub mod cli;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod display_state;
pub mod interface;
pub mod providers;
pub mod task_manager;
