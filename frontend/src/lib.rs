//! Client-side behavior for the marketing site: navigation, scroll state,
//! contact form validation, notifications and entrance animations.

pub mod app;
pub mod components;
pub mod config;
pub mod error;
pub mod forms;
pub mod headless;
pub mod host;
pub mod util;
pub mod web;

pub use app::App;
pub use config::Config;
pub use error::{ConfigError, DomError, SubmitError};
pub use host::{Dom, Page, Scheduler, Viewport};
