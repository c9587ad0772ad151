pub mod api;
pub mod domain;
pub mod engine;
pub mod error;
pub mod logging;
pub mod settings;
