//! 统一错误处理模块

mod api;
mod app;
mod audio;

pub use api::ApiError;
pub use app::AppError;
pub use audio::AudioError;
