//! 应用通用错误

use super::{ApiError, AudioError};

/// 应用通用错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化错误
    #[error("JSON 序列化失败: {0}")]
    Serde(#[from] serde_json::Error),

    /// 电台服务端接口错误
    #[error("电台接口错误: {0}")]
    Api(#[from] ApiError),

    /// 音频错误
    #[error("音频错误: {0}")]
    Audio(#[from] AudioError),

    /// 其他错误
    #[error("{0}")]
    Other(String),
}
