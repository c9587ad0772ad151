//! 电台 HTTP 接口错误

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 网络/传输层错误
    #[error("请求失败: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// 服务端返回非 2xx
    #[error("{path} 返回 HTTP {status}")]
    Status { path: String, status: StatusCode },

    /// 响应不是预期的 JSON
    #[error("响应解析失败: {0}")]
    Serde(#[from] serde_json::Error),

    /// 读写本地客户端状态失败
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("Header 构造失败: {0}")]
    BadHeader(String),

    #[error("输入错误: {0}")]
    BadInput(&'static str),
}

impl ApiError {
    /// 服务端暂时不可用，下一次轮询可能恢复
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Reqwest(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ApiError::Status { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display_and_transience() {
        let err = ApiError::Status {
            path: "/api/status".to_owned(),
            status: StatusCode::BAD_GATEWAY,
        };
        assert!(err.to_string().contains("/api/status"));
        assert!(err.to_string().contains("502"));
        assert!(err.is_transient());

        let not_found = ApiError::Status {
            path: "/api/vote".to_owned(),
            status: StatusCode::NOT_FOUND,
        };
        assert!(!not_found.is_transient());
    }

    #[test]
    fn test_bad_input_is_not_transient() {
        assert!(!ApiError::BadInput("x").is_transient());
    }
}
