//! 音频播放相关错误

/// 音频播放错误类型
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// 打开默认音频输出失败
    #[error("创建音频输出流失败: {0}")]
    OutputStream(String),

    /// 下载媒体失败
    #[error("下载音频失败({url}): {message}")]
    Download { url: String, message: String },

    /// 写入/读取临时文件失败
    #[error("临时文件读写失败: {0}")]
    TempFile(#[from] std::io::Error),

    /// 解码音频失败
    #[error("解码音频失败({url}): {source}")]
    Decode {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 输出拒绝开始播放（需要用户先操作一次）
    #[error("播放被拒绝: {0}")]
    PlaybackRejected(String),

    /// deck 上没有可播放的音源
    #[error("deck {0} 没有加载音源")]
    NoSource(usize),
}

impl AudioError {
    /// 媒体本身不可播放：需要让服务端跳过这首
    pub fn is_media_failure(&self) -> bool {
        matches!(self, AudioError::Decode { .. } | AudioError::Download { .. })
    }

    /// 需要用户交互才能恢复
    pub fn needs_interaction(&self) -> bool {
        matches!(self, AudioError::PlaybackRejected(_))
    }
}
