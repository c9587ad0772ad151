use radio_ratui::domain::EqBand;
use radio_ratui::engine::PlayerSnapshot;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ToastLevel {
    Info,
    Warning,
    Error,
}

impl ToastLevel {
    /// `None` 表示需要手动关闭
    pub(super) fn duration_ms(self) -> Option<u64> {
        match self {
            ToastLevel::Info => Some(3000),
            ToastLevel::Warning => Some(5000),
            ToastLevel::Error => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(super) struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub created_at: Instant,
}

impl Toast {
    fn new(level: ToastLevel, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level,
            created_at: Instant::now(),
        }
    }

    pub(super) fn info(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Info, message)
    }

    pub(super) fn warning(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Warning, message)
    }

    pub(super) fn error(message: impl Into<String>) -> Self {
        Self::new(ToastLevel::Error, message)
    }

    pub(super) fn is_expired(&self) -> bool {
        self.level
            .duration_ms()
            .is_some_and(|ms| self.created_at.elapsed() >= Duration::from_millis(ms))
    }
}

/// UI 本地状态：引擎快照 + 纯界面状态
#[derive(Debug, Clone)]
pub(super) struct UiState {
    pub player: PlayerSnapshot,
    pub eq_band: EqBand,
    pub toast: Option<Toast>,
    pub help_visible: bool,
    /// 等待用户按键才能开始出声
    pub prompt: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            player: PlayerSnapshot::default(),
            eq_band: EqBand::Low,
            toast: None,
            help_visible: false,
            prompt: None,
        }
    }
}

impl UiState {
    pub(super) fn expire_toast(&mut self) {
        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
        }
    }
}
