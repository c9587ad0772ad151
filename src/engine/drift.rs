//! 同一首歌继续播放时的位置校正

use super::deck::{Deck, DeckStatus};
use crate::domain::BroadcastState;

/// 本地位置与服务端位置相差超过这个值才 snap，吸收轮询延迟带来的抖动
pub const DRIFT_TOLERANCE_SECS: f64 = 8.0;
/// 服务端刚从头开始而本地已接近结尾时，视为服务端重播
pub const RESTART_WINDOW_SECS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftAction {
    None,
    /// deck 意外暂停，需要恢复
    Resume,
    Snap { to: f64, drift: f64 },
    /// 本地已播完而服务端从头重播同一首歌；结束的音源无法 seek，只能重新加载
    Reload,
}

/// 校正所需的 deck 状态快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeckView {
    pub status: DeckStatus,
    pub paused: bool,
    /// 秒
    pub position: f64,
}

impl DeckView {
    pub fn of(deck: &Deck) -> Self {
        Self {
            status: deck.status(),
            paused: deck.is_paused(),
            position: deck.position_secs(),
        }
    }
}

pub fn check_drift(deck: &DeckView, state: &BroadcastState, user_stopped: bool) -> DriftAction {
    if user_stopped || !state.playing {
        return DriftAction::None;
    }
    if deck.status == DeckStatus::Ended {
        let target = state.target_position();
        let replayed = state.elapsed < RESTART_WINDOW_SECS
            || target < deck.position - DRIFT_TOLERANCE_SECS;
        return if replayed {
            DriftAction::Reload
        } else {
            DriftAction::None
        };
    }
    // 加载中的 seek 会在就绪时补做；出错的 deck 不自动恢复
    if deck.status != DeckStatus::Ready {
        return DriftAction::None;
    }
    if deck.paused {
        return DriftAction::Resume;
    }

    let target = state.target_position();
    let drift = deck.position - target;
    let restarted = state.elapsed < RESTART_WINDOW_SECS
        && state.duration > 2.0 * RESTART_WINDOW_SECS
        && deck.position > state.duration - RESTART_WINDOW_SECS;
    if drift.abs() > DRIFT_TOLERANCE_SECS || restarted {
        DriftAction::Snap { to: target, drift }
    } else {
        DriftAction::None
    }
}
