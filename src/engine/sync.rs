//! 会话级同步状态：当前采用的曲目、用户意图、播放按钮的去抖

use crate::domain::{BroadcastState, TrackId};
use std::time::{Duration, Instant};

/// 用户刚点过播放/停止后，这段时间内不让本地状态覆盖按钮显示
pub const PLAY_REQUEST_GRACE: Duration = Duration::from_secs(3);

/// active deck 上当前采用的曲目
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Adoption {
    #[default]
    None,
    /// 乐观起播：已经在放当前广播，但还不知道是哪一首
    Optimistic,
    Track(TrackId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    NoTrack,
    Loading,
    Playing,
    UserStopped,
}

/// 一次轮询结果对应的动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDecision {
    /// 未就绪或用户已停止：不碰 deck
    Ignore,
    /// 服务端没有曲目：暂停并清空采用
    Release,
    /// 服务端暂停了广播
    Hold,
    /// 乐观起播后的首次确认：就地采用，不做交叉淡化
    AdoptInPlace(TrackId),
    ChangeTrack,
    Continue,
}

#[derive(Debug, Clone, Default)]
pub struct SyncState {
    armed: bool,
    adopted: Adoption,
    user_stopped: bool,
    last_play_request: Option<Instant>,
    shows_playing: bool,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用户至少按过一次播放
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn adopted(&self) -> &Adoption {
        &self.adopted
    }

    pub fn adopted_track(&self) -> Option<&TrackId> {
        match &self.adopted {
            Adoption::Track(id) => Some(id),
            _ => None,
        }
    }

    pub fn user_stopped(&self) -> bool {
        self.user_stopped
    }

    pub fn shows_playing(&self) -> bool {
        self.shows_playing
    }

    pub fn decide(&self, current: Option<&BroadcastState>) -> SyncDecision {
        if !self.armed || self.user_stopped {
            return SyncDecision::Ignore;
        }
        let Some(state) = current else {
            return match self.adopted {
                Adoption::None => SyncDecision::Ignore,
                _ => SyncDecision::Release,
            };
        };
        match &self.adopted {
            Adoption::Optimistic => SyncDecision::AdoptInPlace(state.track_id.clone()),
            Adoption::Track(id) if *id == state.track_id => {
                if state.playing {
                    SyncDecision::Continue
                } else {
                    SyncDecision::Hold
                }
            }
            _ => SyncDecision::ChangeTrack,
        }
    }

    pub fn adopt(&mut self, adoption: Adoption) {
        self.adopted = adoption;
    }

    pub fn clear_adoption(&mut self) {
        self.adopted = Adoption::None;
    }

    pub fn request_play(&mut self, now: Instant) {
        self.armed = true;
        self.user_stopped = false;
        self.last_play_request = Some(now);
        self.shows_playing = true;
    }

    pub fn request_stop(&mut self, now: Instant) {
        self.user_stopped = true;
        self.last_play_request = Some(now);
        self.shows_playing = false;
    }

    /// 用本地实际播放状态校正按钮显示；刚发出的请求在宽限期内优先
    pub fn reconcile_label(&mut self, actually_playing: bool, now: Instant) -> bool {
        if self.shows_playing == actually_playing {
            return false;
        }
        let recent = self
            .last_play_request
            .is_some_and(|at| now.saturating_duration_since(at) < PLAY_REQUEST_GRACE);
        if recent {
            return false;
        }
        self.shows_playing = actually_playing;
        true
    }

    pub fn phase(&self, active_loading: bool) -> SyncPhase {
        if self.user_stopped {
            return SyncPhase::UserStopped;
        }
        match self.adopted {
            Adoption::None => SyncPhase::NoTrack,
            _ if active_loading => SyncPhase::Loading,
            _ => SyncPhase::Playing,
        }
    }
}
