//! 同步引擎状态机。
//!
//! 轮询结果、用户命令、deck 回报和定时 tick 都以 `EngineInput` 进入，
//! 引擎同步地改 deck 状态，需要对外做的事（跳过、提前轮询、保存设置……）
//! 以 `EngineEffect` 返回给 actor 执行。时钟由调用方传入。

use super::deck::{DeckEvent, DeckSource, DeckStatus, MasterGain};
use super::drift::{DeckView, DriftAction, check_drift};
use super::messages::{PlayerCommand, PlayerSnapshot};
use super::output::OutputSignal;
use super::pool::{DeckPool, TrackLoad};
use super::sync::{Adoption, SyncDecision, SyncState};
use crate::api::MediaUrls;
use crate::domain::{BroadcastState, EqBands, StatusSnapshot, TrackId};
use crate::error::AudioError;
use crate::settings::clamp_crossfade;
use std::time::{Duration, Instant};

/// 本地播完后提前再轮询一次，尽快接上下一首
pub const EARLY_POLL_AFTER_END: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub enum EngineInput {
    Status(StatusSnapshot),
    StatusFailed(String),
    Command(PlayerCommand),
    Signal(OutputSignal),
    Tick,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEffect {
    /// 通知服务端跳过无法播放的曲目
    RequestSkip(TrackId),
    PollSoon(Duration),
    PromptInteraction(String),
    Notice(String),
    SaveSettings {
        volume: f32,
        muted: bool,
        crossfade_secs: f32,
    },
    SubmitVote {
        id: TrackId,
        rating: u8,
    },
    PersistTrack {
        id: TrackId,
        volume: f32,
        eq: EqBands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    pub crossfade: Duration,
    pub optimistic_stream: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            crossfade: Duration::from_secs(3),
            optimistic_stream: true,
        }
    }
}

pub struct SyncEngine {
    pool: DeckPool,
    sync: SyncState,
    media: MediaUrls,
    opts: EngineOptions,
    status: Option<StatusSnapshot>,
    status_at: Option<Instant>,
    online: bool,
    last_error: Option<String>,
    skip_requested: Option<TrackId>,
    pending_vote: Option<(TrackId, u8)>,
    eq_override: Option<(TrackId, EqBands)>,
}

impl SyncEngine {
    pub fn new(pool: DeckPool, media: MediaUrls, opts: EngineOptions) -> Self {
        Self {
            pool,
            sync: SyncState::new(),
            media,
            opts,
            status: None,
            status_at: None,
            online: false,
            last_error: None,
            skip_requested: None,
            pending_vote: None,
            eq_override: None,
        }
    }

    pub fn pool(&self) -> &DeckPool {
        &self.pool
    }

    pub fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    pub fn handle(&mut self, input: EngineInput, now: Instant) -> Vec<EngineEffect> {
        let mut fx = Vec::new();
        match input {
            EngineInput::Status(snap) => self.on_status(snap, now, &mut fx),
            EngineInput::StatusFailed(message) => {
                self.online = false;
                self.last_error = Some(message);
            }
            EngineInput::Command(cmd) => self.on_command(cmd, now, &mut fx),
            EngineInput::Signal(signal) => {
                if let Some((slot, ev)) = self.pool.handle_signal(&signal) {
                    self.on_deck_event(slot, ev, &mut fx);
                }
            }
            EngineInput::Tick => self.on_tick(now, &mut fx),
        }
        fx
    }

    fn on_status(&mut self, snap: StatusSnapshot, now: Instant, fx: &mut Vec<EngineEffect>) {
        self.online = true;
        self.last_error = None;

        let current_id = snap.current.as_ref().map(|s| s.track_id.clone());
        if self
            .pending_vote
            .as_ref()
            .is_some_and(|(id, r)| current_id.as_ref() != Some(id) || snap.user_vote == Some(*r))
        {
            self.pending_vote = None;
        }
        if self
            .eq_override
            .as_ref()
            .is_some_and(|(id, _)| current_id.as_ref() != Some(id))
        {
            self.eq_override = None;
        }
        // 服务端已经离开这首歌；之后再轮到它时出错需要重新请求跳过
        if self.skip_requested.is_some() && self.skip_requested != current_id {
            self.skip_requested = None;
        }

        let current = snap.current.clone();
        self.status = Some(snap);
        self.status_at = Some(now);

        match self.sync.decide(current.as_ref()) {
            SyncDecision::Ignore => {}
            SyncDecision::Release => {
                tracing::info!("服务端没有正在播放的曲目，暂停本地播放");
                self.pool.pause_active();
                self.sync.clear_adoption();
            }
            SyncDecision::Hold => {
                if self.pool.active_deck().is_playing() {
                    tracing::info!("服务端暂停了广播");
                    self.pool.pause_active();
                }
            }
            SyncDecision::AdoptInPlace(id) => {
                tracing::info!(track_id = %id, "确认乐观起播的曲目");
                self.pool.adopt_active(id.clone());
                self.sync.adopt(Adoption::Track(id));
                if let Some(state) = &current {
                    self.continue_track(state, now, fx);
                }
            }
            SyncDecision::ChangeTrack => {
                if let Some(state) = &current {
                    self.change_track(state, now, fx);
                }
            }
            SyncDecision::Continue => {
                if let Some(state) = &current {
                    self.continue_track(state, now, fx);
                }
            }
        }
    }

    fn change_track(&mut self, state: &BroadcastState, now: Instant, fx: &mut Vec<EngineEffect>) {
        let load = TrackLoad {
            url: self.media.media_url(&state.filename),
            source: DeckSource::Track(state.track_id.clone()),
            position: state.target_position(),
            trim_start: state.trim_start,
            trim_end: state.trim_end,
            volume: state.volume,
            eq: self.effective_eq(state),
        };
        tracing::info!(
            track_id = %state.track_id,
            title = %state.title,
            position = load.position,
            "检测到新曲目"
        );
        let report = self.pool.crossfade_to(load, self.opts.crossfade, now);
        self.sync.adopt(Adoption::Track(state.track_id.clone()));
        if let Err(e) = report.play_result {
            self.on_play_error(e, fx);
        }
        if !state.playing {
            self.pool.pause_active();
        }
    }

    fn continue_track(&mut self, state: &BroadcastState, now: Instant, fx: &mut Vec<EngineEffect>) {
        let eq = self.effective_eq(state);
        self.pool
            .active_deck_mut()
            .set_track_props(state.trim_start, state.trim_end, state.volume, eq);

        let view = DeckView::of(self.pool.active_deck());
        match check_drift(&view, state, self.sync.user_stopped()) {
            DriftAction::None => {}
            DriftAction::Resume => {
                tracing::info!(track_id = %state.track_id, "deck 意外暂停，恢复播放");
                if let Err(e) = self.pool.resume_active(now) {
                    self.on_play_error(e, fx);
                }
            }
            DriftAction::Snap { to, drift } => {
                tracing::info!(track_id = %state.track_id, drift, to, "播放位置偏差过大，校正");
                self.pool.active_deck_mut().seek_to(to);
            }
            DriftAction::Reload => {
                tracing::info!(
                    track_id = %state.track_id,
                    elapsed = state.elapsed,
                    "本地已播完，服务端重新开始了同一首歌，重新加载"
                );
                self.change_track(state, now, fx);
            }
        }
    }

    fn on_command(&mut self, cmd: PlayerCommand, now: Instant, fx: &mut Vec<EngineEffect>) {
        match cmd {
            PlayerCommand::Play => self.play(now, fx),
            PlayerCommand::Stop => self.stop(now),
            PlayerCommand::TogglePlay => {
                if self.sync.shows_playing() {
                    self.stop(now);
                } else {
                    self.play(now, fx);
                }
            }
            PlayerCommand::ToggleMute => {
                let mut master = self.pool.master();
                master.muted = !master.muted;
                self.set_master(master, now, fx);
            }
            PlayerCommand::SetVolume(v) => {
                let mut master = self.pool.master();
                master.volume = clamp_volume(v);
                self.set_master(master, now, fx);
            }
            PlayerCommand::AdjustVolume(delta) => {
                let mut master = self.pool.master();
                master.volume = clamp_volume(master.volume + delta);
                self.set_master(master, now, fx);
            }
            PlayerCommand::AdjustCrossfade(delta) => {
                let secs = clamp_crossfade(self.opts.crossfade.as_secs_f32() + delta);
                self.opts.crossfade = Duration::from_secs_f32(secs);
                tracing::info!(crossfade_secs = secs, "调整交叉淡化时长");
                fx.push(self.settings_effect());
            }
            PlayerCommand::Vote(rating) => self.vote(rating, fx),
            PlayerCommand::AdjustEq { band, delta_db } => {
                self.edit_eq(fx, |eq| eq.with_band(band, eq.band(band) + delta_db));
            }
            PlayerCommand::ResetEq => self.edit_eq(fx, |_| EqBands::default()),
            PlayerCommand::SaveTrackSettings => {
                let Some(state) = self.current() else {
                    return;
                };
                match &self.eq_override {
                    Some((id, eq)) if *id == state.track_id => fx.push(EngineEffect::PersistTrack {
                        id: id.clone(),
                        volume: state.volume,
                        eq: *eq,
                    }),
                    _ => fx.push(EngineEffect::Notice("EQ 没有改动".to_owned())),
                }
            }
        }
    }

    fn play(&mut self, now: Instant, fx: &mut Vec<EngineEffect>) {
        self.sync.request_play(now);

        let Some(mut state) = self.current().cloned() else {
            if self.opts.optimistic_stream && *self.sync.adopted() == Adoption::None {
                self.start_optimistic_stream(now, fx);
            }
            fx.push(EngineEffect::PollSoon(Duration::ZERO));
            return;
        };

        // 按上次轮询以来的时间外推服务端位置
        if state.playing
            && let Some(at) = self.status_at
        {
            state.elapsed += now.saturating_duration_since(at).as_secs_f64();
        }

        let resumable = self.sync.adopted_track() == Some(&state.track_id)
            && self.pool.active_deck().track_id() == Some(&state.track_id)
            && matches!(
                self.pool.active_deck().status(),
                DeckStatus::Ready | DeckStatus::Loading
            );
        if resumable {
            tracing::info!(track_id = %state.track_id, "恢复播放");
            self.pool.active_deck_mut().seek_to(state.target_position());
            if let Err(e) = self.pool.resume_active(now) {
                self.on_play_error(e, fx);
            }
        } else {
            self.change_track(&state, now, fx);
        }
    }

    fn start_optimistic_stream(&mut self, now: Instant, fx: &mut Vec<EngineEffect>) {
        tracing::info!("尚无曲目信息，先挂上当前广播地址");
        let load = TrackLoad {
            url: self.media.stream_url(),
            source: DeckSource::Stream,
            position: 0.0,
            trim_start: 0.0,
            trim_end: 0.0,
            volume: 1.0,
            eq: EqBands::default(),
        };
        let report = self.pool.crossfade_to(load, Duration::ZERO, now);
        self.sync.adopt(Adoption::Optimistic);
        if let Err(e) = report.play_result {
            self.on_play_error(e, fx);
        }
    }

    fn stop(&mut self, now: Instant) {
        tracing::info!("用户停止播放");
        self.sync.request_stop(now);
        self.pool.stop_all(now);
    }

    fn set_master(&mut self, master: MasterGain, now: Instant, fx: &mut Vec<EngineEffect>) {
        self.pool.set_master(master, now);
        fx.push(self.settings_effect());
    }

    fn settings_effect(&self) -> EngineEffect {
        let master = self.pool.master();
        EngineEffect::SaveSettings {
            volume: master.volume,
            muted: master.muted,
            crossfade_secs: self.opts.crossfade.as_secs_f32(),
        }
    }

    fn vote(&mut self, rating: u8, fx: &mut Vec<EngineEffect>) {
        if !(1..=5).contains(&rating) {
            return;
        }
        let Some(id) = self.current().map(|s| s.track_id.clone()) else {
            fx.push(EngineEffect::Notice("当前没有可以评分的曲目".to_owned()));
            return;
        };
        self.pending_vote = Some((id.clone(), rating));
        fx.push(EngineEffect::SubmitVote { id, rating });
    }

    fn edit_eq(&mut self, fx: &mut Vec<EngineEffect>, f: impl FnOnce(EqBands) -> EqBands) {
        let Some(state) = self.current().cloned() else {
            return;
        };
        if !self.pool.active_deck().has_filter_graph() {
            fx.push(EngineEffect::Notice("当前音频输出不支持 EQ".to_owned()));
            return;
        }
        let eq = f(self.effective_eq(&state)).clamped();
        self.eq_override = Some((state.track_id.clone(), eq));
        if self.pool.active_deck().track_id() == Some(&state.track_id) {
            self.pool.active_deck_mut().set_eq(eq);
        }
    }

    fn on_deck_event(&mut self, slot: usize, ev: DeckEvent, fx: &mut Vec<EngineEffect>) {
        let is_active = slot == self.pool.active();
        match ev {
            DeckEvent::Ready => tracing::debug!(slot, "deck 就绪"),
            DeckEvent::Progress(_) => {}
            DeckEvent::Ended => {
                if is_active {
                    tracing::info!(slot, "本地播放结束，等待服务端切歌");
                    fx.push(EngineEffect::PollSoon(EARLY_POLL_AFTER_END));
                }
            }
            DeckEvent::Error(message) => {
                tracing::warn!(slot, is_active, err = %message, "deck 播放出错");
                if !is_active {
                    return;
                }
                match self.pool.active_deck().source().cloned() {
                    Some(DeckSource::Track(id)) => {
                        if self.skip_requested.as_ref() != Some(&id) {
                            self.skip_requested = Some(id.clone());
                            fx.push(EngineEffect::RequestSkip(id));
                            fx.push(EngineEffect::Notice(format!("当前曲目无法播放，已请求跳过: {message}")));
                        }
                    }
                    Some(DeckSource::Stream) => {
                        // 乐观起播失败：撤销采用，下一次轮询按正常流程加载
                        self.sync.clear_adoption();
                        fx.push(EngineEffect::PollSoon(Duration::ZERO));
                    }
                    None => {}
                }
            }
        }
    }

    fn on_tick(&mut self, now: Instant, fx: &mut Vec<EngineEffect>) {
        for (slot, ev) in self.pool.tick(now) {
            self.on_deck_event(slot, ev, fx);
        }
        let playing = self.pool.active_deck().is_playing();
        if self.sync.reconcile_label(playing, now) {
            tracing::debug!(playing, "播放按钮状态已校正");
        }
    }

    fn on_play_error(&mut self, e: AudioError, fx: &mut Vec<EngineEffect>) {
        if e.needs_interaction() {
            tracing::warn!(err = %e, "播放需要用户操作");
            fx.push(EngineEffect::PromptInteraction(e.to_string()));
        } else {
            tracing::warn!(err = %e, "开始播放失败");
            fx.push(EngineEffect::Notice(e.to_string()));
        }
    }

    fn current(&self) -> Option<&BroadcastState> {
        self.status.as_ref().and_then(|s| s.current.as_ref())
    }

    fn effective_eq(&self, state: &BroadcastState) -> EqBands {
        match &self.eq_override {
            Some((id, eq)) if *id == state.track_id => *eq,
            _ => state.eq,
        }
    }

    pub fn snapshot(&self, now: Instant) -> PlayerSnapshot {
        let status = self.status.clone().unwrap_or_default();
        let active = self.pool.active_deck();
        let broadcast = status.current;

        let (elapsed, file_position) = match &broadcast {
            Some(b)
                if active.track_id() == Some(&b.track_id)
                    && matches!(active.status(), DeckStatus::Ready | DeckStatus::Ended) =>
            {
                let pos = active.position_secs();
                ((pos - b.trim_start).max(0.0), pos)
            }
            Some(b) => {
                let mut e = b.elapsed.max(0.0);
                if b.playing
                    && let Some(at) = self.status_at
                {
                    e += now.saturating_duration_since(at).as_secs_f64();
                }
                if b.duration > 0.0 {
                    e = e.min(b.duration);
                }
                (e, e + b.trim_start.max(0.0))
            }
            None => (0.0, 0.0),
        };

        let user_vote = match (&self.pending_vote, &broadcast) {
            (Some((id, r)), Some(b)) if *id == b.track_id => Some(*r),
            _ => status.user_vote,
        };
        let eq = broadcast
            .as_ref()
            .map(|b| self.effective_eq(b))
            .unwrap_or_default();
        let master = self.pool.master();

        PlayerSnapshot {
            user_vote,
            queue: status.queue,
            queue_len: status.queue_len,
            listeners: status.listeners,
            phase: self.sync.phase(active.status() == DeckStatus::Loading),
            armed: self.sync.is_armed(),
            playing: self.sync.shows_playing(),
            elapsed,
            file_position,
            volume: master.volume,
            muted: master.muted,
            crossfade_secs: self.opts.crossfade.as_secs_f32(),
            eq,
            eq_modified: self.eq_override.is_some(),
            has_filter_graph: active.has_filter_graph(),
            active_deck: self.pool.active(),
            crossfading: !self.pool.pending_retirements().is_empty(),
            online: self.online,
            last_error: self.last_error.clone(),
            broadcast,
        }
    }
}

fn clamp_volume(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EqBand, Lyrics, QueueEntry};
    use crate::engine::sync::SyncPhase;
    use crate::engine::testing::{FakeHandle, FakeOutput};

    const FADE: Duration = Duration::from_secs(3);

    struct Harness {
        engine: SyncEngine,
        decks: [FakeHandle; 2],
        t0: Instant,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_options(EngineOptions {
                crossfade: FADE,
                optimistic_stream: true,
            })
        }

        fn with_options(opts: EngineOptions) -> Self {
            let t0 = Instant::now();
            let (a, ha) = FakeOutput::new(true);
            let (b, hb) = FakeOutput::new(true);
            let pool = DeckPool::new([Box::new(a), Box::new(b)], MasterGain::default(), t0);
            let engine = SyncEngine::new(pool, MediaUrls::new("http://radio"), opts);
            Self {
                engine,
                decks: [ha, hb],
                t0,
            }
        }

        fn at(&self, secs: f64) -> Instant {
            self.t0 + Duration::from_secs_f64(secs)
        }

        fn send(&mut self, input: EngineInput, secs: f64) -> Vec<EngineEffect> {
            let now = self.at(secs);
            self.engine.handle(input, now)
        }

        fn status(&mut self, state: Option<BroadcastState>, secs: f64) -> Vec<EngineEffect> {
            let snap = StatusSnapshot {
                current: state,
                queue: vec![QueueEntry {
                    id: TrackId::from("q1"),
                    title: "Next".to_owned(),
                    category: "Music".to_owned(),
                }],
                queue_len: 1,
                listeners: 3,
                user_vote: None,
            };
            self.send(EngineInput::Status(snap), secs)
        }

        fn command(&mut self, cmd: PlayerCommand, secs: f64) -> Vec<EngineEffect> {
            self.send(EngineInput::Command(cmd), secs)
        }

        /// 让 slot 上的当前加载就绪
        fn ready(&mut self, slot: usize, secs: f64) -> Vec<EngineEffect> {
            self.decks[slot].borrow_mut().ready = true;
            let load_id = self.engine.pool().deck(slot).load_id();
            self.send(EngineInput::Signal(OutputSignal::Ready { slot, load_id }), secs)
        }

        fn set_position(&self, slot: usize, secs: f64) {
            self.decks[slot].borrow_mut().position = Duration::from_secs_f64(secs);
        }

        fn url(&self, slot: usize) -> Option<String> {
            self.decks[slot].borrow().url.clone()
        }

        fn loads(&self) -> usize {
            self.decks[0].borrow().loads + self.decks[1].borrow().loads
        }
    }

    fn track(id: &str, elapsed: f64) -> BroadcastState {
        BroadcastState {
            track_id: TrackId::from(id),
            title: format!("Title {id}"),
            category: "Music".to_owned(),
            filename: format!("{id}.mp3"),
            duration: 240.0,
            elapsed,
            trim_start: 0.0,
            trim_end: 0.0,
            volume: 1.0,
            eq: EqBands::default(),
            lyrics: Lyrics::None,
            playing: true,
        }
    }

    #[test]
    fn test_polls_before_play_only_refresh_state() {
        let mut h = Harness::new();
        let fx = h.status(Some(track("a", 10.0)), 0.0);
        assert!(fx.is_empty());
        assert_eq!(h.loads(), 0);

        let snap = h.engine.snapshot(h.at(0.0));
        assert!(!snap.armed);
        assert_eq!(snap.listeners, 3);
        assert_eq!(snap.broadcast.map(|b| b.title), Some("Title a".to_owned()));
    }

    #[test]
    fn test_play_with_known_track_loads_file_at_server_position() {
        let mut h = Harness::new();
        h.status(Some(track("a", 10.0)), 0.0);
        h.command(PlayerCommand::Play, 0.5);

        let active = h.engine.pool().active();
        let url = h.url(active).expect("loaded");
        assert!(url.starts_with("http://radio/static/media/a.mp3?t="));
        h.ready(active, 1.0);
        assert_eq!(
            h.decks[active].borrow().seeks,
            vec![Duration::from_secs_f64(10.5)]
        );
        assert!(!h.decks[active].borrow().paused);
        assert_eq!(h.engine.sync_state().adopted_track(), Some(&TrackId::from("a")));
    }

    #[test]
    fn test_same_track_converges_without_crossfade() {
        let mut h = Harness::new();
        h.command(PlayerCommand::Play, 0.0);
        h.status(Some(track("a", 0.0)), 0.1);
        let active = h.engine.pool().active();
        h.ready(active, 0.2);
        let loads = h.loads();

        // 本地时钟落后 20 秒：一次 snap 后收敛
        for i in 1..=30 {
            let elapsed = i as f64;
            let local = if i < 10 { 0.5 } else { elapsed - 0.3 };
            h.set_position(active, local);
            h.status(Some(track("a", elapsed)), elapsed);
            let pos = h.decks[active].borrow().position.as_secs_f64();
            if i >= 10 {
                assert!((pos - elapsed).abs() <= 8.0, "i={i} pos={pos}");
            }
        }
        assert_eq!(h.loads(), loads);
        assert_eq!(h.engine.pool().active(), active);
        assert!(h.engine.pool().pending_retirements().is_empty());
    }

    #[test]
    fn test_track_change_crossfades_and_retires_old_deck() {
        let mut h = Harness::new();
        h.command(PlayerCommand::Play, 0.0);
        h.status(Some(track("a", 0.0)), 0.0);
        let first = h.engine.pool().active();
        h.ready(first, 0.1);
        h.send(EngineInput::Tick, 5.0);

        h.status(Some(track("b", 0.0)), 100.0);
        let second = h.engine.pool().active();
        assert_ne!(first, second);
        assert_eq!(h.engine.sync_state().adopted_track(), Some(&TrackId::from("b")));
        assert!(h.url(second).is_some_and(|u| u.contains("/b.mp3")));

        h.send(EngineInput::Tick, 101.5);
        let mid = h.engine.pool().deck(first).fade_value(h.at(101.5));
        assert!((mid - 0.5).abs() < 1e-3);
        let snap = h.engine.snapshot(h.at(101.5));
        assert!(snap.crossfading);

        h.send(EngineInput::Tick, 103.3);
        assert!(h.decks[first].borrow().paused);
        assert!(h.url(first).is_none());
        assert!(!h.engine.snapshot(h.at(103.3)).crossfading);
    }

    #[test]
    fn test_user_stop_blocks_all_deck_changes() {
        let mut h = Harness::new();
        h.command(PlayerCommand::Play, 0.0);
        h.status(Some(track("a", 0.0)), 0.0);
        let active = h.engine.pool().active();
        h.ready(active, 0.1);
        h.set_position(active, 30.0);

        h.command(PlayerCommand::Stop, 30.0);
        assert!(h.decks[active].borrow().paused);
        assert_eq!(h.decks[active].borrow().position, Duration::ZERO);
        let loads = h.loads();

        h.status(Some(track("a", 31.0)), 31.0);
        h.status(Some(track("b", 0.0)), 32.0);
        h.status(None, 33.0);
        h.send(EngineInput::Tick, 40.0);
        assert_eq!(h.loads(), loads);
        assert!(h.decks[active].borrow().paused);
        assert_eq!(h.engine.pool().active(), active);

        // 再次播放才恢复，并直接切到服务端当前的曲目
        h.status(Some(track("b", 5.0)), 41.0);
        h.command(PlayerCommand::Play, 41.0);
        assert_ne!(h.engine.pool().active(), active);
        assert_eq!(h.loads(), loads + 1);
    }

    #[test]
    fn test_resume_after_stop_seeks_to_server_position() {
        let mut h = Harness::new();
        h.command(PlayerCommand::Play, 0.0);
        h.status(Some(track("a", 0.0)), 0.0);
        let active = h.engine.pool().active();
        h.ready(active, 0.1);
        h.command(PlayerCommand::TogglePlay, 10.0);
        assert!(!h.engine.snapshot(h.at(10.0)).playing);

        h.status(Some(track("a", 20.0)), 20.0);
        h.command(PlayerCommand::TogglePlay, 20.0);
        assert!(!h.decks[active].borrow().paused);
        assert_eq!(h.decks[active].borrow().position, Duration::from_secs(20));
        assert_eq!(h.loads(), 1);
    }

    #[test]
    fn test_server_restart_mid_track_snaps_back() {
        let mut h = Harness::new();
        let mut a = track("a", 0.0);
        a.duration = 40.0;
        h.command(PlayerCommand::Play, 0.0);
        h.status(Some(a.clone()), 0.0);
        let active = h.engine.pool().active();
        h.ready(active, 0.1);

        h.set_position(active, 39.9);
        a.elapsed = 2.0;
        h.status(Some(a), 40.0);
        assert_eq!(h.decks[active].borrow().position, Duration::from_secs(2));
        assert_eq!(h.loads(), 1);
    }

    #[test]
    fn test_unexpected_pause_is_resumed() {
        let mut h = Harness::new();
        h.command(PlayerCommand::Play, 0.0);
        h.status(Some(track("a", 0.0)), 0.0);
        let active = h.engine.pool().active();
        h.ready(active, 0.1);
        h.decks[active].borrow_mut().paused = true;
        h.status(Some(track("a", 1.0)), 1.0);
        assert!(!h.decks[active].borrow().paused);
    }

    #[test]
    fn test_optimistic_stream_adopts_first_poll_without_crossfade() {
        let mut h = Harness::new();
        let fx = h.command(PlayerCommand::Play, 0.0);
        assert!(fx.contains(&EngineEffect::PollSoon(Duration::ZERO)));
        let active = h.engine.pool().active();
        assert!(h.url(active).is_some_and(|u| u.contains("/api/stream/current")));
        assert_eq!(h.engine.sync_state().adopted(), &Adoption::Optimistic);
        h.ready(active, 0.2);

        h.set_position(active, 0.4);
        h.status(Some(track("x", 0.5)), 0.5);
        assert_eq!(h.engine.pool().active(), active);
        assert_eq!(h.loads(), 1);
        assert_eq!(h.engine.sync_state().adopted_track(), Some(&TrackId::from("x")));
        assert_eq!(h.engine.pool().active_deck().track_id(), Some(&TrackId::from("x")));

        // 之后的换曲正常交叉淡化
        h.status(Some(track("y", 0.0)), 200.0);
        assert_ne!(h.engine.pool().active(), active);
        assert_eq!(h.loads(), 2);
    }

    #[test]
    fn test_optimistic_stream_reverted_when_server_has_no_track() {
        let mut h = Harness::new();
        h.command(PlayerCommand::Play, 0.0);
        let active = h.engine.pool().active();
        h.ready(active, 0.1);
        h.status(None, 0.5);
        assert!(h.decks[active].borrow().paused);
        assert_eq!(h.engine.sync_state().adopted(), &Adoption::None);

        // 服务端恢复后按正常流程加载文件
        h.status(Some(track("z", 3.0)), 5.0);
        let next = h.engine.pool().active();
        assert_ne!(next, active);
        assert!(h.url(next).is_some_and(|u| u.contains("/static/media/z.mp3")));
    }

    #[test]
    fn test_optimistic_stream_disabled_waits_for_poll() {
        let mut h = Harness::with_options(EngineOptions {
            crossfade: FADE,
            optimistic_stream: false,
        });
        let fx = h.command(PlayerCommand::Play, 0.0);
        assert_eq!(fx, vec![EngineEffect::PollSoon(Duration::ZERO)]);
        assert_eq!(h.loads(), 0);
        h.status(Some(track("a", 1.0)), 0.1);
        assert_eq!(h.loads(), 1);
    }

    #[test]
    fn test_decode_error_requests_skip_once() {
        let mut h = Harness::new();
        h.status(Some(track("bad", 0.0)), 0.0);
        h.command(PlayerCommand::Play, 0.0);
        let active = h.engine.pool().active();
        let load_id = h.engine.pool().deck(active).load_id();
        let fx = h.send(
            EngineInput::Signal(OutputSignal::Failed {
                slot: active,
                load_id,
                message: "unsupported format".to_owned(),
            }),
            0.5,
        );
        assert!(fx.contains(&EngineEffect::RequestSkip(TrackId::from("bad"))));

        // 服务端还没切走时不会重复请求，也不会自动恢复出错的 deck
        let fx = h.status(Some(track("bad", 1.0)), 1.0);
        assert!(fx.is_empty());
        assert_eq!(h.loads(), 1);
    }

    #[test]
    fn test_local_end_triggers_early_poll() {
        let mut h = Harness::new();
        h.command(PlayerCommand::Play, 0.0);
        h.status(Some(track("a", 0.0)), 0.0);
        let active = h.engine.pool().active();
        h.ready(active, 0.1);
        h.decks[active].borrow_mut().drained = true;
        let fx = h.send(EngineInput::Tick, 240.0);
        assert_eq!(fx, vec![EngineEffect::PollSoon(EARLY_POLL_AFTER_END)]);
    }

    #[test]
    fn test_volume_mute_and_crossfade_commands_emit_settings() {
        let mut h = Harness::new();
        h.command(PlayerCommand::SetVolume(0.4), 0.0);
        let fx = h.command(PlayerCommand::ToggleMute, 0.0);
        assert_eq!(
            fx,
            vec![EngineEffect::SaveSettings {
                volume: 0.4,
                muted: true,
                crossfade_secs: 3.0
            }]
        );
        let fx = h.command(PlayerCommand::AdjustCrossfade(100.0), 0.0);
        assert!(matches!(
            fx.as_slice(),
            [EngineEffect::SaveSettings { crossfade_secs, .. }] if *crossfade_secs == 12.0
        ));
        h.command(PlayerCommand::AdjustVolume(5.0), 0.0);
        assert_eq!(h.engine.snapshot(h.at(0.0)).volume, 1.0);
    }

    #[test]
    fn test_vote_is_optimistic_until_poll_confirms() {
        let mut h = Harness::new();
        assert!(matches!(
            h.command(PlayerCommand::Vote(4), 0.0).as_slice(),
            [EngineEffect::Notice(_)]
        ));
        h.status(Some(track("a", 0.0)), 0.0);
        let fx = h.command(PlayerCommand::Vote(4), 0.1);
        assert_eq!(
            fx,
            vec![EngineEffect::SubmitVote {
                id: TrackId::from("a"),
                rating: 4
            }]
        );
        assert_eq!(h.engine.snapshot(h.at(0.1)).user_vote, Some(4));
        assert!(h.command(PlayerCommand::Vote(9), 0.2).is_empty());

        // 轮询还没反映投票时保留本地值
        h.status(Some(track("a", 1.0)), 1.0);
        assert_eq!(h.engine.snapshot(h.at(1.0)).user_vote, Some(4));
        h.status(Some(track("b", 0.0)), 2.0);
        assert_eq!(h.engine.snapshot(h.at(2.0)).user_vote, None);
    }

    #[test]
    fn test_eq_edit_applies_to_deck_and_persists() {
        let mut h = Harness::new();
        h.command(PlayerCommand::Play, 0.0);
        h.status(Some(track("a", 0.0)), 0.0);
        h.command(
            PlayerCommand::AdjustEq {
                band: EqBand::High,
                delta_db: 3.0,
            },
            1.0,
        );
        let deck_eq = h.engine.pool().active_deck().eq().expect("graph");
        assert_eq!(deck_eq.high, 3.0);

        // 轮询带回旧的 EQ 时不覆盖本地编辑
        h.status(Some(track("a", 2.0)), 2.0);
        assert_eq!(h.engine.pool().active_deck().eq().map(|e| e.high), Some(3.0));

        let fx = h.command(PlayerCommand::SaveTrackSettings, 3.0);
        assert_eq!(
            fx,
            vec![EngineEffect::PersistTrack {
                id: TrackId::from("a"),
                volume: 1.0,
                eq: EqBands {
                    low: 0.0,
                    mid: 0.0,
                    high: 3.0
                }
            }]
        );
        assert!(h.engine.snapshot(h.at(3.0)).eq_modified);
    }

    #[test]
    fn test_play_label_reconciles_after_grace() {
        let mut h = Harness::with_options(EngineOptions {
            crossfade: FADE,
            optimistic_stream: false,
        });
        h.command(PlayerCommand::Play, 0.0);
        h.send(EngineInput::Tick, 1.0);
        assert!(h.engine.snapshot(h.at(1.0)).playing);
        h.send(EngineInput::Tick, 4.0);
        assert!(!h.engine.snapshot(h.at(4.0)).playing);
    }

    #[test]
    fn test_status_failure_is_recorded_not_fatal() {
        let mut h = Harness::new();
        h.command(PlayerCommand::Play, 0.0);
        h.status(Some(track("a", 0.0)), 0.0);
        let fx = h.send(EngineInput::StatusFailed("timeout".to_owned()), 1.0);
        assert!(fx.is_empty());
        let snap = h.engine.snapshot(h.at(1.0));
        assert!(!snap.online);
        assert_eq!(snap.last_error.as_deref(), Some("timeout"));
        assert_eq!(h.loads(), 1);
    }

    fn fail_active(h: &mut Harness, secs: f64) -> Vec<EngineEffect> {
        let slot = h.engine.pool().active();
        let load_id = h.engine.pool().deck(slot).load_id();
        h.send(
            EngineInput::Signal(OutputSignal::Failed {
                slot,
                load_id,
                message: "corrupt frame".to_owned(),
            }),
            secs,
        )
    }

    #[test]
    fn test_bad_track_is_skipped_again_when_it_comes_back() {
        let mut h = Harness::new();
        h.status(Some(track("bad", 0.0)), 0.0);
        h.command(PlayerCommand::Play, 0.0);
        let fx = fail_active(&mut h, 0.5);
        assert!(fx.contains(&EngineEffect::RequestSkip(TrackId::from("bad"))));

        h.status(Some(track("good", 0.0)), 2.0);
        let slot = h.engine.pool().active();
        h.ready(slot, 2.5);
        h.status(Some(track("good", 100.0)), 100.0);

        // 随机轮播又轮到同一个坏文件
        h.status(Some(track("bad", 0.0)), 300.0);
        assert_eq!(
            h.engine.pool().active_deck().track_id(),
            Some(&TrackId::from("bad"))
        );
        let fx = fail_active(&mut h, 300.5);
        assert!(fx.contains(&EngineEffect::RequestSkip(TrackId::from("bad"))));
    }

    #[test]
    fn test_same_track_replayed_after_local_end_is_reloaded() {
        let mut h = Harness::new();
        let mut a = track("a", 0.0);
        a.duration = 40.0;
        h.command(PlayerCommand::Play, 0.0);
        h.status(Some(a.clone()), 0.0);
        let first = h.engine.pool().active();
        h.ready(first, 0.1);

        h.set_position(first, 40.0);
        h.decks[first].borrow_mut().drained = true;
        h.send(EngineInput::Tick, 40.0);
        assert_eq!(h.engine.pool().active_deck().status(), DeckStatus::Ended);

        // 还停在结尾时不动
        a.elapsed = 39.8;
        h.status(Some(a.clone()), 40.2);
        assert_eq!(h.loads(), 1);

        a.elapsed = 1.0;
        h.status(Some(a.clone()), 41.0);
        let second = h.engine.pool().active();
        assert_ne!(second, first);
        assert_eq!(h.loads(), 2);
        assert!(h.url(second).is_some_and(|u| u.contains("/a.mp3")));
        assert_eq!(h.engine.sync_state().adopted_track(), Some(&TrackId::from("a")));

        h.ready(second, 41.2);
        a.elapsed = 2.0;
        h.status(Some(a), 42.0);
        assert_eq!(h.loads(), 2);
        assert!(!h.decks[second].borrow().paused);
    }

    #[test]
    fn test_play_rejection_prompts_for_interaction() {
        let mut h = Harness::new();
        h.status(Some(track("a", 5.0)), 0.0);
        for d in &h.decks {
            d.borrow_mut().reject_play = true;
        }
        let fx = h.command(PlayerCommand::Play, 0.0);
        assert!(fx.iter().any(|e| matches!(e, EngineEffect::PromptInteraction(_))));
        assert!(!fx.iter().any(|e| matches!(e, EngineEffect::RequestSkip(_))));

        // 用户处理后能正常出声；之后换曲时再被拒绝同样提示
        for d in &h.decks {
            d.borrow_mut().reject_play = false;
        }
        h.command(PlayerCommand::Play, 1.0);
        let slot = h.engine.pool().active();
        h.ready(slot, 1.2);
        assert!(!h.decks[slot].borrow().paused);

        for d in &h.decks {
            d.borrow_mut().reject_play = true;
        }
        let fx = h.status(Some(track("b", 0.0)), 60.0);
        assert!(fx.iter().any(|e| matches!(e, EngineEffect::PromptInteraction(_))));
    }

    #[test]
    fn test_broadcast_pause_holds_then_resumes() {
        let mut h = Harness::new();
        h.command(PlayerCommand::Play, 0.0);
        h.status(Some(track("a", 0.0)), 0.0);
        let active = h.engine.pool().active();
        h.ready(active, 0.1);
        h.set_position(active, 10.0);

        let mut paused = track("a", 10.0);
        paused.playing = false;
        h.status(Some(paused.clone()), 10.0);
        assert!(h.decks[active].borrow().paused);
        assert!(!h.engine.sync_state().user_stopped());
        h.status(Some(paused), 15.0);
        assert!(h.decks[active].borrow().paused);

        h.status(Some(track("a", 11.0)), 20.0);
        assert!(!h.decks[active].borrow().paused);
        assert_eq!(h.engine.pool().active(), active);
        assert_eq!(h.loads(), 1);
        assert_ne!(h.engine.snapshot(h.at(20.0)).phase, SyncPhase::UserStopped);
    }
}
