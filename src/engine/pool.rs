//! 两个 deck 的轮换与交叉淡化

use super::deck::{Deck, DeckEvent, DeckSource, MasterGain};
use super::fade::GainRamp;
use super::output::{DeckOutput, OutputSignal};
use crate::domain::{EqBands, TrackId};
use crate::error::AudioError;
use std::time::{Duration, Instant};

/// 淡出结束后多等一会再释放旧 deck
pub const RETIRE_MARGIN: Duration = Duration::from_millis(250);

/// 要装进下一个 deck 的内容
#[derive(Debug, Clone, PartialEq)]
pub struct TrackLoad {
    pub url: String,
    pub source: DeckSource,
    /// 文件内的目标位置（秒）
    pub position: f64,
    pub trim_start: f64,
    pub trim_end: f64,
    pub volume: f32,
    pub eq: EqBands,
}

/// 延迟释放：只对调度时那个 slot 上、那一代加载生效
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retirement {
    pub slot: usize,
    pub load_id: u64,
    pub due: Instant,
}

#[derive(Debug)]
pub struct CrossfadeReport {
    pub incoming: usize,
    pub outgoing: usize,
    /// 旧 deck 当时在出声，已安排淡出
    pub faded_out: bool,
    pub play_result: Result<(), AudioError>,
}

pub struct DeckPool {
    decks: [Deck; 2],
    active: usize,
    next_load_id: u64,
    retirements: Vec<Retirement>,
    master: MasterGain,
}

impl DeckPool {
    pub fn new(outputs: [Box<dyn DeckOutput>; 2], master: MasterGain, now: Instant) -> Self {
        let [a, b] = outputs;
        Self {
            decks: [Deck::new(0, a, now), Deck::new(1, b, now)],
            active: 0,
            next_load_id: 1,
            retirements: Vec::new(),
            master,
        }
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn active_deck(&self) -> &Deck {
        &self.decks[self.active]
    }

    pub fn active_deck_mut(&mut self) -> &mut Deck {
        &mut self.decks[self.active]
    }

    pub fn deck(&self, slot: usize) -> &Deck {
        &self.decks[slot]
    }

    pub fn master(&self) -> MasterGain {
        self.master
    }

    pub fn set_master(&mut self, master: MasterGain, now: Instant) {
        self.master = master;
        self.apply_gains(now);
    }

    pub fn pending_retirements(&self) -> &[Retirement] {
        &self.retirements
    }

    fn bump_load_id(&mut self) -> u64 {
        let id = self.next_load_id;
        self.next_load_id += 1;
        id
    }

    /// 换曲：新曲装进空闲 deck 并淡入，当前 deck 若在出声则同时淡出，
    /// active 指针立即切到新 deck。
    pub fn crossfade_to(&mut self, load: TrackLoad, duration: Duration, now: Instant) -> CrossfadeReport {
        let outgoing = self.active;
        let incoming = 1 - outgoing;
        let load_id = self.bump_load_id();
        let master = self.master;

        // 空闲 deck 可能还在淡出上一首；换代后它的旧 retirement 自动失效
        let deck = &mut self.decks[incoming];
        deck.pause();
        deck.load(&load.url, load.source, load_id);
        deck.set_track_props(load.trim_start, load.trim_end, load.volume, load.eq);
        deck.seek_to(load.position);
        let fade_in = if duration.is_zero() {
            GainRamp::hold(1.0, now)
        } else {
            GainRamp::linear(0.0, 1.0, now, duration)
        };
        deck.set_fade(fade_in);
        deck.apply_gain(now, master);
        let play_result = deck.play();

        let out = &mut self.decks[outgoing];
        let faded_out = out.is_playing();
        if faded_out {
            let from = out.fade_value(now);
            out.set_fade(GainRamp::linear(from, 0.0, now, duration));
            self.retirements.push(Retirement {
                slot: outgoing,
                load_id: out.load_id(),
                due: now + duration + RETIRE_MARGIN,
            });
        } else {
            out.pause();
            out.set_fade(GainRamp::hold(0.0, now));
        }
        out.apply_gain(now, master);

        self.active = incoming;
        tracing::info!(incoming, outgoing, load_id, faded_out, fade_ms = duration.as_millis() as u64, "交叉淡化");

        CrossfadeReport {
            incoming,
            outgoing,
            faded_out,
            play_result,
        }
    }

    /// 执行一次延迟释放。slot 已换代、已是 active、或早就空了时什么都不做
    pub fn retire(&mut self, retirement: Retirement) -> bool {
        let deck = &mut self.decks[retirement.slot];
        if retirement.slot == self.active
            || deck.load_id() != retirement.load_id
            || deck.status() == super::deck::DeckStatus::Empty
        {
            tracing::debug!(slot = retirement.slot, load_id = retirement.load_id, "retirement 已过期，忽略");
            return false;
        }
        deck.unload();
        tracing::debug!(slot = retirement.slot, load_id = retirement.load_id, "旧 deck 已释放");
        true
    }

    pub fn fire_due(&mut self, now: Instant) -> usize {
        let (due, pending): (Vec<_>, Vec<_>) = self.retirements.drain(..).partition(|r| r.due <= now);
        self.retirements = pending;
        due.into_iter().filter(|r| self.retire(*r)).count()
    }

    pub fn apply_gains(&mut self, now: Instant) {
        let master = self.master;
        for deck in &mut self.decks {
            deck.apply_gain(now, master);
        }
    }

    /// 推进包络、执行到期的 retirement，并收集各 deck 的事件
    pub fn tick(&mut self, now: Instant) -> Vec<(usize, DeckEvent)> {
        self.fire_due(now);
        self.apply_gains(now);
        self.decks
            .iter_mut()
            .filter_map(|d| d.poll_progress().map(|ev| (d.slot(), ev)))
            .collect()
    }

    pub fn handle_signal(&mut self, signal: &OutputSignal) -> Option<(usize, DeckEvent)> {
        let slot = signal.slot();
        let deck = self.decks.get_mut(slot)?;
        deck.handle_signal(signal).map(|ev| (slot, ev))
    }

    /// 用户停止：两个 deck 都暂停并回到 0，音源保留以便恢复
    pub fn stop_all(&mut self, now: Instant) {
        let active = self.active;
        for deck in &mut self.decks {
            deck.pause();
            deck.seek_to(0.0);
            let hold = if deck.slot() == active { 1.0 } else { 0.0 };
            deck.set_fade(GainRamp::hold(hold, now));
        }
        self.apply_gains(now);
    }

    /// 乐观起播确认：active deck 继续放，只换成确认后的曲目标识
    pub fn adopt_active(&mut self, id: TrackId) {
        self.active_deck_mut().relabel(DeckSource::Track(id));
    }

    pub fn pause_active(&mut self) {
        self.active_deck_mut().pause();
    }

    /// 在 active deck 上就地恢复播放（包络直接拉满）
    pub fn resume_active(&mut self, now: Instant) -> Result<(), AudioError> {
        let master = self.master;
        let deck = self.active_deck_mut();
        if deck.fade().target() < 1.0 {
            deck.set_fade(GainRamp::hold(1.0, now));
        }
        deck.apply_gain(now, master);
        deck.play()
    }
}
