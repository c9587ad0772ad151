//! 单元测试用的内存输出，状态通过共享句柄暴露给断言

use super::eq::FilterGraph;
use super::output::DeckOutput;
use crate::error::AudioError;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug)]
pub struct FakeState {
    pub url: Option<String>,
    pub load_id: u64,
    pub loads: usize,
    pub ready: bool,
    pub paused: bool,
    pub position: Duration,
    pub volume: f32,
    pub drained: bool,
    pub seeks: Vec<Duration>,
    pub reject_play: bool,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            url: None,
            load_id: 0,
            loads: 0,
            ready: false,
            paused: true,
            position: Duration::ZERO,
            volume: 1.0,
            drained: false,
            seeks: Vec::new(),
            reject_play: false,
        }
    }
}

pub type FakeHandle = Rc<RefCell<FakeState>>;

pub struct FakeOutput {
    state: FakeHandle,
    graph: Option<FilterGraph>,
}

impl FakeOutput {
    pub fn new(with_graph: bool) -> (Self, FakeHandle) {
        let state = Rc::new(RefCell::new(FakeState::default()));
        (
            Self {
                state: Rc::clone(&state),
                graph: with_graph.then(FilterGraph::new),
            },
            state,
        )
    }
}

impl DeckOutput for FakeOutput {
    fn load(&mut self, url: &str, load_id: u64) {
        let mut s = self.state.borrow_mut();
        s.url = Some(url.to_owned());
        s.load_id = load_id;
        s.loads += 1;
        s.ready = false;
        s.paused = true;
        s.position = Duration::ZERO;
        s.drained = false;
    }

    fn unload(&mut self) {
        let mut s = self.state.borrow_mut();
        s.url = None;
        s.ready = false;
        s.paused = true;
        s.position = Duration::ZERO;
    }

    fn try_seek(&mut self, position: Duration) -> bool {
        let mut s = self.state.borrow_mut();
        if !s.ready {
            return false;
        }
        s.position = position;
        s.seeks.push(position);
        true
    }

    fn play(&mut self) -> Result<(), AudioError> {
        let mut s = self.state.borrow_mut();
        if s.url.is_none() {
            return Err(AudioError::NoSource(0));
        }
        if s.reject_play {
            return Err(AudioError::PlaybackRejected("fake".to_owned()));
        }
        s.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.state.borrow_mut().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    fn position(&self) -> Duration {
        self.state.borrow().position
    }

    fn is_drained(&self) -> bool {
        let s = self.state.borrow();
        s.ready && s.drained
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.borrow_mut().volume = volume;
    }

    fn filter_graph(&self) -> Option<&FilterGraph> {
        self.graph.as_ref()
    }
}
