//! 前级增益 + 三段 EQ（low shelf / mid peak / high shelf）。
//!
//! `FilterGraph` 是引擎侧的句柄，`EqSource` 是挂在 rodio 音源链上的处理节点，
//! 两者通过原子变量共享目标值；音频线程内部按约 200ms 的时间常数平滑逼近，
//! 所以改 EQ 或做淡入淡出时不会有爆音。

use crate::domain::EqBands;
use rodio::Source;
use rodio::source::SeekError;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

const LOW_SHELF_HZ: f32 = 100.0;
const MID_PEAK_HZ: f32 = 1_000.0;
const MID_PEAK_Q: f32 = 0.7;
const HIGH_SHELF_HZ: f32 = 10_000.0;
/// 平滑时间常数（秒）
pub const SMOOTHING_SECS: f32 = 0.2;
/// 每隔多少帧重新计算一次滤波系数
const COEFF_REFRESH_FRAMES: u32 = 32;

#[derive(Debug)]
struct GraphParams {
    pre_gain: AtomicU32,
    low_db: AtomicU32,
    mid_db: AtomicU32,
    high_db: AtomicU32,
}

fn store(a: &AtomicU32, v: f32) {
    a.store(v.to_bits(), Ordering::Relaxed);
}

fn load(a: &AtomicU32) -> f32 {
    f32::from_bits(a.load(Ordering::Relaxed))
}

#[derive(Debug, Clone)]
pub struct FilterGraph {
    params: Arc<GraphParams>,
}

impl Default for FilterGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterGraph {
    pub fn new() -> Self {
        Self {
            params: Arc::new(GraphParams {
                pre_gain: AtomicU32::new(1.0f32.to_bits()),
                low_db: AtomicU32::new(0.0f32.to_bits()),
                mid_db: AtomicU32::new(0.0f32.to_bits()),
                high_db: AtomicU32::new(0.0f32.to_bits()),
            }),
        }
    }

    pub fn set_pre_gain(&self, gain: f32) {
        let gain = if gain.is_finite() { gain.clamp(0.0, 1.0) } else { 0.0 };
        store(&self.params.pre_gain, gain);
    }

    pub fn pre_gain(&self) -> f32 {
        load(&self.params.pre_gain)
    }

    pub fn set_eq(&self, eq: EqBands) {
        let eq = eq.clamped();
        store(&self.params.low_db, eq.low);
        store(&self.params.mid_db, eq.mid);
        store(&self.params.high_db, eq.high);
    }

    pub fn eq(&self) -> EqBands {
        EqBands {
            low: load(&self.params.low_db),
            mid: load(&self.params.mid_db),
            high: load(&self.params.high_db),
        }
    }

    /// 把音源接入本 graph。平滑状态从当前目标值起步，避免一开始就从 0 爬升
    pub fn wrap<S: Source>(&self, inner: S) -> EqSource<S> {
        let eq = self.eq();
        let pre_gain = self.pre_gain();
        let mut src = EqSource {
            inner,
            params: Arc::clone(&self.params),
            channels: 0,
            sample_rate: 0,
            channel_pos: 0,
            frames_since_refresh: 0,
            smoothing: 0.0,
            gain_now: pre_gain,
            eq_now: eq,
            coeffs: [BiquadCoeffs::passthrough(); 3],
            state: Vec::new(),
        };
        src.sync_format();
        src.refresh_coeffs();
        src
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BiquadCoeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl BiquadCoeffs {
    fn passthrough() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    fn normalized(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    fn low_shelf(freq: f32, gain_db: f32, sample_rate: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * std::f32::consts::PI * clamp_freq(freq, sample_rate) / sample_rate;
        let (sin, cos) = w0.sin_cos();
        // shelf slope S = 1
        let alpha = sin / 2.0 * std::f32::consts::SQRT_2;
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        Self::normalized(
            a * ((a + 1.0) - (a - 1.0) * cos + two_sqrt_a_alpha),
            2.0 * a * ((a - 1.0) - (a + 1.0) * cos),
            a * ((a + 1.0) - (a - 1.0) * cos - two_sqrt_a_alpha),
            (a + 1.0) + (a - 1.0) * cos + two_sqrt_a_alpha,
            -2.0 * ((a - 1.0) + (a + 1.0) * cos),
            (a + 1.0) + (a - 1.0) * cos - two_sqrt_a_alpha,
        )
    }

    fn peaking(freq: f32, gain_db: f32, q: f32, sample_rate: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * std::f32::consts::PI * clamp_freq(freq, sample_rate) / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);

        Self::normalized(
            1.0 + alpha * a,
            -2.0 * cos,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos,
            1.0 - alpha / a,
        )
    }

    fn high_shelf(freq: f32, gain_db: f32, sample_rate: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * std::f32::consts::PI * clamp_freq(freq, sample_rate) / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / 2.0 * std::f32::consts::SQRT_2;
        let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

        Self::normalized(
            a * ((a + 1.0) + (a - 1.0) * cos + two_sqrt_a_alpha),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cos),
            a * ((a + 1.0) + (a - 1.0) * cos - two_sqrt_a_alpha),
            (a + 1.0) - (a - 1.0) * cos + two_sqrt_a_alpha,
            2.0 * ((a - 1.0) - (a + 1.0) * cos),
            (a + 1.0) - (a - 1.0) * cos - two_sqrt_a_alpha,
        )
    }
}

/// 低采样率时 10kHz 可能超过奈奎斯特频率
fn clamp_freq(freq: f32, sample_rate: f32) -> f32 {
    freq.min(sample_rate * 0.45)
}

#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadState {
    fn process(&mut self, x: f32, c: &BiquadCoeffs) -> f32 {
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

pub struct EqSource<S> {
    inner: S,
    params: Arc<GraphParams>,
    channels: u16,
    sample_rate: u32,
    channel_pos: u16,
    frames_since_refresh: u32,
    /// 每帧的一阶平滑系数
    smoothing: f32,
    gain_now: f32,
    eq_now: EqBands,
    coeffs: [BiquadCoeffs; 3],
    /// 每个声道三段滤波器的状态
    state: Vec<[BiquadState; 3]>,
}

impl<S: Source> EqSource<S> {
    fn sync_format(&mut self) {
        let channels = self.inner.channels().max(1);
        let sample_rate = self.inner.sample_rate().max(1);
        if channels == self.channels && sample_rate == self.sample_rate {
            return;
        }
        self.channels = channels;
        self.sample_rate = sample_rate;
        self.channel_pos = 0;
        self.state = vec![[BiquadState::default(); 3]; channels as usize];
        self.smoothing = 1.0 - (-1.0 / (SMOOTHING_SECS * sample_rate as f32)).exp();
        self.refresh_coeffs();
    }

    fn refresh_coeffs(&mut self) {
        let sr = self.sample_rate.max(1) as f32;
        self.coeffs = [
            BiquadCoeffs::low_shelf(LOW_SHELF_HZ, self.eq_now.low, sr),
            BiquadCoeffs::peaking(MID_PEAK_HZ, self.eq_now.mid, MID_PEAK_Q, sr),
            BiquadCoeffs::high_shelf(HIGH_SHELF_HZ, self.eq_now.high, sr),
        ];
    }

    /// 每帧开头调用一次：目标值平滑 + 按需刷新系数
    fn step_frame(&mut self) {
        self.sync_format();
        let k = self.smoothing;
        let target_gain = load(&self.params.pre_gain);
        self.gain_now += (target_gain - self.gain_now) * k;

        let target = EqBands {
            low: load(&self.params.low_db),
            mid: load(&self.params.mid_db),
            high: load(&self.params.high_db),
        };
        if target != self.eq_now {
            self.eq_now.low += (target.low - self.eq_now.low) * k;
            self.eq_now.mid += (target.mid - self.eq_now.mid) * k;
            self.eq_now.high += (target.high - self.eq_now.high) * k;
            if (target.low - self.eq_now.low).abs() < 0.01
                && (target.mid - self.eq_now.mid).abs() < 0.01
                && (target.high - self.eq_now.high).abs() < 0.01
            {
                self.eq_now = target;
                self.frames_since_refresh = COEFF_REFRESH_FRAMES;
            }
            self.frames_since_refresh += 1;
            if self.frames_since_refresh >= COEFF_REFRESH_FRAMES {
                self.frames_since_refresh = 0;
                self.refresh_coeffs();
            }
        }
    }
}

impl<S: Source> Iterator for EqSource<S> {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.inner.next()?;
        if self.channel_pos == 0 {
            self.step_frame();
        }

        let ch = (self.channel_pos as usize).min(self.state.len().saturating_sub(1));
        let mut out = sample;
        if !self.eq_now.is_flat()
            && let Some(filters) = self.state.get_mut(ch)
        {
            for (band, coeffs) in filters.iter_mut().zip(self.coeffs.iter()) {
                out = band.process(out, coeffs);
            }
        }

        self.channel_pos += 1;
        if self.channel_pos >= self.channels {
            self.channel_pos = 0;
        }
        Some(out * self.gain_now)
    }
}

impl<S: Source> Source for EqSource<S> {
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError> {
        self.inner.try_seek(pos)?;
        for filters in &mut self.state {
            *filters = [BiquadState::default(); 3];
        }
        self.channel_pos = 0;
        Ok(())
    }
}
