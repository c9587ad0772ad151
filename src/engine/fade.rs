use std::time::{Duration, Instant};

/// 单个 deck 的线性增益包络，按单调时钟计算。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainRamp {
    from: f32,
    to: f32,
    start: Instant,
    duration: Duration,
}

impl GainRamp {
    pub fn hold(value: f32, now: Instant) -> Self {
        Self::linear(value, value, now, Duration::ZERO)
    }

    pub fn linear(from: f32, to: f32, start: Instant, duration: Duration) -> Self {
        Self {
            from: from.clamp(0.0, 1.0),
            to: to.clamp(0.0, 1.0),
            start,
            duration,
        }
    }

    pub fn value_at(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return self.to;
        }
        let elapsed = now.saturating_duration_since(self.start);
        let t = (elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * t
    }

    pub fn target(&self) -> f32 {
        self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_ramp() {
        let t0 = Instant::now();
        let r = GainRamp::linear(0.0, 1.0, t0, Duration::from_secs(4));
        assert_eq!(r.value_at(t0), 0.0);
        assert!((r.value_at(t0 + Duration::from_secs(1)) - 0.25).abs() < 1e-6);
        assert_eq!(r.value_at(t0 + Duration::from_secs(9)), 1.0);
    }

    #[test]
    fn test_fade_out_and_hold() {
        let t0 = Instant::now();
        let r = GainRamp::linear(0.6, 0.0, t0, Duration::from_secs(3));
        assert!((r.value_at(t0 + Duration::from_millis(1_500)) - 0.3).abs() < 1e-6);
        assert_eq!(r.target(), 0.0);

        let h = GainRamp::hold(0.7, t0);
        assert_eq!(h.value_at(t0), 0.7);
    }

    #[test]
    fn test_zero_duration_jumps_to_target() {
        let t0 = Instant::now();
        let r = GainRamp::linear(1.0, 0.0, t0, Duration::ZERO);
        assert_eq!(r.value_at(t0), 0.0);
        // 时钟早于起点时按起点计算
        let later = GainRamp::linear(0.0, 1.0, t0 + Duration::from_secs(1), Duration::from_secs(1));
        assert_eq!(later.value_at(t0), 0.0);
    }
}
