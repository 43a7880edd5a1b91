use glint_common::Euler;

/// Easing curve mapping linear progress `t` in `[0, 1]` to eased progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ease {
    Linear,
    /// Quadratic ease-out: fast start, gentle arrival.
    #[default]
    Power2Out,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Power2Out => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

/// Values a tween can interpolate.
pub trait Lerp: Copy {
    fn lerp(self, to: Self, t: f32) -> Self;
}

impl Lerp for f32 {
    fn lerp(self, to: Self, t: f32) -> Self {
        self + (to - self) * t
    }
}

impl Lerp for Euler {
    fn lerp(self, to: Self, t: f32) -> Self {
        Euler::new(self.x.lerp(to.x, t), self.y.lerp(to.y, t), self.z.lerp(to.z, t))
    }
}

/// Time-based interpolation from one value to another.
///
/// Times are seconds on any monotonic clock chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween<T> {
    from: T,
    to: T,
    start: f64,
    duration: f32,
    ease: Ease,
}

impl<T: Lerp> Tween<T> {
    /// A tween that has already arrived at `value`.
    pub fn settled(value: T) -> Self {
        Self {
            from: value,
            to: value,
            start: 0.0,
            duration: 0.0,
            ease: Ease::default(),
        }
    }

    pub fn new(from: T, to: T, start: f64, duration: f32, ease: Ease) -> Self {
        Self {
            from,
            to,
            start,
            duration: duration.max(0.0),
            ease,
        }
    }

    /// Re-target: continue from wherever the tween is at `now`.
    pub fn retarget(&mut self, to: T, now: f64, duration: f32, ease: Ease) {
        let current = self.sample(now);
        *self = Self::new(current, to, now, duration, ease);
    }

    pub fn progress(&self, now: f64) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (((now - self.start) / self.duration as f64) as f32).clamp(0.0, 1.0)
    }

    pub fn sample(&self, now: f64) -> T {
        let t = self.ease.apply(self.progress(now));
        self.from.lerp(self.to, t)
    }

    pub fn is_finished(&self, now: f64) -> bool {
        self.progress(now) >= 1.0
    }

    pub fn target(&self) -> T {
        self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power2_out_endpoints_and_shape() {
        let e = Ease::Power2Out;
        assert_eq!(e.apply(0.0), 0.0);
        assert_eq!(e.apply(1.0), 1.0);
        assert_eq!(e.apply(0.5), 0.75);
        let mut prev = 0.0;
        for i in 1..=20 {
            let t = i as f32 / 20.0;
            let v = e.apply(t);
            assert!(v >= prev);
            assert!(v >= Ease::Linear.apply(t));
            prev = v;
        }
    }

    #[test]
    fn ease_clamps_input() {
        assert_eq!(Ease::Power2Out.apply(-1.0), 0.0);
        assert_eq!(Ease::Power2Out.apply(3.0), 1.0);
    }

    #[test]
    fn tween_runs_from_start_to_end() {
        let tw = Tween::new(0.0f32, 10.0, 1.0, 0.5, Ease::Linear);
        assert_eq!(tw.sample(0.0), 0.0);
        assert_eq!(tw.sample(1.0), 0.0);
        assert_eq!(tw.sample(1.25), 5.0);
        assert_eq!(tw.sample(1.5), 10.0);
        assert_eq!(tw.sample(9.0), 10.0);
        assert!(!tw.is_finished(1.4));
        assert!(tw.is_finished(1.5));
    }

    #[test]
    fn retarget_continues_from_current_value() {
        let mut tw = Tween::new(0.0f32, 10.0, 0.0, 1.0, Ease::Linear);
        tw.retarget(-10.0, 0.5, 1.0, Ease::Linear);
        assert_eq!(tw.sample(0.5), 5.0);
        assert_eq!(tw.sample(1.0), -2.5);
        assert_eq!(tw.sample(1.5), -10.0);
        assert_eq!(tw.target(), -10.0);
    }

    #[test]
    fn zero_duration_jumps() {
        let tw = Tween::new(1.0f32, 2.0, 0.0, 0.0, Ease::Power2Out);
        assert_eq!(tw.sample(0.0), 2.0);
        assert!(tw.is_finished(0.0));
    }

    #[test]
    fn euler_lerp_is_componentwise() {
        let a = Euler::new(0.0, 1.0, 2.0);
        let b = Euler::new(2.0, 3.0, 2.0);
        assert_eq!(a.lerp(b, 0.5), Euler::new(1.0, 2.0, 2.0));
    }
}
