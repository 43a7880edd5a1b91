use crate::tween::{Ease, Tween};
use glint_common::Euler;

/// Target rotation for a normalized cursor position.
///
/// Horizontal cursor movement turns the model about Y, vertical movement
/// tilts it about X. The window centre is the rest pose and each edge is half
/// of `range` away from it.
pub fn pointer_target(nx: f32, ny: f32, range: f32) -> Euler {
    Euler::new((ny - 0.5) * range, (nx - 0.5) * range, 0.0)
}

/// Smoothly rotates the model toward the latest pointer target.
#[derive(Debug, Clone)]
pub struct RotationDriver {
    tween: Tween<Euler>,
    pub range: f32,
    pub duration: f32,
    pub ease: Ease,
}

impl Default for RotationDriver {
    fn default() -> Self {
        Self::new(std::f32::consts::PI * 0.3, 0.5)
    }
}

impl RotationDriver {
    pub fn new(range: f32, duration: f32) -> Self {
        Self {
            tween: Tween::settled(Euler::ZERO),
            range,
            duration,
            ease: Ease::Power2Out,
        }
    }

    /// Handle a pointer move at time `now`. Returns whether the target changed;
    /// input is dropped while `model_loaded` is false.
    pub fn pointer_moved(&mut self, nx: f32, ny: f32, now: f64, model_loaded: bool) -> bool {
        if !model_loaded {
            return false;
        }
        let target = pointer_target(nx, ny, self.range);
        self.tween.retarget(target, now, self.duration, self.ease);
        tracing::trace!(x = target.x, y = target.y, "rotation target");
        true
    }

    /// Rotation to apply this frame.
    pub fn rotation(&self, now: f64) -> Euler {
        self.tween.sample(now)
    }

    pub fn target(&self) -> Euler {
        self.tween.target()
    }

    pub fn is_animating(&self, now: f64) -> bool {
        !self.tween.is_finished(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const RANGE: f32 = PI * 0.3;

    #[test]
    fn centre_is_rest_pose() {
        assert_eq!(pointer_target(0.5, 0.5, RANGE), Euler::ZERO);
    }

    #[test]
    fn corners_reach_half_range() {
        let tl = pointer_target(0.0, 0.0, RANGE);
        assert!((tl.x + 0.15 * PI).abs() < 1e-6);
        assert!((tl.y + 0.15 * PI).abs() < 1e-6);
        let br = pointer_target(1.0, 1.0, RANGE);
        assert!((br.x - 0.15 * PI).abs() < 1e-6);
        assert!((br.y - 0.15 * PI).abs() < 1e-6);
        assert_eq!(br.z, 0.0);
    }

    #[test]
    fn horizontal_motion_turns_about_y() {
        let t = pointer_target(1.0, 0.5, RANGE);
        assert_eq!(t.x, 0.0);
        assert!(t.y > 0.0);
    }

    #[test]
    fn ignored_until_model_loaded() {
        let mut d = RotationDriver::default();
        assert!(!d.pointer_moved(1.0, 1.0, 0.0, false));
        assert_eq!(d.target(), Euler::ZERO);
        assert!(!d.is_animating(0.0));
    }

    #[test]
    fn settles_on_target_after_duration() {
        let mut d = RotationDriver::default();
        assert!(d.pointer_moved(1.0, 0.5, 10.0, true));
        assert!(d.is_animating(10.1));
        let mid = d.rotation(10.25);
        assert!(mid.y > 0.0 && mid.y < d.target().y);
        let end = d.rotation(10.5);
        assert_eq!(end, d.target());
        assert!(!d.is_animating(10.5));
    }

    #[test]
    fn overlapping_moves_retarget_from_current() {
        let mut d = RotationDriver::default();
        d.pointer_moved(1.0, 0.5, 0.0, true);
        let at_switch = d.rotation(0.25);
        d.pointer_moved(0.0, 0.5, 0.25, true);
        assert_eq!(d.rotation(0.25), at_switch);
        assert!((d.rotation(0.75).y + 0.15 * PI).abs() < 1e-6);
    }
}
