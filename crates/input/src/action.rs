use glint_common::Viewport;

/// A high-level action produced from window events.
///
/// The app state consumes actions, never raw winit events.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Cursor moved; coordinates normalized to `[0, 1]` across the window.
    PointerMoved { x: f32, y: f32 },
    /// Window size or scale factor changed.
    Resized(Viewport),
    /// Show or hide the overlay panel.
    ToggleHud,
    /// Close the viewer.
    Quit,
    /// No-op (used for input that has no binding).
    Noop,
}

impl Action {
    /// Build a pointer action from a cursor position in physical pixels.
    pub fn pointer(viewport: &Viewport, x: f64, y: f64) -> Self {
        let (x, y) = viewport.normalized(x, y);
        Self::PointerMoved { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_is_normalized() {
        let vp = Viewport::new(400, 200, 1.0);
        assert_eq!(
            Action::pointer(&vp, 100.0, 150.0),
            Action::PointerMoved { x: 0.25, y: 0.75 }
        );
    }

    #[test]
    fn resized_carries_viewport() {
        let vp = Viewport::new(10, 20, 2.0);
        assert!(matches!(Action::Resized(vp), Action::Resized(v) if v.height == 20));
    }

    #[test]
    fn noop_and_quit() {
        assert!(matches!(Action::Noop, Action::Noop));
        assert_ne!(Action::Quit, Action::ToggleHud);
    }
}
