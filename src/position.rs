//! Interactive repositioning controller
//!
//! Translates pointer events into a cutout offset consumed by the compositor.
//! "Currently dragging" is explicit capture state on the controller itself,
//! not an ambient flag, so the drag contract is testable without a pointer
//! device.

use instant::Instant;
use std::time::Duration;

/// 2D translation of the cutout, in pixels, relative to its natural
/// centered position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Offset {
    /// Horizontal translation (positive = right)
    pub x: i32,
    /// Vertical translation (positive = down)
    pub y: i32,
}

impl Offset {
    /// Create an offset
    #[must_use]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Pointer position in canvas pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerPosition {
    /// Horizontal coordinate
    pub x: i32,
    /// Vertical coordinate
    pub y: i32,
}

impl PointerPosition {
    /// Create a pointer position
    #[must_use]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Limits re-render frequency during a drag to animation-frame cadence
///
/// Offsets are always tracked exactly; the throttle only gates when a
/// rasterization pass is worth issuing.
#[derive(Debug)]
pub struct RenderThrottle {
    min_interval: Duration,
    last_render: Option<Instant>,
}

impl RenderThrottle {
    /// Animation-frame cadence (~60 fps)
    #[must_use]
    pub fn frame_cadence() -> Self {
        Self {
            min_interval: Duration::from_millis(16),
            last_render: None,
        }
    }

    /// No throttling; every move triggers a render (deterministic tests)
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            min_interval: Duration::ZERO,
            last_render: None,
        }
    }

    /// Whether enough time has passed for another render; records the render
    /// when it answers yes
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last_render {
            Some(last) if now.duration_since(last) < self.min_interval => false,
            _ => {
                self.last_render = Some(now);
                true
            },
        }
    }

    /// Forget the last render time (drag ended)
    pub fn clear(&mut self) {
        self.last_render = None;
    }
}

impl Default for RenderThrottle {
    fn default() -> Self {
        Self::frame_cadence()
    }
}

/// Captured state for one drag gesture
#[derive(Debug, Clone, Copy)]
struct DragCapture {
    start_position: PointerPosition,
    start_offset: Offset,
}

/// Outcome of a pointer-move event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragUpdate {
    /// The offset after applying the pointer delta
    pub offset: Offset,
    /// Whether a re-render is due now (throttled to frame cadence)
    pub render_due: bool,
}

/// Drag-to-reposition controller
///
/// The offset is intentionally unclamped: the subject may be moved fully or
/// partially off-frame, matching creative-tool expectations.
#[derive(Debug)]
pub struct PositionController {
    offset: Offset,
    capture: Option<DragCapture>,
    throttle: RenderThrottle,
}

impl Default for PositionController {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionController {
    /// Create a controller at the centered position with frame-cadence
    /// render throttling
    #[must_use]
    pub fn new() -> Self {
        Self::with_throttle(RenderThrottle::frame_cadence())
    }

    /// Create a controller with a custom throttle
    #[must_use]
    pub fn with_throttle(throttle: RenderThrottle) -> Self {
        Self {
            offset: Offset::default(),
            capture: None,
            throttle,
        }
    }

    /// Current committed offset
    #[must_use]
    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Replace the offset outside of a drag (e.g. restored state)
    pub fn set_offset(&mut self, offset: Offset) {
        self.offset = offset;
    }

    /// Whether a drag gesture currently holds capture
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.capture.is_some()
    }

    /// Capture the pointer: record its starting position and the current
    /// offset
    pub fn pointer_down(&mut self, position: PointerPosition) {
        self.capture = Some(DragCapture {
            start_position: position,
            start_offset: self.offset,
        });
    }

    /// Move the pointer while captured
    ///
    /// Computes `offset = start_offset + (position - start_position)` and
    /// reports whether a re-render is due under the throttle. Returns `None`
    /// when no capture is held (moves without a preceding down are ignored).
    pub fn pointer_move(&mut self, position: PointerPosition) -> Option<DragUpdate> {
        let capture = self.capture?;
        self.offset = Offset {
            x: capture.start_offset.x + (position.x - capture.start_position.x),
            y: capture.start_offset.y + (position.y - capture.start_position.y),
        };
        Some(DragUpdate {
            offset: self.offset,
            render_due: self.throttle.ready(),
        })
    }

    /// Release capture; returns the final offset when a drag was active
    ///
    /// The caller should issue an unthrottled final render so the preview
    /// matches the committed offset exactly.
    pub fn pointer_up(&mut self) -> Option<Offset> {
        let was_dragging = self.capture.take().is_some();
        self.throttle.clear();
        was_dragging.then_some(self.offset)
    }

    /// Reset to the centered position and drop any capture
    pub fn reset(&mut self) {
        self.offset = Offset::default();
        self.capture = None;
        self.throttle.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> PositionController {
        PositionController::with_throttle(RenderThrottle::unlimited())
    }

    #[test]
    fn test_drag_round_trip() {
        let mut controller = controller();
        controller.pointer_down(PointerPosition::new(100, 100));
        let update = controller.pointer_move(PointerPosition::new(130, 80)).unwrap();
        assert_eq!(update.offset, Offset::new(30, -20));

        let final_offset = controller.pointer_up().unwrap();
        assert_eq!(final_offset, Offset::new(30, -20));
        assert!(!controller.is_dragging());
    }

    #[test]
    fn test_drag_accumulates_across_gestures() {
        let mut controller = controller();
        controller.pointer_down(PointerPosition::new(0, 0));
        controller.pointer_move(PointerPosition::new(10, 5));
        controller.pointer_up();

        // Second gesture starts from the committed offset
        controller.pointer_down(PointerPosition::new(50, 50));
        controller.pointer_move(PointerPosition::new(55, 45));
        assert_eq!(controller.pointer_up().unwrap(), Offset::new(15, 0));
    }

    #[test]
    fn test_move_without_capture_is_ignored() {
        let mut controller = controller();
        assert!(controller.pointer_move(PointerPosition::new(10, 10)).is_none());
        assert_eq!(controller.offset(), Offset::default());
    }

    #[test]
    fn test_up_without_capture_reports_nothing() {
        let mut controller = controller();
        assert!(controller.pointer_up().is_none());
    }

    #[test]
    fn test_offset_is_not_clamped() {
        let mut controller = controller();
        controller.pointer_down(PointerPosition::new(0, 0));
        let update = controller
            .pointer_move(PointerPosition::new(-5000, 9000))
            .unwrap();
        assert_eq!(update.offset, Offset::new(-5000, 9000));
    }

    #[test]
    fn test_intermediate_moves_update_offset_exactly() {
        let mut controller = controller();
        controller.pointer_down(PointerPosition::new(10, 10));
        controller.pointer_move(PointerPosition::new(20, 20));
        controller.pointer_move(PointerPosition::new(5, 30));
        // Offset tracks the latest pointer position, not the sum of moves
        assert_eq!(controller.offset(), Offset::new(-5, 20));
    }

    #[test]
    fn test_unlimited_throttle_renders_every_move() {
        let mut controller = controller();
        controller.pointer_down(PointerPosition::new(0, 0));
        for i in 1..=5 {
            let update = controller.pointer_move(PointerPosition::new(i, i)).unwrap();
            assert!(update.render_due);
        }
    }

    #[test]
    fn test_frame_cadence_throttle_suppresses_burst() {
        let mut throttle = RenderThrottle::frame_cadence();
        assert!(throttle.ready());
        // An immediate second render within the same frame window is gated
        assert!(!throttle.ready());

        throttle.clear();
        assert!(throttle.ready());
    }

    #[test]
    fn test_reset_clears_capture_and_offset() {
        let mut controller = controller();
        controller.pointer_down(PointerPosition::new(0, 0));
        controller.pointer_move(PointerPosition::new(7, 7));
        controller.reset();
        assert_eq!(controller.offset(), Offset::default());
        assert!(!controller.is_dragging());
    }
}
