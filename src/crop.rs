//! Crop rectangle editing.
//!
//! The editor works purely in displayed-pixel coordinates local to the
//! preview rectangle, so the geometry can be exercised without a display
//! surface. Mapping back to the decoded image's natural resolution happens
//! in [`CropEditor::to_source_rect`].

/// Minimum crop extent on either axis, in displayed pixels.
pub const MIN_CROP_SIZE: f32 = 50.0;

/// Tolerance used to treat a rectangle as covering the whole preview.
const FULL_FRAME_EPSILON: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Handle {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
}

impl Handle {
    pub const ALL: [Handle; 4] = [
        Handle::NorthWest,
        Handle::NorthEast,
        Handle::SouthWest,
        Handle::SouthEast,
    ];
}

/// Crop rectangle in displayed-pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl CropRect {
    pub fn full(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Position of the given corner handle.
    pub fn corner(&self, handle: Handle) -> (f32, f32) {
        match handle {
            Handle::NorthWest => (self.x, self.y),
            Handle::NorthEast => (self.right(), self.y),
            Handle::SouthWest => (self.x, self.bottom()),
            Handle::SouthEast => (self.right(), self.bottom()),
        }
    }
}

/// Crop region mapped into the natural pixel grid of the decoded image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug)]
struct Drag {
    handle: Handle,
    start: (f32, f32),
    origin: CropRect,
}

/// Four-corner crop editor over a displayed preview.
///
/// The rectangle always stays inside the displayed bounds, and satisfies
/// `width >= MIN_CROP_SIZE` and `height >= MIN_CROP_SIZE` whenever the
/// bounds themselves are at least that large.
#[derive(Clone, Debug)]
pub struct CropEditor {
    rect: CropRect,
    bounds: (f32, f32),
    drag: Option<Drag>,
}

impl CropEditor {
    /// Creates an editor whose rectangle covers the whole displayed image.
    pub fn new(display_width: f32, display_height: f32) -> Self {
        Self {
            rect: CropRect::full(display_width, display_height),
            bounds: (display_width, display_height),
            drag: None,
        }
    }

    pub fn rect(&self) -> CropRect {
        self.rect
    }

    pub fn bounds(&self) -> (f32, f32) {
        self.bounds
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Whether the rectangle still covers the whole preview.
    pub fn is_full_frame(&self) -> bool {
        self.rect.x.abs() < FULL_FRAME_EPSILON
            && self.rect.y.abs() < FULL_FRAME_EPSILON
            && (self.rect.width - self.bounds.0).abs() < FULL_FRAME_EPSILON
            && (self.rect.height - self.bounds.1).abs() < FULL_FRAME_EPSILON
    }

    /// Resets the rectangle to the full displayed bounds.
    pub fn reset(&mut self) {
        self.rect = CropRect::full(self.bounds.0, self.bounds.1);
        self.drag = None;
    }

    /// Resyncs the editor after a layout reflow changed the displayed size.
    ///
    /// The rectangle is rescaled proportionally into the new bounds. An
    /// active drag is cancelled since its snapshot is stale.
    pub fn set_bounds(&mut self, display_width: f32, display_height: f32) {
        if (display_width, display_height) == self.bounds {
            return;
        }
        self.drag = None;
        if self.bounds.0 <= 0.0 || self.bounds.1 <= 0.0 {
            self.bounds = (display_width, display_height);
            self.reset();
            return;
        }

        let sx = display_width / self.bounds.0;
        let sy = display_height / self.bounds.1;
        let mut rect = CropRect {
            x: self.rect.x * sx,
            y: self.rect.y * sy,
            width: self.rect.width * sx,
            height: self.rect.height * sy,
        };
        rect.width = rect.width.max(MIN_CROP_SIZE).min(display_width);
        rect.height = rect.height.max(MIN_CROP_SIZE).min(display_height);
        rect.x = rect.x.min(display_width - rect.width).max(0.0);
        rect.y = rect.y.min(display_height - rect.height).max(0.0);

        self.rect = rect;
        self.bounds = (display_width, display_height);
    }

    /// Starts a resize gesture, snapshotting the rectangle and the pointer.
    pub fn begin_drag(&mut self, handle: Handle, x: f32, y: f32) {
        self.drag = Some(Drag {
            handle,
            start: (x, y),
            origin: self.rect,
        });
    }

    /// Updates the gesture with the current pointer position.
    ///
    /// The candidate rectangle adjusts only the two edges adjacent to the
    /// dragged handle, each clamped to the displayed bounds and the minimum
    /// size. A candidate that still ends up below the minimum on either axis
    /// is discarded for this frame.
    pub fn drag_to(&mut self, x: f32, y: f32) {
        let Some(drag) = self.drag else {
            return;
        };
        let dx = x - drag.start.0;
        let dy = y - drag.start.1;
        let candidate = resize(drag.origin, drag.handle, dx, dy, self.bounds);
        if candidate.width >= MIN_CROP_SIZE && candidate.height >= MIN_CROP_SIZE {
            self.rect = candidate;
        }
    }

    /// Ends the gesture. Nothing further is committed.
    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Maps the displayed rectangle into the natural pixel grid.
    ///
    /// The preview may be scaled by layout, so the scale factors are derived
    /// from the decoded image's true dimensions versus the displayed size.
    pub fn to_source_rect(&self, natural_width: u32, natural_height: u32) -> SourceRect {
        let scale_x = natural_width as f32 / self.bounds.0;
        let scale_y = natural_height as f32 / self.bounds.1;

        let x = (self.rect.x * scale_x).round().max(0.0) as u32;
        let y = (self.rect.y * scale_y).round().max(0.0) as u32;
        let width = (self.rect.width * scale_x).round().max(1.0) as u32;
        let height = (self.rect.height * scale_y).round().max(1.0) as u32;

        // Ensure bounds
        let x = x.min(natural_width.saturating_sub(1));
        let y = y.min(natural_height.saturating_sub(1));
        let width = width.min(natural_width - x).max(1);
        let height = height.min(natural_height - y).max(1);

        SourceRect {
            x,
            y,
            width,
            height,
        }
    }
}

/// Corner hit test with a circular tolerance, in the same local coordinates
/// as the editor. Corners win in reading order.
pub fn hit_test_corner(x: f32, y: f32, rect: &CropRect, tolerance: f32) -> Option<Handle> {
    for handle in Handle::ALL {
        let (cx, cy) = rect.corner(handle);
        if (x - cx).hypot(y - cy) < tolerance {
            return Some(handle);
        }
    }
    None
}

fn resize(origin: CropRect, handle: Handle, dx: f32, dy: f32, bounds: (f32, f32)) -> CropRect {
    let right = origin.right();
    let bottom = origin.bottom();

    match handle {
        Handle::NorthWest => {
            // Bounds floor last: when the displayed bounds are smaller than
            // the minimum crop size, the edge must still stay at 0 (the
            // too-small candidate is then discarded by the caller).
            let new_x = (origin.x + dx).min(right - MIN_CROP_SIZE).max(0.0);
            let new_y = (origin.y + dy).min(bottom - MIN_CROP_SIZE).max(0.0);
            CropRect {
                x: new_x,
                y: new_y,
                width: right - new_x,
                height: bottom - new_y,
            }
        }
        Handle::NorthEast => {
            let new_right = (right + dx).max(origin.x + MIN_CROP_SIZE).min(bounds.0);
            let new_y = (origin.y + dy).min(bottom - MIN_CROP_SIZE).max(0.0);
            CropRect {
                x: origin.x,
                y: new_y,
                width: new_right - origin.x,
                height: bottom - new_y,
            }
        }
        Handle::SouthWest => {
            let new_x = (origin.x + dx).min(right - MIN_CROP_SIZE).max(0.0);
            let new_bottom = (bottom + dy).max(origin.y + MIN_CROP_SIZE).min(bounds.1);
            CropRect {
                x: new_x,
                y: origin.y,
                width: right - new_x,
                height: new_bottom - origin.y,
            }
        }
        Handle::SouthEast => {
            let new_right = (right + dx).max(origin.x + MIN_CROP_SIZE).min(bounds.0);
            let new_bottom = (bottom + dy).max(origin.y + MIN_CROP_SIZE).min(bounds.1);
            CropRect {
                x: origin.x,
                y: origin.y,
                width: new_right - origin.x,
                height: new_bottom - origin.y,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f32 = 1e-3;

    fn drag(editor: &mut CropEditor, handle: Handle, to: (f32, f32)) {
        let (cx, cy) = editor.rect().corner(handle);
        editor.begin_drag(handle, cx, cy);
        editor.drag_to(to.0, to.1);
        editor.end_drag();
    }

    #[test]
    fn new_editor_covers_full_bounds() {
        let editor = CropEditor::new(500.0, 250.0);
        assert_eq!(editor.rect(), CropRect::full(500.0, 250.0));
        assert!(editor.is_full_frame());
    }

    #[test]
    fn north_west_drag_moves_origin_and_shrinks() {
        let mut editor = CropEditor::new(500.0, 250.0);
        drag(&mut editor, Handle::NorthWest, (100.0, 50.0));
        let r = editor.rect();
        assert_eq!((r.x, r.y, r.width, r.height), (100.0, 50.0, 400.0, 200.0));
        assert!(!editor.is_full_frame());
    }

    #[test]
    fn south_east_drag_adjusts_only_extents() {
        let mut editor = CropEditor::new(500.0, 250.0);
        drag(&mut editor, Handle::SouthEast, (300.0, 150.0));
        let r = editor.rect();
        assert_eq!((r.x, r.y, r.width, r.height), (0.0, 0.0, 300.0, 150.0));
    }

    #[test]
    fn drags_clamp_to_bounds() {
        let mut editor = CropEditor::new(500.0, 250.0);
        drag(&mut editor, Handle::NorthWest, (-80.0, -40.0));
        assert_eq!(editor.rect(), CropRect::full(500.0, 250.0));

        drag(&mut editor, Handle::SouthEast, (900.0, 900.0));
        assert_eq!(editor.rect(), CropRect::full(500.0, 250.0));
    }

    #[test]
    fn drags_respect_min_size_floor() {
        let mut editor = CropEditor::new(500.0, 250.0);
        drag(&mut editor, Handle::SouthEast, (0.0, 0.0));
        let r = editor.rect();
        assert!((r.width - MIN_CROP_SIZE).abs() < EPS);
        assert!((r.height - MIN_CROP_SIZE).abs() < EPS);
    }

    #[test]
    fn bounds_smaller_than_min_size_cannot_be_escaped() {
        // A 40x40 preview leaves no room for a 50px crop; every candidate
        // is discarded and the rectangle must stay put inside the bounds.
        for handle in Handle::ALL {
            let mut editor = CropEditor::new(40.0, 40.0);
            let (cx, cy) = editor.rect().corner(handle);
            editor.begin_drag(handle, cx, cy);
            editor.drag_to(cx + 5.0, cy + 5.0);
            editor.end_drag();

            let r = editor.rect();
            assert_eq!(r, CropRect::full(40.0, 40.0), "{handle:?} moved {r:?}");
            assert!(r.x >= 0.0 && r.y >= 0.0);
            assert!(r.right() <= 40.0 && r.bottom() <= 40.0);
        }
    }

    #[test]
    fn drag_without_gesture_is_ignored() {
        let mut editor = CropEditor::new(500.0, 250.0);
        editor.drag_to(200.0, 100.0);
        assert_eq!(editor.rect(), CropRect::full(500.0, 250.0));
    }

    #[test]
    fn reset_restores_full_frame() {
        let mut editor = CropEditor::new(500.0, 250.0);
        drag(&mut editor, Handle::NorthWest, (120.0, 60.0));
        editor.reset();
        assert!(editor.is_full_frame());
    }

    #[test]
    fn reflow_rescales_rectangle_proportionally() {
        let mut editor = CropEditor::new(500.0, 250.0);
        drag(&mut editor, Handle::NorthWest, (100.0, 50.0));
        editor.set_bounds(1000.0, 500.0);
        let r = editor.rect();
        assert!((r.x - 200.0).abs() < EPS);
        assert!((r.y - 100.0).abs() < EPS);
        assert!((r.width - 800.0).abs() < EPS);
        assert!((r.height - 400.0).abs() < EPS);
    }

    #[test]
    fn reflow_cancels_active_drag() {
        let mut editor = CropEditor::new(500.0, 250.0);
        editor.begin_drag(Handle::SouthEast, 500.0, 250.0);
        editor.set_bounds(400.0, 200.0);
        assert!(!editor.is_dragging());
    }

    #[test]
    fn source_mapping_scales_by_natural_over_displayed() {
        // 2000x1000 natural shown at 500x250; rect (100,50,200,100) must map
        // to (400,200,800,400).
        let mut editor = CropEditor::new(500.0, 250.0);
        drag(&mut editor, Handle::NorthWest, (100.0, 50.0));
        drag(&mut editor, Handle::SouthEast, (300.0, 150.0));
        assert_eq!(
            editor.to_source_rect(2000, 1000),
            SourceRect {
                x: 400,
                y: 200,
                width: 800,
                height: 400
            }
        );
    }

    #[test]
    fn source_mapping_stays_inside_natural_grid() {
        let editor = CropEditor::new(333.0, 117.0);
        let src = editor.to_source_rect(997, 353);
        assert!(src.x + src.width <= 997);
        assert!(src.y + src.height <= 353);
    }

    #[test]
    fn corner_hit_test_matches_nearest_handle() {
        let rect = CropRect {
            x: 10.0,
            y: 20.0,
            width: 200.0,
            height: 100.0,
        };
        assert_eq!(
            hit_test_corner(12.0, 22.0, &rect, 10.0),
            Some(Handle::NorthWest)
        );
        assert_eq!(
            hit_test_corner(208.0, 121.0, &rect, 10.0),
            Some(Handle::SouthEast)
        );
        assert_eq!(hit_test_corner(110.0, 70.0, &rect, 10.0), None);
    }

    proptest! {
        #[test]
        fn drag_sequences_preserve_invariants(
            ops in prop::collection::vec(
                (0usize..4, -600.0f32..600.0, -600.0f32..600.0),
                1..40,
            )
        ) {
            let mut editor = CropEditor::new(500.0, 250.0);
            for (which, x, y) in ops {
                drag(&mut editor, Handle::ALL[which], (x, y));
                let r = editor.rect();
                prop_assert!(r.width >= MIN_CROP_SIZE - EPS);
                prop_assert!(r.height >= MIN_CROP_SIZE - EPS);
                prop_assert!(r.x >= -EPS);
                prop_assert!(r.y >= -EPS);
                prop_assert!(r.right() <= 500.0 + EPS);
                prop_assert!(r.bottom() <= 250.0 + EPS);
            }
        }

        #[test]
        fn drag_sequences_stay_inside_arbitrary_bounds(
            (bw, bh) in (20.0f32..800.0, 20.0f32..800.0),
            ops in prop::collection::vec(
                (0usize..4, -900.0f32..900.0, -900.0f32..900.0),
                1..40,
            )
        ) {
            let mut editor = CropEditor::new(bw, bh);
            for (which, x, y) in ops {
                drag(&mut editor, Handle::ALL[which], (x, y));
                let r = editor.rect();
                prop_assert!(r.x >= -EPS);
                prop_assert!(r.y >= -EPS);
                prop_assert!(r.right() <= bw + EPS);
                prop_assert!(r.bottom() <= bh + EPS);
                prop_assert!(r.width >= MIN_CROP_SIZE.min(bw) - EPS);
                prop_assert!(r.height >= MIN_CROP_SIZE.min(bh) - EPS);
            }
        }
    }
}
