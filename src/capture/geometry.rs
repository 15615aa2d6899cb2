//! Aspect-fit selection mapping — functional core.
//!
//! The overlay presents the captured frame scaled to fit its container
//! ("contain" scaling), which letterboxes one axis. The user draws a
//! rectangle in container coordinates; this module maps it to exact pixel
//! coordinates on the full-resolution frame.
//!
//! Zero infrastructure dependencies: numbers in, numbers out.

/// Minimum selection edge, in container pixels. Anything smaller is treated
/// as an accidental click and ignored.
pub const MIN_SELECTION_PX: f64 = 10.0;

/// A drag rectangle in container-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Dimensions of the on-screen box the frame is rendered into.
///
/// Read from the live layout at crop time; never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContainerGeometry {
    pub width: f64,
    pub height: f64,
}

/// Where the frame actually paints inside the container under aspect-fit.
///
/// Exactly one of `offset_x` / `offset_y` is zero: the constrained axis
/// fills the container, the other is centered between letterbox bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderBox {
    pub render_w: f64,
    pub render_h: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// A rectangle in image pixel space, fully inside the image bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Compute where an `img_w`×`img_h` frame renders inside `container` under
/// "contain" scaling.
///
/// A container wider (relative to its height) than the image ratio pins the
/// render height to the container and letterboxes horizontally; otherwise
/// the render width is pinned and the bars are vertical.
pub fn aspect_fit(img_w: u32, img_h: u32, container: ContainerGeometry) -> RenderBox {
    let img_ratio = img_w as f64 / img_h as f64;
    let container_ratio = container.width / container.height;

    if container_ratio > img_ratio {
        let render_h = container.height;
        let render_w = render_h * img_ratio;
        RenderBox {
            render_w,
            render_h,
            offset_x: (container.width - render_w) / 2.0,
            offset_y: 0.0,
        }
    } else {
        let render_w = container.width;
        let render_h = render_w / img_ratio;
        RenderBox {
            render_w,
            render_h,
            offset_x: 0.0,
            offset_y: (container.height - render_h) / 2.0,
        }
    }
}

/// Map a container-space selection to image pixel coordinates.
///
/// Returns `None` for selections below [`MIN_SELECTION_PX`] on either edge,
/// and for selections that clamp to zero area (drawn entirely inside a
/// letterbox bar). Selections partially overlapping a bar are clamped to
/// the image bounds rather than rejected.
pub fn map_selection(
    img_w: u32,
    img_h: u32,
    container: ContainerGeometry,
    selection: SelectionRect,
) -> Option<PixelRect> {
    if img_w == 0 || img_h == 0 || container.width <= 0.0 || container.height <= 0.0 {
        return None;
    }
    if selection.w < MIN_SELECTION_PX || selection.h < MIN_SELECTION_PX {
        return None;
    }

    let render = aspect_fit(img_w, img_h, container);
    let scale_x = img_w as f64 / render.render_w;
    let scale_y = img_h as f64 / render.render_h;

    let left = (selection.x - render.offset_x) * scale_x;
    let top = (selection.y - render.offset_y) * scale_y;
    let right = left + selection.w * scale_x;
    let bottom = top + selection.h * scale_y;

    // Clamp to the image; the drag may have started or ended inside a bar.
    let left = left.clamp(0.0, img_w as f64);
    let top = top.clamp(0.0, img_h as f64);
    let right = right.clamp(0.0, img_w as f64);
    let bottom = bottom.clamp(0.0, img_h as f64);

    // Round the edges, not the extents: deriving w/h from independently
    // rounded values could push x+w one pixel past the image edge.
    let x = left.round() as u32;
    let y = top.round() as u32;
    let w = (right.round() as u32).min(img_w).saturating_sub(x);
    let h = (bottom.round() as u32).min(img_h).saturating_sub(y);
    if w == 0 || h == 0 {
        return None;
    }

    Some(PixelRect { x, y, w, h })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(w: f64, h: f64) -> ContainerGeometry {
        ContainerGeometry { width: w, height: h }
    }

    fn sel(x: f64, y: f64, w: f64, h: f64) -> SelectionRect {
        SelectionRect { x, y, w, h }
    }

    #[test]
    fn aspect_fit_preserves_image_ratio() {
        for &(iw, ih, cw, ch) in &[
            (4000u32, 1000u32, 1000.0, 500.0),
            (1920, 1080, 800.0, 800.0),
            (1000, 3000, 500.0, 400.0),
            (333, 777, 123.0, 456.0),
        ] {
            let r = aspect_fit(iw, ih, container(cw, ch));
            let img_ratio = iw as f64 / ih as f64;
            assert!(
                (r.render_w / r.render_h - img_ratio).abs() < 1e-9,
                "ratio drifted for {}x{} in {}x{}",
                iw, ih, cw, ch
            );
            assert!(
                r.offset_x == 0.0 || r.offset_y == 0.0,
                "one offset must be zero"
            );
            assert!(r.render_w <= cw + 1e-9 && r.render_h <= ch + 1e-9);
        }
    }

    #[test]
    fn wide_image_in_wider_container_is_height_constrained() {
        // Container ratio 3.0 > image ratio 2.0 → vertical fill, side bars.
        let r = aspect_fit(2000, 1000, container(1500.0, 500.0));
        assert_eq!(r.render_h, 500.0);
        assert_eq!(r.render_w, 1000.0);
        assert_eq!(r.offset_x, 250.0);
        assert_eq!(r.offset_y, 0.0);
    }

    #[test]
    fn scenario_width_constrained_mapping() {
        // Container 1000x500 (ratio 2.0), image 4000x1000 (ratio 4.0).
        let c = container(1000.0, 500.0);
        let r = aspect_fit(4000, 1000, c);
        assert_eq!(r.render_w, 1000.0);
        assert_eq!(r.render_h, 250.0);
        assert_eq!(r.offset_x, 0.0);
        assert_eq!(r.offset_y, 125.0);

        let mapped = map_selection(4000, 1000, c, sel(100.0, 125.0, 200.0, 50.0)).unwrap();
        assert_eq!(mapped, PixelRect { x: 400, y: 0, w: 800, h: 200 });
    }

    #[test]
    fn mapped_rect_stays_inside_image() {
        let c = container(640.0, 480.0);
        let mapped = map_selection(1920, 1080, c, sel(600.0, 400.0, 100.0, 100.0)).unwrap();
        assert!(mapped.x + mapped.w <= 1920);
        assert!(mapped.y + mapped.h <= 1080);
    }

    #[test]
    fn selection_below_minimum_is_rejected() {
        let c = container(1000.0, 500.0);
        assert!(map_selection(4000, 1000, c, sel(100.0, 200.0, 9.0, 50.0)).is_none());
        assert!(map_selection(4000, 1000, c, sel(100.0, 200.0, 50.0, 9.9)).is_none());
        assert!(map_selection(4000, 1000, c, sel(100.0, 200.0, 10.0, 10.0)).is_some());
    }

    #[test]
    fn selection_inside_letterbox_bar_is_rejected() {
        // Image renders at y 125..375; a drag entirely in the top bar clamps
        // to zero height.
        let c = container(1000.0, 500.0);
        assert!(map_selection(4000, 1000, c, sel(100.0, 10.0, 200.0, 50.0)).is_none());
    }

    #[test]
    fn selection_overlapping_bar_is_clamped() {
        // Drag starts 25px above the render area; the part inside maps to
        // y=0 with the overhang discarded.
        let c = container(1000.0, 500.0);
        let mapped = map_selection(4000, 1000, c, sel(100.0, 100.0, 200.0, 50.0)).unwrap();
        assert_eq!(mapped.y, 0);
        assert_eq!(mapped.h, 100); // 25 container px inside * scale 4.0
        assert_eq!(mapped.x, 400);
        assert_eq!(mapped.w, 800);
    }

    #[test]
    fn half_pixel_edges_never_overshoot_the_image() {
        // 1:1 render; a selection whose edges round in opposite directions
        // must still satisfy x+w <= img_w after rounding.
        let c = container(100.0, 100.0);
        let mapped = map_selection(100, 100, c, sel(2.5, 0.0, 97.5, 50.0)).unwrap();
        assert_eq!((mapped.x, mapped.w), (3, 97));
        assert!(mapped.x + mapped.w <= 100);

        let mapped = map_selection(100, 100, c, sel(0.0, 2.5, 50.0, 97.5)).unwrap();
        assert_eq!((mapped.y, mapped.h), (3, 97));
        assert!(mapped.y + mapped.h <= 100);
    }

    #[test]
    fn fractional_selections_stay_inside_after_scaling() {
        // Non-integer scale factors exercise rounding on both axes.
        let c = container(977.0, 413.0);
        for &(x, y, w, h) in &[
            (0.0, 0.0, 976.5, 412.5),
            (100.3, 50.7, 876.2, 360.9),
            (960.5, 10.0, 16.4, 100.0),
        ] {
            if let Some(m) = map_selection(2560, 1440, c, sel(x, y, w, h)) {
                assert!(m.x + m.w <= 2560, "x+w overshoot for sel {:?}", (x, y, w, h));
                assert!(m.y + m.h <= 1440, "y+h overshoot for sel {:?}", (x, y, w, h));
            }
        }
    }

    #[test]
    fn mapping_is_idempotent() {
        let c = container(977.0, 413.0);
        let s = sel(31.5, 77.25, 120.0, 64.0);
        let a = map_selection(2560, 1440, c, s);
        let b = map_selection(2560, 1440, c, s);
        assert_eq!(a, b);
        assert!(a.is_some());
    }

    #[test]
    fn degenerate_container_is_rejected() {
        assert!(map_selection(1920, 1080, container(0.0, 500.0), sel(0.0, 0.0, 50.0, 50.0)).is_none());
        assert!(map_selection(0, 1080, container(800.0, 500.0), sel(0.0, 0.0, 50.0, 50.0)).is_none());
    }
}
