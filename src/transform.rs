// Screen <-> world coordinate transform for HexFog Core
//
// The transform is fully determined by the view's pan and zoom:
//   screen = world · zoom + pan

use crate::types::{Point, ViewState, MAX_ZOOM, MIN_ZOOM};

pub fn world_to_screen(view: &ViewState, world: Point) -> Point {
    Point {
        x: world.x * view.zoom_level + view.pan_x,
        y: world.y * view.zoom_level + view.pan_y,
    }
}

pub fn screen_to_world(view: &ViewState, screen: Point) -> Point {
    Point {
        x: (screen.x - view.pan_x) / view.zoom_level,
        y: (screen.y - view.pan_y) / view.zoom_level,
    }
}

/// Anchor-preserving zoom: scale the zoom level by `factor` (clamped to
/// [0.1, 5]) and re-derive the pan so the world point currently under
/// (screen_x, screen_y) stays under that exact screen point.
pub fn zoom_at(view: &mut ViewState, screen_x: f64, screen_y: f64, factor: f64) {
    let anchor = screen_to_world(view, Point { x: screen_x, y: screen_y });
    let new_zoom = (view.zoom_level * factor).clamp(MIN_ZOOM, MAX_ZOOM);

    // Solve screen = anchor · new_zoom + pan for pan
    view.pan_x = screen_x - anchor.x * new_zoom;
    view.pan_y = screen_y - anchor.y * new_zoom;
    view.zoom_level = new_zoom;
}

/// Translate the view by a screen-space delta
pub fn pan_by(view: &mut ViewState, dx: f64, dy: f64) {
    view.pan_x += dx;
    view.pan_y += dy;
}
