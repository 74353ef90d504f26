use glam::{Mat4, Vec2, Vec3};

use crate::input::{InputState, KeyCode, MouseButton, NamedKey};

const PITCH_LIMIT: f32 = 89.0;
const FOV_MIN: f32 = 1.0;
const FOV_MAX: f32 = 100.0;

/// Whether the raw cursor coordinate falls inside the viewport rectangle.
/// Only drives the cursor glyph; has no effect on the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorZone {
    Inside,
    Outside,
}

/// Free-fly camera driven by polled keyboard and mouse state.
///
/// Orientation is a unit forward vector derived from yaw/pitch; pitch is
/// clamped to ±89° so the view never flips over the vertical axis. Look
/// control is gated on the left mouse button with a first-click latch: the
/// drag anchor resets on release so the next press does not apply the
/// cursor travel accumulated in between.
#[derive(Debug)]
pub struct Camera {
    pub position: Vec3,
    pub orientation: Vec3,
    pub up: Vec3,
    pub fov: f32,
    yaw: f32,
    pitch: f32,
    viewport_width: u32,
    viewport_height: u32,
    last_cursor: Vec2,
    first_click: bool,
    sensitivity: f32,
    base_speed: f32,
}

impl Camera {
    pub fn new(viewport_width: u32, viewport_height: u32, position: Vec3) -> Self {
        Self {
            position,
            // Yaw starts at -90° so the initial orientation points down -Z.
            orientation: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::Y,
            fov: 45.0,
            yaw: -90.0,
            pitch: 0.0,
            viewport_width,
            viewport_height,
            last_cursor: Vec2::new(viewport_width as f32 / 2.0, viewport_height as f32 / 2.0),
            first_click: true,
            sensitivity: 0.1,
            base_speed: 1.0,
        }
    }

    /// Applies one frame of polled input: mouse look (while the left button
    /// is held), planar and vertical movement, speed boost, and scroll zoom.
    pub fn update(&mut self, input: &InputState, delta_time: f32) {
        let cursor = input.mouse_position();

        if input.is_mouse_button_down(MouseButton::LEFT) {
            if self.first_click {
                self.last_cursor = cursor;
                self.first_click = false;
            }
            let dx = cursor.x - self.last_cursor.x;
            // Screen Y grows downward, so the vertical offset is flipped.
            let dy = self.last_cursor.y - cursor.y;
            if dx != 0.0 || dy != 0.0 {
                self.apply_mouse_movement(dx, dy);
            }
        } else {
            self.first_click = true;
        }
        self.last_cursor = cursor;

        // The boost is re-evaluated every call, not edge-triggered: the speed
        // doubles only while the modifier is held and reverts on release.
        let mut base_speed = self.base_speed;
        if input.is_key_down(KeyCode::Named(NamedKey::LeftShift))
            || input.is_key_down(KeyCode::Named(NamedKey::RightShift))
        {
            base_speed *= 2.0;
        }
        let speed = base_speed * delta_time;

        let right = self.orientation.cross(self.up).normalize();
        if input.is_key_down(KeyCode::Character('W')) {
            self.position += speed * self.orientation;
        }
        if input.is_key_down(KeyCode::Character('S')) {
            self.position -= speed * self.orientation;
        }
        if input.is_key_down(KeyCode::Character('A')) {
            self.position -= speed * right;
        }
        if input.is_key_down(KeyCode::Character('D')) {
            self.position += speed * right;
        }
        if input.is_key_down(KeyCode::Character('Q')) {
            self.position += speed * self.up;
        }
        if input.is_key_down(KeyCode::Character('E')) {
            self.position -= speed * self.up;
        }

        let scroll = input.take_scroll();
        if scroll != 0.0 {
            self.apply_scroll(scroll);
        }
    }

    /// Converts a cursor delta into yaw/pitch and recomputes the orientation.
    pub fn apply_mouse_movement(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch + dy * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);

        let pitch = self.pitch.to_radians();
        let yaw = self.yaw.to_radians();
        self.orientation = Vec3::new(
            pitch.cos() * yaw.cos(),
            pitch.sin(),
            pitch.cos() * yaw.sin(),
        )
        .normalize();
    }

    /// Scroll zoom: two degrees of field of view per wheel step.
    pub fn apply_scroll(&mut self, delta: f32) {
        self.fov = (self.fov - delta * 2.0).clamp(FOV_MIN, FOV_MAX);
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport_width = width.max(1);
        self.viewport_height = height.max(1);
    }

    pub fn aspect(&self) -> f32 {
        self.viewport_width as f32 / self.viewport_height as f32
    }

    pub fn cursor_zone(&self, cursor: Vec2) -> CursorZone {
        if cursor.x < 0.0
            || cursor.x > self.viewport_width as f32
            || cursor.y < 0.0
            || cursor.y > self.viewport_height as f32
        {
            CursorZone::Outside
        } else {
            CursorZone::Inside
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.orientation, self.up)
    }

    pub fn projection_matrix(&self, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect(), near, far)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(800, 800, Vec3::new(0.0, 0.0, 5.0))
    }

    #[test]
    fn pitch_is_clamped_and_orientation_stays_unit() {
        let mut cam = camera();
        for dy in [10_000.0, -25_000.0, 400.0, -1.5, 9999.0] {
            cam.apply_mouse_movement(137.0, dy);
            assert!(cam.orientation.is_normalized());
        }
        // A huge upward drag pins the pitch at the limit: the forward vector
        // never quite reaches straight up.
        cam.apply_mouse_movement(0.0, 1_000_000.0);
        assert!(cam.orientation.y < 1.0);
        assert!(cam.orientation.y > PITCH_LIMIT.to_radians().sin() - 1e-4);
    }

    #[test]
    fn fov_stays_in_bounds_for_any_scroll_sequence() {
        let mut cam = camera();
        for delta in [500.0, -500.0, 3.0, -0.25, 1e6, -1e6, 0.1] {
            cam.apply_scroll(delta);
            assert!((FOV_MIN..=FOV_MAX).contains(&cam.fov), "fov = {}", cam.fov);
        }
    }

    #[test]
    fn look_requires_button_and_first_click_does_not_jump() {
        let mut cam = camera();
        let input = InputState::new();
        let initial = cam.orientation;

        // Cursor travels with the button released: no look.
        input.set_mouse_position(Vec2::new(50.0, 50.0));
        cam.update(&input, 0.016);
        input.set_mouse_position(Vec2::new(700.0, 700.0));
        cam.update(&input, 0.016);
        assert_eq!(cam.orientation, initial);

        // First frame of a press anchors the drag, so the prior travel is
        // discarded instead of being applied as one large delta.
        input.set_mouse_button_down(MouseButton::LEFT);
        cam.update(&input, 0.016);
        assert_eq!(cam.orientation, initial);

        // Movement while held applies.
        input.set_mouse_position(Vec2::new(710.0, 700.0));
        cam.update(&input, 0.016);
        assert_ne!(cam.orientation, initial);
        assert!(cam.orientation.is_normalized());
    }

    #[test]
    fn release_rearms_the_drag_anchor() {
        let mut cam = camera();
        let input = InputState::new();

        input.set_mouse_position(Vec2::new(400.0, 400.0));
        input.set_mouse_button_down(MouseButton::LEFT);
        cam.update(&input, 0.016);
        input.set_mouse_position(Vec2::new(420.0, 400.0));
        cam.update(&input, 0.016);
        let after_drag = cam.orientation;

        // Release, teleport the cursor, press again: no discontinuity.
        input.set_mouse_button_up(MouseButton::LEFT);
        cam.update(&input, 0.016);
        input.set_mouse_position(Vec2::new(0.0, 0.0));
        cam.update(&input, 0.016);
        input.set_mouse_button_down(MouseButton::LEFT);
        cam.update(&input, 0.016);
        assert_eq!(cam.orientation, after_drag);
    }

    #[test]
    fn movement_keys_translate_along_camera_axes() {
        let mut cam = camera();
        let input = InputState::new();
        let start = cam.position;

        input.set_key_down(KeyCode::Character('W'));
        cam.update(&input, 1.0);
        assert!((cam.position - (start + cam.orientation)).length() < 1e-5);
        input.set_key_up(KeyCode::Character('W'));

        let before_boost = cam.position;
        input.set_key_down(KeyCode::Character('Q'));
        input.set_key_down(KeyCode::Named(NamedKey::LeftShift));
        cam.update(&input, 1.0);
        // Shift doubles the base speed while held.
        assert!((cam.position - (before_boost + Vec3::Y * 2.0)).length() < 1e-5);
    }

    #[test]
    fn cursor_zone_tracks_viewport_bounds() {
        let cam = camera();
        assert_eq!(cam.cursor_zone(Vec2::new(10.0, 10.0)), CursorZone::Inside);
        assert_eq!(cam.cursor_zone(Vec2::new(-1.0, 10.0)), CursorZone::Outside);
        assert_eq!(cam.cursor_zone(Vec2::new(10.0, 801.0)), CursorZone::Outside);
    }
}
