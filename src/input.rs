use std::collections::HashSet;

use glam::Vec2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Identifier for a physical keyboard key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Named(NamedKey),
    Character(char),
    Digit(u8),
}

/// Friendly names for the non-printable keys the renderer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamedKey {
    LeftShift,
    RightShift,
}

/// Identifier for a mouse button (left button is zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseButton(u8);

impl MouseButton {
    pub const LEFT: Self = Self(0);

    pub fn new(index: u8) -> Self {
        Self(index)
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

/// Polled input snapshot shared between the frame driver and the scene
/// components. Keys and buttons are level-triggered sets; the scroll delta
/// accumulates between frames and is drained once per camera update.
#[derive(Debug, Default)]
pub struct InputState {
    keys: RwLock<HashSet<KeyCode>>,
    mouse_buttons: RwLock<HashSet<MouseButton>>,
    mouse_position: RwLock<Vec2>,
    scroll_delta: RwLock<f32>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_key_down(&self, key: KeyCode) {
        self.keys.write().insert(key);
    }

    pub fn set_key_up(&self, key: KeyCode) {
        self.keys.write().remove(&key);
    }

    pub fn set_mouse_button_down(&self, button: MouseButton) {
        self.mouse_buttons.write().insert(button);
    }

    pub fn set_mouse_button_up(&self, button: MouseButton) {
        self.mouse_buttons.write().remove(&button);
    }

    pub fn set_mouse_position(&self, position: Vec2) {
        *self.mouse_position.write() = position;
    }

    /// Adds a scroll-wheel step to the pending delta.
    pub fn add_scroll(&self, delta: f32) {
        *self.scroll_delta.write() += delta;
    }

    /// Returns the accumulated scroll delta and resets it to zero.
    pub fn take_scroll(&self) -> f32 {
        std::mem::take(&mut *self.scroll_delta.write())
    }

    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.read().contains(&key)
    }

    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.mouse_buttons.read().contains(&button)
    }

    pub fn mouse_position(&self) -> Vec2 {
        *self.mouse_position.read()
    }
}

/// Rising-edge detector for a held key: `rising_edge` reports `true` only on
/// the transition from released to pressed, then re-arms on release.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToggleLatch {
    held: bool,
}

impl ToggleLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rising_edge(&mut self, down: bool) -> bool {
        let fired = down && !self.held;
        self.held = down;
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_state_tracks_keys() {
        let state = InputState::new();
        state.set_key_down(KeyCode::Character('W'));
        assert!(state.is_key_down(KeyCode::Character('W')));
        state.set_key_up(KeyCode::Character('W'));
        assert!(!state.is_key_down(KeyCode::Character('W')));
    }

    #[test]
    fn input_state_tracks_mouse_buttons() {
        let state = InputState::new();
        assert!(!state.is_mouse_button_down(MouseButton::LEFT));
        state.set_mouse_button_down(MouseButton::LEFT);
        assert!(state.is_mouse_button_down(MouseButton::LEFT));
        state.set_mouse_button_up(MouseButton::LEFT);
        assert!(!state.is_mouse_button_down(MouseButton::LEFT));
    }

    #[test]
    fn scroll_accumulates_and_drains() {
        let state = InputState::new();
        state.add_scroll(1.0);
        state.add_scroll(-3.0);
        assert_eq!(state.take_scroll(), -2.0);
        assert_eq!(state.take_scroll(), 0.0);
    }

    #[test]
    fn latch_fires_once_per_press() {
        let mut latch = ToggleLatch::new();
        assert!(latch.rising_edge(true));
        assert!(!latch.rising_edge(true));
        assert!(!latch.rising_edge(false));
        assert!(latch.rising_edge(true));
    }
}
