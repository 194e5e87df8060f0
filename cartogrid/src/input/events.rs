//! Window-system neutral input events.

/// Keys the viewport reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    /// Any other key; ignored.
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    Press,
    Release,
}

/// A single input event from the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Key pressed or repeating.
    Key { key: Key, shift: bool },
    /// Text character typed.
    Char(char),
    /// Scroll wheel movement.
    Scroll { dx: f64, dy: f64 },
    /// Cursor moved to window coordinates.
    CursorMoved { x: f64, y: f64 },
    /// Mouse button pressed or released at the current cursor position.
    Button {
        button: MouseButton,
        action: ButtonAction,
    },
}
