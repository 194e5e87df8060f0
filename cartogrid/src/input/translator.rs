//! Stateful event → delta translation.

use std::time::{Duration, Instant};

use super::events::{ButtonAction, InputEvent, Key, MouseButton};
use crate::coord::MoveDelta;

/// Pan step for an arrow key in pixels.
pub const KEY_VELOCITY: f64 = 3.0;

/// Arrow key pan multiplier while shift is held.
pub const SHIFT_MULTIPLIER: f64 = 10.0;

/// Maximum time between two clicks of a double click.
pub const DOUBLE_CLICK_INTERVAL: Duration = Duration::from_millis(300);

/// Maximum cursor travel in pixels between two clicks of a double click.
pub const DOUBLE_CLICK_DISTANCE: f64 = 10.0;

/// Tracks cursor and button state across events.
#[derive(Debug, Default)]
pub struct InputTranslator {
    cursor: (f64, f64),
    dragging: bool,
    last_click: Option<(Instant, (f64, f64))>,
}

impl InputTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translates an event received now.
    pub fn translate(&mut self, event: InputEvent) -> Option<MoveDelta> {
        self.translate_at(event, Instant::now())
    }

    /// Translates an event received at `now`.
    ///
    /// Returns `None` for events that do not move the view.
    pub fn translate_at(&mut self, event: InputEvent, now: Instant) -> Option<MoveDelta> {
        match event {
            InputEvent::Key { key, shift } => {
                let velocity = if shift {
                    KEY_VELOCITY * SHIFT_MULTIPLIER
                } else {
                    KEY_VELOCITY
                };
                match key {
                    Key::Left => Some(MoveDelta::pan(-velocity, 0.0)),
                    Key::Right => Some(MoveDelta::pan(velocity, 0.0)),
                    Key::Up => Some(MoveDelta::pan(0.0, -velocity)),
                    Key::Down => Some(MoveDelta::pan(0.0, velocity)),
                    Key::Other => None,
                }
            }
            InputEvent::Char('+') => Some(MoveDelta::zoom(1.0)),
            InputEvent::Char('-') => Some(MoveDelta::zoom(-1.0)),
            InputEvent::Char(_) => None,
            InputEvent::Scroll { dy, .. } => {
                let steps = dy.trunc();
                (steps != 0.0).then(|| MoveDelta::zoom(steps))
            }
            InputEvent::CursorMoved { x, y } => {
                let (prev_x, prev_y) = self.cursor;
                self.cursor = (x, y);
                // Grab-and-drag: the view moves opposite to the cursor
                (self.dragging && (prev_x != x || prev_y != y))
                    .then(|| MoveDelta::pan(prev_x - x, prev_y - y))
            }
            InputEvent::Button {
                button: MouseButton::Left,
                action,
            } => match action {
                ButtonAction::Press => {
                    self.dragging = true;
                    None
                }
                ButtonAction::Release => {
                    self.dragging = false;
                    self.click(now)
                }
            },
            InputEvent::Button { .. } => None,
        }
    }

    /// Registers a completed left click and reports a double click.
    fn click(&mut self, now: Instant) -> Option<MoveDelta> {
        let (x, y) = self.cursor;
        let is_double = self.last_click.is_some_and(|(at, (px, py))| {
            now.saturating_duration_since(at) <= DOUBLE_CLICK_INTERVAL
                && (px - x).abs() < DOUBLE_CLICK_DISTANCE
                && (py - y).abs() < DOUBLE_CLICK_DISTANCE
        });

        if is_double {
            self.last_click = None;
            Some(MoveDelta::zoom(1.0))
        } else {
            self.last_click = Some((now, (x, y)));
            None
        }
    }

    /// Returns true while the left button is held.
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}
