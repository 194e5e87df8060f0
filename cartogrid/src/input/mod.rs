//! Input translation
//!
//! Turns raw window events into [`MoveDelta`](crate::coord::MoveDelta)s and
//! feeds them to the grid one at a time.
//!
//! | Event                           | Delta                       |
//! |---------------------------------|-----------------------------|
//! | Arrow key                       | pan 3 px (30 px with shift) |
//! | `+` / `-`                       | zoom ±1                     |
//! | Vertical scroll                 | zoom by whole scroll steps  |
//! | Drag with left button           | pan by the cursor movement  |
//! | Double click                    | zoom +1                     |

mod events;
mod runner;
mod translator;

pub use events::{ButtonAction, InputEvent, Key, MouseButton};
pub use runner::spawn_input_loop;
pub use translator::{
    InputTranslator, DOUBLE_CLICK_DISTANCE, DOUBLE_CLICK_INTERVAL, KEY_VELOCITY, SHIFT_MULTIPLIER,
};
