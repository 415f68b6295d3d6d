//! Human-readable rendering of a [`ControllerState`].

use core::fmt::{self, Write};

use super::report::{ButtonId, ControllerState};
use heapless::String;

/// Capacity of the buffer returned by [`render`].
pub const RENDER_CAPACITY: usize = 512;

const FACE_GROUP: [ButtonId; 6] = [
    ButtonId::A,
    ButtonId::B,
    ButtonId::X,
    ButtonId::Y,
    ButtonId::LeftBumper,
    ButtonId::RightBumper,
];

const CENTER_GROUP: [ButtonId; 5] = [
    ButtonId::View,
    ButtonId::Menu,
    ButtonId::Guide,
    ButtonId::LeftStickClick,
    ButtonId::RightStickClick,
];

fn write_group(f: &mut fmt::Formatter<'_>, state: &ControllerState, group: &[ButtonId]) -> fmt::Result {
    f.write_str("[ ")?;
    for button in group.iter().filter(|b| state.is_pressed(**b)) {
        write!(f, "{} ", button.label())?;
    }
    f.write_str("]\n")
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("=== Xbox Controller State ===\n")?;
        writeln!(f, "Left Stick : X={:4}  Y={:4}", self.left_x, self.left_y)?;
        writeln!(f, "Right Stick: X={:4}  Y={:4}", self.right_x, self.right_y)?;
        writeln!(
            f,
            "Triggers   : LT={:4}  RT={:4}",
            self.left_trigger, self.right_trigger
        )?;
        writeln!(f, "D-Pad      : {} ({})", self.dpad.name(), self.dpad.raw())?;
        f.write_str("Buttons ABXY+LB/RB: ")?;
        write_group(f, self, &FACE_GROUP)?;
        f.write_str("Center Buttons     : ")?;
        write_group(f, self, &CENTER_GROUP)?;
        let share = if self.is_pressed(ButtonId::Share) {
            "Pressed"
        } else {
            "Released"
        };
        writeln!(f, "Share Button       : {}", share)?;
        f.write_str("=============================\n")
    }
}

/// Render `state` into a fixed-capacity string.
pub fn render(state: &ControllerState) -> String<RENDER_CAPACITY> {
    let mut out = String::new();
    // The longest possible rendering fits well within RENDER_CAPACITY.
    let _ = write!(out, "{}", state);
    out
}
