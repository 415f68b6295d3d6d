//! Xbox Series X|S controller BLE input report.
//!
//! Layout (16 bytes, little-endian):
//! ```text
//! Byte 0-1:   Left stick X      (u16)
//! Byte 2-3:   Left stick Y      (u16)
//! Byte 4-5:   Right stick X     (u16)
//! Byte 6-7:   Right stick Y     (u16)
//! Byte 8-9:   Left trigger      (u16)
//! Byte 10-11: Right trigger     (u16)
//! Byte 12:    D-pad (0 = neutral, 1 = up, then clockwise to 8 = up-left)
//! Byte 13:    Bit 0 = A, 1 = B, 3 = X, 4 = Y, 6 = LB, 7 = RB
//! Byte 14:    Bit 2 = View, 3 = Menu, 4 = Xbox, 5 = LS, 6 = RS
//! Byte 15:    Bit 0 = Share
//! ```

use crate::error::DecodeError;
use bitflags::bitflags;

/// Input report size in bytes.
pub const REPORT_SIZE: usize = 16;

/// Byte offsets of each field within the report.
mod offset {
    pub const LEFT_X: usize = 0;
    pub const LEFT_Y: usize = 2;
    pub const RIGHT_X: usize = 4;
    pub const RIGHT_Y: usize = 6;
    pub const LEFT_TRIGGER: usize = 8;
    pub const RIGHT_TRIGGER: usize = 10;
    pub const DPAD: usize = 12;
    pub const FACE: usize = 13;
    pub const CENTER: usize = 14;
    pub const SHARE: usize = 15;
}

bitflags! {
    /// Byte 13: face buttons and bumpers.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct FaceButtons: u8 {
        const A = 1 << 0;
        const B = 1 << 1;
        const X = 1 << 3;
        const Y = 1 << 4;
        const LEFT_BUMPER = 1 << 6;
        const RIGHT_BUMPER = 1 << 7;
    }
}

bitflags! {
    /// Byte 14: center cluster and stick clicks.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CenterButtons: u8 {
        const VIEW = 1 << 2;
        const MENU = 1 << 3;
        const GUIDE = 1 << 4;
        const LEFT_STICK = 1 << 5;
        const RIGHT_STICK = 1 << 6;
    }
}

bitflags! {
    /// Byte 15: share button.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ShareButton: u8 {
        const SHARE = 1 << 0;
    }
}

const DPAD_NAMES: [&str; 9] = [
    "Neutral",
    "Up",
    "Up-Right",
    "Right",
    "Down-Right",
    "Down",
    "Down-Left",
    "Left",
    "Up-Left",
];

/// D-pad direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DPad {
    Neutral,
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
    /// Value outside 0..=8, kept as received.
    Unknown(OutOfRange),
}

/// A D-pad wire value above 8.  Only [`DPad::from`] builds one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRange(u8);

impl OutOfRange {
    pub fn value(self) -> u8 {
        self.0
    }
}

impl From<u8> for DPad {
    fn from(value: u8) -> Self {
        match value {
            0 => DPad::Neutral,
            1 => DPad::Up,
            2 => DPad::UpRight,
            3 => DPad::Right,
            4 => DPad::DownRight,
            5 => DPad::Down,
            6 => DPad::DownLeft,
            7 => DPad::Left,
            8 => DPad::UpLeft,
            other => DPad::Unknown(OutOfRange(other)),
        }
    }
}

impl DPad {
    /// Wire value of this direction.
    pub fn raw(self) -> u8 {
        match self {
            DPad::Neutral => 0,
            DPad::Up => 1,
            DPad::UpRight => 2,
            DPad::Right => 3,
            DPad::DownRight => 4,
            DPad::Down => 5,
            DPad::DownLeft => 6,
            DPad::Left => 7,
            DPad::UpLeft => 8,
            DPad::Unknown(v) => v.value(),
        }
    }

    /// Human-readable name; "Unknown" for out-of-range values.
    pub fn name(self) -> &'static str {
        DPAD_NAMES
            .get(self.raw() as usize)
            .copied()
            .unwrap_or("Unknown")
    }
}

/// Named button, independent of which report byte carries it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonId {
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    View,
    Menu,
    Guide,
    LeftStickClick,
    RightStickClick,
    Share,
}

impl ButtonId {
    pub const ALL: [ButtonId; 12] = [
        ButtonId::A,
        ButtonId::B,
        ButtonId::X,
        ButtonId::Y,
        ButtonId::LeftBumper,
        ButtonId::RightBumper,
        ButtonId::View,
        ButtonId::Menu,
        ButtonId::Guide,
        ButtonId::LeftStickClick,
        ButtonId::RightStickClick,
        ButtonId::Share,
    ];

    /// Short label used when rendering.
    pub fn label(self) -> &'static str {
        match self {
            ButtonId::A => "A",
            ButtonId::B => "B",
            ButtonId::X => "X",
            ButtonId::Y => "Y",
            ButtonId::LeftBumper => "LB",
            ButtonId::RightBumper => "RB",
            ButtonId::View => "View",
            ButtonId::Menu => "Menu",
            ButtonId::Guide => "Xbox",
            ButtonId::LeftStickClick => "LS",
            ButtonId::RightStickClick => "RS",
            ButtonId::Share => "Share",
        }
    }

    /// Look a button up by its position in [`ButtonId::ALL`].
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Decoded controller state.  Produced only from a complete report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ControllerState {
    pub left_x: u16,
    pub left_y: u16,
    pub right_x: u16,
    pub right_y: u16,
    pub left_trigger: u16,
    pub right_trigger: u16,
    pub dpad: DPad,
    pub face: FaceButtons,
    pub center: CenterButtons,
    pub share: ShareButton,
}

fn read_u16(data: &[u8; REPORT_SIZE], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn write_u16(buf: &mut [u8; REPORT_SIZE], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

impl ControllerState {
    /// Reinterpret a full report.  Unknown bits and D-pad values are kept.
    pub fn from_report(data: &[u8; REPORT_SIZE]) -> Self {
        Self {
            left_x: read_u16(data, offset::LEFT_X),
            left_y: read_u16(data, offset::LEFT_Y),
            right_x: read_u16(data, offset::RIGHT_X),
            right_y: read_u16(data, offset::RIGHT_Y),
            left_trigger: read_u16(data, offset::LEFT_TRIGGER),
            right_trigger: read_u16(data, offset::RIGHT_TRIGGER),
            dpad: DPad::from(data[offset::DPAD]),
            face: FaceButtons::from_bits_retain(data[offset::FACE]),
            center: CenterButtons::from_bits_retain(data[offset::CENTER]),
            share: ShareButton::from_bits_retain(data[offset::SHARE]),
        }
    }

    /// Write the wire layout back out.
    pub fn to_bytes(&self) -> [u8; REPORT_SIZE] {
        let mut buf = [0u8; REPORT_SIZE];
        write_u16(&mut buf, offset::LEFT_X, self.left_x);
        write_u16(&mut buf, offset::LEFT_Y, self.left_y);
        write_u16(&mut buf, offset::RIGHT_X, self.right_x);
        write_u16(&mut buf, offset::RIGHT_Y, self.right_y);
        write_u16(&mut buf, offset::LEFT_TRIGGER, self.left_trigger);
        write_u16(&mut buf, offset::RIGHT_TRIGGER, self.right_trigger);
        buf[offset::DPAD] = self.dpad.raw();
        buf[offset::FACE] = self.face.bits();
        buf[offset::CENTER] = self.center.bits();
        buf[offset::SHARE] = self.share.bits();
        buf
    }

    /// Returns `true` when `button`'s bit is set.
    pub fn is_pressed(&self, button: ButtonId) -> bool {
        match button {
            ButtonId::A => self.face.contains(FaceButtons::A),
            ButtonId::B => self.face.contains(FaceButtons::B),
            ButtonId::X => self.face.contains(FaceButtons::X),
            ButtonId::Y => self.face.contains(FaceButtons::Y),
            ButtonId::LeftBumper => self.face.contains(FaceButtons::LEFT_BUMPER),
            ButtonId::RightBumper => self.face.contains(FaceButtons::RIGHT_BUMPER),
            ButtonId::View => self.center.contains(CenterButtons::VIEW),
            ButtonId::Menu => self.center.contains(CenterButtons::MENU),
            ButtonId::Guide => self.center.contains(CenterButtons::GUIDE),
            ButtonId::LeftStickClick => self.center.contains(CenterButtons::LEFT_STICK),
            ButtonId::RightStickClick => self.center.contains(CenterButtons::RIGHT_STICK),
            ButtonId::Share => self.share.contains(ShareButton::SHARE),
        }
    }

    /// Iterate over the buttons currently held.
    pub fn pressed(&self) -> impl Iterator<Item = ButtonId> + '_ {
        ButtonId::ALL.into_iter().filter(|b| self.is_pressed(*b))
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ControllerState {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "L=({=u16},{=u16}) R=({=u16},{=u16}) LT={=u16} RT={=u16} dpad={} face={=u8:#x} center={=u8:#x} share={=u8}",
            self.left_x,
            self.left_y,
            self.right_x,
            self.right_y,
            self.left_trigger,
            self.right_trigger,
            self.dpad,
            self.face.bits(),
            self.center.bits(),
            self.share.bits()
        )
    }
}

/// Parse a raw notification payload.
///
/// Fails without touching any state unless `data` is exactly
/// [`REPORT_SIZE`] bytes.
pub fn decode(data: &[u8]) -> Result<ControllerState, DecodeError> {
    let report: &[u8; REPORT_SIZE] = data
        .try_into()
        .map_err(|_| DecodeError::InvalidLength { len: data.len() })?;
    Ok(ControllerState::from_report(report))
}

/// Whether `button` is held in `state`.
pub fn query(state: &ControllerState, button: ButtonId) -> bool {
    state.is_pressed(button)
}
