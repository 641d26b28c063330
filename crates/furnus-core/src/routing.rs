//! Face routing: which slots each side of a device exposes, and how.
//!
//! World faces ([`Facing`]) are translated into logical faces ([`Direction`])
//! relative to the way the device was placed. Each of the three channels
//! ([`Channel`]) carries its own [`Mode`] per logical face, stored as a fixed
//! 3x6 [`RoutingTable`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// World faces
// ---------------------------------------------------------------------------

/// A world-space block face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Facing {
    /// Iteration order for automatic transfers.
    pub const ALL: [Facing; 6] = [
        Facing::Down,
        Facing::Up,
        Facing::North,
        Facing::South,
        Facing::West,
        Facing::East,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Facing::Down | Facing::Up)
    }

    pub fn opposite(self) -> Facing {
        match self {
            Facing::Down => Facing::Up,
            Facing::Up => Facing::Down,
            Facing::North => Facing::South,
            Facing::South => Facing::North,
            Facing::West => Facing::East,
            Facing::East => Facing::West,
        }
    }

    /// Quarter turn clockwise seen from above. Vertical faces are unchanged.
    pub fn rotate_cw(self) -> Facing {
        match self {
            Facing::North => Facing::East,
            Facing::East => Facing::South,
            Facing::South => Facing::West,
            Facing::West => Facing::North,
            vertical => vertical,
        }
    }

    /// Quarter turn counter-clockwise seen from above.
    pub fn rotate_ccw(self) -> Facing {
        match self {
            Facing::North => Facing::West,
            Facing::West => Facing::South,
            Facing::South => Facing::East,
            Facing::East => Facing::North,
            vertical => vertical,
        }
    }

    /// Unit step `(dx, dy, dz)` across this face.
    pub fn offset(self) -> (i32, i32, i32) {
        match self {
            Facing::Down => (0, -1, 0),
            Facing::Up => (0, 1, 0),
            Facing::North => (0, 0, -1),
            Facing::South => (0, 0, 1),
            Facing::West => (-1, 0, 0),
            Facing::East => (1, 0, 0),
        }
    }
}

// ---------------------------------------------------------------------------
// Logical faces
// ---------------------------------------------------------------------------

/// A face relative to the device's front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Bottom,
    Top,
    Front,
    Back,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Bottom,
        Direction::Top,
        Direction::Front,
        Direction::Back,
        Direction::Left,
        Direction::Right,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Direction> {
        Self::ALL.get(index).copied()
    }

    /// Logical face seen on world face `side` of a device placed facing `placed`.
    ///
    /// A device facing north sees world faces unchanged. Vertical faces always
    /// map directly. A vertically placed device is treated as facing north.
    pub fn from_side(side: Facing, placed: Facing) -> Direction {
        let normalized = if side.is_vertical() {
            side
        } else {
            match placed {
                Facing::South => side.opposite(),
                Facing::East => side.rotate_ccw(),
                Facing::West => side.rotate_cw(),
                Facing::North | Facing::Up | Facing::Down => side,
            }
        };
        Self::ALL[normalized.index()]
    }
}

// ---------------------------------------------------------------------------
// Modes and channels
// ---------------------------------------------------------------------------

/// How a channel treats a face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// No access.
    #[default]
    Disabled,
    /// External access allowed.
    Enabled,
    /// The device actively pushes or pulls through this face.
    Auto,
}

impl Mode {
    /// The next mode in the cycle Disabled -> Enabled -> Auto -> Disabled.
    pub fn next(self) -> Mode {
        match self {
            Mode::Disabled => Mode::Enabled,
            Mode::Enabled => Mode::Auto,
            Mode::Auto => Mode::Disabled,
        }
    }

    pub fn is_open(self) -> bool {
        self != Mode::Disabled
    }
}

/// A routing category with its own mode per face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Input,
    Output,
    Fuel,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Input, Channel::Output, Channel::Fuel];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Name used by the device UI to address this channel.
    pub fn window_name(self) -> &'static str {
        match self {
            Channel::Input => "in",
            Channel::Output => "out",
            Channel::Fuel => "fuel",
        }
    }

    pub fn from_window_name(name: &str) -> Option<Channel> {
        Self::ALL.into_iter().find(|c| c.window_name() == name)
    }
}

// ---------------------------------------------------------------------------
// Routing table
// ---------------------------------------------------------------------------

/// Per-channel, per-face routing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    modes: [[Mode; 6]; 3],
}

impl Default for RoutingTable {
    /// Input from the top, output to the bottom, fuel from the four sides.
    fn default() -> Self {
        let mut table = Self {
            modes: [[Mode::Disabled; 6]; 3],
        };
        for channel in Channel::ALL {
            for dir in Direction::ALL {
                table.set(channel, dir, Self::default_mode(channel, dir));
            }
        }
        table
    }
}

impl RoutingTable {
    /// The mode a freshly placed device uses for `(channel, dir)`.
    pub fn default_mode(channel: Channel, dir: Direction) -> Mode {
        let open = match channel {
            Channel::Input => dir == Direction::Top,
            Channel::Output => dir == Direction::Bottom,
            Channel::Fuel => !matches!(dir, Direction::Top | Direction::Bottom),
        };
        if open { Mode::Enabled } else { Mode::Disabled }
    }

    pub fn get(&self, channel: Channel, dir: Direction) -> Mode {
        self.modes[channel.index()][dir.index()]
    }

    pub fn set(&mut self, channel: Channel, dir: Direction, mode: Mode) {
        self.modes[channel.index()][dir.index()] = mode;
    }

    /// Step one face of one channel to its next mode. Returns the new mode.
    pub fn advance(&mut self, channel: Channel, dir: Direction) -> Mode {
        let next = self.get(channel, dir).next();
        self.set(channel, dir, next);
        next
    }

    /// One channel as a direction -> mode map.
    pub fn channel_map(&self, channel: Channel) -> BTreeMap<Direction, Mode> {
        Direction::ALL
            .into_iter()
            .map(|d| (d, self.get(channel, d)))
            .collect()
    }

    /// Rebuild a table from per-channel maps. Missing channels and missing
    /// directions fall back to the defaults.
    pub fn from_channel_maps(
        input: Option<&BTreeMap<Direction, Mode>>,
        output: Option<&BTreeMap<Direction, Mode>>,
        fuel: Option<&BTreeMap<Direction, Mode>>,
    ) -> Self {
        let mut table = Self::default();
        for (channel, map) in [
            (Channel::Input, input),
            (Channel::Output, output),
            (Channel::Fuel, fuel),
        ] {
            let Some(map) = map else { continue };
            for (dir, mode) in map {
                table.set(channel, *dir, *mode);
            }
        }
        table
    }
}
