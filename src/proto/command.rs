use std::fmt;
use std::time::Duration;

/// Ends any motion. Also sent unconditionally at the end of a timed move.
pub const STOP_BYTE: u8 = b'X';
pub const MIN_SPEED: i32 = 0;
pub const MAX_SPEED: i32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
    ];

    /// Firmware contract; do not change without a matching firmware change.
    pub fn protocol_byte(self) -> u8 {
        match self {
            Direction::Forward => b'U',
            Direction::Backward => b'D',
            Direction::Left => b'L',
            Direction::Right => b'R',
        }
    }

    /// Lower-case name used by callers and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Human-readable label for status messages.
    pub fn label(self) -> &'static str {
        match self {
            Direction::Forward => "Forward",
            Direction::Backward => "Backward",
            Direction::Left => "Left turn",
            Direction::Right => "Right turn",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Move {
        direction: Direction,
        duration: Duration,
    },
    Stop,
    /// Only 0..=9 is valid; anything else is rejected before reaching the wire.
    SetSpeed(i32),
}

impl Command {
    pub fn move_for(direction: Direction, duration: Duration) -> Self {
        Command::Move {
            direction,
            duration,
        }
    }

    /// The byte this command puts on the wire, or `None` for an out-of-range
    /// speed.
    pub fn protocol_byte(&self) -> Option<u8> {
        match *self {
            Command::Move { direction, .. } => Some(direction.protocol_byte()),
            Command::Stop => Some(STOP_BYTE),
            Command::SetSpeed(level) => speed_byte(level),
        }
    }
}

/// Decimal digit for a speed level.
pub fn speed_byte(level: i32) -> Option<u8> {
    if (MIN_SPEED..=MAX_SPEED).contains(&level) {
        Some(b'0' + level as u8)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_encoding_is_fixed() {
        let bytes: Vec<u8> = Direction::ALL.iter().map(|d| d.protocol_byte()).collect();
        assert_eq!(bytes, b"UDLR");
        assert_eq!(Command::Stop.protocol_byte(), Some(b'X'));
        assert_eq!(
            Command::move_for(Direction::Left, Duration::from_secs(1)).protocol_byte(),
            Some(b'L')
        );
    }

    #[test]
    fn speed_levels_map_to_digits() {
        for level in 0..=9 {
            assert_eq!(
                Command::SetSpeed(level).protocol_byte(),
                Some(char::from_digit(level as u32, 10).unwrap() as u8)
            );
        }
        assert_eq!(speed_byte(-1), None);
        assert_eq!(speed_byte(10), None);
        assert_eq!(Command::SetSpeed(12).protocol_byte(), None);
    }
}
