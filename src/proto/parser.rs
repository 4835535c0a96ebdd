// Argument coercion at the boundary between loosely-typed callers (agent
// tools, the console, the command line) and the dispatcher.
use std::{str::FromStr, time::Duration};

use thiserror::Error;

use super::command::{Command, Direction};

#[derive(Debug, Error, PartialEq)]
pub enum ArgumentError {
    #[error("empty value for {0}")]
    Empty(&'static str),
    #[error("invalid number for {0}: {1}")]
    NotANumber(&'static str, String),
    #[error("{0} must be finite: {1}")]
    NotFinite(&'static str, String),
    #[error("{0} must be a whole number: {1}")]
    NotAnInteger(&'static str, String),
    #[error("duration out of range: {0}")]
    OutOfRange(String),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    #[error("duration required for {0}")]
    MissingDuration(String),
    #[error("malformed step: {0}")]
    BadStep(String),
}

/// Turns raw input into seconds. Accepts plain numbers and text with an
/// embedded number (`"2.5 seconds"`); never falls back to a default.
pub fn coerce_seconds(raw: &str) -> Result<f64, ArgumentError> {
    coerce_number("duration", raw)
}

/// Turns raw input into a speed level. Range is checked by the dispatcher.
pub fn coerce_speed(raw: &str) -> Result<i32, ArgumentError> {
    let v = coerce_number("speed", raw)?;
    if v.fract() != 0.0 {
        return Err(ArgumentError::NotAnInteger("speed", raw.trim().to_string()));
    }
    Ok(v as i32)
}

/// Zero and negative durations collapse to `Duration::ZERO` (a no-op move).
pub fn seconds_to_duration(secs: f64) -> Result<Duration, ArgumentError> {
    if !secs.is_finite() {
        return Err(ArgumentError::NotFinite("duration", secs.to_string()));
    }
    if secs <= 0.0 {
        return Ok(Duration::ZERO);
    }
    Duration::try_from_secs_f64(secs).map_err(|_| ArgumentError::OutOfRange(secs.to_string()))
}

pub fn parse_direction(name: &str) -> Option<Direction> {
    Direction::from_str(name.trim()).ok()
}

/// Parses one `key=value` step: `forward=2`, `left=0.5`, `speed=5`, `stop`.
pub fn parse_step(tok: &str) -> Result<Command, ArgumentError> {
    let tok = tok.trim();
    if tok.is_empty() {
        return Err(ArgumentError::Empty("step"));
    }
    let mut it = tok.splitn(2, '=');
    let key = it.next().unwrap_or_default().to_ascii_lowercase();
    let value = it.next();

    match (key.as_str(), value) {
        ("stop", None) => Ok(Command::Stop),
        ("speed", Some(v)) => Ok(Command::SetSpeed(coerce_speed(v)?)),
        (name, Some(v)) => {
            let direction =
                parse_direction(name).ok_or_else(|| ArgumentError::UnknownCommand(name.into()))?;
            let duration = seconds_to_duration(coerce_seconds(v)?)?;
            Ok(Command::move_for(direction, duration))
        }
        (name, None) if parse_direction(name).is_some() => {
            Err(ArgumentError::MissingDuration(name.into()))
        }
        _ => Err(ArgumentError::BadStep(tok.to_string())),
    }
}

pub fn parse_steps<'a>(
    tokens: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<Command>, ArgumentError> {
    tokens.into_iter().map(parse_step).collect()
}

/// Inverse of [`parse_step`], for logs and echoing a sequence back.
pub fn format_step(cmd: &Command) -> String {
    match cmd {
        Command::Move {
            direction,
            duration,
        } => format!("{}={}", direction.name(), duration.as_secs_f64()),
        Command::Stop => "stop".to_string(),
        Command::SetSpeed(level) => format!("speed={level}"),
    }
}

/* ---------- helpers ---------- */

fn coerce_number(field: &'static str, raw: &str) -> Result<f64, ArgumentError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(ArgumentError::Empty(field));
    }
    let v = match s.parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            extract_number(s).ok_or_else(|| ArgumentError::NotANumber(field, s.to_string()))?
        }
    };
    if !v.is_finite() {
        return Err(ArgumentError::NotFinite(field, s.to_string()));
    }
    Ok(v)
}

/// First decimal run in `s` (`"go 2.5s"` -> 2.5). A sign directly in front
/// of it is kept (`"-2 s"` -> -2.0).
fn extract_number(s: &str) -> Option<f64> {
    let b = s.as_bytes();
    let is_digit = |i: usize| b.get(i).is_some_and(u8::is_ascii_digit);
    let digits = (0..b.len()).find(|&i| is_digit(i) || (b[i] == b'.' && is_digit(i + 1)))?;
    let start = match digits.checked_sub(1).map(|i| b[i]) {
        Some(b'-' | b'+') => digits - 1,
        _ => digits,
    };
    let mut end = digits;
    while is_digit(end) {
        end += 1;
    }
    if b.get(end) == Some(&b'.') && is_digit(end + 1) {
        end += 1;
        while is_digit(end) {
            end += 1;
        }
    }
    s[start..end].parse().ok()
}

impl FromStr for Direction {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" => Ok(Direction::Forward),
            "backward" => Ok(Direction::Backward),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            _ => Err(()),
        }
    }
}

/* ---------- tests ---------- */
