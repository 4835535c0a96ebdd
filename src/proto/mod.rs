pub mod command;
pub mod parser;

pub use command::{Command, Direction, MAX_SPEED, MIN_SPEED, STOP_BYTE};
pub use parser::ArgumentError;
