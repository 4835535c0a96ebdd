use anyhow::Result;
use std::io::{BufRead, Write};

use car_remote::proto::parser::{coerce_seconds, coerce_speed};
use car_remote::{Direction, RemoteController, Transport};

const MENU: &str = "\nAvailable Commands:
1. Move Forward
2. Move Backward
3. Turn Left
4. Turn Right
5. Stop
6. Set Speed
7. Exit
";

/// Numbered-menu console for poking the car by hand. Returns on `7` or EOF.
pub fn run<T: Transport>(
    rc: &RemoteController<T>,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    writeln!(out, "Remote Controller Test Interface")?;
    writeln!(out, "-------------------------------")?;

    loop {
        write!(out, "{MENU}\nEnter command number: ")?;
        out.flush()?;
        let Some(choice) = read_line(input)? else {
            break;
        };

        let result = match choice.as_str() {
            "7" => {
                writeln!(out, "Exiting test interface...")?;
                break;
            }
            "1" | "2" | "3" | "4" => {
                let direction = match choice.as_str() {
                    "1" => Direction::Forward,
                    "2" => Direction::Backward,
                    "3" => Direction::Left,
                    _ => Direction::Right,
                };
                write!(out, "Enter duration in seconds: ")?;
                out.flush()?;
                let Some(raw) = read_line(input)? else {
                    break;
                };
                match coerce_seconds(&raw) {
                    Ok(secs) => rc.move_for(direction, secs),
                    Err(e) => Err(e.into()),
                }
            }
            "5" => rc.stop(),
            "6" => {
                write!(out, "Enter speed (0-9): ")?;
                out.flush()?;
                let Some(raw) = read_line(input)? else {
                    break;
                };
                match coerce_speed(&raw) {
                    Ok(level) => rc.set_speed(level),
                    Err(e) => Err(e.into()),
                }
            }
            _ => {
                writeln!(out, "Invalid command number")?;
                continue;
            }
        };

        match result {
            Ok(msg) => writeln!(out, "{msg}")?,
            Err(e) => writeln!(out, "Error: {e}")?,
        }
    }
    Ok(())
}

fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use car_remote::mock::MockTransport;
    use car_remote::{LinkConfig, PulseTiming};
    use std::io::Cursor;
    use std::time::Duration;

    fn session(script: &str) -> (String, Vec<u8>) {
        let mock = MockTransport::new();
        let cfg = LinkConfig::new("mock0", 115_200)
            .with_settle(Duration::ZERO)
            .with_write_spacing(Duration::ZERO);
        let rc = RemoteController::with_transport(cfg, mock.clone(), PulseTiming::default());
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut out = Vec::new();
        run(&rc, &mut input, &mut out).unwrap();
        (String::from_utf8(out).unwrap(), mock.written())
    }

    #[test]
    fn drives_car_from_menu() {
        let (out, written) = session("6\n4\n1\n0.05\n5\n7\n");
        assert!(out.contains("Speed set to 4"));
        assert!(out.contains("Forward complete"));
        assert!(out.contains("Stop complete"));
        assert!(out.contains("Exiting test interface..."));
        assert_eq!(written, b"4UXX");
    }

    #[test]
    fn bad_input_keeps_console_running() {
        let (out, written) = session("9\n6\n12\n3\nsoon\n");
        assert!(out.contains("Invalid command number"));
        assert!(out.contains("Error: invalid argument"));
        assert!(out.contains("Error: invalid number for duration"));
        assert!(written.is_empty());
    }
}
