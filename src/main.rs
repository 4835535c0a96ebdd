use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use car_remote::proto::parser::{coerce_seconds, coerce_speed, parse_steps};
use car_remote::{Direction, RemoteController, SerialTransport};

mod cli;
mod console;

fn main() -> Result<()> {
    // stdout carries command results, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Cli::parse();
    let rc = RemoteController::with_transport(
        args.ser.link_config(),
        SerialTransport::new(),
        args.ser.pulse_timing(),
    );

    let result = run(&rc, args.cmd);
    rc.close();
    rc.stats().log();
    result
}

fn run(rc: &RemoteController, cmd: cli::Cmd) -> Result<()> {
    use cli::Cmd;
    match cmd {
        Cmd::Forward(m) => move_for(rc, Direction::Forward, &m.secs),
        Cmd::Backward(m) => move_for(rc, Direction::Backward, &m.secs),
        Cmd::Left(m) => move_for(rc, Direction::Left, &m.secs),
        Cmd::Right(m) => move_for(rc, Direction::Right, &m.secs),
        Cmd::Stop => {
            println!("{}", rc.stop()?);
            Ok(())
        }
        Cmd::Speed { level } => {
            println!("{}", rc.set_speed(coerce_speed(&level)?)?);
            Ok(())
        }
        Cmd::Run {
            command,
            duration,
            speed,
        } => {
            let report = rc
                .run(&command, duration.as_deref(), speed.as_deref())
                .with_context(|| format!("run {command}"))?;
            println!("{report}");
            Ok(())
        }
        Cmd::Seq { steps } => {
            let cmds = parse_steps(steps.iter().map(String::as_str))?;
            match rc.execute_sequence(&cmds) {
                Ok(done) => {
                    done.iter().for_each(|m| println!("{m}"));
                    Ok(())
                }
                Err(e) => {
                    e.completed.iter().for_each(|m| println!("{m}"));
                    Err(e.into())
                }
            }
        }
        Cmd::Console => {
            let stdin = std::io::stdin();
            console::run(rc, &mut stdin.lock(), &mut std::io::stdout())
        }
    }
}

fn move_for(rc: &RemoteController, direction: Direction, raw: &str) -> Result<()> {
    let secs = coerce_seconds(raw).with_context(|| format!("{direction} duration"))?;
    println!("{}", rc.move_for(direction, secs)?);
    Ok(())
}
