//! Scroll and control commands from stdin.
//!
//! One command per line. A reader thread parses lines and forwards commands
//! to the pipeline over an unbounded tokio channel. EOF counts as `quit`.

use log::{debug, info, warn};
use std::io::{self, BufRead};
use std::thread;
use tokio::sync::mpsc::{self, UnboundedReceiver};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    ScrollRows(i64),
    PageDown,
    PageUp,
    Top,
    Bottom,
    /// Absolute scroll offset.
    ScrollTo(f64),
    /// New viewport height, debounced before it applies.
    Resize(f64),
    Pause,
    Resume,
    Quit,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("{command} needs a number (got {value:?})")]
    BadNumber { command: &'static str, value: String },
}

/// Parse one input line. Blank lines are `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, InputError> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Ok(None);
    };
    let arg = parts.next();

    let cmd = match word {
        "j" | "down" => Command::ScrollRows(1),
        "k" | "up" => Command::ScrollRows(-1),
        "d" | "pgdn" => Command::PageDown,
        "u" | "pgup" => Command::PageUp,
        "g" | "top" => Command::Top,
        "G" | "bottom" => Command::Bottom,
        "scroll" => Command::ScrollTo(number("scroll", arg)?),
        "resize" => Command::Resize(number("resize", arg)?),
        "pause" => Command::Pause,
        "resume" => Command::Resume,
        "q" | "quit" => Command::Quit,
        other => return Err(InputError::Unknown(other.to_string())),
    };
    Ok(Some(cmd))
}

fn number(command: &'static str, arg: Option<&str>) -> Result<f64, InputError> {
    arg.and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| InputError::BadNumber {
            command,
            value: arg.unwrap_or_default().to_string(),
        })
}

/// Read commands from stdin on a background thread.
pub fn spawn_stdin_reader() -> io::Result<UnboundedReceiver<Command>> {
    let (tx, rx) = mpsc::unbounded_channel();

    thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                match parse_command(&line) {
                    Ok(Some(cmd)) => {
                        debug!("Input command: {:?}", cmd);
                        if tx.send(cmd).is_err() {
                            return;
                        }
                        if cmd == Command::Quit {
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Ignoring input: {}", e),
                }
            }
            info!("stdin closed, quitting");
            let _ = tx.send(Command::Quit);
        })?;

    Ok(rx)
}
