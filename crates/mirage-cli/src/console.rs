use std::io::BufRead;

use mirage_core::{GenderMode, ThemeKind};
use tokio::sync::mpsc;

/// Operator commands typed on stdin while the visualiser runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Analyze,
    NextTheme,
    NextGender,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "a" | "analyze" | "scan" => Some(Command::Analyze),
            "t" | "theme" => Some(Command::NextTheme),
            "g" | "gender" => Some(Command::NextGender),
            "q" | "quit" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

pub const HELP: &str = "commands: [a]nalyze, [t]heme, [g]ender, [q]uit";

/// Read stdin on a plain thread and forward parsed commands.
///
/// The thread is detached; it ends at EOF or once the receiver is dropped.
pub fn spawn_console() -> mpsc::UnboundedReceiver<Command> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("mirage-console".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match Command::parse(&line) {
                    Some(command) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    None => eprintln!("{HELP}"),
                }
            }
            tracing::debug!("console closed");
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "console unavailable");
    }
    rx
}

pub fn next_theme(current: ThemeKind) -> ThemeKind {
    cycle(&ThemeKind::ALL, current)
}

pub fn next_gender(current: GenderMode) -> GenderMode {
    cycle(&GenderMode::ALL, current)
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T) -> T {
    let at = all.iter().position(|v| *v == current).unwrap_or(0);
    all[(at + 1) % all.len()]
}
