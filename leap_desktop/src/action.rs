//! Desktop actions and the external commands that perform them.
//!
//! Commands are fire-and-forget: the runner waits for the process, logs
//! what happened, and never reports failure back to the dispatcher.

use std::fmt;
use std::process::Command;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ════════════════════════════════════════════════════════════════════════════
// Action
// ════════════════════════════════════════════════════════════════════════════

/// A desktop action a gesture can trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Switch to the virtual desktop on the left (Ctrl+Alt+Left).
    PreviousDesktop,
    /// Switch to the virtual desktop on the right (Ctrl+Alt+Right).
    NextDesktop,
    LockScreen,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::PreviousDesktop => "previous desktop",
            Action::NextDesktop     => "next desktop",
            Action::LockScreen      => "lock screen",
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ExternalCommand
// ════════════════════════════════════════════════════════════════════════════

/// An argv vector: program followed by its arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalCommand {
    pub argv: Vec<String>,
}

impl ExternalCommand {
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ExternalCommand { argv: argv.into_iter().map(Into::into).collect() }
    }

    /// `xte` invocation that holds `modifiers` down, taps `key`, and
    /// releases the modifiers in reverse order.
    pub fn xte_chord(modifiers: &[&str], key: &str) -> Self {
        let mut argv = vec!["xte".to_string()];
        argv.extend(modifiers.iter().map(|m| format!("keydown {m}")));
        argv.push(format!("key {key}"));
        argv.extend(modifiers.iter().rev().map(|m| format!("keyup {m}")));
        ExternalCommand { argv }
    }

    pub fn program(&self) -> Option<&str> {
        self.argv.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or(&[])
    }
}

impl fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quoted: Vec<String> = self.argv.iter()
            .map(|a| if a.contains(' ') { format!("\"{a}\"") } else { a.clone() })
            .collect();
        f.write_str(&quoted.join(" "))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CommandRunner — process / dry-run / recording backends
// ════════════════════════════════════════════════════════════════════════════

/// Executes external commands on behalf of the dispatcher.
pub trait CommandRunner: Send {
    fn run(&mut self, command: &ExternalCommand);
}

/// Spawns the command and blocks until it exits.  Exit status and spawn
/// errors are logged, nothing more.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&mut self, command: &ExternalCommand) {
        let Some(program) = command.program() else {
            warn!("Ignoring empty command");
            return;
        };
        debug!("Running {}", command);
        match Command::new(program).args(command.args()).status() {
            Ok(status) if status.success() => {}
            Ok(status) => debug!("{} exited with {}", program, status),
            Err(e)     => warn!("Failed to run {}: {}", program, e),
        }
    }
}

/// Logs each command instead of running it (`--dry-run`).
#[derive(Debug, Default)]
pub struct DryRunRunner;

impl CommandRunner for DryRunRunner {
    fn run(&mut self, command: &ExternalCommand) {
        info!("[dry-run] {}", command);
    }
}

/// Records every command; clones share the same log.
#[derive(Clone, Debug, Default)]
pub struct RecordingRunner {
    log: Arc<Mutex<Vec<ExternalCommand>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<ExternalCommand> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, command: &ExternalCommand) {
        if let Ok(mut log) = self.log.lock() {
            log.push(command.clone());
        }
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for Box<R> {
    fn run(&mut self, command: &ExternalCommand) {
        (**self).run(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chord_releases_in_reverse_order() {
        let cmd = ExternalCommand::xte_chord(&["Control_L", "Alt_L"], "Left");
        assert_eq!(
            cmd.argv,
            ["xte", "keydown Control_L", "keydown Alt_L", "key Left", "keyup Alt_L", "keyup Control_L"]
        );
    }

    #[test]
    fn program_and_args_split() {
        let cmd = ExternalCommand::new(["gnome-screensaver-command", "--lock"]);
        assert_eq!(cmd.program(), Some("gnome-screensaver-command"));
        assert_eq!(cmd.args(), ["--lock"]);

        let empty = ExternalCommand::new(Vec::<String>::new());
        assert_eq!(empty.program(), None);
        assert!(empty.args().is_empty());
    }

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let cmd = ExternalCommand::new(["xte", "key Left"]);
        assert_eq!(cmd.to_string(), "xte \"key Left\"");
    }

    #[test]
    fn recording_runner_clones_share_log() {
        let rec = RecordingRunner::new();
        let mut handle = rec.clone();
        handle.run(&ExternalCommand::new(["true"]));
        assert_eq!(rec.commands(), vec![ExternalCommand::new(["true"])]);
    }

    #[test]
    fn missing_program_is_ignored() {
        // Must not panic or propagate.
        ProcessRunner.run(&ExternalCommand::new(["/nonexistent/leap-desktop-test-binary"]));
        ProcessRunner.run(&ExternalCommand::new(Vec::<String>::new()));
    }
}
