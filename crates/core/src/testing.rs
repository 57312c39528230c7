use std::{cell::RefCell, time::Duration};

use crate::runner::{Capture, CommandLine, CommandOutcome, CommandResult, CommandRunner};

/// Answers every command from a closure and remembers what was asked.
pub(crate) struct ScriptedRunner<F> {
    respond: F,
    calls: RefCell<Vec<(CommandLine, Duration)>>,
}

impl<F> ScriptedRunner<F>
where
    F: Fn(&CommandLine) -> CommandOutcome,
{
    pub(crate) fn new(respond: F) -> Self {
        Self {
            respond,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<CommandLine> {
        self.calls.borrow().iter().map(|(c, _)| c.clone()).collect()
    }

    pub(crate) fn limits(&self) -> Vec<Duration> {
        self.calls.borrow().iter().map(|(_, l)| *l).collect()
    }
}

impl<F> CommandRunner for ScriptedRunner<F>
where
    F: Fn(&CommandLine) -> CommandOutcome,
{
    async fn run(
        &self,
        command: &CommandLine,
        limit: Duration,
        _capture: Capture,
    ) -> CommandOutcome {
        self.calls.borrow_mut().push((command.clone(), limit));
        (self.respond)(command)
    }

    async fn run_streaming(
        &self,
        command: &CommandLine,
        limit: Duration,
        on_line: &mut dyn FnMut(&str),
    ) -> CommandOutcome {
        let outcome = self.run(command, limit, Capture::Piped).await;
        if let CommandOutcome::Completed(result) = &outcome {
            for line in result.stdout.lines() {
                on_line(line);
            }
        }
        outcome
    }
}

pub(crate) fn completed(exit_status: i32, stdout: &str, stderr: &str) -> CommandOutcome {
    CommandOutcome::Completed(CommandResult {
        exit_status,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    })
}

pub(crate) fn program_of(command: &CommandLine) -> String {
    command.program().to_string_lossy().into_owned()
}
