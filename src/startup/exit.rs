// Exit handler: the single sink for startup failures

use chrono::{DateTime, SecondsFormat, Utc};
use std::io::Write;
use std::process::ExitCode;
use std::sync::Mutex;

use crate::core::errors::StartupError;

/// Clock used to timestamp the failure line
pub type Clock = fn() -> DateTime<Utc>;

/// Writes one line per failure and decides the process exit status
///
/// No other component terminates the process: `main` returns the `ExitCode`
/// produced here.
pub struct ExitHandler<W: Write> {
    sink: Mutex<W>,
    clock: Clock,
}

impl ExitHandler<std::io::Stderr> {
    /// Handler writing to standard error with the system clock
    pub fn stderr() -> Self {
        Self::using(std::io::stderr(), Utc::now)
    }
}

impl<W: Write> ExitHandler<W> {
    pub fn using(sink: W, clock: Clock) -> Self {
        Self {
            sink: Mutex::new(sink),
            clock,
        }
    }

    /// Format the failure line: timestamp, stage tag, cause chain
    pub fn describe(&self, err: &StartupError) -> String {
        let timestamp = (self.clock)().to_rfc3339_opts(SecondsFormat::Millis, true);
        format!(
            "{} level=error stage={} error=\"{}\"",
            timestamp,
            err.tag(),
            err.chain().join(": caused by: ")
        )
    }

    /// Exit status for the failure (always nonzero)
    pub fn status(&self, err: &StartupError) -> u8 {
        err.stage.exit_code()
    }

    /// Log the failure and return the exit code for `main`
    pub fn handle(&self, err: &StartupError) -> ExitCode {
        let line = self.describe(err);
        if let Ok(mut sink) = self.sink.lock() {
            // Nothing is left to report a failed write to
            let _ = writeln!(sink, "{}", line);
            let _ = sink.flush();
        }
        ExitCode::from(self.status(err))
    }

    pub fn into_sink(self) -> W {
        match self.sink.into_inner() {
            Ok(sink) => sink,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
