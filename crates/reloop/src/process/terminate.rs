//! Graceful/forced stop capability for child processes.
//!
//! On Unix a graceful stop is `SIGINT`, the same thing the developer's
//! Ctrl+C would send. Platforms without a deliverable interrupt implement
//! the graceful stop as an immediate forced stop.

use std::io;

use tokio::process::Child;

pub trait Terminate {
    /// Ask the process to shut down on its own.
    ///
    /// Returns `false` when the platform has no graceful signal and the
    /// process was force-stopped instead.
    fn graceful_stop(&mut self) -> io::Result<bool>;

    /// Kill the process without giving it a chance to clean up.
    fn force_stop(&mut self) -> io::Result<()>;
}

impl Terminate for Child {
    #[cfg(unix)]
    fn graceful_stop(&mut self) -> io::Result<bool> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        // Already reaped: nothing left to signal
        let Some(pid) = self.id() else {
            return Ok(true);
        };
        let pid = i32::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
        kill(Pid::from_raw(pid), Signal::SIGINT)?;
        Ok(true)
    }

    #[cfg(not(unix))]
    fn graceful_stop(&mut self) -> io::Result<bool> {
        self.force_stop()?;
        Ok(false)
    }

    fn force_stop(&mut self) -> io::Result<()> {
        self.start_kill()
    }
}
