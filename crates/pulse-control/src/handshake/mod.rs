//! Bounded-time handshake with a freshly started plugin.
//!
//! [`wait_for_response`] runs three activities for the duration of one call:
//!
//! - a timeout watcher that terminates the process when the deadline passes
//!   before the process exits;
//! - a response reader that parses the first line of the plugin's output,
//!   reports it, and then discards the rest until end of stream;
//! - the calling thread, blocked until the process exits.
//!
//! The watcher runs on a scoped thread. The reader runs detached because
//! the output pipe may outlive the plugin: a helper that left the plugin's
//! process group can keep it open indefinitely. Once the process has exited
//! the caller waits for the reader's first-line outcome only for what is
//! left of the deadline; if none arrives the handshake times out and the
//! reader is left to finish draining on its own.
//!
//! The collected outcomes are resolved with a fixed precedence: a malformed
//! response or unreadable stream wins over a timeout, which wins over an
//! unsuccessful exit, which wins over a parsed response.

use std::io::{self, BufRead, BufReader, Read};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{ExecutorError, HandshakeError};
use crate::executor::ProcessExecutor;
use crate::protocol::HandshakeResponse;

/// Tracing target for handshake operations.
pub(crate) const HANDSHAKE_TARGET: &str = "pulse_control::handshake";

/// Longest first line accepted before the response is declared malformed.
const MAX_RESPONSE_BYTES: u64 = 1024 * 1024;

/// Minimum wait for the reader after exit, so a line written just before a
/// deadline kill is still seen.
const READER_GRACE: Duration = Duration::from_millis(100);

/// Waits for the handshake response of a started plugin.
///
/// Blocks until the process has exited, either on its own or because the
/// timeout terminated it, and then for at most the rest of the deadline
/// while the first line is read. On return the process has been terminated
/// and reaped; only the output drain may still be running.
///
/// A [`HandshakeResponse::Failure`] is returned as a payload; interpreting
/// it is left to the caller.
///
/// # Errors
///
/// Returns [`HandshakeError::MalformedResponse`] or
/// [`HandshakeError::Stream`] when the first line cannot be read or parsed,
/// [`HandshakeError::Timeout`] when the deadline passes first or the output
/// stays open without a complete first line,
/// [`HandshakeError::ProcessExit`] when the process exits unsuccessfully or
/// without writing anything, and [`HandshakeError::OutputUnavailable`] when
/// the output stream cannot be obtained. [`HandshakeError::Stream`] is also
/// returned if the reader thread cannot be started.
pub fn wait_for_response<E>(executor: &E, timeout: Duration) -> Result<HandshakeResponse, HandshakeError>
where
    E: ProcessExecutor + ?Sized,
{
    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    let pid = executor.pid();

    let stream = match executor.output_stream() {
        Ok(stream) => stream,
        Err(source) => {
            warn!(
                target: HANDSHAKE_TARGET,
                ?pid,
                error = %source,
                "plugin output unavailable, terminating process"
            );
            abort(executor, pid);
            return Err(HandshakeError::OutputUnavailable { source });
        }
    };

    debug!(target: HANDSHAKE_TARGET, ?pid, timeout_ms, "waiting for handshake");
    let started = Instant::now();
    let (report, first_line) = mpsc::sync_channel(1);
    let spawned = thread::Builder::new()
        .name(String::from("pulse-handshake-reader"))
        .spawn(move || read_response(stream, &report));
    if let Err(source) = spawned {
        warn!(
            target: HANDSHAKE_TARGET,
            ?pid,
            error = %source,
            "could not start response reader, terminating process"
        );
        abort(executor, pid);
        return Err(HandshakeError::Stream {
            source: Arc::new(source),
        });
    }

    let (timed_out, exit) = thread::scope(|scope| {
        let (cancel, cancelled) = mpsc::channel::<()>();
        let watcher = scope.spawn(move || watch_timeout(executor, &cancelled, timeout, timeout_ms));

        let exit = executor.await_exit();
        drop(cancel);
        // Leftover group members may still hold the output pipe open.
        terminate_quietly(executor, pid);
        (watcher.join().unwrap_or(false), exit)
    });

    let budget = timeout.saturating_sub(started.elapsed()).max(READER_GRACE);
    let read = match first_line.recv_timeout(budget) {
        Ok(outcome) => Some(outcome),
        Err(RecvTimeoutError::Timeout) => {
            warn!(
                target: HANDSHAKE_TARGET,
                ?pid,
                timeout_ms,
                "plugin output still open after exit, abandoning response reader"
            );
            None
        }
        Err(RecvTimeoutError::Disconnected) => Some(ReadOutcome::Failed(io::Error::other(
            "response reader stopped without reporting",
        ))),
    };
    let outcomes = Outcomes {
        read,
        timed_out,
        exit,
    };

    let resolved = outcomes.resolve(timeout_ms);
    match &resolved {
        Ok(response) => debug!(
            target: HANDSHAKE_TARGET,
            ?pid,
            success = response.is_success(),
            "handshake response received"
        ),
        Err(error) => debug!(target: HANDSHAKE_TARGET, ?pid, %error, "handshake failed"),
    }
    resolved
}

/// Terminates and reaps a process whose handshake cannot proceed.
fn abort<E: ProcessExecutor + ?Sized>(executor: &E, pid: Option<u32>) {
    terminate_quietly(executor, pid);
    if let Err(error) = executor.await_exit() {
        debug!(target: HANDSHAKE_TARGET, ?pid, %error, "plugin exit after abort");
    }
}

fn terminate_quietly<E: ProcessExecutor + ?Sized>(executor: &E, pid: Option<u32>) {
    if let Err(error) = executor.terminate() {
        warn!(target: HANDSHAKE_TARGET, ?pid, %error, "failed to terminate plugin");
    }
}

/// Returns `true` when the deadline passed and the process was terminated.
fn watch_timeout<E: ProcessExecutor + ?Sized>(
    executor: &E,
    cancelled: &Receiver<()>,
    timeout: Duration,
    timeout_ms: u64,
) -> bool {
    match cancelled.recv_timeout(timeout) {
        Err(RecvTimeoutError::Timeout) => {
            let pid = executor.pid();
            warn!(
                target: HANDSHAKE_TARGET,
                ?pid,
                timeout_ms,
                "handshake timed out, terminating plugin"
            );
            terminate_quietly(executor, pid);
            true
        }
        Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
    }
}

/// What the response reader found on the output stream.
#[derive(Debug)]
enum ReadOutcome {
    /// The first line parsed as a response.
    Response(HandshakeResponse),
    /// The first line was not a valid response.
    Malformed(serde_json::Error),
    /// Reading the first line failed.
    Failed(io::Error),
    /// The stream ended before any byte arrived.
    Empty,
}

/// Reports the first-line outcome, then drains the stream until it closes.
fn read_response(stream: Box<dyn Read + Send>, report: &SyncSender<ReadOutcome>) {
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    let outcome = match (&mut reader)
        .take(MAX_RESPONSE_BYTES)
        .read_until(b'\n', &mut line)
    {
        Ok(0) => ReadOutcome::Empty,
        Ok(_) => match serde_json::from_slice(&line) {
            Ok(response) => ReadOutcome::Response(response),
            Err(error) => ReadOutcome::Malformed(error),
        },
        Err(error) => ReadOutcome::Failed(error),
    };
    if report.send(outcome).is_err() {
        debug!(target: HANDSHAKE_TARGET, "handshake already resolved without the response");
    }

    // Only the first line counts; the rest is drained so the plugin never
    // blocks on a full pipe.
    match io::copy(&mut reader, &mut io::sink()) {
        Ok(0) => {}
        Ok(discarded) => debug!(
            target: HANDSHAKE_TARGET,
            discarded,
            "ignored output after handshake response"
        ),
        Err(error) => debug!(target: HANDSHAKE_TARGET, %error, "stopped draining plugin output"),
    }
}

/// Everything the three activities reported for one handshake.
#[derive(Debug)]
struct Outcomes {
    /// `None` when the reader had not reported by the deadline.
    read: Option<ReadOutcome>,
    timed_out: bool,
    exit: Result<(), ExecutorError>,
}

impl Outcomes {
    fn resolve(self, timeout_ms: u64) -> Result<HandshakeResponse, HandshakeError> {
        let Some(read) = self.read else {
            return Err(HandshakeError::Timeout { timeout_ms });
        };
        let response = match read {
            ReadOutcome::Malformed(source) => {
                return Err(HandshakeError::MalformedResponse {
                    message: source.to_string(),
                    source,
                });
            }
            ReadOutcome::Failed(source) => {
                return Err(HandshakeError::Stream {
                    source: Arc::new(source),
                });
            }
            ReadOutcome::Response(response) => Some(response),
            ReadOutcome::Empty => None,
        };

        if self.timed_out {
            return Err(HandshakeError::Timeout { timeout_ms });
        }
        if let Err(source) = self.exit {
            return Err(HandshakeError::ProcessExit {
                message: source.to_string(),
                source: Some(source),
            });
        }
        response.ok_or_else(|| HandshakeError::ProcessExit {
            message: String::from("plugin exited without writing a handshake response"),
            source: None,
        })
    }
}
