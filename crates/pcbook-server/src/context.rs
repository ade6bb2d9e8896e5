//! Per-call cancellation and deadline tracking.
//!
//! tonic drops a unary handler's future when the peer goes away, but
//! streaming handlers run in spawned tasks and must notice on their own.
//! A [`CallContext`] carries the call's cancellation token and the deadline
//! derived from the `grpc-timeout` header, and every streaming loop polls it
//! before each unit of work.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tonic::Status;
use tonic::metadata::MetadataMap;

/// Metadata key carrying the caller's timeout.
const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Why a call stopped before finishing its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    #[error("request was cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl From<Interrupted> for Status {
    fn from(reason: Interrupted) -> Self {
        match reason {
            Interrupted::Cancelled => Status::cancelled(reason.to_string()),
            Interrupted::DeadlineExceeded => Status::deadline_exceeded(reason.to_string()),
        }
    }
}

/// Cancellation token plus optional deadline for a single RPC.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from inbound metadata, honouring `grpc-timeout`.
    ///
    /// A missing or unparseable header means "no deadline".
    pub fn from_metadata(metadata: &MetadataMap) -> Self {
        let timeout = metadata
            .get(GRPC_TIMEOUT_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_grpc_timeout);
        match timeout {
            Some(timeout) => Self::new().with_timeout(timeout),
            None => Self::new(),
        }
    }

    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Signal that the caller has gone away.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fail fast if the call was cancelled or its deadline has passed.
    ///
    /// Cancellation takes precedence over an elapsed deadline.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.token.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupted::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Await `fut`, giving up early if the call is cancelled or times out.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        self.check()?;
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(Interrupted::Cancelled),
            () = deadline => Err(Interrupted::DeadlineExceeded),
            out = fut => Ok(out),
        }
    }

    /// Cancel this context once the receiving half of `tx` is dropped.
    ///
    /// Watching stops when the returned guard is dropped, releasing the
    /// watcher's clone of `tx` so the outbound stream can terminate.
    /// Must be called from within a tokio runtime.
    pub fn cancel_on_close<T: Send + 'static>(&self, tx: &mpsc::Sender<T>) -> DropGuard {
        let done = CancellationToken::new();
        let finished = done.clone();
        let token = self.token.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = tx.closed() => token.cancel(),
                () = finished.cancelled() => {}
            }
        });
        done.drop_guard()
    }
}

/// Parse a `grpc-timeout` header value: at most 8 ASCII digits followed by
/// one unit character (`H`, `M`, `S`, `m`, `u`, `n`).
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    let unit = value.chars().last()?;
    let digits = &value[..value.len() - unit.len_utf8()];
    if digits.is_empty() || digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;
    let timeout = match unit {
        'H' => Duration::from_secs(amount * 3600),
        'M' => Duration::from_secs(amount * 60),
        'S' => Duration::from_secs(amount),
        'm' => Duration::from_millis(amount),
        'u' => Duration::from_micros(amount),
        'n' => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(timeout)
}
