//! Line-oriented progress streams

use futures::stream::{self, BoxStream, Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

// Lines buffered ahead of a slow consumer before the driver waits
const PROGRESS_BUFFER: usize = 64;

/// Human-readable progress of a scrape, one newline-terminated line per item
///
/// The work behind the stream starts on the first poll and runs once; the
/// stream cannot be restarted. Dropping it stops the submission of new
/// article downloads, while downloads already running finish and are
/// recorded.
pub struct ProgressStream {
    inner: BoxStream<'static, String>,
}

impl ProgressStream {
    /// Run `drive` in its own task once the stream is first polled
    pub(crate) fn spawn<F, Fut>(token: CancellationToken, drive: F) -> Self
    where
        F: FnOnce(Progress) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let inner = stream::once(async move {
            let (tx, rx) = mpsc::channel(PROGRESS_BUFFER);
            tokio::spawn(drive(Progress { tx, token }));
            ReceiverStream::new(rx)
        })
        .flatten()
        .boxed();

        Self { inner }
    }

    /// A stream that yields a single line and does no work
    pub(crate) fn message(line: impl Into<String>) -> Self {
        let line = terminate(line.into());
        Self {
            inner: stream::once(async move { line }).boxed(),
        }
    }
}

impl Stream for ProgressStream {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// Sending half held by the task driving a scrape
#[derive(Clone)]
pub(crate) struct Progress {
    tx: mpsc::Sender<String>,
    token: CancellationToken,
}

impl Progress {
    /// Emit one line
    ///
    /// A consumer that went away cancels this run's token.
    pub(crate) async fn line(&self, line: impl Into<String>) {
        if self.tx.send(terminate(line.into())).await.is_err() && !self.token.is_cancelled() {
            tracing::info!("Progress consumer dropped, no new work will be started");
            self.token.cancel();
        }
    }

    /// Whether new work should no longer be started
    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once new work should no longer be started
    pub(crate) async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// The token checked before each unit of work
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }
}

fn terminate(mut line: String) -> String {
    if !line.ends_with('\n') {
        line.push('\n');
    }
    line
}
