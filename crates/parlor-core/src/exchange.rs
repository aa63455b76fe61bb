//! Exchange driver: one request/response cycle with a live display.
//!
//! ```text
//! line stream ─▶ EventParser ─▶ Transcript ─▶ render() ─▶ DisplaySurface
//! ```
//!
//! Every piece of mutable state of an exchange lives in its
//! [`ExchangeContext`]. Nothing is shared between exchanges.

use futures_util::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, ClientResult};
use crate::events::{EventParser, ServerEvent, Transcript};
use crate::markdown::{self, RenderedMarkup};

/// Markup shown in place of the reply when an exchange fails.
pub const FAILURE_MARKUP: &str =
    "<p><strong>Sorry, an error occurred. Please try again.</strong></p>";

/// Where an exchange shows its progress.
pub trait DisplaySurface {
    /// Replaces the in-progress reply with a fresh render of the transcript.
    fn render(&mut self, markup: &RenderedMarkup);

    /// Shows a backend status line. Ignored by default.
    fn status(&mut self, _text: &str) {}

    /// Puts the reply into the failure state.
    fn fail(&mut self, markup: &RenderedMarkup, error: &ClientError);
}

/// How an exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    Completed {
        transcript: Transcript,
        markup: RenderedMarkup,
        /// False when the stream closed without a `done` event.
        saw_done: bool,
    },
    /// Cancelled before completion; the partial reply was discarded.
    Cancelled,
}

/// State owned by one in-flight exchange.
///
/// Dropping the context cancels its token.
#[derive(Debug)]
pub struct ExchangeContext {
    chat_id: String,
    parser: EventParser,
    cancel: CancellationToken,
}

impl ExchangeContext {
    pub fn new(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            parser: EventParser::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    /// A handle that cancels this exchange from elsewhere (signal handler,
    /// watchdog, UI).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn transcript(&self) -> &Transcript {
        self.parser.transcript()
    }
}

impl Drop for ExchangeContext {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Markup for the failure state.
pub fn failure_markup() -> RenderedMarkup {
    RenderedMarkup::from_trusted(FAILURE_MARKUP)
}

/// Runs an exchange to completion.
///
/// Reads until `done`, end of stream, cancellation or a transport error.
/// Each `text` event re-renders the whole transcript.
///
/// # Errors
/// Returns the transport error after showing the failure state on `surface`.
pub async fn drive<S, D>(
    mut ctx: ExchangeContext,
    mut lines: S,
    surface: &mut D,
) -> ClientResult<ExchangeOutcome>
where
    S: Stream<Item = ClientResult<String>> + Unpin,
    D: DisplaySurface + ?Sized,
{
    let cancel = ctx.cancellation_token();
    let mut markup = RenderedMarkup::default();
    let mut saw_done = false;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::info!(
                    chat_id = %ctx.chat_id,
                    bytes = ctx.transcript().len(),
                    "exchange cancelled"
                );
                return Ok(ExchangeOutcome::Cancelled);
            }
            next = lines.next() => next,
        };

        let line = match next {
            Some(Ok(line)) => line,
            Some(Err(err)) => {
                tracing::warn!(chat_id = %ctx.chat_id, error = %err, "exchange failed");
                surface.fail(&failure_markup(), &err);
                return Err(err);
            }
            None => break,
        };

        match ctx.parser.feed_line(&line) {
            Some(ServerEvent::Text { .. }) => {
                markup = markdown::render(ctx.parser.transcript().as_str());
                surface.render(&markup);
            }
            Some(ServerEvent::Status { payload }) => surface.status(&payload),
            Some(ServerEvent::Done) => {
                saw_done = true;
                break;
            }
            Some(ServerEvent::Unrecognized { .. }) | None => {}
        }
    }

    if !saw_done {
        tracing::warn!(chat_id = %ctx.chat_id, "stream closed without a done event");
    }
    let malformed = ctx.parser.malformed_count();
    let transcript = std::mem::take(&mut ctx.parser).into_transcript();
    tracing::info!(
        chat_id = %ctx.chat_id,
        bytes = transcript.len(),
        malformed,
        saw_done,
        "exchange finished"
    );

    Ok(ExchangeOutcome::Completed {
        transcript,
        markup,
        saw_done,
    })
}
