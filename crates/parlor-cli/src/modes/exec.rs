//! Non-interactive exchange runner: reply on stdout, diagnostics on stderr.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use parlor_core::client::{AskRequest, BackendClient};
use parlor_core::error::ClientError;
use parlor_core::exchange::{
    self, DisplaySurface, ExchangeContext, ExchangeOutcome, failure_markup,
};
use parlor_core::markdown::RenderedMarkup;
use tokio_util::sync::CancellationToken;

use crate::interrupt::{self, InterruptedError};

pub struct ExecOptions {
    /// Print the raw transcript instead of markup.
    pub raw: bool,
    /// Print every intermediate render.
    pub watch: bool,
    /// Watchdog for the whole exchange.
    pub timeout: Option<Duration>,
}

/// Writes renders to stdout and status lines to stderr.
pub struct TerminalSurface<W: Write> {
    out: W,
    watch: bool,
    renders: usize,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, watch: bool) -> Self {
        Self {
            out,
            watch,
            renders: 0,
        }
    }

    fn write_block(&mut self, text: &str) {
        // A closed stdout (e.g. `| head`) must not abort the exchange.
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }
}

impl<W: Write> DisplaySurface for TerminalSurface<W> {
    fn render(&mut self, markup: &RenderedMarkup) {
        self.renders += 1;
        if self.watch {
            if self.renders > 1 {
                self.write_block("");
            }
            self.write_block(markup.as_str());
        }
    }

    fn status(&mut self, text: &str) {
        eprintln!("[status] {text}");
    }

    fn fail(&mut self, markup: &RenderedMarkup, error: &ClientError) {
        tracing::debug!(kind = %error.kind, details = ?error.details, "showing failure state");
        self.write_block(markup.as_str());
    }
}

/// Runs one exchange against the backend and prints the result.
pub async fn run_exec(
    client: &BackendClient,
    message: &str,
    chat_id: &str,
    options: &ExecOptions,
) -> Result<()> {
    let ctx = ExchangeContext::new(chat_id);
    let cancel = ctx.cancellation_token();
    interrupt::install(cancel.clone())?;
    let timed_out = options
        .timeout
        .map(|timeout| spawn_watchdog(cancel.clone(), timeout));

    let mut surface = TerminalSurface::new(std::io::stdout(), options.watch);
    let request = AskRequest::new(message, chat_id);

    let lines = tokio::select! {
        biased;
        () = cancel.cancelled() => None,
        result = client.ask(&request) => Some(result),
    };
    let outcome = match lines {
        None => ExchangeOutcome::Cancelled,
        Some(Err(err)) => {
            surface.fail(&failure_markup(), &err);
            return Err(err).context("ask failed");
        }
        Some(Ok(lines)) => exchange::drive(ctx, lines, &mut surface)
            .await
            .context("read reply")?,
    };

    match outcome {
        ExchangeOutcome::Completed {
            transcript,
            markup,
            saw_done,
        } => {
            if !saw_done {
                eprintln!("warning: reply ended without a done event");
            }
            if options.raw {
                surface.write_block(transcript.as_str());
            } else if !options.watch && !markup.is_empty() {
                surface.write_block(markup.as_str());
            }
            Ok(())
        }
        ExchangeOutcome::Cancelled => {
            if let (Some(timed_out), Some(timeout)) = (&timed_out, options.timeout)
                && timed_out.is_cancelled()
            {
                anyhow::bail!("Exchange timed out after {}s", timeout.as_secs());
            }
            eprintln!("Interrupted.");
            Err(InterruptedError.into())
        }
    }
}

/// Cancels `exchange` once `timeout` elapses. The returned token is
/// cancelled only if the watchdog fired.
fn spawn_watchdog(exchange: CancellationToken, timeout: Duration) -> CancellationToken {
    let fired = CancellationToken::new();
    let fired_flag = fired.clone();
    tokio::spawn(async move {
        tokio::select! {
            () = exchange.cancelled() => {}
            () = tokio::time::sleep(timeout) => {
                tracing::warn!(secs = timeout.as_secs(), "exchange watchdog fired");
                fired_flag.cancel();
                exchange.cancel();
            }
        }
    });
    fired
}
