// lazy_regex! statics are validated at compile time
#![allow(clippy::non_std_lazy_statics)]

use dotenvy::dotenv;
use lazy_regex::lazy_regex;
use repeat_echo::bot::run_bot;
use repeat_echo::config::{RepeatConfig, Settings};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Bot token inside an API URL: https://api.telegram.org/bot<token>/
static RE_TOKEN_URL: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)");

/// Bare bot token
static RE_TOKEN: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})");

/// Token with a `bot` prefix
static RE_TOKEN_PREFIXED: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+");

fn redact(input: &str) -> String {
    let output = RE_TOKEN_URL.replace_all(input, "$1[TELEGRAM_TOKEN]$3");
    let output = RE_TOKEN.replace_all(&output, "[TELEGRAM_TOKEN]");
    RE_TOKEN_PREFIXED
        .replace_all(&output, "$1[TELEGRAM_TOKEN]")
        .into_owned()
}

struct RedactingWriter<W: Write> {
    inner: W,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        self.inner.write_all(redact(&s).as_bytes())?;
        // Report the original length even if redaction changed it.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: (self.make_inner)(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    init_logging();

    info!("Starting repeat echo bot...");

    let settings = init_settings();
    let config = Arc::new(RepeatConfig::from_env());

    run_bot(settings, config).await;

    Ok(())
}

fn init_logging() {
    let make_writer = RedactingMakeWriter {
        make_inner: io::stderr,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::redact;

    #[test]
    fn redacts_token_in_api_url() {
        let line = "GET https://api.telegram.org/bot123456789:AAE-secret_token/sendMessage";
        let redacted = redact(line);
        assert!(!redacted.contains("AAE-secret_token"));
        assert!(redacted.contains("[TELEGRAM_TOKEN]"));
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(redact("echo triggered"), "echo triggered");
    }
}
