use clap::Parser;
use dotenvy::dotenv;
use ecodash_core::config::BotSettings;
use ecodash_transport_telegram::config::{TelegramSettings, TransportSettings};
use ecodash_transport_telegram::runner::run_bot;
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

const DEFAULT_LOG_FILTER: &str =
    "ecodash_core=info,ecodash_transport_telegram=info,ecodash_telegram_bot=info,reqwest=warn,hyper=warn,h2=error,tokio=warn";

#[derive(Parser, Debug)]
#[command(name = "ecodash-telegram-bot")]
#[command(about = "Telegram bot for climate and COVID-19 statistics", long_about = None)]
struct Args {
    /// Telegram Bot API token
    #[arg(long = "apikey")]
    apikey: String,
}

/// Regex patterns for redacting bot tokens
struct RedactionPatterns {
    url_token: Regex,
    bare_token: Regex,
    prefixed_token: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            url_token: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            bare_token: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            prefixed_token: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let output = self
            .url_token
            .replace_all(input, "$1[TELEGRAM_TOKEN]$3");
        let output = self.bare_token.replace_all(&output, "[TELEGRAM_TOKEN]");
        self.prefixed_token
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .into_owned()
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        self.inner.write_all(self.patterns.redact(&s).as_bytes())?;
        // The caller's buffer was consumed in full even if the redacted text differs in length.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Exits with usage on a missing --apikey
    let args = Args::parse();

    dotenv().ok();

    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting ecodash Telegram bot...");

    let settings = init_settings(args.apikey);

    run_bot(settings).await;

    Ok(())
}

fn debug_mode() -> bool {
    std::env::var("DEBUG_MODE")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);

    let fallback = if debug_mode() {
        "debug"
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings(token: String) -> Arc<TransportSettings> {
    let bot_settings = match BotSettings::new() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load bot configuration: {}", e);
            std::process::exit(1);
        }
    };
    if token.trim().is_empty() {
        error!("The --apikey argument must not be empty");
        std::process::exit(2);
    }

    info!(
        api = %bot_settings.api_base_url,
        images = %bot_settings.image_dir.display(),
        "Configuration loaded successfully."
    );
    Arc::new(TransportSettings::new(
        bot_settings,
        TelegramSettings::with_token(token),
    ))
}
