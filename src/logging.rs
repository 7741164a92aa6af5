use crate::utils::truncate_str;
use crate::{FetchError, RequestFailure};
use std::fmt::Display;
use tracing::error;
#[cfg(feature = "logging")]
use {
    std::path::PathBuf,
    tracing::debug,
    tracing_appender::rolling::{RollingFileAppender, Rotation},
    tracing_subscriber::{
        fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    },
};

const CARD_WIDTH: usize = 70;
const CONTENT_WIDTH: usize = CARD_WIDTH - 8;

fn create_separator(width: usize, ch: char) -> String {
    std::iter::repeat(ch).take(width).collect()
}

fn render_card(url: &str, details: &str) -> String {
    let top_bottom = create_separator(CARD_WIDTH - 2, '═');
    let middle = create_separator(CARD_WIDTH - 2, '─');

    format!(
        "\n╔═{}═╗\n\
         ║ URL: {:<width$} ║\n\
         ║{}║\n\
         ║ Error: {:<width$} ║\n\
         ╚═{}═╝",
        top_bottom,
        truncate_str(url, CONTENT_WIDTH),
        middle,
        truncate_str(details, CONTENT_WIDTH),
        top_bottom,
        width = CONTENT_WIDTH
    )
}

pub fn log_error_card<E: Display + std::error::Error>(url: &str, error: &E) {
    let mut error_details = error.to_string();
    if let Some(source) = error.source() {
        error_details = format!("{error_details} (caused by: {source})");
    }
    error!("{}", render_card(url, &error_details));
}

pub fn log_failure_card(failure: &RequestFailure) {
    error!("{}", render_card(&failure.url, &failure.error.to_string()));
}

/// One card per failed url, or a single card for errors that are not tied to a url.
pub fn log_batch_failure(err: &FetchError) {
    let failures = err.failures();
    if failures.is_empty() {
        log_error_card("-", err);
        return;
    }
    for failure in failures {
        log_failure_card(failure);
    }
}

#[cfg(feature = "logging")]
#[derive(Debug)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    pub log_level: String,
    pub console_output: bool,
    pub file_output: bool,
}

#[cfg(feature = "logging")]
impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".into(),
            log_level: "info".into(),
            console_output: true,
            file_output: false,
        }
    }
}

#[cfg(feature = "logging")]
pub fn setup_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let mut layers = Vec::new();

    if config.console_output {
        let console_layer = subscriber_fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .with_writer(std::io::stderr);
        layers.push(console_layer.boxed());
    }

    if config.file_output {
        std::fs::create_dir_all(&config.log_dir)?;

        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "parallel-get.log");

        let file_layer = subscriber_fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .with_writer(file_appender);

        layers.push(file_layer.boxed());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    debug!("Logging system initialized with config: {:?}", config);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RequestError;

    #[test]
    fn test_card_truncates_long_urls() {
        let url = format!("http://example.test/{}", "a".repeat(200));
        let card = render_card(&url, "connection refused");

        assert!(card.contains("..."));
        assert!(card.contains("connection refused"));
        assert!(!card.contains(&url));
    }

    #[test]
    fn test_batch_failure_logging_does_not_panic() {
        log_batch_failure(&FetchError::BatchFailure {
            failures: vec![RequestFailure::new("http://a.test/", RequestError::Timeout { after_ms: 5 })],
        });
        log_batch_failure(&FetchError::InvalidInput("empty".into()));
    }
}
