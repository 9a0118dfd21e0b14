use crate::utils::truncate_str;
use crate::NormalizedMetadata;
use std::fmt::Display;
use tracing::{error, info};

#[cfg(feature = "logging")]
pub use self::setup::{setup_logging, LogConfig};

fn create_separator(width: usize, ch: char) -> String {
    std::iter::repeat_n(ch, width).collect()
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        "N/A"
    } else {
        value
    }
}

pub fn log_preview_card(metadata: &NormalizedMetadata) {
    const CARD_WIDTH: usize = 80;
    const CONTENT_WIDTH: usize = CARD_WIDTH - 2;

    fn wrap_text(text: &str, width: usize) -> String {
        let mut wrapped = String::new();
        let mut line_length = 0;

        for word in text.split_whitespace() {
            if line_length + word.len() + 1 > width {
                wrapped.push('\n');
                wrapped.push_str("  ");
                wrapped.push_str(word);
                line_length = word.len() + 2;
            } else {
                if line_length > 0 {
                    wrapped.push(' ');
                    line_length += 1;
                }
                wrapped.push_str(word);
                line_length += word.len();
            }
        }
        wrapped
    }

    let horizontal_line = create_separator(CARD_WIDTH - 2, '═');

    info!(
        "\n╔{}╗\n\
         Request: {}\n\
         URL: {}\n\
         Title: {}\n\
         Desc: {}\n\
         Image: {}\n\
         Icon: {}\n\
         Site: {} ({})\n\
         ╚{}╝",
        horizontal_line,
        wrap_text(&metadata.request_url, CONTENT_WIDTH - 9),
        wrap_text(or_na(&metadata.url), CONTENT_WIDTH - 5),
        wrap_text(or_na(&metadata.title), CONTENT_WIDTH - 7),
        wrap_text(or_na(&metadata.description), CONTENT_WIDTH - 6),
        wrap_text(or_na(&metadata.image), CONTENT_WIDTH - 7),
        wrap_text(or_na(&metadata.favicon), CONTENT_WIDTH - 6),
        or_na(&metadata.site_name),
        metadata.kind,
        horizontal_line,
    );
}

pub fn log_error_card<E: Display + std::error::Error>(url: &str, error: &E) {
    const CARD_WIDTH: usize = 70;
    const CONTENT_WIDTH: usize = CARD_WIDTH - 8;

    let top_bottom = create_separator(CARD_WIDTH - 2, '═');
    let middle = create_separator(CARD_WIDTH - 2, '─');

    let mut error_details = error.to_string();
    if let Some(source) = error.source() {
        error_details = format!("{error_details} (cause: {source})");
    }

    error!(
        "\n╔═{}═╗\n\
         ║ URL:   {:<width$} ║\n\
         ║{}║\n\
         ║ Error: {:<width$} ║\n\
         ╚═{}═╝",
        top_bottom,
        truncate_str(url, CONTENT_WIDTH),
        middle,
        truncate_str(&error_details, CONTENT_WIDTH),
        top_bottom,
        width = CONTENT_WIDTH
    );
}

#[cfg(feature = "logging")]
mod setup {
    use std::path::PathBuf;
    use tracing::debug;
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{
        fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
    };

    #[derive(Debug)]
    pub struct LogConfig {
        pub log_dir: PathBuf,
        pub log_level: String,
        /// Human-readable events on stderr; stdout is reserved for results.
        pub console_output: bool,
        pub file_output: bool,
    }

    impl Default for LogConfig {
        fn default() -> Self {
            Self {
                log_dir: "logs".into(),
                log_level: "warn".into(),
                console_output: true,
                file_output: false,
            }
        }
    }

    /// Install the global subscriber. `RUST_LOG` takes precedence over
    /// `config.log_level`.
    pub fn setup_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

        let mut layers = Vec::new();

        if config.console_output {
            let console_layer = subscriber_fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .with_file(true);
            layers.push(console_layer.boxed());
        }

        if config.file_output {
            std::fs::create_dir_all(&config.log_dir)?;

            let file_appender =
                RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "link-card.log");

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
}
