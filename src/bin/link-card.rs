use clap::error::ErrorKind;
use clap::Parser;
use link_card::{
    log_error_card, log_preview_card, ErrorResult, PreviewResponse, PreviewService,
    PreviewServiceConfig,
};
use std::process::ExitCode;
use std::time::Duration;

/// Fetch link-card metadata for a URL and print it as one JSON line
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// URL to preview
    url: Option<String>,

    /// Timeout in whole seconds for the fetch, including the body read.
    /// Anything that is not a positive integer means the default.
    #[arg(allow_hyphen_values = true)]
    timeout: Option<String>,

    /// Enable logging to stderr with this filter, e.g. `debug` or `link_card=trace`
    #[arg(long)]
    log_level: Option<String>,
}

#[cfg(feature = "logging")]
fn init_logging(level: Option<&str>) {
    use link_card::{setup_logging, LogConfig};

    let Some(level) = level else {
        return;
    };
    let config = LogConfig {
        log_level: level.to_string(),
        ..LogConfig::default()
    };
    if let Err(e) = setup_logging(config) {
        eprintln!("failed to initialize logging: {e}");
    }
}

#[cfg(not(feature = "logging"))]
fn init_logging(_level: Option<&str>) {}

const DEFAULT_TIMEOUT_SECS: u64 = 5;

fn timeout_secs(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|&secs| secs > 0)
        .unwrap_or(DEFAULT_TIMEOUT_SECS)
}

fn print_response(response: &PreviewResponse) {
    match serde_json::to_string(response) {
        Ok(json) => println!("{json}"),
        Err(_) => println!(r#"{{"error":"Failed to serialize result"}}"#),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let reason = e.kind().as_str().unwrap_or("invalid arguments");
            print_response(&PreviewResponse::Error(ErrorResult::message(format!(
                "Invalid arguments: {reason}"
            ))));
            return ExitCode::from(1);
        }
    };
    init_logging(args.log_level.as_deref());

    let Some(url) = args.url else {
        print_response(&PreviewResponse::Error(ErrorResult::message("No URL provided")));
        return ExitCode::from(1);
    };

    let timeout = Duration::from_secs(timeout_secs(args.timeout.as_deref()));
    let config = PreviewServiceConfig::new().with_timeout(timeout);
    let service = PreviewService::new_with_config(config);

    let result = service.generate_preview(&url).await;
    match &result {
        Ok(metadata) => log_preview_card(metadata),
        Err(e) => log_error_card(&url, e),
    }

    print_response(&PreviewResponse::from_result(result, &url));
    ExitCode::SUCCESS
}
