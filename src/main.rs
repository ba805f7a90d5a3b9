use std::str::FromStr;

use clap::{Parser, Subcommand};
use tracing_subscriber::{
    EnvFilter, Layer as _, filter::Directive, fmt::format::FmtSpan, layer::SubscriberExt,
    util::SubscriberInitExt as _,
};

use self::{prelude::*, ui::Ui};

mod cmd;
mod data_url;
mod drivers;
mod gateway;
mod llm_client;
mod prelude;
mod prompt;
mod record;
mod review;
mod schema;
mod toml_utils;
mod ui;
mod upload;
mod workspace;

/// Extract payee, amounts, bank details and more from images of bank checks.
#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    after_help = r#"
Environment Variables:
  - OPENAI_API_BASE (optional): Override the server URL.
  - OPENAI_API_KEY: The OpenAI key to use.
  - RUST_LOG (optional): Log filter, such as `check_snap=debug`.

  The `native` driver reads each provider's usual API key variable,
  such as ANTHROPIC_API_KEY or GEMINI_API_KEY.

  These variables may be set in a standard `.env` file.
"#
)]
struct Opts {
    #[clap(subcommand)]
    subcmd: Cmd,
}

/// The subcommands we support.
#[derive(Debug, Subcommand)]
enum Cmd {
    /// Extract data from an image of a check.
    Extract(cmd::extract::ExtractOpts),
    /// Review and edit previously extracted check data.
    Review(cmd::review::ReviewOpts),
    /// Print the JSON Schema for extracted check data.
    Schema(cmd::schema::SchemaOpts),
}

/// Our entry point, which can return an error. [`anyhow::Result`] will
/// automatically print a nice error message with optional backtrace.
#[tokio::main]
async fn main() -> Result<()> {
    let ui = Ui::init();

    // Initialize tracing.
    let directive =
        Directive::from_str("info").expect("built-in directive should be valid");
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(ui.get_stderr_writer())
        .with_filter(env_filter);
    tracing_subscriber::registry().with(subscriber).init();

    // Call our real `main` function now that logging is set up.
    real_main(ui).await
}

/// Our real entry point.
#[instrument(level = "debug", name = "main", skip_all)]
async fn real_main(ui: Ui) -> Result<()> {
    // Load environment variables from a `.env` file, if it exists.
    dotenvy::dotenv().ok();

    // Parse command-line arguments.
    let opts = Opts::parse();
    debug!("Parsed options: {:?}", opts);

    match &opts.subcmd {
        Cmd::Extract(extract_opts) => {
            // The review session owns the terminal, so no spinners.
            if extract_opts.output_opts.review {
                ui.hide_progress_bars();
            }
            cmd::extract::cmd_extract(ui, extract_opts).await?;
        }
        Cmd::Review(review_opts) => {
            cmd::review::cmd_review(ui, review_opts).await?;
        }
        Cmd::Schema(schema_opts) => {
            cmd::schema::cmd_schema(schema_opts).await?;
        }
    }
    Ok(())
}
