//! Command-line entry points.

use std::{
    io::{self, BufReader},
    time::Duration,
};

use clap::{Args, ValueEnum};
use tokio::{
    fs::File,
    io::{AsyncWrite, AsyncWriteExt as _},
};

use crate::{
    prelude::*,
    review::{
        ReviewSurface,
        clipboard::{Clipboard, SystemClipboard},
        session::run_session,
    },
    ui::{Notification, Ui},
};

pub mod extract;
pub mod review;
pub mod schema;

/// How long `--copy` keeps serving the clipboard before we exit, if no
/// clipboard manager takes it over first.
const COPY_HOLD: Duration = Duration::from_secs(30);

/// How to print the final record.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "snake_case")]
pub enum OutputFormat {
    /// A table with three `Field | Value` column pairs.
    #[default]
    Table,
    /// Pretty-printed JSON, suitable for `check-snap review`.
    Json,
    /// `Label: value` lines, as copied to the clipboard.
    Text,
}

/// Options shared by subcommands which end with a record.
#[derive(Debug, Clone, Args)]
pub struct OutputOpts {
    /// Review and edit the extracted data interactively before output.
    #[clap(long)]
    pub review: bool,

    /// Copy the final data to the system clipboard as `Label: value` lines.
    #[clap(long)]
    pub copy: bool,

    /// Output format.
    #[clap(long, value_enum, default_value_t = OutputFormat::default())]
    pub format: OutputFormat,

    /// Write output to this file instead of standard output.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// Run the optional review session, write the final record, and copy it.
pub async fn finish_record(ui: &Ui, surface: ReviewSurface, opts: &OutputOpts) -> Result<()> {
    let surface = if opts.review {
        run_review_session(surface).await?
    } else {
        surface
    };

    let output = format_record(&surface, opts.format)?;
    let mut wtr = create_writer(opts.output_path.as_deref()).await?;
    wtr.write_all(output.as_bytes())
        .await
        .context("failed to write output")?;
    wtr.flush().await.context("failed to flush output")?;

    // Copy last, because holding the clipboard may block until we time out.
    if opts.copy {
        let ui = ui.clone();
        tokio::task::spawn_blocking(move || {
            copy_record(&ui, &surface, &mut SystemClipboard::holding(COPY_HOLD))
        })
        .await
        .context("clipboard copy panicked")?;
    }
    Ok(())
}

/// Copy the committed record to `clipboard` and notify the user. A failed
/// copy is reported, but is not fatal. Returns true if the copy succeeded.
pub fn copy_record(ui: &Ui, surface: &ReviewSurface, clipboard: &mut dyn Clipboard) -> bool {
    match surface.copy_to(clipboard) {
        Ok(()) => {
            ui.notify(
                Notification::Success,
                "Data Copied!",
                "Extracted check information copied to clipboard.",
            );
            true
        }
        Err(err) => {
            ui.notify(Notification::Error, "Copy Failed", &err.to_string());
            false
        }
    }
}

/// Format the committed record.
pub fn format_record(surface: &ReviewSurface, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Table => surface.render_table(),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(surface.record())
                .context("failed to serialize check data")?;
            json.push('\n');
            json
        }
        OutputFormat::Text => {
            let mut text = surface.copy_text();
            text.push('\n');
            text
        }
    })
}

/// Run an interactive session on stdin and stdout.
///
/// The session does blocking terminal I/O, so it runs on the blocking pool.
async fn run_review_session(mut surface: ReviewSurface) -> Result<ReviewSurface> {
    tokio::task::spawn_blocking(move || -> Result<ReviewSurface> {
        let stdin = BufReader::new(io::stdin());
        let mut stdout = io::stdout();
        run_session(&mut surface, stdin, &mut stdout, &mut SystemClipboard::default())?;
        Ok(surface)
    })
    .await
    .context("review session panicked")?
}

/// Create an [`AsyncWrite`] for a file or stdout.
pub async fn create_writer(
    path: Option<&Path>,
) -> Result<Box<dyn AsyncWrite + Unpin + Send + Sync + 'static>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .await
                .with_context(|| format!("Failed to create file at path: {:?}", path))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}
