//! The `review` subcommand.

use clap::Args;

use crate::{prelude::*, record::CheckRecord, review::ReviewSurface, ui::Ui};

use super::{OutputOpts, finish_record};

/// Review command line arguments.
#[derive(Debug, Args)]
pub struct ReviewOpts {
    /// A JSON file containing check data, as written by `extract --format json`.
    #[clap(value_name = "RECORD")]
    pub record_path: PathBuf,

    #[clap(flatten)]
    pub output_opts: OutputOpts,
}

/// Run the `review` subcommand.
#[instrument(level = "debug", skip_all, fields(record = %opts.record_path.display()))]
pub async fn cmd_review(ui: Ui, opts: &ReviewOpts) -> Result<()> {
    let data = tokio::fs::read_to_string(&opts.record_path)
        .await
        .with_context(|| format!("Failed to read {:?}", opts.record_path))?;
    let record = serde_json::from_str::<CheckRecord>(&data)
        .with_context(|| format!("Failed to parse check data in {:?}", opts.record_path))?;

    // This subcommand is always interactive.
    let mut output_opts = opts.output_opts.clone();
    output_opts.review = true;
    finish_record(&ui, ReviewSurface::new(record), &output_opts).await
}
