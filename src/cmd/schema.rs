//! The `schema` subcommand.

use clap::Args;
use tokio::io::AsyncWriteExt as _;

use crate::{prelude::*, record::CheckRecord, schema::ResponseSchema};

use super::create_writer;

/// Schema command line arguments.
#[derive(Debug, Args)]
pub struct SchemaOpts {
    /// The output path to write the schema to.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,
}

/// The `schema` subcommand. Prints the JSON Schema we send to the model and
/// enforce on its response.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_schema(schema_opts: &SchemaOpts) -> Result<()> {
    let schema = ResponseSchema::from_type::<CheckRecord>()?;

    let mut wtr = create_writer(schema_opts.output_path.as_deref()).await?;
    let mut schema_str = serde_json::to_string_pretty(schema.json_schema())
        .context("failed to serialize schema")?;
    schema_str.push('\n');
    wtr.write_all(schema_str.as_bytes())
        .await
        .context("failed to write schema")?;
    wtr.flush().await.context("failed to flush schema")?;
    Ok(())
}
