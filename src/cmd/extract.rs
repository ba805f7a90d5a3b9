//! The `extract` subcommand.

use std::sync::Arc;

use clap::Args;

use crate::{
    drivers::LlmOpts,
    gateway::{ExtractionGateway, default_prompt},
    prelude::*,
    prompt::ChatPrompt,
    ui::{Notification, ProgressConfig, Ui},
    workspace::Workspace,
};

use super::{OutputOpts, finish_record};

/// Extract command line arguments.
#[derive(Debug, Args)]
pub struct ExtractOpts {
    /// A JPEG, PNG or WEBP image of a check, at most 10MB.
    #[clap(value_name = "IMAGE")]
    pub image_path: PathBuf,

    /// A custom prompt, as TOML or JSON. It must use
    /// `{{check_image_data_url}}` somewhere in its images.
    #[clap(long)]
    pub prompt: Option<PathBuf>,

    #[clap(flatten)]
    pub llm_opts: LlmOpts,

    #[clap(flatten)]
    pub output_opts: OutputOpts,
}

/// Run the `extract` subcommand.
#[instrument(level = "debug", skip_all, fields(image = %opts.image_path.display()))]
pub async fn cmd_extract(ui: Ui, opts: &ExtractOpts) -> Result<()> {
    // Validate the image before we spend any effort on the model.
    let mut workspace = Workspace::new();
    if let Err(err) = workspace.select_image(&opts.image_path).await {
        let message = workspace.last_error().unwrap_or("Invalid image").to_owned();
        ui.notify(Notification::Error, "Invalid Image", &message);
        return Err(err.into());
    }
    if let Some(image) = workspace.image() {
        info!(
            path = %image.path.display(),
            mime_type = %image.mime_type,
            bytes = image.data.len(),
            "Selected check image"
        );
    }

    // Get our prompt.
    let prompt = match &opts.prompt {
        Some(path) => ChatPrompt::from_path(path).await?,
        None => default_prompt(),
    };

    // Build our gateway around the configured driver.
    let driver = Arc::from(opts.llm_opts.driver.create_driver(&opts.llm_opts).await?);
    let gateway = ExtractionGateway::new(driver, prompt, opts.llm_opts.clone())?;

    let spinner = ui.new_spinner(&ProgressConfig {
        emoji: "🧾",
        msg: "Extracting data from check",
        done_msg: "Extracted data from check",
    });
    let result = workspace.extract(&gateway).await.map(|_| ());
    spinner.finish_and_clear();

    if let Err(err) = result {
        let message = workspace.last_error().unwrap_or("Extraction failed").to_owned();
        ui.notify(Notification::Error, "Extraction Failed", &message);
        return Err(err.into());
    }
    ui.notify(
        Notification::Success,
        "Extraction Successful!",
        "Check data has been extracted. Review and edit if needed.",
    );

    let surface = workspace
        .surface()
        .cloned()
        .ok_or_else(|| anyhow!("extraction succeeded but produced no record"))?;
    finish_record(&ui, surface, &opts.output_opts).await
}
