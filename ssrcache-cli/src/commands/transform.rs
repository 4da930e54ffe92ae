//! Transform command: run compress, and optionally optimize, on one file.

use std::path::PathBuf;

use clap::Args;
use ssrcache::transform::{HtmlSource, HtmlTransformer};

use crate::error::CliError;
use crate::runner::{CliRunner, RunnerOptions};

/// Arguments for the transform command.
#[derive(Debug, Args)]
pub struct TransformArgs {
    /// HTML file, plain or brotli-compressed
    pub file: PathBuf,

    /// Strip trackers and preload hints before minifying
    #[arg(long)]
    pub optimize: bool,

    /// With --optimize, also drop scripts and apply the element rules
    #[arg(long, requires = "optimize")]
    pub full: bool,

    /// Run even where configuration disables a stage
    #[arg(long)]
    pub force: bool,

    /// Write the result here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

pub fn run(options: RunnerOptions, args: TransformArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(&options)?;
    let transformer = HtmlTransformer::new(runner.config().transform_config());

    let bytes = std::fs::read(&args.file).map_err(|error| CliError::FileRead {
        path: args.file.clone(),
        error,
    })?;

    let mut html = transform_bytes(&transformer, bytes, &args)?;
    if !html.ends_with('\n') {
        html.push('\n');
    }

    match &args.output {
        Some(path) => std::fs::write(path, html).map_err(|error| CliError::FileWrite {
            path: path.clone(),
            error,
        }),
        None => {
            print!("{}", html);
            Ok(())
        }
    }
}

fn transform_bytes(
    transformer: &HtmlTransformer,
    bytes: Vec<u8>,
    args: &TransformArgs,
) -> Result<String, CliError> {
    let source = match String::from_utf8(bytes) {
        Ok(text) => HtmlSource::Text(text),
        Err(e) => HtmlSource::Brotli(e.into_bytes()),
    };

    let html = if args.optimize {
        transformer.optimize(source, args.full, args.force)?
    } else {
        source.into_text()?
    };
    Ok(transformer.compress(html, args.force)?)
}
