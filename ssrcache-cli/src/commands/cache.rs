//! Gateway commands: achieve, fetch, publish, revalidate, evict.

use std::path::Path;

use clap::Args;
use ssrcache::artifact::ArtifactDescriptor;
use ssrcache::gateway::{FetchResponse, PublishResponse};
use ssrcache::pool::PublishParams;
use ssrcache::transform::codec;

use super::output::{print_descriptor, print_maintenance};
use crate::error::CliError;
use crate::runner::{CliRunner, RunnerOptions};

/// Arguments shared by the lookup commands.
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Page URL
    pub url: String,

    /// Also print the decoded HTML of the artifact
    #[arg(long)]
    pub body: bool,
}

/// Disk-only lookup.
pub fn achieve(options: RunnerOptions, args: CacheArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(&options)?;
    let gateway = runner.gateway();

    let descriptor = gateway
        .achieve(&args.url)
        .ok_or_else(|| CliError::NoResult(format!("No cached artifact for {}", args.url)))?;
    print_descriptor(&descriptor);
    if args.body {
        print_body(&descriptor)?;
    }
    Ok(())
}

/// Lookup with render on miss. Records the request time on a hit.
pub async fn fetch(options: RunnerOptions, args: CacheArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(&options)?;
    runner.log_startup("fetch");
    let gateway = runner.gateway();

    match gateway.fetch(&args.url).await {
        Some(FetchResponse::Artifact(descriptor)) => {
            gateway.record_request(&descriptor);
            print_descriptor(&descriptor);
            if args.body {
                print_body(&descriptor)?;
            }
            Ok(())
        }
        Some(FetchResponse::Maintenance(document)) => {
            print_maintenance(&document);
            Ok(())
        }
        None => Err(CliError::NoResult(format!(
            "Could not serve or render {}",
            args.url
        ))),
    }
}

pub async fn publish(
    options: RunnerOptions,
    url: &str,
    file: &Path,
    raw_only: bool,
) -> Result<(), CliError> {
    let runner = CliRunner::new(&options)?;
    runner.log_startup("publish");

    let html = std::fs::read_to_string(file).map_err(|error| CliError::FileRead {
        path: file.to_path_buf(),
        error,
    })?;
    let mut params = PublishParams::new(url, html);
    if raw_only {
        params = params.raw_only();
    }

    match runner.gateway().publish(params).await {
        Some(PublishResponse::Written(ack)) => {
            println!(
                "Published {} as {} tier ({} bytes)",
                url, ack.tier, ack.bytes_written
            );
            println!("  Path: {}", ack.path.display());
            Ok(())
        }
        Some(PublishResponse::Maintenance(document)) => {
            print_maintenance(&document);
            Ok(())
        }
        None => Err(CliError::NoResult(format!("Publish failed for {}", url))),
    }
}

pub async fn revalidate(options: RunnerOptions, url: &str) -> Result<(), CliError> {
    let runner = CliRunner::new(&options)?;
    runner.log_startup("revalidate");

    let ack = runner
        .gateway()
        .revalidate(url)
        .await
        .ok_or_else(|| CliError::NoResult(format!("Revalidation failed for {}", url)))?;
    println!("Revalidated {} ({} bytes)", url, ack.bytes_written);
    println!("  Path: {}", ack.path.display());
    Ok(())
}

pub async fn evict(options: RunnerOptions, url: &str) -> Result<(), CliError> {
    let runner = CliRunner::new(&options)?;
    let gateway = runner.gateway();
    if gateway.is_maintenance() {
        return Err(CliError::Usage(
            "Eviction is disabled in maintenance mode".to_string(),
        ));
    }

    let removed = gateway
        .evict(url)
        .await
        .ok_or_else(|| CliError::NoResult(format!("Eviction failed for {}", url)))?;
    println!("Evicted {}: {} tier file(s) removed", url, removed);
    Ok(())
}

fn print_body(descriptor: &ArtifactDescriptor) -> Result<(), CliError> {
    let bytes = std::fs::read(&descriptor.path).map_err(|error| CliError::FileRead {
        path: descriptor.path.clone(),
        error,
    })?;
    println!();
    println!("{}", codec::decode(&bytes)?);
    Ok(())
}
