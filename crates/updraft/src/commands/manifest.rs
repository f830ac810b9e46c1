//! Manifest command

use anyhow::Result;
use camino::Utf8Path;
use updraft_update::{ManifestClient, UpdateDescriptor};

use crate::cli::ManifestArgs;
use crate::output;

pub async fn run(args: ManifestArgs, config_dir: Option<&Utf8Path>) -> Result<()> {
    let config = super::load_config(config_dir)?;
    let client = ManifestClient::new(&config.network)?;

    let spinner = output::spinner("Fetching manifest...");
    let fetched = client
        .fetch(&args.source.manifest, &args.source.app_id)
        .await;
    spinner.finish_and_clear();

    match fetched? {
        Some(descriptor) if args.json => {
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }
        Some(descriptor) => print_descriptor(&descriptor, config.display.verbose),
        None if args.json => println!("null"),
        None => output::warning(&format!(
            "No update entry for '{}' in {}",
            args.source.app_id, args.source.manifest
        )),
    }

    Ok(())
}

fn print_descriptor(descriptor: &UpdateDescriptor, verbose: bool) {
    output::header(&format!("Update {}", descriptor.version));
    output::kv("Artifact", descriptor.artifact_uri.as_str());
    if !descriptor.file_name.is_empty() {
        output::kv("File name", &descriptor.file_name);
    }
    output::kv("Installer", if descriptor.is_installer { "yes" } else { "no" });
    if verbose {
        output::kv("MD5", &descriptor.content_hash);
        if !descriptor.launch_args.is_empty() {
            output::kv("Launch args", &descriptor.launch_args);
        }
    }
    if !descriptor.description.is_empty() {
        println!();
        println!("{}", descriptor.description);
    }
}
