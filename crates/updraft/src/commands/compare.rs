//! Compare command

use anyhow::{Context, Result};
use updraft_update::{AppVersion, Comparison, VersionComparator};

use crate::cli::CompareArgs;
use crate::output;

pub fn run(args: CompareArgs) -> Result<()> {
    let published = parse(&args.published)?;
    let installed = parse(&args.installed)?;

    let line = describe(&published, &installed);
    match VersionComparator::compare(&published, &installed) {
        Comparison::Newer => output::success(&line),
        Comparison::SameOrOlder => output::info(&line),
    }
    Ok(())
}

fn parse(text: &str) -> Result<AppVersion> {
    text.parse()
        .with_context(|| format!("Invalid version '{}'", text))
}

fn describe(published: &AppVersion, installed: &AppVersion) -> String {
    match VersionComparator::compare(published, installed) {
        Comparison::Newer => format!("{} is newer than {}: update", published, installed),
        Comparison::SameOrOlder if published == installed => {
            format!("{} is the same as {}: no update", published, installed)
        }
        Comparison::SameOrOlder => {
            format!("{} is older than {}: no update", published, installed)
        }
    }
}
