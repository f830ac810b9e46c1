//! Hash command

use anyhow::{Context, Result};
use updraft_update::{calculate_md5, format_bytes};

use crate::cli::HashArgs;

pub fn run(args: HashArgs) -> Result<()> {
    let size = std::fs::metadata(&args.file)
        .with_context(|| format!("Cannot read {}", args.file))?
        .len();
    let digest = calculate_md5(args.file.as_std_path())?;

    println!("{}  {}", digest, args.file);
    tracing::debug!("{} hashed ({})", args.file, format_bytes(size));
    Ok(())
}
