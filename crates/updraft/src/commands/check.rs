//! Check command

use anyhow::{anyhow, Context, Result};
use camino::Utf8Path;
use std::sync::Arc;
use tracing::debug;
use updraft_update::{
    AppVersion, CancellationToken, Locale, StringKey, Updatable, UpdateOutcome, UpdateSession,
    VERSION,
};

use crate::cli::CheckArgs;
use crate::host::CliHost;
use crate::output;

pub async fn run(args: CheckArgs, config_dir: Option<&Utf8Path>) -> Result<()> {
    let config = super::load_config(config_dir)?;
    let installed = installed_version(args.installed.as_deref())?;
    let locale = args
        .lang
        .as_deref()
        .map(Locale::from_tag)
        .unwrap_or_default();

    let host = Arc::new(CliHost::new(
        installed,
        args.source.manifest.clone(),
        args.source.app_id.clone(),
        locale,
        args.yes,
    ));
    let session = UpdateSession::new(host.clone(), &config)?;

    output::info(host.text(StringKey::UpdateChecking));
    let outcome = if args.background {
        let background = session.check_and_update_in_background()?;
        cancel_on_ctrl_c(background.cancellation_token());
        background.outcome().await
    } else {
        let cancel = CancellationToken::new();
        cancel_on_ctrl_c(cancel.clone());
        session
            .check_and_update_cancellable(!args.quiet_if_current, &cancel)
            .await
    };
    host.finish_progress();

    report(&host, &outcome)?;
    debug!("Exit requested: {}", host.exit_requested());
    Ok(())
}

/// Version the check runs against
fn installed_version(flag: Option<&str>) -> Result<AppVersion> {
    match flag {
        Some(text) => text
            .parse()
            .with_context(|| format!("Invalid --installed version '{}'", text)),
        None => {
            let own = semver::Version::parse(VERSION)?;
            Ok(AppVersion::from(&own))
        }
    }
}

/// Cancel `token` when the user presses Ctrl-C
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    token.cancel();
                }
            }
        }
    });
}

/// Print the outcome; failures become the command's error
fn report(host: &CliHost, outcome: &UpdateOutcome) -> Result<()> {
    let message = outcome.message(host.strings(), host.locale());
    match outcome {
        // The host already printed the up-to-date notice when asked to
        UpdateOutcome::UpToDate => Ok(()),
        UpdateOutcome::Updated(handoff) => {
            output::success(&message);
            debug!("Helper script {}", handoff.script_path.display());
            Ok(())
        }
        UpdateOutcome::Cancelled => {
            output::warning(&message);
            Ok(())
        }
        UpdateOutcome::Failed(err) => {
            output::error(&message);
            Err(anyhow!("{}", err))
        }
    }
}
