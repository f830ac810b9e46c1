//! Terminal host for the update engine

use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressDrawTarget};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use updraft_update::{
    AppVersion, BuiltinStrings, DownloadProgress, Locale, StringKey, StringTable, Updatable,
    UpdateDescriptor,
};
use url::Url;

use crate::output;

/// Application identity and presentation choices for one CLI run
pub struct CliHost {
    installed: AppVersion,
    manifest_uri: Url,
    application_id: String,
    locale: Locale,
    assume_yes: bool,
    strings: BuiltinStrings,
    progress: ProgressBar,
    download_started: AtomicBool,
    exit_requested: AtomicBool,
}

impl CliHost {
    pub fn new(
        installed: AppVersion,
        manifest_uri: Url,
        application_id: String,
        locale: Locale,
        assume_yes: bool,
    ) -> Self {
        Self {
            installed,
            manifest_uri,
            application_id,
            locale,
            assume_yes,
            strings: BuiltinStrings,
            progress: output::download_bar(),
            download_started: AtomicBool::new(false),
            exit_requested: AtomicBool::new(false),
        }
    }

    /// Localized message
    pub fn text(&self, key: StringKey) -> &str {
        self.strings.get(key, self.locale)
    }

    pub fn strings(&self) -> &dyn StringTable {
        &self.strings
    }

    /// Clear the progress bar once the download is over
    pub fn finish_progress(&self) {
        if self.download_started.load(Ordering::SeqCst) {
            self.progress.finish_and_clear();
        }
    }

    /// Whether the engine asked this process to exit
    pub fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::SeqCst)
    }

    fn show_offer(&self, descriptor: &UpdateDescriptor) {
        output::header(self.text(StringKey::UpdateAvailable));
        output::kv(self.text(StringKey::CurrentVersion), &self.installed.to_string());
        output::kv(self.text(StringKey::UpdateVersion), &descriptor.version.to_string());
        if !descriptor.description.is_empty() {
            println!();
            println!("{}", descriptor.description);
        }
        println!();
    }
}

impl Updatable for CliHost {
    fn installed_version(&self) -> AppVersion {
        self.installed
    }

    fn manifest_uri(&self) -> Url {
        self.manifest_uri.clone()
    }

    fn application_id(&self) -> String {
        self.application_id.clone()
    }

    fn application_name(&self) -> String {
        self.application_id.clone()
    }

    fn locale(&self) -> Locale {
        self.locale
    }

    fn confirm_update(&self, descriptor: &UpdateDescriptor) -> bool {
        self.show_offer(descriptor);
        if self.assume_yes {
            return true;
        }

        match Confirm::new()
            .with_prompt(self.text(StringKey::UpdateAvailable))
            .default(false)
            .interact()
        {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Confirmation prompt failed: {}", e);
                false
            }
        }
    }

    fn notify_up_to_date(&self, _installed: &AppVersion) {
        output::success(self.text(StringKey::LatestVersionInstalled));
    }

    fn on_progress(&self, progress: &DownloadProgress) {
        if !self.download_started.swap(true, Ordering::SeqCst) {
            output::info(self.text(StringKey::StartingDownload));
            self.progress.set_draw_target(ProgressDrawTarget::stderr());
        }
        if let Some(total) = progress.total_bytes {
            self.progress.set_length(total);
        }
        self.progress.set_position(progress.downloaded_bytes);
        if let Some(eta) = progress.eta() {
            self.progress.set_message(format!(
                "{} {} sec",
                self.text(StringKey::TimeRemaining),
                eta.as_secs()
            ));
        }
    }

    fn exit_for_update(&self) {
        // main returns right after the check command, which ends the process
        debug!("Exit requested by the update engine");
        self.exit_requested.store(true, Ordering::SeqCst);
    }
}
