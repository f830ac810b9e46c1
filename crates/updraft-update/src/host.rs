//! Contract between the engine and the application being updated

use std::ffi::OsStr;
use std::path::PathBuf;
use url::Url;

use crate::download::DownloadProgress;
use crate::manifest::UpdateDescriptor;
use crate::strings::Locale;
use crate::version::AppVersion;

/// An application that can update itself
///
/// The engine reads identity and configuration from the host and calls
/// back into it for confirmation and presentation. `confirm_update` may
/// block on a dialog; the session runs it off the async executor.
pub trait Updatable: Send + Sync {
    /// Version currently installed
    fn installed_version(&self) -> AppVersion;

    /// Where the manifest is published
    fn manifest_uri(&self) -> Url;

    /// Identifier matched against the manifest's `appId` attribute
    fn application_id(&self) -> String;

    /// Display name used in prompts
    fn application_name(&self) -> String;

    /// Icon used in prompts, passed through untouched
    fn icon_path(&self) -> Option<PathBuf> {
        None
    }

    /// Language for user-facing messages
    fn locale(&self) -> Locale {
        Locale::English
    }

    /// Ask the user whether to install `descriptor` now
    fn confirm_update(&self, descriptor: &UpdateDescriptor) -> bool;

    /// Tell the user the installed version is current
    fn notify_up_to_date(&self, _installed: &AppVersion) {}

    /// Download progress tick
    fn on_progress(&self, _progress: &DownloadProgress) {}

    /// Path of the binary to replace
    fn current_executable(&self) -> std::io::Result<PathBuf> {
        std::env::current_exe()
    }

    /// Terminate so the replacement helper can proceed
    fn exit_for_update(&self) {
        std::process::exit(0)
    }
}

/// Whether the process was relaunched by the replacement helper
pub fn was_just_updated<I, S>(args: I, flag: &str) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    args.into_iter().any(|arg| arg.as_ref() == OsStr::new(flag))
}
