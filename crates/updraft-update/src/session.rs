//! Update session coordinator
//!
//! Composes the pipeline
//! probe → manifest check → fetch → compare → confirm → download → handoff
//! and resolves every attempt to exactly one [`UpdateOutcome`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use updraft_core::RuntimeConfig;

use crate::download::{ArtifactFetcher, DownloadProgress};
use crate::error::{Result, UpdateError};
use crate::host::Updatable;
use crate::manifest::ManifestClient;
use crate::network::{NetworkProbe, TcpProbe};
use crate::replace::{Handoff, ReplacementOrchestrator};
use crate::strings::{Locale, StringKey, StringTable};

/// Terminal result of one update attempt
#[derive(Debug)]
pub enum UpdateOutcome {
    /// No newer version, no entry for this application, or the user declined
    UpToDate,
    /// The replacement helper was started
    Updated(Handoff),
    /// The attempt was cancelled
    Cancelled,
    /// The attempt failed
    Failed(UpdateError),
}

impl UpdateOutcome {
    /// Whether the attempt ended without a failure or cancellation
    pub fn is_success(&self) -> bool {
        matches!(self, Self::UpToDate | Self::Updated(_))
    }

    /// Message key describing this outcome
    pub fn message_key(&self) -> StringKey {
        match self {
            Self::UpToDate => StringKey::LatestVersionInstalled,
            Self::Updated(_) => StringKey::HandoffStarted,
            Self::Cancelled => StringKey::DownloadCancelled,
            Self::Failed(err) => match err {
                UpdateError::Offline => StringKey::NoInternetConnection,
                UpdateError::Network { .. } | UpdateError::Parse { .. } => StringKey::CheckError,
                UpdateError::HashMismatch { .. } => StringKey::ChecksumMismatch,
                UpdateError::Busy => StringKey::AlreadyRunning,
                UpdateError::Declined => StringKey::LatestVersionInstalled,
                UpdateError::Cancelled => StringKey::DownloadCancelled,
                UpdateError::Fatal { .. } => StringKey::HandoffFailed,
                UpdateError::Io(_) => StringKey::DownloadError,
                UpdateError::Config(_) => StringKey::CheckError,
            },
        }
    }

    /// Localized message for presenting this outcome
    pub fn message(&self, table: &dyn StringTable, locale: Locale) -> String {
        table.get(self.message_key(), locale).to_string()
    }
}

impl From<Result<Option<Handoff>>> for UpdateOutcome {
    fn from(result: Result<Option<Handoff>>) -> Self {
        match result {
            Ok(Some(handoff)) => Self::Updated(handoff),
            Ok(None) | Err(UpdateError::Declined) => Self::UpToDate,
            Err(UpdateError::Cancelled) => Self::Cancelled,
            Err(err) => Self::Failed(err),
        }
    }
}

/// Set while a background attempt runs anywhere in this process
static BACKGROUND_IN_FLIGHT: AtomicBool = AtomicBool::new(false);

/// Marks the background slot as taken until dropped
struct InFlightGuard(&'static AtomicBool);

impl InFlightGuard {
    fn acquire(flag: &'static AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to an update running in the background
pub struct BackgroundUpdate {
    cancel: CancellationToken,
    receiver: oneshot::Receiver<UpdateOutcome>,
    handle: JoinHandle<()>,
}

impl BackgroundUpdate {
    /// Request cancellation; the outcome will be [`UpdateOutcome::Cancelled`]
    /// unless the attempt already finished
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this attempt
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the terminal outcome
    pub async fn outcome(self) -> UpdateOutcome {
        match self.receiver.await {
            Ok(outcome) => outcome,
            Err(_) => UpdateOutcome::Failed(UpdateError::fatal("background worker terminated")),
        }
    }
}

/// Coordinates update attempts for one host application
#[derive(Clone)]
pub struct UpdateSession {
    host: Arc<dyn Updatable>,
    manifest: Arc<ManifestClient>,
    fetcher: Arc<ArtifactFetcher>,
    orchestrator: Arc<ReplacementOrchestrator>,
    probe: Arc<dyn NetworkProbe>,
}

impl UpdateSession {
    pub fn new(host: Arc<dyn Updatable>, config: &RuntimeConfig) -> Result<Self> {
        Ok(Self {
            host,
            manifest: Arc::new(ManifestClient::new(&config.network)?),
            fetcher: Arc::new(ArtifactFetcher::new(&config.network, &config.download)?),
            orchestrator: Arc::new(ReplacementOrchestrator::new(config.handoff.clone())),
            probe: Arc::new(TcpProbe::new(&config.network)),
        })
    }

    /// Replace the reachability probe
    pub fn with_probe(mut self, probe: Arc<dyn NetworkProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn host(&self) -> &Arc<dyn Updatable> {
        &self.host
    }

    /// Whether a background attempt is currently running in this process
    pub fn is_background_in_flight(&self) -> bool {
        BACKGROUND_IN_FLIGHT.load(Ordering::Acquire)
    }

    /// Run one update attempt to completion
    pub async fn check_and_update(&self, notify_if_up_to_date: bool) -> UpdateOutcome {
        self.check_and_update_cancellable(notify_if_up_to_date, &CancellationToken::new())
            .await
    }

    /// Run one update attempt that stops when `cancel` fires
    pub async fn check_and_update_cancellable(
        &self,
        notify_if_up_to_date: bool,
        cancel: &CancellationToken,
    ) -> UpdateOutcome {
        let outcome = UpdateOutcome::from(self.run_pipeline(notify_if_up_to_date, cancel).await);

        match &outcome {
            UpdateOutcome::UpToDate => debug!("Update check finished: up to date"),
            UpdateOutcome::Updated(handoff) => {
                info!("Update handed off to helper (pid {})", handoff.helper_pid);
                self.host.exit_for_update();
            }
            UpdateOutcome::Cancelled => info!("Update cancelled"),
            UpdateOutcome::Failed(err) => error!("Update failed: {}", err),
        }

        outcome
    }

    /// Start an attempt on a Tokio task and return immediately
    ///
    /// At most one background attempt runs per process, whichever session
    /// started it; a second request while one is in flight fails with
    /// [`UpdateError::Busy`]. Must be called from within a Tokio runtime.
    pub fn check_and_update_in_background(&self) -> Result<BackgroundUpdate> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| UpdateError::fatal("background updates require a Tokio runtime"))?;

        let guard = InFlightGuard::acquire(&BACKGROUND_IN_FLIGHT).ok_or_else(|| {
            warn!("Rejected background update: one is already running");
            UpdateError::Busy
        })?;

        let cancel = CancellationToken::new();
        let (sender, receiver) = oneshot::channel();
        let session = self.clone();
        let token = cancel.clone();

        let handle = runtime.spawn(async move {
            let outcome = session.check_and_update_cancellable(false, &token).await;
            drop(guard);
            if sender.send(outcome).is_err() {
                debug!("Background update outcome dropped: no receiver");
            }
        });

        Ok(BackgroundUpdate {
            cancel,
            receiver,
            handle,
        })
    }

    async fn run_pipeline(
        &self,
        notify_if_up_to_date: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<Handoff>> {
        let manifest_uri = self.host.manifest_uri();
        let application_id = self.host.application_id();

        if !self.probe.is_online(&manifest_uri).await {
            return Err(UpdateError::offline());
        }

        if !self.manifest.exists_on_server(&manifest_uri).await {
            return Err(UpdateError::network(format!(
                "manifest not available at {}",
                manifest_uri
            )));
        }

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpdateError::Cancelled),
            fetched = self.manifest.fetch(&manifest_uri, &application_id) => fetched?,
        };

        let installed = self.host.installed_version();
        let descriptor = match fetched {
            Some(descriptor) if descriptor.is_applicable(&installed) => descriptor,
            Some(descriptor) => {
                info!(
                    "Installed version {} is current (published {})",
                    installed, descriptor.version
                );
                if notify_if_up_to_date {
                    self.host.notify_up_to_date(&installed);
                }
                return Ok(None);
            }
            None => {
                info!("No update published for '{}'", application_id);
                if notify_if_up_to_date {
                    self.host.notify_up_to_date(&installed);
                }
                return Ok(None);
            }
        };

        info!(
            "Update available: {} -> {}",
            installed, descriptor.version
        );

        let host = Arc::clone(&self.host);
        let offered = descriptor.clone();
        let confirmation = tokio::task::spawn_blocking(move || host.confirm_update(&offered));
        let accepted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(UpdateError::Cancelled),
            joined = confirmation => joined
                .map_err(|e| UpdateError::fatal(format!("confirmation prompt failed: {}", e)))?,
        };
        if !accepted {
            info!("Update to {} declined", descriptor.version);
            return Err(UpdateError::Declined);
        }

        let host = Arc::clone(&self.host);
        let on_progress = move |progress: &DownloadProgress| host.on_progress(progress);
        let artifact = self
            .fetcher
            .download(
                &descriptor.artifact_uri,
                &descriptor.content_hash,
                &on_progress,
                cancel,
            )
            .await?;

        let current_exe = self.host.current_executable().map_err(|e| {
            UpdateError::fatal(format!("cannot locate the running executable: {}", e))
        })?;

        let handoff = self
            .orchestrator
            .apply(&descriptor, &artifact.file_path, &current_exe)?;
        Ok(Some(handoff))
    }
}
