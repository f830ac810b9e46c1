//! Recording host application and probes

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use updraft_update::{
    AppVersion, DownloadProgress, NetworkProbe, Updatable, UpdateDescriptor,
};
use url::Url;

use super::constants::*;

/// Host that records every callback and never exits the process
pub struct RecordingHost {
    pub installed: AppVersion,
    pub manifest_uri: Url,
    pub app_id: String,
    pub accept: bool,
    pub confirm_delay: Duration,
    pub executable: PathBuf,
    pub offered: Mutex<Vec<UpdateDescriptor>>,
    pub notified: AtomicUsize,
    pub progress_ticks: Mutex<Vec<DownloadProgress>>,
    pub exits: AtomicUsize,
}

impl RecordingHost {
    pub fn new(installed: &str, manifest_uri: Url) -> Self {
        Self {
            installed: installed.parse().unwrap(),
            manifest_uri,
            app_id: APP_ID.to_string(),
            accept: false,
            confirm_delay: Duration::ZERO,
            executable: PathBuf::from("/opt/testapp/TestApp"),
            offered: Mutex::new(Vec::new()),
            notified: AtomicUsize::new(0),
            progress_ticks: Mutex::new(Vec::new()),
            exits: AtomicUsize::new(0),
        }
    }

    pub fn accepting(mut self) -> Self {
        self.accept = true;
        self
    }

    pub fn with_confirm_delay(mut self, delay: Duration) -> Self {
        self.confirm_delay = delay;
        self
    }

    pub fn with_executable(mut self, path: PathBuf) -> Self {
        self.executable = path;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn offered(&self) -> Vec<UpdateDescriptor> {
        self.offered.lock().unwrap().clone()
    }

    pub fn notified(&self) -> usize {
        self.notified.load(Ordering::SeqCst)
    }

    pub fn progress_ticks(&self) -> usize {
        self.progress_ticks.lock().unwrap().len()
    }

    pub fn exits(&self) -> usize {
        self.exits.load(Ordering::SeqCst)
    }
}

impl Updatable for RecordingHost {
    fn installed_version(&self) -> AppVersion {
        self.installed
    }

    fn manifest_uri(&self) -> Url {
        self.manifest_uri.clone()
    }

    fn application_id(&self) -> String {
        self.app_id.clone()
    }

    fn application_name(&self) -> String {
        "Test App".to_string()
    }

    fn confirm_update(&self, descriptor: &UpdateDescriptor) -> bool {
        self.offered.lock().unwrap().push(descriptor.clone());
        if !self.confirm_delay.is_zero() {
            std::thread::sleep(self.confirm_delay);
        }
        self.accept
    }

    fn notify_up_to_date(&self, _installed: &AppVersion) {
        self.notified.fetch_add(1, Ordering::SeqCst);
    }

    fn on_progress(&self, progress: &DownloadProgress) {
        self.progress_ticks.lock().unwrap().push(progress.clone());
    }

    fn current_executable(&self) -> std::io::Result<PathBuf> {
        Ok(self.executable.clone())
    }

    fn exit_for_update(&self) {
        self.exits.fetch_add(1, Ordering::SeqCst);
    }
}

/// Probe that reports no network path
pub struct NeverOnline;

#[async_trait]
impl NetworkProbe for NeverOnline {
    async fn is_online(&self, _target: &Url) -> bool {
        false
    }
}
