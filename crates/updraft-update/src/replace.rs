//! Deferred replacement of the running executable
//!
//! A running process cannot reliably overwrite or delete its own binary,
//! so the replacement is carried out by a short-lived helper script that
//! is spawned detached and outlives the host:
//!
//! - **Standalone swap**: wait for the host to exit, delete the old binary
//!   (retrying while it is still locked), move the verified artifact into
//!   the old binary's directory under the published file name, relaunch it
//!   with the launch arguments plus the "just updated" flag.
//! - **Installer handoff**: wait for the host to exit, run the installer to
//!   completion with the launch arguments, delete the installer.
//!
//! The helper learns the host PID from `UPDRAFT_PARENT_PID` and receives
//! everything else positionally. Its exit status is never observed.

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, error, info, warn};
use updraft_core::types::HandoffConfig;

use crate::error::{Result, UpdateError};
use crate::manifest::UpdateDescriptor;
use crate::PARENT_PID_ENV;

/// Command interpreter used to run the helper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFlavor {
    /// POSIX `sh`
    Posix,
    /// Windows `cmd.exe` batch file
    Batch,
}

impl ScriptFlavor {
    /// Flavor for the platform this binary was built for
    pub fn native() -> Self {
        if cfg!(windows) {
            Self::Batch
        } else {
            Self::Posix
        }
    }

    pub fn interpreter(&self) -> &'static str {
        match self {
            Self::Posix => "/bin/sh",
            Self::Batch => "cmd.exe",
        }
    }

    pub fn interpreter_args(&self) -> &'static [&'static str] {
        match self {
            Self::Posix => &[],
            Self::Batch => &["/C"],
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Posix => ".sh",
            Self::Batch => ".bat",
        }
    }

    /// Split a launch argument string the way this platform quotes it
    ///
    /// POSIX follows `sh` quoting. Batch honours double quotes only, so
    /// backslashes in Windows paths are kept.
    pub fn split_arguments(&self, raw: &str) -> Vec<String> {
        match self {
            Self::Posix => shell_words::split(raw).unwrap_or_else(|e| {
                warn!("Launch arguments '{}' are not well quoted: {}", raw, e);
                raw.split_whitespace().map(String::from).collect()
            }),
            Self::Batch => split_windows_arguments(raw),
        }
    }
}

/// Whitespace-separated words where double quotes group and are removed
fn split_windows_arguments(raw: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quoted = false;

    for c in raw.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_word = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        words.push(current);
    }
    words
}

/// How the artifact replaces the installed application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacementStrategy {
    /// Swap binaries; `target` is where the new binary ends up
    Standalone { target: PathBuf },
    /// Run the artifact as an installer
    Installer,
}

/// Everything needed to start the helper, computed without side effects
#[derive(Debug, Clone)]
pub struct HandoffPlan {
    pub strategy: ReplacementStrategy,
    pub flavor: ScriptFlavor,
    /// Full helper script text
    pub script: String,
    /// Positional arguments passed after the script path
    pub arguments: Vec<OsString>,
}

impl HandoffPlan {
    /// Command that runs the helper stored at `script_path`
    pub fn command(&self, script_path: &Path) -> Command {
        let mut cmd = Command::new(self.flavor.interpreter());
        cmd.args(self.flavor.interpreter_args())
            .arg(script_path)
            .args(&self.arguments)
            .env(PARENT_PID_ENV, std::process::id().to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(DETACHED_PROCESS | CREATE_NO_WINDOW);
        }

        cmd
    }
}

/// A helper that has been started
#[derive(Debug, Clone)]
pub struct Handoff {
    pub strategy: ReplacementStrategy,
    pub script_path: PathBuf,
    pub helper_pid: u32,
}

/// Arranges for the running executable to be replaced after it exits
pub struct ReplacementOrchestrator {
    config: HandoffConfig,
}

impl ReplacementOrchestrator {
    pub fn new(config: HandoffConfig) -> Self {
        Self { config }
    }

    /// Plan the handoff using the platform's native interpreter
    pub fn plan(
        &self,
        descriptor: &UpdateDescriptor,
        artifact: &Path,
        current_exe: &Path,
    ) -> Result<HandoffPlan> {
        self.plan_with(ScriptFlavor::native(), descriptor, artifact, current_exe)
    }

    /// Plan the handoff for a specific interpreter
    pub fn plan_with(
        &self,
        flavor: ScriptFlavor,
        descriptor: &UpdateDescriptor,
        artifact: &Path,
        current_exe: &Path,
    ) -> Result<HandoffPlan> {
        let launch_args = flavor.split_arguments(&descriptor.launch_args);

        if descriptor.is_installer {
            let mut arguments = vec![artifact.as_os_str().to_owned()];
            arguments.extend(launch_args.into_iter().map(OsString::from));

            return Ok(HandoffPlan {
                strategy: ReplacementStrategy::Installer,
                flavor,
                script: self.installer_script(flavor),
                arguments,
            });
        }

        if descriptor.file_name.is_empty() {
            return Err(UpdateError::fatal(
                "standalone update has no destination file name",
            ));
        }
        let dir = current_exe
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                UpdateError::fatal(format!(
                    "cannot determine install directory of {}",
                    current_exe.display()
                ))
            })?;

        let mut arguments = vec![
            current_exe.as_os_str().to_owned(),
            artifact.as_os_str().to_owned(),
            dir.as_os_str().to_owned(),
            OsString::from(&descriptor.file_name),
        ];
        arguments.extend(launch_args.into_iter().map(OsString::from));

        Ok(HandoffPlan {
            strategy: ReplacementStrategy::Standalone {
                target: dir.join(&descriptor.file_name),
            },
            flavor,
            script: self.standalone_script(flavor),
            arguments,
        })
    }

    /// Write the helper script and start it detached
    ///
    /// Returns as soon as the helper is running; the caller is expected to
    /// exit right after.
    pub fn apply(
        &self,
        descriptor: &UpdateDescriptor,
        artifact: &Path,
        current_exe: &Path,
    ) -> Result<Handoff> {
        if !artifact.is_file() {
            return Err(UpdateError::fatal(format!(
                "verified artifact {} is missing",
                artifact.display()
            )));
        }

        let plan = self.plan(descriptor, artifact, current_exe)?;
        let script_dir = artifact
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(std::env::temp_dir);

        let script_path = write_script(&script_dir, &plan).map_err(|e| {
            error!("Failed to write replacement helper: {}", e);
            UpdateError::fatal(format!("cannot write replacement helper: {}", e))
        })?;
        debug!("Replacement helper written to {}", script_path.display());

        let child = plan.command(&script_path).spawn().map_err(|e| {
            error!("Failed to start replacement helper: {}", e);
            UpdateError::fatal(format!("cannot start replacement helper: {}", e))
        })?;

        info!(
            "Replacement helper started (pid {}) for {:?}",
            child.id(),
            plan.strategy
        );

        Ok(Handoff {
            strategy: plan.strategy,
            script_path,
            helper_pid: child.id(),
        })
    }

    fn posix_wait(&self) -> String {
        format!(
            r#"polls={polls}
while [ -n "$UPDRAFT_PARENT_PID" ] && [ "$polls" -gt 0 ] && kill -0 "$UPDRAFT_PARENT_PID" 2>/dev/null; do
    sleep {interval}
    polls=$((polls - 1))
done
"#,
            polls = self.config.exit_wait_polls(),
            interval = self.poll_interval_secs(),
        )
    }

    fn batch_wait(&self, next: &str) -> String {
        format!(
            r#"set /a POLLS={secs}
:waitloop
if "%UPDRAFT_PARENT_PID%"=="" goto {next}
tasklist /FI "PID eq %UPDRAFT_PARENT_PID%" /NH 2>NUL | find " %UPDRAFT_PARENT_PID% " >NUL || goto {next}
if %POLLS% LEQ 0 goto {next}
set /a POLLS-=1
choice /C Y /N /D Y /T 1 >NUL
goto waitloop
"#,
            // set /a is limited to 32-bit signed values
            secs = self.config.exit_wait_secs.min(i32::MAX as u64),
            next = next,
        )
    }

    fn standalone_script(&self, flavor: ScriptFlavor) -> String {
        let retries = self.config.locked_file_retries;
        match flavor {
            ScriptFlavor::Posix => format!(
                r#"#!/bin/sh
old="$1"
new="$2"
dir="$3"
name="$4"
shift 4

{wait}
tries={retries}
while [ -e "$old" ]; do
    rm -f "$old" 2>/dev/null && break
    [ "$tries" -le 0 ] && break
    tries=$((tries - 1))
    sleep {interval}
done

target="$dir/$name"
mv -f "$new" "$target" || exit 1
chmod +x "$target" 2>/dev/null
rm -f "$0"
cd "$dir" || exit 1
"$target" "$@" {flag} >/dev/null 2>&1 &
exit 0
"#,
                wait = self.posix_wait(),
                retries = retries,
                interval = self.poll_interval_secs(),
                flag = sh_quote(&self.config.updated_flag),
            ),
            ScriptFlavor::Batch => crlf(&format!(
                r#"@echo off
setlocal
set "OLD=%~1"
set "NEW=%~2"
set "DIR=%~3"
set "NAME=%~4"
set "ARGS="
:collect
if "%~5"=="" goto wait
set ARGS=%ARGS% "%~5"
shift /5
goto collect
:wait
{wait}:remove
set /a TRIES={retries}
:removeloop
if not exist "%OLD%" goto move
del /F /Q "%OLD%" >NUL 2>&1
if not exist "%OLD%" goto move
if %TRIES% LEQ 0 goto move
set /a TRIES-=1
choice /C Y /N /D Y /T 1 >NUL
goto removeloop
:move
move /Y "%NEW%" "%DIR%\%NAME%" >NUL || exit /b 1
start "" /D "%DIR%" "%DIR%\%NAME%"%ARGS% {flag}
(goto) 2>NUL & del "%~f0"
"#,
                wait = self.batch_wait("remove"),
                retries = retries,
                flag = self.config.updated_flag,
            )),
        }
    }

    fn installer_script(&self, flavor: ScriptFlavor) -> String {
        match flavor {
            ScriptFlavor::Posix => format!(
                r#"#!/bin/sh
installer="$1"
shift

{wait}
chmod +x "$installer" 2>/dev/null
"$installer" "$@"
rm -f "$installer"
rm -f "$0"
exit 0
"#,
                wait = self.posix_wait(),
            ),
            ScriptFlavor::Batch => crlf(&format!(
                r#"@echo off
setlocal
set "INSTALLER=%~1"
set "ARGS="
:collect
if "%~2"=="" goto wait
set ARGS=%ARGS% "%~2"
shift /2
goto collect
:wait
{wait}:run
start "" /WAIT "%INSTALLER%"%ARGS%
del /F /Q "%INSTALLER%" >NUL 2>&1
(goto) 2>NUL & del "%~f0"
"#,
                wait = self.batch_wait("run"),
            )),
        }
    }

    fn poll_interval_secs(&self) -> String {
        let ms = self.config.poll_interval_ms.max(1);
        format!("{}.{:03}", ms / 1000, ms % 1000)
    }
}

fn write_script(dir: &Path, plan: &HandoffPlan) -> std::io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let mut file = tempfile::Builder::new()
        .prefix("updraft-handoff-")
        .suffix(plan.flavor.extension())
        .tempfile_in(dir)?;
    file.write_all(plan.script.as_bytes())?;
    file.flush()?;
    let (_, path) = file.keep().map_err(|e| e.error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    }

    Ok(path)
}

fn sh_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r#"'\''"#))
}

fn crlf(script: &str) -> String {
    script.replace('\n', "\r\n")
}
