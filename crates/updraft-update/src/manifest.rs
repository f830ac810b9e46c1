//! Update manifest retrieval and parsing
//!
//! A manifest is an XML document holding `<update appId="...">` entries
//! anywhere below its root element:
//!
//! ```xml
//! <updates>
//!   <update appId="TestApp">
//!     <version>2.0.0.0</version>
//!     <url>https://example.com/TestApp.exe</url>
//!     <fileName>TestApp.exe</fileName>
//!     <md5>9e107d9d372bb6826bd81d3542a419d6</md5>
//!     <description>Bug fixes\r\nFaster startup</description>
//!     <launchArgs>--minimized</launchArgs>
//!     <isInstaller>false</isInstaller>
//!   </update>
//! </updates>
//! ```
//!
//! The first entry whose `appId` matches exactly is used. A document
//! without a matching entry is a normal "no update" result.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use updraft_core::types::NetworkConfig;
use url::Url;

use crate::error::{Result, UpdateError};
use crate::version::{AppVersion, Comparison, VersionComparator};

/// One available update, as published in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDescriptor {
    /// Published version
    pub version: AppVersion,

    /// Absolute URI of the payload
    pub artifact_uri: Url,

    /// Destination file name for a standalone swap (empty for installers that omit it)
    pub file_name: String,

    /// Lowercase hex MD5 digest of the payload
    pub content_hash: String,

    /// Release notes with escape sequences turned into line breaks
    pub description: String,

    /// Arguments passed to the relaunched binary or the installer, as written
    pub launch_args: String,

    /// Run the payload as an installer instead of swapping binaries
    pub is_installer: bool,
}

impl UpdateDescriptor {
    /// Whether this update is strictly newer than the installed version
    pub fn is_applicable(&self, installed: &AppVersion) -> bool {
        VersionComparator::compare(&self.version, installed) == Comparison::Newer
    }
}

/// Fetches manifests over HTTP(S)
pub struct ManifestClient {
    client: reqwest::Client,
}

impl ManifestClient {
    /// Create a manifest client using the network settings
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| UpdateError::network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Fetch the manifest and return the entry for `application_id`, if any
    pub async fn fetch(
        &self,
        manifest_uri: &Url,
        application_id: &str,
    ) -> Result<Option<UpdateDescriptor>> {
        debug!("Fetching manifest from {}", manifest_uri);

        let response = self.client.get(manifest_uri.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::network(format!(
                "manifest request to {} returned {}",
                manifest_uri, status
            )));
        }

        let document = response.text().await?;
        parse_manifest(&document, application_id)
    }

    /// Best-effort check that the manifest is reachable
    ///
    /// Sends a HEAD request and falls back to GET when the server does not
    /// allow HEAD. Every failure is reported as `false`.
    pub async fn exists_on_server(&self, manifest_uri: &Url) -> bool {
        let status = match self.client.head(manifest_uri.clone()).send().await {
            Ok(response) if response.status() == StatusCode::METHOD_NOT_ALLOWED => {
                match self.client.get(manifest_uri.clone()).send().await {
                    Ok(response) => response.status(),
                    Err(e) => {
                        debug!("Manifest probe GET failed: {}", e);
                        return false;
                    }
                }
            }
            Ok(response) => response.status(),
            Err(e) => {
                debug!("Manifest probe HEAD failed: {}", e);
                return false;
            }
        };

        debug!("Manifest probe {} -> {}", manifest_uri, status);
        status.is_success()
    }
}

#[derive(Default)]
struct EntryFields {
    version: Option<String>,
    url: Option<String>,
    file_name: Option<String>,
    md5: Option<String>,
    description: Option<String>,
    launch_args: Option<String>,
    is_installer: Option<String>,
}

impl EntryFields {
    fn set(&mut self, field: &[u8], value: String) {
        let slot = match field {
            b"version" => &mut self.version,
            b"url" => &mut self.url,
            b"fileName" => &mut self.file_name,
            b"md5" => &mut self.md5,
            b"description" => &mut self.description,
            b"launchArgs" => &mut self.launch_args,
            b"isInstaller" => &mut self.is_installer,
            _ => return,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn into_descriptor(self, application_id: &str) -> Result<UpdateDescriptor> {
        let required = |value: Option<String>, name: &str| -> Result<String> {
            match value.map(|v| v.trim().to_string()) {
                Some(v) if !v.is_empty() => Ok(v),
                _ => Err(UpdateError::parse(format!(
                    "update entry '{}' is missing <{}>",
                    application_id, name
                ))),
            }
        };

        let version = AppVersion::parse(&required(self.version, "version")?)?;

        let url = required(self.url, "url")?;
        let artifact_uri = Url::parse(&url)
            .map_err(|e| UpdateError::parse(format!("invalid artifact url '{}': {}", url, e)))?;

        let content_hash = required(self.md5, "md5")?.to_ascii_lowercase();
        if content_hash.len() != 32 || !content_hash.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(UpdateError::parse(format!(
                "invalid md5 digest '{}'",
                content_hash
            )));
        }

        let is_installer = parse_installer_flag(self.is_installer.as_deref());

        let file_name = if is_installer {
            self.file_name.map(|f| f.trim().to_string()).unwrap_or_default()
        } else {
            required(self.file_name, "fileName")?
        };
        if file_name.contains(['/', '\\']) || file_name == ".." || file_name == "." {
            return Err(UpdateError::parse(format!(
                "fileName '{}' must be a bare file name",
                file_name
            )));
        }

        let launch_args = self
            .launch_args
            .map(|a| a.trim().to_string())
            .unwrap_or_default();

        Ok(UpdateDescriptor {
            version,
            artifact_uri,
            file_name,
            content_hash,
            description: unescape_description(self.description.as_deref().unwrap_or_default()),
            launch_args,
            is_installer,
        })
    }
}

fn parse_installer_flag(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None => false,
        Some(v) if v.eq_ignore_ascii_case("true") => true,
        Some(v) if v.eq_ignore_ascii_case("false") => false,
        Some(v) => {
            warn!("Ignoring unrecognised isInstaller value '{}'", v);
            false
        }
    }
}

fn unescape_description(raw: &str) -> String {
    raw.trim().replace("\\r\\n", "\n").replace("\\n", "\n")
}

fn matches_application(element: &BytesStart<'_>, application_id: &str) -> Result<bool> {
    if element.local_name().as_ref() != b"update" {
        return Ok(false);
    }
    let attr = element
        .try_get_attribute("appId")
        .map_err(|e| UpdateError::parse(format!("malformed update attribute: {}", e)))?;
    match attr {
        Some(attr) => {
            let value = attr
                .unescape_value()
                .map_err(|e| UpdateError::parse(format!("malformed appId: {}", e)))?;
            Ok(value == application_id)
        }
        None => Ok(false),
    }
}

/// Parse a manifest document and return the entry for `application_id`
///
/// The whole document must be well-formed even when an earlier entry
/// already matched.
pub fn parse_manifest(document: &str, application_id: &str) -> Result<Option<UpdateDescriptor>> {
    let mut reader = Reader::from_str(document);

    let mut depth = 0usize;
    let mut saw_element = false;
    let mut entry: Option<(usize, EntryFields)> = None;
    let mut field: Option<(Vec<u8>, String)> = None;
    let mut found: Option<UpdateDescriptor> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            UpdateError::parse(format!(
                "malformed manifest at byte {}: {}",
                reader.error_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => {
                depth += 1;
                saw_element = true;
                match entry.as_ref().map(|(d, _)| *d) {
                    Some(entry_depth) if depth == entry_depth + 1 => {
                        field = Some((e.local_name().as_ref().to_vec(), String::new()));
                    }
                    Some(_) => {}
                    None if found.is_none() && matches_application(&e, application_id)? => {
                        entry = Some((depth, EntryFields::default()));
                    }
                    None => {}
                }
            }
            Event::Empty(e) => {
                saw_element = true;
                match &mut entry {
                    Some((entry_depth, fields)) if depth == *entry_depth => {
                        fields.set(e.local_name().as_ref(), String::new());
                    }
                    Some(_) => {}
                    None if found.is_none() && matches_application(&e, application_id)? => {
                        found = Some(EntryFields::default().into_descriptor(application_id)?);
                    }
                    None => {}
                }
            }
            Event::Text(t) => {
                if let Some((_, value)) = &mut field {
                    let text = t
                        .unescape()
                        .map_err(|e| UpdateError::parse(format!("malformed text: {}", e)))?;
                    value.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some((_, value)) = &mut field {
                    value.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                match entry.as_ref().map(|(d, _)| *d) {
                    Some(entry_depth) if depth == entry_depth + 1 => {
                        if let (Some((name, value)), Some((_, fields))) = (field.take(), entry.as_mut())
                        {
                            fields.set(&name, value);
                        }
                    }
                    Some(entry_depth) if depth == entry_depth => {
                        if let Some((_, fields)) = entry.take() {
                            found = Some(fields.into_descriptor(application_id)?);
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_element {
        return Err(UpdateError::parse("manifest has no root element"));
    }
    if depth != 0 {
        return Err(UpdateError::parse("manifest ended before closing all elements"));
    }

    if found.is_none() {
        debug!("Manifest has no entry for '{}'", application_id);
    }
    Ok(found)
}
