//! Builder for manifest documents

use super::constants::*;

/// One `<update>` entry
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    app_id: String,
    version: String,
    url: String,
    file_name: Option<String>,
    md5: String,
    description: Option<String>,
    launch_args: Option<String>,
    is_installer: Option<String>,
}

impl EntryBuilder {
    pub fn new(app_id: &str) -> Self {
        Self {
            app_id: app_id.to_string(),
            version: VERSION_2_0_0_0.to_string(),
            url: format!("https://downloads.example.com{}", ARTIFACT_PATH),
            file_name: Some(format!("{}.exe", app_id)),
            md5: md5_hex(ARTIFACT_CONTENT),
            description: None,
            launch_args: None,
            is_installer: None,
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub fn url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = Some(name.to_string());
        self
    }

    pub fn without_file_name(mut self) -> Self {
        self.file_name = None;
        self
    }

    pub fn md5(mut self, md5: &str) -> Self {
        self.md5 = md5.to_string();
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    pub fn launch_args(mut self, args: &str) -> Self {
        self.launch_args = Some(args.to_string());
        self
    }

    pub fn installer(mut self, value: &str) -> Self {
        self.is_installer = Some(value.to_string());
        self
    }

    pub fn build(&self) -> String {
        let mut xml = format!(
            "  <update appId=\"{}\">\n    <version>{}</version>\n    <url>{}</url>\n",
            self.app_id, self.version, self.url
        );
        if let Some(name) = &self.file_name {
            xml.push_str(&format!("    <fileName>{}</fileName>\n", name));
        }
        xml.push_str(&format!("    <md5>{}</md5>\n", self.md5));
        if let Some(text) = &self.description {
            xml.push_str(&format!("    <description>{}</description>\n", text));
        }
        if let Some(args) = &self.launch_args {
            xml.push_str(&format!("    <launchArgs>{}</launchArgs>\n", args));
        }
        if let Some(flag) = &self.is_installer {
            xml.push_str(&format!("    <isInstaller>{}</isInstaller>\n", flag));
        }
        xml.push_str("  </update>\n");
        xml
    }
}

/// A whole manifest document
#[derive(Debug, Clone, Default)]
pub struct ManifestBuilder {
    entries: Vec<EntryBuilder>,
}

impl ManifestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, entry: EntryBuilder) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn build(&self) -> String {
        let body: String = self.entries.iter().map(EntryBuilder::build).collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<updates>\n{}</updates>\n",
            body
        )
    }
}

/// Manifest with a single entry for [`APP_ID`]
pub fn single_entry_manifest(version: &str, artifact_url: &str, md5: &str) -> String {
    ManifestBuilder::new()
        .entry(EntryBuilder::new(APP_ID).version(version).url(artifact_url).md5(md5))
        .build()
}
