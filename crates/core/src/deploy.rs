//! Project deploy descriptions, typically loaded from `.deploy.yaml`.

use crate::config_files::ConfigFiles;
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// How a project wants to be built and packaged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deploy {
    /// Package name.
    pub name: Option<String>,
    /// Build script path, relative to the repository root.
    pub buildscript: Option<String>,
    /// Post-install script path, relative to the repository root.
    pub postinstall: Option<String>,
    /// Config files to ship alongside the build.
    pub config_files: Vec<ConfigFiles>,
    /// pip requirements installed into the build virtualenv.
    pub pip: Vec<String>,
    /// Package dependencies declared by the project.
    pub dependencies: Vec<String>,
    /// Prefix for the install-time virtualenv directory name.
    pub virtualenv_prefix: Option<String>,
    /// Keep going when the build script fails.
    pub allow_broken_build: bool,
    /// User that owns the installed files.
    pub user: Option<String>,
    /// Package version.
    pub version: Option<String>,
}

/// On-disk shape of `.deploy.yaml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeployFile {
    name: Option<String>,
    buildscript: Option<String>,
    postinstall: Option<String>,
    nginx: Option<Vec<String>>,
    supervisor: Option<Vec<String>>,
    pip: Option<Vec<String>>,
    dependencies: Option<Vec<String>>,
    virtualenv_prefix: Option<String>,
    allow_broken_build: Option<bool>,
    user: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    version: Option<String>,
}

/// Accept `version: 1.2` as well as `version: '1.2'`.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match Option::<serde_yaml::Value>::deserialize(deserializer)? {
        None | Some(serde_yaml::Value::Null) => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "version must be a string or number, got {other:?}"
        ))),
    }
}

impl From<DeployFile> for Deploy {
    fn from(file: DeployFile) -> Self {
        let mut config_files = Vec::new();
        if let Some(nginx) = file.nginx.filter(|files| !files.is_empty()) {
            config_files.push(ConfigFiles::nginx(nginx));
        }
        if let Some(supervisor) = file.supervisor.filter(|files| !files.is_empty()) {
            config_files.push(ConfigFiles::supervisor(supervisor));
        }

        Self {
            name: file.name,
            buildscript: file.buildscript,
            postinstall: file.postinstall,
            config_files,
            pip: file.pip.unwrap_or_default(),
            dependencies: file.dependencies.unwrap_or_default(),
            virtualenv_prefix: file.virtualenv_prefix,
            allow_broken_build: file.allow_broken_build.unwrap_or(false),
            user: file.user,
            version: file.version,
        }
    }
}

impl Deploy {
    /// Load a deploy description from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::io("read deploy file", path, e))?;
        Self::from_yaml(&content).map_err(|e| match e {
            Error::Deploy { message, .. } => Error::deploy(message, Some(path.to_path_buf())),
            other => other,
        })
    }

    /// Parse a deploy description from YAML text. An empty document yields
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: Option<DeployFile> =
            serde_yaml::from_str(content).map_err(|e| Error::deploy(e.to_string(), None))?;
        Ok(file.unwrap_or_default().into())
    }

    /// Return a copy with every `Some` override applied.
    #[must_use]
    pub fn with_overrides(&self, overrides: &DeployOverrides) -> Self {
        let pick = |value: &Option<String>, current: &Option<String>| {
            value.clone().or_else(|| current.clone())
        };

        Self {
            name: pick(&overrides.name, &self.name),
            buildscript: pick(&overrides.buildscript, &self.buildscript),
            postinstall: pick(&overrides.postinstall, &self.postinstall),
            config_files: overrides
                .config_files
                .clone()
                .unwrap_or_else(|| self.config_files.clone()),
            pip: overrides.pip.clone().unwrap_or_else(|| self.pip.clone()),
            dependencies: overrides
                .dependencies
                .clone()
                .unwrap_or_else(|| self.dependencies.clone()),
            virtualenv_prefix: pick(&overrides.virtualenv_prefix, &self.virtualenv_prefix),
            allow_broken_build: overrides
                .allow_broken_build
                .unwrap_or(self.allow_broken_build),
            user: pick(&overrides.user, &self.user),
            version: pick(&overrides.version, &self.version),
        }
    }

    /// The build script, treating an empty path as unset.
    #[must_use]
    pub fn buildscript(&self) -> Option<&str> {
        self.buildscript.as_deref().filter(|s| !s.is_empty())
    }

    /// The post-install script, treating an empty path as unset.
    #[must_use]
    pub fn postinstall(&self) -> Option<&str> {
        self.postinstall.as_deref().filter(|s| !s.is_empty())
    }

    /// The package name, or an empty string when none has been resolved.
    #[must_use]
    pub fn name_or_empty(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }
}

/// Field-by-field replacements for a [`Deploy`]. `None` leaves the field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOverrides {
    /// Replacement package name.
    pub name: Option<String>,
    /// Replacement build script.
    pub buildscript: Option<String>,
    /// Replacement post-install script.
    pub postinstall: Option<String>,
    /// Replacement config files.
    pub config_files: Option<Vec<ConfigFiles>>,
    /// Replacement pip requirements.
    pub pip: Option<Vec<String>>,
    /// Replacement package dependencies.
    pub dependencies: Option<Vec<String>>,
    /// Replacement virtualenv prefix.
    pub virtualenv_prefix: Option<String>,
    /// Replacement broken-build policy.
    pub allow_broken_build: Option<bool>,
    /// Replacement owning user.
    pub user: Option<String>,
    /// Replacement version.
    pub version: Option<String>,
}

impl DeployOverrides {
    /// Set an override by attribute name. List attributes take
    /// comma-separated values.
    ///
    /// # Errors
    ///
    /// Returns an error for attributes a [`Deploy`] does not have, or for a
    /// non-boolean `allow_broken_build`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let list = || {
            value
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        };

        match key {
            "name" => self.name = Some(value.to_string()),
            "buildscript" => self.buildscript = Some(value.to_string()),
            "postinstall" => self.postinstall = Some(value.to_string()),
            "pip" => self.pip = Some(list()),
            "dependencies" => self.dependencies = Some(list()),
            "virtualenv_prefix" => self.virtualenv_prefix = Some(value.to_string()),
            "allow_broken_build" => {
                let flag = value.parse().map_err(|_| {
                    Error::deploy(
                        format!("allow_broken_build must be true or false, got '{value}'"),
                        None,
                    )
                })?;
                self.allow_broken_build = Some(flag);
            }
            "user" => self.user = Some(value.to_string()),
            "version" => self.version = Some(value.to_string()),
            _ => return Err(Error::deploy(format!("Deploy has no attribute '{key}'"), None)),
        }
        Ok(())
    }
}
