//! Project configuration loading and validation.
//!
//! The configuration is parsed once from `thrust.yml` (or a `.toml`
//! equivalent), verified against [`THRUST_VERSION`], defaulted, and then
//! treated as read-only for the rest of the process.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::commands::simulator::Launcher;
use crate::error::{Error, Result};
use crate::overrides::Overrides;

/// Minimum configuration version this engine accepts.
pub const THRUST_VERSION: f64 = 0.1;

/// Device identifier given to spec targets that do not name one.
pub const DEFAULT_DEVICE: &str = "iphonesimulator";

/// Build directory, relative to the project root, when none is configured.
pub const DEFAULT_BUILD_DIR: &str = "build";

/// Configuration file looked up in the project root.
pub const DEFAULT_CONFIG_FILE: &str = "thrust.yml";

/// Per-target spec settings as written in the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSpecTarget {
    /// Simulator device family.
    #[serde(default)]
    pub device: Option<String>,
}

/// The configuration document before validation and defaulting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConfig {
    /// Xcode project (and workspace) base name.
    pub project_name: String,
    /// Build directory relative to the project root.
    #[serde(default)]
    pub build_dir: Option<String>,
    /// Code-signing identity used when packaging.
    #[serde(default)]
    pub identity: Option<String>,
    /// Path to the simulator launcher (`waxsim` or `ios-sim`).
    #[serde(default)]
    pub sim_binary: Option<PathBuf>,
    /// Build through `<project_name>.xcworkspace` when a target is given.
    #[serde(default)]
    pub use_workspace: bool,
    /// Version of the configuration format.
    #[serde(default, alias = "config_version")]
    pub thrust_version: Option<f64>,
    /// Spec bundles keyed by target name.
    #[serde(default)]
    pub spec_targets: BTreeMap<String, Option<RawSpecTarget>>,
    /// Directory, relative to the project root, for JUnit XML reports.
    #[serde(default)]
    pub spec_reports_dir: Option<String>,
    /// Extra options handed to the spec reporter.
    #[serde(default)]
    pub spec_reporter_opts: Option<String>,
    /// Fixed home directory for the app under test.
    #[serde(default)]
    pub spec_user_home: Option<PathBuf>,
}

impl RawConfig {
    /// Parses a YAML configuration document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse configuration: {}", e)))
    }

    /// Parses a TOML configuration document.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse configuration: {}", e)))
    }

    /// Reads a configuration file, choosing the format by extension.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_yaml(&content),
        }
    }
}

/// Spec target settings after defaulting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecTarget {
    /// Simulator device family, never empty.
    pub device: String,
}

/// Validated, defaulted settings for one project.
#[derive(Debug, Clone)]
pub struct Configuration {
    project_root: PathBuf,
    build_dir: PathBuf,
    project_name: String,
    identity: Option<String>,
    launcher: Option<Launcher>,
    use_workspace: bool,
    config_version: f64,
    spec_targets: BTreeMap<String, SpecTarget>,
    spec_reports_dir: Option<String>,
    spec_reporter_opts: Option<String>,
    spec_user_home: Option<PathBuf>,
    overrides: Overrides,
}

impl Configuration {
    /// Builds a configuration from a parsed document.
    ///
    /// Fails with [`Error::ConfigTooOld`] when the document's version is
    /// below [`THRUST_VERSION`] and with [`Error::UnknownLauncherBinary`]
    /// when `sim_binary` names an unsupported launcher.
    pub fn load(
        project_root: impl AsRef<Path>,
        raw: RawConfig,
        overrides: Overrides,
    ) -> Result<Self> {
        let project_root = std::path::absolute(project_root.as_ref())?;

        let configured = raw.thrust_version.unwrap_or(0.0);
        // Written so that NaN is rejected too.
        if !(configured >= THRUST_VERSION) {
            return Err(Error::ConfigTooOld {
                configured,
                required: THRUST_VERSION,
            });
        }

        let build_dir =
            project_root.join(raw.build_dir.as_deref().unwrap_or(DEFAULT_BUILD_DIR));

        let launcher = raw.sim_binary.map(Launcher::from_binary).transpose()?;

        let spec_targets = raw
            .spec_targets
            .into_iter()
            .map(|(name, target)| {
                let device = target
                    .and_then(|t| t.device)
                    .filter(|device| !device.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_DEVICE.to_string());
                (name, SpecTarget { device })
            })
            .collect();

        let config = Self {
            project_root,
            build_dir,
            project_name: raw.project_name,
            identity: raw.identity,
            launcher,
            use_workspace: raw.use_workspace,
            config_version: configured,
            spec_targets,
            spec_reports_dir: raw.spec_reports_dir,
            spec_reporter_opts: raw.spec_reporter_opts,
            spec_user_home: raw.spec_user_home,
            overrides,
        };

        for warning in config.validate().into_result()? {
            tracing::warn!("{}", warning);
        }

        Ok(config)
    }

    /// Reads and loads the configuration file at `config_path`.
    pub fn from_file(
        project_root: impl AsRef<Path>,
        config_path: impl AsRef<Path>,
        overrides: Overrides,
    ) -> Result<Self> {
        let raw = RawConfig::read(config_path)?;
        Self::load(project_root, raw, overrides)
    }

    /// Loads `thrust.yml` from the project root.
    pub fn discover(project_root: impl AsRef<Path>, overrides: Overrides) -> Result<Self> {
        let project_root = project_root.as_ref();
        Self::from_file(
            project_root,
            project_root.join(DEFAULT_CONFIG_FILE),
            overrides,
        )
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// The simulator launcher, if one is configured.
    pub fn launcher(&self) -> Option<&Launcher> {
        self.launcher.as_ref()
    }

    pub fn use_workspace(&self) -> bool {
        self.use_workspace
    }

    pub fn config_version(&self) -> f64 {
        self.config_version
    }

    pub fn spec_targets(&self) -> &BTreeMap<String, SpecTarget> {
        &self.spec_targets
    }

    pub fn spec_target(&self, name: &str) -> Option<&SpecTarget> {
        self.spec_targets.get(name)
    }

    pub fn spec_reports_dir(&self) -> Option<&str> {
        self.spec_reports_dir.as_deref()
    }

    pub fn spec_reporter_opts(&self) -> Option<&str> {
        self.spec_reporter_opts.as_deref()
    }

    pub fn spec_user_home(&self) -> Option<&Path> {
        self.spec_user_home.as_deref()
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    /// Directory receiving `<label>.output` command logs.
    pub fn log_dir(&self) -> &Path {
        self.overrides
            .ci_artifacts_dir
            .as_deref()
            .unwrap_or(&self.build_dir)
    }

    /// Path of the log artifact for an operation label.
    pub fn log_file(&self, label: &str) -> PathBuf {
        self.log_dir().join(format!("{}.output", label))
    }

    /// Directory xcodebuild places products in for a configuration and platform.
    pub fn products_dir(&self, configuration: &str, platform: &str) -> PathBuf {
        self.build_dir.join(format!("{}-{}", configuration, platform))
    }

    /// JUnit report path for a spec target, when reports are configured.
    pub fn spec_report_path(&self, target: &str) -> Option<PathBuf> {
        self.spec_reports_dir
            .as_ref()
            .map(|dir| self.project_root.join(dir).join(format!("{}.xml", target)))
    }
}

/// Validation result containing all found issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation errors (fatal).
    pub errors: Vec<String>,
    /// List of validation warnings (non-fatal).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Converts to a Result, failing if there are errors.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.is_valid() {
            Ok(self.warnings)
        } else {
            Err(Error::Config(self.errors.join("; ")))
        }
    }
}

/// Trait for validatable configuration types.
pub trait Validate {
    /// Validates the configuration and returns any issues found.
    fn validate(&self) -> ValidationResult;
}

impl Validate for Configuration {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.project_name.trim().is_empty() {
            result.add_error("project_name cannot be empty");
        }

        if self.identity.as_deref().is_none_or(|id| id.trim().is_empty()) {
            result.add_warning("no signing identity configured, packaging is unavailable");
        }

        if self.launcher.is_none() {
            result.add_warning("no sim_binary configured, specs cannot be run");
        }

        if self.spec_targets.is_empty() {
            result.add_warning("no spec_targets defined");
            if self.use_workspace {
                result.add_warning(
                    "use_workspace is set but no spec_targets are defined to use as schemes",
                );
            }
        }

        if self.spec_reporter_opts.is_some() && self.spec_reports_dir.is_none() {
            result.add_warning("spec_reporter_opts is set without spec_reports_dir");
        }

        result
    }
}
