// src/config.rs

use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Json, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::ConfigError;
use crate::core::runner::ToolCommand;
use crate::logging::{project_directory, PROJECT_NAME};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub http: HttpConfig,
    pub defaults: DefaultOptions,
    pub port_scanner: ToolTemplate,
    pub vulnerability_scanner: ToolTemplate,
    /// Replaces the bundled fingerprint library when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint_library: Option<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            defaults: DefaultOptions::default(),
            port_scanner: ToolTemplate {
                program: "nmap".into(),
                args: ["-sV", "-T{intensity}", "-p", "{ports}", "{target}"].map(String::from).to_vec(),
            },
            vulnerability_scanner: ToolTemplate {
                program: "nikto".into(),
                args: ["-h", "{url}", "-maxtime", "{timeout}s", "-Format", "json", "-output", "-"]
                    .map(String::from)
                    .to_vec(),
            },
            fingerprint_library: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub max_redirects: usize,
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("VanguardRecon/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 5,
            timeout_seconds: 10,
        }
    }
}

/// Options applied when a request leaves them unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultOptions {
    pub port_range: String,
    pub intensity: u8,
    pub timeout_seconds: u64,
}

impl Default for DefaultOptions {
    fn default() -> Self {
        Self { port_range: "1-1000".into(), intensity: 3, timeout_seconds: 300 }
    }
}

/// An external tool invocation with `{placeholder}` arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolTemplate {
    pub program: String,
    pub args: Vec<String>,
}

/// Values substituted into a [`ToolTemplate`].
#[derive(Debug, Clone, Copy)]
pub struct TemplateValues<'a> {
    pub target: &'a str,
    pub url: &'a str,
    pub ports: &'a str,
    pub intensity: u8,
    pub timeout_seconds: u64,
}

impl ToolTemplate {
    pub fn expand(&self, values: &TemplateValues<'_>) -> ToolCommand {
        let intensity = values.intensity.to_string();
        let timeout = values.timeout_seconds.to_string();
        let args = self.args.iter().map(|arg| {
            arg.replace("{target}", values.target)
                .replace("{url}", values.url)
                .replace("{ports}", values.ports)
                .replace("{intensity}", &intensity)
                .replace("{timeout}", &timeout)
        });
        ToolCommand::new(self.program.clone(), args)
    }
}

impl ScannerConfig {
    /// Loads the configuration.
    ///
    /// Defaults are overlaid with a JSON file and then with
    /// `<PROJECT>_<SECTION>__<FIELD>` environment variables. The file is `explicit`,
    /// else the path in `<PROJECT>_CONFIG`, else `config.json` in the platform
    /// config directory. Only the last one may be missing.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Figment::from(env_provider().only(&["config"])).extract_inner::<PathBuf>("config").ok(),
        };

        let figment = match file {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::MissingFile(path));
                }
                info!(path = %path.display(), "Loading configuration.");
                defaults().merge(Json::file_exact(path))
            }
            None => match project_directory().map(|dirs| dirs.config_dir().join("config.json")) {
                Some(path) if path.is_file() => {
                    info!(path = %path.display(), "Loading configuration.");
                    defaults().merge(Json::file_exact(path))
                }
                _ => {
                    debug!("No configuration file found, using defaults.");
                    defaults()
                }
            },
        };

        Ok(figment.merge(env_provider().ignore(&["config", "loglevel"])).extract()?)
    }

    /// Parses an inline JSON document over the defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(defaults().merge(Json::string(text)).extract()?)
    }
}

fn defaults() -> Figment {
    Figment::from(Serialized::defaults(ScannerConfig::default()))
}

fn env_provider() -> Env {
    Env::prefixed(&format!("{}_", PROJECT_NAME.as_str())).split("__")
}
