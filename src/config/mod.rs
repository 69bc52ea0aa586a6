use std::fs;

use log::{debug, trace};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{
    config_error,
    core::error::{ErrorContext, ProviderResult},
};

static OBJECT_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/[A-Za-z0-9_]+)+$").expect("valid object path regex"));
static BUS_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*(\.[A-Za-z_][A-Za-z0-9_-]*)+$")
        .expect("valid bus name regex")
});
static NODE_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid node prefix regex"));
static URI_SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*$").expect("valid scheme regex"));

#[derive(Default, Debug, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    #[serde(default)]
    pub provider: Provider,

    #[validate(nested)]
    #[serde(default)]
    pub daemon: Daemon,

    #[validate(nested)]
    #[serde(default)]
    pub dispatch: Dispatch,

    #[validate(nested)]
    #[serde(default)]
    pub launcher: Launcher,

    #[serde(default)]
    pub log: Log,
}

// Config file load and validation
impl Config {
    pub fn load_from_yaml<P>(path: P) -> ProviderResult<Self>
    where
        P: AsRef<std::path::Path> + std::fmt::Display,
    {
        let conf_str = fs::read_to_string(&path)
            .with_context(&format!("Unable to read conf file from {path}"))?;
        debug!("Conf file read from {path}");
        Self::from_yaml(&conf_str)
    }

    // config file load entry point
    pub fn load_with_opt_override(conf: Option<&str>) -> ProviderResult<Self> {
        match conf {
            Some(path) => Self::load_from_yaml(path),
            None => {
                debug!("No conf file given, using defaults");
                let conf = Self::default();
                conf.validate()
                    .map_err(|e| config_error!("Default conf is invalid: {}", e))?;
                Ok(conf)
            }
        }
    }

    pub fn from_yaml(conf_str: &str) -> ProviderResult<Self> {
        trace!("Read conf file: {conf_str}");
        // An empty document means "all defaults".
        let conf: Config = if conf_str.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(conf_str)
                .map_err(|e| config_error!("Unable to parse yaml conf: {}", e))?
        };

        trace!("Loaded conf: {conf:?}");

        conf.validate()
            .map_err(|e| config_error!("Conf file valid failed: {}", e))?;

        Ok(conf)
    }

    pub fn to_yaml(&self) -> ProviderResult<String> {
        serde_yaml::to_string(self).map_err(|e| config_error!("Unable to render conf: {}", e))
    }
}

/// The search provider's own bus identity
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Provider {
    #[validate(custom(function = "validate_bus_name"))]
    pub bus_name: String,
    #[validate(custom(function = "validate_object_path"))]
    pub object_path: String,
    #[validate(custom(function = "validate_node_prefix"))]
    pub channel_node_prefix: String,
}

impl Default for Provider {
    fn default() -> Self {
        Self {
            bus_name: "org.learningequality.Kolibri.SearchProvider".to_string(),
            object_path: "/org/learningequality/Kolibri/SearchProvider".to_string(),
            channel_node_prefix: "channel_".to_string(),
        }
    }
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusType {
    #[default]
    Session,
    System,
}

/// Where the content daemon is reached
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Daemon {
    pub bus: BusType,
    #[validate(custom(function = "validate_bus_name"))]
    pub bus_name: String,
    #[validate(custom(function = "validate_object_path"))]
    pub object_path: String,
}

impl Default for Daemon {
    fn default() -> Self {
        Self {
            bus: BusType::Session,
            bus_name: "org.learningequality.Kolibri.Daemon".to_string(),
            object_path: "/org/learningequality/Kolibri/Daemon".to_string(),
        }
    }
}

/// How activation requests are rendered as URIs
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Dispatch {
    #[validate(custom(function = "validate_uri_scheme"))]
    pub scheme: String,
    #[validate(length(min = 1))]
    pub search_key: String,
}

impl Default for Dispatch {
    fn default() -> Self {
        Self {
            scheme: "x-kolibri-dispatch".to_string(),
            search_key: "search".to_string(),
        }
    }
}

/// Program that opens a dispatch URI, which is appended to `args`
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Launcher {
    #[validate(length(min = 1))]
    pub program: String,
    pub args: Vec<String>,
}

impl Default for Launcher {
    fn default() -> Self {
        Self {
            program: "xdg-open".to_string(),
            args: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Log {
    /// env_logger filter used when `RUST_LOG` is not set
    pub level: String,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn validate_with(re: &Regex, value: &str, code: &'static str) -> Result<(), ValidationError> {
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new(code))
    }
}

fn validate_object_path(path: &str) -> Result<(), ValidationError> {
    validate_with(&OBJECT_PATH_RE, path, "invalid_object_path")
}

fn validate_bus_name(name: &str) -> Result<(), ValidationError> {
    validate_with(&BUS_NAME_RE, name, "invalid_bus_name")
}

fn validate_node_prefix(prefix: &str) -> Result<(), ValidationError> {
    validate_with(&NODE_PREFIX_RE, prefix, "invalid_node_prefix")
}

fn validate_uri_scheme(scheme: &str) -> Result<(), ValidationError> {
    validate_with(&URI_SCHEME_RE, scheme, "invalid_uri_scheme")
}
