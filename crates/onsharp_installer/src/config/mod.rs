use std::{
    env,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing_subscriber::{EnvFilter, fmt};

pub const DEFAULT_MANIFEST_URL: &str = "https://eternitylife.de/onsharp_update.json";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/4.0";
pub const SERVER_CONFIG_FILE: &str = "server_config.json";
pub const ARCHIVE_FILE: &str = "install.zip";
pub const OVERRIDES_FILE: &str = "onsharp_installer.yml";
pub const PLUGIN_ID: &str = "onsharp-runtime";
pub const PACKAGE_ID: &str = "onsharp";

const MANIFEST_URL_ENV: &str = "ONSHARP_MANIFEST_URL";
const TIMEOUT_ENV: &str = "ONSHARP_HTTP_TIMEOUT_SECS";

#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Directory holding the installer binary. Config lookup and extraction
    /// target; never overridden.
    pub install_dir: PathBuf,
    pub manifest_url: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub plugin_id: String,
    pub package_id: String,
}

/// Optional operator overrides read from `onsharp_installer.yml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstallerOverrides {
    #[serde(default)]
    pub manifest_url: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub plugin_id: Option<String>,
    #[serde(default)]
    pub package_id: Option<String>,
}

impl InstallerConfig {
    /// Resolve the directory of the running executable and load settings for it.
    pub fn load() -> anyhow::Result<Self> {
        let exe = env::current_exe().with_context(|| "locating installer executable")?;
        let install_dir = exe
            .parent()
            .map(Path::to_path_buf)
            .with_context(|| format!("executable {:?} has no parent directory", exe))?;
        Self::load_for_dir(install_dir)
    }

    /// Defaults, then `onsharp_installer.yml` in `install_dir` if present,
    /// then environment variables.
    pub fn load_for_dir(install_dir: PathBuf) -> anyhow::Result<Self> {
        let mut config = Self::with_defaults(install_dir);

        let overrides_path = config.install_dir.join(OVERRIDES_FILE);
        if overrides_path.exists() {
            let overrides: InstallerOverrides = load_yaml(&overrides_path)?;
            config.apply(overrides);
        }

        if let Ok(url) = env::var(MANIFEST_URL_ENV) {
            config.manifest_url = url;
        }
        if let Ok(raw) = env::var(TIMEOUT_ENV) {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("parsing {TIMEOUT_ENV}={raw:?}"))?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_defaults(install_dir: PathBuf) -> Self {
        Self {
            install_dir,
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(default_connect_timeout_secs()),
            request_timeout: Duration::from_secs(default_request_timeout_secs()),
            plugin_id: PLUGIN_ID.to_string(),
            package_id: PACKAGE_ID.to_string(),
        }
    }

    pub fn server_config_path(&self) -> PathBuf {
        self.install_dir.join(SERVER_CONFIG_FILE)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.install_dir.join(ARCHIVE_FILE)
    }

    fn apply(&mut self, overrides: InstallerOverrides) {
        if let Some(url) = overrides.manifest_url {
            self.manifest_url = url;
        }
        if let Some(agent) = overrides.user_agent {
            self.user_agent = agent;
        }
        if let Some(secs) = overrides.connect_timeout_secs {
            self.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(id) = overrides.plugin_id {
            self.plugin_id = id;
        }
        if let Some(id) = overrides.package_id {
            self.package_id = id;
        }
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn load_yaml<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading yaml {:?}", path))?;
    let parsed =
        serde_yaml::from_str(&content).with_context(|| format!("parsing yaml {:?}", path))?;
    Ok(parsed)
}

/// Console progress goes to stdout; diagnostics go to stderr and stay quiet
/// unless `RUST_LOG` asks for more.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
