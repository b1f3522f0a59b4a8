use reqwest::Client;

use crate::{config::InstallerConfig, http, platform::Platform};

/// Everything one install run needs, resolved up front.
#[derive(Debug, Clone)]
pub struct InstallContext {
    config: InstallerConfig,
    platform: Platform,
    http: Client,
}

impl InstallContext {
    pub fn new(config: InstallerConfig) -> anyhow::Result<Self> {
        let http = http::build_client(&config)?;
        Ok(Self {
            config,
            platform: Platform::detect(),
            http,
        })
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn http(&self) -> &Client {
        &self.http
    }
}
