use std::fs;

use tracing::{debug, info};

use crate::{
    download,
    error::InstallError,
    extract::{self, ExtractSummary},
    manifest,
    platform::Platform,
    progress::{ProgressReporter, Stage},
    server_config::{self, MergeOutcome},
    state::InstallContext,
};

#[derive(Debug, Clone)]
pub struct InstallReport {
    pub platform: Platform,
    pub archive_url: String,
    pub archive_bytes: u64,
    pub extracted: ExtractSummary,
    pub merge: MergeOutcome,
    /// False when the downloaded archive could not be deleted afterwards.
    pub archive_removed: bool,
}

/// Drives `ConfigCheck → PlatformCheck → ManifestFetch → Download → Extract →
/// ConfigMerge → Cleanup → Done`. Any failure aborts the run at the current
/// stage; nothing is rolled back and the archive stays on disk.
pub struct Installer {
    ctx: InstallContext,
}

impl Installer {
    pub fn new(ctx: InstallContext) -> Self {
        Self { ctx }
    }

    pub async fn run(
        &self,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<InstallReport, InstallError> {
        let mut stage = Stage::Start;
        let result = self.run_stages(&mut stage, reporter).await;
        match &result {
            Ok(_) => reporter.finished(),
            Err(err) => {
                // The reporter owns the user-facing abort line.
                debug!(
                    %stage,
                    error = ?err,
                    precondition = err.is_precondition(),
                    "install aborted"
                );
                reporter.aborted(stage, err);
            }
        }
        result
    }

    async fn run_stages(
        &self,
        stage: &mut Stage,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<InstallReport, InstallError> {
        let config = self.ctx.config();

        enter(stage, Stage::Start, reporter);

        enter(stage, Stage::ConfigCheck, reporter);
        let config_path = config.server_config_path();
        if !config_path.is_file() {
            return Err(InstallError::MissingConfig { path: config_path });
        }

        enter(stage, Stage::PlatformCheck, reporter);
        let platform = self.ctx.platform();
        if !platform.is_supported() {
            return Err(InstallError::UnsupportedPlatform { platform });
        }

        enter(stage, Stage::ManifestFetch, reporter);
        let manifest = manifest::fetch_manifest(self.ctx.http(), &config.manifest_url).await?;
        let archive_url = manifest
            .archive_url_for(platform)
            .ok_or(InstallError::UnsupportedPlatform { platform })?
            .to_string();
        info!(%platform, url = %archive_url, "selected archive");

        enter(stage, Stage::Download, reporter);
        let archive_path = config.archive_path();
        let archive_bytes =
            download::download_archive(self.ctx.http(), &archive_url, &archive_path).await?;

        enter(stage, Stage::Extract, reporter);
        let extracted = extract::extract_archive(&archive_path, &config.install_dir)?;

        enter(stage, Stage::ConfigMerge, reporter);
        let merge =
            server_config::register_components(&config_path, &config.plugin_id, &config.package_id)?;

        enter(stage, Stage::Cleanup, reporter);
        let archive_removed = match fs::remove_file(&archive_path) {
            Ok(()) => true,
            Err(err) => {
                debug!(path = ?archive_path, error = %err, "could not remove install archive");
                reporter.warning(&format!("could not remove {:?}: {err}", archive_path));
                false
            }
        };

        enter(stage, Stage::Done, reporter);
        Ok(InstallReport {
            platform,
            archive_url,
            archive_bytes,
            extracted,
            merge,
            archive_removed,
        })
    }
}

fn enter(current: &mut Stage, next: Stage, reporter: &mut dyn ProgressReporter) {
    *current = next;
    reporter.stage_started(next);
}
