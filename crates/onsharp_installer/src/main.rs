use std::process::ExitCode;

use onsharp_installer::{
    config::{self, InstallerConfig},
    orchestrator::Installer,
    progress::ConsoleReporter,
    state::InstallContext,
};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    config::init_tracing();
    let config = InstallerConfig::load()?;
    info!(install_dir = ?config.install_dir, manifest = %config.manifest_url, "starting install");
    let ctx = InstallContext::new(config)?;

    let mut reporter = ConsoleReporter;
    match Installer::new(ctx).run(&mut reporter).await {
        Ok(report) => {
            info!(
                platform = %report.platform,
                files = report.extracted.files,
                archive_removed = report.archive_removed,
                "install finished"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) if err.is_precondition() => Ok(ExitCode::SUCCESS),
        Err(_) => Ok(ExitCode::FAILURE),
    }
}
