use std::fmt;

use crate::error::InstallError;

pub const CONSOLE_TAG: &str = "[Onsharp-Installer]";

/// Steps of an install run, in the order they are entered.
///
/// There is no aborted variant: a run that fails stays at the stage it was
/// in, and the abort is delivered through [`ProgressReporter::aborted`]
/// together with that stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    ConfigCheck,
    PlatformCheck,
    ManifestFetch,
    Download,
    Extract,
    ConfigMerge,
    Cleanup,
    Done,
}

impl Stage {
    /// Status line shown when the stage begins, if it has one.
    pub fn status_line(self) -> Option<&'static str> {
        match self {
            Stage::Start | Stage::ConfigCheck | Stage::PlatformCheck | Stage::Done => None,
            Stage::ManifestFetch => Some("Retrieving dist meta..."),
            Stage::Download => Some("Downloading install file..."),
            Stage::Extract => Some("Installing files..."),
            Stage::ConfigMerge => Some("Adjusting server..."),
            Stage::Cleanup => Some("Cleaning environment..."),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Start => "start",
            Stage::ConfigCheck => "config check",
            Stage::PlatformCheck => "platform check",
            Stage::ManifestFetch => "manifest fetch",
            Stage::Download => "download",
            Stage::Extract => "extract",
            Stage::ConfigMerge => "config merge",
            Stage::Cleanup => "cleanup",
            Stage::Done => "done",
        };
        f.write_str(label)
    }
}

/// Receives progress from the install pipeline.
pub trait ProgressReporter {
    fn stage_started(&mut self, stage: Stage);
    fn warning(&mut self, message: &str);
    fn finished(&mut self);
    fn aborted(&mut self, stage: Stage, error: &InstallError);
}

/// Prints one tagged line per stage to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn stage_started(&mut self, stage: Stage) {
        if let Some(line) = stage.status_line() {
            println!("{CONSOLE_TAG} {line}");
        }
    }

    fn warning(&mut self, message: &str) {
        println!("{CONSOLE_TAG} WARNING: {message}");
    }

    fn finished(&mut self) {
        println!("{CONSOLE_TAG} Successfully installed!");
    }

    fn aborted(&mut self, stage: Stage, error: &InstallError) {
        match error {
            InstallError::MissingConfig { .. } => println!(
                "{CONSOLE_TAG} NO SERVER CONFIG FILE FOUND: THE INSTALLER MUST BE IN THE SERVER DIRECTORY!"
            ),
            InstallError::UnsupportedPlatform { .. } => println!(
                "{CONSOLE_TAG} THE OS IS NOT SUPPORTED: ONSHARP ONLY SUPPORTS WINDOWS AND LINUX!"
            ),
            _ => println!("{CONSOLE_TAG} Installation aborted during {stage}: {error}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Stage(Stage),
    Warning(String),
    Finished,
    Aborted { stage: Stage, message: String },
}

/// Keeps every event in memory; used to observe a run without a console.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub events: Vec<ProgressEvent>,
}

impl RecordingReporter {
    pub fn stages(&self) -> Vec<Stage> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Stage(stage) => Some(*stage),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for RecordingReporter {
    fn stage_started(&mut self, stage: Stage) {
        self.events.push(ProgressEvent::Stage(stage));
    }

    fn warning(&mut self, message: &str) {
        self.events.push(ProgressEvent::Warning(message.to_string()));
    }

    fn finished(&mut self) {
        self.events.push(ProgressEvent::Finished);
    }

    fn aborted(&mut self, stage: Stage, error: &InstallError) {
        self.events.push(ProgressEvent::Aborted {
            stage,
            message: error.to_string(),
        });
    }
}
