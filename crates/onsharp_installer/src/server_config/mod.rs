use std::{
    fs,
    path::{Path, PathBuf},
};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::InstallError;

const PLUGINS_KEY: &str = "plugins";
const PACKAGES_KEY: &str = "packages";

/// Which identifiers a merge actually appended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub plugin_added: bool,
    pub package_added: bool,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        self.plugin_added || self.package_added
    }
}

/// The game server's `server_config.json`. Only `plugins` and `packages` are
/// interpreted; every other field is carried through untouched and in its
/// original order.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    root: Map<String, Value>,
}

impl ServerConfig {
    /// Parse and check that both registration arrays are present. `path` is
    /// only used to label errors.
    pub fn parse(path: &Path, text: &str) -> Result<Self, InstallError> {
        let format_error = |reason: String| InstallError::ConfigFormat {
            path: path.to_path_buf(),
            reason,
        };

        let value: Value = serde_json::from_str(text)
            .map_err(|err| format_error(format!("not valid json: {err}")))?;
        let Value::Object(root) = value else {
            return Err(format_error("root must be an object".to_string()));
        };

        for key in [PLUGINS_KEY, PACKAGES_KEY] {
            match root.get(key) {
                Some(Value::Array(_)) => {}
                Some(_) => return Err(format_error(format!("`{key}` must be an array"))),
                None => return Err(format_error(format!("missing `{key}` array"))),
            }
        }

        Ok(Self { root })
    }

    /// Append each identifier to its array unless it is already listed.
    pub fn register(&mut self, plugin_id: &str, package_id: &str) -> MergeOutcome {
        MergeOutcome {
            plugin_added: self.append_if_absent(PLUGINS_KEY, plugin_id),
            package_added: self.append_if_absent(PACKAGES_KEY, package_id),
        }
    }

    pub fn plugins(&self) -> &[Value] {
        self.array(PLUGINS_KEY)
    }

    pub fn packages(&self) -> &[Value] {
        self.array(PACKAGES_KEY)
    }

    /// Two-space indented JSON with a trailing newline.
    pub fn to_pretty_string(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(&self.root)?;
        out.push('\n');
        Ok(out)
    }

    fn array(&self, key: &str) -> &[Value] {
        self.root
            .get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn append_if_absent(&mut self, key: &str, id: &str) -> bool {
        let Some(Value::Array(entries)) = self.root.get_mut(key) else {
            return false;
        };
        if entries.iter().any(|entry| entry.as_str() == Some(id)) {
            debug!(array = key, id, "identifier already registered");
            return false;
        }
        entries.push(Value::String(id.to_string()));
        true
    }
}

/// Read `path`, register both identifiers and write the document back.
///
/// The new content goes to a sibling temp file that is renamed over the
/// original, so the config is either fully rewritten or left as it was.
pub fn register_components(
    path: &Path,
    plugin_id: &str,
    package_id: &str,
) -> Result<MergeOutcome, InstallError> {
    let text = fs::read_to_string(path)
        .map_err(|err| InstallError::io(format!("reading {:?}", path), err))?;
    let mut config = ServerConfig::parse(path, &text)?;
    let outcome = config.register(plugin_id, package_id);

    let rendered = config
        .to_pretty_string()
        .map_err(|err| InstallError::ConfigFormat {
            path: path.to_path_buf(),
            reason: format!("serializing: {err}"),
        })?;

    let staging = staging_path(path);
    fs::write(&staging, rendered)
        .map_err(|err| InstallError::io(format!("writing {:?}", staging), err))?;
    if let Err(err) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(InstallError::io(format!("replacing {:?}", path), err));
    }

    info!(
        path = ?path,
        plugin_added = outcome.plugin_added,
        package_added = outcome.package_added,
        "server config updated"
    );
    Ok(outcome)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
