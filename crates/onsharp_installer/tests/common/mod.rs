use std::{
    fs,
    io::{Cursor, Write},
    path::{Path, PathBuf},
};

use anyhow::Result;
use zip::write::SimpleFileOptions;

/// Write a `server_config.json` into `root` and return its path.
pub fn install_server_config(root: &Path, content: &str) -> Result<PathBuf> {
    let path = root.join("server_config.json");
    fs::write(&path, content)?;
    Ok(path)
}

/// Build an in-memory zip from `(name, bytes)` pairs. Names ending in `/`
/// become directory entries.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Result<Vec<u8>> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options)?;
        } else {
            writer.start_file(*name, options)?;
            writer.write_all(data.as_bytes())?;
        }
    }
    Ok(writer.finish()?.into_inner())
}
