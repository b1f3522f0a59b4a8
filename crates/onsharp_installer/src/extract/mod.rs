use std::{
    fs::{self, File},
    io,
    path::{Component, Path, PathBuf},
};

use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::ExtractionError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub directories: usize,
    pub bytes: u64,
}

/// Extract every entry of the zip at `archive` below `dest`.
///
/// All entry names are checked before anything is written, so an archive
/// carrying an entry that would land outside `dest` is refused as a whole.
/// Existing directories along each entry path are resolved as well; a
/// symlink leading out of `dest` refuses that entry before anything is
/// created through it. Past the name check extraction is not transactional:
/// a failure halfway leaves the entries written so far in place.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<ExtractSummary, ExtractionError> {
    let file = File::open(archive).map_err(|err| ExtractionError::Archive {
        archive: archive.to_path_buf(),
        source: zip::result::ZipError::Io(err),
    })?;
    let mut zip = ZipArchive::new(file).map_err(|source| ExtractionError::Archive {
        archive: archive.to_path_buf(),
        source,
    })?;

    create_dir(dest)?;
    let root = canonicalize(dest)?;
    let archive_path = canonicalize(archive)?;

    let mut targets = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let entry = zip
            .by_index_raw(index)
            .map_err(|source| ExtractionError::Archive {
                archive: archive.to_path_buf(),
                source,
            })?;
        let relative = sanitize_entry_path(entry.name())?;
        if root.join(&relative) == archive_path {
            return Err(ExtractionError::OverwritesArchive {
                entry: entry.name().to_string(),
            });
        }
        targets.push((entry.name().to_string(), relative));
    }

    let mut summary = ExtractSummary::default();
    for (index, (name, relative)) in targets.into_iter().enumerate() {
        let mut entry = zip
            .by_index(index)
            .map_err(|source| ExtractionError::Archive {
                archive: archive.to_path_buf(),
                source,
            })?;
        let target = root.join(&relative);

        if entry.is_dir() {
            ensure_contained(&root, &relative, &name)?;
            create_dir(&target)?;
            summary.directories += 1;
            continue;
        }

        if let Some(parent) = relative.parent() {
            ensure_contained(&root, parent, &name)?;
            create_dir(&root.join(parent))?;
        }
        remove_existing(&target)?;
        let mut out = File::create(&target).map_err(|source| ExtractionError::Write {
            path: target.clone(),
            source,
        })?;
        let copied = io::copy(&mut entry, &mut out).map_err(|source| ExtractionError::Write {
            path: target.clone(),
            source,
        })?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o777)).map_err(
                |source| ExtractionError::Write {
                    path: target.clone(),
                    source,
                },
            )?;
        }

        debug!(path = ?target, bytes = copied, "extracted entry");
        summary.files += 1;
        summary.bytes += copied;
    }

    info!(
        archive = ?archive,
        dest = ?dest,
        files = summary.files,
        directories = summary.directories,
        "archive extracted"
    );
    Ok(summary)
}

fn create_dir(path: &Path) -> Result<(), ExtractionError> {
    fs::create_dir_all(path).map_err(|source| ExtractionError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn canonicalize(path: &Path) -> Result<PathBuf, ExtractionError> {
    fs::canonicalize(path).map_err(|source| ExtractionError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Every already existing prefix of `relative` must resolve inside `root`.
/// Checking stops at the first missing component since everything below it
/// is created fresh.
fn ensure_contained(root: &Path, relative: &Path, entry: &str) -> Result<(), ExtractionError> {
    let mut current = root.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match fs::canonicalize(&current) {
            Ok(resolved) if resolved.starts_with(root) => {}
            Ok(_) => {
                return Err(ExtractionError::UnsafeEntry {
                    entry: entry.to_string(),
                });
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                // A dangling symlink has no canonical form but still redirects writes.
                if fs::symlink_metadata(&current).is_ok() {
                    return Err(ExtractionError::UnsafeEntry {
                        entry: entry.to_string(),
                    });
                }
                return Ok(());
            }
            Err(source) => {
                return Err(ExtractionError::Write {
                    path: current,
                    source,
                });
            }
        }
    }
    Ok(())
}

/// Unlink whatever file or symlink sits at `target` so the entry is written
/// as a new file, even when the old one was read-only.
fn remove_existing(target: &Path) -> Result<(), ExtractionError> {
    match fs::symlink_metadata(target) {
        Ok(meta) if !meta.is_dir() => fs::remove_file(target)
            .or_else(|err| match err.kind() {
                io::ErrorKind::NotFound => Ok(()),
                _ => Err(err),
            })
            .map_err(|source| ExtractionError::Write {
                path: target.to_path_buf(),
                source,
            }),
        _ => Ok(()),
    }
}

/// Turn a raw entry name into a path relative to the destination. Absolute
/// names, drive prefixes and any `..` segment are refused outright.
fn sanitize_entry_path(name: &str) -> Result<PathBuf, ExtractionError> {
    let unsafe_entry = || ExtractionError::UnsafeEntry {
        entry: name.to_string(),
    };

    let normalized_name = name.replace('\\', "/");
    if normalized_name.starts_with('/') || has_drive_prefix(&normalized_name) {
        return Err(unsafe_entry());
    }

    let mut relative = PathBuf::new();
    for component in Path::new(&normalized_name).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_entry());
            }
        }
    }
    Ok(relative)
}

fn has_drive_prefix(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    enum Entry<'a> {
        Dir(&'a str),
        File(&'a str, &'a [u8]),
    }

    fn write_zip(path: &Path, entries: &[Entry<'_>]) {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for entry in entries {
            match entry {
                Entry::Dir(name) => writer.add_directory(*name, options).unwrap(),
                Entry::File(name, data) => {
                    writer.start_file(*name, options).unwrap();
                    writer.write_all(data).unwrap();
                }
            }
        }
        let bytes = writer.finish().unwrap().into_inner();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn extracts_nested_paths_byte_identical() {
        let tmp = TempDir::new().expect("temp dir");
        let archive = tmp.path().join("install.zip");
        let dest = tmp.path().join("server");
        write_zip(
            &archive,
            &[
                Entry::Dir("a/"),
                Entry::File("a/b/c.txt", b"nested payload\n"),
                Entry::File("root.txt", b"top"),
            ],
        );

        let summary = extract_archive(&archive, &dest).expect("extraction succeeds");

        assert_eq!(
            fs::read(dest.join("a/b/c.txt")).unwrap(),
            b"nested payload\n"
        );
        assert_eq!(fs::read(dest.join("root.txt")).unwrap(), b"top");
        assert_eq!(summary.files, 2);
        assert_eq!(summary.directories, 1);
        assert_eq!(summary.bytes, 18);
    }

    #[test]
    fn empty_directory_entries_are_created() {
        let tmp = TempDir::new().expect("temp dir");
        let archive = tmp.path().join("install.zip");
        write_zip(&archive, &[Entry::Dir("plugins/onsharp-runtime/")]);

        extract_archive(&archive, tmp.path()).expect("extraction succeeds");

        assert!(tmp.path().join("plugins/onsharp-runtime").is_dir());
    }

    #[test]
    fn overwrites_existing_files() {
        let tmp = TempDir::new().expect("temp dir");
        let archive = tmp.path().join("install.zip");
        let dest = tmp.path().join("server");
        fs::create_dir_all(dest.join("packages")).unwrap();
        fs::write(dest.join("packages/onsharp.lua"), b"old and much longer content").unwrap();
        write_zip(&archive, &[Entry::File("packages/onsharp.lua", b"new")]);

        extract_archive(&archive, &dest).expect("extraction succeeds");

        assert_eq!(fs::read(dest.join("packages/onsharp.lua")).unwrap(), b"new");
    }

    #[test]
    fn refuses_traversal_without_writing_anything() {
        let tmp = TempDir::new().expect("temp dir");
        let archive = tmp.path().join("install.zip");
        let dest = tmp.path().join("server");
        fs::create_dir_all(&dest).unwrap();
        write_zip(
            &archive,
            &[
                Entry::File("fine.txt", b"ok"),
                Entry::File("a/../../evil.txt", b"pwned"),
            ],
        );

        let err = extract_archive(&archive, &dest).unwrap_err();

        assert!(matches!(err, ExtractionError::UnsafeEntry { .. }));
        assert!(!tmp.path().join("evil.txt").exists());
        assert!(!dest.join("fine.txt").exists());
    }

    #[test]
    fn sanitize_rejects_escaping_names() {
        for name in [
            "../x",
            "a/../../x",
            "/etc/passwd",
            "\\windows\\x.dll",
            "C:\\x.dll",
            "c:/x.dll",
            "..\\x",
        ] {
            assert!(
                sanitize_entry_path(name).is_err(),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn sanitize_normalizes_harmless_names() {
        assert_eq!(
            sanitize_entry_path("./a/./b.txt").unwrap(),
            PathBuf::from("a/b.txt")
        );
        assert_eq!(
            sanitize_entry_path("dir\\file.txt").unwrap(),
            PathBuf::from("dir/file.txt")
        );
    }

    #[test]
    fn malformed_archive_is_an_archive_error() {
        let tmp = TempDir::new().expect("temp dir");
        let archive = tmp.path().join("install.zip");
        fs::write(&archive, b"definitely not a zip file").unwrap();

        let err = extract_archive(&archive, tmp.path()).unwrap_err();

        assert!(matches!(err, ExtractionError::Archive { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn keeps_executable_bits() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().expect("temp dir");
        let archive = tmp.path().join("install.zip");
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(
                "bin/onsharp-runtime",
                SimpleFileOptions::default().unix_permissions(0o755),
            )
            .unwrap();
        writer.write_all(b"#!/bin/sh\n").unwrap();
        fs::write(&archive, writer.finish().unwrap().into_inner()).unwrap();

        extract_archive(&archive, tmp.path()).expect("extraction succeeds");

        let mode = fs::metadata(tmp.path().join("bin/onsharp-runtime"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    fn write_zip_with_mode(path: &Path, name: &str, data: &[u8], mode: u32) {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(name, SimpleFileOptions::default().unix_permissions(mode))
            .unwrap();
        writer.write_all(data).unwrap();
        fs::write(path, writer.finish().unwrap().into_inner()).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn read_only_entry_is_replaced_on_reinstall() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().expect("temp dir");
        let archive = tmp.path().join("install.zip");
        let dest = tmp.path().join("server");
        let target = dest.join("packages/onsharp/readme.txt");

        write_zip_with_mode(&archive, "packages/onsharp/readme.txt", b"first", 0o444);
        extract_archive(&archive, &dest).expect("first extraction succeeds");
        let mode = fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o444);

        write_zip_with_mode(&archive, "packages/onsharp/readme.txt", b"second", 0o444);
        extract_archive(&archive, &dest).expect("second extraction succeeds");

        assert_eq!(fs::read(&target).unwrap(), b"second");
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_leading_outside_is_refused() {
        let tmp = TempDir::new().expect("temp dir");
        let archive = tmp.path().join("install.zip");
        let dest = tmp.path().join("server");
        let outside = tmp.path().join("outside");
        fs::create_dir_all(&dest).unwrap();
        fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, dest.join("plugins")).unwrap();

        for name in ["plugins/evil.txt", "plugins/sub/evil.txt", "plugins/sub/"] {
            let entries = if name.ends_with('/') {
                vec![Entry::Dir(name)]
            } else {
                vec![Entry::File(name, b"pwned")]
            };
            write_zip(&archive, &entries);

            let err = extract_archive(&archive, &dest).unwrap_err();

            assert!(
                matches!(err, ExtractionError::UnsafeEntry { .. }),
                "{name} should be refused"
            );
        }
        assert_eq!(fs::read_dir(&outside).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_inside_destination_is_followed() {
        let tmp = TempDir::new().expect("temp dir");
        let archive = tmp.path().join("install.zip");
        let dest = tmp.path().join("server");
        fs::create_dir_all(dest.join("releases/v2")).unwrap();
        std::os::unix::fs::symlink(dest.join("releases/v2"), dest.join("current")).unwrap();
        write_zip(&archive, &[Entry::File("current/a.txt", b"ok")]);

        extract_archive(&archive, &dest).expect("extraction succeeds");

        assert_eq!(fs::read(dest.join("releases/v2/a.txt")).unwrap(), b"ok");
    }

    #[cfg(unix)]
    #[test]
    fn existing_file_symlink_is_replaced_not_followed() {
        let tmp = TempDir::new().expect("temp dir");
        let archive = tmp.path().join("install.zip");
        let dest = tmp.path().join("server");
        let outside = tmp.path().join("outside.txt");
        fs::create_dir_all(&dest).unwrap();
        fs::write(&outside, b"untouched").unwrap();
        std::os::unix::fs::symlink(&outside, dest.join("link.txt")).unwrap();
        write_zip(&archive, &[Entry::File("link.txt", b"new")]);

        extract_archive(&archive, &dest).expect("extraction succeeds");

        assert_eq!(fs::read(&outside).unwrap(), b"untouched");
        let meta = fs::symlink_metadata(dest.join("link.txt")).unwrap();
        assert!(meta.file_type().is_file());
        assert_eq!(fs::read(dest.join("link.txt")).unwrap(), b"new");
    }

    #[test]
    fn entry_shadowing_the_archive_is_refused() {
        let tmp = TempDir::new().expect("temp dir");
        let archive = tmp.path().join("install.zip");

        for name in ["install.zip", "./install.zip"] {
            write_zip(
                &archive,
                &[Entry::File("first.txt", b"1"), Entry::File(name, b"truncated")],
            );
            let before = fs::read(&archive).unwrap();

            let err = extract_archive(&archive, tmp.path()).unwrap_err();

            assert!(matches!(err, ExtractionError::OverwritesArchive { .. }));
            assert_eq!(fs::read(&archive).unwrap(), before);
            assert!(!tmp.path().join("first.txt").exists());
        }
    }
}
