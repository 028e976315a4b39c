//! Zip import and export for session directories

use ignore::WalkBuilder;
use std::fs;
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::Path;
use thiserror::Error;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Invalid zip archive: {0}")]
    Invalid(#[from] zip::result::ZipError),

    #[error("Archive entry '{0}' escapes the extraction directory")]
    UnsafeEntry(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Extract every entry of `reader` under `dest`.
///
/// Fails on the first entry whose name is absolute or climbs out of `dest`.
/// Returns the number of files written.
pub fn extract_zip<R: Read + Seek>(reader: R, dest: &Path) -> Result<usize, ArchiveError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut written = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(ArchiveError::UnsafeEntry(entry.name().to_string()));
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    debug!("Extracted {} files into {}", written, dest.display());
    Ok(written)
}

/// Extract an in-memory zip
pub fn extract_bytes(bytes: &[u8], dest: &Path) -> Result<usize, ArchiveError> {
    extract_zip(Cursor::new(bytes), dest)
}

/// Deflate every regular file under `root`, named relative to `root`
pub fn build_export(root: &Path) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files: Vec<_> = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .build()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_some_and(|t| t.is_file()))
        .map(|e| e.into_path())
        .collect();
    files.sort();

    for path in files {
        let Ok(relative) = path.strip_prefix(root) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        writer.start_file(name, options)?;
        writer.write_all(&fs::read(&path)?)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// Download name for a session export
pub fn export_file_name(session_id: &str) -> String {
    let short: String = session_id.chars().take(8).collect();
    format!("pink-coded-export-{}.zip", short)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Build a zip from `(name, contents)` pairs, names taken verbatim
    pub fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::zip_of;
    use super::*;

    #[test]
    fn test_extract_nested_files() {
        let dest = tempfile::tempdir().unwrap();
        let bytes = zip_of(&[("app.py", "print(1)\n"), ("pkg/mod.py", "x = 1\n")]);

        let count = extract_bytes(&bytes, dest.path()).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            fs::read_to_string(dest.path().join("pkg/mod.py")).unwrap(),
            "x = 1\n"
        );
    }

    #[test]
    fn test_rejects_parent_traversal() {
        let dest = tempfile::tempdir().unwrap();
        let bytes = zip_of(&[("../evil.py", "boom")]);
        let err = extract_bytes(&bytes, dest.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::UnsafeEntry(name) if name == "../evil.py"));
        assert!(!dest.path().parent().unwrap().join("evil.py").exists());
    }

    #[test]
    fn test_rejects_absolute_entry() {
        let dest = tempfile::tempdir().unwrap();
        let bytes = zip_of(&[("/tmp/evil.py", "boom")]);
        assert!(matches!(
            extract_bytes(&bytes, dest.path()),
            Err(ArchiveError::UnsafeEntry(_))
        ));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let dest = tempfile::tempdir().unwrap();
        assert!(matches!(
            extract_bytes(b"definitely not a zip", dest.path()),
            Err(ArchiveError::Invalid(_))
        ));
    }

    #[test]
    fn test_export_contains_every_file() {
        let src = tempfile::tempdir().unwrap();
        fs::create_dir(src.path().join("pkg")).unwrap();
        fs::write(src.path().join("app.py"), "a").unwrap();
        fs::write(src.path().join("pkg/mod.py"), "b").unwrap();
        fs::write(src.path().join(".hidden"), "c").unwrap();

        let bytes = build_export(src.path()).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<_> = archive.file_names().map(|n| n.to_string()).collect();
        names.sort();
        assert_eq!(names, vec![".hidden", "app.py", "pkg/mod.py"]);

        let mut content = String::new();
        archive
            .by_name("pkg/mod.py")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "b");
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name("0123456789abcdef"),
            "pink-coded-export-01234567.zip"
        );
        assert_eq!(export_file_name("abc"), "pink-coded-export-abc.zip");
    }
}
