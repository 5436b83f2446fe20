//! Zip archives shipped by some upstreams (repository snapshots, release assets).

use crate::error::Result;
use std::io::{Cursor, Read};
use tracing::debug;

/// A file pulled out of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive, `/`-separated
    pub name: String,
    pub content: Vec<u8>,
}

impl ArchiveEntry {
    /// Last path segment without its extension (`xdb-main/titles/4d530004.json` -> `4d530004`).
    pub fn stem(&self) -> &str {
        let file = self.name.rsplit('/').next().unwrap_or(&self.name);
        file.rsplit_once('.').map_or(file, |(stem, _)| stem)
    }

    pub fn text(&self) -> String {
        let text = String::from_utf8_lossy(&self.content);
        text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
    }
}

/// Regular files whose name satisfies `wanted`, in archive order.
pub fn read_entries(bytes: &[u8], wanted: impl Fn(&str) -> bool) -> Result<Vec<ArchiveEntry>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if !file.is_file() || !wanted(file.name()) {
            continue;
        }
        let name = file.name().to_string();
        let mut content = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut content)?;
        entries.push(ArchiveEntry { name, content });
    }
    debug!(total = archive.len(), kept = entries.len(), "archive read");
    Ok(entries)
}

/// `.json` files (case-insensitive) sitting under a directory named `dir` anywhere in the path.
pub fn json_under(dir: &'static str) -> impl Fn(&str) -> bool {
    move |name: &str| {
        let mut parts: Vec<&str> = name.split('/').collect();
        let Some(file) = parts.pop() else {
            return false;
        };
        file.to_ascii_lowercase().ends_with(".json") && parts.contains(&dir)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Builds an in-memory zip from `(name, body)` pairs.
    pub(crate) fn zip_of(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in files {
            writer
                .start_file(*name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_filters_by_name_and_keeps_order() {
        let bytes = zip_of(&[
            ("xdb-main/README.md", "# xdb"),
            ("xdb-main/titles/4d530004.json", "{\"title\": \"Halo\"}"),
            ("xdb-main/titles/4541000d.JSON", "{}"),
            ("xdb-main/tools/schema.json", "{}"),
        ]);
        let entries = read_entries(&bytes, json_under("titles")).unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["xdb-main/titles/4d530004.json", "xdb-main/titles/4541000d.JSON"]);
        assert_eq!(entries[0].stem(), "4d530004");
        assert_eq!(entries[0].text(), "{\"title\": \"Halo\"}");
    }

    #[test]
    fn test_garbage_is_an_archive_error() {
        let err = read_entries(b"not a zip", |_| true).unwrap_err();
        assert!(matches!(err, crate::error::IngestError::Archive(_)));
    }
}
