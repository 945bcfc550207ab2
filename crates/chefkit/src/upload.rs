//! Cookbook version manifests for upload.
//!
//! A cookbook is uploaded as a set of checksummed files plus a manifest
//! that lists every file under its segment (`recipes`, `templates`, ...).

use crate::error::Result;
use crate::types::Cookbook;
use base64::Engine;
use md5::{Digest, Md5};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories the server understands as cookbook segments.
pub const SEGMENTS: &[&str] = &[
    "recipes",
    "definitions",
    "libraries",
    "attributes",
    "files",
    "templates",
    "resources",
    "providers",
];

/// Segment for files at the top of the cookbook directory.
pub const ROOT_FILES: &str = "root_files";

/// One file of a cookbook version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    /// File name shown by the server.
    pub name: String,
    /// Path relative to the cookbook root, `/`-separated.
    pub path: String,
    /// Hex MD5 of the content.
    pub checksum: String,
    /// Absolute path on disk.
    pub source: PathBuf,
}

/// Everything the server needs to store one cookbook version.
#[derive(Debug, Clone)]
pub struct CookbookManifest {
    /// Cookbook name.
    pub name: String,
    /// Cookbook version.
    pub version: String,
    /// Files grouped by segment.
    pub segments: BTreeMap<String, Vec<ManifestFile>>,
}

impl CookbookManifest {
    /// Walk a cookbook directory and checksum every file.
    ///
    /// Hidden files and directories are skipped, as are files in
    /// directories that are not segments.
    pub fn build(cookbook: &Cookbook) -> Result<Self> {
        let mut segments: BTreeMap<String, Vec<ManifestFile>> = BTreeMap::new();

        let walker = WalkDir::new(&cookbook.path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()));

        for entry in walker {
            let entry = entry.map_err(|e| crate::Error::Other(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = match entry.path().strip_prefix(&cookbook.path) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();

            let segment = match parts.as_slice() {
                [_single] => ROOT_FILES,
                [first, ..] if SEGMENTS.contains(&first.as_str()) => first.as_str(),
                _ => continue,
            };

            let content = fs::read(entry.path())?;
            segments
                .entry(segment.to_string())
                .or_default()
                .push(ManifestFile {
                    name: parts.last().cloned().unwrap_or_default(),
                    path: parts.join("/"),
                    checksum: md5_hex(&content),
                    source: entry.path().to_path_buf(),
                });
        }

        Ok(Self {
            name: cookbook.name.clone(),
            version: cookbook.version.clone(),
            segments,
        })
    }

    /// Every file, across segments.
    pub fn files(&self) -> impl Iterator<Item = &ManifestFile> {
        self.segments.values().flatten()
    }

    /// The manifest document sent to `cookbooks/<name>/<version>`.
    pub fn to_json(&self) -> Value {
        let mut doc = json!({
            "name": format!("{}-{}", self.name, self.version),
            "cookbook_name": self.name,
            "version": self.version,
            "json_class": "Chef::CookbookVersion",
            "chef_type": "cookbook_version",
            "frozen?": false,
            "metadata": {
                "name": self.name,
                "version": self.version,
            },
        });

        for segment in SEGMENTS.iter().copied().chain([ROOT_FILES]) {
            let files: Vec<Value> = self
                .segments
                .get(segment)
                .map(|files| {
                    files
                        .iter()
                        .map(|f| {
                            json!({
                                "name": f.name,
                                "path": f.path,
                                "checksum": f.checksum,
                                "specificity": "default",
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();
            doc[segment] = Value::Array(files);
        }

        doc
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Hex MD5 of `content`, the checksum format the server indexes files by.
pub fn md5_hex(content: &[u8]) -> String {
    hex::encode(Md5::digest(content))
}

/// Base64 MD5 of `content`, for the `Content-MD5` header.
pub fn md5_base64(content: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(Md5::digest(content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cookbook_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("recipes")).unwrap();
        fs::create_dir_all(root.join("templates/default")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("spec")).unwrap();
        fs::write(root.join("metadata.rb"), "version '1.2.0'\n").unwrap();
        fs::write(root.join("recipes/default.rb"), "package 'nginx'\n").unwrap();
        fs::write(root.join("templates/default/nginx.conf.erb"), "worker_processes 1;\n").unwrap();
        fs::write(root.join(".git/HEAD"), "ref: refs/heads/master\n").unwrap();
        fs::write(root.join("spec/default_spec.rb"), "describe 'x'\n").unwrap();
        dir
    }

    #[test]
    fn test_md5_formats() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_base64(b""), "1B2M2Y8AsgTpgAmY7PhCfg==");
    }

    #[test]
    fn test_build_groups_by_segment() {
        let dir = cookbook_dir();
        let cookbook = Cookbook::new("nginx", "1.2.0", dir.path());
        let manifest = CookbookManifest::build(&cookbook).unwrap();

        assert_eq!(manifest.segments["recipes"][0].path, "recipes/default.rb");
        assert_eq!(
            manifest.segments["templates"][0].path,
            "templates/default/nginx.conf.erb"
        );
        assert_eq!(manifest.segments[ROOT_FILES][0].name, "metadata.rb");
        // hidden and non-segment directories are left out
        assert_eq!(manifest.files().count(), 3);
    }

    #[test]
    fn test_manifest_document() {
        let dir = cookbook_dir();
        let cookbook = Cookbook::new("nginx", "1.2.0", dir.path());
        let doc = CookbookManifest::build(&cookbook).unwrap().to_json();

        assert_eq!(doc["name"], "nginx-1.2.0");
        assert_eq!(doc["metadata"]["version"], "1.2.0");
        assert_eq!(doc["recipes"].as_array().unwrap().len(), 1);
        assert_eq!(doc["libraries"], serde_json::json!([]));
        assert_eq!(
            doc["recipes"][0]["checksum"],
            md5_hex(b"package 'nginx'\n")
        );
    }
}
