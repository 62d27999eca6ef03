//! In-memory output tree and its atomic write to disk.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::IacResult;
use crate::layout::Component;

/// First line of every generated `.tf` file.
pub const GENERATED_HEADER: &str = "# Generated Terraform file for AWS IAM Identity Center";

/// Generated files keyed by path relative to the output directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTree {
    files: BTreeMap<PathBuf, String>,
}

/// Header plus trailing-newline normalization for a file body.
fn normalize(path: &Path, content: &str) -> String {
    let body = content.trim_end();
    if path.extension().and_then(|e| e.to_str()) == Some("tf") {
        format!("{}\n\n{}\n", GENERATED_HEADER, body.trim_start_matches('\n'))
    } else {
        format!("{}\n", body)
    }
}

impl OutputTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, normalizing its content. Replaces an existing entry.
    pub fn insert(&mut self, path: impl Into<PathBuf>, content: &str) {
        let path = path.into();
        let content = normalize(&path, content);
        self.files.insert(path, content);
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.files.contains_key(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &String)> {
        self.files.iter()
    }

    /// Files below a top-level directory.
    pub fn files_in<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = (&'a PathBuf, &'a String)> {
        self.files.iter().filter(move |(p, _)| p.starts_with(dir))
    }

    /// Read every file below `root`, paths relative to it. Content is taken
    /// verbatim.
    pub fn from_dir(root: &Path) -> IacResult<Self> {
        let mut files = BTreeMap::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            files.insert(relative, fs::read_to_string(entry.path())?);
        }
        Ok(Self { files })
    }

    /// Write the tree into `target`.
    ///
    /// Everything is first rendered into a temporary directory inside
    /// `target`. Previously generated component directories and root `.tf`
    /// files are then moved aside into that directory and the new entries
    /// moved in. If any move fails, the new entries are removed and the
    /// previous output is restored. Other content of `target` (such as the
    /// persisted snapshot) is left alone.
    pub fn write_atomic(&self, target: &Path) -> IacResult<()> {
        fs::create_dir_all(target)?;

        let staging = tempfile::Builder::new()
            .prefix(".idcgen-")
            .tempdir_in(target)?;
        let fresh = staging.path().join("new");
        let backup = staging.path().join("old");
        fs::create_dir_all(&backup)?;

        for (relative, content) in &self.files {
            let path = fresh.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, content)?;
        }
        debug!("Staged {} files in {:?}", self.files.len(), fresh);

        let mut swap = Swap::default();
        if let Err(e) = swap.run(target, &fresh, &backup) {
            warn!("Write to {:?} failed, restoring previous output: {}", target, e);
            swap.rollback(target, &backup);
            return Err(e);
        }

        info!("Wrote {} files to {:?}", self.files.len(), target);
        Ok(())
    }
}

/// Entries moved during one swap, for rollback.
#[derive(Debug, Default)]
struct Swap {
    moved_aside: Vec<OsString>,
    installed: Vec<OsString>,
}

impl Swap {
    fn run(&mut self, target: &Path, fresh: &Path, backup: &Path) -> IacResult<()> {
        for name in previous_output(target)? {
            debug!("Moving aside {:?}", name);
            fs::rename(target.join(&name), backup.join(&name))?;
            self.moved_aside.push(name);
        }

        for name in sorted_entries(fresh)? {
            fs::rename(fresh.join(&name), target.join(&name))?;
            self.installed.push(name);
        }
        Ok(())
    }

    fn rollback(&self, target: &Path, backup: &Path) {
        for name in &self.installed {
            let path = target.join(name);
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(e) = removed {
                warn!("Failed to remove {:?}: {}", path, e);
            }
        }
        for name in &self.moved_aside {
            if let Err(e) = fs::rename(backup.join(name), target.join(name)) {
                warn!("Failed to restore {:?}: {}", target.join(name), e);
            }
        }
    }
}

fn sorted_entries(dir: &Path) -> IacResult<Vec<OsString>> {
    let mut names = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<Result<Vec<_>, _>>()?;
    names.sort();
    Ok(names)
}

/// Component directories and generated root files of an earlier run.
fn previous_output(target: &Path) -> IacResult<Vec<OsString>> {
    let mut names = Vec::new();
    for name in sorted_entries(target)? {
        let path = target.join(&name);
        let is_component = path.is_dir()
            && name
                .to_str()
                .and_then(Component::from_str)
                .is_some();
        let is_generated_tf = path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some("tf")
            && fs::read_to_string(&path)
                .map(|content| content.starts_with(GENERATED_HEADER))
                .unwrap_or(false);
        if is_component || is_generated_tf {
            names.push(name);
        }
    }
    Ok(names)
}
