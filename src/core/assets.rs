// Copyright (c) 2021 Tangram Robotics Inc. - All Rights Reserved
// Unauthorized copying of this file, via any medium is strictly prohibited
// Proprietary and confidential
// ----------------------------

//! Mirror a static asset tree into a deploy directory.
//!
//! Exclusions match an entry's file name exactly, at any depth: excluding
//! `index.html` also skips `help/index.html`. An excluded directory is
//! skipped along with everything under it.

use std::collections::HashSet;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Counts from a completed copy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CopySummary {
    /// Directories created (or already present) below the destination root.
    pub directories: usize,
    pub files: usize,
    pub bytes: u64,
    /// Source entries left out: excluded names and symlinks.
    pub skipped: Vec<PathBuf>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CopyOutcome {
    /// Nothing was done; the destination is untouched.
    SourceMissing(PathBuf),
    Copied(CopySummary),
}

/// A destination file that doesn't match its source.
#[derive(Clone, Debug, PartialEq)]
pub enum MirrorMismatch {
    Missing(PathBuf),
    ContentDiffers(PathBuf),
}

pub struct AssetCopier {
    source: PathBuf,
    destination: PathBuf,
    exclusions: HashSet<OsString>,
    progress: ProgressBar,
}

impl AssetCopier {
    pub fn new<I, S>(source: &Path, destination: &Path, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            exclusions: exclusions.into_iter().map(Into::into).collect(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Tick `progress` once per copied file.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Copy every non-excluded entry of the source tree into the destination,
    /// overwriting files that already exist there.
    ///
    /// # Errors
    ///
    /// Any filesystem error aborts the copy. A partially-copied tree is left
    /// as-is and must not be deployed.
    pub fn run(&self) -> Result<CopyOutcome> {
        let metadata = match self.source_metadata()? {
            Some(metadata) => metadata,
            None => {
                warn!(
                    "Asset source {} does not exist, nothing to copy",
                    self.source.display()
                );
                return Ok(CopyOutcome::SourceMissing(self.source.clone()));
            }
        };
        if !metadata.is_dir() {
            bail!("Asset source {} is not a directory", self.source.display());
        }
        self.check_destination_outside_source()?;

        fs::create_dir_all(&self.destination).with_context(|| {
            format!(
                "Failed to create destination directory {}",
                self.destination.display()
            )
        })?;

        let mut summary = CopySummary::default();
        let skipped = self.walk(|entry, relative| {
            let target = self.destination.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)
                    .with_context(|| format!("Failed to create directory {}", target.display()))?;
                summary.directories += 1;
            } else {
                let bytes = fs::copy(entry.path(), &target).with_context(|| {
                    format!(
                        "Failed to copy {} to {}",
                        entry.path().display(),
                        target.display()
                    )
                })?;
                debug!("Copied {} ({} bytes)", relative.display(), bytes);
                summary.files += 1;
                summary.bytes += bytes;
                self.progress.inc(1);
            }
            Ok(())
        })?;
        summary.skipped = skipped;

        info!(
            "Copied {} files in {} directories from {} to {}, skipped {}",
            summary.files,
            summary.directories,
            self.source.display(),
            self.destination.display(),
            summary.skipped.len()
        );
        Ok(CopyOutcome::Copied(summary))
    }

    /// Compare every file the copy would produce against the destination,
    /// by MD5 digest. An empty result means the destination mirrors the
    /// source.
    pub fn verify(&self) -> Result<Vec<MirrorMismatch>> {
        if self.source_metadata()?.is_none() {
            return Ok(Vec::new());
        }

        let mut mismatches = Vec::new();
        self.walk(|entry, relative| {
            if entry.file_type().is_dir() {
                return Ok(());
            }
            let target = self.destination.join(relative);
            if !target.is_file() {
                mismatches.push(MirrorMismatch::Missing(relative.to_path_buf()));
                return Ok(());
            }
            let expected = md5::compute(
                fs::read(entry.path())
                    .with_context(|| format!("Failed to read {}", entry.path().display()))?,
            );
            let actual = md5::compute(
                fs::read(&target).with_context(|| format!("Failed to read {}", target.display()))?,
            );
            if expected != actual {
                debug!(
                    "{} differs: {:x} != {:x}",
                    relative.display(),
                    expected,
                    actual
                );
                mismatches.push(MirrorMismatch::ContentDiffers(relative.to_path_buf()));
            }
            Ok(())
        })?;
        Ok(mismatches)
    }

    /// Depth-first walk of the source, calling `visit` with each directory
    /// and regular file to mirror and its path relative to the source root.
    /// Returns the source paths that were left out.
    fn walk<F>(&self, mut visit: F) -> Result<Vec<PathBuf>>
    where
        F: FnMut(&DirEntry, &Path) -> Result<()>,
    {
        let mut skipped = Vec::new();
        let mut entries = WalkDir::new(&self.source)
            .min_depth(1)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter();

        while let Some(entry) = entries.next() {
            let entry = entry.with_context(|| {
                format!("Failed to read asset tree under {}", self.source.display())
            })?;

            if self.exclusions.contains(entry.file_name()) {
                debug!("Excluding {}", entry.path().display());
                if entry.file_type().is_dir() {
                    entries.skip_current_dir();
                }
                skipped.push(entry.path().to_path_buf());
                continue;
            }
            if !entry.file_type().is_dir() && !entry.file_type().is_file() {
                warn!(
                    "Skipping {}, not a regular file or directory",
                    entry.path().display()
                );
                skipped.push(entry.path().to_path_buf());
                continue;
            }

            let relative = entry.path().strip_prefix(&self.source)?;
            visit(&entry, relative)?;
        }
        Ok(skipped)
    }

    /// Metadata of the source, or `None` if it doesn't exist. Any other
    /// failure to stat it (e.g. permissions) is an error.
    fn source_metadata(&self) -> Result<Option<fs::Metadata>> {
        match fs::metadata(&self.source) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to read asset source {}", self.source.display())
            }),
        }
    }

    fn check_destination_outside_source(&self) -> Result<()> {
        let source = resolve(&self.source)?;
        let destination = resolve(&self.destination)?;
        if destination.starts_with(&source) {
            bail!(
                "Destination {} is inside asset source {}",
                self.destination.display(),
                self.source.display()
            );
        }
        Ok(())
    }
}

/// Absolute, symlink-free form of a path whose tail may not exist yet.
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    for name in missing.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}
