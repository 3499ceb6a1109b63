//! Binder filesystem operations
//!
//! The container-model half of the pipeline: spilling a binder's
//! entries to disk, sweeping a directory for binders by name glob,
//! and gathering loose files back into engine-ready binders.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};

use crate::error::{Error, Result};
use crate::formats::bnd3::Binder;
use crate::paths::normalize_entry_name;
use crate::report::Reporter;

/// Model and mesh extensions packed into a map's `_m.dcx.bnd`
pub const MAP_MODEL_EXTENSIONS: [&str; 4] = [".flv", ".hmd", ".smd", ".mlb"];

/// Texture extension packed into a map's `_htdcx.bnd`
pub const MAP_TEXTURE_EXTENSION: &str = ".tpf.dcx";

/// Low-resolution texture variant left out of the texture binder
pub const MAP_TEXTURE_EXCLUDE_LOW: &str = "_l.tpf.dcx";

/// Options for unpacking binder entries to disk
#[derive(Debug, Clone, Copy)]
pub struct UnpackOptions {
    /// Lowercase entry names on extraction
    pub lowercase: bool,
    /// Leave already-present destination files untouched
    pub skip_existing: bool,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            lowercase: true,
            skip_existing: false,
        }
    }
}

/// Write every entry of `binder` under `to`
///
/// Intermediate directories are created as needed. Fails fast when
/// `to` exists as a regular file.
pub fn unpack_binder(binder: &Binder, to: &Path, options: UnpackOptions) -> Result<()> {
    if to.is_file() {
        return Err(Error::user(format!(
            "Path to unpack to must be a directory, not a file: {}",
            to.display()
        )));
    }

    fs::create_dir_all(to)?;
    for entry in &binder.entries {
        let path = to.join(normalize_entry_name(&entry.name, options.lowercase));
        if options.skip_existing && path.exists() {
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &entry.bytes)?;
    }

    Ok(())
}

/// Unpack every binder in `from` whose file name matches `pattern`
///
/// Files that match the glob but do not carry the binder magic are
/// silently skipped; a packed install keeps plenty of other data next
/// to its binders. Returns how many binders were unpacked.
pub fn mass_unpack_binders(
    from: &Path,
    to: &Path,
    pattern: &str,
    recursive: bool,
    options: UnpackOptions,
) -> Result<usize> {
    if !from.is_dir() {
        return Err(Error::user(format!(
            "Directory to unpack binders from must exist: {}",
            from.display()
        )));
    }
    if to.is_file() {
        return Err(Error::user(format!(
            "Path to unpack binders to must be a directory, not a file: {}",
            to.display()
        )));
    }

    let matcher = name_matcher(pattern)?;
    fs::create_dir_all(to)?;

    let mut unpacked = 0;
    for path in enumerate_files(from, recursive)? {
        let matches = path
            .file_name()
            .map(|n| matcher.is_match(n.to_string_lossy().to_lowercase()))
            .unwrap_or(false);
        if !matches || !Binder::is(&path) {
            continue;
        }

        let binder = Binder::read(&path)?;
        unpack_binder(&binder, to, options)?;
        unpacked += 1;
    }

    Ok(unpacked)
}

/// Gather files under `dir` into a new binder
///
/// A file is included when its name ends with one of `extensions` and
/// none of `exclude`; both checks are ASCII case-insensitive. Entry
/// names are the path relative to `dir` in console form (backslash
/// separators). Files are visited in sorted enumeration order so the
/// id assignment of a later [`Binder::finalize_for_engine`] is
/// reproducible.
pub fn pack_binder(
    dir: &Path,
    extensions: &[&str],
    exclude: &[&str],
    recursive: bool,
) -> Result<Binder> {
    let mut binder = Binder::new();
    for path in enumerate_files(dir, recursive)? {
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("\\");
        let lower = name.to_lowercase();

        if exclude.iter().any(|suffix| lower.ends_with(suffix)) {
            continue;
        }
        if !extensions.iter().any(|suffix| lower.ends_with(suffix)) {
            continue;
        }

        binder.entries.push(crate::formats::bnd3::BinderEntry {
            name,
            bytes: fs::read(&path)?,
            id: 0,
            flags: 0,
        });
    }

    Ok(binder)
}

/// What [`pack_map_resources`] did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MapPackSummary {
    /// Binders written
    pub packed: usize,
    /// Binders skipped because their output already existed
    pub skipped: usize,
}

/// Repack model and texture binders for every map under `map_root`
///
/// Each `m*` subdirectory yields `<mapID>_m.dcx.bnd` (models and
/// meshes) and `<mapID>_htdcx.bnd` (textures minus the low-resolution
/// variants), written beside the source files. With `skip_existing`,
/// each output is skipped individually when it is already present.
pub fn pack_map_resources(
    map_root: &Path,
    skip_existing: bool,
    reporter: &mut Reporter,
) -> Result<MapPackSummary> {
    let matcher = name_matcher("m*")?;
    let mut summary = MapPackSummary::default();

    let mut map_dirs = Vec::new();
    for entry in fs::read_dir(map_root)? {
        let entry = entry?;
        let path = entry.path();
        let matches = path
            .file_name()
            .map(|n| matcher.is_match(n.to_string_lossy().to_lowercase()))
            .unwrap_or(false);
        if matches && path.is_dir() {
            map_dirs.push(path);
        }
    }
    map_dirs.sort();

    for dir in map_dirs {
        let map_id = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        reporter.info(&format!("Packing map models and textures in {map_id}..."));

        let model_out = dir.join(format!("{map_id}_m.dcx.bnd"));
        pack_one(&dir, &MAP_MODEL_EXTENSIONS, &[], &model_out, skip_existing, &mut summary)?;

        let texture_out = dir.join(format!("{map_id}_htdcx.bnd"));
        pack_one(
            &dir,
            &[MAP_TEXTURE_EXTENSION],
            &[MAP_TEXTURE_EXCLUDE_LOW],
            &texture_out,
            skip_existing,
            &mut summary,
        )?;
    }

    Ok(summary)
}

fn pack_one(
    dir: &Path,
    extensions: &[&str],
    exclude: &[&str],
    out: &Path,
    skip_existing: bool,
    summary: &mut MapPackSummary,
) -> Result<()> {
    if skip_existing && out.exists() {
        summary.skipped += 1;
        return Ok(());
    }

    let mut binder = pack_binder(dir, extensions, exclude, false)?;
    binder.finalize_for_engine();
    binder.write(out)?;
    summary.packed += 1;
    Ok(())
}

fn name_matcher(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| Error::user(format!("Invalid pattern: {pattern}: {e}")))
}

/// Files under `dir`, sorted by path for reproducible enumeration
fn enumerate_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(dir, recursive, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(dir: &Path, recursive: bool, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            if recursive {
                collect_files(&path, recursive, files)?;
            }
        } else {
            files.push(path);
        }
    }
    Ok(())
}
