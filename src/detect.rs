//! Installation detection
//!
//! Users hand this tool whatever they have: the executable itself, the
//! disc root, `PS3_GAME`, or `USRDIR`. [`resolve_root`] turns any of
//! those into the canonical root directory plus a platform;
//! [`identify_game`] then decides which game the root holds.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::LoaderConfig;
use crate::error::{Error, Result};
use crate::formats::sfo::Sfo;
use crate::platform::{GameType, PlatformType};
use crate::report::Reporter;

/// Resolve a raw argument into a root directory and platform
///
/// With `UseManualPath` the argument is taken verbatim and no
/// filesystem inspection happens. Otherwise candidate directories are
/// probed in a fixed order and the platform is inferred from the
/// first recognized executable, unless `UseDefaultPlatform` pins it.
pub fn resolve_root(raw: &Path, config: &LoaderConfig) -> Result<(PathBuf, PlatformType)> {
    if config.use_manual_path {
        return Ok((raw.to_path_buf(), config.default_platform));
    }

    let platforms: &[PlatformType] = if config.use_default_platform {
        std::slice::from_ref(&config.default_platform)
    } else {
        &PlatformType::INFERENCE_ORDER
    };

    // The argument may be the executable itself
    if raw.is_file() {
        if let Some(name) = raw.file_name().map(|n| n.to_string_lossy()) {
            for &platform in platforms {
                if platform.matches_executable(&name) {
                    let root = raw.parent().ok_or_else(|| {
                        Error::user(format!(
                            "Could not find a parent folder for executable: {}",
                            raw.display()
                        ))
                    })?;
                    return Ok((root.to_path_buf(), platform));
                }
            }
        }
    }

    // Otherwise walk the known layouts down to a directory holding one
    let candidates = [
        raw.join("PS3_GAME").join("USRDIR"),
        raw.join("USRDIR"),
        raw.to_path_buf(),
    ];
    for candidate in &candidates {
        if !candidate.is_dir() {
            continue;
        }
        for &platform in platforms {
            if directory_has_executable(candidate, platform)? {
                return Ok((candidate.clone(), platform));
            }
        }
    }

    Err(Error::user(format!(
        "Could not find a recognized game executable for path: {}\n\
         Pass the executable itself (EBOOT.BIN or default.xex) or a folder containing it.",
        raw.display()
    )))
}

fn directory_has_executable(dir: &Path, platform: PlatformType) -> Result<bool> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.path().is_file() {
            continue;
        }
        if platform.matches_executable(&entry.file_name().to_string_lossy()) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Identify which game the resolved root holds
///
/// PS3 roots are identified through `PARAM.SFO` when the layout
/// allows it; everything else falls back to the presence of the
/// per-game main-archive data file under `bind/`. SFO-based
/// identification wins over the file-presence fallback.
pub fn identify_game(
    platform: PlatformType,
    root: &Path,
    config: &LoaderConfig,
    reporter: &mut Reporter,
) -> Result<GameType> {
    if config.use_default_game {
        return Ok(config.default_game);
    }

    if platform == PlatformType::PS3 {
        if let Some(game) = identify_from_sfo(root, reporter)? {
            return Ok(game);
        }
    }

    for game in GameType::ALL {
        if root.join("bind").join(game.marker_file()).is_file() {
            return Ok(game);
        }
    }

    Err(Error::user(format!(
        "Could not identify the game at: {}\n\
         Expected a PARAM.SFO naming a supported game or a packed main archive under bind/.",
        root.display()
    )))
}

/// SFO strategy: only applies when the root sits inside the standard
/// `PS3_GAME/USRDIR` layout, where `PARAM.SFO` lives one level up
fn identify_from_sfo(root: &Path, reporter: &mut Reporter) -> Result<Option<GameType>> {
    let ends_in_usrdir = root
        .file_name()
        .map(|n| n.to_string_lossy().eq_ignore_ascii_case("USRDIR"))
        .unwrap_or(false);
    if !ends_in_usrdir {
        return Ok(None);
    }

    let Some(parent) = root.parent() else {
        return Ok(None);
    };
    let sfo_path = parent.join("PARAM.SFO");
    if !sfo_path.is_file() {
        return Ok(None);
    }

    let sfo = match Sfo::read(&sfo_path) {
        Ok(sfo) => sfo,
        Err(e) => {
            reporter.warn(&format!(
                "Could not parse {}: {e}, falling back to file-presence identification",
                sfo_path.display()
            ));
            return Ok(None);
        }
    };

    if let Some(title) = sfo.get("TITLE") {
        for game in GameType::ALL {
            if title == game.sfo_title() {
                return Ok(Some(game));
            }
        }
    }

    if let Some(title_id) = sfo.get("TITLE_ID") {
        for game in GameType::ALL {
            if game.title_ids().contains(&title_id) {
                return Ok(Some(game));
            }
        }
    }

    Ok(None)
}
