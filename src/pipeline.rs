//! Loose-load pipeline
//!
//! One resolved argument runs through a fixed sequence of stages.
//! Stages are individually skippable and independent of each other's
//! success, except where a later stage structurally needs an earlier
//! one's output on disk. Nothing is rolled back on failure; re-running
//! with `SkipExistingFiles` is the recovery path.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use indicatif::{ProgressBar, ProgressStyle};

use crate::config::LoaderConfig;
use crate::crypto::maybe_decrypt_script;
use crate::dict::DictionaryCache;
use crate::error::{Error, Result};
use crate::formats::bhd5::{self, ExtractOptions};
use crate::formats::bxf3;
use crate::ops::{self, UnpackOptions};
use crate::platform::{GameType, PlatformType};
use crate::report::Reporter;

/// Marker character prefixed onto hidden main-archive headers
pub const HIDDEN_PREFIX: char = '-';

/// Safe length for `sound/se_weapon.fsb`; shorter dumps crash the
/// audio engine on PS3 and are grown to this size with zero padding
pub const SE_WEAPON_SAFE_LEN: u64 = 6_291_456;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Bulk-extract the main archive through the filename dictionary
    MainArchive,
    /// Unpack `boot*.bnd` from `bind/`
    BootBinders,
    /// Unpack the script binder pair into the scene and AI trees
    Scripts,
    /// Unpack mission binders from `bind/mission`
    Maps,
    /// Rename main-archive headers so the game loads loose files
    HideHeaders,
    /// Repack per-map model and texture binders (Armored Core V)
    MapResources,
    /// Grow `sound/se_weapon.fsb` to a safe length (PS3)
    PlatformPatch,
}

impl Stage {
    /// All stages in the order they run
    pub const ORDER: [Stage; 7] = [
        Stage::MainArchive,
        Stage::BootBinders,
        Stage::Scripts,
        Stage::Maps,
        Stage::HideHeaders,
        Stage::MapResources,
        Stage::PlatformPatch,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::MainArchive => "unpack main archive",
            Stage::BootBinders => "unpack boot binders",
            Stage::Scripts => "unpack scripts",
            Stage::Maps => "unpack maps",
            Stage::HideHeaders => "hide main archive headers",
            Stage::MapResources => "repack map resources",
            Stage::PlatformPatch => "apply platform patch",
        };
        f.write_str(name)
    }
}

/// Outcome of one stage; stages never vanish from the summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageResult {
    Completed,
    Skipped(String),
    Warned(String),
}

/// Ordered per-argument stage outcomes
pub type StageReport = Vec<(Stage, StageResult)>;

/// Pipeline for one run, shared across arguments
///
/// The dictionary cache lives here so repeated arguments for the same
/// game load the dictionary once. The cancellation flag is threaded
/// into the main-archive extraction; nothing currently raises it
/// mid-run.
pub struct Pipeline<'a> {
    config: &'a LoaderConfig,
    res_dir: PathBuf,
    dictionaries: DictionaryCache,
    cancel: AtomicBool,
}

impl<'a> Pipeline<'a> {
    /// Pipeline resolving dictionaries and fallback scripts under `res_dir`
    pub fn new(config: &'a LoaderConfig, res_dir: PathBuf) -> Self {
        Self {
            config,
            dictionaries: DictionaryCache::new(res_dir.clone()),
            res_dir,
            cancel: AtomicBool::new(false),
        }
    }

    /// Run every stage for one resolved argument
    ///
    /// A user error aborts the remaining stages of this argument;
    /// completed stages stay on disk.
    pub fn run(
        &mut self,
        root: &Path,
        platform: PlatformType,
        game: GameType,
        reporter: &mut Reporter,
    ) -> Result<StageReport> {
        if !root.is_dir() {
            return Err(Error::user(format!(
                "Root folder does not exist: {}",
                root.display()
            )));
        }

        let bind_dir = root.join("bind");
        if !bind_dir.is_dir() {
            return Err(Error::user(format!(
                "Could not find the bind folder under: {}\n\
                 Unpack the game with DVDUnbinder or another tool first, then move the \
                 unpacked files into the game folder.",
                root.display()
            )));
        }

        let mut report = StageReport::new();
        for stage in Stage::ORDER {
            reporter.info(&format!("[{stage}]"));
            let result = match stage {
                Stage::MainArchive => self.unpack_main_archive(root, &bind_dir, game, reporter)?,
                Stage::BootBinders => self.unpack_boot_binders(root, &bind_dir, reporter)?,
                Stage::Scripts => self.unpack_scripts(root, &bind_dir, platform, reporter)?,
                Stage::Maps => self.unpack_maps(root, &bind_dir, reporter)?,
                Stage::HideHeaders => self.hide_headers(&bind_dir, game, reporter)?,
                Stage::MapResources => self.pack_map_resources(root, game, reporter)?,
                Stage::PlatformPatch => self.platform_patch(root, platform, reporter)?,
            };

            if let StageResult::Skipped(reason) = &result {
                reporter.info(&format!("Skipped: {reason}"));
            }
            report.push((stage, result));
        }

        Ok(report)
    }

    fn unpack_main_archive(
        &mut self,
        root: &Path,
        bind_dir: &Path,
        game: GameType,
        reporter: &mut Reporter,
    ) -> Result<StageResult> {
        if self.config.skip_main_archive_unpack {
            return Ok(StageResult::Skipped("disabled in config".to_string()));
        }

        let Some(dict) = self.dictionaries.get(game)? else {
            let reason = format!(
                "no filename dictionary for {game} in program resources, \
                 assuming game files are unpacked already"
            );
            reporter.warn(&reason);
            return Ok(StageResult::Skipped(reason));
        };

        let options = ExtractOptions {
            skip_existing: self.config.skip_existing_files,
            skip_unknown: self.config.skip_unknown_files,
        };

        let mut warned = None;
        let mut hidden_skipped = false;
        let mut extracted_pairs = 0;
        for &(bhd_name, bdt_name) in game.archive_pairs() {
            let mut bhd_path = bind_dir.join(bhd_name);
            if !bhd_path.is_file() {
                let hidden = bind_dir.join(format!("{HIDDEN_PREFIX}{bhd_name}"));
                if hidden.is_file() {
                    if self.config.skip_hidden_main_archive_unpack {
                        hidden_skipped = true;
                        continue;
                    }
                    let msg = format!("{bhd_name} was already hidden by this tool, unpacking from {}", hidden.display());
                    reporter.warn(&msg);
                    warned = Some(msg);
                    bhd_path = hidden;
                } else {
                    reporter.warn(&format!(
                        "could not find {bhd_name}, assuming game files are unpacked already"
                    ));
                    continue;
                }
            }

            let bdt_path = bind_dir.join(bdt_name);
            if !bdt_path.is_file() {
                reporter.warn(&format!(
                    "could not find {bdt_name}, assuming game files are unpacked already"
                ));
                continue;
            }

            reporter.info(&format!("Unpacking game files from {bdt_name}..."));
            let bar = ProgressBar::new(1000);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% ({eta})",
            ) {
                bar.set_style(style);
            }

            let summary = bhd5::extract_all(
                &bhd_path,
                &bdt_path,
                &dict,
                root,
                options,
                &mut |fraction| bar.set_position((fraction * 1000.0) as u64),
                &self.cancel,
            )?;
            bar.finish_and_clear();

            reporter.info(&format!(
                "Unpacked {} files ({} already present, {} unknown kept, {} unknown dropped)",
                summary.written,
                summary.skipped_existing,
                summary.unknown_kept,
                summary.unknown_dropped
            ));
            extracted_pairs += 1;
        }

        Ok(match (extracted_pairs, warned) {
            (0, _) if hidden_skipped => StageResult::Skipped(
                "main archive header already hidden by this tool".to_string(),
            ),
            (0, _) => StageResult::Skipped(
                "no main archive found, assuming game files are unpacked already".to_string(),
            ),
            (_, Some(msg)) => StageResult::Warned(msg),
            (_, None) => StageResult::Completed,
        })
    }

    fn unpack_boot_binders(
        &self,
        root: &Path,
        bind_dir: &Path,
        reporter: &mut Reporter,
    ) -> Result<StageResult> {
        if self.config.skip_boot_binder_unpack {
            return Ok(StageResult::Skipped("disabled in config".to_string()));
        }

        let unpacked = ops::mass_unpack_binders(
            bind_dir,
            root,
            "boot*.bnd",
            false,
            self.unpack_options(),
        )?;
        reporter.info(&format!("Unpacked {unpacked} boot binders"));
        if unpacked == 0 {
            let reason = "no boot binders found under bind".to_string();
            reporter.warn(&reason);
            return Ok(StageResult::Warned(reason));
        }

        Ok(StageResult::Completed)
    }

    fn unpack_scripts(
        &self,
        root: &Path,
        bind_dir: &Path,
        platform: PlatformType,
        reporter: &mut Reporter,
    ) -> Result<StageResult> {
        if self.config.skip_script_unpack {
            return Ok(StageResult::Skipped("disabled in config".to_string()));
        }

        let header_path = self.locate_script_file(bind_dir, "script.bhd", platform, reporter)?;
        let data_path = self.locate_script_file(bind_dir, "script.bdt", platform, reporter)?;

        if !bxf3::is_header(&header_path) {
            return Err(Error::user(format!(
                "Script header file is not a BHF3: {}",
                header_path.display()
            )));
        }
        if !bxf3::is_data(&data_path) {
            return Err(Error::user(format!(
                "Script data file is not a BDF3: {}",
                data_path.display()
            )));
        }

        let scene_dir = root.join("scene");
        let ai_script_dir = root.join("airesource").join("script");
        for dir in [&scene_dir, &ai_script_dir] {
            if dir.is_file() {
                return Err(Error::user(format!(
                    "Script destination must not be a file: {}",
                    dir.display()
                )));
            }
        }

        let binder = bxf3::read(&header_path, &data_path)?;
        let mut written = 0;
        for entry in &binder.entries {
            let name = crate::paths::normalize_entry_name(&entry.name, true);
            let is_scene = name
                .to_string_lossy()
                .ends_with("scene.lc");
            let path = if is_scene {
                scene_dir.join(&name)
            } else {
                ai_script_dir.join(&name)
            };

            if self.config.skip_existing_files && path.exists() {
                continue;
            }
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &entry.bytes)?;
            written += 1;
        }

        reporter.info(&format!("Unpacked {written} scripts"));
        Ok(StageResult::Completed)
    }

    /// Find a script binder file by name: the install's own copy
    /// first, then a decrypted fallback in program resources, then a
    /// still-encrypted copy run through the decryption gate
    fn locate_script_file(
        &self,
        bind_dir: &Path,
        name: &str,
        platform: PlatformType,
        reporter: &mut Reporter,
    ) -> Result<PathBuf> {
        let plain = bind_dir.join(name);
        if plain.is_file() {
            return Ok(plain);
        }

        let res_copy = self.res_dir.join(name);
        if res_copy.is_file() {
            reporter.info(&format!("Found decrypted {name} in program resources..."));
            return Ok(res_copy);
        }

        let encrypted = bind_dir.join(format!("{name}.{}", crate::crypto::SDAT_EXTENSION));
        if encrypted.is_file() {
            let decrypted = maybe_decrypt_script(&encrypted, platform, reporter)?;
            if decrypted != encrypted {
                return Ok(decrypted);
            }
            return Err(Error::user(format!(
                "Scripts are still encrypted and {} could not be unwrapped.\n\
                 Decrypt it first or place a decrypted {name} into bind/ or the program res folder.",
                encrypted.display()
            )));
        }

        Err(Error::user(format!(
            "Could not find scripts file {name} or its encrypted counterpart {name}.sdat.\n\
             You may be missing files.",
        )))
    }

    fn unpack_maps(
        &self,
        root: &Path,
        bind_dir: &Path,
        reporter: &mut Reporter,
    ) -> Result<StageResult> {
        if self.config.skip_map_unpack {
            return Ok(StageResult::Skipped("disabled in config".to_string()));
        }

        let mission_dir = bind_dir.join("mission");
        if !mission_dir.is_dir() {
            return Err(Error::user(format!(
                "Could not find the mission binder folder: {}\n\
                 The game has not unpacked correctly. Make sure this tool has the filename \
                 dictionary in its res folder, or unpack the game manually first.",
                mission_dir.display()
            )));
        }

        let unpacked =
            ops::mass_unpack_binders(&mission_dir, root, "*.bnd", false, self.unpack_options())?;
        reporter.info(&format!("Unpacked {unpacked} mission binders"));
        Ok(StageResult::Completed)
    }

    fn hide_headers(
        &self,
        bind_dir: &Path,
        game: GameType,
        reporter: &mut Reporter,
    ) -> Result<StageResult> {
        if !self.config.hide_headers {
            return Ok(StageResult::Skipped("disabled in config".to_string()));
        }

        let mut renamed = 0;
        let mut warned = None;
        for &(bhd_name, _) in game.archive_pairs() {
            let source = bind_dir.join(bhd_name);
            if !source.is_file() {
                // Already hidden or never present; a second run is a no-op
                continue;
            }

            let target = bind_dir.join(format!("{HIDDEN_PREFIX}{bhd_name}"));
            if target.exists() {
                let msg = format!(
                    "both {bhd_name} and its hidden copy exist, leaving the header in place"
                );
                reporter.warn(&msg);
                warned = Some(msg);
                continue;
            }

            reporter.info(&format!("Renaming {bhd_name} so the game does not find it..."));
            fs::rename(&source, &target)?;
            renamed += 1;
        }

        Ok(match (renamed, warned) {
            (_, Some(msg)) => StageResult::Warned(msg),
            (0, None) => StageResult::Skipped("no headers left to hide".to_string()),
            (_, None) => StageResult::Completed,
        })
    }

    fn pack_map_resources(
        &self,
        root: &Path,
        game: GameType,
        reporter: &mut Reporter,
    ) -> Result<StageResult> {
        if game != GameType::ArmoredCoreV {
            return Ok(StageResult::Skipped(format!("not used by {game}")));
        }
        if self.config.skip_map_resource_pack {
            return Ok(StageResult::Skipped("disabled in config".to_string()));
        }

        let map_root = root.join("model").join("map");
        if !map_root.is_dir() {
            let reason = "no model/map folder, maps may not have unpacked".to_string();
            reporter.warn(&reason);
            return Ok(StageResult::Warned(reason));
        }

        let summary =
            ops::pack_map_resources(&map_root, self.config.skip_existing_files, reporter)?;
        reporter.info(&format!(
            "Packed {} map binders ({} already present)",
            summary.packed, summary.skipped
        ));
        Ok(StageResult::Completed)
    }

    fn platform_patch(
        &self,
        root: &Path,
        platform: PlatformType,
        reporter: &mut Reporter,
    ) -> Result<StageResult> {
        if platform != PlatformType::PS3 {
            return Ok(StageResult::Skipped(format!("not used on {platform}")));
        }
        if !self.config.apply_fmod_crash_fix {
            return Ok(StageResult::Skipped("disabled in config".to_string()));
        }

        let fsb_path = root.join("sound").join("se_weapon.fsb");
        if !fsb_path.is_file() {
            return Ok(StageResult::Skipped(
                "sound/se_weapon.fsb not present".to_string(),
            ));
        }

        let len = fsb_path.metadata()?.len();
        if len < SE_WEAPON_SAFE_LEN {
            reporter.info(&format!(
                "Growing se_weapon.fsb from {len} to {SE_WEAPON_SAFE_LEN} bytes..."
            ));
            let file = OpenOptions::new().write(true).open(&fsb_path)?;
            file.set_len(SE_WEAPON_SAFE_LEN)?;
        }

        Ok(StageResult::Completed)
    }

    fn unpack_options(&self) -> UnpackOptions {
        UnpackOptions {
            lowercase: true,
            skip_existing: self.config.skip_existing_files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::test_build as sdat_build;
    use crate::formats::bhd5::test_build as bhd5_build;
    use crate::formats::bnd3::{Binder, BinderEntry};
    use crate::formats::bxf3::test_build as bxf3_build;

    fn binder_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut binder = Binder::new();
        for (name, bytes) in entries {
            binder.entries.push(BinderEntry {
                name: name.to_string(),
                bytes: bytes.to_vec(),
                id: 0,
                flags: 0,
            });
        }
        binder.finalize_for_engine();
        binder.to_bytes().unwrap()
    }

    /// A minimal packed PS3 ACV install plus a resource directory
    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        res_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("PS3_GAME").join("USRDIR");
        let bind = root.join("bind");
        fs::create_dir_all(&bind).unwrap();

        // Main archive holding one game file
        let (bhd, bdt) = bhd5_build::build(&[("/param/system.def", b"params")]);
        fs::write(bind.join("dvdbnd5.bhd"), bhd).unwrap();
        fs::write(bind.join("dvdbnd.bdt"), bdt).unwrap();

        // Boot binder
        fs::write(
            bind.join("boot.bnd"),
            binder_bytes(&[("System\\Boot.ini", b"boot data")]),
        )
        .unwrap();

        // Script pair: one AI script, one scene script
        let (header, data) = bxf3_build::build(&[
            ("ai\\enemy.lc", b"ai bytes"),
            ("m01\\m01scene.lc", b"scene bytes"),
        ]);
        fs::write(bind.join("script.bhd"), header).unwrap();
        fs::write(bind.join("script.bdt"), data).unwrap();

        // Mission binder carrying a map model source
        let mission = bind.join("mission");
        fs::create_dir_all(&mission).unwrap();
        fs::write(
            mission.join("m0100.bnd"),
            binder_bytes(&[("model\\map\\m0100\\m0100.flv", b"geometry")]),
        )
        .unwrap();

        // Resource directory with the ACV dictionary
        let res_dir = dir.path().join("res");
        fs::create_dir_all(&res_dir).unwrap();
        fs::write(res_dir.join("dict-acv.txt"), "/param/system.def\n").unwrap();

        Fixture {
            _dir: dir,
            root,
            res_dir,
        }
    }

    fn run(fixture: &Fixture, config: &LoaderConfig) -> Result<StageReport> {
        let mut pipeline = Pipeline::new(config, fixture.res_dir.clone());
        pipeline.run(
            &fixture.root,
            PlatformType::PS3,
            GameType::ArmoredCoreV,
            &mut Reporter::new(),
        )
    }

    #[test]
    fn test_full_run_produces_loose_layout() {
        let fixture = fixture();
        let config = LoaderConfig::default();
        let report = run(&fixture, &config).unwrap();

        assert_eq!(report.len(), Stage::ORDER.len());
        for (stage, result) in &report {
            match stage {
                // PS3 patch skips because the fixture has no fsb
                Stage::PlatformPatch => {
                    assert!(matches!(result, StageResult::Skipped(_)), "{stage}")
                }
                _ => assert_eq!(result, &StageResult::Completed, "{stage}"),
            }
        }

        // Main archive entry landed under its dictionary name
        assert_eq!(
            fs::read(fixture.root.join("param").join("system.def")).unwrap(),
            b"params"
        );
        // Boot binder contents are lowercased
        assert_eq!(
            fs::read(fixture.root.join("system").join("boot.ini")).unwrap(),
            b"boot data"
        );
        // Scripts routed by suffix
        assert!(fixture
            .root
            .join("scene")
            .join("m01")
            .join("m01scene.lc")
            .is_file());
        assert!(fixture
            .root
            .join("airesource")
            .join("script")
            .join("ai")
            .join("enemy.lc")
            .is_file());
        // Mission binder unpacked and its map repacked
        let map_dir = fixture.root.join("model").join("map").join("m0100");
        assert!(map_dir.join("m0100.flv").is_file());
        assert!(map_dir.join("m0100_m.dcx.bnd").is_file());
        assert!(map_dir.join("m0100_htdcx.bnd").is_file());
        // Header hidden
        assert!(fixture.root.join("bind").join("-dvdbnd5.bhd").is_file());
        assert!(!fixture.root.join("bind").join("dvdbnd5.bhd").exists());
    }

    #[test]
    fn test_rerun_is_idempotent_with_skip_existing() {
        let fixture = fixture();
        let config = LoaderConfig {
            skip_existing_files: true,
            ..LoaderConfig::default()
        };
        run(&fixture, &config).unwrap();
        let report = run(&fixture, &config).unwrap();

        // Second run: archive header is hidden, so the main stage
        // warns (unpacking from the hidden copy) rather than failing
        assert!(matches!(
            report[0],
            (Stage::MainArchive, StageResult::Warned(_))
        ));

        // Exactly one marker prefix on the header
        let bind = fixture.root.join("bind");
        assert!(bind.join("-dvdbnd5.bhd").is_file());
        assert!(!bind.join("--dvdbnd5.bhd").exists());
    }

    #[test]
    fn test_hide_headers_twice_single_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let bind = dir.path().join("bind");
        fs::create_dir_all(&bind).unwrap();
        fs::write(bind.join("dvdbnd5.bhd"), b"BHD5").unwrap();

        let config = LoaderConfig::default();
        let pipeline = Pipeline::new(&config, dir.path().join("res"));
        let mut reporter = Reporter::new();

        let first = pipeline
            .hide_headers(&bind, GameType::ArmoredCoreV, &mut reporter)
            .unwrap();
        assert_eq!(first, StageResult::Completed);
        let second = pipeline
            .hide_headers(&bind, GameType::ArmoredCoreV, &mut reporter)
            .unwrap();
        assert!(matches!(second, StageResult::Skipped(_)));

        assert!(bind.join("-dvdbnd5.bhd").is_file());
        assert!(!bind.join("--dvdbnd5.bhd").exists());
        assert!(!bind.join("dvdbnd5.bhd").exists());
    }

    #[test]
    fn test_missing_mission_dir_is_user_error_and_nondestructive() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("USRDIR");
        let bind = root.join("bind");
        fs::create_dir_all(&bind).unwrap();
        fs::write(
            bind.join("boot.bnd"),
            binder_bytes(&[("system\\boot.ini", b"boot data")]),
        )
        .unwrap();
        let (header, data) = bxf3_build::build(&[("ai\\enemy.lc", b"ai")]);
        fs::write(bind.join("script.bhd"), header).unwrap();
        fs::write(bind.join("script.bdt"), data).unwrap();

        let config = LoaderConfig::default();
        let mut pipeline = Pipeline::new(&config, dir.path().join("res"));
        let err = pipeline
            .run(
                &root,
                PlatformType::PS3,
                GameType::ArmoredCoreV,
                &mut Reporter::new(),
            )
            .unwrap_err();
        assert!(err.is_user());

        // Earlier stages' work stays; nothing else appeared
        assert!(root.join("system").join("boot.ini").is_file());
        assert!(!root.join("model").exists());
    }

    #[test]
    fn test_missing_dictionary_warns_and_run_completes() {
        let fixture = fixture();
        // Point the pipeline at an empty res dir: no dictionary
        let config = LoaderConfig::default();
        let mut pipeline = Pipeline::new(&config, fixture.res_dir.join("empty"));
        let report = pipeline
            .run(
                &fixture.root,
                PlatformType::PS3,
                GameType::ArmoredCoreV,
                &mut Reporter::new(),
            )
            .unwrap();

        assert!(matches!(
            report[0],
            (Stage::MainArchive, StageResult::Skipped(_))
        ));
        // The rest of the pipeline still ran
        assert!(matches!(
            report[1],
            (Stage::BootBinders, StageResult::Completed)
        ));
        // The packed archive data was never extracted; the header was
        // still hidden by the later stage
        assert!(fixture.root.join("bind").join("dvdbnd.bdt").is_file());
        assert!(fixture.root.join("bind").join("-dvdbnd5.bhd").is_file());
        assert!(!fixture.root.join("param").exists());
    }

    #[test]
    fn test_skip_flags_short_circuit_stages() {
        let fixture = fixture();
        let config = LoaderConfig {
            skip_main_archive_unpack: true,
            skip_boot_binder_unpack: true,
            skip_script_unpack: true,
            skip_map_unpack: true,
            skip_map_resource_pack: true,
            hide_headers: false,
            apply_fmod_crash_fix: false,
            ..LoaderConfig::default()
        };
        let report = run(&fixture, &config).unwrap();
        for (stage, result) in &report {
            assert!(matches!(result, StageResult::Skipped(_)), "{stage}");
        }
        // Nothing happened on disk
        assert!(fixture.root.join("bind").join("dvdbnd5.bhd").is_file());
        assert!(!fixture.root.join("scene").exists());
    }

    #[test]
    fn test_scripts_unwrap_sdat_when_needed() {
        let fixture = fixture();
        let bind = fixture.root.join("bind");

        // Replace the plain script pair with SDAT-wrapped copies
        let header = fs::read(bind.join("script.bhd")).unwrap();
        let data = fs::read(bind.join("script.bdt")).unwrap();
        fs::remove_file(bind.join("script.bhd")).unwrap();
        fs::remove_file(bind.join("script.bdt")).unwrap();
        fs::write(bind.join("script.bhd.sdat"), sdat_build::build(&header)).unwrap();
        fs::write(bind.join("script.bdt.sdat"), sdat_build::build(&data)).unwrap();

        let config = LoaderConfig::default();
        let report = run(&fixture, &config).unwrap();
        assert!(matches!(report[2], (Stage::Scripts, StageResult::Completed)));
        assert!(fixture
            .root
            .join("scene")
            .join("m01")
            .join("m01scene.lc")
            .is_file());
    }

    #[test]
    fn test_scripts_missing_everywhere_is_user_error() {
        let fixture = fixture();
        let bind = fixture.root.join("bind");
        fs::remove_file(bind.join("script.bhd")).unwrap();

        let config = LoaderConfig::default();
        let err = run(&fixture, &config).unwrap_err();
        assert!(err.is_user());
    }

    #[test]
    fn test_scripts_fall_back_to_resources() {
        let fixture = fixture();
        let bind = fixture.root.join("bind");
        let header = fs::read(bind.join("script.bhd")).unwrap();
        fs::remove_file(bind.join("script.bhd")).unwrap();
        fs::write(fixture.res_dir.join("script.bhd"), header).unwrap();

        let config = LoaderConfig::default();
        let report = run(&fixture, &config).unwrap();
        assert!(matches!(report[2], (Stage::Scripts, StageResult::Completed)));
    }

    #[test]
    fn test_fmod_fix_grows_short_file_once() {
        let fixture = fixture();
        let sound = fixture.root.join("sound");
        fs::create_dir_all(&sound).unwrap();
        fs::write(sound.join("se_weapon.fsb"), b"FSB4 truncated").unwrap();

        let config = LoaderConfig::default();
        let report = run(&fixture, &config).unwrap();
        assert!(matches!(
            report[6],
            (Stage::PlatformPatch, StageResult::Completed)
        ));
        let len = sound.join("se_weapon.fsb").metadata().unwrap().len();
        assert_eq!(len, SE_WEAPON_SAFE_LEN);

        // Original bytes survive at the front, padding is zero
        let bytes = fs::read(sound.join("se_weapon.fsb")).unwrap();
        assert!(bytes.starts_with(b"FSB4 truncated"));
        assert_eq!(bytes[bytes.len() - 1], 0);

        // A second run leaves the already-grown file alone
        run(&fixture, &config).unwrap();
        let len = sound.join("se_weapon.fsb").metadata().unwrap().len();
        assert_eq!(len, SE_WEAPON_SAFE_LEN);
    }

    #[test]
    fn test_missing_bind_dir_is_user_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("USRDIR");
        fs::create_dir_all(&root).unwrap();

        let config = LoaderConfig::default();
        let mut pipeline = Pipeline::new(&config, dir.path().join("res"));
        let err = pipeline
            .run(
                &root,
                PlatformType::PS3,
                GameType::ArmoredCoreV,
                &mut Reporter::new(),
            )
            .unwrap_err();
        assert!(err.is_user());
    }
}
