//! Loader configuration
//!
//! All behavior is driven by a line-oriented `key=value` config file
//! next to the executable; the CLI takes paths only. The parsed
//! [`LoaderConfig`] is built once and never mutated by the pipeline.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::platform::{GameType, PlatformType};

/// Immutable run configuration
///
/// Field names double as config-file keys. Unknown keys are ignored
/// and malformed values keep the built-in default, so an old config
/// file keeps working across versions.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Mirror console output into a log file
    pub log_to_file: bool,
    /// Wait for a key press before exiting
    pub pause_on_finish: bool,
    /// Leave already-present destination files untouched while unpacking
    pub skip_existing_files: bool,
    /// Drop main-archive entries whose hash is not in the dictionary
    pub skip_unknown_files: bool,
    /// Skip the main-archive unpack stage
    pub skip_main_archive_unpack: bool,
    /// Skip the main-archive unpack when the header was already hidden by this tool
    pub skip_hidden_main_archive_unpack: bool,
    /// Skip unpacking boot binders
    pub skip_boot_binder_unpack: bool,
    /// Skip unpacking scripts
    pub skip_script_unpack: bool,
    /// Skip unpacking maps
    pub skip_map_unpack: bool,
    /// Skip repacking map resources (Armored Core V only)
    pub skip_map_resource_pack: bool,
    /// Hide main-archive headers so the game loads loose files
    pub hide_headers: bool,
    /// Grow sound/se_weapon.fsb to work around an FMOD crash on PS3
    pub apply_fmod_crash_fix: bool,
    /// Treat each argument as the root folder verbatim and use the default platform
    pub use_manual_path: bool,
    /// Skip platform inference and use the default platform
    pub use_default_platform: bool,
    /// Skip game identification and use the default game
    pub use_default_game: bool,
    /// Platform assumed when inference is bypassed
    pub default_platform: PlatformType,
    /// Game assumed when identification is bypassed
    pub default_game: GameType,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            log_to_file: true,
            pause_on_finish: true,
            skip_existing_files: false,
            skip_unknown_files: false,
            skip_main_archive_unpack: false,
            skip_hidden_main_archive_unpack: false,
            skip_boot_binder_unpack: false,
            skip_script_unpack: false,
            skip_map_unpack: false,
            skip_map_resource_pack: false,
            hide_headers: true,
            apply_fmod_crash_fix: true,
            use_manual_path: false,
            use_default_platform: false,
            use_default_game: false,
            default_platform: PlatformType::PS3,
            default_game: GameType::ArmoredCoreV,
        }
    }
}

impl LoaderConfig {
    /// Load a config from a file path, keeping defaults for anything
    /// the file does not set. A missing file yields all defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)?;
        Ok(Self::from_str_lossy(&text))
    }

    /// Build a config from `key=value` text
    ///
    /// Blank lines and lines starting with `#` or `;` are skipped.
    /// Values split on the first `=` only, so values may contain `=`.
    pub fn from_str_lossy(text: &str) -> Self {
        let mut values = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                values.insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        let mut config = Self::default();
        config.apply(&values);
        config
    }

    /// Apply parsed key/value pairs over the current values
    ///
    /// This is the fixed field table: every recognized key appears
    /// exactly once. A key missing from `values` or carrying a
    /// malformed value leaves the field as-is.
    fn apply(&mut self, values: &HashMap<String, String>) {
        set_bool(values, "LogToFile", &mut self.log_to_file);
        set_bool(values, "PauseOnFinish", &mut self.pause_on_finish);
        set_bool(values, "SkipExistingFiles", &mut self.skip_existing_files);
        set_bool(values, "SkipUnknownFiles", &mut self.skip_unknown_files);
        set_bool(values, "SkipMainArchiveUnpack", &mut self.skip_main_archive_unpack);
        set_bool(
            values,
            "SkipHiddenMainArchiveUnpack",
            &mut self.skip_hidden_main_archive_unpack,
        );
        set_bool(values, "SkipBootBinderUnpack", &mut self.skip_boot_binder_unpack);
        set_bool(values, "SkipScriptUnpack", &mut self.skip_script_unpack);
        set_bool(values, "SkipMapUnpack", &mut self.skip_map_unpack);
        set_bool(values, "SkipMapResourcePack", &mut self.skip_map_resource_pack);
        set_bool(values, "HideHeaders", &mut self.hide_headers);
        set_bool(values, "ApplyFmodCrashFix", &mut self.apply_fmod_crash_fix);
        set_bool(values, "UseManualPath", &mut self.use_manual_path);
        set_bool(values, "UseDefaultPlatform", &mut self.use_default_platform);
        set_bool(values, "UseDefaultGame", &mut self.use_default_game);

        if let Some(platform) = values.get("DefaultPlatform").and_then(|v| PlatformType::parse_name(v)) {
            self.default_platform = platform;
        }
        if let Some(game) = values.get("DefaultGame").and_then(|v| GameType::parse_name(v)) {
            self.default_game = game;
        }
    }
}

fn set_bool(values: &HashMap<String, String>, key: &str, field: &mut bool) {
    if let Some(value) = values.get(key) {
        if value.eq_ignore_ascii_case("true") {
            *field = true;
        } else if value.eq_ignore_ascii_case("false") {
            *field = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoaderConfig::default();
        assert!(config.log_to_file);
        assert!(config.pause_on_finish);
        assert!(config.hide_headers);
        assert!(config.apply_fmod_crash_fix);
        assert!(!config.skip_existing_files);
        assert!(!config.use_manual_path);
        assert_eq!(config.default_platform, PlatformType::PS3);
        assert_eq!(config.default_game, GameType::ArmoredCoreV);
    }

    #[test]
    fn test_parse_overrides() {
        let config = LoaderConfig::from_str_lossy(
            "# comment\n\
             SkipExistingFiles = true\n\
             HideHeaders=false\n\
             DefaultGame=ArmoredCoreVD\n\
             DefaultPlatform=Xbox360\n",
        );
        assert!(config.skip_existing_files);
        assert!(!config.hide_headers);
        assert_eq!(config.default_game, GameType::ArmoredCoreVD);
        assert_eq!(config.default_platform, PlatformType::Xbox360);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let config = LoaderConfig::from_str_lossy("NotARealKey=true\nSkipMapUnpack=true\n");
        assert!(config.skip_map_unpack);
    }

    #[test]
    fn test_malformed_values_keep_defaults() {
        let config = LoaderConfig::from_str_lossy(
            "PauseOnFinish=maybe\nDefaultPlatform=xbox360\nDefaultGame=\n",
        );
        assert!(config.pause_on_finish);
        assert_eq!(config.default_platform, PlatformType::PS3);
        assert_eq!(config.default_game, GameType::ArmoredCoreV);
    }

    #[test]
    fn test_value_may_contain_equals() {
        // Split happens on the first '=' only
        let config = LoaderConfig::from_str_lossy("LogToFile=true=true\n");
        // "true=true" is malformed, default kept
        assert!(config.log_to_file);
    }
}
