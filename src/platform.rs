//! Platform and game variants
//!
//! Both enums are closed: adding a platform or game means adding a
//! variant here and updating every match that no longer compiles.
//! Stage behavior must never hang off extra boolean flags.

use std::fmt;

/// Consoles a packed installation can come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformType {
    /// PlayStation 3
    PS3,
    /// Xbox 360
    Xbox360,
}

impl PlatformType {
    /// Parse a config-file literal. Case-sensitive by contract so a
    /// typoed value falls back to the default instead of half-matching.
    pub fn parse_name(name: &str) -> Option<Self> {
        match name {
            "PS3" => Some(PlatformType::PS3),
            "Xbox360" => Some(PlatformType::Xbox360),
            _ => None,
        }
    }

    /// Whether `name` is a recognized boot executable for this platform
    ///
    /// PS3 boots from `EBOOT.BIN` (or a bare `.elf` in debug dumps),
    /// Xbox 360 from `default.xex`. Comparison is ASCII
    /// case-insensitive; console filesystems do not agree on case.
    pub fn matches_executable(self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        match self {
            PlatformType::PS3 => lower == "eboot.bin" || lower.ends_with(".elf"),
            PlatformType::Xbox360 => lower == "default.xex",
        }
    }

    /// All platforms in inference order: PS3 is checked before Xbox 360
    /// when a directory could pass as either.
    pub const INFERENCE_ORDER: [PlatformType; 2] = [PlatformType::PS3, PlatformType::Xbox360];
}

impl fmt::Display for PlatformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformType::PS3 => write!(f, "PS3"),
            PlatformType::Xbox360 => write!(f, "Xbox360"),
        }
    }
}

/// Games this tool knows how to loose-load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameType {
    /// Armored Core V
    ArmoredCoreV,
    /// Armored Core Verdict Day
    ArmoredCoreVD,
}

impl GameType {
    /// Parse a config-file literal (case-sensitive, like [`PlatformType`])
    pub fn parse_name(name: &str) -> Option<Self> {
        match name {
            "ArmoredCoreV" => Some(GameType::ArmoredCoreV),
            "ArmoredCoreVD" => Some(GameType::ArmoredCoreVD),
            _ => None,
        }
    }

    /// File name of this game's filename dictionary in the resource directory
    pub fn dictionary_file_name(self) -> &'static str {
        match self {
            GameType::ArmoredCoreV => "dict-acv.txt",
            GameType::ArmoredCoreVD => "dict-acvd.txt",
        }
    }

    /// Main-archive header/data pairs under `bind/`, in extraction order
    ///
    /// Verdict Day splits the archive into two layers; both are
    /// extracted and both headers are hidden afterwards.
    pub fn archive_pairs(self) -> &'static [(&'static str, &'static str)] {
        match self {
            GameType::ArmoredCoreV => &[("dvdbnd5.bhd", "dvdbnd.bdt")],
            GameType::ArmoredCoreVD => &[
                ("dvdbnd5_layer0.bhd", "dvdbnd_layer0.bdt"),
                ("dvdbnd5_layer1.bhd", "dvdbnd_layer1.bdt"),
            ],
        }
    }

    /// Data file under `bind/` whose presence identifies the game when
    /// no usable PARAM.SFO exists
    pub fn marker_file(self) -> &'static str {
        match self {
            GameType::ArmoredCoreV => "dvdbnd.bdt",
            GameType::ArmoredCoreVD => "dvdbnd_layer0.bdt",
        }
    }

    /// PARAM.SFO TITLE value naming this game
    pub fn sfo_title(self) -> &'static str {
        match self {
            GameType::ArmoredCoreV => "ARMORED CORE V",
            GameType::ArmoredCoreVD => "Armored Core Verdict Day",
        }
    }

    /// Known retail TITLE_ID values for this game, all regions
    pub fn title_ids(self) -> &'static [&'static str] {
        match self {
            GameType::ArmoredCoreV => {
                &["BLKS20356", "BLAS50448", "BLJM60378", "BLUS30516", "BLES01440"]
            }
            GameType::ArmoredCoreVD => {
                &["BLKS20441", "BLAS50618", "BLJM61020", "BLUS31194", "BLES01898"]
            }
        }
    }

    /// All games in identification order
    pub const ALL: [GameType; 2] = [GameType::ArmoredCoreV, GameType::ArmoredCoreVD];
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::ArmoredCoreV => write!(f, "Armored Core V"),
            GameType::ArmoredCoreVD => write!(f, "Armored Core Verdict Day"),
        }
    }
}
