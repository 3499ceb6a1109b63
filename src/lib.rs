//! # acvloose
//!
//! A Rust library and CLI for converting packed Armored Core V /
//! Armored Core Verdict Day console installs (PS3, Xbox 360) into a
//! "loose" file layout that emulators can load, and for repacking
//! per-map resources into the binders the game engine expects.
//!
//! ## Overview
//!
//! A packed install keeps nearly everything inside one hash-indexed
//! archive (`bind/dvdbnd*.bdt`) plus a handful of BND3 binders. This
//! crate provides:
//!
//! - Platform and game detection from whatever path the user supplies
//!   (the executable, the disc root, `PS3_GAME`, `USRDIR`)
//! - A fixed-order, idempotent, per-stage-skippable pipeline: unpack
//!   the main archive, boot binders, scripts, and maps, hide the
//!   archive headers, repack map resources, apply the PS3 sound patch
//! - Reading and writing the engine's container formats (BND3,
//!   BHF3/BDF3, BHD5, PARAM.SFO)
//! - SDAT unwrapping for still-encrypted script binders
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use acvloose::{
//!     detect, LoaderConfig, Pipeline, Reporter,
//! };
//!
//! fn main() -> acvloose::Result<()> {
//!     let config = LoaderConfig::default();
//!     let mut reporter = Reporter::new();
//!
//!     let raw = Path::new("game/PS3_GAME/USRDIR/EBOOT.BIN");
//!     let (root, platform) = detect::resolve_root(raw, &config)?;
//!     let game = detect::identify_game(platform, &root, &config, &mut reporter)?;
//!
//!     let mut pipeline = Pipeline::new(&config, "res".into());
//!     let report = pipeline.run(&root, platform, game, &mut reporter)?;
//!     for (stage, result) in report {
//!         println!("{stage}: {result:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crypto;
pub mod detect;
pub mod dict;
pub mod error;
pub mod formats;
pub mod ops;
pub mod paths;
pub mod pipeline;
pub mod platform;
pub mod report;

pub use config::LoaderConfig;
pub use dict::{DictionaryCache, HashDictionary};
pub use error::{Error, Result};
pub use formats::bnd3::{Binder, BinderEntry};
pub use pipeline::{Pipeline, Stage, StageReport, StageResult};
pub use platform::{GameType, PlatformType};
pub use report::Reporter;
