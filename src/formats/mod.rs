//! Engine container and system-file codecs
//!
//! Everything the pipeline reads or writes on the byte level lives
//! here: BND3 binders, BHF3/BDF3 split binders, the BHD5 main-archive
//! index, and PARAM.SFO. The pipeline only ever touches these through
//! their public read/write functions.

pub mod bhd5;
pub mod bnd3;
pub mod bxf3;
pub mod sfo;
