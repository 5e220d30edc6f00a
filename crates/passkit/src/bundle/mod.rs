//! Pass bundle directory handling.
//!
//! This module provides the stages that fill a bundle directory before it is
//! signed and compressed:
//! - Write per-language string tables ([`localizables`])
//! - Copy template assets ([`items`])
//! - Write `pass.json` ([`pass_json`])
//! - Hash every file into `manifest.json` ([`manifest`])
//!
//! # Bundle Layout
//!
//! ```text
//! bundle/
//! ├── pass.json
//! ├── manifest.json
//! ├── signature
//! ├── icon.png            (template assets, when no languages)
//! └── en.lproj/
//!     ├── pass.strings
//!     └── icon.png        (template assets, per language)
//! ```

pub mod items;
pub mod localizables;
pub mod manifest;
pub mod pass_json;

pub use items::{ItemsCopier, TemplateCopier};
pub use localizables::{LocalizablesGenerator, StringsFileGenerator};
pub use manifest::{Manifest, ManifestGenerator, Sha1ManifestGenerator};
pub use pass_json::{decode_pass, encode_pass, write_pass_json};
