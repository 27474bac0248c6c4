//! Shared types used across resolution and markup generation.
//!
//! Two families live here:
//!
//! - **Configuration**: [`SizeOption`], [`Breakpoint`], [`ResponsiveSet`] and
//!   [`SetRegistry`]. Built once from `sets.toml` (see [`crate::config`]) and
//!   never mutated by the rendering core.
//! - **Media library data**: [`Attachment`], [`AttachmentMeta`] and
//!   [`SizeVariant`], mirroring what the host CMS stores for an upload, plus
//!   the ephemeral [`ResolvedSource`] produced by [`crate::resolve`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Identifier of an attachment in the host media library.
pub type AttachmentId = u64;

/// Width × height in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A pixel-density variant declared on a breakpoint, e.g. `"2x"` → 2.0.
#[derive(Debug, Clone, PartialEq)]
pub struct RetinaOption {
    pub descriptor: String,
    pub multiplier: f64,
}

/// One breakpoint's configuration.
///
/// Every template is optional: `None` means the corresponding output mode is
/// not generated for this breakpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeOption {
    /// Size-variant name known to the media library (e.g. `"hero-lg"`).
    pub key: String,
    /// Declared dimensions. Drive the upscale check and SVG sizing.
    pub size: Dimensions,
    /// Whole-tag template for `<img>` output. Carried for completeness; the
    /// `<img>` renderer is driven by `srcset` and `sizes`.
    pub img: Option<String>,
    /// One `<picture>` child line, e.g. `<source srcset="{src}" media="...">`.
    pub picture: Option<String>,
    /// Background media query, e.g. `@media (min-width: {w}px)`.
    pub bg: Option<String>,
    /// Retina background media query using `{dpr}` and `{min_res}`.
    pub bg_retina: Option<String>,
    /// `srcset` entry, usually `{w}w`.
    pub srcset: Option<String>,
    /// `sizes` entry, e.g. `(min-width: 1024px) 1200px`.
    pub sizes: Option<String>,
    /// Retina variants in declaration order.
    pub retina: Vec<RetinaOption>,
}

impl SizeOption {
    /// A breakpoint with no output modes enabled.
    pub fn new(key: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            key: key.into(),
            size: Dimensions::new(width, height),
            img: None,
            picture: None,
            bg: None,
            bg_retina: None,
            srcset: None,
            sizes: None,
            retina: Vec::new(),
        }
    }

    pub fn with_srcset(mut self, template: impl Into<String>) -> Self {
        self.srcset = Some(template.into());
        self
    }

    pub fn with_sizes(mut self, template: impl Into<String>) -> Self {
        self.sizes = Some(template.into());
        self
    }

    pub fn with_picture(mut self, template: impl Into<String>) -> Self {
        self.picture = Some(template.into());
        self
    }

    pub fn with_bg(mut self, template: impl Into<String>) -> Self {
        self.bg = Some(template.into());
        self
    }

    pub fn with_bg_retina(mut self, template: impl Into<String>) -> Self {
        self.bg_retina = Some(template.into());
        self
    }

    pub fn with_retina(mut self, descriptor: impl Into<String>, multiplier: f64) -> Self {
        self.retina.push(RetinaOption {
            descriptor: descriptor.into(),
            multiplier,
        });
        self
    }

    /// Names of the output modes this breakpoint participates in.
    pub fn enabled_modes(&self) -> Vec<&'static str> {
        [
            ("img", self.img.is_some()),
            ("srcset", self.srcset.is_some()),
            ("sizes", self.sizes.is_some()),
            ("picture", self.picture.is_some()),
            ("bg", self.bg.is_some()),
            ("bg_retina", self.bg_retina.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }
}

/// A named breakpoint inside a set.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakpoint {
    /// Breakpoint key, unique within its set (e.g. `"desktop"`).
    pub name: String,
    pub option: SizeOption,
}

impl Breakpoint {
    pub fn new(name: impl Into<String>, option: SizeOption) -> Self {
        Self {
            name: name.into(),
            option,
        }
    }
}

/// Ordered breakpoints for one named responsive configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsiveSet {
    key: String,
    breakpoints: Vec<Breakpoint>,
}

impl ResponsiveSet {
    pub fn new(key: impl Into<String>, breakpoints: Vec<Breakpoint>) -> Self {
        Self {
            key: key.into(),
            breakpoints,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Breakpoints in registration order.
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    pub fn breakpoint(&self, name: &str) -> Option<&Breakpoint> {
        self.breakpoints.iter().find(|b| b.name == name)
    }

    /// Dimensions of the breakpoint whose size key equals the set key,
    /// falling back to the first breakpoint.
    pub fn primary_dimensions(&self) -> Option<Dimensions> {
        self.breakpoints
            .iter()
            .find(|b| b.option.key == self.key)
            .or_else(|| self.breakpoints.first())
            .map(|b| b.option.size)
    }

    /// Mobile-first sets declare `min-width` queries, starting from the
    /// narrowest breakpoint. Decided by the first breakpoint's `bg` template.
    pub fn is_mobile_first(&self) -> bool {
        self.breakpoints
            .first()
            .and_then(|b| b.option.bg.as_deref())
            .is_some_and(|bg| bg.contains("min-width"))
    }
}

/// All registered responsive sets, keyed by set name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetRegistry {
    sets: HashMap<String, ResponsiveSet>,
}

impl SetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a set, replacing any previous set with the same key.
    pub fn insert(&mut self, set: ResponsiveSet) {
        self.sets.insert(set.key.clone(), set);
    }

    pub fn get(&self, key: &str) -> Option<&ResponsiveSet> {
        self.sets.get(key)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Sets sorted by key, for stable display.
    pub fn sorted(&self) -> Vec<&ResponsiveSet> {
        let mut sets: Vec<_> = self.sets.values().collect();
        sets.sort_by(|a, b| a.key.cmp(&b.key));
        sets
    }
}

impl FromIterator<ResponsiveSet> for SetRegistry {
    fn from_iter<I: IntoIterator<Item = ResponsiveSet>>(iter: I) -> Self {
        let mut registry = Self::new();
        for set in iter {
            registry.insert(set);
        }
        registry
    }
}

/// An upload as seen by the rendering core. Read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub mime_type: String,
    /// Absolute path of the stored original file.
    pub file: PathBuf,
}

impl Attachment {
    /// SVG uploads have no generated size variants.
    pub fn is_svg(&self) -> bool {
        self.mime_type.contains("image/svg")
    }
}

/// One stored rendition of an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeVariant {
    pub width: u32,
    pub height: u32,
    /// File name, relative to the original's directory.
    pub file: String,
}

/// Size-variant metadata the media library keeps for an attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentMeta {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    /// Path of the original relative to the upload base, e.g. `2024/05/a.jpg`.
    #[serde(default)]
    pub file: String,
    /// Variant name → rendition. Retina renditions use `<key>@<descriptor>`.
    #[serde(default)]
    pub sizes: BTreeMap<String, SizeVariant>,
}

impl AttachmentMeta {
    /// No original and no variants recorded, e.g. a `{}` record.
    pub fn is_empty(&self) -> bool {
        self.file.is_empty() && self.width == 0 && self.sizes.is_empty()
    }

    /// Whether the original's file and width are known, so it can stand in
    /// for a missing variant.
    pub fn has_original(&self) -> bool {
        !self.file.is_empty() && self.width > 0
    }
}

/// The concrete file chosen for one breakpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSource {
    pub width: u32,
    pub height: u32,
    pub file: String,
    /// The attachment the file belongs to (differs from the primary one
    /// when the breakpoint was rewritten).
    pub attachment_id: AttachmentId,
}

/// Breakpoint name → resolved source.
pub type ResolvedSources = BTreeMap<String, ResolvedSource>;
