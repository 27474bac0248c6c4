//! Responsive set configuration.
//!
//! Handles loading, validating, and merging `sets.toml` files into the
//! [`SetRegistry`] the renderers consume. Several files can be layered: a
//! theme ships its sets, a site overrides or adds some.
//!
//! ## File format
//!
//! ```toml
//! [sets.hero]
//!
//! [[sets.hero.breakpoints]]
//! name = "desktop"          # Breakpoint key, used in warnings and rewrites
//! key = "hero"              # Size-variant name in the media library
//! width = 1200
//! height = 600
//! srcset = "{w}w"
//! sizes = "(min-width: 768px) 1200px"
//! picture = '<source srcset="{src}" media="(min-width: 768px)">'
//! bg = ""                   # No media query: the desktop-first base rule
//! bg_retina = "@media {dpr}, {min_res}"
//! retina = ["2x"]
//!
//! [[sets.hero.breakpoints]]
//! name = "mobile"
//! key = "hero-sm"
//! width = 480
//! height = 320
//! srcset = "{w}w"
//! bg = "@media (max-width: 767px)"
//! ```
//!
//! Breakpoints are listed in set order. Every template is optional; a missing
//! template disables that output mode for the breakpoint.
//!
//! ## Layering
//!
//! Files are merged in order with [`merge_toml`]: tables merge key by key,
//! everything else (including a set's `breakpoints` array) is replaced
//! wholesale. Redefining `[sets.hero]` in a later file therefore replaces the
//! whole set, while new sets are added next to the existing ones.
//!
//! ## Validation
//!
//! Unknown keys are rejected. After merging, every set must have at least
//! one breakpoint, breakpoint names must be unique within their set, `key`
//! must be non-empty, `width` must be positive, and every retina descriptor
//! must parse (`"2x"`, `"1.5x"`).

use crate::naming::parse_retina_descriptor;
use crate::types::{Breakpoint, ResponsiveSet, SetRegistry, SizeOption};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top level of a `sets.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SetsConfig {
    /// Set key → set definition.
    pub sets: BTreeMap<String, SetConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SetConfig {
    pub breakpoints: Vec<BreakpointConfig>,
}

/// One `[[sets.<key>.breakpoints]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BreakpointConfig {
    pub name: String,
    pub key: String,
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_retina: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srcset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<String>,
    /// Density descriptors, e.g. `["2x", "3x"]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retina: Vec<String>,
}

impl SetsConfig {
    /// Validate every set and breakpoint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (set_key, set) in &self.sets {
            if set_key.is_empty() {
                return Err(ConfigError::Validation("set keys must not be empty".into()));
            }
            if set.breakpoints.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "sets.{set_key} must have at least one breakpoint"
                )));
            }
            let mut seen = HashSet::new();
            for breakpoint in &set.breakpoints {
                if !seen.insert(breakpoint.name.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "sets.{set_key}: duplicate breakpoint name '{}'",
                        breakpoint.name
                    )));
                }
                breakpoint.validate(set_key)?;
            }
        }
        Ok(())
    }

    /// Validate and convert into the in-memory registry.
    pub fn to_registry(&self) -> Result<SetRegistry, ConfigError> {
        self.validate()?;
        self.sets
            .iter()
            .map(|(set_key, set)| -> Result<ResponsiveSet, ConfigError> {
                let breakpoints = set
                    .breakpoints
                    .iter()
                    .map(|b| -> Result<Breakpoint, ConfigError> {
                        Ok(Breakpoint::new(b.name.clone(), b.to_option(set_key)?))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ResponsiveSet::new(set_key.clone(), breakpoints))
            })
            .collect()
    }
}

impl BreakpointConfig {
    fn validate(&self, set_key: &str) -> Result<(), ConfigError> {
        let at = format!("sets.{set_key}.{}", self.name);
        if self.name.is_empty() {
            return Err(ConfigError::Validation(format!(
                "sets.{set_key}: breakpoint name must not be empty"
            )));
        }
        if self.key.is_empty() {
            return Err(ConfigError::Validation(format!("{at}: key must not be empty")));
        }
        if self.width == 0 {
            return Err(ConfigError::Validation(format!(
                "{at}: width must be greater than zero"
            )));
        }
        for descriptor in &self.retina {
            if parse_retina_descriptor(descriptor).is_none() {
                return Err(ConfigError::Validation(format!(
                    "{at}: invalid retina descriptor '{descriptor}' (expected e.g. \"2x\")"
                )));
            }
        }
        Ok(())
    }

    fn to_option(&self, set_key: &str) -> Result<SizeOption, ConfigError> {
        let mut option = SizeOption::new(self.key.clone(), self.width, self.height);
        option.img = self.img.clone();
        option.picture = self.picture.clone();
        option.bg = self.bg.clone();
        option.bg_retina = self.bg_retina.clone();
        option.srcset = self.srcset.clone();
        option.sizes = self.sizes.clone();
        for descriptor in &self.retina {
            let multiplier = parse_retina_descriptor(descriptor).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "sets.{set_key}.{}: invalid retina descriptor '{descriptor}'",
                    self.name
                ))
            })?;
            option = option.with_retina(descriptor.trim(), multiplier);
        }
        Ok(option)
    }
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load one sets file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge layers in order, then deserialize and validate.
pub fn resolve_config(layers: Vec<toml::Value>) -> Result<SetsConfig, ConfigError> {
    let merged = layers
        .into_iter()
        .fold(toml::Value::Table(toml::Table::new()), merge_toml);
    let config: SetsConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load and layer the given sets files into a registry.
///
/// Missing files are skipped; at least one set must be defined overall.
pub fn load_config(paths: &[PathBuf]) -> Result<SetRegistry, ConfigError> {
    let mut layers = Vec::new();
    for path in paths {
        match load_raw_config(path)? {
            Some(layer) => layers.push(layer),
            None => tracing::debug!(path = %path.display(), "sets file not found, skipping"),
        }
    }

    let config = resolve_config(layers)?;
    if config.sets.is_empty() {
        return Err(ConfigError::Validation(
            "no responsive sets defined".into(),
        ));
    }
    tracing::debug!(sets = config.sets.len(), "loaded responsive sets");
    config.to_registry()
}

/// Returns a fully-commented sample `sets.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Responsive Image Sets
# =====================
#
# Each [sets.<key>] block defines one responsive configuration, rendered with
#   rwd img --size <key> / rwd picture --size <key> / rwd background --size <key>
#
# Breakpoints are listed in order. Per breakpoint:
#
#   name       Breakpoint key (appears in warnings, target of --rewrite)
#   key        Size-variant name stored in the media library
#   width      Declared width in pixels (required, > 0)
#   height     Declared height in pixels
#   srcset     srcset entry; "{w}w" becomes "<url> <width>w"
#   sizes      sizes entry
#   picture    One line inside <picture>; tokens {src} {single-src} {alt} {w}
#   bg         Background media query; "" means no query; token {w}
#   bg_retina  Retina background media query; tokens {dpr} {min_res}
#   retina     Density descriptors; variants are stored as "<key>@<descriptor>"
#
# Leave a template out to disable that output for the breakpoint.

# ---------------------------------------------------------------------------
# Desktop-first hero: base rule without a query, narrower screens override.
# ---------------------------------------------------------------------------
[sets.hero]

[[sets.hero.breakpoints]]
name = "desktop"
key = "hero"
width = 1200
height = 600
srcset = "{w}w"
sizes = "(min-width: 768px) 1200px"
picture = '<source srcset="{src}" media="(min-width: 768px)">'
bg = ""
bg_retina = "@media {dpr}, {min_res}"
retina = ["2x"]

[[sets.hero.breakpoints]]
name = "mobile"
key = "hero-sm"
width = 480
height = 320
srcset = "{w}w"
sizes = "(max-width: 767px) 480px"
picture = '<img srcset="{src}" alt="{alt}">'
bg = "@media (max-width: 767px)"
bg_retina = "@media (max-width: 767px) and {dpr}, (max-width: 767px) and {min_res}"
retina = ["2x", "3x"]

# ---------------------------------------------------------------------------
# Mobile-first card: min-width queries, emitted widest first.
# ---------------------------------------------------------------------------
[sets.card]

[[sets.card.breakpoints]]
name = "small"
key = "card-sm"
width = 360
height = 240
srcset = "{w}w"
bg = "@media (min-width: 0px)"

[[sets.card.breakpoints]]
name = "large"
key = "card"
width = 720
height = 480
srcset = "{w}w"
bg = "@media (min-width: {w}px)"
bg_retina = "@media (min-width: {w}px) and {dpr}, (min-width: {w}px) and {min_res}"
retina = ["2x"]

# ---------------------------------------------------------------------------
# Single-size logo, typically an SVG upload.
# ---------------------------------------------------------------------------
[sets.logo]

[[sets.logo.breakpoints]]
name = "all"
key = "logo"
width = 200
height = 80
picture = '<img src="{single-src}" alt="{alt}">'
"##
}
