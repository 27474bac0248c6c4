//! Naming conventions for retina variants and pixel-density tiers.
//!
//! Retina renditions are stored in the media library under the base size key
//! suffixed with the descriptor:
//!
//! - `hero` + `2x` → `hero@2x`
//! - `card-sm` + `1.5x` → `card-sm@1.5x`
//!
//! ## Density tiers
//!
//! Background rules cannot use `srcset` descriptors, so each retina variant
//! is mapped to one of two media-query tiers:
//!
//! | Multiplier | Tier | Pixel ratio | Resolution |
//! |------------|------|-------------|------------|
//! | `< 2.5` | [`DprTier::Retina`] | 1.5 | 144dpi |
//! | `>= 2.5` | [`DprTier::HighDensity`] | 2.5 | 192dpi |

/// Media-library key of a retina rendition.
pub fn retina_key(size_key: &str, descriptor: &str) -> String {
    format!("{size_key}@{descriptor}")
}

/// Parse a density descriptor like `"2x"` or `"1.5x"` into its multiplier.
///
/// Returns `None` for anything that is not a positive finite number followed
/// by `x`.
pub fn parse_retina_descriptor(descriptor: &str) -> Option<f64> {
    let number = descriptor.trim().strip_suffix('x')?;
    let multiplier: f64 = number.parse().ok()?;
    (multiplier.is_finite() && multiplier > 0.0).then_some(multiplier)
}

/// Pixel-density tier used for retina background media queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DprTier {
    /// Pixel ratio 1.5 / 144dpi.
    Retina,
    /// Pixel ratio 2.5 / 192dpi.
    HighDensity,
}

impl DprTier {
    pub fn for_multiplier(multiplier: f64) -> Self {
        if multiplier < 2.5 {
            DprTier::Retina
        } else {
            DprTier::HighDensity
        }
    }

    pub fn pixel_ratio(self) -> &'static str {
        match self {
            DprTier::Retina => "1.5",
            DprTier::HighDensity => "2.5",
        }
    }

    pub fn min_resolution(self) -> &'static str {
        match self {
            DprTier::Retina => "144dpi",
            DprTier::HighDensity => "192dpi",
        }
    }

    /// Replacement for the `{dpr}` token.
    pub fn dpr_condition(self) -> String {
        format!("(-webkit-min-device-pixel-ratio:{})", self.pixel_ratio())
    }

    /// Replacement for the `{min_res}` token.
    pub fn min_res_condition(self) -> String {
        format!("(min-resolution : {})", self.min_resolution())
    }

    /// Stand-alone media query for this tier, with no width constraint.
    pub fn media_query(self) -> String {
        format!(
            "@media {}, {}",
            self.dpr_condition(),
            self.min_res_condition()
        )
    }
}
