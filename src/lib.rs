//! # rwd-images
//!
//! Responsive image markup for CMS media attachments. Given an attachment and
//! the name of a responsive set, produce an `<img srcset>`, a `<picture>`, or
//! CSS background rules that serve the right stored size variant (and its
//! retina renditions) at every breakpoint.
//!
//! No pixels are produced here: the size variants are assumed to exist in the
//! host's media library. This crate decides which of them to reference and
//! writes the markup.
//!
//! # Architecture: Resolve, Then Render
//!
//! ```text
//! RwdImage::img("hero")
//!   1. Select   sets.toml registry → ResponsiveSet "hero"
//!   2. Resolve  breakpoints → ResolvedSources   (MetadataCache ← MediaLibrary)
//!   3. Render   ResolvedSources → <img> / <picture> / BackgroundStyles
//! ```
//!
//! Resolution and rendering are separate so that the fallback policy
//! (SVG synthesis, no upscaling, missing-variant warnings) lives in one place
//! and the three renderers only format what was resolved.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`image`] | `RwdImage` orchestrator and the page-scoped `RenderContext` |
//! | [`resolve`] | Breakpoint → stored file resolution with fallback policy |
//! | [`generate`] | `<img>`, `<picture>`, SVG and background rendering; `BackgroundStyles` |
//! | [`cache`] | Request-scoped metadata and base-URL cache |
//! | [`media`] | `MediaLibrary` collaborator trait and the JSON-backed library |
//! | [`attributes`] | Ordered attribute map, escaping, alt text, attribute filters |
//! | [`template`] | Token substitution for set templates |
//! | [`naming`] | Retina variant keys and pixel-density tiers |
//! | [`config`] | `sets.toml` loading, layering and validation |
//! | [`types`] | Set configuration and media library data types |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Never Fail a Page
//!
//! Rendering functions return strings, not `Result`s. A missing variant
//! drops its breakpoint, an unknown set renders nothing, and both leave a
//! warning that is prepended to the markup as an HTML comment. A broken image
//! should be visible in the page source, not abort the page around it.
//!
//! ## Explicit Page State
//!
//! The metadata cache, the attribute filters, and the background styles
//! registry belong to a [`image::RenderContext`] created for one page build.
//! Nothing is global: dropping the context drops the cache, and the styles
//! are flushed explicitly with [`image::RenderContext::take_styles`].
//!
//! ## Escaping at Serialization
//!
//! Attribute values are escaped once, when the tag is written, using Maud's
//! escaper. Filters and callers work with raw values.

pub mod attributes;
pub mod cache;
pub mod config;
pub mod generate;
pub mod image;
pub mod media;
pub mod naming;
pub mod output;
pub mod resolve;
pub mod template;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
