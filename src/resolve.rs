//! Breakpoint source resolution.
//!
//! Maps every breakpoint of a [`ResponsiveSet`] to the concrete stored file
//! that should be served for it. Runs before any markup is generated; the
//! renderers in [`crate::generate`] only ever see what this module resolved.
//!
//! ## Resolution order per breakpoint
//!
//! 1. **Effective attachment**: a rewrite registered for the breakpoint
//!    name replaces the primary attachment.
//! 2. **SVG**: vector uploads have no generated variants. An entry is
//!    synthesized from the breakpoint's declared dimensions and the upload's
//!    own file name.
//! 3. **No upscaling**: when the variant is missing and the original is not
//!    wider than the breakpoint, the original itself is served. A larger
//!    variant cannot exist, so omitting the breakpoint would only lose it.
//! 4. **Still missing**: the breakpoint is dropped and a warning recorded.
//!
//! Synthesized entries are written back to the [`MetadataCache`], so the
//! renderers (and later renders in the same request) see them.
//!
//! Resolution never fails. Callers render whatever resolved and surface the
//! warnings.

use crate::cache::{MetadataCache, basename};
use crate::media::MediaLibrary;
use crate::types::{Attachment, ResolvedSource, ResolvedSources, ResponsiveSet, SizeVariant};
use std::collections::BTreeMap;

/// Outcome of resolving one set for one attachment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub sources: ResolvedSources,
    pub warnings: Vec<String>,
}

/// Resolve every breakpoint of `set` for `attachment`.
///
/// `rewrites` maps breakpoint names to replacement attachments.
pub fn resolve_sources(
    library: &dyn MediaLibrary,
    cache: &mut MetadataCache,
    attachment: &Attachment,
    set: &ResponsiveSet,
    rewrites: &BTreeMap<String, Attachment>,
) -> Resolution {
    let mut resolution = Resolution::default();

    for breakpoint in set.breakpoints() {
        let option = &breakpoint.option;
        let effective = rewrites.get(&breakpoint.name).unwrap_or(attachment);
        let mut meta = cache
            .metadata(library, effective.id)
            .filter(|m| !m.is_empty());

        if effective.is_svg() {
            let mut svg_meta = meta.unwrap_or_default();
            svg_meta.file = library.upload_dir().relative_path(&effective.file);
            svg_meta.sizes.insert(
                option.key.clone(),
                SizeVariant {
                    width: option.size.width,
                    height: option.size.height,
                    file: basename(&svg_meta.file).to_string(),
                },
            );
            cache.set_metadata(effective.id, svg_meta.clone());
            meta = Some(svg_meta);
        } else if let Some(m) = meta.as_mut()
            && !m.sizes.contains_key(&option.key)
            && m.has_original()
            && m.width <= option.size.width
        {
            tracing::debug!(
                attachment = effective.id,
                size = %option.key,
                width = m.width,
                "serving original for breakpoint wider than upload"
            );
            let fallback = SizeVariant {
                width: m.width,
                height: m.height,
                file: basename(&m.file).to_string(),
            };
            m.sizes.insert(option.key.clone(), fallback);
            cache.set_metadata(effective.id, m.clone());
        }

        let Some(variant) = meta.as_ref().and_then(|m| m.sizes.get(&option.key)) else {
            let warning = format!(
                "Attachment {}: missing image size \"{}:{}\"",
                effective.id,
                set.key(),
                breakpoint.name
            );
            tracing::debug!(
                attachment = effective.id,
                set = set.key(),
                breakpoint = %breakpoint.name,
                "missing image size"
            );
            resolution.warnings.push(warning);
            continue;
        };

        resolution.sources.insert(
            breakpoint.name.clone(),
            ResolvedSource {
                width: variant.width,
                height: variant.height,
                file: variant.file.clone(),
                attachment_id: effective.id,
            },
        );
    }

    resolution
}
