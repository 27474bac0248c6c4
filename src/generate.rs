//! Markup generation from resolved sources.
//!
//! Three output modes share one input: the [`ResolvedSources`] produced by
//! [`crate::resolve`] for a [`ResponsiveSet`].
//!
//! ## `<img>`
//!
//! ```html
//! <img class="attachment-hero size-hero wp-post-image" alt="Dawn"
//!      src="…/dawn-1200x600.jpg"
//!      srcset="…/dawn-2400x1200.jpg 2400w, …/dawn-1200x600.jpg 1200w, …"
//!      sizes="(min-width: 768px) 1200px, (max-width: 767px) 480px">
//! ```
//!
//! Each breakpoint with a `srcset` template contributes its retina variants
//! (as `<url> <width>w`) followed by its own entry. `src` ends up as the URL
//! of the last breakpoint processed, the single-resolution fallback for
//! browsers without `srcset`.
//!
//! ## `<picture>`
//!
//! One line per breakpoint with a `picture` template, wrapped in a
//! `<picture>` element carrying the class and caller attributes. Tokens:
//! `{src}` (comma-joined source list, retina entries suffixed with their
//! descriptor), `{single-src}`, `{alt}`, `{w}`.
//!
//! ## Backgrounds
//!
//! Background rules are not returned inline. They accumulate in a
//! [`BackgroundStyles`] registry keyed by media query, because many selectors
//! rendered across a page share the same buckets and must be flushed as one
//! stylesheet. The three primary buckets (no query, 1.5x, 2.5x) are always
//! flushed first so their precedence does not depend on render order.
//!
//! ## Escaping
//!
//! Attribute values are escaped once, at serialization, through maud's
//! escaper. Template tokens that land inside attribute values (`{src}`,
//! `{single-src}`, `{alt}`) are escaped before substitution.

use crate::attributes::{Attributes, clean_alt_text, escape_attr};
use crate::cache::MetadataCache;
use crate::image::RenderContext;
use crate::naming::{DprTier, retina_key};
use crate::template;
use crate::types::{
    Attachment, AttachmentMeta, Breakpoint, ResolvedSource, ResolvedSources, ResponsiveSet,
    RetinaOption, SizeVariant,
};

/// Used for a breakpoint without a `picture` template (or with an empty one)
/// when it is the only breakpoint that resolved.
const DEFAULT_PICTURE_TEMPLATE: &str = r#"<img srcset="{src}" alt="{alt}">"#;

const EOL: &str = "\n";

// ============================================================================
// <img>
// ============================================================================

/// Render a responsive `<img>` tag.
pub fn render_img(
    ctx: &mut RenderContext<'_>,
    attachment: &Attachment,
    sources: &ResolvedSources,
    set: &ResponsiveSet,
    attributes: Attributes,
) -> String {
    let mut attrs = default_attributes(ctx, attachment, set, "wp-post-image");
    attrs.merge_caller(attributes);

    let mut src = String::new();
    let mut srcset = Vec::new();
    let mut sizes = Vec::new();

    for (breakpoint, source) in breakpoints_with_source(set, sources) {
        let option = &breakpoint.option;
        let Some(srcset_template) = option.srcset.as_deref() else {
            continue;
        };
        let (base_url, meta) = source_location(ctx, source);

        for (_, variant) in retina_variants(&option.retina, &option.key, &meta) {
            if variant.width == 0 {
                continue;
            }
            srcset.push(format!("{}{} {}w", base_url, variant.file, variant.width));
        }

        let url = format!("{}{}", base_url, source.file);
        let width = source.width.to_string();
        let tokens = [("{src}", url.as_str()), ("{w}", width.as_str())];

        let entry_template = if srcset_template.contains("{src}") {
            srcset_template.to_string()
        } else {
            format!("{{src}} {srcset_template}")
        };
        srcset.push(template::fill(&entry_template, &tokens));
        if let Some(sizes_template) = option.sizes.as_deref() {
            sizes.push(template::fill(sizes_template, &tokens));
        }
        src = url;
    }

    attrs.insert("src", src);
    attrs.insert("srcset", srcset.join(", "));
    if !sizes.is_empty() {
        attrs.insert("sizes", sizes.join(", "));
    }

    let attrs = ctx.filters.apply(attrs, attachment, set.key());
    format!("<img{}>", attrs.to_html(&[]))
}

// ============================================================================
// <picture>
// ============================================================================

/// Render a `<picture>` element with one line per breakpoint.
pub fn render_picture(
    ctx: &mut RenderContext<'_>,
    attachment: &Attachment,
    sources: &ResolvedSources,
    set: &ResponsiveSet,
    attributes: Attributes,
) -> String {
    let mut attrs = default_attributes(ctx, attachment, set, "wp-post-picture");
    // Kept for filters written against <img>; never emitted.
    attrs.insert("src", "");
    attrs.merge_caller(attributes);

    let mut attrs = ctx.filters.apply(attrs, attachment, set.key());
    attrs.remove("src");
    let alt = escape_attr(attrs.get("alt").unwrap_or_default());

    let usable = breakpoints_with_source(set, sources).count();

    let mut html = format!("<picture{}>{EOL}", attrs.to_html(&["alt"]));
    for (breakpoint, source) in breakpoints_with_source(set, sources) {
        let option = &breakpoint.option;
        let picture_template = match option.picture.as_deref().filter(|t| !t.is_empty()) {
            Some(t) => t,
            None if usable == 1 => DEFAULT_PICTURE_TEMPLATE,
            None => continue,
        };
        let (base_url, meta) = source_location(ctx, source);

        let primary = format!("{}{}", base_url, source.file);
        let mut src_list = vec![primary.clone()];
        for (retina, variant) in retina_variants(&option.retina, &option.key, &meta) {
            src_list.push(format!("{}{} {}", base_url, variant.file, retina.descriptor));
        }

        let src = escape_attr(&src_list.join(", "));
        let single_src = escape_attr(&primary);
        let width = source.width.to_string();
        let tokens = [
            ("{src}", src.as_str()),
            ("{alt}", alt.as_str()),
            ("{w}", width.as_str()),
            ("{single-src}", single_src.as_str()),
        ];
        html.push_str(&template::fill(picture_template, &tokens));
        html.push_str(EOL);
    }
    html.push_str("</picture>");
    html
}

// ============================================================================
// Backgrounds
// ============================================================================

/// Register background rules for `selector` in the context's style registry.
pub fn render_background(
    ctx: &mut RenderContext<'_>,
    selector: &str,
    sources: &ResolvedSources,
    set: &ResponsiveSet,
) {
    let mut breakpoints: Vec<_> = breakpoints_with_source(set, sources).collect();
    if set.is_mobile_first() {
        breakpoints.reverse();
    }

    for (breakpoint, source) in breakpoints {
        let option = &breakpoint.option;
        let Some(bg_template) = option.bg.as_deref() else {
            continue;
        };
        let (base_url, meta) = source_location(ctx, source);

        let width = source.width.to_string();
        let media = template::fill(bg_template, &[("{w}", width.as_str())]);
        let url = format!("{}{}", base_url, source.file);
        ctx.styles
            .register(&media, selector, background_rule(selector, &url));

        let Some(retina_template) = option.bg_retina.as_deref() else {
            continue;
        };
        for (retina, variant) in retina_variants(&option.retina, &option.key, &meta) {
            let tier = DprTier::for_multiplier(retina.multiplier);
            let dpr = tier.dpr_condition();
            let min_res = tier.min_res_condition();
            let media = template::fill(
                retina_template,
                &[("{dpr}", dpr.as_str()), ("{min_res}", min_res.as_str())],
            );
            let url = format!("{}{}", base_url, variant.file);
            ctx.styles
                .register(&media, selector, background_rule(selector, &url));
        }
    }
}

fn background_rule(selector: &str, url: &str) -> String {
    format!("{selector}{{background-image:url('{url}');}}")
}

/// Rules for one media query, in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBucket {
    media: String,
    rules: Vec<(String, String)>,
}

impl MediaBucket {
    /// The media query; empty for rules outside any query.
    pub fn media(&self) -> &str {
        &self.media
    }

    pub fn rules(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(_, rule)| rule.as_str())
    }

    pub fn rule(&self, selector: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(_, rule)| rule.as_str())
    }
}

/// Background rules accumulated over a page build, bucketed by media query.
///
/// Owned by the [`RenderContext`]; flush it with [`to_css`](Self::to_css)
/// and reset it with [`take`](Self::take) at the end of the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackgroundStyles {
    buckets: Vec<MediaBucket>,
}

impl BackgroundStyles {
    pub fn new() -> Self {
        Self::default()
    }

    /// The buckets always flushed first, in this order: no media query, the
    /// 1.5x tier, the 2.5x tier.
    pub fn primary_media_queries() -> [String; 3] {
        [
            String::new(),
            DprTier::Retina.media_query(),
            DprTier::HighDensity.media_query(),
        ]
    }

    /// Store `rule` for `selector` under `media`. A second rule for the same
    /// selector in the same bucket replaces the first.
    pub fn register(&mut self, media: &str, selector: &str, rule: String) {
        let index = match self.buckets.iter().position(|b| b.media == media) {
            Some(index) => index,
            None => {
                self.buckets.push(MediaBucket {
                    media: media.to_string(),
                    rules: Vec::new(),
                });
                self.buckets.len() - 1
            }
        };
        let rules = &mut self.buckets[index].rules;
        match rules.iter_mut().find(|(s, _)| s == selector) {
            Some(entry) => entry.1 = rule,
            None => rules.push((selector.to_string(), rule)),
        }
    }

    pub fn bucket(&self, media: &str) -> Option<&MediaBucket> {
        self.buckets.iter().find(|b| b.media == media)
    }

    pub fn rule(&self, media: &str, selector: &str) -> Option<&str> {
        self.bucket(media).and_then(|b| b.rule(selector))
    }

    /// Buckets in flush order: present primary buckets first, then the rest
    /// in insertion order.
    pub fn ordered(&self) -> Vec<&MediaBucket> {
        let primaries = Self::primary_media_queries();
        let mut ordered: Vec<&MediaBucket> =
            primaries.iter().filter_map(|media| self.bucket(media)).collect();
        ordered.extend(
            self.buckets
                .iter()
                .filter(|b| !primaries.contains(&b.media)),
        );
        ordered
    }

    /// Serialize all buckets as one stylesheet.
    pub fn to_css(&self) -> String {
        let mut css = String::new();
        for bucket in self.ordered() {
            let wrapped = !bucket.media.is_empty();
            if wrapped {
                css.push_str(&bucket.media);
                css.push('{');
                css.push_str(EOL);
            }
            for rule in bucket.rules() {
                css.push_str(rule);
                css.push_str(EOL);
            }
            if wrapped {
                css.push('}');
                css.push_str(EOL);
            }
        }
        css
    }

    /// Return the accumulated styles and reset the registry.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

// ============================================================================
// SVG
// ============================================================================

/// Render a plain `<img>` for a vector upload. No breakpoints: the original
/// file scales, so only `width`/`height` from the set are applied.
pub fn render_svg(
    ctx: &mut RenderContext<'_>,
    attachment: &Attachment,
    set: Option<&ResponsiveSet>,
    attributes: Attributes,
) -> String {
    let mut attrs = attributes;
    attrs.insert(
        "src",
        MetadataCache::attachment_url(ctx.library, &ctx.request, attachment),
    );
    attrs.insert("alt", clean_alt_text(&ctx.library.alt_text(attachment.id)));
    if let Some(dimensions) = set.and_then(ResponsiveSet::primary_dimensions) {
        attrs.insert("width", dimensions.width.to_string());
        attrs.insert("height", dimensions.height.to_string());
    }

    let set_key = set.map_or("", ResponsiveSet::key);
    let attrs = ctx.filters.apply(attrs, attachment, set_key);
    format!("<img{}>", attrs.to_html(&[]))
}

// ============================================================================
// Shared helpers
// ============================================================================

/// `class` and `alt` every responsive tag starts from.
fn default_attributes(
    ctx: &RenderContext<'_>,
    attachment: &Attachment,
    set: &ResponsiveSet,
    kind_class: &str,
) -> Attributes {
    let key = set.key();
    Attributes::new()
        .with("class", format!("attachment-{key} size-{key} {kind_class}"))
        .with("alt", clean_alt_text(&ctx.library.alt_text(attachment.id)))
}

/// Breakpoints in set order, paired with their resolved source.
fn breakpoints_with_source<'a>(
    set: &'a ResponsiveSet,
    sources: &'a ResolvedSources,
) -> impl Iterator<Item = (&'a Breakpoint, &'a ResolvedSource)> {
    set.breakpoints()
        .iter()
        .filter_map(move |b| sources.get(&b.name).map(|s| (b, s)))
}

/// Base URL and metadata of the attachment a source belongs to.
fn source_location(ctx: &mut RenderContext<'_>, source: &ResolvedSource) -> (String, AttachmentMeta) {
    let base_url = ctx
        .cache
        .base_url(ctx.library, &ctx.request, source.attachment_id);
    let meta = ctx
        .cache
        .metadata(ctx.library, source.attachment_id)
        .unwrap_or_default();
    (base_url, meta)
}

/// Retina renditions of `size_key` that actually exist in `meta`.
fn retina_variants<'a>(
    retina: &'a [RetinaOption],
    size_key: &str,
    meta: &'a AttachmentMeta,
) -> Vec<(&'a RetinaOption, &'a SizeVariant)> {
    retina
        .iter()
        .filter_map(|r| {
            meta.sizes
                .get(&retina_key(size_key, &r.descriptor))
                .map(|variant| (r, variant))
        })
        .collect()
}
