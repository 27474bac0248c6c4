//! Per-request orchestration: one [`RwdImage`] per attachment being placed
//! on a page, sharing one [`RenderContext`] for the whole page build.
//!
//! ```text
//! RwdImage::new(ctx, attachment)      load attachment (id, loaded, featured)
//!   .img(size, attrs)                 select set → resolve → render_img
//!   .picture(size, attrs)             select set → resolve → render_picture
//!   .background(selector, size)       select set → resolve → styles registry
//! ```
//!
//! Every call returns a string and never fails. Problems are collected as
//! warnings on the instance and prepended to each call's output as HTML
//! comments, so a broken image shows up in the page source without breaking
//! the page.

use crate::attributes::{AttributeFilters, Attributes};
use crate::cache::MetadataCache;
use crate::generate::{self, BackgroundStyles};
use crate::media::{MediaLibrary, RequestInfo};
use crate::resolve::resolve_sources;
use crate::types::{Attachment, AttachmentId, ResolvedSources, ResponsiveSet, SetRegistry};
use std::collections::BTreeMap;

/// State shared by every render of one page build.
///
/// Owns the metadata cache, the attribute filters, and the background
/// styles registry. Flush the styles with [`take_styles`](Self::take_styles)
/// when the page is done.
pub struct RenderContext<'a> {
    pub(crate) library: &'a dyn MediaLibrary,
    pub(crate) sets: &'a SetRegistry,
    pub(crate) request: RequestInfo,
    pub(crate) cache: MetadataCache,
    pub(crate) filters: AttributeFilters,
    pub(crate) styles: BackgroundStyles,
}

impl<'a> RenderContext<'a> {
    pub fn new(library: &'a dyn MediaLibrary, sets: &'a SetRegistry) -> Self {
        Self {
            library,
            sets,
            request: RequestInfo::default(),
            cache: MetadataCache::new(),
            filters: AttributeFilters::new(),
            styles: BackgroundStyles::new(),
        }
    }

    pub fn with_request(mut self, request: RequestInfo) -> Self {
        self.request = request;
        self
    }

    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    pub fn sets(&self) -> &SetRegistry {
        self.sets
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    pub fn filters_mut(&mut self) -> &mut AttributeFilters {
        &mut self.filters
    }

    pub fn styles(&self) -> &BackgroundStyles {
        &self.styles
    }

    /// Hand over the accumulated background rules and start a fresh registry.
    pub fn take_styles(&mut self) -> BackgroundStyles {
        self.styles.take()
    }

    /// Resolve an attachment reference against the library.
    pub fn load(&self, attachment: AttachmentRef) -> Option<Attachment> {
        let id = match attachment {
            AttachmentRef::Loaded(attachment) => return Some(attachment),
            AttachmentRef::Id(id) => id,
            AttachmentRef::Featured => {
                let page_id = self.request.page_id?;
                self.library.featured_attachment_id(page_id)?
            }
        };
        self.library.load_attachment(id)
    }
}

/// How the caller names the attachment to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentRef {
    Id(AttachmentId),
    Loaded(Attachment),
    /// The featured image of the current page.
    Featured,
}

impl From<AttachmentId> for AttachmentRef {
    fn from(id: AttachmentId) -> Self {
        AttachmentRef::Id(id)
    }
}

impl From<Attachment> for AttachmentRef {
    fn from(attachment: Attachment) -> Self {
        AttachmentRef::Loaded(attachment)
    }
}

impl From<Option<AttachmentId>> for AttachmentRef {
    fn from(id: Option<AttachmentId>) -> Self {
        id.map_or(AttachmentRef::Featured, AttachmentRef::Id)
    }
}

/// A set key plus optional per-breakpoint attachment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeRequest {
    pub key: String,
    /// Breakpoint name → replacement attachment.
    pub rewrites: BTreeMap<String, AttachmentRef>,
}

impl SizeRequest {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            rewrites: BTreeMap::new(),
        }
    }

    /// Serve `breakpoint` from a different attachment.
    pub fn rewrite(mut self, breakpoint: impl Into<String>, attachment: impl Into<AttachmentRef>) -> Self {
        self.rewrites.insert(breakpoint.into(), attachment.into());
        self
    }
}

impl From<&str> for SizeRequest {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for SizeRequest {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// Responsive markup for one attachment.
pub struct RwdImage<'c, 'a> {
    ctx: &'c mut RenderContext<'a>,
    attachment: Option<Attachment>,
    warnings: Vec<String>,
}

impl<'c, 'a> RwdImage<'c, 'a> {
    /// Load the attachment. An unresolvable reference leaves the instance
    /// empty: every render call then returns an empty string.
    pub fn new(ctx: &'c mut RenderContext<'a>, attachment: impl Into<AttachmentRef>) -> Self {
        let reference = attachment.into();
        let attachment = ctx.load(reference.clone());
        if attachment.is_none() {
            tracing::debug!(?reference, "attachment not found");
        }
        Self {
            ctx,
            attachment,
            warnings: Vec::new(),
        }
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Every warning recorded by this instance so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Responsive `<img>` tag, preceded by the warnings comment.
    pub fn img(&mut self, size: impl Into<SizeRequest>, attributes: Attributes) -> String {
        let Some(attachment) = self.attachment.clone() else {
            return String::new();
        };
        let size = size.into();
        if attachment.is_svg() {
            return self.svg(&attachment, &size.key, attributes);
        }

        let html = match self.prepare(&attachment, size) {
            Some((set, sources)) => {
                generate::render_img(self.ctx, &attachment, &sources, set, attributes)
            }
            None => String::new(),
        };
        self.with_warnings(html)
    }

    /// `<picture>` element, preceded by the warnings comment.
    pub fn picture(&mut self, size: impl Into<SizeRequest>, attributes: Attributes) -> String {
        let Some(attachment) = self.attachment.clone() else {
            return String::new();
        };
        let size = size.into();
        if attachment.is_svg() {
            return self.svg(&attachment, &size.key, attributes);
        }

        let html = match self.prepare(&attachment, size) {
            Some((set, sources)) => {
                generate::render_picture(self.ctx, &attachment, &sources, set, attributes)
            }
            None => String::new(),
        };
        self.with_warnings(html)
    }

    /// Register background rules for `selector`. Returns only the warnings
    /// comment; the rules land in the context's [`BackgroundStyles`].
    pub fn background(&mut self, selector: &str, size: impl Into<SizeRequest>) -> String {
        let Some(attachment) = self.attachment.clone() else {
            return String::new();
        };
        if let Some((set, sources)) = self.prepare(&attachment, size.into()) {
            generate::render_background(self.ctx, selector, &sources, set);
        }
        self.warnings_comment()
    }

    fn svg(&mut self, attachment: &Attachment, size_key: &str, attributes: Attributes) -> String {
        let set = self.select_set(size_key);
        let html = generate::render_svg(self.ctx, attachment, set, attributes);
        self.with_warnings(html)
    }

    /// Select the set and resolve its sources. `None` when the set is unknown
    /// or nothing resolved.
    fn prepare(
        &mut self,
        attachment: &Attachment,
        size: SizeRequest,
    ) -> Option<(&'a ResponsiveSet, ResolvedSources)> {
        let set = self.select_set(&size.key)?;
        let rewrites: BTreeMap<String, Attachment> = size
            .rewrites
            .into_iter()
            .filter_map(|(breakpoint, reference)| {
                self.ctx.load(reference).map(|a| (breakpoint, a))
            })
            .collect();

        let resolution =
            resolve_sources(self.ctx.library, &mut self.ctx.cache, attachment, set, &rewrites);
        self.warnings.extend(resolution.warnings);
        (!resolution.sources.is_empty()).then_some((set, resolution.sources))
    }

    fn select_set(&mut self, key: &str) -> Option<&'a ResponsiveSet> {
        let sets: &'a SetRegistry = self.ctx.sets;
        let set = sets.get(key);
        if set.is_none() {
            tracing::debug!(size = key, "unknown image size");
            self.warnings.push(format!(
                "Unknown image size \"{}\"",
                crate::attributes::escape_attr(key)
            ));
        }
        set
    }

    fn with_warnings(&self, html: String) -> String {
        self.warnings_comment() + &html
    }

    fn warnings_comment(&self) -> String {
        if self.warnings.is_empty() {
            return String::new();
        }
        format!("<!-- {}-->\n", self.warnings.join("-->\n<!--"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use crate::types::{Breakpoint, SizeOption};

    fn registry() -> SetRegistry {
        [hero_set(), small_and_large_set_named("cards")].into_iter().collect()
    }

    // =========================================================================
    // Attachment loading
    // =========================================================================

    #[test]
    fn loads_attachment_by_id() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let image = RwdImage::new(&mut ctx, 10);
        assert_eq!(image.attachment().map(|a| a.id), Some(10));
    }

    #[test]
    fn featured_uses_current_page() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets).with_request(RequestInfo {
            page_id: Some(5),
            ..RequestInfo::default()
        });
        let image = RwdImage::new(&mut ctx, None::<AttachmentId>);
        assert_eq!(image.attachment().map(|a| a.id), Some(10));
    }

    #[test]
    fn featured_without_page_is_empty() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let image = RwdImage::new(&mut ctx, AttachmentRef::Featured);
        assert!(image.attachment().is_none());
    }

    #[test]
    fn missing_attachment_renders_nothing() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let mut image = RwdImage::new(&mut ctx, 999);

        assert_eq!(image.img("hero", Attributes::new()), "");
        assert_eq!(image.picture("nope", Attributes::new()), "");
        assert_eq!(image.background(".hero", "hero"), "");
        assert!(image.warnings().is_empty());
    }

    #[test]
    fn preloaded_attachment_is_used_as_is() {
        let library = sample_library();
        let sets = registry();
        let attachment = library.load_attachment(11).unwrap();
        let mut ctx = RenderContext::new(&library, &sets);
        let image = RwdImage::new(&mut ctx, attachment.clone());
        assert_eq!(image.attachment(), Some(&attachment));
    }

    // =========================================================================
    // Warnings
    // =========================================================================

    #[test]
    fn unknown_size_returns_warning_comment_only() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let mut image = RwdImage::new(&mut ctx, 10);

        assert_eq!(
            image.img("gallery", Attributes::new()),
            "<!-- Unknown image size \"gallery\"-->\n"
        );
    }

    #[test]
    fn missing_variant_comment_precedes_tag() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let mut image = RwdImage::new(&mut ctx, 10);

        let html = image.img("cards", Attributes::new());
        assert!(html.starts_with("<!-- Attachment 10: missing image size \"cards:lg\"-->\n<img "));
    }

    #[test]
    fn warnings_accumulate_across_calls() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let mut image = RwdImage::new(&mut ctx, 10);

        image.img("gallery", Attributes::new());
        let html = image.picture("thumbs", Attributes::new());

        assert_eq!(
            html,
            "<!-- Unknown image size \"gallery\"-->\n<!--Unknown image size \"thumbs\"-->\n"
        );
        assert_eq!(image.warnings().len(), 2);
    }

    #[test]
    fn unknown_size_is_escaped_in_comment() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let mut image = RwdImage::new(&mut ctx, 10);
        let html = image.img("<b>", Attributes::new());
        assert!(html.contains("&lt;b&gt;"));
    }

    #[test]
    fn nothing_resolved_emits_no_tag() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let mut image = RwdImage::new(&mut ctx, 40);

        let html = image.img("hero", Attributes::new());
        assert!(!html.contains("<img"));
        assert_eq!(html.matches("missing image size").count(), 2);
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn img_renders_without_warnings() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let mut image = RwdImage::new(&mut ctx, 10);

        let html = image.img("hero", Attributes::new());
        assert!(html.starts_with("<img class=\"attachment-hero size-hero wp-post-image\""));
        assert!(image.warnings().is_empty());
    }

    #[test]
    fn picture_renders_wrapper() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let mut image = RwdImage::new(&mut ctx, 10);

        let html = image.picture("hero", Attributes::new());
        assert!(html.starts_with("<picture class=\"attachment-hero size-hero wp-post-picture\">\n"));
        assert!(html.ends_with("</picture>"));
    }

    #[test]
    fn rewrite_serves_other_attachment_for_breakpoint() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let mut image = RwdImage::new(&mut ctx, 10);

        let html = image.img(SizeRequest::new("hero").rewrite("mobile", 11), Attributes::new());
        assert!(html.contains("http://example.com/uploads/2024/06/portrait-480x320.jpg 480w"));
        assert!(html.contains("http://example.com/uploads/2024/05/dawn-1200x600.jpg 1200w"));
    }

    #[test]
    fn rewrites_apply_to_one_call_only() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let mut image = RwdImage::new(&mut ctx, 10);

        image.img(SizeRequest::new("hero").rewrite("mobile", 11), Attributes::new());
        let html = image.img("hero", Attributes::new());
        assert!(!html.contains("portrait"));
    }

    #[test]
    fn unresolvable_rewrite_is_dropped() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let mut image = RwdImage::new(&mut ctx, 10);

        let html = image.img(SizeRequest::new("hero").rewrite("mobile", 999), Attributes::new());
        assert!(html.contains("dawn-480x320.jpg 480w"));
        assert!(image.warnings().is_empty());
    }

    #[test]
    fn background_fills_context_styles() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let comment = RwdImage::new(&mut ctx, 10).background(".hero", "hero");

        assert_eq!(comment, "");
        assert!(ctx.styles().rule("", ".hero").is_some());
        let styles = ctx.take_styles();
        assert!(!styles.is_empty());
        assert!(ctx.styles().is_empty());
    }

    #[test]
    fn background_returns_warnings_comment() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let comment = RwdImage::new(&mut ctx, 10).background(".cards", "cards");
        assert_eq!(comment, "<!-- Attachment 10: missing image size \"cards:lg\"-->\n");
    }

    #[test]
    fn images_share_the_context_cache() {
        let library = CountingLibrary::new(sample_library());
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);

        RwdImage::new(&mut ctx, 10).img("hero", Attributes::new());
        RwdImage::new(&mut ctx, 10).picture("hero", Attributes::new());
        RwdImage::new(&mut ctx, 10).background(".hero", "hero");

        assert_eq!(library.metadata_calls(), 1);
        assert_eq!(ctx.cache().len(), 1);
    }

    // =========================================================================
    // SVG
    // =========================================================================

    #[test]
    fn svg_bypasses_breakpoints() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let mut image = RwdImage::new(&mut ctx, 30);

        let html = image.picture("hero", Attributes::new());
        assert_eq!(
            html,
            r#"<img src="http://example.com/uploads/2024/05/logo.svg" alt="Logo" width="1200" height="600">"#
        );
    }

    #[test]
    fn svg_with_unknown_size_warns_and_omits_dimensions() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        let mut image = RwdImage::new(&mut ctx, 30);

        let html = image.img("gallery", Attributes::new());
        assert_eq!(
            html,
            concat!(
                "<!-- Unknown image size \"gallery\"-->\n",
                r#"<img src="http://example.com/uploads/2024/05/logo.svg" alt="Logo">"#
            )
        );
    }

    #[test]
    fn svg_filters_receive_set_key() {
        let library = sample_library();
        let sets = registry();
        let mut ctx = RenderContext::new(&library, &sets);
        ctx.filters_mut()
            .register(|attrs, _, set_key| attrs.with("data-set", set_key));
        let html = RwdImage::new(&mut ctx, 30).img("hero", Attributes::new());
        assert!(html.ends_with(r#" data-set="hero">"#));
    }

    #[test]
    fn svg_background_uses_synthesized_sources() {
        let library = sample_library();
        let sets: SetRegistry = [ResponsiveSet::new(
            "logo",
            vec![Breakpoint::new("all", SizeOption::new("logo", 200, 80).with_bg(""))],
        )]
        .into_iter()
        .collect();
        let mut ctx = RenderContext::new(&library, &sets);
        RwdImage::new(&mut ctx, 30).background(".logo", "logo");
        assert_eq!(
            ctx.styles().rule("", ".logo"),
            Some(".logo{background-image:url('http://example.com/uploads/2024/05/logo.svg');}")
        );
    }
}
