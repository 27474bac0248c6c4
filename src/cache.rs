//! Request-scoped metadata and base-URL cache.
//!
//! A page typically renders the same attachment several times (an `<img>`
//! in the content, a background in the header, a `<picture>` in a card).
//! Each render walks every breakpoint and asks for the attachment's metadata
//! and base URL, so both lookups are memoized per attachment id for the
//! lifetime of one [`MetadataCache`].
//!
//! # Design
//!
//! - **Explicit owner**: the cache is a plain value owned by the
//!   [`RenderContext`](crate::image::RenderContext) of one page build. There
//!   is no global state; dropping the context drops the cache.
//! - **Write-through synthesis**: [`crate::resolve`] writes synthesized
//!   entries (SVG sizes, upscale fallbacks) back with
//!   [`MetadataCache::set_metadata`], so later lookups in the same request
//!   see them. Writes overwrite, so repeating a synthesis is harmless.
//! - **No invalidation**: once populated, an entry is treated as immutable
//!   until the cache is dropped.
//!
//! ## Base URLs
//!
//! An attachment's base URL is the upload base URL joined with the directory
//! of its stored file (`2024/05/dawn.jpg` → `<base>/2024/05/`). On a secure
//! request the scheme is upgraded to `https`, but only when the URL's host
//! is the request host: a different host (a CDN, a legacy domain) may not
//! serve HTTPS at all.

use crate::media::{MediaLibrary, RequestInfo, UploadDir};
use crate::types::{Attachment, AttachmentId, AttachmentMeta};
use std::collections::HashMap;
use url::Url;

/// Memoized metadata and base URLs, keyed by attachment id.
#[derive(Debug, Clone, Default)]
pub struct MetadataCache {
    metadata: HashMap<AttachmentId, Option<AttachmentMeta>>,
    base_urls: HashMap<AttachmentId, String>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for `id`, fetched from the library on first access.
    ///
    /// A library miss is cached as well: `None` stays `None` until
    /// [`set_metadata`](Self::set_metadata) replaces it.
    pub fn metadata(
        &mut self,
        library: &dyn MediaLibrary,
        id: AttachmentId,
    ) -> Option<AttachmentMeta> {
        self.metadata
            .entry(id)
            .or_insert_with(|| {
                tracing::debug!(attachment = id, "metadata cache miss");
                library.attachment_metadata(id)
            })
            .clone()
    }

    /// Replace the cached metadata for `id`.
    pub fn set_metadata(&mut self, id: AttachmentId, meta: AttachmentMeta) {
        self.metadata.insert(id, Some(meta));
    }

    /// Base URL (with trailing slash) that an attachment's file names are
    /// appended to.
    pub fn base_url(
        &mut self,
        library: &dyn MediaLibrary,
        request: &RequestInfo,
        id: AttachmentId,
    ) -> String {
        if let Some(url) = self.base_urls.get(&id) {
            return url.clone();
        }

        let file = self.metadata(library, id).map(|m| m.file).unwrap_or_default();
        let upload = library.upload_dir();
        let base = format!("{}{}", upload_base(&upload), relative_dir(&file));
        let url = upgrade_scheme(base, request);

        tracing::debug!(attachment = id, base_url = %url, "base url cache miss");
        self.base_urls.insert(id, url.clone());
        url
    }

    /// Full URL of an attachment's original file. Not memoized.
    pub fn attachment_url(
        library: &dyn MediaLibrary,
        request: &RequestInfo,
        attachment: &Attachment,
    ) -> String {
        let upload = library.upload_dir();
        let relative = upload.relative_path(&attachment.file);
        upgrade_scheme(format!("{}{}", upload_base(&upload), relative), request)
    }

    /// Number of attachments with cached metadata (including cached misses).
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}

/// Upload base URL with exactly one trailing slash.
fn upload_base(upload: &UploadDir) -> String {
    format!("{}/", upload.base_url.trim_end_matches('/'))
}

/// Directory part of a stored relative file, with trailing slash, or empty.
pub(crate) fn relative_dir(file: &str) -> String {
    match file.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => format!("{dir}/"),
        _ => String::new(),
    }
}

/// Last path segment of a stored relative file.
pub(crate) fn basename(file: &str) -> &str {
    file.rsplit('/').next().unwrap_or(file)
}

/// Switch `url` to `https` when the request is secure and the URL points at
/// the request host. Anything unparsable is returned as is.
fn upgrade_scheme(url: String, request: &RequestInfo) -> String {
    if !request.secure || url.starts_with("https") {
        return url;
    }
    let Some(request_host) = request.host.as_deref() else {
        return url;
    };
    let Ok(mut parsed) = Url::parse(&url) else {
        return url;
    };

    let authority = match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => return url,
    };
    if !authority.eq_ignore_ascii_case(request_host) {
        return url;
    }

    match parsed.set_scheme("https") {
        Ok(()) => parsed.into(),
        Err(()) => url,
    }
}
