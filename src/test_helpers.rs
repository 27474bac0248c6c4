//! Shared test utilities for the rwd-images test suite.
//!
//! Provides an in-memory media library with a handful of attachments that
//! cover the interesting cases, the responsive sets the tests render them
//! with, and a library wrapper that counts collaborator calls.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let library = sample_library();
//! let sets: SetRegistry = [hero_set()].into_iter().collect();
//! let mut ctx = RenderContext::new(&library, &sets);
//!
//! let html = RwdImage::new(&mut ctx, 10).img("hero", Attributes::new());
//! ```
//!
//! # Attachments in `sample_library()`
//!
//! | Id | Kind | Metadata |
//! |----|------|----------|
//! | 10 | 2400×1600 JPEG | `hero`, `hero@2x`, `hero-sm`, `hero-sm@2x` |
//! | 11 | 1000×1500 JPEG | `hero-sm` only |
//! | 30 | SVG | none |
//! | 40 | JPEG | none |
//!
//! Page 5 has attachment 10 as its featured image.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::media::{JsonLibrary, MediaLibrary, StoredAttachment, UploadDir};
use crate::types::{
    Attachment, AttachmentId, AttachmentMeta, Breakpoint, ResponsiveSet, SizeOption, SizeVariant,
};

// =========================================================================
// Library fixtures
// =========================================================================

pub fn upload_dir() -> UploadDir {
    UploadDir {
        base_path: PathBuf::from("/srv/uploads"),
        base_url: "http://example.com/uploads".to_string(),
    }
}

pub fn variant(width: u32, height: u32, file: &str) -> SizeVariant {
    SizeVariant {
        width,
        height,
        file: file.to_string(),
    }
}

/// Metadata for an original stored at `file` (relative to the upload base).
pub fn meta(width: u32, height: u32, file: &str, sizes: &[(&str, SizeVariant)]) -> AttachmentMeta {
    AttachmentMeta {
        width,
        height,
        file: file.to_string(),
        sizes: sizes
            .iter()
            .map(|(key, v)| (key.to_string(), v.clone()))
            .collect::<BTreeMap<_, _>>(),
    }
}

pub fn stored(
    id: AttachmentId,
    mime_type: &str,
    file: &str,
    alt: &str,
    metadata: Option<AttachmentMeta>,
) -> StoredAttachment {
    StoredAttachment {
        id,
        mime_type: mime_type.to_string(),
        file: Path::new("/srv/uploads").join(file),
        alt: alt.to_string(),
        metadata,
    }
}

pub fn sample_library() -> JsonLibrary {
    JsonLibrary::new(upload_dir())
        .with_attachment(stored(
            10,
            "image/jpeg",
            "2024/05/dawn.jpg",
            "<em>Dawn</em> over the lake",
            Some(meta(
                2400,
                1600,
                "2024/05/dawn.jpg",
                &[
                    ("hero", variant(1200, 600, "dawn-1200x600.jpg")),
                    ("hero@2x", variant(2400, 1200, "dawn-2400x1200.jpg")),
                    ("hero-sm", variant(480, 320, "dawn-480x320.jpg")),
                    ("hero-sm@2x", variant(960, 640, "dawn-960x640.jpg")),
                ],
            )),
        ))
        .with_attachment(stored(
            11,
            "image/jpeg",
            "2024/06/portrait.jpg",
            "Portrait",
            Some(meta(
                1000,
                1500,
                "2024/06/portrait.jpg",
                &[("hero-sm", variant(480, 320, "portrait-480x320.jpg"))],
            )),
        ))
        .with_attachment(stored(30, "image/svg+xml", "2024/05/logo.svg", "Logo", None))
        .with_attachment(stored(40, "image/jpeg", "broken.jpg", "", None))
        .with_featured(5, 10)
}

/// One 1200px-wide upload with only its `hero-lg` variant generated.
pub fn only_large_variant_library() -> JsonLibrary {
    JsonLibrary::new(upload_dir()).with_attachment(stored(
        20,
        "image/jpeg",
        "2024/07/hero.jpg",
        "",
        Some(meta(
            1200,
            600,
            "2024/07/hero.jpg",
            &[("hero-lg", variant(1200, 600, "hero-1200x600.jpg"))],
        )),
    ))
}

// =========================================================================
// Set fixtures
// =========================================================================

/// Desktop-first `hero` set: `desktop` (`hero`, 1200×600, 2x) then
/// `mobile` (`hero-sm`, 480×320, 2x and 3x). Every output mode enabled.
pub fn hero_set() -> ResponsiveSet {
    ResponsiveSet::new(
        "hero",
        vec![
            Breakpoint::new(
                "desktop",
                SizeOption::new("hero", 1200, 600)
                    .with_srcset("{w}w")
                    .with_sizes("(min-width: 768px) 1200px")
                    .with_picture(r#"<source srcset="{src}" media="(min-width: 768px)">"#)
                    .with_bg("")
                    .with_bg_retina("@media {dpr}, {min_res}")
                    .with_retina("2x", 2.0),
            ),
            Breakpoint::new(
                "mobile",
                SizeOption::new("hero-sm", 480, 320)
                    .with_srcset("{w}w")
                    .with_sizes("(max-width: 767px) 480px")
                    .with_picture(r#"<img srcset="{src}" alt="{alt}" width="{w}">"#)
                    .with_bg("@media (max-width: 767px)")
                    .with_bg_retina(
                        "@media (max-width: 767px) and {dpr}, (max-width: 767px) and {min_res}",
                    )
                    .with_retina("2x", 2.0)
                    .with_retina("3x", 3.0),
            ),
        ],
    )
}

/// `sm` (`hero-sm`, 400px) and `lg` (`hero-lg`, 1200px), srcset only.
pub fn small_and_large_set() -> ResponsiveSet {
    small_and_large_set_named("hero")
}

pub fn small_and_large_set_named(key: &str) -> ResponsiveSet {
    ResponsiveSet::new(
        key,
        vec![
            Breakpoint::new(
                "sm",
                SizeOption::new("hero-sm", 400, 200).with_srcset("{src} {w}w"),
            ),
            Breakpoint::new(
                "lg",
                SizeOption::new("hero-lg", 1200, 600).with_srcset("{src} {w}w"),
            ),
        ],
    )
}

// =========================================================================
// Lookups (panic with a clear message on miss)
// =========================================================================

/// Find a breakpoint by name. Panics if not found.
pub fn find_breakpoint<'a>(set: &'a ResponsiveSet, name: &str) -> &'a Breakpoint {
    set.breakpoint(name).unwrap_or_else(|| {
        let names: Vec<&str> = set.breakpoints().iter().map(|b| b.name.as_str()).collect();
        panic!("breakpoint '{name}' not found in set '{}'. Available: {names:?}", set.key())
    })
}

// =========================================================================
// Call counting
// =========================================================================

/// Wraps a library and counts metadata lookups.
pub struct CountingLibrary {
    inner: JsonLibrary,
    metadata_calls: Cell<usize>,
}

impl CountingLibrary {
    pub fn new(inner: JsonLibrary) -> Self {
        Self {
            inner,
            metadata_calls: Cell::new(0),
        }
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.get()
    }
}

impl MediaLibrary for CountingLibrary {
    fn load_attachment(&self, id: AttachmentId) -> Option<Attachment> {
        self.inner.load_attachment(id)
    }

    fn attachment_metadata(&self, id: AttachmentId) -> Option<AttachmentMeta> {
        self.metadata_calls.set(self.metadata_calls.get() + 1);
        self.inner.attachment_metadata(id)
    }

    fn upload_dir(&self) -> UploadDir {
        self.inner.upload_dir()
    }

    fn alt_text(&self, id: AttachmentId) -> String {
        self.inner.alt_text(id)
    }

    fn featured_attachment_id(&self, page_id: u64) -> Option<AttachmentId> {
        self.inner.featured_attachment_id(page_id)
    }
}
