//! HTML attribute sets and the attribute filter hook.
//!
//! [`Attributes`] is an insertion-ordered map: generated tags list their
//! attributes in the order defaults, caller overrides, and generated
//! `src`/`srcset`/`sizes` were added. Replacing a key keeps its position.
//!
//! [`AttributeFilters`] is the extension point for host code that needs to
//! post-process the final attribute set (lazy-loading plugins, analytics
//! data attributes). Filters run in registration order and each receives the
//! previous filter's output.

use crate::types::Attachment;
use maud::html;
use std::fmt;

/// Insertion-ordered `name → value` map of HTML attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set `name`, replacing an existing value in place or appending.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Merge caller-supplied attributes over these defaults.
    ///
    /// Caller values win, except `class`: a non-empty caller class is
    /// appended to the default one.
    pub fn merge_caller(&mut self, caller: Attributes) {
        for (name, value) in caller.entries {
            if name == "class" {
                if value.is_empty() {
                    continue;
                }
                let merged = match self.get("class") {
                    Some(default) if !default.is_empty() => format!("{default} {value}"),
                    _ => value,
                };
                self.insert(name, merged);
            } else {
                self.insert(name, value);
            }
        }
    }

    /// Serialize as ` name="value"` pairs, values escaped for attribute
    /// context. Names listed in `skip` are left out.
    pub fn to_html(&self, skip: &[&str]) -> String {
        self.iter()
            .filter(|(name, _)| !skip.contains(name))
            .map(|(name, value)| format!(" {}=\"{}\"", name, escape_attr(value)))
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (name, value) in iter {
            attrs.insert(name, value);
        }
        attrs
    }
}

/// Escape a value for a double-quoted HTML attribute.
pub fn escape_attr(value: &str) -> String {
    html! { (value) }.into_string()
}

/// Alt text as stored may carry markup; strip tags and surrounding space.
pub fn clean_alt_text(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len());
    let mut in_tag = false;
    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result.trim().to_string()
}

type FilterFn = Box<dyn Fn(Attributes, &Attachment, &str) -> Attributes>;

/// Registered attribute post-processors.
#[derive(Default)]
pub struct AttributeFilters {
    filters: Vec<FilterFn>,
}

impl AttributeFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter. It receives the attribute set, the attachment being
    /// rendered, and the responsive set key (empty when unknown).
    pub fn register<F>(&mut self, filter: F)
    where
        F: Fn(Attributes, &Attachment, &str) -> Attributes + 'static,
    {
        self.filters.push(Box::new(filter));
    }

    /// Run every filter in registration order.
    pub fn apply(&self, attrs: Attributes, attachment: &Attachment, set_key: &str) -> Attributes {
        self.filters
            .iter()
            .fold(attrs, |attrs, filter| filter(attrs, attachment, set_key))
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for AttributeFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeFilters")
            .field("len", &self.filters.len())
            .finish()
    }
}
