//! Token substitution for breakpoint templates.
//!
//! Templates are plain strings with `{token}` placeholders (`{src}`, `{alt}`,
//! `{w}`, `{single-src}`, `{dpr}`, `{min_res}`). Substitution is a single
//! left-to-right pass: at each position the longest matching token wins, and
//! replaced text is never scanned again. A value containing `{w}` therefore
//! stays literal.

/// Replace every occurrence of each token in `template` with its value.
///
/// Unknown `{...}` sequences are left untouched.
pub fn fill(template: &str, tokens: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(ch) = rest.chars().next() {
        let hit = tokens
            .iter()
            .filter(|(token, _)| !token.is_empty() && rest.starts_with(token))
            .max_by_key(|(token, _)| token.len());

        match hit {
            Some((token, value)) => {
                out.push_str(value);
                rest = &rest[token.len()..];
            }
            None => {
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }

    out
}
