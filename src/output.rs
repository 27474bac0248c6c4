//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Sets are listed by identity (positional index + key), with the media
//! library variant and enabled output modes as indented context lines. The
//! output reads as an inventory of what each set will render.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Sets
//! 001 card (2 breakpoints)
//!     001 small → card-sm 360x240
//!         Modes: srcset, bg
//!     002 large → card 720x480
//!         Modes: srcset, bg, bg_retina
//!         Retina: 2x
//!
//! 1 set, 2 breakpoints
//! ```
//!
//! ## Background
//!
//! ```text
//! <style>
//! .hero{background-image:url('…/dawn-1200x600.jpg');}
//! @media (max-width: 767px){
//! .hero{background-image:url('…/dawn-480x320.jpg');}
//! }
//! </style>
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions do not
//! perform I/O.

use crate::generate::BackgroundStyles;
use crate::types::{Breakpoint, ResponsiveSet, SetRegistry};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

/// ```text
/// 001 hero (2 breakpoints)
/// ```
fn set_header(index: usize, set: &ResponsiveSet) -> String {
    format!(
        "{} {} ({})",
        format_index(index),
        set.key(),
        plural(set.breakpoints().len(), "breakpoint", "breakpoints")
    )
}

/// ```text
/// 001 desktop → hero 1200x600
/// ```
fn breakpoint_line(index: usize, breakpoint: &Breakpoint) -> String {
    let option = &breakpoint.option;
    format!(
        "{} {} → {} {}x{}",
        format_index(index),
        breakpoint.name,
        option.key,
        option.size.width,
        option.size.height
    )
}

// ============================================================================
// Check
// ============================================================================

/// Summary of every registered set, sorted by key.
pub fn format_registry(registry: &SetRegistry) -> Vec<String> {
    let mut lines = vec!["Sets".to_string()];
    let mut breakpoint_count = 0;

    for (set_index, set) in registry.sorted().into_iter().enumerate() {
        lines.push(set_header(set_index + 1, set));
        for (bp_index, breakpoint) in set.breakpoints().iter().enumerate() {
            breakpoint_count += 1;
            lines.push(format!(
                "{}{}",
                indent(1),
                breakpoint_line(bp_index + 1, breakpoint)
            ));

            let modes = breakpoint.option.enabled_modes();
            let modes = if modes.is_empty() {
                "none".to_string()
            } else {
                modes.join(", ")
            };
            lines.push(format!("{}Modes: {}", indent(2), modes));

            if !breakpoint.option.retina.is_empty() {
                let descriptors: Vec<&str> = breakpoint
                    .option
                    .retina
                    .iter()
                    .map(|r| r.descriptor.as_str())
                    .collect();
                lines.push(format!("{}Retina: {}", indent(2), descriptors.join(", ")));
            }
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "{}, {}",
        plural(registry.len(), "set", "sets"),
        plural(breakpoint_count, "breakpoint", "breakpoints")
    ));
    lines
}

pub fn print_registry(registry: &SetRegistry) {
    for line in format_registry(registry) {
        println!("{}", line);
    }
}

// ============================================================================
// Background
// ============================================================================

/// The flushed stylesheet wrapped in a `<style>` element. Empty when no
/// rules were registered.
pub fn format_stylesheet(styles: &BackgroundStyles) -> Vec<String> {
    if styles.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["<style>".to_string()];
    lines.extend(styles.to_css().lines().map(String::from));
    lines.push("</style>".to_string());
    lines
}

pub fn print_stylesheet(styles: &BackgroundStyles) {
    for line in format_stylesheet(styles) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use crate::types::SizeOption;
    use pretty_assertions::assert_eq;

    #[test]
    fn format_index_pads_to_three_digits() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
    }

    #[test]
    fn registry_lists_sets_breakpoints_and_modes() {
        let registry: SetRegistry = [hero_set()].into_iter().collect();
        let lines = format_registry(&registry);

        assert_eq!(
            lines,
            vec![
                "Sets",
                "001 hero (2 breakpoints)",
                "    001 desktop → hero 1200x600",
                "        Modes: srcset, sizes, picture, bg, bg_retina",
                "        Retina: 2x",
                "    002 mobile → hero-sm 480x320",
                "        Modes: srcset, sizes, picture, bg, bg_retina",
                "        Retina: 2x, 3x",
                "",
                "1 set, 2 breakpoints",
            ]
        );
    }

    #[test]
    fn registry_sorted_by_key() {
        let registry: SetRegistry = [small_and_large_set_named("zeta"), small_and_large_set_named("alpha")]
            .into_iter()
            .collect();
        let lines = format_registry(&registry);
        assert_eq!(lines[1], "001 alpha (2 breakpoints)");
        assert!(lines.contains(&"002 zeta (2 breakpoints)".to_string()));
        assert_eq!(lines.last().unwrap(), "2 sets, 4 breakpoints");
    }

    #[test]
    fn breakpoint_without_templates_shows_none() {
        let registry: SetRegistry = [ResponsiveSet::new(
            "bare",
            vec![Breakpoint::new("only", SizeOption::new("bare", 10, 10))],
        )]
        .into_iter()
        .collect();
        let lines = format_registry(&registry);
        assert!(lines.contains(&"        Modes: none".to_string()));
        assert!(lines.contains(&"001 bare (1 breakpoint)".to_string()));
    }

    #[test]
    fn stylesheet_wraps_css_in_style_element() {
        let mut styles = BackgroundStyles::new();
        styles.register("@media (max-width: 767px)", ".a", ".a{m}".to_string());
        styles.register("", ".a", ".a{p}".to_string());

        assert_eq!(
            format_stylesheet(&styles),
            vec![
                "<style>",
                ".a{p}",
                "@media (max-width: 767px){",
                ".a{m}",
                "}",
                "</style>",
            ]
        );
    }

    #[test]
    fn empty_stylesheet_prints_nothing() {
        assert!(format_stylesheet(&BackgroundStyles::new()).is_empty());
    }
}
