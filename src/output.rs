//! CLI output formatting.
//!
//! Each command has a `format_*` function returning lines (pure, testable)
//! and a `print_*` wrapper that writes them to stdout. Entities follow one
//! pattern: a header line with a positional index or identity, then
//! indented context lines.
//!
//! ## render
//!
//! ```text
//! <picture>…</picture>
//!
//! Sources
//!     (min-width: 0px)
//!         1x /files/styles/thumbnail/public/image-test.png?itok=…
//! Fallback /files/styles/large/public/image-test.png?itok=… (large, 40×20)
//! X-Cache-Tags: config:image.style.large …
//! ```
//!
//! ## mappings
//!
//! ```text
//! 001 Mapping One (mapping_one)
//!     Group: theme
//!     theme.mobile 1x → thumbnail
//!     theme.wide 1x → (original)
//! ```

use crate::cache::CacheStats;
use crate::derivative::DerivativeError;
use crate::file::FileUri;
use crate::mapping::{MappingIssue, ResponsiveImageMapping};
use crate::render::RenderResult;
use crate::response::Response;
use crate::store::Derivative;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

// ============================================================================
// render
// ============================================================================

pub fn format_render_output(result: &RenderResult) -> Vec<String> {
    let mut lines = vec![result.markup().into_string(), String::new()];

    if !result.sources.is_empty() {
        lines.push("Sources".to_string());
        for source in &result.sources {
            lines.push(format!("{}{}", indent(1), source.media_query));
            for candidate in &source.candidates {
                lines.push(format!(
                    "{}{} {}",
                    indent(2),
                    candidate.multiplier,
                    candidate.url
                ));
            }
        }
    }

    let style = result.fallback.style.as_deref().unwrap_or("original");
    let detail = match result.fallback.dimensions {
        Some(d) => format!("{style}, {}×{}", d.width, d.height),
        None => style.to_string(),
    };
    lines.push(format!("Fallback {} ({detail})", result.fallback.src));
    if let Some(link) = &result.link {
        lines.push(format!("Link {link}"));
    }
    lines.push(format!("X-Cache-Tags: {}", result.cache_tags));
    lines
}

pub fn print_render_output(result: &RenderResult) {
    print_lines(&format_render_output(result));
}

// ============================================================================
// mappings / map
// ============================================================================

pub fn format_mapping(index: usize, mapping: &ResponsiveImageMapping) -> Vec<String> {
    let mut lines = vec![
        format!("{} {} ({})", format_index(index), mapping.label(), mapping.id()),
        format!("{}Group: {}", indent(1), mapping.breakpoint_group()),
    ];
    for entry in mapping.entries() {
        lines.push(format!(
            "{}{} {} → {}",
            indent(1),
            entry.breakpoint_id,
            entry.multiplier,
            entry.image_style
        ));
    }
    lines
}

pub fn format_mapping_list(mappings: &[ResponsiveImageMapping]) -> Vec<String> {
    if mappings.is_empty() {
        return vec!["No responsive image mappings".to_string()];
    }
    mappings
        .iter()
        .enumerate()
        .flat_map(|(i, m)| format_mapping(i + 1, m))
        .collect()
}

pub fn print_mapping_list(mappings: &[ResponsiveImageMapping]) {
    print_lines(&format_mapping_list(mappings));
}

// ============================================================================
// derive / flush
// ============================================================================

pub type DeriveOutcome<'a> = (&'a str, &'a FileUri, &'a Result<Derivative, DerivativeError>);

pub fn format_derive_output(outcomes: &[DeriveOutcome<'_>], stats: &CacheStats) -> Vec<String> {
    let mut lines = Vec::with_capacity(outcomes.len() + 1);
    for (style, uri, result) in outcomes {
        let status = match result {
            Ok(d) if d.generated => format!("generated → {}", d.path.display()),
            Ok(_) => "cached".to_string(),
            Err(e) => format!("failed: {e}"),
        };
        lines.push(format!("{uri} [{style}]: {status}"));
    }
    lines.push(format!("Derivatives: {stats}"));
    lines
}

pub fn print_derive_output(outcomes: &[DeriveOutcome<'_>], stats: &CacheStats) {
    print_lines(&format_derive_output(outcomes, stats));
}

// ============================================================================
// check
// ============================================================================

/// `reports` pairs each mapping id with the issues found in it.
pub fn format_check_output(reports: &[(String, Vec<MappingIssue>)]) -> Vec<String> {
    let mut lines = vec!["Config OK".to_string()];
    let mut problems = 0;
    for (id, issues) in reports {
        if issues.is_empty() {
            lines.push(format!("{id}: ok"));
            continue;
        }
        problems += issues.len();
        lines.push(format!("{id}: {} issue(s)", issues.len()));
        for issue in issues {
            lines.push(format!("{}{issue}", indent(1)));
        }
    }
    lines.push(format!(
        "Checked {} mapping(s), {problems} issue(s)",
        reports.len()
    ));
    lines
}

pub fn print_check_output(reports: &[(String, Vec<MappingIssue>)]) {
    print_lines(&format_check_output(reports));
}

// ============================================================================
// get
// ============================================================================

pub fn format_response(response: &Response) -> Vec<String> {
    let mut lines = vec![response.status.to_string()];
    for (name, value) in response.headers() {
        lines.push(format!("{name}: {value}"));
    }
    lines.push(format!("({} bytes)", response.body.len()));
    lines
}

pub fn print_response(response: &Response) {
    print_lines(&format_response(response));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{FieldDisplaySettings, ResponsiveImageRenderer};
    use crate::response::Status;
    use crate::storage::{MappingStore, MemoryMappingStore};
    use crate::file::ImageItem;
    use crate::test_helpers::{mapping_one, test_breakpoints, test_image, url_generator};

    #[test]
    fn render_output_lists_sources_fallback_and_tags() {
        let store = MemoryMappingStore::new();
        store.save(&mapping_one()).unwrap();
        let (bps, urls) = (test_breakpoints(), url_generator());
        let result = ResponsiveImageRenderer::new(&store, &bps, &urls)
            .render(
                &FieldDisplaySettings {
                    responsive_image_mapping: Some("mapping_one".into()),
                    fallback_image_style: Some("large".into()),
                    ..FieldDisplaySettings::default()
                },
                &ImageItem::new(test_image("public"), "alt"),
                None,
            )
            .unwrap();
        let lines = format_render_output(&result);
        assert!(lines[0].starts_with("<picture>"));
        assert!(lines.contains(&"Sources".to_string()));
        assert!(lines.contains(&"    (min-width: 560px)".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("Fallback ") && l.ends_with("(large, 40×20)")));
        assert!(lines.last().unwrap().starts_with("X-Cache-Tags: config:image.style.large"));
    }

    #[test]
    fn mapping_list_numbers_entries() {
        let lines = format_mapping_list(&[mapping_one()]);
        assert_eq!(lines[0], "001 Mapping One (mapping_one)");
        assert_eq!(lines[1], "    Group: responsive_image_test_module");
        assert_eq!(lines[2], "    responsive_image_test_module.wide 1x → large");
    }

    #[test]
    fn empty_mapping_list() {
        assert_eq!(format_mapping_list(&[]), ["No responsive image mappings"]);
    }

    #[test]
    fn check_output_counts_issues() {
        let lines = format_check_output(&[
            ("a".into(), vec![]),
            ("b".into(), vec![MappingIssue::UnknownGroup("g".into())]),
        ]);
        assert_eq!(lines[1], "a: ok");
        assert_eq!(lines[2], "b: 1 issue(s)");
        assert_eq!(lines.last().unwrap(), "Checked 2 mapping(s), 1 issue(s)");
    }

    #[test]
    fn derive_output_reports_each_job() {
        let uri: FileUri = "public://a.png".parse().unwrap();
        let ok: Result<Derivative, DerivativeError> = Ok(Derivative {
            uri: "public://styles/large/public/a.png".into(),
            path: "files/styles/large/public/a.png".into(),
            generated: false,
        });
        let failed: Result<Derivative, DerivativeError> =
            Err(DerivativeError::UnknownStyle("poster".into()));
        let stats = CacheStats { hits: 1, misses: 0 };
        let lines = format_derive_output(&[("large", &uri, &ok), ("poster", &uri, &failed)], &stats);
        assert_eq!(lines[0], "public://a.png [large]: cached");
        assert_eq!(lines[1], "public://a.png [poster]: failed: unknown image style: poster");
        assert_eq!(lines[2], "Derivatives: 1 cached, 0 generated (1 total)");
    }

    #[test]
    fn response_output() {
        let resp = Response::new(Status::Forbidden);
        assert_eq!(format_response(&resp), ["403 Forbidden", "(0 bytes)"]);
    }
}
