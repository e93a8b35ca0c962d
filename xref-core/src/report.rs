//! Markdown rendering of engine results for agent consumption

use crate::error::XrefError;
use crate::graph::DependencyEdge;
use crate::model::{Match, SearchType};
use crate::search::{FileAnalysis, SearchOutcome};
use crate::text_search::TextSearchOutcome;
use std::fmt::Write;

/// Full report for a symbol search.
pub fn search_report(outcome: &SearchOutcome) -> String {
    let query = &outcome.query;
    let mut out = String::new();

    let _ = writeln!(out, "# Code references for `{}`", query.symbol);
    let _ = writeln!(out);
    let mode = if query.fuzzy_match { "fuzzy" } else { "exact" };
    let _ = writeln!(
        out,
        "Search type: **{}** | mode: {} | base path: `{}`",
        query.search_type, mode, query.base_path
    );
    let _ = writeln!(
        out,
        "Scanned {} files ({} skipped). {}",
        outcome.files_scanned,
        outcome.files_skipped,
        match_summary(outcome)
    );

    if outcome.matches.is_empty() {
        let _ = writeln!(out);
        out.push_str(&no_matches_hint(outcome));
    } else {
        for (file, matches) in group_by_file(&outcome.matches) {
            let _ = writeln!(out);
            let _ = writeln!(out, "## {}", file);
            let _ = writeln!(out);
            for m in matches {
                let _ = writeln!(
                    out,
                    "- line {} [{}, {:.2}]: `{}`",
                    m.line,
                    m.match_type,
                    m.confidence,
                    m.content.trim()
                );
            }
        }
    }

    if outcome.truncated {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "_Results truncated to {}. Narrow the base path or search type for more specific results._",
            query.max_results
        );
    }

    if !outcome.analyses.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "# Dependency analysis");
        for analysis in &outcome.analyses {
            let _ = writeln!(out);
            write_analysis(&mut out, analysis, "##");
        }
    }

    out
}

fn match_summary(outcome: &SearchOutcome) -> String {
    let shown = outcome.matches.len();
    if outcome.stopped_early {
        format!("Showing the first {} matches.", shown)
    } else if shown < outcome.total_matches {
        format!("Showing {} of {} matches.", shown, outcome.total_matches)
    } else if shown == 1 {
        "Found 1 match.".to_string()
    } else {
        format!("Found {} matches.", shown)
    }
}

fn no_matches_hint(outcome: &SearchOutcome) -> String {
    let query = &outcome.query;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "No matches found for `{}` under `{}`.",
        query.symbol, query.base_path
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Suggestions:");
    if !query.fuzzy_match {
        let _ = writeln!(out, "- enable `fuzzyMatch` to tolerate typos and casing differences");
    }
    if query.search_type != SearchType::All {
        let _ = writeln!(out, "- use searchType `all` to include every category");
    }
    if !query.include_comments {
        let _ = writeln!(out, "- set `includeComments` if the symbol only appears in comments");
    }
    if query.base_path != "." {
        let _ = writeln!(out, "- widen `basePath` to search the whole project");
    }
    if outcome.files_scanned == 0 {
        let _ = writeln!(out, "- no source files were found under the base path");
    }
    out
}

/// Matches grouped by file, keeping the ranking order of each file's first match.
fn group_by_file(matches: &[Match]) -> Vec<(&str, Vec<&Match>)> {
    let mut groups: Vec<(&str, Vec<&Match>)> = Vec::new();
    for m in matches {
        match groups.iter_mut().find(|(file, _)| *file == m.file) {
            Some((_, group)) => group.push(m),
            None => groups.push((m.file.as_str(), vec![m])),
        }
    }
    groups
}

/// Imports, exports and dependency sections of one file.
pub fn analysis_report(analysis: &FileAnalysis) -> String {
    let mut out = String::new();
    write_analysis(&mut out, analysis, "#");
    out
}

fn write_analysis(out: &mut String, analysis: &FileAnalysis, heading: &str) {
    let _ = writeln!(out, "{} {}", heading, analysis.file);

    if let Some(imports) = &analysis.imports {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}# Imports ({})", heading, imports.len());
        if imports.is_empty() {
            let _ = writeln!(out, "- none");
        }
        for import in imports {
            let names = if import.imported_names.is_empty() {
                String::new()
            } else {
                format!(" {{{}}}", import.imported_names.join(", "))
            };
            let target = match &import.resolved_path {
                Some(path) => format!("-> {}", path.to_string_lossy().replace('\\', "/")),
                None => "(unresolved)".to_string(),
            };
            let _ = writeln!(
                out,
                "- line {}: `{}`{} [{}] {}",
                import.line,
                import.source,
                names,
                import.kind.as_str(),
                target
            );
        }
    }

    if let Some(exports) = &analysis.exports {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}# Exports ({})", heading, exports.len());
        if exports.is_empty() {
            let _ = writeln!(out, "- none");
        }
        for export in exports {
            let default = if export.is_default { " (default)" } else { "" };
            let _ = writeln!(
                out,
                "- line {}: `{}`{} [{}]",
                export.line,
                export.name,
                default,
                export.kind.as_str()
            );
        }
    }

    if let Some(dependencies) = &analysis.dependencies {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}# Dependencies (depth {})",
            heading,
            analysis.dependency_depth.unwrap_or_default()
        );
        if dependencies.is_empty() {
            let _ = writeln!(out, "- none resolved");
        }
        for dep in dependencies {
            let _ = writeln!(out, "- {}", dep);
        }
    }

    if let Some(reverse) = &analysis.reverse_dependencies {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}# Imported by ({})", heading, reverse.len());
        if reverse.is_empty() {
            let _ = writeln!(out, "- no importers found");
        }
        for rev in reverse {
            let _ = writeln!(
                out,
                "- {}:{} [{}]: `{}`",
                rev.file.to_string_lossy().replace('\\', "/"),
                rev.line,
                rev.evidence.as_str(),
                rev.content.trim()
            );
        }
    }
}

pub fn text_search_report(outcome: &TextSearchOutcome) -> String {
    let query = &outcome.query;
    let mut out = String::new();
    let kind = if query.regex { "regex" } else { "text" };
    let _ = writeln!(out, "# {} search for `{}`", capitalize(kind), query.pattern);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Scanned {} files ({} skipped). Found {} matching lines{}.",
        outcome.files_scanned,
        outcome.files_skipped,
        outcome.matches.len(),
        if outcome.truncated { " (truncated)" } else { "" }
    );

    if outcome.matches.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "No lines matched under `{}`.", query.base_path);
        if query.case_sensitive {
            let _ = writeln!(out, "Try again without `caseSensitive`.");
        }
        return out;
    }

    let mut current: Option<&str> = None;
    for m in &outcome.matches {
        if current != Some(m.file.as_str()) {
            let _ = writeln!(out);
            let _ = writeln!(out, "## {}", m.file);
            let _ = writeln!(out);
            current = Some(m.file.as_str());
        }
        let _ = writeln!(out, "- line {}: `{}`", m.line, m.content.trim());
    }
    out
}

/// Outcome of resolving one import source.
pub fn resolve_report(source: &str, from_file: &str, resolved: Option<&str>) -> String {
    match resolved {
        Some(path) => format!("`{}` from {} resolves to {}\n", source, from_file, path),
        None => format!(
            "`{}` from {} could not be resolved to a file in the project \
             (external package, missing file or unsupported alias).\n",
            source, from_file
        ),
    }
}

pub fn edges_report(file: &str, depth: usize, edges: &[DependencyEdge]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Dependency edges from {} (depth {})", file, depth);
    let _ = writeln!(out);
    if edges.is_empty() {
        let _ = writeln!(out, "No resolvable imports.");
    }
    for edge in edges {
        let _ = writeln!(out, "- {} -> {}", edge.from.display(), edge.to.display());
    }
    out
}

/// Explanatory text for conditions reported as content instead of failures.
pub fn recoverable_error(err: &XrefError) -> String {
    match err {
        XrefError::PathNotFound(path) => format!(
            "The path `{}` does not exist relative to the project root. \
             Check the base path or file argument and try again.\n",
            path.display()
        ),
        other => format!("{}\n", other),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
