//! Export extraction: what a file exposes to its dependents

use crate::imports::{statements, Statement};
use crate::language::Language;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportKind {
    /// `export default ...`
    Default,
    /// `export function f`, `export const x`, ...
    Declaration,
    /// `export { a, b }`
    List,
    /// `export ... from 'x'`
    ReExport,
    /// `module.exports` / `exports.x`
    CommonJs,
    /// Python `__all__`
    PythonAll,
    /// Rust `pub` item or `pub use`
    RustPub,
    /// Go capitalised top-level declaration
    GoExported,
}

impl ExportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Declaration => "declaration",
            Self::List => "list",
            Self::ReExport => "re-export",
            Self::CommonJs => "common-js",
            Self::PythonAll => "python-all",
            Self::RustPub => "rust-pub",
            Self::GoExported => "go-exported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub kind: ExportKind,
    pub name: String,
    pub is_default: bool,
    pub line: usize,
}

impl ExportRecord {
    fn new(kind: ExportKind, name: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            name: name.into(),
            is_default: false,
            line,
        }
    }

    fn default_export(kind: ExportKind, name: impl Into<String>, line: usize) -> Self {
        Self {
            is_default: true,
            ..Self::new(kind, name, line)
        }
    }
}

static EXPORT_DEFAULT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*export\s+default\s+(?:async\s+)?(?:(?:function\s*\*?|class)\s*)?(?P<name>[A-Za-z_$][\w$]*)?")
        .unwrap()
});
static EXPORT_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*export\s+(?:declare\s+)?(?:async\s+)?(?:abstract\s+)?(?:function\s*\*?|class|const|let|var|interface|type|enum|namespace)\s+(?P<name>[A-Za-z_$][\w$]*)")
        .unwrap()
});
static EXPORT_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*export\s+(?:type\s+)?\{(?P<list>[^}]*)\}\s*(?:from\s*['"](?P<src>[^'"]+)['"])?"#)
        .unwrap()
});
static EXPORT_STAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*export\s+\*\s*(?:as\s+(?P<ns>[\w$]+)\s+)?from\s*['"](?P<src>[^'"]+)['"]"#)
        .unwrap()
});
static MODULE_EXPORTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmodule\.exports\s*=\s*(?P<rhs>.*)$").unwrap());
static EXPORTS_MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:module\.)?exports\.(?P<name>[A-Za-z_$][\w$]*)\s*=").unwrap()
});
static PYTHON_ALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^__all__\s*(?:\+)?=\s*[\[(](?P<list>[^\])]*)").unwrap());
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"](?P<name>[^'"]+)['"]"#).unwrap());
static RUST_PUB_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*pub\s+(?:(?:async|const|unsafe|extern\s+"[^"]*")\s+)*(?:fn|struct|enum|trait|type|mod|const|static|union)\s+(?P<name>\w+)"#)
        .unwrap()
});
static RUST_PUB_USE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*pub\s+use\s+(?P<path>[^;]+);").unwrap());
static GO_EXPORTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:func(?:\s*\([^)]*\))?|type|var|const)\s+(?P<name>[A-Z]\w*)").unwrap()
});

/// Extracts [`ExportRecord`]s from source text.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExportExtractor;

impl ExportExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, content: &str, path: &Path) -> Vec<ExportRecord> {
        let language = Language::from_path(path);
        statements(content, language, export_closer)
            .iter()
            .flat_map(|stmt| extract_statement(stmt, language))
            .collect()
    }
}

fn export_closer(line: &str, language: Language) -> Option<char> {
    match language {
        Language::JavaScript | Language::TypeScript => {
            let opens = line.contains('{') && !line.contains('}');
            let starts = line.starts_with("export") || line.starts_with("module.exports");
            (starts && opens).then_some('}')
        }
        Language::Python => {
            let opens = line.starts_with("__all__") && !line.contains(']') && !line.contains(')');
            opens.then(|| if line.contains('(') { ')' } else { ']' })
        }
        Language::Rust => (line.starts_with("pub use") && !line.contains(';')).then_some(';'),
        _ => None,
    }
}

fn extract_statement(stmt: &Statement, language: Language) -> Vec<ExportRecord> {
    match language {
        Language::JavaScript | Language::TypeScript => extract_js(stmt),
        Language::Python => PYTHON_ALL
            .captures(&stmt.text)
            .map(|caps| {
                QUOTED
                    .captures_iter(&caps["list"])
                    .map(|q| ExportRecord::new(ExportKind::PythonAll, &q["name"], stmt.line))
                    .collect()
            })
            .unwrap_or_default(),
        Language::Rust => extract_rust(stmt),
        Language::Go => GO_EXPORTED
            .captures(&stmt.text)
            .map(|caps| vec![ExportRecord::new(ExportKind::GoExported, &caps["name"], stmt.line)])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn extract_js(stmt: &Statement) -> Vec<ExportRecord> {
    let text = stmt.text.as_str();
    let line = stmt.line;

    if let Some(caps) = EXPORT_DEFAULT.captures(text) {
        let name = caps.name("name").map_or("default", |m| m.as_str());
        return vec![ExportRecord::default_export(ExportKind::Default, name, line)];
    }
    if let Some(caps) = EXPORT_DECLARATION.captures(text) {
        return vec![ExportRecord::new(ExportKind::Declaration, &caps["name"], line)];
    }
    if let Some(caps) = EXPORT_STAR.captures(text) {
        let name = caps.name("ns").map_or("*", |m| m.as_str());
        return vec![ExportRecord::new(ExportKind::ReExport, name, line)];
    }
    if let Some(caps) = EXPORT_LIST.captures(text) {
        let kind = if caps.name("src").is_some() {
            ExportKind::ReExport
        } else {
            ExportKind::List
        };
        return caps["list"]
            .split(',')
            .filter_map(|item| export_list_item(kind, item, line))
            .collect();
    }
    if let Some(caps) = EXPORTS_MEMBER.captures(text) {
        return vec![ExportRecord::new(ExportKind::CommonJs, &caps["name"], line)];
    }
    if let Some(caps) = MODULE_EXPORTS.captures(text) {
        return commonjs_object(&caps["rhs"], line);
    }
    Vec::new()
}

/// `a`, `a as b`, `a as default`: the exported (outer) name.
fn export_list_item(kind: ExportKind, item: &str, line: usize) -> Option<ExportRecord> {
    let item = item.trim();
    let item = item.strip_prefix("type ").unwrap_or(item);
    let mut words = item.split_whitespace();
    let local = words.next()?;
    let exported = match (words.next(), words.next()) {
        (Some("as"), Some(alias)) => alias,
        _ => local,
    };
    if exported == "default" {
        Some(ExportRecord::default_export(kind, local, line))
    } else {
        Some(ExportRecord::new(kind, exported, line))
    }
}

/// `module.exports = X` or `module.exports = { a, b: c, d() {} }`
fn commonjs_object(rhs: &str, line: usize) -> Vec<ExportRecord> {
    let rhs = rhs.trim().trim_end_matches(';').trim();
    let Some(body) = rhs.strip_prefix('{') else {
        let name: String = rhs
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
            .collect();
        if name.is_empty() {
            return Vec::new();
        }
        return vec![ExportRecord::default_export(ExportKind::CommonJs, name, line)];
    };

    let body = body.split('}').next().unwrap_or(body);
    body.split(',')
        .filter_map(|entry| {
            let key: String = entry
                .trim()
                .trim_start_matches("...")
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
                .collect();
            (!key.is_empty()).then(|| ExportRecord::new(ExportKind::CommonJs, key, line))
        })
        .collect()
}

fn extract_rust(stmt: &Statement) -> Vec<ExportRecord> {
    if let Some(caps) = RUST_PUB_ITEM.captures(&stmt.text) {
        return vec![ExportRecord::new(ExportKind::RustPub, &caps["name"], stmt.line)];
    }
    let Some(caps) = RUST_PUB_USE.captures(&stmt.text) else {
        return Vec::new();
    };
    let path = &caps["path"];
    let names: Vec<&str> = match (path.find('{'), path.rfind('}')) {
        (Some(open), Some(close)) if open < close => path[open + 1..close].split(',').collect(),
        _ => vec![path],
    };
    names
        .into_iter()
        .filter_map(|item| {
            let mut words = item.split_whitespace();
            let item_path = words.next()?;
            let name = match (words.next(), words.next()) {
                (Some("as"), Some(alias)) => alias,
                _ => item_path.rsplit("::").next()?,
            };
            (!name.is_empty() && name != "self")
                .then(|| ExportRecord::new(ExportKind::RustPub, name, stmt.line))
        })
        .collect()
}
