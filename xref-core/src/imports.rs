//! Import statement extraction and resolution

use crate::comment::is_comment_only_in;
use crate::language::Language;
use crate::resolve::PathResolver;
use crate::walk::read_source;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Upper bound on physical lines joined into one logical statement
const MAX_JOINED_LINES: usize = 64;

/// Directories under a project root searched for dotted Python modules
const PYTHON_ROOTS: &[&str] = &["", "src"];
/// Directories under a project root searched for JVM-style packages
const JVM_ROOTS: &[&str] = &["src/main/java", "src/main/kotlin", "src", ""];
/// Directories under a project root searched for Ruby `require`
const RUBY_ROOTS: &[&str] = &["lib", ""];

/// Import style, named after the construct that produced the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
    /// `import { a, b } from 'x'` (possibly with a default binding too)
    EsNamed,
    /// `import a from 'x'`
    EsDefault,
    /// `import * as a from 'x'`
    EsNamespace,
    /// `import 'x'`
    EsSideEffect,
    /// `import type { A } from 'x'`
    EsType,
    /// `export ... from 'x'`
    ReExport,
    /// `import('x')`
    Dynamic,
    /// `require('x')`
    Require,
    PythonImport,
    PythonFrom,
    RustUse,
    RustMod,
    ExternCrate,
    Go,
    Include,
    /// Dotted module import (Java, Kotlin, Scala, Swift)
    Module,
    Using,
    RubyRequire,
    Php,
    Css,
    /// Shell `source`
    Source,
}

impl ImportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EsNamed => "es-named",
            Self::EsDefault => "es-default",
            Self::EsNamespace => "es-namespace",
            Self::EsSideEffect => "es-side-effect",
            Self::EsType => "es-type",
            Self::ReExport => "re-export",
            Self::Dynamic => "dynamic",
            Self::Require => "require",
            Self::PythonImport => "python-import",
            Self::PythonFrom => "python-from",
            Self::RustUse => "rust-use",
            Self::RustMod => "rust-mod",
            Self::ExternCrate => "extern-crate",
            Self::Go => "go",
            Self::Include => "include",
            Self::Module => "module",
            Self::Using => "using",
            Self::RubyRequire => "ruby-require",
            Self::Php => "php",
            Self::Css => "css",
            Self::Source => "source",
        }
    }
}

/// One import statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub kind: ImportKind,
    /// The import string as written
    pub source: String,
    pub imported_names: Vec<String>,
    /// Set only when the import resolves to an existing file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_path: Option<PathBuf>,
    /// 1-based line where the statement starts
    pub line: usize,
}

impl ImportRecord {
    fn new(kind: ImportKind, source: &str, imported_names: Vec<String>, line: usize) -> Self {
        Self {
            kind,
            source: source.trim().to_string(),
            imported_names,
            resolved_path: None,
            line,
        }
    }
}

/// A logical statement, possibly joined from several physical lines
#[derive(Debug, Clone)]
pub(crate) struct Statement {
    pub line: usize,
    pub text: String,
}

static ES_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+(?P<type>type\s+)?(?P<clause>[^'"]*?)\s*\bfrom\s*['"](?P<src>[^'"]+)['"]"#)
        .unwrap()
});
static ES_SIDE_EFFECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*import\s*['"](?P<src>[^'"]+)['"]"#).unwrap());
static ES_REEXPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*export\s+(?:type\s+)?(?P<clause>\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s*from\s*['"](?P<src>[^'"]+)['"]"#)
        .unwrap()
});
static DYNAMIC_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bimport\s*\(\s*['"`](?P<src>[^'"`]+)['"`]\s*\)"#).unwrap()
});
static REQUIRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequire\s*\(?\s*['"](?P<src>[^'"]+)['"]"#).unwrap()
});
static REQUIRE_BINDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:const|let|var|local)\s+(?P<bind>\{[^}]*\}|[A-Za-z_$][\w$]*)\s*=\s*require\s*\(?\s*['"](?P<src>[^'"]+)['"]"#)
        .unwrap()
});
static PY_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*from\s+(?P<src>[\w.]+)\s+import\s+(?P<names>.+?)\s*$").unwrap()
});
static PY_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(?P<mods>[\w.]+(?:\s+as\s+\w+)?(?:\s*,\s*[\w.]+(?:\s+as\s+\w+)?)*)\s*$").unwrap());
static RUST_USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+(?P<path>[^;]+);").unwrap()
});
static RUST_MOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(?P<name>\w+)\s*;").unwrap()
});
static EXTERN_CRATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*extern\s+crate\s+(?P<name>\w+)(?:\s+as\s+(?P<alias>\w+))?").unwrap()
});
static GO_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+(?:(?P<alias>[\w.]+)\s+)?"(?P<src>[^"]+)""#).unwrap()
});
static INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*#\s*include\s*(?P<open>[<"])(?P<src>[^>"]+)[>"]"#).unwrap()
});
static MODULE_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*import\s+(?:static\s+)?(?P<src>[\w.]+(?:\.\*)?)(?:\s+as\s+\w+)?\s*;?\s*$").unwrap()
});
static USING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*using\s+(?:static\s+)?(?:\w+\s*=\s*)?(?P<src>[\w.]+)\s*;").unwrap()
});
static RUBY_REQUIRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?P<fn>require_relative|require|load)\s*\(?\s*['"](?P<src>[^'"]+)['"]"#).unwrap()
});
static PHP_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:require|require_once|include|include_once)\s*\(?\s*(?P<dir>__DIR__\s*\.\s*)?['"](?P<src>[^'"]+)['"]"#)
        .unwrap()
});
static PHP_USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*use\s+(?:function\s+|const\s+)?(?P<src>[\w\\]+)(?:\s+as\s+(?P<alias>\w+))?\s*;").unwrap()
});
static CSS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+(?:url\()?\s*['"]?(?P<src>[^'")\s;]+)"#).unwrap()
});
static SHELL_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:source|\.)\s+['"]?(?P<src>[^'"\s;]+)"#).unwrap()
});

/// Extracts import records from source files, resolving each through a
/// [`PathResolver`].
pub struct ImportExtractor<'a> {
    resolver: &'a PathResolver,
}

impl<'a> ImportExtractor<'a> {
    pub fn new(resolver: &'a PathResolver) -> Self {
        Self { resolver }
    }

    /// Read `path` and extract its imports.
    pub fn extract_file(&self, path: &Path) -> crate::Result<Vec<ImportRecord>> {
        let content = read_source(path)?;
        Ok(self.extract(&content, path))
    }

    /// Extract and resolve the imports in `content`, which was read from `path`.
    pub fn extract(&self, content: &str, path: &Path) -> Vec<ImportRecord> {
        let language = Language::from_path(path);
        let mut records = extract_unresolved(content, language);
        for record in &mut records {
            record.resolved_path = self.resolve_record(record, path);
        }
        records
    }

    fn resolve_record(&self, record: &ImportRecord, path: &Path) -> Option<PathBuf> {
        let source = record.source.as_str();
        match record.kind {
            ImportKind::RustMod => self.resolver.resolve_rust_mod(source, path),
            ImportKind::RustUse => self.resolver.resolve_rust_use(source, path),
            ImportKind::ExternCrate | ImportKind::Go | ImportKind::Using => None,
            ImportKind::PythonImport | ImportKind::PythonFrom => {
                self.resolver.resolve_module(source, path, PYTHON_ROOTS)
            }
            ImportKind::Module => self.resolver.resolve_module(source, path, JVM_ROOTS),
            ImportKind::Include if !source.starts_with('.') => {
                // quoted includes are looked up next to the including file
                self.resolver.resolve(&format!("./{}", source), path)
            }
            ImportKind::Php | ImportKind::Css | ImportKind::Source
                if !source.starts_with('.') && !Path::new(source).is_absolute() =>
            {
                self.resolver
                    .resolve(&format!("./{}", source), path)
                    .or_else(|| self.resolver.resolve(source, path))
            }
            ImportKind::Php | ImportKind::Css | ImportKind::Source => {
                let trimmed = source.trim_start_matches('/');
                self.resolver
                    .resolve(source, path)
                    .or_else(|| self.resolver.resolve(&format!("./{}", trimmed), path))
            }
            ImportKind::RubyRequire if !source.starts_with('.') => self
                .resolver
                .resolve(&format!("./{}", source), path)
                .or_else(|| self.resolver.resolve_module(source, path, RUBY_ROOTS)),
            _ => self.resolver.resolve(source, path),
        }
    }
}

/// Extract import records without resolving them.
pub fn extract_unresolved(content: &str, language: Language) -> Vec<ImportRecord> {
    if !language.has_imports() {
        return Vec::new();
    }
    statements(content, language, import_closer)
        .iter()
        .flat_map(|stmt| extract_statement(stmt, language))
        .collect()
}

/// Character that ends a statement spanning several lines, if `line` opens one.
fn import_closer(line: &str, language: Language) -> Option<char> {
    match language {
        Language::JavaScript | Language::TypeScript => {
            let opens_braces = line.contains('{') && !line.contains('}');
            let declaration = line.starts_with("import")
                || line.starts_with("export")
                || ["const", "let", "var"]
                    .iter()
                    .any(|kw| line.strip_prefix(kw).is_some_and(|r| r.trim_start().starts_with('{')));
            (declaration && opens_braces).then_some('}')
        }
        Language::Python => (line.starts_with("from ")
            && line.contains("import (")
            && !line.contains(')'))
        .then_some(')'),
        Language::Rust => {
            let is_use = line.starts_with("use ") || (line.starts_with("pub") && line.contains(" use "));
            (is_use && !line.contains(';')).then_some(';')
        }
        Language::Php => (line.starts_with("use ") && !line.contains(';')).then_some(';'),
        _ => None,
    }
}

/// Split `content` into logical statements: comment-only lines dropped,
/// multi-line constructs joined, Go import blocks split per entry.
pub(crate) fn statements(
    content: &str,
    language: Language,
    closer: fn(&str, Language) -> Option<char>,
) -> Vec<Statement> {
    let style = language.comment_style();
    let lines: Vec<&str> = content.lines().collect();
    let mut out = Vec::new();
    let mut in_go_block = false;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();
        i += 1;

        if trimmed.is_empty() || is_comment_only_in(line, style) {
            continue;
        }

        if language == Language::Go {
            if in_go_block {
                if trimmed.starts_with(')') {
                    in_go_block = false;
                } else {
                    out.push(Statement {
                        line: i,
                        text: format!("import {}", trimmed),
                    });
                }
                continue;
            }
            if trimmed.starts_with("import (") && !trimmed.contains(')') {
                in_go_block = true;
                continue;
            }
        }

        let start = i;
        let mut text = trimmed.to_string();
        if let Some(close) = closer(trimmed, language) {
            while !text.contains(close) && i < lines.len() && i - start < MAX_JOINED_LINES {
                let next = lines[i];
                i += 1;
                if !is_comment_only_in(next, style) {
                    text.push(' ');
                    text.push_str(next.trim());
                }
            }
        }
        out.push(Statement { line: start, text });
    }

    out
}

fn extract_statement(stmt: &Statement, language: Language) -> Vec<ImportRecord> {
    match language {
        Language::JavaScript | Language::TypeScript => extract_js(stmt),
        Language::Python => extract_python(stmt),
        Language::Rust => extract_rust(stmt),
        Language::Go => capture_one(&GO_IMPORT, stmt, |caps| {
            let names = caps.name("alias").map(|a| vec![a.as_str().to_string()]);
            (ImportKind::Go, names.unwrap_or_default())
        }),
        Language::C => capture_one(&INCLUDE, stmt, |_| (ImportKind::Include, Vec::new())),
        Language::Java | Language::Kotlin | Language::Swift => {
            capture_one(&MODULE_IMPORT, stmt, |caps| {
                let src = &caps["src"];
                let last = src.rsplit('.').next().unwrap_or(src);
                let names = if last == "*" { Vec::new() } else { vec![last.to_string()] };
                (ImportKind::Module, names)
            })
        }
        Language::CSharp => capture_one(&USING, stmt, |_| (ImportKind::Using, Vec::new())),
        Language::Ruby => capture_one(&RUBY_REQUIRE, stmt, |_| (ImportKind::RubyRequire, Vec::new())),
        Language::Php => {
            let mut records = capture_one(&PHP_INCLUDE, stmt, |_| (ImportKind::Php, Vec::new()));
            records.extend(capture_one(&PHP_USE, stmt, |caps| {
                let src = &caps["src"];
                let name = caps
                    .name("alias")
                    .map(|a| a.as_str())
                    .unwrap_or_else(|| src.rsplit('\\').next().unwrap_or(src));
                (ImportKind::Php, vec![name.to_string()])
            }));
            records
        }
        Language::Css => capture_one(&CSS_IMPORT, stmt, |_| (ImportKind::Css, Vec::new())),
        Language::Shell => capture_one(&SHELL_SOURCE, stmt, |_| (ImportKind::Source, Vec::new())),
        Language::Lua => capture_one(&REQUIRE, stmt, |_| (ImportKind::Require, Vec::new())),
        _ => Vec::new(),
    }
}

/// Apply a single-shape regex whose `src` group holds the import source.
fn capture_one<F>(regex: &Regex, stmt: &Statement, describe: F) -> Vec<ImportRecord>
where
    F: Fn(&regex::Captures) -> (ImportKind, Vec<String>),
{
    let Some(caps) = regex.captures(&stmt.text) else {
        return Vec::new();
    };
    let source = caps
        .name("src")
        .or_else(|| caps.name("name"))
        .map_or("", |m| m.as_str());
    let (kind, names) = describe(&caps);
    vec![ImportRecord::new(kind, source, names, stmt.line)]
}

fn extract_js(stmt: &Statement) -> Vec<ImportRecord> {
    let text = stmt.text.as_str();
    let mut records = Vec::new();

    if let Some(caps) = ES_IMPORT.captures(text) {
        let (kind, names) = parse_es_clause(&caps["clause"]);
        let kind = if caps.name("type").is_some() { ImportKind::EsType } else { kind };
        records.push(ImportRecord::new(kind, &caps["src"], names, stmt.line));
    } else if let Some(caps) = ES_SIDE_EFFECT.captures(text) {
        records.push(ImportRecord::new(
            ImportKind::EsSideEffect,
            &caps["src"],
            Vec::new(),
            stmt.line,
        ));
    } else if let Some(caps) = ES_REEXPORT.captures(text) {
        let (_, names) = parse_es_clause(&caps["clause"]);
        records.push(ImportRecord::new(ImportKind::ReExport, &caps["src"], names, stmt.line));
    }

    for caps in DYNAMIC_IMPORT.captures_iter(text) {
        records.push(ImportRecord::new(ImportKind::Dynamic, &caps["src"], Vec::new(), stmt.line));
    }

    let bindings: Vec<(String, Vec<String>)> = REQUIRE_BINDING
        .captures_iter(text)
        .map(|caps| (caps["src"].to_string(), binding_names(&caps["bind"])))
        .collect();
    for caps in REQUIRE.captures_iter(text) {
        let source = &caps["src"];
        let names = bindings
            .iter()
            .find(|(src, _)| src == source)
            .map(|(_, names)| names.clone())
            .unwrap_or_default();
        records.push(ImportRecord::new(ImportKind::Require, source, names, stmt.line));
    }

    records
}

/// Split an ES import clause (`React, { useState as s, type X }`, `* as ns`)
/// into the import kind and the imported names, default binding first.
fn parse_es_clause(clause: &str) -> (ImportKind, Vec<String>) {
    let clause = clause.trim();
    if let Some(pos) = clause.find('*') {
        let alias = clause[pos + 1..]
            .trim()
            .strip_prefix("as")
            .map(str::trim)
            .unwrap_or_default();
        let mut names: Vec<String> = default_binding(&clause[..pos]).into_iter().collect();
        if !alias.is_empty() {
            names.push(alias.to_string());
        }
        return (ImportKind::EsNamespace, names);
    }

    match (clause.find('{'), clause.rfind('}')) {
        (Some(open), Some(close)) if open < close => {
            let mut names: Vec<String> = default_binding(&clause[..open]).into_iter().collect();
            names.extend(named_list(&clause[open + 1..close]));
            (ImportKind::EsNamed, names)
        }
        _ => {
            let names: Vec<String> = default_binding(clause).into_iter().collect();
            (ImportKind::EsDefault, names)
        }
    }
}

fn default_binding(text: &str) -> Option<String> {
    let name = text.trim().trim_end_matches(',').trim();
    (!name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$'))
        .then(|| name.to_string())
}

/// Names inside `{ a, b as c, type D }`; for `a as c` the imported name `a`.
fn named_list(inner: &str) -> Vec<String> {
    inner
        .split(',')
        .filter_map(|item| {
            let item = item.trim();
            let item = item.strip_prefix("type ").unwrap_or(item).trim();
            let name = item.split_whitespace().next()?;
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

fn binding_names(binding: &str) -> Vec<String> {
    let binding = binding.trim();
    match binding.strip_prefix('{').and_then(|b| b.strip_suffix('}')) {
        Some(inner) => inner
            .split(',')
            .filter_map(|item| {
                let name = item.split(':').next()?.trim();
                (!name.is_empty()).then(|| name.to_string())
            })
            .collect(),
        None => vec![binding.to_string()],
    }
}

fn extract_python(stmt: &Statement) -> Vec<ImportRecord> {
    if let Some(caps) = PY_FROM.captures(&stmt.text) {
        let names = caps["names"]
            .trim()
            .trim_start_matches('(')
            .trim_end_matches(')')
            .split(',')
            .filter_map(|item| {
                let name = item.split_whitespace().next()?;
                Some(name.to_string())
            })
            .collect();
        return vec![ImportRecord::new(ImportKind::PythonFrom, &caps["src"], names, stmt.line)];
    }
    if let Some(caps) = PY_IMPORT.captures(&stmt.text) {
        return caps["mods"]
            .split(',')
            .filter_map(|item| {
                let mut parts = item.split_whitespace();
                let module = parts.next()?;
                let alias = match (parts.next(), parts.next()) {
                    (Some("as"), Some(alias)) => vec![alias.to_string()],
                    _ => Vec::new(),
                };
                Some(ImportRecord::new(ImportKind::PythonImport, module, alias, stmt.line))
            })
            .collect();
    }
    Vec::new()
}

fn extract_rust(stmt: &Statement) -> Vec<ImportRecord> {
    if let Some(caps) = RUST_USE.captures(&stmt.text) {
        let path = caps["path"].split_whitespace().collect::<Vec<_>>().join(" ");
        let (source, names) = split_use_path(&path);
        return vec![ImportRecord::new(ImportKind::RustUse, &source, names, stmt.line)];
    }
    if let Some(caps) = RUST_MOD.captures(&stmt.text) {
        return vec![ImportRecord::new(ImportKind::RustMod, &caps["name"], Vec::new(), stmt.line)];
    }
    if let Some(caps) = EXTERN_CRATE.captures(&stmt.text) {
        let names = caps
            .name("alias")
            .map(|a| vec![a.as_str().to_string()])
            .unwrap_or_default();
        return vec![ImportRecord::new(ImportKind::ExternCrate, &caps["name"], names, stmt.line)];
    }
    Vec::new()
}

/// `a::b::{C, D as E}` → (`a::b`, [C, D]); `a::b::C` → (`a::b`, [C]).
fn split_use_path(path: &str) -> (String, Vec<String>) {
    if let Some(open) = path.find('{') {
        let prefix = path[..open].trim().trim_end_matches("::").to_string();
        let inner = path[open + 1..].trim_end_matches('}');
        let names = inner
            .split(',')
            .filter_map(|item| {
                let item = item.split_whitespace().next()?;
                let last = item.rsplit("::").next()?.trim_matches(|c: char| c == '{' || c == '}');
                (!last.is_empty()).then(|| last.to_string())
            })
            .collect();
        return (prefix, names);
    }
    let path = path.split_whitespace().next().unwrap_or(path);
    match path.rsplit_once("::") {
        Some((module, item)) => (module.to_string(), vec![item.to_string()]),
        None => (path.to_string(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::normalize_path;
    use std::fs;
    use tempfile::TempDir;

    fn extract(content: &str, lang: Language) -> Vec<ImportRecord> {
        extract_unresolved(content, lang)
    }

    fn sources(records: &[ImportRecord]) -> Vec<&str> {
        records.iter().map(|r| r.source.as_str()).collect()
    }

    #[test]
    fn test_es_module_forms() {
        let records = extract(
            "import React, { useState as useS, type Props } from 'react';\n\
             import * as path from \"path\";\n\
             import './styles.css';\n\
             import type { User } from './types';\n\
             import api from '../api';\n",
            Language::TypeScript,
        );
        assert_eq!(sources(&records), vec!["react", "path", "./styles.css", "./types", "../api"]);
        assert_eq!(records[0].kind, ImportKind::EsNamed);
        assert_eq!(records[0].imported_names, vec!["React", "useState", "Props"]);
        assert_eq!(records[1].kind, ImportKind::EsNamespace);
        assert_eq!(records[1].imported_names, vec!["path"]);
        assert_eq!(records[2].kind, ImportKind::EsSideEffect);
        assert_eq!(records[3].kind, ImportKind::EsType);
        assert_eq!(records[4].kind, ImportKind::EsDefault);
        assert_eq!(records[4].line, 5);
    }

    #[test]
    fn test_multiline_braces_are_joined() {
        let records = extract(
            "import {\n  getUser,\n  // old\n  saveUser,\n} from './user';\nconst x = 1;\n",
            Language::TypeScript,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line, 1);
        assert_eq!(records[0].imported_names, vec!["getUser", "saveUser"]);
    }

    #[test]
    fn test_require_and_dynamic_import() {
        let records = extract(
            "const { a, b: renamed } = require('./lib');\n\
             const fs = require(\"fs\");\n\
             const page = await import('./page');\n",
            Language::JavaScript,
        );
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].kind, ImportKind::Require);
        assert_eq!(records[0].imported_names, vec!["a", "b"]);
        assert_eq!(records[1].imported_names, vec!["fs"]);
        assert_eq!(records[2].kind, ImportKind::Dynamic);
        assert_eq!(records[2].source, "./page");
    }

    #[test]
    fn test_reexports_count_as_imports() {
        let records = extract("export { getUser } from './user';\nexport * from './types';\n", Language::TypeScript);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.kind == ImportKind::ReExport));
        assert_eq!(records[0].imported_names, vec!["getUser"]);
    }

    #[test]
    fn test_comment_lines_are_skipped() {
        let records = extract("// import { x } from './x';\n/* import y from 'y' */\n", Language::JavaScript);
        assert!(records.is_empty());
    }

    #[test]
    fn test_python_imports() {
        let records = extract(
            "import os, sys as system\nfrom .models import (\n    User,\n    Group as G,\n)\n# from x import y\n",
            Language::Python,
        );
        assert_eq!(sources(&records), vec!["os", "sys", ".models"]);
        assert_eq!(records[1].imported_names, vec!["system"]);
        assert_eq!(records[2].kind, ImportKind::PythonFrom);
        assert_eq!(records[2].imported_names, vec!["User", "Group"]);
        assert_eq!(records[2].line, 2);
    }

    #[test]
    fn test_rust_imports() {
        let records = extract(
            "use std::collections::{HashMap, HashSet as Set};\nuse crate::graph::Edge;\npub mod walk;\nextern crate serde;\n",
            Language::Rust,
        );
        assert_eq!(records[0].source, "std::collections");
        assert_eq!(records[0].imported_names, vec!["HashMap", "HashSet"]);
        assert_eq!(records[1].source, "crate::graph");
        assert_eq!(records[1].imported_names, vec!["Edge"]);
        assert_eq!(records[2].kind, ImportKind::RustMod);
        assert_eq!(records[3].kind, ImportKind::ExternCrate);
    }

    #[test]
    fn test_go_import_block() {
        let records = extract(
            "package main\n\nimport (\n\t\"fmt\"\n\tlog \"github.com/sirupsen/logrus\"\n)\nimport \"os\"\n",
            Language::Go,
        );
        assert_eq!(sources(&records), vec!["fmt", "github.com/sirupsen/logrus", "os"]);
        assert_eq!(records[1].imported_names, vec!["log"]);
        assert_eq!(records[1].line, 5);
    }

    #[test]
    fn test_other_families() {
        assert_eq!(sources(&extract("#include \"user.h\"\n", Language::C)), vec!["user.h"]);
        assert_eq!(
            sources(&extract("import java.util.List;\n", Language::Java)),
            vec!["java.util.List"]
        );
        assert_eq!(sources(&extract("using System.Linq;\n", Language::CSharp)), vec!["System.Linq"]);
        assert_eq!(
            sources(&extract("require_relative 'models/user'\n", Language::Ruby)),
            vec!["models/user"]
        );
        assert_eq!(
            sources(&extract("require_once __DIR__ . '/db.php';\nuse App\\Models\\User;\n", Language::Php)),
            vec!["/db.php", "App\\Models\\User"]
        );
        assert_eq!(sources(&extract("@import 'base.css';\n", Language::Css)), vec!["base.css"]);
        assert!(extract("import x from 'y'", Language::Markup).is_empty());
    }

    #[test]
    fn test_resolution_attached_when_target_exists() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("user.ts"), "export function getUser() {}\n").unwrap();
        let app = src.join("app.ts");
        fs::write(&app, "import { getUser } from './user'\nimport x from 'nope'\n").unwrap();

        let resolver = PathResolver::new();
        let records = ImportExtractor::new(&resolver).extract_file(&app).unwrap();
        assert_eq!(records[0].resolved_path, Some(normalize_path(&src.join("user.ts"))));
        assert_eq!(records[1].resolved_path, None);
    }

    #[test]
    fn test_quoted_include_resolves_next_to_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("user.h"), "int get_user(void);\n").unwrap();
        let main = dir.path().join("main.c");
        fs::write(&main, "#include \"user.h\"\n#include <stdio.h>\n").unwrap();

        let resolver = PathResolver::new();
        let records = ImportExtractor::new(&resolver).extract_file(&main).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].resolved_path, Some(normalize_path(&dir.path().join("user.h"))));
        assert_eq!(records[1].resolved_path, None);
    }
}
