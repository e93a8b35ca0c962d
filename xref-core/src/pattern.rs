//! Line-level symbol recognition driven by a declarative rule table.
//!
//! Each rule is a regex describing the *shape* of a construct (a declaration,
//! a call, an import, an export, ...) with a named `slot` group marking where
//! the symbol would appear. A slot is either a single identifier or a region
//! (an import list, a string literal) holding several identifiers. A rule may
//! also carry a `skip` group: captures where `skip` participates are shape
//! exclusions, not hits.
//!
//! Rules know nothing about the query. The matcher compares slot contents with
//! the symbol: exactly (word-bounded) in exact mode, through [`FuzzyScorer`]
//! in fuzzy mode, keeping the best hit per category per line.

use crate::comment::is_comment_only_in;
use crate::fuzzy::FuzzyScorer;
use crate::language::Language;
use crate::model::MatchType;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Identifier shape substituted for `{ID}` in rule patterns
const IDENT: &str = r"[A-Za-z_$][A-Za-z0-9_$]*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// The slot is exactly one identifier
    Ident,
    /// The slot is free text containing zero or more identifiers
    Region,
}

struct RuleSpec {
    category: MatchType,
    slot: Slot,
    /// Languages the rule is restricted to; empty means every language
    languages: &'static [Language],
    pattern: &'static str,
}

const fn rule(category: MatchType, slot: Slot, pattern: &'static str) -> RuleSpec {
    RuleSpec {
        category,
        slot,
        languages: &[],
        pattern,
    }
}

const fn scoped(
    category: MatchType,
    slot: Slot,
    languages: &'static [Language],
    pattern: &'static str,
) -> RuleSpec {
    RuleSpec {
        category,
        slot,
        languages,
        pattern,
    }
}

use MatchType::{Definition, Dependencies, References, ReverseDependencies, Usage};
use Slot::{Ident, Region};

const PYTHON: &[Language] = &[Language::Python];
const RUST: &[Language] = &[Language::Rust];
const GO: &[Language] = &[Language::Go];
const C_FAMILY: &[Language] = &[Language::C];
const CSHARP: &[Language] = &[Language::CSharp];
const CSS: &[Language] = &[Language::Css];
const SQL: &[Language] = &[Language::Sql];
const JS_LIKE: &[Language] = &[Language::JavaScript, Language::TypeScript];

/// The rule table, in evaluation order within each category.
const RULE_SPECS: &[RuleSpec] = &[
    // definitions
    rule(Definition, Ident, r"\b(?:async\s+)?function\s*\*?\s*(?P<slot>{ID})"),
    rule(Definition, Ident, r"\b(?:fn|def|fun|sub|proc|func)\s+(?P<slot>{ID})"),
    scoped(Definition, Ident, GO, r"\bfunc\s*\([^)]*\)\s*(?P<slot>{ID})"),
    rule(
        Definition,
        Ident,
        r"\b(?:class|struct|enum|interface|trait|type|union|protocol|record|module|namespace|mod|object)\s+(?P<slot>{ID})",
    ),
    rule(
        Definition,
        Ident,
        r"\b(?:const|let|var|val|static|readonly)\s+(?:mut\s+)?(?P<slot>{ID})",
    ),
    rule(
        Definition,
        Ident,
        r"^\s*(?:[\w$<>\[\],.?]+\s+)*(?P<slot>{ID})\s*(?:<[^<>()]*>)?\s*\([^()]*\)\s*(?:(?::|->)\s*[^{;=]+?)?\s*(?:throws\s+[\w.,\s]+)?\{\s*$",
    ),
    rule(
        Definition,
        Ident,
        r"(?P<slot>{ID})\s*[:=]\s*(?:async\s+)?(?:function\b|\([^()]*\)\s*(?::\s*[^=]+)?=>|{ID}\s*=>)",
    ),
    scoped(Definition, Ident, C_FAMILY, r"#\s*define\s+(?P<slot>{ID})"),
    scoped(Definition, Ident, RUST, r"\bmacro_rules!\s*(?P<slot>{ID})"),
    scoped(
        Definition,
        Ident,
        SQL,
        r"(?i:\bcreate\s+(?:or\s+replace\s+)?(?:temp(?:orary)?\s+)?(?:table|view|function|procedure|index|trigger|type)\s+(?:if\s+not\s+exists\s+)?)(?P<slot>{ID})",
    ),
    // references
    rule(
        References,
        Ident,
        r"(?:\b(?P<skip>function|fn|def|fun|func|sub|proc|class|struct)\s+)?(?P<slot>{ID})\s*(?:<[^<>()]*>)?\s*\(",
    ),
    rule(References, Ident, r"(?:\?\.|\.|::|->)\s*(?P<slot>{ID})"),
    rule(References, Ident, r"\bnew\s+(?P<slot>{ID})"),
    rule(
        References,
        Ident,
        r"(?:(?:^|[^:]):\s*|->\s*|\bas\s+|\binstanceof\s+)(?:&\s*)?(?:mut\s+)?(?:dyn\s+|impl\s+)?(?P<slot>{ID})",
    ),
    rule(References, Ident, r"<\s*(?P<slot>{ID})\s*[,>\[]"),
    rule(
        References,
        Ident,
        r"\b(?:extends|implements|impl(?:<[^>]*>)?)\s+(?P<slot>{ID})",
    ),
    scoped(
        References,
        Ident,
        RUST,
        r"\bimpl(?:<[^>]*>)?\s+[\w:]+(?:<[^>]*>)?\s+for\s+(?P<slot>{ID})",
    ),
    scoped(References, Region, PYTHON, r"\bclass\s+{ID}\s*\((?P<slot>[^)]*)\)"),
    scoped(References, Ident, JS_LIKE, r"</?(?P<slot>[A-Z][A-Za-z0-9_$]*)[\s/>]"),
    rule(References, Ident, r"@(?P<slot>{ID})"),
    // usage
    rule(Usage, Ident, r"(?P<slot>{ID})"),
    rule(Usage, Region, r#""(?P<slot>[^"\\]*(?:\\.[^"\\]*)*)""#),
    rule(Usage, Region, r"'(?P<slot>[^'\\]*(?:\\.[^'\\]*)*)'"),
    rule(Usage, Region, r"`(?P<slot>[^`]*)`"),
    // dependencies: the line pulls something named by the symbol into the file
    rule(
        Dependencies,
        Region,
        r#"\bimport\s+(?:type\s+)?(?P<slot>[^'"=;]*?)\s*\bfrom\b"#,
    ),
    rule(
        Dependencies,
        Region,
        r#"\b(?:from|import)\s*\(?\s*['"](?P<slot>[^'"]+)['"]"#,
    ),
    rule(
        Dependencies,
        Region,
        r#"\brequire(?:_relative|_once)?\s*\(?\s*['"](?P<slot>[^'"]+)['"]"#,
    ),
    rule(
        Dependencies,
        Region,
        r"\b(?:const|let|var)\s+(?P<slot>\{[^}]*\}|{ID})\s*=\s*require\b",
    ),
    scoped(
        Dependencies,
        Region,
        PYTHON,
        r"^\s*from\s+(?P<slot>[\w.]+)\s+import\b",
    ),
    scoped(
        Dependencies,
        Region,
        PYTHON,
        r"^\s*from\s+[\w.]+\s+import\s+(?P<slot>.+)$",
    ),
    rule(
        Dependencies,
        Region,
        r"^\s*import\s+(?:static\s+)?(?P<slot>[\w.]+(?:\.\*)?(?:\s+as\s+\w+)?(?:\s*,\s*[\w.]+(?:\s+as\s+\w+)?)*)\s*;?\s*$",
    ),
    rule(
        Dependencies,
        Region,
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+(?P<slot>[^;]+)",
    ),
    scoped(Dependencies, Ident, RUST, r"\bextern\s+crate\s+(?P<slot>{ID})"),
    scoped(
        Dependencies,
        Ident,
        RUST,
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(?P<slot>{ID})\s*;",
    ),
    rule(Dependencies, Region, r#"#\s*include\s*[<"](?P<slot>[^>"]+)[>"]"#),
    scoped(
        Dependencies,
        Region,
        CSHARP,
        r"^\s*using\s+(?:static\s+)?(?P<slot>[\w.]+)\s*;",
    ),
    scoped(
        Dependencies,
        Region,
        CSS,
        r#"@import\s+(?:url\()?\s*['"]?(?P<slot>[^'")\s;]+)"#,
    ),
    // reverse dependencies: the line exposes the symbol to dependents
    rule(
        ReverseDependencies,
        Ident,
        r"\bexport\s+(?:declare\s+)?(?:default\s+)?(?:async\s+)?(?:function\s*\*?|class|const|let|var|interface|type|enum|namespace|abstract\s+class)\s+(?P<slot>{ID})",
    ),
    rule(
        ReverseDependencies,
        Region,
        r"\bexport\s+(?:type\s+)?(?P<slot>\{[^}]*\}|\*(?:\s+as\s+{ID})?)",
    ),
    rule(
        ReverseDependencies,
        Region,
        r#"\bexport\b[^'"]*\bfrom\s*['"](?P<slot>[^'"]+)['"]"#,
    ),
    rule(ReverseDependencies, Ident, r"\bexport\s+default\s+(?P<slot>{ID})"),
    rule(
        ReverseDependencies,
        Region,
        r"\bmodule\.exports\s*=\s*(?P<slot>\{[^}]*\}?|{ID})",
    ),
    rule(
        ReverseDependencies,
        Ident,
        r"\b(?:module\.)?exports\.(?P<slot>{ID})\s*=",
    ),
    scoped(
        ReverseDependencies,
        Region,
        PYTHON,
        r"^\s*__all__\s*=\s*[\[(](?P<slot>[^\])]*)",
    ),
    scoped(
        ReverseDependencies,
        Ident,
        RUST,
        r"^\s*pub(?:\([^)]*\))?\s+(?:(?:async|const|unsafe)\s+)*(?:fn|struct|enum|trait|type|mod|const|static|union)\s+(?P<slot>{ID})",
    ),
    scoped(
        ReverseDependencies,
        Region,
        RUST,
        r"^\s*pub(?:\([^)]*\))?\s+use\s+(?P<slot>[^;]+)",
    ),
    scoped(
        ReverseDependencies,
        Ident,
        GO,
        r"^(?:func(?:\s*\([^)]*\))?|type|var|const)\s+(?P<slot>[A-Z][A-Za-z0-9_]*)",
    ),
];

/// A compiled recognizer rule
struct Rule {
    category: MatchType,
    slot: Slot,
    languages: &'static [Language],
    regex: Regex,
}

impl Rule {
    fn applies_to(&self, language: Language) -> bool {
        self.languages.is_empty() || self.languages.contains(&language)
    }
}

// The rule patterns are compile-time constants; a pattern that fails to
// compile is dropped (and caught by `test_all_rules_compile`).
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    RULE_SPECS
        .iter()
        .filter_map(|spec| {
            let pattern = spec.pattern.replace("{ID}", IDENT);
            Regex::new(&pattern).ok().map(|regex| Rule {
                category: spec.category,
                slot: spec.slot,
                languages: spec.languages,
                regex,
            })
        })
        .collect()
});

/// Words never offered to the fuzzy scorer as candidates
static KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "abstract", "and", "as", "async", "await", "bool", "break", "case", "catch", "class",
        "const", "continue", "def", "default", "defer", "do", "elif", "else", "enum", "except",
        "export", "extends", "false", "final", "finally", "fn", "for", "from", "func", "function",
        "go", "if", "impl", "implements", "import", "in", "instanceof", "int", "interface", "is",
        "lambda", "let", "match", "mod", "module", "mut", "new", "nil", "None", "not", "null",
        "of", "or", "package", "pass", "private", "protected", "pub", "public", "raise", "ref",
        "require", "return", "select", "self", "static", "string", "struct", "super", "switch",
        "this", "throw", "trait", "true", "try", "type", "typeof", "undefined", "use", "var",
        "void", "where", "while", "with", "yield",
    ]
    .into_iter()
    .collect()
});

/// A category hit on one line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMatch {
    pub match_type: MatchType,
    pub confidence: f64,
}

/// Matches lines against the rule table for one symbol.
pub struct PatternMatcher {
    symbol: String,
    categories: Vec<MatchType>,
    fuzzy: bool,
    include_comments: bool,
    scorer: FuzzyScorer,
}

impl PatternMatcher {
    pub fn new(symbol: impl Into<String>, categories: &[MatchType], scorer: FuzzyScorer) -> Self {
        Self {
            symbol: symbol.into(),
            categories: categories.to_vec(),
            fuzzy: false,
            include_comments: false,
            scorer,
        }
    }

    pub fn fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn include_comments(mut self, include_comments: bool) -> Self {
        self.include_comments = include_comments;
        self
    }

    /// Every category hit on `line`, at most one per category.
    pub fn match_line(&self, line: &str, language: Language) -> Vec<LineMatch> {
        if !self.fuzzy && !line.contains(self.symbol.as_str()) {
            return Vec::new();
        }
        if !self.include_comments && is_comment_only_in(line, language.comment_style()) {
            return Vec::new();
        }

        self.categories
            .iter()
            .filter_map(|&category| {
                self.best_for(category, line, language)
                    .map(|confidence| LineMatch {
                        match_type: category,
                        confidence,
                    })
            })
            .collect()
    }

    /// Best confidence among all rules of one category (best-match, not cumulative).
    fn best_for(&self, category: MatchType, line: &str, language: Language) -> Option<f64> {
        RULES
            .iter()
            .filter(|rule| rule.category == category && rule.applies_to(language))
            .filter_map(|rule| self.rule_score(rule, line))
            .fold(None, max_confidence)
    }

    fn rule_score(&self, rule: &Rule, line: &str) -> Option<f64> {
        rule.regex
            .captures_iter(line)
            .filter(|caps| caps.name("skip").is_none())
            .filter_map(|caps| caps.name("slot"))
            .filter_map(|slot| self.slot_score(rule.slot, slot.as_str()))
            .fold(None, max_confidence)
    }

    fn slot_score(&self, slot: Slot, text: &str) -> Option<f64> {
        if !self.fuzzy {
            let hit = match slot {
                Slot::Ident => text == self.symbol,
                Slot::Region => contains_word(text, &self.symbol),
            };
            return hit.then_some(1.0);
        }

        match slot {
            Slot::Ident => self.candidate_score(text),
            Slot::Region => {
                let whole = contains_word(text, &self.symbol).then_some(1.0);
                identifiers(text)
                    .filter_map(|token| self.candidate_score(token))
                    .chain(whole)
                    .fold(None, max_confidence)
            }
        }
    }

    fn candidate_score(&self, candidate: &str) -> Option<f64> {
        if candidate == self.symbol {
            return Some(1.0);
        }
        if KEYWORDS.contains(candidate) {
            return None;
        }
        let score = self.scorer.score(candidate, &self.symbol);
        (score > 0.0).then_some(score)
    }
}

fn max_confidence(best: Option<f64>, score: f64) -> Option<f64> {
    Some(best.map_or(score, |b| b.max(score)))
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn identifiers(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !is_ident_char(c))
        .filter(|t| t.chars().next().is_some_and(|c| !c.is_ascii_digit()))
}

/// Whether `needle` occurs in `haystack` with no identifier characters on
/// either side.
pub(crate) fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}
