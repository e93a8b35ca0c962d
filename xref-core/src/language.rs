//! Language family detection from file extensions

use std::path::Path;

/// Language family of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Rust,
    Go,
    C,
    Java,
    Kotlin,
    CSharp,
    Swift,
    Ruby,
    Php,
    Shell,
    Lua,
    Haskell,
    Sql,
    Lisp,
    Erlang,
    Tex,
    R,
    Perl,
    Elixir,
    Css,
    Markup,
    Config,
    Other,
}

/// How whole-line comments are written in a language family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `//`, `/* ... */`, leading `*` continuation lines
    CStyle,
    /// `#` line comments
    Hash,
    /// `#` line comments plus docstring quote lines
    Python,
    /// `--` line comments
    Dash,
    /// `;` line comments
    Semicolon,
    /// `%` line comments
    Percent,
    /// `<!-- ... -->`
    Markup,
    /// No known convention: nothing is a comment
    None,
}

impl Language {
    pub fn from_path(path: &Path) -> Self {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => ext.to_ascii_lowercase(),
            None => return Self::from_file_name(path),
        };
        match ext.as_str() {
            "js" | "jsx" | "mjs" | "cjs" | "vue" | "svelte" => Self::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => Self::TypeScript,
            "py" | "pyi" | "pyw" => Self::Python,
            "rs" => Self::Rust,
            "go" => Self::Go,
            "c" | "h" | "cc" | "cpp" | "cxx" | "hpp" | "hh" | "hxx" | "m" | "mm" => Self::C,
            "java" | "scala" | "groovy" | "dart" => Self::Java,
            "kt" | "kts" => Self::Kotlin,
            "cs" => Self::CSharp,
            "swift" => Self::Swift,
            "rb" | "rake" | "gemspec" => Self::Ruby,
            "php" => Self::Php,
            "sh" | "bash" | "zsh" | "fish" | "ps1" => Self::Shell,
            "lua" => Self::Lua,
            "hs" | "lhs" => Self::Haskell,
            "sql" => Self::Sql,
            "clj" | "cljs" | "edn" | "el" | "lisp" | "scm" => Self::Lisp,
            "erl" | "hrl" => Self::Erlang,
            "tex" | "sty" | "cls" => Self::Tex,
            "r" => Self::R,
            "pl" | "pm" => Self::Perl,
            "ex" | "exs" => Self::Elixir,
            "css" | "scss" | "sass" | "less" => Self::Css,
            "html" | "htm" | "xml" | "svg" | "md" | "markdown" => Self::Markup,
            "yaml" | "yml" | "toml" | "ini" | "cfg" | "conf" => Self::Config,
            _ => Self::Other,
        }
    }

    fn from_file_name(path: &Path) -> Self {
        match path.file_name().and_then(|n| n.to_str()) {
            Some("Makefile" | "Dockerfile" | "Rakefile" | "Gemfile") => Self::Config,
            _ => Self::Other,
        }
    }

    pub fn comment_style(self) -> CommentStyle {
        match self {
            Self::JavaScript
            | Self::TypeScript
            | Self::Rust
            | Self::Go
            | Self::C
            | Self::Java
            | Self::Kotlin
            | Self::CSharp
            | Self::Swift
            | Self::Php
            | Self::Css => CommentStyle::CStyle,
            Self::Python => CommentStyle::Python,
            Self::Ruby | Self::Shell | Self::R | Self::Perl | Self::Elixir | Self::Config => {
                CommentStyle::Hash
            }
            Self::Lua | Self::Haskell | Self::Sql => CommentStyle::Dash,
            Self::Lisp => CommentStyle::Semicolon,
            Self::Erlang | Self::Tex => CommentStyle::Percent,
            Self::Markup => CommentStyle::Markup,
            Self::Other => CommentStyle::None,
        }
    }

    /// Whether the extension names a source file worth scanning for symbols
    pub fn is_source(self) -> bool {
        !matches!(self, Self::Other)
    }

    /// Languages whose import statements can name files on disk
    pub fn has_imports(self) -> bool {
        !matches!(
            self,
            Self::Markup
                | Self::Config
                | Self::Sql
                | Self::Lisp
                | Self::Erlang
                | Self::Haskell
                | Self::Tex
                | Self::R
                | Self::Perl
                | Self::Elixir
                | Self::Other
        )
    }
}
