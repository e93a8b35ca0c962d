//! Whole-line comment detection

use crate::language::{CommentStyle, Language};
use std::path::Path;

/// Returns true when `line` holds nothing but a comment in the language
/// implied by `path`. Code followed by a trailing comment is not comment-only.
pub fn is_comment_only(line: &str, path: &Path) -> bool {
    is_comment_only_in(line, Language::from_path(path).comment_style())
}

pub fn is_comment_only_in(line: &str, style: CommentStyle) -> bool {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return false;
    }

    match style {
        CommentStyle::CStyle => {
            trimmed.starts_with("//")
                || trimmed.starts_with("/*")
                || trimmed.starts_with("*/")
                || is_block_continuation(trimmed)
        }
        CommentStyle::Hash => trimmed.starts_with('#'),
        CommentStyle::Python => {
            trimmed.starts_with('#') || trimmed.starts_with("\"\"\"") || trimmed.starts_with("'''")
        }
        CommentStyle::Dash => trimmed.starts_with("--"),
        CommentStyle::Semicolon => trimmed.starts_with(';'),
        CommentStyle::Percent => trimmed.starts_with('%'),
        CommentStyle::Markup => trimmed.starts_with("<!--"),
        CommentStyle::None => false,
    }
}

/// `* text` inside a block comment. A bare `*` followed by an operand such as
/// `*ptr = 1` is code.
fn is_block_continuation(trimmed: &str) -> bool {
    match trimmed.strip_prefix('*') {
        Some(rest) => rest.is_empty() || rest.starts_with(' ') || rest.starts_with('/'),
        None => false,
    }
}
