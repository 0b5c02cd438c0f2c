// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQL `LIKE` patterns compiled to anchored regular expressions
//!
//! `%` matches any run of characters, `_` exactly one, and `\` makes the next
//! character literal.

use crate::sql_compiler::error::CompileError;
use regex::Regex;

pub fn like_to_regex(pattern: &str) -> Result<Regex, CompileError> {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("(?s)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(escaped.encode_utf8(&mut [0; 4]))),
                None => {
                    return Err(CompileError::invalid_like_pattern(
                        pattern,
                        "dangling escape at end of pattern",
                    ))
                }
            },
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push('$');
    Regex::new(&out).map_err(|e| CompileError::invalid_like_pattern(pattern, e.to_string()))
}
