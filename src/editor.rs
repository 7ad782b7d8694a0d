//! Line-oriented edits on config draft buffers.
//!
//! The wire protocol for keyed edits is a regex over the raw text: for
//! each key, every line beginning with the key is removed (line plus
//! trailing newline) and the replacement inserted in its place. An empty
//! replacement is a delete. The pattern also consumes a trailing
//! whitespace/newline run at end-of-buffer, so deleting the last record
//! of a file eats the blank lines after it. That behavior is load-bearing
//! for the upstream management server and is preserved exactly; do not
//! tighten the pattern without migrating both sides.
//!
//! Keys are spliced into the pattern unescaped. Callers sending keys with
//! regex metacharacters must pre-escape them; an invalid pattern surfaces
//! as [`Error::Pattern`] rather than a panic.
//!
//! All functions here are pure (no I/O); the transaction store applies
//! them to the draft file.

use std::collections::BTreeMap;

use regex::Regex;

use crate::error::{Error, Result};

/// Build the line-anchored match pattern for one edit key.
///
/// `(?m)^<key>.*$[\r\n]*` matches every line starting with the key;
/// `[\r\n]+\s+\z` additionally matches a trailing blank run so a delete
/// of the last record leaves no dangling whitespace.
fn key_pattern(key: &str) -> Result<Regex> {
    Regex::new(&format!(r"(?m)^{key}.*$[\r\n]*|[\r\n]+\s+\z")).map_err(|source| Error::Pattern {
        key: key.to_string(),
        source,
    })
}

/// Append raw text to the buffer.
#[must_use]
pub fn append(buf: &str, text: &str) -> String {
    let mut out = String::with_capacity(buf.len() + text.len());
    out.push_str(buf);
    out.push_str(text);
    out
}

/// Replace every line beginning with a key by its mapped text.
///
/// An empty replacement deletes the matched lines. Keys are applied in
/// sorted order so repeated runs over the same input are deterministic.
///
/// # Errors
///
/// Returns [`Error::Pattern`] if a key does not compile as a regex
/// fragment.
pub fn replace_or_delete(buf: &str, edits: &BTreeMap<String, String>) -> Result<String> {
    let mut out = buf.to_string();
    for (key, replacement) in edits {
        let re = key_pattern(key)?;
        out = re.replace_all(&out, replacement.as_str()).into_owned();
    }
    Ok(out)
}

/// Delete every line beginning with one of the given keys.
///
/// # Errors
///
/// Returns [`Error::Pattern`] if a key does not compile as a regex
/// fragment.
pub fn delete_keys(buf: &str, keys: &[String]) -> Result<String> {
    let mut out = buf.to_string();
    for key in keys {
        let re = key_pattern(key)?;
        out = re.replace_all(&out, "").into_owned();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edits(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_append() {
        assert_eq!(append("a\n", "b\n"), "a\nb\n");
        assert_eq!(append("", "host x\n"), "host x\n");
    }

    #[test]
    fn test_replace_single_line() {
        let buf = "host alpha 10.0.0.1\nhost beta 10.0.0.2\n";
        let out = replace_or_delete(buf, &edits(&[("host alpha", "host alpha 10.0.0.9\n")]))
            .unwrap();
        assert_eq!(out, "host alpha 10.0.0.9\nhost beta 10.0.0.2\n");
    }

    #[test]
    fn test_replace_matches_every_line_with_prefix() {
        let buf = "opt a\nopt b\nother\n";
        let out = replace_or_delete(buf, &edits(&[("opt", "opt z\n")])).unwrap();
        // Both prefixed lines collapse into one replacement each.
        assert_eq!(out, "opt z\nopt z\nother\n");
    }

    #[test]
    fn test_delete_middle_line() {
        let buf = "one\ntwo\nthree\n";
        let out = delete_keys(buf, &["two".to_string()]).unwrap();
        assert_eq!(out, "one\nthree\n");
    }

    #[test]
    fn test_delete_last_record_consumes_following_newlines() {
        // The greedy `[\r\n]*` after the matched line swallows blank
        // lines that follow the deleted record.
        let buf = "one\ntwo\n\n\n";
        let out = delete_keys(buf, &["two".to_string()]).unwrap();
        assert_eq!(out, "one\n");
    }

    #[test]
    fn test_delete_consumes_trailing_blank_run_at_eof() {
        // The `[\r\n]+\s+\z` alternative eats a trailing blank run even
        // when the deleted key is elsewhere in the buffer.
        let buf = "two\nlast\n\n  \n";
        let out = delete_keys(buf, &["two".to_string()]).unwrap();
        assert_eq!(out, "last");
    }

    #[test]
    fn test_delete_only_record_leaves_empty_buffer() {
        let out = delete_keys("server A\n", &["server A".to_string()]).unwrap();
        assert_eq!(out, "");
    }

    #[test]
    fn test_crlf_line_endings() {
        let buf = "one\r\ntwo\r\nthree\r\n";
        let out = delete_keys(buf, &["two".to_string()]).unwrap();
        assert_eq!(out, "one\r\nthree\r\n");
    }

    #[test]
    fn test_edits_applied_in_key_order() {
        let buf = "b 1\na 1\n";
        let out = replace_or_delete(buf, &edits(&[("a", "a 2\n"), ("b", "b 2\n")])).unwrap();
        assert_eq!(out, "b 2\na 2\n");
    }

    #[test]
    fn test_unescaped_metacharacter_key_is_an_error() {
        let err = delete_keys("x\n", &["fwd(".to_string()]).unwrap_err();
        assert!(matches!(err, Error::Pattern { .. }));
    }

    #[test]
    fn test_missing_key_is_a_noop() {
        let buf = "one\ntwo\n";
        let out = delete_keys(buf, &["absent".to_string()]).unwrap();
        assert_eq!(out, buf);
    }
}
