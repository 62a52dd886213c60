//! Glob patterns over logical file names.
//!
//! | Glob | Matches |
//! |------|---------|
//! | `*`  | any run of characters except `/` |
//! | `?`  | one character except `/` |
//! | `**` | any run of characters, `/` included |
//!
//! Everything else matches literally. Patterns are anchored at both ends and
//! case-insensitive.

use regex::{Regex, RegexBuilder};

use crate::error::{Error, Result};

/// Translates `glob` into an anchored, case-insensitive regex.
///
/// # Example
///
/// ```rust
/// use hotconf::glob::glob_to_regex;
///
/// let re = glob_to_regex("items/*").unwrap();
/// assert!(re.is_match("Items/Sword"));
/// assert!(!re.is_match("items/weapons/sword"));
/// ```
///
/// # Errors
///
/// [`Error::InvalidGlob`] if the translated pattern exceeds the regex size
/// limits.
pub fn glob_to_regex(glob: &str) -> Result<Regex> {
    let mut pattern = String::with_capacity(glob.len() * 2 + 2);
    pattern.push('^');

    let mut chars = glob.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                pattern.push_str(".*");
            }
            '*' => pattern.push_str("[^/]*"),
            '?' => pattern.push_str("[^/]"),
            other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    pattern.push('$');

    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .map_err(|source| Error::InvalidGlob {
            glob: glob.to_string(),
            source,
        })
}

/// Names from `names` that `pattern` matches, in input order.
pub fn filter_matching<'a, S: AsRef<str> + ?Sized + 'a>(
    pattern: &Regex,
    names: impl IntoIterator<Item = &'a S>,
) -> Vec<String> {
    names
        .into_iter()
        .map(|name| name.as_ref())
        .filter(|name| pattern.is_match(name))
        .map(str::to_string)
        .collect()
}

/// Names from `names` that `glob` matches, in input order.
///
/// # Errors
///
/// See [`glob_to_regex`].
pub fn filter_matching_glob<'a, S: AsRef<str> + ?Sized + 'a>(
    glob: &str,
    names: impl IntoIterator<Item = &'a S>,
) -> Result<Vec<String>> {
    Ok(filter_matching(&glob_to_regex(glob)?, names))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_FILES: &[&str] = &[
        "Folder/1File",
        "Folder/2File",
        "Folder/3File",
        "Folder/Thumbs",
        "Uggabo",
        "Buggabo",
        "Parent/Child/Grandchild/a",
        "Parent/Child/Grandchild/b",
        "Parent/Child/Grandchild/c",
    ];

    fn matching(glob: &str) -> Vec<String> {
        filter_matching_glob(glob, ALL_FILES.iter().copied()).unwrap()
    }

    #[test]
    fn test_star() {
        assert_eq!(
            matching("Folder/*"),
            ["Folder/1File", "Folder/2File", "Folder/3File", "Folder/Thumbs"]
        );
    }

    #[test]
    fn test_star_postfix() {
        assert_eq!(
            matching("Folder/*File"),
            ["Folder/1File", "Folder/2File", "Folder/3File"]
        );
    }

    #[test]
    fn test_question_mark() {
        assert_eq!(
            matching("Folder/?File"),
            ["Folder/1File", "Folder/2File", "Folder/3File"]
        );
    }

    #[test]
    fn test_star_stays_in_one_segment() {
        assert_eq!(matching("*"), ["Uggabo", "Buggabo"]);
    }

    #[test]
    fn test_double_star() {
        assert_eq!(
            matching("Parent/**"),
            [
                "Parent/Child/Grandchild/a",
                "Parent/Child/Grandchild/b",
                "Parent/Child/Grandchild/c"
            ]
        );
    }

    #[test]
    fn test_double_star_capped() {
        assert_eq!(matching("Parent/**/b"), ["Parent/Child/Grandchild/b"]);
    }

    #[test]
    fn test_case_insensitive_and_literal() {
        assert_eq!(matching("uggabo"), ["Uggabo"]);
        let re = glob_to_regex("a.b+c").unwrap();
        assert!(re.is_match("a.b+c"));
        assert!(!re.is_match("aXb+c"));
    }
}
