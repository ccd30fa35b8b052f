//! Tool-owned extension schemas and their repositories.
//!
//! Each extension only adds tables. Foreign keys from an extension are always
//! nullable and only point at tables of the core schema or of extensions it
//! lists in `depends_on`.

pub mod examinator;
pub mod uroboro;
pub mod wherewasi;

use crate::migrate::Extension;

/// Extensions compiled into this crate.
pub const BUILTIN: &[Extension] = &[
    wherewasi::EXTENSION,
    uroboro::EXTENSION,
    examinator::EXTENSION,
];

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'`.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), r"%50\%\_off%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }

    #[test]
    fn builtin_versions_are_unique() {
        let mut versions: Vec<i64> = BUILTIN.iter().map(|ext| ext.version).collect();
        versions.sort_unstable();
        versions.dedup();
        assert_eq!(versions.len(), BUILTIN.len());
        assert!(!versions.contains(&crate::schema::CORE_VERSION));
    }
}
