//! Purpose: Mime-acceptance matching for uploaded files.
//! Exports: `matches`.
//! Role: Narrow collaborator used by the limit enforcer's type check.
//! Invariants: Declared-type parameters are ignored; comparison is case-insensitive.

/// Whether a declared mime type is accepted by a pattern.
///
/// The pattern may be `*` or `*/*` (accept anything), `type/*` (any
/// subtype), an exact `type/subtype`, or a comma-separated list of those;
/// a list accepts when any member accepts.
pub fn matches(declared: &str, pattern: &str) -> bool {
    let declared = essence(declared);
    pattern
        .split(',')
        .map(str::trim)
        .filter(|member| !member.is_empty())
        .any(|member| matches_one(&declared, member))
}

fn essence(declared: &str) -> String {
    declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn matches_one(declared: &str, pattern: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    if pattern == "*" || pattern == "*/*" {
        return true;
    }
    if let Some(kind) = pattern.strip_suffix("/*") {
        return declared.split('/').next() == Some(kind);
    }
    declared == pattern
}

#[cfg(test)]
mod tests {
    use super::matches;

    #[test]
    fn exact_and_wildcard_patterns() {
        assert!(matches("image/png", "image/png"));
        assert!(matches("image/png", "image/*"));
        assert!(matches("image/png", "*"));
        assert!(matches("image/png", "*/*"));
        assert!(!matches("text/plain", "image/*"));
        assert!(!matches("image/png", "image/jpeg"));
    }

    #[test]
    fn declared_parameters_are_ignored() {
        assert!(matches("text/plain; charset=utf-8", "text/plain"));
        assert!(matches("Image/PNG", "image/*"));
    }

    #[test]
    fn comma_lists_accept_any_member() {
        assert!(matches("application/pdf", "image/*, application/pdf"));
        assert!(!matches("text/html", "image/*, application/pdf"));
    }
}
