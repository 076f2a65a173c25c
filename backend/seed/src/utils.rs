use std::sync::LazyLock;

use regex::Regex;

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[_\s]").unwrap());
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9-]").unwrap());
static DASHES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());

/// Normalizes a project slug so it is safe as the first path segment.
pub fn sanitize_slug(input: &str) -> String {
    let s = SEPARATORS.replace_all(input, "-");
    let s = DISALLOWED.replace_all(&s, "");
    let s = DASHES.replace_all(&s, "-");

    s.trim_matches('-').to_lowercase()
}

pub fn normalize_domain(input: Option<&str>) -> Option<String> {
    input
        .map(|d| d.trim().trim_end_matches('.').to_lowercase())
        .filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{normalize_domain, sanitize_slug};

    #[test]
    fn test_company_names() {
        assert_eq!(sanitize_slug("Acme Corp"), "acme-corp");
        assert_eq!(sanitize_slug("Globex_Corporation"), "globex-corporation");
        assert_eq!(sanitize_slug("  Initech\tLabs "), "initech-labs");
    }

    #[test]
    fn test_repeated_and_edge_dashes() {
        assert_eq!(sanitize_slug("acme--beta"), "acme-beta");
        assert_eq!(sanitize_slug("-acme-"), "acme");
        assert_eq!(sanitize_slug("acme _ beta"), "acme-beta");
    }

    #[test]
    fn test_path_and_url_characters() {
        assert_eq!(sanitize_slug("acme/feedback"), "acmefeedback");
        assert_eq!(sanitize_slug("acme?tab=top"), "acmetabtop");
        assert_eq!(sanitize_slug("v1.2"), "v12");
    }

    #[test]
    fn test_unicode_is_dropped() {
        assert_eq!(sanitize_slug("Café Olé"), "caf-ol");
        assert_eq!(sanitize_slug("東京"), "");
    }

    #[test]
    fn test_nothing_left() {
        assert_eq!(sanitize_slug(""), "");
        assert_eq!(sanitize_slug(" _ - "), "");
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(
            normalize_domain(Some(" Feedback.Acme.com. ")),
            Some("feedback.acme.com".to_string())
        );
        assert_eq!(normalize_domain(Some("  ")), None);
        assert_eq!(normalize_domain(None), None);
    }
}
