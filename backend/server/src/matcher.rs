use std::sync::LazyLock;

use regex::Regex;

const EXCLUDED_PREFIXES: [&str; 5] = ["api/", "auth/callback", "_next/", "_static/", "_vercel"];

static STATIC_ASSET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w-]+\.\w+").unwrap());

/// Whether a path goes through the tenant router at all.
///
/// API routes, the auth callback, framework internals, and root-level static
/// files such as `/favicon.ico` are served as-is.
pub fn is_routable(path: &str) -> bool {
    let rest = path.strip_prefix('/').unwrap_or(path);

    if EXCLUDED_PREFIXES.iter().any(|prefix| rest.starts_with(prefix)) {
        return false;
    }

    !STATIC_ASSET.is_match(rest)
}

#[cfg(test)]
mod tests {
    use super::is_routable;

    #[test]
    fn test_excluded_prefixes() {
        assert!(!is_routable("/api/v1/projects"));
        assert!(!is_routable("/auth/callback"));
        assert!(!is_routable("/auth/callback?code=123"));
        assert!(!is_routable("/_next/static/chunk.js"));
        assert!(!is_routable("/_static/logo.svg"));
        assert!(!is_routable("/_vercel/insights"));
    }

    #[test]
    fn test_static_files() {
        assert!(!is_routable("/favicon.ico"));
        assert!(!is_routable("/robots.txt"));
        assert!(!is_routable("/site-map.xml"));
    }

    #[test]
    fn test_routable_paths() {
        assert!(is_routable("/"));
        assert!(is_routable("/api"));
        assert!(is_routable("/acme/feedback"));
        assert!(is_routable("/auth/login"));
        assert!(is_routable("/acme/changelog/v1.2"));
    }
}
