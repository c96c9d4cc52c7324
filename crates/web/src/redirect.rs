//! Post-login redirect target validation.
//!
//! Only same-site relative paths are honoured. Anything else (absolute URLs,
//! scheme-relative `//host` paths, backslash tricks, control characters)
//! falls back to [`HOME`].

use url::Url;

/// Default landing page.
pub const HOME: &str = "/";

/// Placeholder origin used to resolve candidate paths.
const PROBE_ORIGIN: &str = "http://stockroom.invalid/";

/// Return `next` if it is a safe relative path, otherwise [`HOME`].
#[must_use]
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(target) if is_safe_path(target) => target,
        _ => HOME,
    }
}

fn is_safe_path(target: &str) -> bool {
    if !target.starts_with('/') || target.starts_with("//") {
        return false;
    }
    if target.contains('\\') || target.chars().any(char::is_control) {
        return false;
    }

    // Browsers and `url` agree on what a path resolves to; the host must not move.
    let Ok(base) = Url::parse(PROBE_ORIGIN) else {
        return false;
    };
    base.join(target)
        .is_ok_and(|resolved| resolved.origin() == base.origin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_are_kept() {
        assert_eq!(safe_next(Some("/items")), "/items");
        assert_eq!(safe_next(Some("/")), "/");
        assert_eq!(safe_next(Some("/items?page=2#top")), "/items?page=2#top");
    }

    #[test]
    fn test_everything_else_goes_home() {
        for target in [
            "http://evil.com",
            "https://evil.com/items",
            "//evil.com",
            "/\\evil.com",
            "\\\\evil.com",
            "javascript:alert(1)",
            "items",
            "",
            "/\nLocation: http://evil.com",
        ] {
            assert_eq!(safe_next(Some(target)), HOME, "target {target:?}");
        }
        assert_eq!(safe_next(None), HOME);
    }
}
