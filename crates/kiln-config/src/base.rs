//! Base path normalization and URL rewriting.
//!
//! The base path is the URL prefix under which an application is served
//! (for example `/meqr/` when deployed below the domain root). Every URL the
//! dev server answers and every asset URL emitted for the bundler goes
//! through [`PathRewriter`], so both sides agree on the prefix.

use crate::error::{ConfigError, Result};

/// Normalize a raw `base` value into `/segment/.../`.
///
/// Leading and trailing slashes are added when missing and repeated
/// slashes are collapsed, so `"meqr"`, `"/meqr"`, `"meqr/"` and
/// `"//meqr//"` all become `"/meqr/"`.
///
/// # Example
///
/// ```
/// use kiln_config::normalize_base;
///
/// assert_eq!(normalize_base("meqr").unwrap(), "/meqr/");
/// assert_eq!(normalize_base("/").unwrap(), "/");
/// assert!(normalize_base("").is_err());
/// ```
pub fn normalize_base(raw: &str) -> Result<String> {
    let invalid = |reason: &str| ConfigError::InvalidBasePath {
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    if raw.trim().is_empty() {
        return Err(invalid("base cannot be empty; use \"/\" for the domain root"));
    }

    if raw.contains("://") {
        return Err(invalid(
            "absolute URLs are not supported, use a path such as \"/app/\"",
        ));
    }

    if let Some(c) = raw
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '?' | '#' | '\\'))
    {
        return Err(invalid(&format!("contains invalid character {:?}", c)));
    }

    let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();

    if segments.iter().any(|s| *s == "." || *s == "..") {
        return Err(invalid("relative segments ('.' and '..') are not allowed"));
    }

    if segments.is_empty() {
        return Ok("/".to_string());
    }

    Ok(format!("/{}/", segments.join("/")))
}

/// Where a request path falls relative to the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseMatch<'a> {
    /// Under the base; carries the remainder without a leading slash.
    Inside(&'a str),
    /// The base without its trailing slash (`/meqr` for `/meqr/`).
    MissingTrailingSlash,
    /// Not under the base at all.
    Outside,
}

/// Prefixes asset and module URLs with the base path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRewriter {
    base: String,
}

impl PathRewriter {
    /// Create a rewriter, normalizing `base` first.
    pub fn new(base: &str) -> Result<Self> {
        Ok(Self {
            base: normalize_base(base)?,
        })
    }

    /// Build from a base that already went through [`normalize_base`].
    pub(crate) fn from_normalized(base: String) -> Self {
        debug_assert!(base.starts_with('/') && base.ends_with('/'));
        Self { base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// True when the application is served from the domain root.
    pub fn is_root(&self) -> bool {
        self.base == "/"
    }

    /// Prefix `asset` with the base.
    ///
    /// Paths already under the base are left alone and external URLs are
    /// returned unchanged, so the function is idempotent.
    ///
    /// ```
    /// use kiln_config::PathRewriter;
    ///
    /// let rewriter = PathRewriter::new("/meqr/").unwrap();
    /// assert_eq!(rewriter.rewrite("/assets/logo.svg"), "/meqr/assets/logo.svg");
    /// assert_eq!(rewriter.rewrite("/meqr/assets/logo.svg"), "/meqr/assets/logo.svg");
    /// assert_eq!(rewriter.rewrite("https://cdn.example.com/x.js"), "https://cdn.example.com/x.js");
    /// ```
    pub fn rewrite(&self, asset: &str) -> String {
        if is_external(asset) {
            return asset.to_string();
        }

        if self.is_root() {
            return format!("/{}", asset.trim_start_matches('/'));
        }

        if asset.starts_with(&self.base) {
            return asset.to_string();
        }

        if asset == self.base.trim_end_matches('/') {
            return self.base.clone();
        }

        format!("{}{}", self.base, asset.trim_start_matches('/'))
    }

    /// Classify an incoming request path against the base.
    pub fn strip<'a>(&self, path: &'a str) -> BaseMatch<'a> {
        if let Some(rest) = path.strip_prefix(self.base.as_str()) {
            return BaseMatch::Inside(rest);
        }

        if !self.is_root() && path == self.base.trim_end_matches('/') {
            return BaseMatch::MissingTrailingSlash;
        }

        BaseMatch::Outside
    }
}

/// URLs with a scheme, protocol-relative URLs and data URIs.
fn is_external(path: &str) -> bool {
    if path.starts_with("//") || path.starts_with("data:") {
        return true;
    }

    match path.find("://") {
        Some(idx) => {
            let scheme = &path[..idx];
            scheme
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_variants_normalize_to_same_base() {
        for raw in ["base", "/base", "base/", "/base/", "//base//"] {
            assert_eq!(normalize_base(raw).unwrap(), "/base/", "input {raw:?}");
        }
    }

    #[test]
    fn internal_slashes_collapse() {
        assert_eq!(normalize_base("/a//b///c").unwrap(), "/a/b/c/");
        assert_eq!(normalize_base("///").unwrap(), "/");
    }

    #[test]
    fn rejects_bad_bases() {
        for raw in ["", "   ", "/a b/", "/a?x", "/a#x", "a\\b", "https://x.dev/", "./", "/a/../b"] {
            let err = normalize_base(raw).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidBasePath { .. }),
                "input {raw:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn rewrite_prefixes_relative_and_absolute_paths() {
        let rewriter = PathRewriter::new("meqr").unwrap();
        assert_eq!(rewriter.rewrite("main.js"), "/meqr/main.js");
        assert_eq!(rewriter.rewrite("/main.js"), "/meqr/main.js");
        assert_eq!(rewriter.rewrite("/meqr"), "/meqr/");
        assert_eq!(rewriter.rewrite(""), "/meqr/");
    }

    #[test]
    fn rewrite_with_root_base() {
        let rewriter = PathRewriter::new("/").unwrap();
        assert!(rewriter.is_root());
        assert_eq!(rewriter.rewrite("main.js"), "/main.js");
        assert_eq!(rewriter.rewrite("/main.js"), "/main.js");
    }

    #[test]
    fn rewrite_leaves_external_urls() {
        let rewriter = PathRewriter::new("/meqr/").unwrap();
        for url in [
            "http://example.com/a.js",
            "//cdn.example.com/a.js",
            "data:image/png;base64,AAAA",
        ] {
            assert_eq!(rewriter.rewrite(url), url);
        }
    }

    #[test]
    fn strip_classifies_request_paths() {
        let rewriter = PathRewriter::new("/meqr/").unwrap();
        assert_eq!(rewriter.strip("/meqr/"), BaseMatch::Inside(""));
        assert_eq!(rewriter.strip("/meqr/a/b.js"), BaseMatch::Inside("a/b.js"));
        assert_eq!(rewriter.strip("/meqr"), BaseMatch::MissingTrailingSlash);
        assert_eq!(rewriter.strip("/other/a.js"), BaseMatch::Outside);
        assert_eq!(rewriter.strip("/meqrx"), BaseMatch::Outside);

        let root = PathRewriter::new("/").unwrap();
        assert_eq!(root.strip("/a.js"), BaseMatch::Inside("a.js"));
    }
}
