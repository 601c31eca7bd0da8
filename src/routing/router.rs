//! Mount path lookup.
//!
//! # Responsibilities
//! - Derive the mount path of a service from its name
//! - Split a request path into the mounted name and the path the
//!   sub-service sees
//!
//! # Design Decisions
//! - Prefix matching only, no regex in the hot path
//! - The first path segment after the prefix is the service name
//! - Explicit no-match rather than a silent default

/// Normalized gateway prefix: always starts and ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefix(String);

impl PathPrefix {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            Self("/".to_string())
        } else {
            Self(format!("/{}/", trimmed))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Mount path for a service name.
    pub fn mount_path(&self, name: &str) -> String {
        format!("{}{}", self.0, name)
    }

    /// True for the prefix itself, with or without its trailing slash.
    pub fn is_index(&self, path: &str) -> bool {
        path == self.0 || path == self.0.trim_end_matches('/') || (path.is_empty() && self.0 == "/")
    }

    /// Split `path` into `(service name, path inside the service)`.
    pub fn resolve<'a>(&self, path: &'a str) -> Option<(&'a str, String)> {
        let rest = path.strip_prefix(self.0.as_str())?;
        let (name, inner) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };
        if name.is_empty() {
            return None;
        }
        Some((name, inner.to_string()))
    }
}

impl Default for PathPrefix {
    fn default() -> Self {
        Self::new("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(PathPrefix::new("").as_str(), "/");
        assert_eq!(PathPrefix::new("/").as_str(), "/");
        assert_eq!(PathPrefix::new("api").as_str(), "/api/");
        assert_eq!(PathPrefix::new("/api/").as_str(), "/api/");
        assert_eq!(PathPrefix::new("/api").mount_path("time"), "/api/time");
    }

    #[test]
    fn test_resolve_root_prefix() {
        let prefix = PathPrefix::default();
        assert_eq!(prefix.resolve("/time"), Some(("time", "/".to_string())));
        assert_eq!(prefix.resolve("/time/health"), Some(("time", "/health".to_string())));
        assert_eq!(prefix.resolve("/"), None);
        assert!(prefix.is_index("/"));
    }

    #[test]
    fn test_resolve_nested_prefix() {
        let prefix = PathPrefix::new("/api");
        assert_eq!(prefix.resolve("/api/time/"), Some(("time", "/".to_string())));
        assert_eq!(prefix.resolve("/other/time"), None);
        assert!(prefix.is_index("/api"));
        assert!(prefix.is_index("/api/"));
        assert!(!prefix.is_index("/"));
    }
}
