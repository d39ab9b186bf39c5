//! Path captures supplied by the router.

use smallvec::SmallVec;

/// Captures stored inline before spilling to the heap.
const INLINE_PARAMS: usize = 4;

/// Named path captures from a route match.
///
/// # Example
///
/// ```rust
/// use bindery_codec::PathParams;
///
/// let mut params = PathParams::new();
/// params.push("userId", "123");
///
/// assert_eq!(params.get("userId"), Some("123"));
/// assert_eq!(params.get("unknown"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathParams {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl PathParams {
    /// Creates an empty capture set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a capture.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value captured for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of captures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates over `(name, value)` pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_capture_wins() {
        let params: PathParams = [
            ("id".to_string(), "1".to_string()),
            ("id".to_string(), "2".to_string()),
        ]
        .into_iter()
        .collect();

        assert_eq!(params.len(), 2);
        assert_eq!(params.get("id"), Some("1"));
    }

    #[test]
    fn test_iter_keeps_order() {
        let mut params = PathParams::new();
        assert!(params.is_empty());
        params.push("org", "acme");
        params.push("repo", "anvil");

        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("org", "acme"), ("repo", "anvil")]);
    }
}
