//! Raw path placeholder values supplied by the router.

use smallvec::SmallVec;

/// Placeholders stored inline before spilling to the heap.
const INLINE_PARAMS: usize = 4;

/// Raw path values, as matched by the external router.
///
/// Values are kept undecoded strings; typing happens in the validator.
///
/// ```rust
/// use thales_extract::PathParams;
///
/// let params: PathParams = [("category", "books"), ("item_id", "42")].into_iter().collect();
/// assert_eq!(params.get("item_id"), Some("42"));
/// assert_eq!(params.get("unknown"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathParams {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl PathParams {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a placeholder value; a repeated name replaces the earlier value.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.inner.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.inner.push((name, value)),
        }
    }

    /// Returns a placeholder value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Number of placeholders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when no placeholder was matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates in match order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.push(name, value);
        }
        params
    }
}
