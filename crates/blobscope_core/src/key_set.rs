use std::sync::Arc;

/// Immutable snapshot of cache keys.
///
/// Cloning is cheap; producers replace the whole snapshot instead of editing it.
/// Iteration follows the order the cache enumerated the keys in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeySet {
    keys: Arc<[String]>,
}

impl KeySet {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            keys: Arc::from(keys),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.keys
    }

    /// Keys accepted by `filter`, in snapshot order.
    pub fn filtered(&self, filter: &KeyFilter) -> KeySet {
        if filter.accepts_all() {
            return self.clone();
        }

        KeySet::new(
            self.keys
                .iter()
                .filter(|key| filter.matches(key))
                .cloned()
                .collect(),
        )
    }
}

impl<S: Into<String>> FromIterator<S> for KeySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Predicate derived from the filter text typed by the user.
///
/// A non-blank filter keeps only keys equal to the text, ignoring case. It is
/// an exact match, not a substring search: typing a prefix of a key hides it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyFilter {
    #[default]
    All,
    Exact(String),
}

impl KeyFilter {
    pub fn from_text(text: &str) -> Self {
        if text.trim().is_empty() {
            return KeyFilter::All;
        }

        KeyFilter::Exact(fold_case(text))
    }

    pub fn accepts_all(&self) -> bool {
        matches!(self, KeyFilter::All)
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            KeyFilter::All => true,
            KeyFilter::Exact(folded) => fold_case(key) == *folded,
        }
    }
}

fn fold_case(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> KeySet {
        KeySet::from_iter(["alpha", "beta"])
    }

    #[test]
    fn empty_filter_keeps_everything() {
        assert_eq!(keys().filtered(&KeyFilter::from_text("")), keys());
        assert_eq!(keys().filtered(&KeyFilter::from_text("   \t")), keys());
    }

    #[test]
    fn filter_is_case_insensitive_exact_match() {
        let filtered = keys().filtered(&KeyFilter::from_text("Alpha"));
        assert_eq!(filtered, KeySet::from_iter(["alpha"]));
    }

    #[test]
    fn filter_does_not_match_substrings() {
        assert!(keys().filtered(&KeyFilter::from_text("al")).is_empty());
        assert!(keys().filtered(&KeyFilter::from_text("alphabet")).is_empty());
    }

    #[test]
    fn filter_keeps_surrounding_whitespace_significant() {
        assert!(keys().filtered(&KeyFilter::from_text(" alpha")).is_empty());
    }

    #[test]
    fn filter_folds_non_ascii_case() {
        let keys = KeySet::from_iter(["Ärger", "arger"]);
        let filtered = keys.filtered(&KeyFilter::from_text("äRGER"));
        assert_eq!(filtered, KeySet::from_iter(["Ärger"]));
    }

    #[test]
    fn filtered_preserves_snapshot_order() {
        let keys = KeySet::from_iter(["b", "A", "a", "c"]);
        let filtered = keys.filtered(&KeyFilter::from_text("a"));
        assert_eq!(filtered.as_slice(), &["A".to_string(), "a".to_string()]);
    }
}
