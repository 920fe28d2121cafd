use std::{collections::BTreeSet, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Universal tag: a provider carrying it satisfies any tagged demand.
pub const ANY_TAG: &str = "@any";
/// Reserved tag applied only by the cycle breaker to promised-proxy
/// declarations.
pub const PROMISED_PROXY_TAG: &str = "@promised-proxy";

/// An unordered set of opaque tag strings. The empty set is distinct from the
/// universal tag.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<Arc<str>>);

impl TagSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn promised_proxy() -> Self {
        Self::from_iter([PROMISED_PROXY_TAG])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|t| t.as_ref())
    }

    /// The match predicate between a demand site (`self`) and a provider's
    /// declared tags. An empty site requires an empty provider or the
    /// universal tag; otherwise every site tag must appear on the provider.
    pub fn matches_provider(&self, provider: &TagSet) -> bool {
        if provider.contains(ANY_TAG) {
            return true;
        }
        if self.is_empty() {
            return provider.is_empty();
        }
        self.0.iter().all(|t| provider.0.contains(t))
    }
}

impl<S: AsRef<str>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(|s| Arc::from(s.as_ref())).collect())
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(tag)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_site_matches_only_empty_or_universal_provider() {
        let site = TagSet::empty();
        assert!(site.matches_provider(&TagSet::empty()));
        assert!(site.matches_provider(&TagSet::from_iter([ANY_TAG])));
        assert!(!site.matches_provider(&TagSet::from_iter(["db"])));
    }

    #[test]
    fn tagged_site_requires_subset() {
        let site = TagSet::from_iter(["db"]);
        assert!(site.matches_provider(&TagSet::from_iter(["db", "primary"])));
        assert!(!site.matches_provider(&TagSet::from_iter(["primary"])));
        assert!(!site.matches_provider(&TagSet::empty()));
    }

    #[test]
    fn universal_tag_matches_tagged_sites() {
        let provider = TagSet::from_iter([ANY_TAG]);
        assert!(TagSet::from_iter(["db"]).matches_provider(&provider));
        assert!(TagSet::from_iter(["db", "primary"]).matches_provider(&provider));
    }

    #[test]
    fn ordering_is_irrelevant() {
        let a = TagSet::from_iter(["x", "y"]);
        let b = TagSet::from_iter(["y", "x"]);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "{x, y}");
    }
}
