//! Requester tag sets.
//!
//! A [`TagSet`] is the set of labels a caller is cleared to see. It is supplied
//! per query and never persisted. Order and duplicates carry no meaning.

use std::{collections::BTreeSet, convert::Infallible, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// An unordered set of access tags held by a requester.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet {
    tags: BTreeSet<String>,
}

impl TagSet {
    /// Creates an empty tag set. An empty set intersects nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag, returning `false` if it was already present.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        self.tags.insert(tag.into())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterates tags in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Counts how many distinct node tags this set also holds.
    ///
    /// Node tags are treated as a set: repeating a tag on the node does not
    /// raise the count.
    pub fn intersection_size<'a, I>(&self, node_tags: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = BTreeSet::new();
        node_tags
            .into_iter()
            .filter(|tag| self.contains(tag) && seen.insert(*tag))
            .count()
    }

    /// Returns `true` when at least one node tag is held by this set.
    pub fn intersects<'a, I>(&self, node_tags: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        node_tags.into_iter().any(|tag| self.contains(tag))
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for TagSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.tags.extend(iter.into_iter().map(Into::into));
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

/// Parses a comma-separated list (`"HR, IT,MAN"`). Blank entries are skipped.
impl FromStr for TagSet {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .collect())
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for tag in &self.tags {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(tag)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::TagSet;

    #[test]
    fn parses_comma_separated_list() {
        let tags: TagSet = " HR,IT ,, MAN".parse().unwrap();
        assert_eq!(tags.len(), 3);
        assert!(tags.contains("HR"));
        assert!(tags.contains("IT"));
        assert!(tags.contains("MAN"));
        assert_eq!(tags.to_string(), "HR,IT,MAN");
    }

    #[test]
    fn duplicates_collapse() {
        let tags: TagSet = ["IT", "IT", "HR"].into_iter().collect();
        assert_eq!(tags.len(), 2);
    }

    #[test]
    fn intersection_counts_distinct_node_tags() {
        let tags: TagSet = ["HR", "IT"].into_iter().collect();
        assert_eq!(tags.intersection_size(["HR", "HR", "FIN"]), 1);
        assert_eq!(tags.intersection_size(["HR", "IT"]), 2);
        assert_eq!(tags.intersection_size(["FIN"]), 0);
    }

    #[test]
    fn empty_sets_never_intersect() {
        let empty = TagSet::new();
        assert!(!empty.intersects(["HR"]));

        let tags: TagSet = ["HR"].into_iter().collect();
        assert!(!tags.intersects(std::iter::empty()));
        assert!(!empty.intersects(std::iter::empty()));
    }
}
