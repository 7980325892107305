//! Polarized document-id sets
//!
//! A [`RangeQueryResult`] is a compressed id set plus a polarity flag. With
//! `not_in` set the stored ids are the documents that do NOT match; the full
//! id universe is never materialized inside the index.

use roaring::RoaringTreemap;

use crate::table::DocId;

/// Document ids produced by one search, direct or complemented.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeQueryResult {
    docs: RoaringTreemap,
    not_in: bool,
}

impl RangeQueryResult {
    /// Empty direct result: matches nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty complement result: matches everything until ids are added.
    pub fn not_in() -> Self {
        Self {
            docs: RoaringTreemap::new(),
            not_in: true,
        }
    }

    pub fn add(&mut self, doc_id: DocId) {
        self.docs.insert(doc_id);
    }

    pub fn is_not_in(&self) -> bool {
        self.not_in
    }

    pub fn set_not_in(&mut self, not_in: bool) {
        self.not_in = not_in;
    }

    /// Number of stored ids (not the number of matches when complemented).
    pub fn len(&self) -> u64 {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Whether `doc_id` is a true match, honoring polarity.
    pub fn has(&self, doc_id: DocId) -> bool {
        self.docs.contains(doc_id) != self.not_in
    }

    /// Adds every stored id of `other`.
    pub fn union_with(&mut self, other: &RangeQueryResult) {
        self.docs |= &other.docs;
    }

    /// Removes the ids stored in `excluded`, leaving `self \ excluded`.
    pub fn intersection_with_not_in(&mut self, excluded: &RangeQueryResult) {
        self.docs -= &excluded.docs;
    }

    /// Materializes true matches within `universe`.
    pub fn resolve(&self, universe: &RoaringTreemap) -> RoaringTreemap {
        if self.not_in {
            universe - &self.docs
        } else {
            universe & &self.docs
        }
    }

    /// Stored ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = DocId> + '_ {
        self.docs.iter()
    }

    pub fn bitmap(&self) -> &RoaringTreemap {
        &self.docs
    }
}

impl FromIterator<DocId> for RangeQueryResult {
    fn from_iter<I: IntoIterator<Item = DocId>>(iter: I) -> Self {
        Self {
            docs: iter.into_iter().collect(),
            not_in: false,
        }
    }
}

/// Results of independent searches, combined with AND by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiRangeQueryResults {
    results: Vec<RangeQueryResult>,
}

impl MultiRangeQueryResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }

    pub fn add(&mut self, result: RangeQueryResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[RangeQueryResult] {
        &self.results
    }

    /// True when every result admits `doc_id`.
    pub fn has(&self, doc_id: DocId) -> bool {
        self.results.iter().all(|r| r.has(doc_id))
    }

    /// Appends every result of `other`.
    pub fn extend(&mut self, other: MultiRangeQueryResults) {
        self.results.extend(other.results);
    }

    /// Intersection of every result resolved against `universe`.
    pub fn resolve(&self, universe: &RoaringTreemap) -> RoaringTreemap {
        self.results
            .iter()
            .fold(universe.clone(), |acc, r| acc & r.resolve(universe))
    }
}
