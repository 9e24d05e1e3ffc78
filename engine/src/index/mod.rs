pub mod facade;

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// A single ranked hit for one query: how many of the query's stems matched
/// at `location`, and the resulting TF-like `score`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub location: String,
    pub matches: u32,
    pub score: f64,
}

/// Sorts `results` into the spec's total order, descending: higher score
/// first, ties broken by higher match count, further ties broken by
/// case-insensitive ascending location.
fn rank(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.matches.cmp(&a.matches))
            .then_with(|| a.location.to_lowercase().cmp(&b.location.to_lowercase()))
    });
}

/// A positional inverted index: stem -> location -> ordered positions, plus
/// a per-location word count (the highest position ever recorded there).
///
/// Not thread-safe by itself — see [`facade::SharedIndex`] for the
/// reader-writer-locked wrapper used once indexing and search may overlap.
#[derive(Debug, Default, Clone, Serialize)]
pub struct InvertedIndex {
    postings: BTreeMap<String, BTreeMap<String, BTreeSet<u32>>>,
    word_count: BTreeMap<String, u32>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `stem` occurred at `location` at 1-based `position`.
    /// Idempotent on repeated identical calls. Also bumps `word_count` for
    /// `location` if `position` is a new high.
    pub fn add(&mut self, stem: impl Into<String>, location: impl Into<String>, position: u32) {
        let location = location.into();
        self.postings
            .entry(stem.into())
            .or_default()
            .entry(location.clone())
            .or_default()
            .insert(position);

        let counter = self.word_count.entry(location).or_insert(0);
        if position > *counter {
            *counter = position;
        }
    }

    /// Bulk-merges `other` into `self`. Position sets are unioned;
    /// `word_count` takes the max of the two sides per location — the
    /// behavior the spec mandates over naively overwriting, which would
    /// lose data when merging overlapping locations.
    pub fn add_all(&mut self, other: InvertedIndex) {
        for (stem, locations) in other.postings {
            let entry = self.postings.entry(stem).or_default();
            for (location, positions) in locations {
                entry.entry(location).or_default().extend(positions);
            }
        }

        for (location, count) in other.word_count {
            let entry = self.word_count.entry(location).or_insert(0);
            if count > *entry {
                *entry = count;
            }
        }
    }

    pub fn contains_stem(&self, stem: &str) -> bool {
        self.postings.contains_key(stem)
    }

    pub fn contains_location(&self, stem: &str, location: &str) -> bool {
        self.postings
            .get(stem)
            .map_or(false, |locations| locations.contains_key(location))
    }

    pub fn contains_position(&self, stem: &str, location: &str, position: u32) -> bool {
        self.postings
            .get(stem)
            .and_then(|locations| locations.get(location))
            .map_or(false, |positions| positions.contains(&position))
    }

    /// Immutable snapshot of every location indexed under `stem`.
    pub fn path_set(&self, stem: &str) -> BTreeSet<String> {
        self.postings
            .get(stem)
            .map(|locations| locations.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Immutable snapshot of positions recorded for `(stem, location)`.
    pub fn position_set(&self, stem: &str, location: &str) -> BTreeSet<u32> {
        self.postings
            .get(stem)
            .and_then(|locations| locations.get(location))
            .cloned()
            .unwrap_or_default()
    }

    /// Immutable snapshot of every stem in the index.
    pub fn stem_set(&self) -> BTreeSet<String> {
        self.postings.keys().cloned().collect()
    }

    /// Immutable snapshot of the word-count table.
    pub fn counts(&self) -> BTreeMap<String, u32> {
        self.word_count.clone()
    }

    /// Folds one matching stem's postings into the in-progress accumulator.
    fn fold(&self, stem: &str, acc: &mut BTreeMap<String, SearchResult>) {
        let locations = match self.postings.get(stem) {
            Some(l) => l,
            None => return,
        };

        for (location, positions) in locations {
            let added = positions.len() as u32;
            let word_count = self
                .word_count
                .get(location)
                .copied()
                .expect("word_count missing for a location present in postings");

            let entry = acc.entry(location.clone()).or_insert_with(|| SearchResult {
                location: location.clone(),
                matches: 0,
                score: 0.0,
            });
            entry.matches += added;
            entry.score = entry.matches as f64 / word_count as f64;
        }
    }

    /// A stem matches iff it is present verbatim in the index.
    pub fn exact_search(&self, stems: &[String]) -> Vec<SearchResult> {
        let mut acc = BTreeMap::new();
        for stem in stems {
            self.fold(stem, &mut acc);
        }
        let mut results: Vec<SearchResult> = acc.into_values().collect();
        rank(&mut results);
        results
    }

    /// A stem `q` matches any index stem beginning with `q`. Uses
    /// `BTreeMap::range(q..)` for O(log N + k) tailward iteration instead
    /// of a full scan — the optimization the spec calls out as critical.
    pub fn partial_search(&self, stems: &[String]) -> Vec<SearchResult> {
        let mut acc = BTreeMap::new();
        for q in stems {
            for (candidate, _) in self.postings.range(q.clone()..) {
                if !candidate.starts_with(q.as_str()) {
                    break;
                }
                self.fold(candidate, &mut acc);
            }
        }
        let mut results: Vec<SearchResult> = acc.into_values().collect();
        rank(&mut results);
        results
    }

    /// Dispatches to [`Self::exact_search`] or [`Self::partial_search`].
    pub fn search(&self, stems: &[String], exact: bool) -> Vec<SearchResult> {
        if exact {
            self.exact_search(stems)
        } else {
            self.partial_search(stems)
        }
    }
}
