use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::{Arc, Mutex};

use crate::index::facade::SharedIndex;
use crate::index::SearchResult;
use crate::token::{stem, tokenize};
use crate::workqueue::WorkQueue;

/// Runs a batch of free-text queries against a [`SharedIndex`] and
/// accumulates ranked results keyed by canonical query string.
pub struct SearchBuilder {
    threads: usize,
    exact: bool,
}

impl SearchBuilder {
    pub fn new(threads: usize, exact: bool) -> Self {
        Self { threads, exact }
    }

    /// Reads `query_file_path` line by line. Each line is tokenized,
    /// stemmed, and de-duplicated into a sorted set of stems; the sorted
    /// stems joined by single spaces form the canonical key used both to
    /// skip duplicate query lines and to index the returned result map.
    pub fn run_queries(
        &self,
        query_file_path: &std::path::Path,
        index: &Arc<SharedIndex>,
    ) -> BTreeMap<String, Vec<SearchResult>> {
        let lines = match read_lines(query_file_path) {
            Ok(lines) => lines,
            Err(e) => {
                log::error!("failed to open query file {:?}: {}", query_file_path, e);
                return BTreeMap::new();
            }
        };

        if self.threads <= 1 {
            let mut results = BTreeMap::new();
            for line in lines {
                run_one(&line, self.exact, index, &mut results);
            }
            return results;
        }

        let results = Arc::new(Mutex::new(BTreeMap::new()));
        let pool = WorkQueue::new(self.threads);
        let exact = self.exact;
        for line in lines {
            let index = index.clone();
            let results = results.clone();
            pool.submit(move || {
                let stems = canonical_stems(&line);
                if stems.is_empty() {
                    return;
                }
                let key = stems.join(" ");

                {
                    let guard = results.lock().expect("results lock poisoned");
                    if guard.contains_key(&key) {
                        return;
                    }
                }

                let ranked = index.search(&stems, exact);

                let mut guard = results.lock().expect("results lock poisoned");
                guard.entry(key).or_insert(ranked);
            });
        }
        pool.await_all();
        pool.shutdown();

        Arc::try_unwrap(results)
            .map(|m| m.into_inner().expect("results lock poisoned"))
            .unwrap_or_else(|arc| arc.lock().expect("results lock poisoned").clone())
    }
}

fn canonical_stems(line: &str) -> Vec<String> {
    use itertools::Itertools;

    tokenize(line)
        .iter()
        .map(|t| stem(t))
        .sorted()
        .dedup()
        .collect()
}

fn run_one(
    line: &str,
    exact: bool,
    index: &SharedIndex,
    results: &mut BTreeMap<String, Vec<SearchResult>>,
) {
    let stems = canonical_stems(line);
    if stems.is_empty() {
        return;
    }
    let key = stems.join(" ");
    if results.contains_key(&key) {
        return;
    }
    let ranked = index.search(&stems, exact);
    results.insert(key, ranked);
}

fn read_lines(path: &std::path::Path) -> std::io::Result<Vec<String>> {
    let file = File::open(path)?;
    BufReader::new(file).lines().collect()
}
