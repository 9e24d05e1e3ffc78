use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::index::{InvertedIndex, SearchResult};
use crate::rwlock::RwLock;

/// Routes every [`InvertedIndex`] operation through a [`RwLock`]: mutators
/// hold the writer for their entire duration, reads hold the reader.
///
/// Every read operation copies its result out of the locked region before
/// returning — returning a borrowed view would be unsound once build and
/// search tasks can run concurrently, since nothing would stop the index
/// from mutating mid-iteration on the caller's side.
///
/// Composition, not inheritance: this wraps an [`InvertedIndex`] rather
/// than subclassing it, so "thread-safe index" and "plain index" are two
/// distinct types sharing one operation set instead of a method-overriding
/// hierarchy.
#[derive(Default)]
pub struct SharedIndex {
    lock: RwLock,
    inner: std::cell::UnsafeCell<InvertedIndex>,
}

// SAFETY: all access to `inner` goes through `lock`, which enforces
// single-writer/multi-reader mutual exclusion before any pointer into
// `inner` is dereferenced.
unsafe impl Sync for SharedIndex {}
unsafe impl Send for SharedIndex {}

impl SharedIndex {
    pub fn new() -> Self {
        Self {
            lock: RwLock::new(),
            inner: std::cell::UnsafeCell::new(InvertedIndex::new()),
        }
    }

    fn with_read<R>(&self, f: impl FnOnce(&InvertedIndex) -> R) -> R {
        self.lock.read_lock();
        let result = f(unsafe { &*self.inner.get() });
        self.lock.read_unlock();
        result
    }

    fn with_write<R>(&self, f: impl FnOnce(&mut InvertedIndex) -> R) -> Result<R> {
        self.lock.write_lock();
        let result = f(unsafe { &mut *self.inner.get() });
        self.lock.write_unlock()?;
        Ok(result)
    }

    pub fn add(&self, stem: impl Into<String>, location: impl Into<String>, position: u32) -> Result<()> {
        self.with_write(|index| index.add(stem, location, position))
    }

    /// Merges `other` in under a single write-lock hold, so observers see
    /// either the pre-merge or post-merge state, never a partial merge.
    pub fn add_all(&self, other: InvertedIndex) -> Result<()> {
        self.with_write(|index| index.add_all(other))
    }

    pub fn contains_stem(&self, stem: &str) -> bool {
        self.with_read(|index| index.contains_stem(stem))
    }

    pub fn contains_location(&self, stem: &str, location: &str) -> bool {
        self.with_read(|index| index.contains_location(stem, location))
    }

    pub fn contains_position(&self, stem: &str, location: &str, position: u32) -> bool {
        self.with_read(|index| index.contains_position(stem, location, position))
    }

    pub fn path_set(&self, stem: &str) -> BTreeSet<String> {
        self.with_read(|index| index.path_set(stem))
    }

    pub fn position_set(&self, stem: &str, location: &str) -> BTreeSet<u32> {
        self.with_read(|index| index.position_set(stem, location))
    }

    pub fn stem_set(&self) -> BTreeSet<String> {
        self.with_read(|index| index.stem_set())
    }

    pub fn counts(&self) -> BTreeMap<String, u32> {
        self.with_read(|index| index.counts())
    }

    pub fn search(&self, stems: &[String], exact: bool) -> Vec<SearchResult> {
        self.with_read(|index| index.search(stems, exact))
    }

    /// Snapshot of the full postings table, in the sorted order the JSON
    /// writer relies on for bit-exact output.
    pub fn snapshot(&self) -> InvertedIndex {
        self.with_read(|index| index.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_adds_all_land() {
        let shared = Arc::new(SharedIndex::new());
        let mut handles = vec![];
        for i in 0..8u32 {
            let shared = shared.clone();
            handles.push(thread::spawn(move || {
                let mut local = InvertedIndex::new();
                local.add("word", format!("/file{}.txt", i), 1);
                shared.add_all(local).unwrap();
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(shared.path_set("word").len(), 8);
    }

    #[test]
    fn reads_and_writes_interleave_safely() {
        let shared = Arc::new(SharedIndex::new());
        shared.add("word", "/a.txt", 1).unwrap();

        let writer_shared = shared.clone();
        let writer = thread::spawn(move || {
            for i in 0..50u32 {
                writer_shared.add("word", format!("/f{}.txt", i), 1).unwrap();
            }
        });

        for _ in 0..50 {
            let _ = shared.search(&["word".to_string()], true);
        }

        writer.join().unwrap();
        assert!(shared.path_set("word").len() >= 50);
    }
}
