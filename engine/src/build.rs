use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use walkdir::WalkDir;

use crate::index::facade::SharedIndex;
use crate::index::InvertedIndex;
use crate::token::{stem, tokenize};
use crate::workqueue::WorkQueue;

/// Walks a filesystem tree, tokenizes and stems every `.text`/`.txt` file,
/// and populates a [`SharedIndex`].
///
/// With `threads <= 1` each file is indexed directly against the shared
/// index. Otherwise each file becomes one task: it builds a private,
/// unlocked [`InvertedIndex`] and merges it into the shared index in one
/// `add_all` call — the local-merge pattern mandated by the spec, which
/// turns many small critical sections into one coarse one per file.
pub struct FileBuilder {
    threads: usize,
}

impl FileBuilder {
    pub fn new(threads: usize) -> Self {
        Self { threads }
    }

    /// Builds `index` from every regular file under `start_path` (symlinks
    /// followed) whose lowercased name ends in `.text` or `.txt`.
    ///
    /// `index` is an `Arc` so that, in multi-threaded mode, each per-file
    /// task can hold its own owning handle to the shared index for the
    /// `'static` lifetime a spawned thread requires.
    pub fn build(&self, start_path: &Path, index: &Arc<SharedIndex>) {
        let files = discover_files(start_path);

        if self.threads <= 1 {
            for file in files {
                index_file(&file, index);
            }
            return;
        }

        let pool = WorkQueue::new(self.threads);
        for file in files {
            let index = index.clone();
            pool.submit(move || {
                let mut local = InvertedIndex::new();
                index_file_into(&file, &mut local);
                if let Err(e) = index.add_all(local) {
                    log::error!("failed to merge local index for {}: {:?}", file, e);
                }
            });
        }
        pool.await_all();
        pool.shutdown();
    }
}

fn discover_files(start_path: &Path) -> Vec<String> {
    let mut files = Vec::new();
    for entry in WalkDir::new(start_path).follow_links(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::error!("failed to walk directory entry: {:?}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
        if name.ends_with(".text") || name.ends_with(".txt") {
            files.push(entry.path().to_string_lossy().into_owned());
        }
    }
    files.sort();
    files
}

fn index_file(path: &str, index: &SharedIndex) {
    let mut local = InvertedIndex::new();
    index_file_into(path, &mut local);
    if let Err(e) = index.add_all(local) {
        log::error!("failed to merge index for {}: {:?}", path, e);
    }
}

fn index_file_into(path: &str, local: &mut InvertedIndex) {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            log::error!("failed to open {}: {}", path, e);
            return;
        }
    };

    let mut counter: u32 = 0;
    for line in BufReader::new(file).lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::error!("failed to read a line from {}: {}", path, e);
                break;
            }
        };

        for token in tokenize(&line) {
            counter += 1;
            local.add(stem(&token), path, counter);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        writeln!(f, "{}", contents).unwrap();
        path
    }

    #[test]
    fn single_threaded_build_indexes_every_text_file() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.txt", "the quick quick fox");
        write_file(dir.path(), "b.md", "ignored file");

        let index = Arc::new(SharedIndex::new());
        FileBuilder::new(1).build(dir.path(), &index);

        assert_eq!(index.stem_set().len(), 3); // the, quick, fox
        let results = index.search(&["quick".to_string()], true);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matches, 2);
    }

    #[test]
    fn threaded_and_single_threaded_builds_agree() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "a.txt", "the quick brown fox");
        write_file(dir.path(), "b.txt", "the lazy dog sleeps");

        let single = Arc::new(SharedIndex::new());
        FileBuilder::new(1).build(dir.path(), &single);

        let multi = Arc::new(SharedIndex::new());
        FileBuilder::new(4).build(dir.path(), &multi);

        assert_eq!(
            serde_json::to_string(&single.snapshot()).unwrap(),
            serde_json::to_string(&multi.snapshot()).unwrap(),
        );
    }

    #[test]
    fn empty_directory_yields_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(SharedIndex::new());
        FileBuilder::new(1).build(dir.path(), &index);
        assert!(index.stem_set().is_empty());
    }
}
