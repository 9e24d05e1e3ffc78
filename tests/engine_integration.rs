use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use engine::html::Fetcher;
use engine::{Crawler, FileBuilder, SearchBuilder, SharedIndex};

fn write_file(dir: &std::path::Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

#[test]
fn build_then_exact_search_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.txt", "the quick brown fox jumps over the lazy dog");
    write_file(dir.path(), "b.txt", "the dog barks at the quick fox");
    write_file(dir.path(), "c.md", "this file should be ignored entirely");

    let index = Arc::new(SharedIndex::new());
    FileBuilder::new(4).build(dir.path(), &index);

    let query_path = dir.path().join("queries.txt");
    fs::write(&query_path, "fox\ndog\n").unwrap();

    let results = SearchBuilder::new(1, true).run_queries(&query_path, &index);

    let fox = results.get("fox").expect("fox query present");
    assert_eq!(fox.len(), 2);
    // Both files have one "fox" out of their own word counts; ties break on
    // matches then case-insensitive location, so b.txt (shorter, fewer
    // distinct words but fox appears once out of 7) still resolves
    // deterministically either way — just assert both locations are present.
    let locations: Vec<&str> = fox.iter().map(|r| r.location.as_str()).collect();
    assert!(locations.iter().any(|l| l.ends_with("a.txt")));
    assert!(locations.iter().any(|l| l.ends_with("b.txt")));

    let dog = results.get("dog").unwrap();
    assert_eq!(dog.len(), 2);

    assert!(!index.contains_location("this", &dir.path().join("c.md").to_string_lossy()));
}

#[test]
fn partial_search_matches_prefixes_across_the_whole_index() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.txt", "quick quickest quiche quietly");

    let index = Arc::new(SharedIndex::new());
    FileBuilder::new(1).build(dir.path(), &index);

    let query_path = dir.path().join("queries.txt");
    fs::write(&query_path, "qui\n").unwrap();

    let results = SearchBuilder::new(1, false).run_queries(&query_path, &index);
    let hits = results.get("qui").unwrap();
    assert_eq!(hits.len(), 1);
    // every token in the file stems to something starting with "qui"
    assert_eq!(hits[0].matches, 4);
}

#[test]
fn parallel_build_is_deterministic_regardless_of_thread_count() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..12 {
        write_file(
            dir.path(),
            &format!("file{}.txt", i),
            &format!("word{} repeats repeats repeats", i % 3),
        );
    }

    let single = Arc::new(SharedIndex::new());
    FileBuilder::new(1).build(dir.path(), &single);

    let multi = Arc::new(SharedIndex::new());
    FileBuilder::new(8).build(dir.path(), &multi);

    assert_eq!(
        serde_json::to_string(&single.snapshot()).unwrap(),
        serde_json::to_string(&multi.snapshot()).unwrap(),
    );
}

struct MapFetcher {
    pages: HashMap<String, String>,
}

impl Fetcher for MapFetcher {
    fn fetch(&self, url: &str, _max_redirects: usize) -> Option<String> {
        self.pages.get(url).cloned()
    }
}

fn linked_page(links: &[&str], text: &str) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<a href="{}">link</a>"#, l))
        .collect();
    format!("<html><body>{}<p>{}</p></body></html>", anchors, text)
}

#[test]
fn bounded_crawl_stays_within_budget_and_indexes_the_seed() {
    let mut pages = HashMap::new();
    pages.insert(
        "https://site.test/".to_string(),
        linked_page(
            &[
                "https://site.test/one",
                "https://site.test/two",
                "https://site.test/three",
            ],
            "seed page content",
        ),
    );
    pages.insert(
        "https://site.test/one".to_string(),
        linked_page(&["https://site.test/two"], "page one content"),
    );
    pages.insert(
        "https://site.test/two".to_string(),
        linked_page(&[], "page two content"),
    );
    pages.insert(
        "https://site.test/three".to_string(),
        linked_page(&[], "page three content"),
    );

    let fetcher = Arc::new(MapFetcher { pages });
    let crawler = Crawler::new(fetcher, 4);
    let index = Arc::new(SharedIndex::new());

    crawler.run("https://site.test/", 3, 2, &index);

    assert!(index.contains_location("seed", "https://site.test/"));
    // seed + at most 2 further pages, and "two" is reachable via two
    // different paths but must only ever be visited once.
    assert!(index.counts().len() <= 3);
}

#[test]
fn index_and_results_json_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "a.txt", "alpha beta beta gamma");

    let index = Arc::new(SharedIndex::new());
    FileBuilder::new(1).build(dir.path(), &index);

    let index_path = dir.path().join("index.json");
    engine::json::write_index(&index.snapshot(), &index_path).unwrap();
    let index_json = fs::read_to_string(&index_path).unwrap();
    assert!(index_json.contains("beta"));

    let query_path = dir.path().join("queries.txt");
    fs::write(&query_path, "beta\n").unwrap();
    let results = SearchBuilder::new(1, true).run_queries(&query_path, &index);

    let results_path = dir.path().join("results.json");
    engine::json::write_results(&results, &results_path).unwrap();
    let results_json = fs::read_to_string(&results_path).unwrap();

    // score is 2/4 = 0.5, formatted to exactly 8 decimal digits.
    assert!(results_json.contains("0.50000000"));
}
