use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use serde::Serialize;
use serde_json::value::RawValue;

use crate::index::{InvertedIndex, SearchResult};

/// A [`SearchResult`] ready to serialize with its score formatted to
/// exactly 8 decimal digits.
///
/// Deriving `Serialize` straight off `f64` would let serde_json pick its
/// own (shortest-round-trip) digit count, breaking the bit-exact output
/// the spec requires. [`RawValue`] embeds our own `format!("{:.8}", _)`
/// string verbatim as the JSON number literal instead.
#[derive(Serialize)]
struct ResultJson<'a> {
    location: &'a str,
    matches: u32,
    score: Box<RawValue>,
}

fn to_result_json(result: &SearchResult) -> ResultJson<'_> {
    ResultJson {
        location: &result.location,
        matches: result.matches,
        score: RawValue::from_string(format!("{:.8}", result.score))
            .expect("formatted score is valid JSON number syntax"),
    }
}

fn open(path: &Path) -> io::Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Writes the full postings table as JSON: stems sorted, locations sorted
/// within each stem, positions sorted within each (stem, location) — the
/// order [`InvertedIndex`]'s `BTreeMap`/`BTreeSet` nesting already
/// guarantees during iteration.
pub fn write_index(index: &InvertedIndex, path: &Path) -> io::Result<()> {
    let writer = open(path)?;
    serde_json::to_writer_pretty(writer, index)?;
    Ok(())
}

/// Writes the per-location word-count table as JSON.
pub fn write_counts(counts: &BTreeMap<String, u32>, path: &Path) -> io::Result<()> {
    let writer = open(path)?;
    serde_json::to_writer_pretty(writer, counts)?;
    Ok(())
}

/// Writes the query-results map as JSON, canonical query key -> ranked
/// result list, with every score formatted to 8 decimal digits.
pub fn write_results(
    results: &BTreeMap<String, Vec<SearchResult>>,
    path: &Path,
) -> io::Result<()> {
    let as_json: BTreeMap<&str, Vec<ResultJson<'_>>> = results
        .iter()
        .map(|(key, hits)| {
            (
                key.as_str(),
                hits.iter().map(to_result_json).collect::<Vec<_>>(),
            )
        })
        .collect();

    let writer = open(path)?;
    serde_json::to_writer_pretty(writer, &as_json)?;
    Ok(())
}
