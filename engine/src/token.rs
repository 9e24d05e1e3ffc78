use rust_stemmers::{Algorithm, Stemmer};

/// Splits `text` into non-empty, lowercase, ASCII-letter-only tokens in
/// text order (repeats included). This is the tokenizer contract the rest
/// of the engine assumes: splitting happens on any non-ASCII-letter byte,
/// so digits and punctuation are treated purely as separators.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
        .collect()
}

/// Reduces a token to its Snowball-English stem.
///
/// A pure function, no shared state: identical input always yields
/// identical output, which is what lets build tasks stem without locking.
pub fn stem(token: &str) -> String {
    let stemmer = Stemmer::create(Algorithm::English);
    stemmer.stem(token).into_owned()
}
