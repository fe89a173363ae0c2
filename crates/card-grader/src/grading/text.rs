//! Keyword and measurement scanning over free-text defect descriptions.

use regex::Regex;
use std::sync::OnceLock;

const NEGATIONS: [&str; 6] = ["no", "not", "without", "zero", "never", "free"];
const CLAUSE_BREAKS: [&str; 6] = ["but", "and", "with", "though", "although", "however"];
const NEGATION_WINDOW: usize = 3;

/// True when `pattern` matches somewhere in `text` without being negated by one of
/// the few words immediately before it ("no creases", "without any tears").
pub(crate) fn affirms(pattern: &Regex, text: &str) -> bool {
    pattern
        .find_iter(text)
        .any(|found| !is_negated(&text[..found.start()]))
}

/// Plain substring variant of [`affirms`] for callers that scan for fixed phrases.
pub(crate) fn affirms_phrase(text: &str, phrase: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered
        .match_indices(phrase)
        .any(|(start, _)| !is_negated(&lowered[..start]))
}

/// A negation only reaches forward within its own clause: punctuation (commas
/// included) and joining words such as "but" or "and" end it.
fn is_negated(prefix: &str) -> bool {
    let clause = prefix
        .rfind(|c: char| matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '\n'))
        .map_or(prefix, |boundary| &prefix[boundary + 1..]);
    for word in clause
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .rev()
        .take(NEGATION_WINDOW)
    {
        let word = word.to_ascii_lowercase();
        if CLAUSE_BREAKS.contains(&word.as_str()) {
            return false;
        }
        if NEGATIONS.contains(&word.as_str()) {
            return true;
        }
    }
    false
}

pub(crate) fn cached(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("literal pattern compiles"))
}

fn percent_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    cached(&PATTERN, r"(\d+(?:\.\d+)?)\s*%")
}

fn millimetre_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    cached(&PATTERN, r"(?i)(\d+(?:\.\d+)?)\s*mm\b")
}

fn ratio_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    cached(&PATTERN, r"(\d+(?:\.\d+)?)\s*/\s*(\d+(?:\.\d+)?)")
}

/// Largest percentage mentioned in `text`, if any.
pub(crate) fn max_percentage(text: &str) -> Option<f64> {
    max_capture(percent_pattern(), text)
}

/// Largest millimetre measurement mentioned in `text`, if any.
pub(crate) fn max_millimetres(text: &str) -> Option<f64> {
    max_capture(millimetre_pattern(), text)
}

fn max_capture(pattern: &Regex, text: &str) -> Option<f64> {
    pattern
        .captures_iter(text)
        .filter_map(|captures| captures.get(1)?.as_str().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .fold(None, |best: Option<f64>, value| {
            Some(best.map_or(value, |current| current.max(value)))
        })
}

/// First "NN/MM" pair in `text`.
pub(crate) fn ratio_pair(text: &str) -> Option<(f64, f64)> {
    let captures = ratio_pattern().captures(text)?;
    let first = captures.get(1)?.as_str().parse::<f64>().ok()?;
    let second = captures.get(2)?.as_str().parse::<f64>().ok()?;
    Some((first, second))
}
