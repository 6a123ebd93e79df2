//! Company-name canonicalization.
//!
//! Names are lowercased, stripped of legal-entity suffixes and punctuation,
//! split into tokens, sorted, and reduced to singular nouns. The token order
//! of the input never matters: "Fresh Fruits" and "Fruits Fresh" normalize to
//! the same string.

use once_cell::sync::Lazy;
use regex::Regex;

static LEGAL_SUFFIXES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(co|inc|ltd|gmbh|c\.o|limited|corporation|s\.a\.r\.l)\b")
        .expect("valid legal suffix pattern")
});

/// The undotted suffixes as bare tokens.
const LEGAL_SUFFIX_WORDS: [&str; 6] = ["co", "inc", "ltd", "gmbh", "limited", "corporation"];

static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("valid punctuation pattern"));

/// Plurals that do not follow a suffix rule.
const IRREGULAR_PLURALS: [(&str, &str); 14] = [
    ("children", "child"),
    ("feet", "foot"),
    ("geese", "goose"),
    ("men", "man"),
    ("mice", "mouse"),
    ("teeth", "tooth"),
    ("women", "woman"),
    ("leaves", "leaf"),
    ("loaves", "loaf"),
    ("halves", "half"),
    ("shelves", "shelf"),
    ("knives", "knife"),
    ("wives", "wife"),
    ("lives", "life"),
];

/// Nouns whose singular ends in "ie", so "-ies" must not become "-y".
const IE_SINGULARS: [&str; 14] = [
    "brownie", "calorie", "cookie", "genie", "goodie", "hippie", "lie", "movie", "pie", "prairie",
    "smoothie", "tie", "veggie", "zombie",
];

/// Nouns whose singular ends in "oe".
const OE_SINGULARS: [&str; 5] = ["canoe", "floe", "hoe", "shoe", "toe"];

/// Words ending in "s" that are already singular.
const INVARIANT_ENDINGS: [&str; 4] = ["ss", "us", "is", "ics"];

/// Reduces an English noun to its singular form.
///
/// Rule-based: irregular forms first, then the usual plural suffixes. Words of
/// three letters or fewer are returned unchanged, and so is any output of this
/// function (it is idempotent).
pub fn lemmatize_noun(word: &str) -> String {
    if let Some((_, singular)) = IRREGULAR_PLURALS.iter().find(|(plural, _)| *plural == word) {
        return singular.to_string();
    }

    if word.chars().count() <= 3 || !word.ends_with('s') || !word.chars().all(char::is_alphabetic) {
        return word.to_string();
    }

    if INVARIANT_ENDINGS.iter().any(|ending| word.ends_with(ending)) {
        return word.to_string();
    }

    if let Some(stem) = word.strip_suffix("ies") {
        let ie_form = format!("{}ie", stem);
        if IE_SINGULARS.contains(&ie_form.as_str()) {
            return ie_form;
        }
        return format!("{}y", stem);
    }

    if let Some(stem) = word.strip_suffix("oes") {
        let oe_form = format!("{}oe", stem);
        if OE_SINGULARS.contains(&oe_form.as_str()) {
            return oe_form;
        }
        return format!("{}o", stem);
    }

    for sibilant in ["sses", "xes", "zzes", "ches", "shes"] {
        if word.ends_with(sibilant) {
            return word[..word.len() - 2].to_string();
        }
    }

    word[..word.len() - 1].to_string()
}

/// Canonical form of a company name. `None` becomes the empty string.
pub fn normalize_company_name(name: Option<&str>) -> String {
    let Some(name) = name else {
        return String::new();
    };

    let lowered = name.to_lowercase();
    let without_suffixes = LEGAL_SUFFIXES.replace_all(&lowered, "");
    let without_punctuation = PUNCTUATION.replace_all(&without_suffixes, "");

    let mut tokens: Vec<&str> = without_punctuation.split_whitespace().collect();
    tokens.sort_unstable();

    // A token can turn into a suffix only after punctuation removal ("c-o") or
    // lemmatization ("incs"), so drop those here as well.
    let mut lemmas: Vec<String> = tokens
        .into_iter()
        .map(lemmatize_noun)
        .filter(|lemma| !LEGAL_SUFFIX_WORDS.contains(&lemma.as_str()))
        .collect();
    // "carrots" sorts before "cars" but "carrot" sorts after "car": sort the
    // lemmas again so the output is a fixed point.
    lemmas.sort();
    lemmas.join(" ")
}
