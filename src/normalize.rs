//! Text normalization for catalog searches and match scoring.
//! Used by the query planner, the scorer and the `plan-queries` tool.
//!
//! CRITICAL: `clean_title` feeds both the queries we send and the strings we
//! score against. Any change here shifts match rates. Run tests after changes.

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Title cleanup patterns (applied in order, case-insensitive).
pub static TITLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Lyric annotations: "(Lyrics)", "(with lyrics)", "(Lyric Video)"
        Regex::new(r"(?i)\s*\([^)]*lyric[^)]*\)").unwrap(),
        // Any bracketed run: "[HD]", "[Official Video]", "[Μουσική]"
        Regex::new(r"\s*\[[^\]]*\]").unwrap(),
        // Official annotations: "(Official Video)", "(Official Audio)", "(Official)"
        Regex::new(r"(?i)\s*\([^)]*official[^)]*\)").unwrap(),
        // Trailing suffixes: "- Lyrics", "– Official Video", "- HD 1080p"
        Regex::new(r"(?i)\s*[-–—]\s*(?:lyrics?|official|video|audio|hd|hq|4k|1080p|720p)\b.*$").unwrap(),
        // Unbracketed "Official Music Video" / "Official Audio" runs
        Regex::new(r"(?i)\s*\bofficial\b[^()\[\]]*?\b(?:video|audio)\b\)?").unwrap(),
        // Parenthesised quality tags: "(HD)", "(1080p)"
        Regex::new(r"(?i)\s*\(\s*(?:hd|hq|4k|1080p|720p)\s*\)").unwrap(),
        // Standalone quality tags: "Song HD", "Song 4K"
        Regex::new(r"(?i)\b(?:hd|hq|4k|1080p|720p)\b").unwrap(),
        // Parenthesised Greek annotations: "(Στίχοι)", "(Ζωντανή Ηχογράφηση)"
        Regex::new(r"\s*\([^)]*\p{Greek}[^)]*\)").unwrap(),
    ]
});

/// Compound artist separators: ",", "&", "feat.", "ft.", "featuring",
/// and the Greek conjunctions "και" (and) / "με" (with).
pub static ARTIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:,|&|\bfeat\.|\bft\.|\bfeaturing\b|\bκαι\b|\bμε\b)\s*").unwrap()
});

/// Regex to collapse any whitespace run into a single space
pub static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

// ============================================================================
// GREEK TRANSLITERATION
// ============================================================================

/// Greek to Latin ("Greeklish") character table.
/// Accented and diaeresis vowels map to their base Latin letter.
pub static GREEK_TO_LATIN: Lazy<FxHashMap<char, &'static str>> = Lazy::new(|| {
    let mut m = FxHashMap::default();

    // === LOWERCASE ===
    m.insert('α', "a");
    m.insert('ά', "a");
    m.insert('β', "v");
    m.insert('γ', "g");
    m.insert('δ', "d");
    m.insert('ε', "e");
    m.insert('έ', "e");
    m.insert('ζ', "z");
    m.insert('η', "i");
    m.insert('ή', "i");
    m.insert('θ', "th");
    m.insert('ι', "i");
    m.insert('ί', "i");
    m.insert('ϊ', "i");
    m.insert('ΐ', "i");
    m.insert('κ', "k");
    m.insert('λ', "l");
    m.insert('μ', "m");
    m.insert('ν', "n");
    m.insert('ξ', "x");
    m.insert('ο', "o");
    m.insert('ό', "o");
    m.insert('π', "p");
    m.insert('ρ', "r");
    m.insert('σ', "s");
    m.insert('ς', "s");
    m.insert('τ', "t");
    m.insert('υ', "y");
    m.insert('ύ', "y");
    m.insert('ϋ', "y");
    m.insert('ΰ', "y");
    m.insert('φ', "f");
    m.insert('χ', "ch");
    m.insert('ψ', "ps");
    m.insert('ω', "o");
    m.insert('ώ', "o");

    // === UPPERCASE ===
    m.insert('Α', "A");
    m.insert('Ά', "A");
    m.insert('Β', "V");
    m.insert('Γ', "G");
    m.insert('Δ', "D");
    m.insert('Ε', "E");
    m.insert('Έ', "E");
    m.insert('Ζ', "Z");
    m.insert('Η', "I");
    m.insert('Ή', "I");
    m.insert('Θ', "Th");
    m.insert('Ι', "I");
    m.insert('Ί', "I");
    m.insert('Ϊ', "I");
    m.insert('Κ', "K");
    m.insert('Λ', "L");
    m.insert('Μ', "M");
    m.insert('Ν', "N");
    m.insert('Ξ', "X");
    m.insert('Ο', "O");
    m.insert('Ό', "O");
    m.insert('Π', "P");
    m.insert('Ρ', "R");
    m.insert('Σ', "S");
    m.insert('Τ', "T");
    m.insert('Υ', "Y");
    m.insert('Ύ', "Y");
    m.insert('Ϋ', "Y");
    m.insert('Φ', "F");
    m.insert('Χ', "Ch");
    m.insert('Ψ', "Ps");
    m.insert('Ω', "O");
    m.insert('Ώ', "O");

    m
});

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check whether a character belongs to the Greek and Coptic or Greek Extended blocks.
pub fn is_greek_char(c: char) -> bool {
    matches!(c as u32, 0x0370..=0x03FF | 0x1F00..=0x1FFF)
}

/// True when the text contains at least one Greek character.
pub fn is_greek(text: &str) -> bool {
    text.chars().any(is_greek_char)
}

/// Collapse whitespace runs to a single space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s, " ").trim().to_string()
}

/// One pass of every title pattern followed by whitespace collapse.
fn clean_title_pass(title: &str) -> String {
    let mut result = title.to_string();
    for pattern in TITLE_PATTERNS.iter() {
        result = pattern.replace_all(&result, "").to_string();
    }
    collapse_whitespace(&result)
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Strip promotional noise from a title.
/// e.g., "Song Title (Official Video) [HD]" → "Song Title"
///
/// Passes repeat until nothing changes, so the result is a fixed point and
/// `clean_title(clean_title(x)) == clean_title(x)`.
pub fn clean_title(title: &str) -> String {
    let mut current = collapse_whitespace(title);
    loop {
        let next = clean_title_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Title used for both searching and scoring: the cleaned title, or the
/// whitespace-collapsed raw title when cleaning leaves nothing ("HD").
pub fn effective_title(title: &str) -> String {
    let cleaned = clean_title(title);
    if cleaned.is_empty() {
        collapse_whitespace(title)
    } else {
        cleaned
    }
}

/// Transliterate Greek script to Latin ("Greeklish").
/// e.g., "Μια Αγάπη" → "Mia Agapi", "Θάλασσα" → "Thalassa"
///
/// Input is composed to NFC first so decomposed accents (α + U+0301) hit the
/// table. Characters outside the table pass through unchanged.
pub fn greek_to_greeklish(text: &str) -> String {
    if !is_greek(text) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for c in text.nfc() {
        match GREEK_TO_LATIN.get(&c) {
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out
}

/// Split a compound artist string into its credited parts.
/// e.g., "Artist A feat. Artist B & Artist C" → ["Artist A", "Artist B", "Artist C"]
pub fn split_artist_parts(artist: &str) -> Vec<String> {
    ARTIST_SEPARATOR
        .split(artist)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// The first credited artist, if any.
/// e.g., "Mustard, Migos" → Some("Mustard"), "" → None
pub fn primary_artist(artist: &str) -> Option<String> {
    split_artist_parts(artist).into_iter().next()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_title_promotional_markers() {
        assert_eq!(clean_title("Song Title (Official Video) [HD]"), "Song Title");
        assert_eq!(clean_title("Song Title - Lyrics"), "Song Title");
        assert_eq!(clean_title("Song (Official Audio)"), "Song");
        assert_eq!(clean_title("Song (lyrics on screen)"), "Song");
        assert_eq!(clean_title("Song Official Music Video"), "Song");
        assert_eq!(clean_title("Song – Official Video 2019"), "Song");
        assert_eq!(clean_title("Song 1080p"), "Song");
        assert_eq!(clean_title("Song (HQ)"), "Song");
    }

    #[test]
    fn test_clean_title_greek_annotations() {
        assert_eq!(clean_title("Μια Αγάπη (Official Audio)"), "Μια Αγάπη");
        assert_eq!(clean_title("Song (Στίχοι)"), "Song");
        assert_eq!(clean_title("Song [Ζωντανά]"), "Song");
        // Greek outside brackets is kept
        assert_eq!(clean_title("Θάλασσα"), "Θάλασσα");
    }

    #[test]
    fn test_clean_title_whitespace_and_empty() {
        assert_eq!(clean_title("  Song    Title  "), "Song Title");
        assert_eq!(clean_title(""), "");
        assert_eq!(clean_title("   "), "");
        // Words that merely contain a quality tag survive
        assert_eq!(clean_title("Shadow Hdrama"), "Shadow Hdrama");
    }

    #[test]
    fn test_clean_title_idempotent() {
        let samples = [
            "Song Title (Official Video) [HD]",
            "Song - HD - Lyrics",
            "A  (Lyrics)  [x] (Official)  B",
            "Μια Αγάπη (Official Audio)",
            "HD",
            "Track (feat. Someone)",
            "((nested (official) parens))",
        ];
        for s in samples {
            let once = clean_title(s);
            assert_eq!(clean_title(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_effective_title_keeps_noise_only_titles() {
        assert_eq!(effective_title("Song (Official Video)"), "Song");
        assert_eq!(effective_title("HD"), "HD");
        assert_eq!(effective_title("  [Live]  "), "[Live]");
        assert_eq!(effective_title("   "), "");
    }

    #[test]
    fn test_greek_to_greeklish() {
        assert_eq!(greek_to_greeklish("Μια Αγάπη"), "Mia Agapi");
        assert_eq!(greek_to_greeklish("Θάλασσα"), "Thalassa");
        assert_eq!(greek_to_greeklish("ψυχή"), "psychi");
        assert_eq!(greek_to_greeklish("Γιάννης"), "Giannis");
        assert_eq!(greek_to_greeklish(""), "");
    }

    #[test]
    fn test_greek_to_greeklish_decomposed_accents() {
        // α followed by a combining acute accent
        assert_eq!(greek_to_greeklish("\u{03B1}\u{0301}"), "a");
    }

    #[test]
    fn test_greek_to_greeklish_fixed_points() {
        assert_eq!(greek_to_greeklish("Hello, World!"), "Hello, World!");
        let once = greek_to_greeklish("Μια Αγάπη - Live 2021");
        assert_eq!(greek_to_greeklish(&once), once);
        // Mixed script keeps the Latin part
        assert_eq!(greek_to_greeklish("DJ Γιώργος"), "DJ Giorgos");
    }

    #[test]
    fn test_is_greek() {
        assert!(is_greek("Μια"));
        assert!(is_greek("DJ Γιώργος"));
        assert!(!is_greek("Mia Agapi"));
        assert!(!is_greek(""));
    }

    #[test]
    fn test_split_artist_parts() {
        assert_eq!(
            split_artist_parts("Artist A feat. Artist B & Artist C"),
            vec!["Artist A", "Artist B", "Artist C"]
        );
        assert_eq!(split_artist_parts("Mustard, Migos"), vec!["Mustard", "Migos"]);
        assert_eq!(split_artist_parts("Drake ft. Rihanna"), vec!["Drake", "Rihanna"]);
        assert_eq!(split_artist_parts("Γιάννης και Μαρία"), vec!["Γιάννης", "Μαρία"]);
        assert_eq!(split_artist_parts("Νίκος με Ελένη"), vec!["Νίκος", "Ελένη"]);
        // Empty parts are dropped
        assert_eq!(split_artist_parts("A, , B,"), vec!["A", "B"]);
        assert!(split_artist_parts("").is_empty());
        // Separator words inside names are not split
        assert_eq!(split_artist_parts("Crafty Mekaisa"), vec!["Crafty Mekaisa"]);
    }

    #[test]
    fn test_primary_artist() {
        assert_eq!(primary_artist("Mustard, Migos"), Some("Mustard".to_string()));
        assert_eq!(primary_artist("Beatles"), Some("Beatles".to_string()));
        assert_eq!(primary_artist("  "), None);
    }
}
