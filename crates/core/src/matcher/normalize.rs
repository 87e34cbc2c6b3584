//! Title normalization and fuzzy similarity.

/// Normalize a title for comparison.
///
/// Lowercases, folds common accented letters to ASCII, turns `&` into `and`,
/// drops apostrophes, replaces every other non-alphanumeric character with a
/// space and collapses whitespace.
pub fn normalize_title(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        let lower = c.to_lowercase();
        for c in lower {
            if let Some(folded) = fold_accent(c) {
                out.push_str(folded);
            } else if c.is_ascii_alphanumeric() {
                out.push(c);
            } else if c == '&' {
                out.push_str(" and ");
            } else if matches!(c, '\'' | '\u{2019}' | '`') {
                // "Don't" and "Dont" must compare equal
            } else if c.is_alphanumeric() {
                out.push(c);
            } else {
                out.push(' ');
            }
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized tokens of a title.
pub fn title_tokens(text: &str) -> Vec<String> {
    normalize_title(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn fold_accent(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => "a",
        'æ' => "ae",
        'ç' | 'č' | 'ć' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'ł' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => "o",
        'œ' => "oe",
        'ř' => "r",
        'ś' | 'š' => "s",
        'ß' => "ss",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' => "u",
        'ý' | 'ÿ' => "y",
        'ž' | 'ź' | 'ż' => "z",
        _ => return None,
    };
    Some(folded)
}

/// Roman numerals read as sequel numbers. A lone "i" is too often a word.
const ROMAN_NUMERALS: &[&str] = &[
    "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x", "xi", "xii", "xiii", "xiv", "xv",
    "xvi", "xvii", "xviii", "xix", "xx",
];

/// Value of a numeric or roman-numeral title token.
pub fn numeral_value(token: &str) -> Option<u32> {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        return token.parse().ok();
    }
    ROMAN_NUMERALS
        .iter()
        .position(|r| *r == token)
        .map(|pos| pos as u32 + 2)
}

/// Sorted numeral values of a normalized title; "alpha ii" and "alpha 2" agree.
pub fn title_numerals(title: &str) -> Vec<u32> {
    let mut numerals: Vec<u32> = title.split_whitespace().filter_map(numeral_value).collect();
    numerals.sort_unstable();
    numerals
}

/// Normalized title with roman numerals rewritten as digits.
pub fn canonical_numerals(title: &str) -> String {
    title
        .split_whitespace()
        .map(|t| match numeral_value(t) {
            Some(n) if !t.bytes().all(|b| b.is_ascii_digit()) => n.to_string(),
            _ => t.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Levenshtein edit distance between two strings (by char).
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Two rolling rows are enough
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0usize; b_len + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Similarity ratio in `[0.0, 1.0]` derived from edit distance.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(a, b) as f64 / max_len as f64
}
