/*!
 * Locale-aware slug generation.
 *
 * Translations of slug fields are turned back into URL-safe identifiers:
 * transliterated to ASCII, lower-cased, quote characters removed and every
 * run of whitespace or punctuation collapsed into a single `-`.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::language_utils::language_of;

/// Separator placed between words of a slug
pub const SLUG_SEPARATOR: char = '-';

static QUOTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[`'"\u{2018}\u{2019}\u{201A}\u{201B}\u{201C}\u{201D}\u{201E}\u{00AB}\u{00BB}]"#)
        .expect("quote pattern is valid")
});

static NON_ALNUM_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("separator pattern is valid"));

/// Locale specific transliterations that take precedence over the generic map
fn locale_override(language: &str, c: char) -> Option<&'static str> {
    match (language, c) {
        ("de", 'ä') => Some("ae"),
        ("de", 'ö') => Some("oe"),
        ("de", 'ü') => Some("ue"),
        ("da" | "nb" | "nn" | "no", 'æ') => Some("ae"),
        ("da" | "nb" | "nn" | "no", 'ø') => Some("oe"),
        ("da" | "nb" | "nn" | "no", 'å') => Some("aa"),
        ("sv", 'ä') => Some("a"),
        ("sv", 'ö') => Some("o"),
        ("vi", 'đ') => Some("d"),
        _ => None,
    }
}

/// Generic Latin transliteration
fn transliterate(c: char) -> Option<&'static str> {
    let mapped = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' | 'ĉ' | 'ċ' => "c",
        'ď' | 'đ' | 'ð' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ğ' | 'ĝ' | 'ġ' | 'ģ' => "g",
        'ĥ' | 'ħ' => "h",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'ĵ' => "j",
        'ķ' => "k",
        'ĺ' | 'ļ' | 'ľ' | 'ł' => "l",
        'ñ' | 'ń' | 'ņ' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'œ' => "oe",
        'ŕ' | 'ř' => "r",
        'ś' | 'ş' | 'š' | 'ș' => "s",
        'ß' => "ss",
        'ť' | 'ţ' | 'ț' => "t",
        'þ' => "th",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        '&' => " and ",
        // combining dot left behind by lower-casing 'İ' outside Turkish
        '\u{0307}' => "",
        _ => return None,
    };
    Some(mapped)
}

/// Lower-case with the locale's casing rules
fn fold_case(text: &str, language: &str) -> String {
    match language {
        // Turkish and Azerbaijani keep the dotted/dotless distinction
        "tr" | "az" => text
            .chars()
            .flat_map(|c| match c {
                'I' => vec!['ı'],
                'İ' => vec!['i'],
                other => other.to_lowercase().collect(),
            })
            .collect(),
        _ => text.to_lowercase(),
    }
}

/// Build a URL-safe slug from translated text
pub fn slugify(text: &str, locale: &str) -> String {
    let language = language_of(locale);
    let without_quotes = QUOTES.replace_all(text, "");
    let lowered = fold_case(&without_quotes, &language);

    let mut ascii = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        if let Some(mapped) = locale_override(&language, c).or_else(|| transliterate(c)) {
            ascii.push_str(mapped);
        } else if c.is_ascii() {
            ascii.push(c);
        } else if c.is_alphanumeric() {
            // Scripts without a transliteration are kept verbatim
            ascii.push(c);
        } else {
            ascii.push(' ');
        }
    }

    collapse(&ascii)
}

/// Collapse separator runs while keeping non-Latin letters
fn collapse(text: &str) -> String {
    if text.is_ascii() {
        return NON_ALNUM_RUN
            .replace_all(text, SLUG_SEPARATOR.to_string().as_str())
            .trim_matches(SLUG_SEPARATOR)
            .to_string();
    }

    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;
    for c in text.chars() {
        if c.is_alphanumeric() && !c.is_uppercase() {
            if pending_separator && !slug.is_empty() {
                slug.push(SLUG_SEPARATOR);
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }
    slug
}
