use anyhow::{Result, anyhow};
use isolang::Language;
use std::collections::HashMap;

/// Locale code utilities
///
/// Locales are BCP 47 style tags (`en`, `fr-CA`, `zh-Hans`, `pt_BR`). The
/// primary subtag must be an ISO 639-1 or ISO 639-3 language code.

/// Primary language subtag of a locale, lowercased
pub fn language_of(locale: &str) -> String {
    locale
        .trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Validate a locale code
pub fn validate_locale_code(locale: &str) -> Result<()> {
    let trimmed = locale.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Locale code cannot be empty"));
    }

    let language = language_of(trimmed);
    let known = match language.len() {
        2 => Language::from_639_1(&language).is_some(),
        3 => Language::from_639_3(&language).is_some(),
        _ => false,
    };
    if !known {
        return Err(anyhow!("Invalid locale code: {}", locale));
    }

    for subtag in trimmed.split(['-', '_']).skip(1) {
        let valid_len = (2..=8).contains(&subtag.len());
        if !valid_len || !subtag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(anyhow!("Invalid subtag '{}' in locale code: {}", subtag, locale));
        }
    }

    Ok(())
}

/// English name of the locale's language
pub fn get_language_name(locale: &str) -> Result<String> {
    let language = language_of(locale);
    let lang = match language.len() {
        2 => Language::from_639_1(&language),
        3 => Language::from_639_3(&language),
        _ => None,
    };
    lang.map(|l| l.to_name().to_string())
        .ok_or_else(|| anyhow!("Invalid locale code: {}", locale))
}

/// Map an internal locale code to the code a provider expects
///
/// Lookups try the exact code first, then the primary language subtag.
pub fn map_locale(locale: &str, locale_map: &HashMap<String, String>) -> String {
    if let Some(mapped) = locale_map.get(locale) {
        return mapped.clone();
    }
    let language = language_of(locale);
    locale_map
        .get(&language)
        .cloned()
        .unwrap_or_else(|| locale.to_string())
}
