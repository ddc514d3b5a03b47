//! Language-to-script mapping for transliteration
//!
//! Maps BCP-47 primary language subtags to the ISO 15924 script codes the
//! transliteration providers understand. An unmapped language is a
//! [`CoreError::UnsupportedLanguage`]; there is deliberately no fallback
//! script, so unsupported pairs fail before any provider call.

use crate::{CoreError, CoreResult};

/// Returns the ISO 15924 script code for a language, if known.
///
/// Region subtags are ignored, so "en-US" maps like "en".
pub fn script_for(lang: &str) -> Option<&'static str> {
    match primary_subtag(lang).as_str() {
        "en" => Some("Latn"),
        "hi" => Some("Deva"),
        "zh" => Some("Hans"),
        "ja" => Some("Jpan"),
        "ko" => Some("Hang"),
        "ar" => Some("Arab"),
        "th" => Some("Thai"),
        _ => None,
    }
}

/// Resolves the (from, to) script pair for a transliteration.
pub fn script_pair(source_lang: &str, target_lang: &str) -> CoreResult<(&'static str, &'static str)> {
    let from = script_for(source_lang)
        .ok_or_else(|| CoreError::UnsupportedLanguage(source_lang.to_string()))?;
    let to = script_for(target_lang)
        .ok_or_else(|| CoreError::UnsupportedLanguage(target_lang.to_string()))?;
    Ok((from, to))
}

/// Lowercased primary subtag of a BCP-47 language code ("en-US" -> "en").
fn primary_subtag(lang: &str) -> String {
    lang.trim()
        .split(|c| c == '-' || c == '_')
        .next()
        .unwrap_or("")
        .to_lowercase()
}
