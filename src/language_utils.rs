use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities
///
/// The target language may be given as an ISO 639-1 / 639-2 code or as a
/// free-form label such as "Portuguese (Brazil)". Codes are resolved to their
/// English name for the prompt; anything else is used verbatim.

// ISO 639-2/B codes that differ from their 639-2/T form
const BIBLIOGRAPHIC_CODES: &[(&str, &str)] = &[
    ("fre", "fra"), ("ger", "deu"), ("dut", "nld"), ("gre", "ell"),
    ("chi", "zho"), ("cze", "ces"), ("ice", "isl"), ("alb", "sqi"),
    ("arm", "hye"), ("baq", "eus"), ("bur", "mya"), ("per", "fas"),
    ("geo", "kat"), ("may", "msa"), ("mac", "mkd"), ("rum", "ron"),
    ("slo", "slk"), ("wel", "cym"),
];

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => {
            if let Some(lang) = Language::from_639_1(&normalized_code) {
                return Ok(lang.to_639_3().to_string());
            }
        }
        3 => {
            if Language::from_639_3(&normalized_code).is_some() {
                return Ok(normalized_code);
            }
            if let Some((_, terminology)) = BIBLIOGRAPHIC_CODES.iter().find(|(b, _)| *b == normalized_code) {
                return Ok((*terminology).to_string());
            }
        }
        _ => {}
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Get the English language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}

/// Label used in prompts: the English name for ISO codes, the trimmed input otherwise
pub fn resolve_language_label(input: &str) -> String {
    let trimmed = input.trim();
    get_language_name(trimmed).unwrap_or_else(|_| trimmed.to_string())
}

/// Short tag used in output file names ("pt", "por", "portuguese-brazil")
pub fn language_file_tag(input: &str) -> String {
    let trimmed = input.trim();
    if normalize_to_part2t(trimmed).is_ok() {
        return trimmed.to_lowercase();
    }

    let mut tag = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        if c.is_alphanumeric() {
            tag.extend(c.to_lowercase());
        } else if !tag.is_empty() && !tag.ends_with('-') {
            tag.push('-');
        }
    }
    let tag = tag.trim_end_matches('-').to_string();
    if tag.is_empty() { "translated".to_string() } else { tag }
}
