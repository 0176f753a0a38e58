/*!
 * Translation context derived from a subtitle file name.
 *
 * "the.office.s02e05.720p.webrip.srt" tells the model it is translating an
 * episode of a series, which helps with names and register. The result is a
 * plain sentence or an empty string when nothing useful was found.
 */

use once_cell::sync::Lazy;
use regex::Regex;

// @const: Subtitle file extensions stripped before matching
static EXTENSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(srt|vtt|ass|ssa)$").unwrap()
});

// @const: Series naming schemes, tried in order
static SERIES_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(.+?)\.s(\d+)e(\d+)",                     // name.s01e01
        r"(.+?)\.season\.?(\d+)\.episode\.?(\d+)",  // name.season.1.episode.1
        r"(.+?)\.(\d+)x(\d+)",                      // name.1x01
        r"(.+?)\s+s(\d+)e(\d+)",                    // name s01e01
        r"(.+?)-s(\d+)e(\d+)",                      // name-s01e01
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

// @const: Movie naming schemes, tried in order
static MOVIE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(.+?)\.(\d{4})",  // name.2023
        r"(.+?)\s+(\d{4})", // name 2023
        r"(.+?)-(\d{4})",   // name-2023
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

// @const: Bare title, at most four dot separated parts
static NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^.]+(?:\.[^.]*){0,3})").unwrap()
});

static SEPARATOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[.\-_\s]+").unwrap()
});

/// Describe what a subtitle file is about from its name
pub fn derive_file_context(filename: &str) -> String {
    let clean_name = EXTENSION_REGEX.replace(filename.trim(), "").to_lowercase();
    if clean_name.is_empty() {
        return String::new();
    }

    let mut context = if let Some(caps) = SERIES_PATTERNS.iter().find_map(|p| p.captures(&clean_name)) {
        let season: u32 = caps[2].parse().unwrap_or(0);
        let episode: u32 = caps[3].parse().unwrap_or(0);
        format!(
            "This is a subtitle for the series \"{}\", season {}, episode {}.",
            title_case(&caps[1]), season, episode
        )
    } else if let Some(caps) = MOVIE_PATTERNS.iter().find_map(|p| p.captures(&clean_name)) {
        format!("This is a subtitle for the movie \"{}\" ({}).", title_case(&caps[1]), &caps[2])
    } else if let Some(caps) = NAME_REGEX.captures(&clean_name) {
        format!("This is a subtitle for \"{}\".", title_case(&caps[1]))
    } else {
        String::new()
    };

    let quality = source_details(&clean_name);
    if !quality.is_empty() {
        context.push_str(&format!(" Source: {}.", quality.join(", ")));
    }

    context.trim().to_string()
}

fn source_details(clean_name: &str) -> Vec<&'static str> {
    let mut details = Vec::new();

    if clean_name.contains("1080p") {
        details.push("high definition (1080p)");
    } else if clean_name.contains("720p") {
        details.push("HD (720p)");
    } else if clean_name.contains("4k") || clean_name.contains("2160p") {
        details.push("4K/Ultra HD");
    }

    if clean_name.contains("bluray") || clean_name.contains("blu-ray") {
        details.push("Blu-ray");
    } else if clean_name.contains("dvd") {
        details.push("DVD");
    } else if clean_name.contains("webrip") || clean_name.contains("web-dl") {
        details.push("streaming/web");
    } else if clean_name.contains("hdtv") {
        details.push("TV");
    }

    details
}

fn title_case(raw: &str) -> String {
    SEPARATOR_REGEX.replace_all(raw, " ")
        .trim()
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
