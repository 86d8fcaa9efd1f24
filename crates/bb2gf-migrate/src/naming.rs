//! Destination alias generation and repository filters.

use crate::config::{FilterConfig, NamingConfig};
use crate::error::{MigrationError, Result};

use once_cell::sync::Lazy;
use regex::Regex;

static NON_ASCII_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("Invalid regex"));

static NON_UNICODE_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("Invalid regex"));

/// Derive the destination alias for a repository name.
///
/// Applies the ordered replace map, then (if enabled) slugifies with
/// optional Cyrillic transliteration, then (if enabled) lowercases.
/// Pure and deterministic.
pub fn make_alias(name: &str, naming: &NamingConfig) -> String {
    let mut alias = naming.replace_map.apply(name);
    if naming.slugify {
        alias = slugify(&alias, naming.transliterate_ru);
    }
    if naming.lowercase {
        alias = alias.to_lowercase();
    }
    alias
}

/// Reject aliases that are not a single safe path segment.
///
/// The alias names the destination project and the local mirror
/// directory, so it must not be empty, `.` or `..`, and must not contain
/// path separators, whitespace or control characters.
pub fn validate_alias(alias: &str) -> Result<()> {
    let problem = if alias.is_empty() {
        Some("is empty")
    } else if alias == "." || alias == ".." {
        Some("is a relative path component")
    } else if alias.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if alias.chars().any(char::is_whitespace) {
        Some("contains whitespace")
    } else if alias.chars().any(char::is_control) {
        Some("contains a control character")
    } else {
        None
    };
    match problem {
        Some(problem) => Err(MigrationError::Validation(format!(
            "alias '{}' {problem}",
            alias.escape_debug()
        ))),
        None => Ok(()),
    }
}

/// Reduce `text` to dash-separated alphanumeric runs.
///
/// With `transliterate` Cyrillic letters become Latin and any other
/// non-ASCII character acts as a separator; without it Unicode letters
/// and digits are kept as they are.
pub fn slugify(text: &str, transliterate: bool) -> String {
    let text: String = text.chars().filter(|c| !matches!(c, '\'' | '"')).collect();
    let (text, separators) = if transliterate {
        (transliterate_cyrillic(&text), &*NON_ASCII_ALNUM)
    } else {
        (text, &*NON_UNICODE_ALNUM)
    };
    separators
        .replace_all(&text, "-")
        .trim_matches('-')
        .to_string()
}

/// Transliterate Russian, Ukrainian and Belarusian letters to Latin.
pub fn transliterate_cyrillic(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match cyrillic_to_latin(c.to_lowercase().next().unwrap_or(c)) {
            Some(latin) if c.is_uppercase() => {
                let mut chars = latin.chars();
                if let Some(first) = chars.next() {
                    out.extend(first.to_uppercase());
                    out.push_str(chars.as_str());
                }
            }
            Some(latin) => out.push_str(latin),
            None => out.push(c),
        }
    }
    out
}

fn cyrillic_to_latin(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "i",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "iu",
        'я' => "ia",
        'є' => "ie",
        'і' => "i",
        'ї' => "i",
        'ґ' => "g",
        'ў' => "u",
        _ => return None,
    };
    Some(latin)
}

/// True if any pattern matches anywhere in `text`.
///
/// An empty pattern set matches nothing.
pub fn match_any(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|p| p.is_match(text))
}

/// Result of evaluating repository filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    /// Migrate the repository.
    Proceed,
    /// Skip it for the given reason.
    Skip(String),
}

/// Compiled include/exclude filters.
#[derive(Debug, Clone, Default)]
pub struct RepositoryFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl RepositoryFilter {
    /// Compile the configured patterns.
    pub fn new(config: &FilterConfig) -> Result<Self> {
        Ok(Self {
            include: compile_patterns(&config.include_patterns)?,
            exclude: compile_patterns(&config.exclude_patterns)?,
        })
    }

    /// Decide whether a repository named `name` is migrated.
    ///
    /// Include patterns are checked before exclude patterns.
    pub fn evaluate(&self, name: &str) -> FilterDecision {
        if !self.include.is_empty() && !match_any(&self.include, name) {
            return FilterDecision::Skip("did not match any include pattern".to_string());
        }
        if !self.exclude.is_empty() && match_any(&self.exclude, name) {
            return FilterDecision::Skip("matched an exclude pattern".to_string());
        }
        FilterDecision::Proceed
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| {
                MigrationError::Configuration(format!("invalid filter pattern '{p}': {e}"))
            })
        })
        .collect()
}
