use anyhow::{Result, anyhow};
use isolang::Language;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Language utilities for voice assignment
///
/// This module detects the narration language of a script and validates
/// ISO 639-1 / ISO 639-2 language codes used in the configuration.

// @const: CJK unified ideographs (the source range for Chinese detection)
static CJK_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{4e00}-\u{9fff}]").unwrap());

// @const: Basic Latin letters
static LATIN_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]").unwrap());

/// Languages the voice catalog has voices for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceLanguage {
    English,
    Chinese,
}

impl VoiceLanguage {
    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Chinese => "zh",
        }
    }

    /// Locale tag carried by voice identities
    pub fn locale(&self) -> &'static str {
        match self {
            Self::English => "en-US",
            Self::Chinese => "zh-CN",
        }
    }

    /// Resolve a configured language code (ISO 639-1 or 639-2)
    pub fn from_code(code: &str) -> Result<Self> {
        match normalize_to_part1_or_part2t(code)?.as_str() {
            "en" => Ok(Self::English),
            "zh" => Ok(Self::Chinese),
            other => Err(anyhow!("No voices available for language: {}", other)),
        }
    }

    /// English name of the language
    pub fn name(&self) -> String {
        get_language_name(self.code()).unwrap_or_else(|_| self.code().to_string())
    }
}

impl fmt::Display for VoiceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// How to pick the narration language when a script mixes scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguagePolicy {
    /// Any CJK ideograph anywhere selects Chinese
    #[default]
    AnyCharacter,
    /// Chinese only when ideographs outnumber Latin letters
    Majority,
}

/// Count CJK ideographs in text
pub fn count_cjk(text: &str) -> usize {
    CJK_REGEX.find_iter(text).count()
}

/// Count Latin letters in text
pub fn count_latin(text: &str) -> usize {
    LATIN_REGEX.find_iter(text).count()
}

/// Detect the narration language of a whole script, once.
///
/// Text without any letters at all falls back to `default`.
pub fn detect_script_language<'a, I>(texts: I, default: VoiceLanguage, policy: LanguagePolicy) -> VoiceLanguage
where
    I: IntoIterator<Item = &'a str>,
{
    let mut cjk = 0usize;
    let mut latin = 0usize;
    for text in texts {
        cjk += count_cjk(text);
        latin += count_latin(text);
    }

    if cjk == 0 && latin == 0 {
        return default;
    }

    match policy {
        LanguagePolicy::AnyCharacter if cjk > 0 => VoiceLanguage::Chinese,
        LanguagePolicy::Majority if cjk > latin => VoiceLanguage::Chinese,
        _ => VoiceLanguage::English,
    }
}

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    match code {
        "fre" => Some("fra"),
        "ger" => Some("deu"),
        "dut" => Some("nld"),
        "gre" => Some("ell"),
        "chi" => Some("zho"),
        "cze" => Some("ces"),
        "ice" => Some("isl"),
        "alb" => Some("sqi"),
        "arm" => Some("hye"),
        "baq" => Some("eus"),
        "bur" => Some("mya"),
        "per" => Some("fas"),
        "geo" => Some("kat"),
        "may" => Some("msa"),
        "mac" => Some("mkd"),
        "rum" => Some("ron"),
        "slo" => Some("slk"),
        "wel" => Some("cym"),
        _ => None,
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    if normalized_code.len() == 2 {
        if let Some(lang) = Language::from_639_1(&normalized_code) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if normalized_code.len() == 3 {
        if Language::from_639_3(&normalized_code).is_some() {
            return Ok(normalized_code);
        }
        if let Some(part2t) = bibliographic_to_terminology(&normalized_code) {
            return Ok(part2t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let part2t = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&part2t)
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;

    Ok(lang.to_639_1().map(str::to_string).unwrap_or(part2t))
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}
