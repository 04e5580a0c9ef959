//! Spacing cleanup for text that mixes Latin words with CJK script.
//!
//! Latin words are separated from neighbouring non-Latin tokens by exactly one
//! space, while runs of Japanese/Chinese characters keep no internal spacing.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static SCRIPT_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"[\x{3040}-\x{309F}]+",
        r"|[\x{30A0}-\x{30FF}]+",
        r"|[\x{3400}-\x{4DBF}\x{4E00}-\x{9FFF}]+",
        r"|\p{Latin}[\p{Latin}\p{M}]*",
        r"|[\p{L}&&[^\p{Latin}\x{3040}-\x{30FF}\x{3400}-\x{4DBF}\x{4E00}-\x{9FFF}]]+",
        r"|\p{N}+",
        r"|\s+",
        r"|(?s:.)",
    ))
    .expect("script run pattern")
});
static LATIN_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z]+$").expect("latin word pattern"));
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));
static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ([.,!?;:])").expect("punctuation pattern"));

/// Splits text into tokens without discarding any characters.
pub trait Tokenizer: Send + Sync {
    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str>;
}

/// Splits at script boundaries: kana and han runs, Latin words, other letter
/// runs, digit runs, whitespace runs, and single remaining characters.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptRunTokenizer;

impl Tokenizer for ScriptRunTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        SCRIPT_RUN.find_iter(text).map(|m| m.as_str()).collect()
    }
}

/// Hook for correcting Latin words before they are re-joined.
pub trait SpellCorrector: Send + Sync {
    fn correct<'a>(&self, word: &'a str) -> Cow<'a, str>;
}

/// Leaves every word untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCorrection;

impl SpellCorrector for NoCorrection {
    fn correct<'a>(&self, word: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(word)
    }
}

pub struct MixedScriptNormalizer<T = ScriptRunTokenizer, C = NoCorrection> {
    tokenizer: T,
    corrector: C,
}

impl MixedScriptNormalizer {
    pub fn new() -> Self {
        Self::with_parts(ScriptRunTokenizer, NoCorrection)
    }
}

impl Default for MixedScriptNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Tokenizer, C: SpellCorrector> MixedScriptNormalizer<T, C> {
    pub fn with_parts(tokenizer: T, corrector: C) -> Self {
        Self {
            tokenizer,
            corrector,
        }
    }

    pub fn normalize(&self, text: &str) -> String {
        let mut joined = String::with_capacity(text.len() + 8);
        let mut previous_latin: Option<bool> = None;

        for token in self.tokenizer.tokenize(text) {
            let latin = LATIN_WORD.is_match(token);
            let token = if latin {
                self.corrector.correct(token)
            } else {
                Cow::Borrowed(token)
            };
            if token.is_empty() {
                continue;
            }
            if previous_latin.is_some_and(|prev| prev != latin) {
                joined.push(' ');
            }
            joined.push_str(&token);
            previous_latin = Some(latin);
        }

        let collapsed = WHITESPACE_RUN.replace_all(&joined, " ");
        let punctuated = SPACE_BEFORE_PUNCT.replace_all(&collapsed, "$1");
        remove_cjk_gaps(punctuated.trim())
    }
}

/// Convenience wrapper around the default normalizer.
pub fn normalize_mixed_text(text: &str) -> String {
    MixedScriptNormalizer::new().normalize(text)
}

fn is_cjk(c: char) -> bool {
    matches!(c, '\u{3040}'..='\u{30FF}' | '\u{4E00}'..='\u{9FFF}')
}

fn remove_cjk_gaps(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' && i > 0 && is_cjk(chars[i - 1]) && chars.get(i + 1).is_some_and(|n| is_cjk(*n))
        {
            continue;
        }
        out.push(c);
    }
    out
}
