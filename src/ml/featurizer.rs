//! Text featurization: normalized text to a bag of word and character n-grams.
//!
//! The feature space is the concatenation of two vocabularies learned from the
//! training texts:
//!
//! | Block      | Terms                                             |
//! |------------|---------------------------------------------------|
//! | words      | whitespace tokens, n-grams of length 1..=N        |
//! | characters | n-grams of exactly M chars over `\u{2}text\u{3}`  |
//!
//! Vectors hold raw term counts before the configured norm is applied.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

const TEXT_START: char = '\u{2}';
const TEXT_END: char = '\u{3}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum CaseMode {
    #[default]
    Lower,
    Upper,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Norm {
    None,
    L1,
    #[default]
    L2,
    Infinity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturizerOptions {
    pub case_mode: CaseMode,
    pub keep_punctuation: bool,
    pub keep_numbers: bool,
    pub word_ngram_length: usize,
    /// 0 disables character features.
    pub char_ngram_length: usize,
    pub norm: Norm,
}

impl Default for FeaturizerOptions {
    fn default() -> Self {
        Self {
            case_mode: CaseMode::Lower,
            keep_punctuation: true,
            keep_numbers: true,
            word_ngram_length: 1,
            char_ngram_length: 3,
            norm: Norm::L2,
        }
    }
}

/// Sparse feature vector with strictly increasing indices.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseVector {
    pub dimension: usize,
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

impl SparseVector {
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.indices
            .iter()
            .zip(self.values.iter())
            .map(|(&i, &v)| (i as usize, v))
    }

    pub fn dot(&self, dense: &[f32]) -> f32 {
        self.iter()
            .map(|(i, v)| dense.get(i).copied().unwrap_or(0.0) * v)
            .sum()
    }
}

/// Term to column mapping, serialized as the ordered term list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    terms: Vec<String>,
    lookup: HashMap<String, u32>,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn get(&self, term: &str) -> Option<u32> {
        self.lookup.get(term).copied()
    }

    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(String::as_str)
    }

    fn insert(&mut self, term: String) {
        if !self.lookup.contains_key(&term) {
            self.lookup.insert(term.clone(), self.terms.len() as u32);
            self.terms.push(term);
        }
    }
}

impl From<Vec<String>> for Vocabulary {
    fn from(terms: Vec<String>) -> Self {
        let mut vocabulary = Vocabulary::default();
        for term in terms {
            vocabulary.insert(term);
        }
        vocabulary
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.terms
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFeaturizer {
    options: FeaturizerOptions,
    words: Vocabulary,
    chars: Vocabulary,
}

impl TextFeaturizer {
    /// Learn both vocabularies from the training texts, in first-occurrence order.
    pub fn fit<'a, I>(options: FeaturizerOptions, texts: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut words = Vocabulary::default();
        let mut chars = Vocabulary::default();

        for text in texts {
            let normalized = normalize(text, &options);
            for term in word_ngrams(&normalized, options.word_ngram_length) {
                words.insert(term);
            }
            for term in char_ngrams(&normalized, options.char_ngram_length) {
                chars.insert(term);
            }
        }

        tracing::debug!(
            "Featurizer fitted: {} word terms, {} char terms",
            words.len(),
            chars.len()
        );

        Self {
            options,
            words,
            chars,
        }
    }

    pub fn options(&self) -> &FeaturizerOptions {
        &self.options
    }

    pub fn dimension(&self) -> usize {
        self.words.len() + self.chars.len()
    }

    pub fn word_vocabulary(&self) -> &Vocabulary {
        &self.words
    }

    pub fn char_vocabulary(&self) -> &Vocabulary {
        &self.chars
    }

    /// Name of feature column `index`, prefixed with its block.
    pub fn feature_name(&self, index: usize) -> Option<String> {
        if index < self.words.len() {
            self.words.term(index).map(|t| format!("w:{}", t))
        } else {
            self.chars
                .term(index - self.words.len())
                .map(|t| format!("c:{}", t))
        }
    }

    pub fn transform(&self, text: &str) -> SparseVector {
        let normalized = normalize(text, &self.options);
        let offset = self.words.len() as u32;
        let mut counts: HashMap<u32, f32> = HashMap::new();

        for term in word_ngrams(&normalized, self.options.word_ngram_length) {
            if let Some(idx) = self.words.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        for term in char_ngrams(&normalized, self.options.char_ngram_length) {
            if let Some(idx) = self.chars.get(&term) {
                *counts.entry(offset + idx).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(u32, f32)> = counts.into_iter().collect();
        entries.sort_unstable_by_key(|&(idx, _)| idx);

        let (indices, mut values): (Vec<u32>, Vec<f32>) = entries.into_iter().unzip();
        apply_norm(&mut values, self.options.norm);

        SparseVector {
            dimension: self.dimension(),
            indices,
            values,
        }
    }
}

fn punctuation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\p{P}").expect("valid punctuation pattern"))
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\p{Nd}").expect("valid digit pattern"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

pub fn normalize(text: &str, options: &FeaturizerOptions) -> String {
    let mut normalized = match options.case_mode {
        CaseMode::Lower => text.to_lowercase(),
        CaseMode::Upper => text.to_uppercase(),
        CaseMode::None => text.to_string(),
    };

    if !options.keep_punctuation {
        normalized = punctuation_regex().replace_all(&normalized, "").into_owned();
    }
    if !options.keep_numbers {
        normalized = number_regex().replace_all(&normalized, "").into_owned();
    }

    whitespace_regex()
        .replace_all(normalized.trim(), " ")
        .into_owned()
}

fn word_ngrams(normalized: &str, max_length: usize) -> Vec<String> {
    let tokens: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();
    let mut terms = Vec::new();

    for n in 1..=max_length {
        if n > tokens.len() {
            break;
        }
        terms.extend(tokens.windows(n).map(|w| w.join(" ")));
    }
    terms
}

fn char_ngrams(normalized: &str, length: usize) -> Vec<String> {
    if length == 0 {
        return Vec::new();
    }

    let chars: Vec<char> = std::iter::once(TEXT_START)
        .chain(normalized.chars())
        .chain(std::iter::once(TEXT_END))
        .collect();

    chars
        .windows(length)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

fn apply_norm(values: &mut [f32], norm: Norm) {
    let scale = match norm {
        Norm::None => return,
        Norm::L1 => values.iter().map(|v| v.abs()).sum::<f32>(),
        Norm::L2 => values.iter().map(|v| v * v).sum::<f32>().sqrt(),
        Norm::Infinity => values.iter().fold(0.0_f32, |acc, v| acc.max(v.abs())),
    };

    if scale > 0.0 {
        for v in values.iter_mut() {
            *v /= scale;
        }
    }
}
