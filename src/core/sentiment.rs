//! Lexical polarity classifier for review comments.
//!
//! Counts positive and negative keyword hits and labels the text by the sign
//! of the difference. The keyword sets are fixed once the classifier is built
//! and shared read-only across tasks.

use crate::models::Sentiment;
use once_cell::sync::Lazy;
use std::collections::HashSet;

const POSITIVE_KEYWORDS: &[&str] = &[
    "good", "great", "excellent", "amazing", "wonderful", "fantastic", "awesome", "best",
    "love", "loved", "nice", "helpful", "friendly", "polite", "kind", "punctual",
    "professional", "reliable", "trustworthy", "honest", "clean", "thorough", "careful",
    "efficient", "perfect", "satisfied", "happy", "recommend", "recommended", "caring",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "bad", "terrible", "awful", "horrible", "worst", "poor", "rude", "late", "lazy",
    "dirty", "unreliable", "unprofessional", "dishonest", "careless", "disappointed",
    "disappointing", "hate", "unhappy", "slow", "stole", "theft", "damaged", "broke",
    "absent", "unsafe", "unclean", "messy", "impolite", "untrustworthy", "waste",
];

static BUILTIN: Lazy<SentimentClassifier> = Lazy::new(SentimentClassifier::builtin);

/// Classify with the built-in lexicon
pub fn classify_sentiment(text: &str) -> Sentiment {
    BUILTIN.classify(text)
}

#[derive(Debug, Clone)]
pub struct SentimentClassifier {
    positive: HashSet<String>,
    negative: HashSet<String>,
}

impl SentimentClassifier {
    pub fn builtin() -> Self {
        Self::with_extra_keywords(&[], &[])
    }

    /// Built-in lexicon extended with configured keywords
    pub fn with_extra_keywords(positive: &[String], negative: &[String]) -> Self {
        let normalize = |word: &str| word.trim().to_lowercase();

        let positive = POSITIVE_KEYWORDS
            .iter()
            .map(|w| normalize(w))
            .chain(positive.iter().map(|w| normalize(w)))
            .filter(|w| !w.is_empty())
            .collect();
        let negative = NEGATIVE_KEYWORDS
            .iter()
            .map(|w| normalize(w))
            .chain(negative.iter().map(|w| normalize(w)))
            .filter(|w| !w.is_empty())
            .collect();

        Self { positive, negative }
    }

    /// positive hits minus negative hits
    pub fn polarity(&self, text: &str) -> i64 {
        tokenize(text).fold(0i64, |score, token| {
            if self.positive.contains(&token) {
                score + 1
            } else if self.negative.contains(&token) {
                score - 1
            } else {
                score
            }
        })
    }

    pub fn classify(&self, text: &str) -> Sentiment {
        if text.trim().is_empty() {
            return Sentiment::Neutral;
        }

        match self.polarity(text) {
            score if score > 0 => Sentiment::Positive,
            score if score < 0 => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

impl Default for SentimentClassifier {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|token| token.trim_matches('\'').to_lowercase())
        .filter(|token| !token.is_empty())
}
