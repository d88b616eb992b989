use std::sync::LazyLock;

use regex::Regex;

use crate::shingling::ShingleIter;

/// Word tokens of at least two word characters.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid regex"));

/// Range of n-gram lengths used as features.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureConfig {
    min_n: usize,
    max_n: usize,
}

impl Default for FeatureConfig {
    /// Unigrams and bigrams.
    fn default() -> Self {
        Self { min_n: 1, max_n: 2 }
    }
}

impl FeatureConfig {
    pub fn new(min_n: usize, max_n: usize) -> Self {
        assert!(1 <= min_n && min_n <= max_n);
        Self { min_n, max_n }
    }
}

/// Turns segmented text into n-gram features.
///
/// The text is lowercased and re-tokenized with [`TOKEN_PATTERN`], so one-character
/// tokens are dropped. Tokens of an n-gram are joined by a single space.
pub struct FeatureExtractor {
    config: FeatureConfig,
    tokens: Vec<String>,
}

impl FeatureExtractor {
    pub const fn new(config: FeatureConfig) -> Self {
        Self {
            config,
            tokens: vec![],
        }
    }

    pub fn extract<S>(&mut self, text: S, feature: &mut Vec<String>)
    where
        S: AsRef<str>,
    {
        self.tokenize(text.as_ref());

        feature.clear();
        for window in ShingleIter::new(&self.tokens, self.config.min_n, self.config.max_n) {
            feature.push(window.join(" "));
        }
    }

    fn tokenize(&mut self, text: &str) {
        self.tokens.clear();
        let lowered = text.to_lowercase();
        self.tokens.extend(
            TOKEN_PATTERN
                .find_iter(&lowered)
                .map(|m| m.as_str().to_string()),
        );
    }
}
