//! TF-IDF vectorization over a shared, pruned n-gram vocabulary.
use std::time::Instant;

use hashbrown::{HashMap, HashSet};

use crate::config::validate_document_frequency;
use crate::errors::{Result, SimcheckError};
use crate::feature::{FeatureConfig, FeatureExtractor};

/// Document-frequency counter.
#[derive(Default)]
pub struct Idf {
    counter: HashMap<String, usize>,
    num_docs: usize,
}

impl Idf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, terms: &[String]) {
        let mut dedup = HashSet::new();
        for term in terms {
            if dedup.insert(term.as_str()) {
                self.counter
                    .entry(term.clone())
                    .and_modify(|c| *c += 1)
                    .or_insert(1);
            }
        }
        self.num_docs += 1;
    }

    pub const fn num_docs(&self) -> usize {
        self.num_docs
    }

    pub fn doc_freq(&self, term: &str) -> Option<usize> {
        self.counter.get(term).copied()
    }

    /// Smoothed IDF, `ln((1 + n) / (1 + df)) + 1`, as if one extra document
    /// contained every term once.
    pub fn idf_smooth(num_docs: usize, doc_freq: usize) -> f64 {
        let n = (num_docs + 1) as f64;
        let m = (doc_freq + 1) as f64;
        (n / m).ln() + 1.
    }

    /// Keeps the terms whose document frequency lies in
    /// `[min_df * num_docs, max_df * num_docs]` and freezes them into a vocabulary.
    pub fn prune(self, min_df: f64, max_df: f64) -> Result<FeatureVocabulary> {
        let n = self.num_docs as f64;
        let min_count = min_df * n;
        let max_count = max_df * n;

        let mut entries: Vec<(String, usize)> = self
            .counter
            .into_iter()
            .filter(|&(_, df)| min_count <= df as f64 && df as f64 <= max_count)
            .collect();
        if entries.is_empty() {
            return Err(SimcheckError::config(format!(
                "After pruning with min_df={min_df} and max_df={max_df}, no features remain. \
                 Try a lower min_df or a higher max_df."
            )));
        }
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let num_docs = self.num_docs;
        let mut terms = Vec::with_capacity(entries.len());
        let mut doc_freqs = Vec::with_capacity(entries.len());
        let mut idfs = Vec::with_capacity(entries.len());
        let mut index = HashMap::with_capacity(entries.len());
        for (i, (term, df)) in entries.into_iter().enumerate() {
            index.insert(term.clone(), i);
            terms.push(term);
            doc_freqs.push(df);
            idfs.push(Self::idf_smooth(num_docs, df));
        }
        Ok(FeatureVocabulary {
            terms,
            doc_freqs,
            idfs,
            index,
            num_docs,
        })
    }
}

/// Term-frequency counter.
#[derive(Default)]
pub struct Tf<'a> {
    counter: HashMap<&'a str, usize>,
}

impl<'a> Tf<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the standard term frequencies, `count / total`, in the first-occurrence order.
    pub fn tf(&mut self, terms: &'a [String]) -> Vec<(&'a str, f64)> {
        self.counter.clear();
        let mut order = vec![];
        for term in terms {
            let c = self.counter.entry(term.as_str()).or_insert(0);
            if *c == 0 {
                order.push(term.as_str());
            }
            *c += 1;
        }
        let total = terms.len() as f64;
        order
            .into_iter()
            .map(|term| (term, self.counter[term] as f64 / total))
            .collect()
    }
}

/// Immutable snapshot of the features kept after pruning.
///
/// Features are in lexicographic order and a feature's rank is its vector index.
/// Because the IDF depends on the whole corpus, a vocabulary is only ever built
/// from a complete corpus and is never updated afterwards.
#[derive(Clone, Debug)]
pub struct FeatureVocabulary {
    terms: Vec<String>,
    doc_freqs: Vec<usize>,
    idfs: Vec<f64>,
    index: HashMap<String, usize>,
    num_docs: usize,
}

impl FeatureVocabulary {
    /// Gets the number of features, the dimension of every feature vector.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Gets the number of documents the vocabulary was built from.
    pub const fn num_docs(&self) -> usize {
        self.num_docs
    }

    pub fn term(&self, i: usize) -> &str {
        &self.terms[i]
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    pub fn doc_freq(&self, i: usize) -> usize {
        self.doc_freqs[i]
    }

    pub fn idf(&self, i: usize) -> f64 {
        self.idfs[i]
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    /// Weights the in-vocabulary terms of a document by TF-IDF and L2-normalizes them.
    pub fn transform(&self, terms: &[String]) -> FeatureMap {
        let mut tf = Tf::new();
        let mut entries: Vec<(usize, f64)> = tf
            .tf(terms)
            .into_iter()
            .filter_map(|(term, w)| self.index_of(term).map(|i| (i, w * self.idf(i))))
            .collect();
        entries.sort_unstable_by_key(|&(i, _)| i);

        let norm = entries.iter().map(|&(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0. {
            for (_, w) in entries.iter_mut() {
                *w /= norm;
            }
        }
        entries.retain(|&(_, w)| w > 0.);
        FeatureMap { entries }
    }
}

/// Sparse, L2-normalized feature vector of a document.
///
/// Entries are sorted by vocabulary index and hold strictly positive weights;
/// a document without any surviving feature has no entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureMap {
    entries: Vec<(usize, f64)>,
}

impl FeatureMap {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Gets the weight of a feature, 0 if absent.
    pub fn weight(&self, i: usize) -> f64 {
        self.entries
            .binary_search_by_key(&i, |&(j, _)| j)
            .map_or(0., |k| self.entries[k].1)
    }

    /// Computes the dot product, which is the cosine similarity since both sides are normalized.
    pub fn dot(&self, other: &Self) -> f64 {
        let (xs, ys) = (&self.entries, &other.entries);
        let mut sum = 0.;
        let (mut i, mut j) = (0, 0);
        while i < xs.len() && j < ys.len() {
            match xs[i].0.cmp(&ys[j].0) {
                std::cmp::Ordering::Equal => {
                    sum += xs[i].1 * ys[j].1;
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
            }
        }
        sum
    }
}

/// Unigram+bigram TF-IDF vectorizer with document-frequency pruning.
pub struct Vectorizer {
    config: FeatureConfig,
    min_df: f64,
    max_df: f64,
}

impl Vectorizer {
    /// Creates an instance with pruning bounds given as fractions of the corpus size.
    pub fn new(min_df: f64, max_df: f64) -> Result<Self> {
        validate_document_frequency(min_df, max_df)?;
        Ok(Self {
            config: FeatureConfig::default(),
            min_df,
            max_df,
        })
    }

    /// Sets the n-gram range.
    pub const fn features(mut self, config: FeatureConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the vocabulary over the whole corpus, then weights every document with it.
    pub fn fit_transform<S>(&self, documents: &[S]) -> Result<(FeatureVocabulary, Vec<FeatureMap>)>
    where
        S: AsRef<str>,
    {
        if documents.is_empty() {
            return Err(SimcheckError::input("The corpus must not be empty."));
        }
        let start = Instant::now();

        let mut extractor = FeatureExtractor::new(self.config);
        let mut idf = Idf::new();
        let mut features = Vec::with_capacity(documents.len());
        for doc in documents {
            let mut feature = vec![];
            extractor.extract(doc, &mut feature);
            idf.add(&feature);
            features.push(feature);
        }
        let vocabulary = idf.prune(self.min_df, self.max_df)?;
        let maps: Vec<_> = features.iter().map(|f| vocabulary.transform(f)).collect();

        tracing::debug!(
            documents = documents.len(),
            features = vocabulary.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "vectorization done"
        );
        Ok((vocabulary, maps))
    }
}
