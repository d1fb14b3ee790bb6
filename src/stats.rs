/* ------------------------------------------------------------------ */
/* Corpus statistics artifact: vocabulary + unigram/bigram counts     */
/* ------------------------------------------------------------------ */
//
// On-disk format is JSON:
//   {
//     "itos":       {"0": "a", "1": "b", ...},   id → symbol
//     "stoi":       {"a": 0, "b": 1, ...},       symbol → id
//     "vocab_size": 2,
//     "unigrams":   {"a": 10, "b": 7},
//     "bigrams":    [["a", "b", 6], ["b", "a", 7], ...]
//   }
//
// Bigrams are a list of triples because JSON object keys cannot be pairs.
// Every field is required; serde names the missing one.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub itos:       BTreeMap<usize, String>,
    pub stoi:       BTreeMap<String, usize>,
    pub vocab_size: usize,
    pub unigrams:   BTreeMap<String, u64>,
    pub bigrams:    Vec<(String, String, u64)>,
}

impl CorpusStats {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    // ── Char-level counting ─────────────────────────────────────────────
    //
    // Vocabulary is every distinct char sorted by codepoint. Bigrams come
    // from adjacent windows only. The last char is the one symbol that may
    // lack a successor; in that case it wraps back to the first char so its
    // conditional row is defined.

    pub fn from_text(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();

        let mut symbols = chars.clone();
        symbols.sort_unstable();
        symbols.dedup();

        let itos: BTreeMap<usize, String> = symbols.iter()
            .enumerate()
            .map(|(i, c)| (i, c.to_string()))
            .collect();
        let stoi: BTreeMap<String, usize> = itos.iter()
            .map(|(&i, s)| (s.clone(), i))
            .collect();

        let mut unigrams: BTreeMap<String, u64> = BTreeMap::new();
        for c in &chars {
            *unigrams.entry(c.to_string()).or_insert(0) += 1;
        }

        let mut pairs: BTreeMap<(char, char), u64> = BTreeMap::new();
        for w in chars.windows(2) {
            *pairs.entry((w[0], w[1])).or_insert(0) += 1;
        }
        if let (Some(&last), Some(&first)) = (chars.last(), chars.first()) {
            if !pairs.keys().any(|&(a, _)| a == last) {
                pairs.insert((last, first), 1);
            }
        }
        let bigrams = pairs.into_iter()
            .map(|((a, b), n)| (a.to_string(), b.to_string(), n))
            .collect();

        Self { vocab_size: symbols.len(), itos, stoi, unigrams, bigrams }
    }
}
