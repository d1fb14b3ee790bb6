/* ------------------------------------------------------------------ */
/* Vocabulary: symbol ↔ token id bijection                            */
/* ------------------------------------------------------------------ */
//
//   Vocabulary::from_stats(&stats)  → validated table from the artifact
//   vocab.lookup(symbol)            → id, or a DataIntegrity error
//   vocab.decode(ids)               → String (symbols concatenated)
//   vocab.encode(text)              → Vec<usize> for char-level vocabularies

use std::collections::HashMap;

use crate::error::{DataError, Result};
use crate::stats::CorpusStats;

#[derive(Debug, Clone)]
pub struct Vocabulary {
    itos: Vec<String>,            // token_id → symbol
    stoi: HashMap<String, usize>, // symbol → token_id
}

impl Vocabulary {
    /// Builds the table from an ordered symbol list; ids are list positions.
    pub fn from_symbols(symbols: Vec<String>) -> Result<Self> {
        if symbols.is_empty() {
            return Err(DataError::integrity("vocabulary is empty"));
        }
        let mut stoi = HashMap::with_capacity(symbols.len());
        for (id, sym) in symbols.iter().enumerate() {
            if let Some(prev) = stoi.insert(sym.clone(), id) {
                return Err(DataError::integrity(format!(
                    "symbol {sym:?} maps to both id {prev} and id {id}"
                )));
            }
        }
        Ok(Self { itos: symbols, stoi })
    }

    /// Builds the table from the artifact, checking that `itos`, `stoi`
    /// and `vocab_size` describe the same bijection over `[0, vocab_size)`.
    pub fn from_stats(stats: &CorpusStats) -> Result<Self> {
        let n = stats.vocab_size;
        if stats.itos.len() != n || stats.stoi.len() != n {
            return Err(DataError::integrity(format!(
                "vocab_size is {n} but itos has {} entries and stoi has {}",
                stats.itos.len(),
                stats.stoi.len()
            )));
        }

        let mut symbols = Vec::with_capacity(n);
        for id in 0..n {
            let sym = stats.itos.get(&id).ok_or_else(|| {
                DataError::integrity(format!("itos has no symbol for id {id}"))
            })?;
            symbols.push(sym.clone());
        }

        let vocab = Self::from_symbols(symbols)?;
        for (sym, &id) in &stats.stoi {
            if vocab.id(sym) != Some(id) {
                return Err(DataError::integrity(format!(
                    "stoi maps {sym:?} to {id}, which disagrees with itos"
                )));
            }
        }
        Ok(vocab)
    }

    pub fn len(&self) -> usize {
        self.itos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.itos.is_empty()
    }

    pub fn id(&self, symbol: &str) -> Option<usize> {
        self.stoi.get(symbol).copied()
    }

    pub fn symbol(&self, id: usize) -> Option<&str> {
        self.itos.get(id).map(String::as_str)
    }

    pub fn symbols(&self) -> &[String] {
        &self.itos
    }

    /// Like [`Vocabulary::id`], but an unknown symbol is an error.
    pub fn lookup(&self, symbol: &str) -> Result<usize> {
        self.id(symbol).ok_or_else(|| {
            DataError::integrity(format!("symbol {symbol:?} is not in the vocabulary"))
        })
    }

    // Chars without an entry are dropped.
    pub fn encode(&self, text: &str) -> Vec<usize> {
        let mut buf = [0u8; 4];
        text.chars()
            .filter_map(|c| self.id(c.encode_utf8(&mut buf)))
            .collect()
    }

    // Ids outside the vocabulary are skipped.
    pub fn decode(&self, tokens: &[usize]) -> String {
        tokens.iter()
            .filter_map(|&id| self.symbol(id))
            .collect()
    }
}
