/* ------------------------------------------------------------------ */
/* Generator options and global constants                             */
/* ------------------------------------------------------------------ */
//
// DataArgs controls one dataset (trigger count, sequence length, latent and
// counter annotations). TrainerArgs bundles the data options with the
// stream-level knobs used to build a train/test pair.
//
// Both load from JSON; any field left out takes the default below.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};

// ── Data ──────────────────────────────────────────────────────────────────

pub const DEFAULT_K: usize = 0;
pub const DEFAULT_SEQ_LENGTH: usize = 256;
pub const DEFAULT_SPECIAL_TOKS_OFFSET: usize = 0;

// Share of the response pool used for training when the OOD split is on.
// The boundary is floor(TRAIN_FRACTION * vocab_size).
pub const TRAIN_FRACTION: f64 = 0.75;

// ── Annotation values ─────────────────────────────────────────────────────

pub const LATENT_MARKER: i64 = -1;   // trigger id emitted as a latent prefix
pub const BACKGROUND: i64 = 0;       // plain bigram step, also the closing sentinel
pub const TRIGGERED: i64 = 1;        // trigger fired, counting disabled

// ── Streaming ─────────────────────────────────────────────────────────────

pub const DEFAULT_BATCH_SIZE: usize = 512;
pub const DEFAULT_SEED: u64 = 42;

/// Options for a single dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataArgs {
    /// Number of trigger tokens.
    pub k: usize,
    /// Sequence length L; generated sequences carry L+1 tokens.
    pub seq_length: usize,
    /// Prefix each sequence with its trigger ids.
    pub show_latents: bool,
    /// Pick triggers once by marginal rank instead of per sequence.
    pub fixed_special_toks: bool,
    /// Number of most frequent tokens skipped by fixed selection.
    pub special_toks_offset: usize,
    /// Annotate triggered steps with a running occurrence count.
    pub output_counter: bool,
    /// Forbid a trigger from answering with itself.
    pub no_repeat: bool,
}

impl Default for DataArgs {
    fn default() -> Self {
        Self {
            k:                   DEFAULT_K,
            seq_length:          DEFAULT_SEQ_LENGTH,
            show_latents:        false,
            fixed_special_toks:  false,
            special_toks_offset: DEFAULT_SPECIAL_TOKS_OFFSET,
            output_counter:      true,
            no_repeat:           false,
        }
    }
}

impl DataArgs {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks the options that do not depend on the vocabulary.
    pub fn validate(&self) -> Result<()> {
        if self.seq_length == 0 {
            return Err(DataError::config("seq_length must be positive"));
        }
        // latent prefix plus the first marginal draw must fit in L+1 slots
        if self.show_latents && self.k > self.seq_length {
            return Err(DataError::config(format!(
                "show_latents needs k <= seq_length (k={}, seq_length={})",
                self.k, self.seq_length
            )));
        }
        Ok(())
    }
}

/// Which side of the out-of-distribution response split a dataset draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
}

impl FromStr for Split {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "train" => Ok(Self::Train),
            "test" => Ok(Self::Test),
            _ => Err(format!("invalid split: {s:?} (expected \"train\" or \"test\")")),
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Train => f.write_str("train"),
            Self::Test => f.write_str("test"),
        }
    }
}

/// Data options plus the knobs for a train/test stream pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerArgs {
    pub data: DataArgs,
    pub batch_size: usize,
    pub seed: u64,
    /// Train draws responses from the first part of the pool, test from the rest.
    pub ood: bool,
    pub bigram_outs_train: bool,
    pub bigram_outs_test: bool,
}

impl Default for TrainerArgs {
    fn default() -> Self {
        Self {
            data:              DataArgs::default(),
            batch_size:        DEFAULT_BATCH_SIZE,
            seed:              DEFAULT_SEED,
            ood:               false,
            bigram_outs_train: false,
            bigram_outs_test:  false,
        }
    }
}

impl TrainerArgs {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let args = DataArgs::from_json_str(r#"{"k": 3, "no_repeat": true}"#).unwrap();
        assert_eq!(args.k, 3);
        assert!(args.no_repeat);
        assert_eq!(args.seq_length, DEFAULT_SEQ_LENGTH);
        assert!(args.output_counter);
        assert!(!args.show_latents);
    }

    #[test]
    fn trainer_args_nest_data_args() {
        let args = TrainerArgs::from_json_str(
            r#"{"data": {"k": 2, "seq_length": 16}, "ood": true, "seed": 7}"#,
        )
        .unwrap();
        assert_eq!(args.data.k, 2);
        assert_eq!(args.data.seq_length, 16);
        assert!(args.ood);
        assert_eq!(args.seed, 7);
        assert_eq!(args.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn zero_length_is_rejected() {
        let args = DataArgs { seq_length: 0, ..DataArgs::default() };
        assert!(matches!(args.validate(), Err(DataError::Configuration(_))));
    }

    #[test]
    fn latent_prefix_must_fit() {
        let args = DataArgs { k: 5, seq_length: 4, show_latents: true, ..DataArgs::default() };
        assert!(matches!(args.validate(), Err(DataError::Configuration(_))));

        let args = DataArgs { k: 4, seq_length: 4, show_latents: true, ..DataArgs::default() };
        assert!(args.validate().is_ok());
    }

    #[test]
    fn split_parses_lowercase_names() {
        assert_eq!("train".parse::<Split>().unwrap(), Split::Train);
        assert_eq!("test".parse::<Split>().unwrap(), Split::Test);
        assert!("eval".parse::<Split>().is_err());
        assert_eq!(Split::Test.to_string(), "test");
    }
}
