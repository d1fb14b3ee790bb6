//! Synthetic token sequences for probing induction behaviour.
//!
//! Sequences follow a first-order Markov chain estimated from corpus
//! bigram counts, except after a small set of trigger tokens: a trigger
//! is always followed by its own response, drawn once per sequence. A
//! model that learns the trigger → response association has to copy it
//! from earlier in the context, on top of the bigram statistics.
//!
//! ```no_run
//! use triggergen::{CorpusStats, DataArgs, Dataset};
//!
//! let stats = CorpusStats::load("data/meta.json")?;
//! let args = DataArgs { k: 3, seq_length: 256, ..DataArgs::default() };
//! let dataset = Dataset::new(&stats, &args, None, false)?;
//! for batch in dataset.batches(32, 42)?.take(10) {
//!     let batch = batch?;
//!     assert_eq!(batch.inputs.dim(), (32, 256));
//! }
//! # Ok::<(), triggergen::DataError>(())
//! ```

pub mod batch;
pub mod config;
pub mod dataset;
pub mod distribution;
pub mod error;
pub mod rng;
pub mod sequence;
pub mod stats;
pub mod trigger;
pub mod vocab;

pub use batch::{Batch, BatchGenerator, BatchStream};
pub use config::{DataArgs, Split, TrainerArgs};
pub use dataset::{Dataset, DatasetPair};
pub use distribution::DistributionModel;
pub use error::{DataError, Result};
pub use sequence::{Sequence, SequenceGenerator, SequenceStream};
pub use stats::CorpusStats;
pub use trigger::{PoolRule, ResponsePolicy, TriggerPolicy, TriggerSelection, Triggers, Weighting};
pub use vocab::Vocabulary;
