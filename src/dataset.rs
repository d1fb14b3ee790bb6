/* ------------------------------------------------------------------ */
/* Dataset: vocabulary + distributions + generator, built from stats  */
/* ------------------------------------------------------------------ */

use log::info;
use ndarray::Array2;
use rand::Rng;

use crate::batch::{BatchGenerator, BatchStream};
use crate::config::{DataArgs, Split, TrainerArgs};
use crate::distribution::DistributionModel;
use crate::error::Result;
use crate::sequence::{Sequence, SequenceGenerator, SequenceStream};
use crate::stats::CorpusStats;
use crate::trigger::{ResponsePolicy, TriggerSelection};
use crate::vocab::Vocabulary;

#[derive(Debug, Clone)]
pub struct Dataset {
    vocab:       Vocabulary,
    sequences:   SequenceGenerator,
    split:       Option<Split>,
    bigram_outs: bool,
}

impl Dataset {
    /// Validates the statistics against the vocabulary, normalizes the
    /// distributions and resolves the trigger policy. Every failure here
    /// is a static misconfiguration.
    pub fn new(
        stats: &CorpusStats,
        args: &DataArgs,
        split: Option<Split>,
        bigram_outs: bool,
    ) -> Result<Self> {
        let response = ResponsePolicy::new(args.no_repeat, split, bigram_outs)?;
        let vocab = Vocabulary::from_stats(stats)?;
        let dist = DistributionModel::from_stats(&vocab, stats)?;
        let sequences = SequenceGenerator::new(args, dist, response)?;

        info!(
            "dataset ready: vocab {}, k={}, seq_length={}, split={}, responses {:?}",
            vocab.len(),
            args.k,
            args.seq_length,
            split.map_or_else(|| "none".to_string(), |s| s.to_string()),
            response.weighting
        );
        Ok(Self { vocab, sequences, split, bigram_outs })
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    pub fn distributions(&self) -> &DistributionModel {
        self.sequences.distributions()
    }

    pub fn generator(&self) -> &SequenceGenerator {
        &self.sequences
    }

    pub fn seq_length(&self) -> usize {
        self.sequences.seq_length()
    }

    pub fn split(&self) -> Option<Split> {
        self.split
    }

    pub fn bigram_outs(&self) -> bool {
        self.bigram_outs
    }

    /// Trigger ids when they were fixed at construction.
    pub fn fixed_triggers(&self) -> Option<&[usize]> {
        match self.sequences.trigger_policy().selection() {
            TriggerSelection::Fixed(ids) => Some(ids),
            TriggerSelection::Random { .. } => None,
        }
    }

    pub fn decode(&self, tokens: &[usize]) -> String {
        self.vocab.decode(tokens)
    }

    pub fn gen_seq<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Sequence> {
        self.sequences.generate(rng)
    }

    pub fn gen_batch<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        batch_size: usize,
    ) -> Result<(Array2<usize>, Array2<i64>)> {
        BatchGenerator::new(&self.sequences, batch_size)?.generate(rng)
    }

    pub fn sequences<'a, R: Rng + ?Sized>(&'a self, rng: &'a mut R) -> SequenceStream<'a, R> {
        self.sequences.sequences(rng)
    }

    /// Seeded batch stream over this dataset.
    pub fn batches(&self, batch_size: usize, seed: u64) -> Result<BatchStream<'_>> {
        Ok(BatchStream::new(BatchGenerator::new(&self.sequences, batch_size)?, seed))
    }
}

/// Train and test datasets built from one set of trainer options.
#[derive(Debug, Clone)]
pub struct DatasetPair {
    pub train:  Dataset,
    pub test:   Dataset,
    batch_size: usize,
    seed:       u64,
}

impl DatasetPair {
    pub fn new(stats: &CorpusStats, args: &TrainerArgs) -> Result<Self> {
        let (train_split, test_split) = if args.ood {
            (Some(Split::Train), Some(Split::Test))
        } else {
            (None, None)
        };
        let train = Dataset::new(stats, &args.data, train_split, args.bigram_outs_train)?;
        let test = Dataset::new(stats, &args.data, test_split, args.bigram_outs_test)?;
        // Build the stream generator up front so a zero batch size fails here.
        BatchGenerator::new(train.generator(), args.batch_size)?;
        Ok(Self { train, test, batch_size: args.batch_size, seed: args.seed })
    }

    /// Independent streams: train is seeded with `seed`, test with `seed + 1`.
    pub fn streams(&self) -> Result<(BatchStream<'_>, BatchStream<'_>)> {
        Ok((
            self.train.batches(self.batch_size, self.seed)?,
            self.test.batches(self.batch_size, self.seed.wrapping_add(1))?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataError;
    use crate::rng::seeded;

    const TEXT: &str = "she sells sea shells by the sea shore";

    #[test]
    fn decode_round_trips_generated_ids() {
        let stats = CorpusStats::from_text(TEXT);
        let ds = Dataset::new(&stats, &DataArgs { seq_length: 40, ..DataArgs::default() }, None, false)
            .unwrap();
        let (seq, _) = ds.gen_seq(&mut seeded(0)).unwrap();
        let text = ds.decode(&seq);
        assert_eq!(text.chars().count(), 41);
        assert!(text.chars().all(|c| TEXT.contains(c)));
        assert_eq!(ds.vocab().encode(&text), seq);
    }

    #[test]
    fn ood_with_bigram_outs_is_rejected() {
        let stats = CorpusStats::from_text(TEXT);
        let err = Dataset::new(&stats, &DataArgs::default(), Some(Split::Test), true).unwrap_err();
        assert!(matches!(err, DataError::Configuration(_)));
    }

    #[test]
    fn fixed_triggers_are_exposed() {
        let stats = CorpusStats::from_text(TEXT);
        let args = DataArgs { k: 2, fixed_special_toks: true, seq_length: 8, ..DataArgs::default() };
        let ds = Dataset::new(&stats, &args, None, false).unwrap();
        assert_eq!(ds.fixed_triggers().map(<[usize]>::len), Some(2));

        let args = DataArgs { k: 2, seq_length: 8, ..DataArgs::default() };
        let ds = Dataset::new(&stats, &args, None, false).unwrap();
        assert!(ds.fixed_triggers().is_none());
    }

    #[test]
    fn pair_uses_disjoint_response_portions() {
        let stats = CorpusStats::from_text(TEXT);
        let args = TrainerArgs {
            data: DataArgs { k: 3, seq_length: 64, no_repeat: true, ..DataArgs::default() },
            batch_size: 4,
            ood: true,
            ..TrainerArgs::default()
        };
        let pair = DatasetPair::new(&stats, &args).unwrap();
        assert_eq!(pair.train.split(), Some(Split::Train));
        assert_eq!(pair.test.split(), Some(Split::Test));

        let (mut train, mut test) = pair.streams().unwrap();
        let a = train.next().unwrap().unwrap();
        let b = test.next().unwrap().unwrap();
        assert_eq!(a.inputs.dim(), (4, 64));
        assert_ne!(a, b);
    }

    #[test]
    fn pair_rejects_zero_batch_size() {
        let stats = CorpusStats::from_text(TEXT);
        let args = TrainerArgs { batch_size: 0, ..TrainerArgs::default() };
        assert!(DatasetPair::new(&stats, &args).is_err());
    }
}
