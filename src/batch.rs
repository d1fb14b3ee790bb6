/* ------------------------------------------------------------------ */
/* Batching: fixed-shape arrays and the seeded next-token stream      */
/* ------------------------------------------------------------------ */
//
// BatchGenerator stacks B sequences into (B, L+1) arrays, one sequence
// after another on the same RNG. BatchStream owns the RNG and frames each
// batch for next-token prediction:
//
//   inputs      = tokens[:, :-1]
//   targets     = tokens[:, 1:]
//   annotations = annotation[:, :-1]

use log::trace;
use ndarray::{s, Array2};
use rand::Rng;

use crate::error::{DataError, Result};
use crate::rng::{seeded, StreamRng};
use crate::sequence::SequenceGenerator;

#[derive(Debug, Clone, Copy)]
pub struct BatchGenerator<'a> {
    sequences:  &'a SequenceGenerator,
    batch_size: usize,
}

impl<'a> BatchGenerator<'a> {
    pub fn new(sequences: &'a SequenceGenerator, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(DataError::config("batch_size must be positive"));
        }
        Ok(Self { sequences, batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Token and annotation arrays, both shaped (batch_size, L+1).
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(Array2<usize>, Array2<i64>)> {
        let width = self.sequences.sequence_len();
        let mut tokens = Vec::with_capacity(self.batch_size * width);
        let mut annotations = Vec::with_capacity(self.batch_size * width);

        for _ in 0..self.batch_size {
            let (seq, ann) = self.sequences.generate(rng)?;
            tokens.extend(seq);
            annotations.extend(ann);
        }

        let shape = (self.batch_size, width);
        Ok((
            Array2::from_shape_vec(shape, tokens)?,
            Array2::from_shape_vec(shape, annotations)?,
        ))
    }
}

/// One pull from a [`BatchStream`]; every array is (batch_size, L).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub inputs:      Array2<usize>,
    pub targets:     Array2<usize>,
    pub annotations: Array2<i64>,
}

impl Batch {
    pub fn from_arrays(tokens: &Array2<usize>, annotations: &Array2<i64>) -> Self {
        Self {
            inputs:      tokens.slice(s![.., ..-1]).to_owned(),
            targets:     tokens.slice(s![.., 1..]).to_owned(),
            annotations: annotations.slice(s![.., ..-1]).to_owned(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.inputs.nrows()
    }

    pub fn seq_length(&self) -> usize {
        self.inputs.ncols()
    }
}

/// Infinite, seeded stream of batches. Restart by building a new stream
/// with the same seed; the RNG is never reset mid-stream.
pub struct BatchStream<'a> {
    batches: BatchGenerator<'a>,
    rng:     StreamRng,
    pulled:  usize,
}

impl<'a> BatchStream<'a> {
    pub fn new(batches: BatchGenerator<'a>, seed: u64) -> Self {
        Self { batches, rng: seeded(seed), pulled: 0 }
    }

    /// Batches produced so far.
    pub fn pulled(&self) -> usize {
        self.pulled
    }
}

impl Iterator for BatchStream<'_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch = self.batches
            .generate(&mut self.rng)
            .map(|(tokens, annotations)| Batch::from_arrays(&tokens, &annotations));
        self.pulled += 1;
        trace!("batch {} generated ({} sequences)", self.pulled, self.batches.batch_size());
        Some(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataArgs;
    use crate::distribution::DistributionModel;
    use crate::stats::CorpusStats;
    use crate::trigger::ResponsePolicy;
    use crate::vocab::Vocabulary;

    fn sequences(args: &DataArgs) -> SequenceGenerator {
        let stats = CorpusStats::from_text("to be or not to be that is the question");
        let vocab = Vocabulary::from_stats(&stats).unwrap();
        let dist = DistributionModel::from_stats(&vocab, &stats).unwrap();
        SequenceGenerator::new(args, dist, ResponsePolicy::new(true, None, false).unwrap()).unwrap()
    }

    #[test]
    fn batch_shape_is_b_by_l_plus_one() {
        let args = DataArgs { k: 2, seq_length: 12, ..DataArgs::default() };
        let sg = sequences(&args);
        let batches = BatchGenerator::new(&sg, 5).unwrap();
        let (tokens, ann) = batches.generate(&mut seeded(0)).unwrap();
        assert_eq!(tokens.dim(), (5, 13));
        assert_eq!(ann.dim(), (5, 13));
    }

    #[test]
    fn rows_are_sequential_generations() {
        let args = DataArgs { k: 1, seq_length: 10, ..DataArgs::default() };
        let sg = sequences(&args);
        let (tokens, ann) = BatchGenerator::new(&sg, 3).unwrap().generate(&mut seeded(8)).unwrap();

        let mut rng = seeded(8);
        for row in 0..3 {
            let (seq, a) = sg.generate(&mut rng).unwrap();
            assert_eq!(tokens.row(row).to_vec(), seq);
            assert_eq!(ann.row(row).to_vec(), a);
        }
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let sg = sequences(&DataArgs { seq_length: 4, ..DataArgs::default() });
        assert!(matches!(BatchGenerator::new(&sg, 0), Err(DataError::Configuration(_))));
    }

    #[test]
    fn stream_shifts_targets_by_one() {
        let args = DataArgs { k: 2, seq_length: 16, ..DataArgs::default() };
        let sg = sequences(&args);
        let mut stream = BatchStream::new(BatchGenerator::new(&sg, 4).unwrap(), 42);
        let batch = stream.next().unwrap().unwrap();

        assert_eq!(batch.inputs.dim(), (4, 16));
        assert_eq!(batch.targets.dim(), (4, 16));
        assert_eq!(batch.annotations.dim(), (4, 16));
        assert_eq!(batch.inputs.slice(s![.., 1..]), batch.targets.slice(s![.., ..-1]));
        assert_eq!(stream.pulled(), 1);
    }

    #[test]
    fn same_seed_same_batches() {
        let args = DataArgs { k: 3, seq_length: 20, ..DataArgs::default() };
        let sg = sequences(&args);
        let batches = BatchGenerator::new(&sg, 6).unwrap();

        let a: Vec<Batch> = BatchStream::new(batches, 7).take(3).map(|b| b.unwrap()).collect();
        let b: Vec<Batch> = BatchStream::new(batches, 7).take(3).map(|b| b.unwrap()).collect();
        assert_eq!(a, b);

        let c: Vec<Batch> = BatchStream::new(batches, 8).take(3).map(|b| b.unwrap()).collect();
        assert_ne!(a, c);
    }

    #[test]
    fn consecutive_batches_differ() {
        let args = DataArgs { k: 1, seq_length: 32, ..DataArgs::default() };
        let sg = sequences(&args);
        let mut stream = BatchStream::new(BatchGenerator::new(&sg, 2).unwrap(), 1);
        let first = stream.next().unwrap().unwrap();
        let second = stream.next().unwrap().unwrap();
        assert_ne!(first, second);
    }
}
