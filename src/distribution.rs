/* ------------------------------------------------------------------ */
/* Marginal and conditional (bigram) distributions                    */
/* ------------------------------------------------------------------ */
//
// Built once from raw counts and immutable afterwards. Alongside the
// normalized tables we keep one WeightedIndex per row so the generation
// loop never rebuilds a sampler.

use log::debug;
use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use rand_distr::weighted::WeightedIndex;
use rand_distr::Distribution;
use rayon::prelude::*;

use crate::error::{DataError, Result};
use crate::stats::CorpusStats;
use crate::vocab::Vocabulary;

#[derive(Debug, Clone)]
pub struct DistributionModel {
    marginal:         Array1<f64>,
    conditional:      Array2<f64>,
    marginal_sampler: WeightedIndex<f64>,
    row_samplers:     Vec<WeightedIndex<f64>>,
}

impl DistributionModel {
    pub fn from_stats(vocab: &Vocabulary, stats: &CorpusStats) -> Result<Self> {
        Self::from_counts(
            vocab,
            stats.unigrams.iter().map(|(s, &n)| (s.as_str(), n)),
            stats.bigrams.iter().map(|(a, b, n)| (a.as_str(), b.as_str(), *n)),
        )
    }

    /// Normalizes unigram counts into the marginal and bigram counts into a
    /// row-stochastic conditional matrix. Repeated pairs accumulate.
    pub fn from_counts<'a>(
        vocab: &Vocabulary,
        unigrams: impl IntoIterator<Item = (&'a str, u64)>,
        bigrams: impl IntoIterator<Item = (&'a str, &'a str, u64)>,
    ) -> Result<Self> {
        let n = vocab.len();

        let mut uni = vec![0u64; n];
        for (sym, count) in unigrams {
            uni[vocab.lookup(sym)?] += count;
        }
        let total: u64 = uni.iter().sum();
        if total == 0 {
            return Err(DataError::integrity("unigram counts sum to zero"));
        }
        let marginal: Vec<f64> = uni.iter().map(|&c| c as f64 / total as f64).collect();

        let mut counts = vec![vec![0u64; n]; n];
        for (first, second, count) in bigrams {
            counts[vocab.lookup(first)?][vocab.lookup(second)?] += count;
        }

        // Rows are independent; each one is normalized and gets its sampler.
        let rows: Vec<(Vec<f64>, WeightedIndex<f64>)> = counts
            .par_iter()
            .enumerate()
            .map(|(i, row)| -> Result<(Vec<f64>, WeightedIndex<f64>)> {
                let row_total: u64 = row.iter().sum();
                if row_total == 0 {
                    return Err(DataError::integrity(format!(
                        "no bigram starts with {:?} (id {i}); its conditional row is undefined",
                        vocab.symbol(i).unwrap_or("?")
                    )));
                }
                let probs: Vec<f64> = row.iter().map(|&c| c as f64 / row_total as f64).collect();
                let sampler = WeightedIndex::new(&probs)?;
                Ok((probs, sampler))
            })
            .collect::<Result<_>>()?;

        let mut flat = Vec::with_capacity(n * n);
        let mut row_samplers = Vec::with_capacity(n);
        for (probs, sampler) in rows {
            flat.extend_from_slice(&probs);
            row_samplers.push(sampler);
        }

        let marginal_sampler = WeightedIndex::new(&marginal)?;
        let model = Self {
            marginal: Array1::from(marginal),
            conditional: Array2::from_shape_vec((n, n), flat)?,
            marginal_sampler,
            row_samplers,
        };
        debug!(
            "distributions built: vocab {}, {} unigram tokens, {} nonzero transitions",
            n,
            total,
            model.conditional.iter().filter(|&&p| p > 0.0).count()
        );
        Ok(model)
    }

    pub fn vocab_size(&self) -> usize {
        self.marginal.len()
    }

    pub fn marginal(&self) -> &Array1<f64> {
        &self.marginal
    }

    pub fn conditional(&self) -> &Array2<f64> {
        &self.conditional
    }

    /// Distribution of the token that follows `token`.
    pub fn row(&self, token: usize) -> ArrayView1<'_, f64> {
        self.conditional.row(token)
    }

    pub fn sample_marginal<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.marginal_sampler.sample(rng)
    }

    pub fn sample_next<R: Rng + ?Sized>(&self, rng: &mut R, last: usize) -> usize {
        self.row_samplers[last].sample(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;
    use approx::assert_abs_diff_eq;

    fn vocab(s: &str) -> Vocabulary {
        Vocabulary::from_symbols(s.chars().map(|c| c.to_string()).collect()).unwrap()
    }

    #[test]
    fn tables_are_normalized() {
        let stats = CorpusStats::from_text("the quick brown fox jumps over the lazy dog");
        let vocab = Vocabulary::from_stats(&stats).unwrap();
        let dist = DistributionModel::from_stats(&vocab, &stats).unwrap();

        assert_abs_diff_eq!(dist.marginal().sum(), 1.0, epsilon = 1e-12);
        for row in dist.conditional().rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-12);
            assert!(row.iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn repeated_pairs_accumulate() {
        let v = vocab("ab");
        let dist = DistributionModel::from_counts(
            &v,
            [("a", 3), ("b", 1)],
            [("a", "b", 1), ("a", "b", 2), ("a", "a", 1), ("b", "a", 5)],
        )
        .unwrap();

        assert_abs_diff_eq!(dist.marginal()[0], 0.75);
        assert_abs_diff_eq!(dist.row(0)[1], 0.75);
        assert_abs_diff_eq!(dist.row(0)[0], 0.25);
        assert_abs_diff_eq!(dist.row(1)[0], 1.0);
    }

    #[test]
    fn unknown_symbol_fails() {
        let v = vocab("ab");
        let err = DistributionModel::from_counts(&v, [("a", 1), ("z", 1)], [("a", "b", 1)])
            .unwrap_err();
        assert!(matches!(err, DataError::DataIntegrity(_)));

        let err = DistributionModel::from_counts(&v, [("a", 1)], [("a", "z", 1)]).unwrap_err();
        assert!(matches!(err, DataError::DataIntegrity(_)));
    }

    #[test]
    fn zero_row_fails() {
        let v = vocab("ab");
        let err = DistributionModel::from_counts(&v, [("a", 1), ("b", 1)], [("a", "b", 1)])
            .unwrap_err();
        assert!(err.to_string().contains("\"b\""));
    }

    #[test]
    fn zero_unigram_mass_fails() {
        let v = vocab("a");
        assert!(DistributionModel::from_counts(&v, Vec::<(&str, u64)>::new(), [("a", "a", 1)]).is_err());
    }

    #[test]
    fn deterministic_transitions_are_followed() {
        let v = vocab("abc");
        let dist = DistributionModel::from_counts(
            &v,
            [("a", 1), ("b", 1), ("c", 1)],
            [("a", "b", 4), ("b", "c", 2), ("c", "a", 9)],
        )
        .unwrap();
        let mut rng = seeded(1);
        for _ in 0..20 {
            assert_eq!(dist.sample_next(&mut rng, 0), 1);
            assert_eq!(dist.sample_next(&mut rng, 1), 2);
            assert_eq!(dist.sample_next(&mut rng, 2), 0);
            assert!(dist.sample_marginal(&mut rng) < 3);
        }
    }
}
