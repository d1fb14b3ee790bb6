/* ------------------------------------------------------------------ */
/* Trigger selection and per-trigger response policy                  */
/* ------------------------------------------------------------------ */
//
// A trigger is a token whose successor is forced: every time it appears,
// the next token is its response, drawn once per sequence.
//
// Selection:
//   Fixed  — k tokens picked once by marginal rank, skipping the `offset`
//            most frequent ones.
//   Random — k distinct tokens per sequence, weighted by the marginal.
//
// Response policy = weighting × pool rule, resolved from the options once:
//   weighting ∈ {Uniform, BigramWeighted}
//   pool      ∈ {Full, SelfExcluded, TrainSplit, TestSplit}

use log::debug;
use rand::seq::IndexedRandom;
use rand::Rng;
use rayon::prelude::*;

use crate::config::{DataArgs, Split, TRAIN_FRACTION};
use crate::distribution::DistributionModel;
use crate::error::{DataError, Result};
use crate::rng::{choose_weighted, sample_without_replacement};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    Uniform,
    /// Trigger's conditional row restricted to the pool and renormalized.
    BigramWeighted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolRule {
    Full,
    SelfExcluded,
    TrainSplit { exclude_self: bool },
    TestSplit { exclude_self: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponsePolicy {
    pub weighting: Weighting,
    pub pool:      PoolRule,
}

// Number of leading pool positions reserved for the train side of the split.
pub fn train_boundary(vocab_size: usize) -> usize {
    (TRAIN_FRACTION * vocab_size as f64) as usize
}

impl ResponsePolicy {
    pub fn new(no_repeat: bool, split: Option<Split>, bigram_outs: bool) -> Result<Self> {
        if split.is_some() && bigram_outs {
            return Err(DataError::config(
                "bigram-weighted responses need the full vocabulary and cannot be combined with a train/test split",
            ));
        }
        let pool = match (split, no_repeat) {
            (None, false) => PoolRule::Full,
            (None, true) => PoolRule::SelfExcluded,
            (Some(Split::Train), exclude_self) => PoolRule::TrainSplit { exclude_self },
            (Some(Split::Test), exclude_self) => PoolRule::TestSplit { exclude_self },
        };
        let weighting = if bigram_outs { Weighting::BigramWeighted } else { Weighting::Uniform };
        Ok(Self { weighting, pool })
    }

    /// Candidate responses for `trigger`, in ascending id order.
    ///
    /// The split boundary comes from the raw vocabulary size and is applied
    /// positionally after the trigger has been removed from the pool.
    pub fn candidate_pool(&self, trigger: usize, vocab_size: usize) -> Vec<usize> {
        let exclude_self = match self.pool {
            PoolRule::Full => false,
            PoolRule::SelfExcluded => true,
            PoolRule::TrainSplit { exclude_self } | PoolRule::TestSplit { exclude_self } => exclude_self,
        };
        let pool: Vec<usize> = (0..vocab_size)
            .filter(|&t| !(exclude_self && t == trigger))
            .collect();

        let boundary = train_boundary(vocab_size).min(pool.len());
        match self.pool {
            PoolRule::TrainSplit { .. } => pool[..boundary].to_vec(),
            PoolRule::TestSplit { .. } => pool[boundary..].to_vec(),
            PoolRule::Full | PoolRule::SelfExcluded => pool,
        }
    }

    pub fn sample_response<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        trigger: usize,
        dist: &DistributionModel,
    ) -> Result<usize> {
        let pool = self.candidate_pool(trigger, dist.vocab_size());
        match self.weighting {
            Weighting::Uniform => pool.choose(rng).copied().ok_or_else(|| {
                DataError::precondition(format!("response pool for trigger {trigger} is empty"))
            }),
            Weighting::BigramWeighted => {
                let row = dist.row(trigger);
                let weights: Vec<f64> = pool.iter().map(|&t| row[t]).collect();
                choose_weighted(rng, &pool, &weights).map_err(|_| {
                    DataError::precondition(format!(
                        "trigger {trigger} has no bigram mass inside its response pool"
                    ))
                })
            }
        }
    }

    // Same checks sample_response would hit, without drawing.
    fn check(&self, trigger: usize, dist: &DistributionModel) -> Result<()> {
        let pool = self.candidate_pool(trigger, dist.vocab_size());
        if pool.is_empty() {
            return Err(DataError::precondition(format!(
                "response pool for trigger {trigger} is empty"
            )));
        }
        if self.weighting == Weighting::BigramWeighted {
            let row = dist.row(trigger);
            if pool.iter().all(|&t| row[t] <= 0.0) {
                return Err(DataError::precondition(format!(
                    "trigger {trigger} has no bigram mass inside its response pool"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerSelection {
    Fixed(Vec<usize>),
    Random { k: usize },
}

/// Triggers and their responses for one sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triggers {
    pub ids:       Vec<usize>,
    pub responses: Vec<usize>,
}

impl Triggers {
    /// Position of `token` in the trigger list, if it is a trigger.
    pub fn slot(&self, token: usize) -> Option<usize> {
        self.ids.iter().position(|&t| t == token)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TriggerPolicy {
    selection: TriggerSelection,
    response:  ResponsePolicy,
}

impl TriggerPolicy {
    /// Resolves the selection mode and validates every trigger that can
    /// ever be drawn, so sequence generation does not fail on a pool
    /// that was empty from the start.
    pub fn new(args: &DataArgs, dist: &DistributionModel, response: ResponsePolicy) -> Result<Self> {
        let n = dist.vocab_size();
        if args.k > n {
            return Err(DataError::precondition(format!(
                "k={} triggers requested from a vocabulary of {n}",
                args.k
            )));
        }

        let selection = if args.fixed_special_toks {
            TriggerSelection::Fixed(Self::fixed_triggers(
                dist.marginal().as_slice().unwrap_or(&[]),
                args.k,
                args.special_toks_offset,
            )?)
        } else {
            let support = dist.marginal().iter().filter(|&&p| p > 0.0).count();
            if args.k > support {
                return Err(DataError::precondition(format!(
                    "k={} triggers requested but only {support} tokens have nonzero marginal",
                    args.k
                )));
            }
            TriggerSelection::Random { k: args.k }
        };

        let candidates: Vec<usize> = match &selection {
            TriggerSelection::Fixed(ids) => ids.clone(),
            TriggerSelection::Random { k: 0 } => Vec::new(),
            TriggerSelection::Random { .. } => {
                (0..n).filter(|&t| dist.marginal()[t] > 0.0).collect()
            }
        };
        candidates.par_iter().try_for_each(|&t| response.check(t, dist))?;

        debug!("trigger policy: {:?}, responses {:?}", selection, response);
        Ok(Self { selection, response })
    }

    /// The `k` tokens whose marginal rank sits just below the `offset` most
    /// frequent ones, ordered by ascending probability. Ties keep id order.
    pub fn fixed_triggers(marginal: &[f64], k: usize, offset: usize) -> Result<Vec<usize>> {
        let n = marginal.len();
        if offset.checked_add(k).map_or(true, |end| end > n) {
            return Err(DataError::precondition(format!(
                "fixed triggers need offset + k <= vocab size ({offset} + {k} > {n})"
            )));
        }
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| marginal[a].total_cmp(&marginal[b]));
        Ok(order[n - offset - k..n - offset].to_vec())
    }

    pub fn k(&self) -> usize {
        match &self.selection {
            TriggerSelection::Fixed(ids) => ids.len(),
            TriggerSelection::Random { k } => *k,
        }
    }

    pub fn selection(&self) -> &TriggerSelection {
        &self.selection
    }

    pub fn response_policy(&self) -> ResponsePolicy {
        self.response
    }

    /// Picks this sequence's triggers, then one response per trigger.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R, dist: &DistributionModel) -> Result<Triggers> {
        let ids = match &self.selection {
            TriggerSelection::Fixed(ids) => ids.clone(),
            TriggerSelection::Random { k } => {
                let weights = dist.marginal().as_slice().unwrap_or(&[]);
                sample_without_replacement(rng, weights, *k)?
            }
        };
        let responses = ids.iter()
            .map(|&t| self.response.sample_response(rng, t, dist))
            .collect::<Result<Vec<_>>>()?;
        Ok(Triggers { ids, responses })
    }
}
