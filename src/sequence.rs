/* ------------------------------------------------------------------ */
/* Single-sequence generation: bigram chain with forced responses     */
/* ------------------------------------------------------------------ */
//
// One sequence of L+1 tokens and a parallel annotation of the same length:
//
//   [latent prefix]  trigger ids, annotated LATENT_MARKER (show_latents only)
//   first token      drawn from the marginal
//   each next token  trigger → its response, annotated with the occurrence
//                    count (or TRIGGERED when counting is off)
//                    other → drawn from the conditional row, annotated BACKGROUND
//   closing          one extra BACKGROUND annotation so both lengths match
//
// Draw order inside one call: trigger selection, responses, the marginal
// draw, then one conditional draw per background step.

use rand::Rng;

use crate::config::{DataArgs, BACKGROUND, LATENT_MARKER, TRIGGERED};
use crate::distribution::DistributionModel;
use crate::error::Result;
use crate::trigger::{ResponsePolicy, TriggerPolicy};

/// Token ids and annotation of one generated sequence.
pub type Sequence = (Vec<usize>, Vec<i64>);

#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    dist:           DistributionModel,
    triggers:       TriggerPolicy,
    seq_length:     usize,
    show_latents:   bool,
    output_counter: bool,
}

impl SequenceGenerator {
    pub fn new(args: &DataArgs, dist: DistributionModel, response: ResponsePolicy) -> Result<Self> {
        args.validate()?;
        let triggers = TriggerPolicy::new(args, &dist, response)?;
        Ok(Self {
            dist,
            triggers,
            seq_length:     args.seq_length,
            show_latents:   args.show_latents,
            output_counter: args.output_counter,
        })
    }

    /// Number of tokens in each generated sequence (L+1).
    pub fn sequence_len(&self) -> usize {
        self.seq_length + 1
    }

    pub fn seq_length(&self) -> usize {
        self.seq_length
    }

    pub fn distributions(&self) -> &DistributionModel {
        &self.dist
    }

    pub fn trigger_policy(&self) -> &TriggerPolicy {
        &self.triggers
    }

    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Sequence> {
        let drawn = self.triggers.draw(rng, &self.dist)?;
        let len = self.sequence_len();

        let mut seq = Vec::with_capacity(len);
        let mut annotation = Vec::with_capacity(len);
        if self.show_latents {
            seq.extend_from_slice(&drawn.ids);
            annotation.resize(drawn.len(), LATENT_MARKER);
        }
        seq.push(self.dist.sample_marginal(rng));

        let mut fired = vec![0i64; drawn.len()];
        while seq.len() < len {
            let last = seq[seq.len() - 1];
            match drawn.slot(last) {
                Some(slot) => {
                    seq.push(drawn.responses[slot]);
                    if self.output_counter {
                        fired[slot] += 1;
                        annotation.push(fired[slot]);
                    } else {
                        annotation.push(TRIGGERED);
                    }
                }
                None => {
                    annotation.push(BACKGROUND);
                    seq.push(self.dist.sample_next(rng, last));
                }
            }
        }
        annotation.push(BACKGROUND);

        Ok((seq, annotation))
    }

    /// Unbounded stream of sequences drawn from `rng`.
    pub fn sequences<'a, R: Rng + ?Sized>(&'a self, rng: &'a mut R) -> SequenceStream<'a, R> {
        SequenceStream { generator: self, rng }
    }
}

/// Infinite iterator over single sequences; never yields `None`.
pub struct SequenceStream<'a, R: Rng + ?Sized> {
    generator: &'a SequenceGenerator,
    rng:       &'a mut R,
}

impl<R: Rng + ?Sized> Iterator for SequenceStream<'_, R> {
    type Item = Result<Sequence>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.generator.generate(&mut *self.rng))
    }
}
