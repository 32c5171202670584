//! The vote capability and the independent strategies.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use market_ledger::{Curator, Post, Vote};

use crate::error::Result;
use crate::group::GroupId;

/// Stake multiple a whale is created with, relative to a regular curator.
pub const WHALE_STAKE_MULTIPLIER: f64 = 50.0;

/// What a curator sees when asked to vote: two posts and nothing about
/// the slot they came from.
///
/// Ballots are presented in a shuffled order, so `seq` says nothing about
/// whether the pair is regular, golden-set or audit.
#[derive(Debug, Clone, Copy)]
pub struct Ballot<'a> {
    /// Round the ballot belongs to.
    pub round_id: u64,
    /// Presentation order within the round. Unique per round.
    pub seq: usize,
    /// Post shown on the left.
    pub left: &'a Post,
    /// Post shown on the right.
    pub right: &'a Post,
}

impl<'a> Ballot<'a> {
    /// Creates a ballot.
    pub fn new(round_id: u64, seq: usize, left: &'a Post, right: &'a Post) -> Self {
        Self {
            round_id,
            seq,
            left,
            right,
        }
    }

    /// Side holding the higher-rated post, `None` on equal ratings.
    pub fn higher_rated(&self) -> Option<Vote> {
        if self.left.rating > self.right.rating {
            Some(Vote::Left)
        } else if self.right.rating > self.left.rating {
            Some(Vote::Right)
        } else {
            None
        }
    }
}

/// Source of curator votes.
///
/// The settlement engine asks once per curator per pair. Implementations
/// must draw all randomness from `rng` so seeded runs are reproducible.
pub trait VoteSource {
    /// Decides how `curator` votes on `ballot`.
    ///
    /// # Errors
    ///
    /// Implementation-defined. Coordinated groups reject non-members.
    fn vote(&mut self, ballot: &Ballot<'_>, curator: &Curator, rng: &mut StdRng) -> Result<Vote>;
}

/// A curator's voting behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Strategy {
    /// Reads both posts; accuracy clamped to `[0.70, 0.80]`.
    Honest {
        /// Probability of picking the higher-rated post.
        accuracy: f64,
    },
    /// Votes without reading.
    Random,
    /// Always votes LEFT.
    Lazy,
    /// Automated judge; accuracy clamped to `[0.65, 0.75]`.
    AiBot {
        /// Probability of picking the higher-rated post.
        accuracy: f64,
    },
    /// Honest behavior with concentrated stake.
    Whale {
        /// Probability of picking the higher-rated post.
        accuracy: f64,
    },
    /// Delegates to a registered coordinated group.
    Coordinated {
        /// Group index in the strategy book.
        group: GroupId,
    },
}

impl Strategy {
    /// Honest curator at the given accuracy.
    pub fn honest(accuracy: f64) -> Self {
        Strategy::Honest { accuracy }
    }

    /// AI bot at the given accuracy.
    pub fn ai_bot(accuracy: f64) -> Self {
        Strategy::AiBot { accuracy }
    }

    /// Whale at the given accuracy.
    pub fn whale(accuracy: f64) -> Self {
        Strategy::Whale { accuracy }
    }

    /// Short name used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::Honest { .. } => "honest",
            Strategy::Random => "random",
            Strategy::Lazy => "lazy",
            Strategy::AiBot { .. } => "ai_bot",
            Strategy::Whale { .. } => "whale",
            Strategy::Coordinated { .. } => "coordinated",
        }
    }

    /// Accuracy actually used when voting, after clamping.
    pub fn effective_accuracy(&self) -> Option<f64> {
        match *self {
            Strategy::Honest { accuracy } => Some(clamp_probability(accuracy, 0.70, 0.80)),
            Strategy::AiBot { accuracy } => Some(clamp_probability(accuracy, 0.65, 0.75)),
            Strategy::Whale { accuracy } => Some(clamp_probability(accuracy, 0.0, 1.0)),
            Strategy::Random | Strategy::Lazy | Strategy::Coordinated { .. } => None,
        }
    }

    /// Stake multiple relative to a regular curator.
    pub fn stake_multiplier(&self) -> f64 {
        match self {
            Strategy::Whale { .. } => WHALE_STAKE_MULTIPLIER,
            _ => 1.0,
        }
    }

    /// Group this strategy delegates to, if any.
    pub fn group(&self) -> Option<GroupId> {
        match self {
            Strategy::Coordinated { group } => Some(*group),
            _ => None,
        }
    }

    /// Vote of a non-coordinated strategy. `None` for `Coordinated`.
    pub(crate) fn independent_vote<R: Rng + ?Sized>(&self, ballot: &Ballot<'_>, rng: &mut R) -> Option<Vote> {
        match self {
            Strategy::Lazy => Some(Vote::Left),
            Strategy::Random => Some(coin_flip(rng)),
            Strategy::Coordinated { .. } => None,
            Strategy::Honest { .. } | Strategy::AiBot { .. } | Strategy::Whale { .. } => {
                let accuracy = self.effective_accuracy().unwrap_or(0.5);
                Some(match ballot.higher_rated() {
                    Some(correct) => pick(correct, accuracy, rng),
                    None => coin_flip(rng),
                })
            }
        }
    }
}

/// Left or right with equal probability.
pub(crate) fn coin_flip<R: Rng + ?Sized>(rng: &mut R) -> Vote {
    if rng.gen_bool(0.5) {
        Vote::Left
    } else {
        Vote::Right
    }
}

/// `correct` with probability `accuracy`, otherwise the other side.
pub(crate) fn pick<R: Rng + ?Sized>(correct: Vote, accuracy: f64, rng: &mut R) -> Vote {
    if rng.gen_bool(accuracy) {
        correct
    } else {
        correct.opposite().unwrap_or(correct)
    }
}

/// Clamps into `[lo, hi]`, mapping NaN to `lo`. The result is always a
/// valid probability.
pub(crate) fn clamp_probability(p: f64, lo: f64, hi: f64) -> f64 {
    if p.is_nan() {
        lo
    } else {
        p.clamp(lo, hi).clamp(0.0, 1.0)
    }
}
