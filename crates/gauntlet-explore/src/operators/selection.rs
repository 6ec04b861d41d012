use std::cmp::Ordering;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::genetic::ranking::{dominates, non_dominated_sort};

/// Orders a population for parent selection.
///
/// Works on loss vectors (lower is better) aligned with the population and
/// returns population indices. Implementations only draw from `rng`.
pub trait SelectionFunction: Send {
    fn select(&self, losses: &[Vec<f64>], rng: &mut ChaCha8Rng) -> Vec<usize>;
}

fn first_loss(losses: &[Vec<f64>], i: usize) -> f64 {
    losses[i].first().copied().unwrap_or(0.0)
}

/// Uniformly shuffled population.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSelection;

impl SelectionFunction for RandomSelection {
    fn select(&self, losses: &[Vec<f64>], rng: &mut ChaCha8Rng) -> Vec<usize> {
        let mut order: Vec<usize> = (0..losses.len()).collect();
        order.shuffle(rng);
        order
    }
}

/// Stable sort by the first objective, best first.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitnessSelection;

impl SelectionFunction for FitnessSelection {
    fn select(&self, losses: &[Vec<f64>], _rng: &mut ChaCha8Rng) -> Vec<usize> {
        let mut order: Vec<usize> = (0..losses.len()).collect();
        order.sort_by(|&a, &b| first_loss(losses, a).total_cmp(&first_loss(losses, b)));
        order
    }
}

/// The population as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySelection;

impl SelectionFunction for IdentitySelection {
    fn select(&self, losses: &[Vec<f64>], _rng: &mut ChaCha8Rng) -> Vec<usize> {
        (0..losses.len()).collect()
    }
}

/// Roulette over ranks: members are ordered by Pareto front, then by
/// first objective, and drawn with weights `n, n-1, .., 1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RankSelection;

impl SelectionFunction for RankSelection {
    fn select(&self, losses: &[Vec<f64>], rng: &mut ChaCha8Rng) -> Vec<usize> {
        let n = losses.len();
        let mut ranked = Vec::with_capacity(n);
        for mut front in non_dominated_sort(losses) {
            front.sort_by(|&a, &b| first_loss(losses, a).total_cmp(&first_loss(losses, b)));
            ranked.extend(front);
        }
        let weights: Vec<usize> = (1..=n).rev().collect();
        let Ok(dist) = WeightedIndex::new(&weights) else {
            return ranked;
        };
        (0..n).map(|_| ranked[dist.sample(rng)]).collect()
    }
}

/// Repeated tournaments of `size` uniformly drawn members.
///
/// A dominating member wins; otherwise the lower first loss wins, and
/// the earlier draw wins a full tie.
#[derive(Debug, Clone, Copy)]
pub struct TournamentSelection {
    size: usize,
}

impl TournamentSelection {
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    fn compare(losses: &[Vec<f64>], a: usize, b: usize) -> Ordering {
        if dominates(&losses[a], &losses[b]) {
            Ordering::Less
        } else if dominates(&losses[b], &losses[a]) {
            Ordering::Greater
        } else {
            first_loss(losses, a).total_cmp(&first_loss(losses, b))
        }
    }
}

impl SelectionFunction for TournamentSelection {
    fn select(&self, losses: &[Vec<f64>], rng: &mut ChaCha8Rng) -> Vec<usize> {
        let n = losses.len();
        if n == 0 {
            return Vec::new();
        }
        (0..n)
            .map(|_| {
                let mut winner = rng.gen_range(0..n);
                for _ in 1..self.size {
                    let challenger = rng.gen_range(0..n);
                    if Self::compare(losses, challenger, winner) == Ordering::Less {
                        winner = challenger;
                    }
                }
                winner
            })
            .collect()
    }
}
