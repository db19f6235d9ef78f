//! Per-test result codes
//!
//! Ties always resolve in the test's canonical dimension order: rankings use
//! a stable sort over dimensions that are already canonically ordered.

use super::{round1, DimensionScore, PairShare};
use cca_common::catalog::TestKind;

const MBTI_PAIRS: [(&str, &str); 4] = [("E", "I"), ("S", "N"), ("T", "F"), ("J", "P")];

/// Modalities within this many points of the top share join the VARK code
const VARK_MARGIN: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Interpretation {
    pub result_code: String,
    pub top: Vec<String>,
    pub pairs: Vec<PairShare>,
}

fn raw(dimensions: &[DimensionScore], code: &str) -> f64 {
    dimensions
        .iter()
        .find(|d| d.code == code)
        .map(|d| d.raw)
        .unwrap_or(0.0)
}

/// Dimensions from highest to lowest `key`, canonical order on ties
fn ranked<F>(dimensions: &[DimensionScore], key: F) -> Vec<&DimensionScore>
where
    F: Fn(&DimensionScore) -> f64,
{
    let mut ranked: Vec<&DimensionScore> = dimensions.iter().collect();
    ranked.sort_by(|a, b| key(b).total_cmp(&key(a)));
    ranked
}

fn codes(dimensions: &[&DimensionScore], n: usize) -> Vec<String> {
    dimensions.iter().take(n).map(|d| d.code.clone()).collect()
}

pub fn interpret(kind: TestKind, dimensions: &[DimensionScore]) -> Interpretation {
    match kind {
        TestKind::Mbti => mbti(dimensions),
        TestKind::BigFive => {
            let order = ranked(dimensions, |d| d.percentage);
            leader(&order, order.len())
        }
        TestKind::Disc => {
            let order = ranked(dimensions, |d| d.raw);
            leader(&order, order.len())
        }
        TestKind::Enneagram => enneagram(dimensions),
        TestKind::Gardner => {
            let order = ranked(dimensions, |d| d.percentage);
            leader(&order, 3)
        }
        TestKind::Riasec => {
            let order = ranked(dimensions, |d| d.raw);
            let top = codes(&order, 3);
            Interpretation {
                result_code: top.concat(),
                top,
                pairs: Vec::new(),
            }
        }
        TestKind::Vark => vark(dimensions),
    }
}

/// Code is the first ranked dimension; `top` keeps the first `n`
fn leader(order: &[&DimensionScore], n: usize) -> Interpretation {
    let top = codes(order, n);
    Interpretation {
        result_code: top.first().cloned().unwrap_or_default(),
        top,
        pairs: Vec::new(),
    }
}

fn mbti(dimensions: &[DimensionScore]) -> Interpretation {
    let pairs: Vec<PairShare> = MBTI_PAIRS
        .iter()
        .map(|&(first, second)| {
            let a = raw(dimensions, first);
            let b = raw(dimensions, second);
            let total = a + b;
            let (first_percentage, second_percentage) = if total > 0.0 {
                (round1(a / total * 100.0), round1(b / total * 100.0))
            } else {
                (50.0, 50.0)
            };
            PairShare {
                first: first.to_string(),
                second: second.to_string(),
                first_percentage,
                second_percentage,
                preferred: if b > a { second } else { first }.to_string(),
            }
        })
        .collect();

    Interpretation {
        result_code: pairs.iter().map(|p| p.preferred.as_str()).collect(),
        top: Vec::new(),
        pairs,
    }
}

fn enneagram(dimensions: &[DimensionScore]) -> Interpretation {
    let order = ranked(dimensions, |d| d.raw);
    let Some(primary) = order.first().and_then(|d| d.code.parse::<u8>().ok()) else {
        return Interpretation::default();
    };

    let before = if primary == 1 { 9 } else { primary - 1 };
    let after = if primary == 9 { 1 } else { primary + 1 };
    let wing = if raw(dimensions, &after.to_string()) > raw(dimensions, &before.to_string()) {
        after
    } else {
        before
    };

    Interpretation {
        result_code: format!("{}w{}", primary, wing),
        top: vec![primary.to_string(), wing.to_string()],
        pairs: Vec::new(),
    }
}

fn vark(dimensions: &[DimensionScore]) -> Interpretation {
    let total: f64 = dimensions.iter().map(|d| d.raw).sum();
    let share = |d: &DimensionScore| if total > 0.0 { d.raw / total * 100.0 } else { 0.0 };
    let best = dimensions.iter().map(share).fold(0.0, f64::max);

    let top: Vec<String> = dimensions
        .iter()
        .filter(|d| share(d) >= best - VARK_MARGIN)
        .map(|d| d.code.clone())
        .collect();

    Interpretation {
        result_code: top.concat(),
        top,
        pairs: Vec::new(),
    }
}
