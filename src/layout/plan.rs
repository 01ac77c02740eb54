//! Seeded block planning: inclusion, repetition and size draws.
//!
//! One [`Rng64`] stream per sample, consumed strictly in template order. For each template: the
//! inclusion draw (optional templates, and the first member of a choice group), then the count
//! draw (range repeats only), then per repetition the width draw and the height draw (range rules
//! only). A template that is not included consumes nothing beyond its inclusion draw.

use std::collections::{BTreeMap, BTreeSet};

use crate::foundation::core::round_half_up;
use crate::foundation::error::{SynthError, SynthResult};
use crate::foundation::math::Rng64;
use crate::spec::structure::{BoxRule, Dist, DocumentSpec, HeightRule, Inclusion, Repeat};

/// Draws for one block occurrence.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedBlock {
    pub template: usize,
    /// Block id: `<template>` or `<template>[<rep>]`.
    pub id: String,
    pub rep: u32,
    pub width_fraction: Option<f64>,
    /// Drawn height in pixels (relative boxes with a pixel height only).
    pub height_px: Option<f64>,
}

/// Result of planning one sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutPlan {
    pub blocks: Vec<PlannedBlock>,
    /// Template ids with at least one occurrence.
    pub included: BTreeSet<String>,
}

impl LayoutPlan {
    /// Return `true` when the template produced at least one block.
    pub fn is_included(&self, template_id: &str) -> bool {
        self.included.contains(template_id)
    }
}

/// Plan which blocks a seed produces.
pub fn plan_layout(spec: &DocumentSpec, seed: u64) -> SynthResult<LayoutPlan> {
    let mut rng = Rng64::new(seed);
    let groups = spec.choice_groups();
    let mut chosen: BTreeMap<&str, Option<usize>> = BTreeMap::new();
    let mut plan = LayoutPlan::default();

    for (index, t) in spec.blocks.iter().enumerate() {
        let included = match &t.inclusion {
            Inclusion::Required => true,
            Inclusion::Optional { weight } => rng.next_f64_01() < *weight,
            Inclusion::Choice { group, .. } => {
                let pick = match chosen.get(group.as_str()) {
                    Some(pick) => *pick,
                    None => {
                        let members = groups.get(group.as_str()).map_or(&[][..], Vec::as_slice);
                        let pick = pick_member(members, rng.next_f64_01());
                        chosen.insert(group.as_str(), pick);
                        pick
                    }
                };
                pick == Some(index)
            }
        };
        if !included {
            continue;
        }

        let count = match t.repeat {
            Repeat::Fixed(n) => n,
            Repeat::Range { min, max } => draw_count(min, max, rng.next_f64_01()),
        };
        if count > 0 {
            plan.included.insert(t.id.clone());
        }

        for rep in 0..count {
            let (width_fraction, height_px) = match t.bbox {
                BoxRule::Absolute(_) => (None, None),
                BoxRule::Relative(rule) => {
                    let width = draw(rule.width, &mut rng);
                    let height = match rule.height {
                        HeightRule::Auto => None,
                        HeightRule::Px(d) => Some(round_half_up(draw(d, &mut rng))),
                    };
                    (Some(width), height)
                }
            };
            let id = match t.repeat {
                Repeat::Fixed(1) => t.id.clone(),
                _ => format!("{}[{rep}]", t.id),
            };
            plan.blocks.push(PlannedBlock {
                template: index,
                id,
                rep,
                width_fraction,
                height_px,
            });
        }
    }

    let min_blocks = spec.constraints.min_blocks as usize;
    if plan.blocks.len() < min_blocks {
        return Err(SynthError::layout(format!(
            "seed {seed} produced {} blocks, fewer than min_blocks {min_blocks}",
            plan.blocks.len()
        )));
    }
    Ok(plan)
}

/// `clamp(round_half_up(min + u * (max - min)), min, max)`.
pub fn draw_count(min: u32, max: u32, u: f64) -> u32 {
    let v = round_half_up(f64::from(min) + u * f64::from(max.saturating_sub(min)));
    (v as u32).clamp(min, max.max(min))
}

/// Member whose cumulative weight interval contains `u * total`.
fn pick_member(members: &[(usize, f64)], u: f64) -> Option<usize> {
    let total: f64 = members.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return None;
    }
    let target = u * total;
    let mut acc = 0.0;
    for (index, weight) in members {
        acc += weight;
        if target < acc {
            return Some(*index);
        }
    }
    // u < 1, so this is only reached through float rounding at the top of the last interval.
    members.iter().rev().find(|(_, w)| *w > 0.0).map(|(i, _)| *i)
}

fn draw(dist: Dist, rng: &mut Rng64) -> f64 {
    match dist {
        Dist::Fixed(v) => v,
        Dist::Range { .. } => dist.sample(rng.next_f64_01()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layout/plan.rs"]
mod tests;
