use std::ops::RangeInclusive;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::config::SimConfig;
use crate::form::{FormState, apply_form_to_strength};
use crate::model::{Attributes, Player, PlayerId, Slot, SlotPair, Venue};

pub const SECTIONS: usize = 4;

pub trait ScoreablePlayer {
    fn player_id(&self) -> Option<PlayerId>;
    fn base_attributes(&self) -> Attributes;
    fn form(&self) -> Option<&FormState>;

    fn effective_attributes(&self) -> Attributes {
        let mut attrs = self.base_attributes();
        attrs.strength = apply_form_to_strength(attrs.strength, self);
        attrs
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmergencySubstitute;

impl ScoreablePlayer for EmergencySubstitute {
    fn player_id(&self) -> Option<PlayerId> {
        None
    }

    fn base_attributes(&self) -> Attributes {
        Attributes::neutral()
    }

    fn form(&self) -> Option<&FormState> {
        None
    }
}

impl ScoreablePlayer for Player {
    fn player_id(&self) -> Option<PlayerId> {
        Some(self.id)
    }

    fn base_attributes(&self) -> Attributes {
        self.attributes
    }

    fn form(&self) -> Option<&FormState> {
        Some(&self.form)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Bowler<'a> {
    Real(&'a Player),
    Substitute(EmergencySubstitute),
}

impl Bowler<'_> {
    pub fn is_substitute(&self) -> bool {
        matches!(self, Bowler::Substitute(_))
    }
}

impl ScoreablePlayer for Bowler<'_> {
    fn player_id(&self) -> Option<PlayerId> {
        match self {
            Bowler::Real(p) => p.player_id(),
            Bowler::Substitute(s) => s.player_id(),
        }
    }

    fn base_attributes(&self) -> Attributes {
        match self {
            Bowler::Real(p) => p.base_attributes(),
            Bowler::Substitute(s) => s.base_attributes(),
        }
    }

    fn form(&self) -> Option<&FormState> {
        match self {
            Bowler::Real(p) => p.form(),
            Bowler::Substitute(_) => None,
        }
    }
}

/// Per-tier scoring envelope. Stronger tiers sit higher and vary less.
#[derive(Debug, Clone)]
pub struct TierProfile {
    pub section_floor: f64,
    pub section_ceiling: f64,
    pub spread: f64,
    pub errors: RangeInclusive<u32>,
}

pub fn tier_profile(tier: u8) -> TierProfile {
    match tier {
        0 | 1 => TierProfile {
            section_floor: 138.0,
            section_ceiling: 162.0,
            spread: 7.0,
            errors: 0..=5,
        },
        2 => TierProfile {
            section_floor: 132.0,
            section_ceiling: 158.0,
            spread: 8.0,
            errors: 0..=7,
        },
        3 => TierProfile {
            section_floor: 125.0,
            section_ceiling: 153.0,
            spread: 9.5,
            errors: 1..=9,
        },
        _ => TierProfile {
            section_floor: 115.0,
            section_ceiling: 148.0,
            spread: 11.0,
            errors: 2..=12,
        },
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScoringContext {
    pub slot: Slot,
    pub venue: Venue,
    pub home_advantage: bool,
    pub lane_quality: f64,
    pub tier: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GameScore {
    pub sections: [u32; SECTIONS],
    pub total: u32,
    pub full_pins: u32,
    pub clearing: u32,
    pub errors: u32,
}

pub fn venue_multiplier(attrs: &Attributes, ctx: &ScoringContext, cfg: &SimConfig) -> f64 {
    if !ctx.home_advantage {
        return 1.0;
    }
    match ctx.venue {
        Venue::Home => cfg.home_multiplier,
        Venue::Away => cfg.away_multiplier(attrs.away_performance),
    }
}

fn section_phase(section: usize) -> SlotPair {
    match section {
        0 => SlotPair::Start,
        1 | 2 => SlotPair::Middle,
        _ => SlotPair::End,
    }
}

pub fn section_mean(attrs: &Attributes, section: usize, slot: Slot, profile: &TierProfile) -> f64 {
    let core = attrs.weighted_rating();
    let phase = f64::from(attrs.phase_skill(section_phase(section)));
    let mut skill = 0.8 * core + 0.2 * phase;

    if section >= 2 {
        let fatigue = (99.0 - f64::from(attrs.endurance)) / 99.0;
        skill -= fatigue * 4.0 * (section as f64 - 1.0);
    }
    if slot.pair() == SlotPair::End {
        skill += (f64::from(attrs.pressure_resistance) - 50.0) / 49.0 * 2.0;
    }

    let skill = skill.clamp(1.0, 99.0);
    profile.section_floor + (profile.section_ceiling - profile.section_floor) * skill / 99.0
}

pub fn simulate_game<P, R>(player: &P, ctx: &ScoringContext, cfg: &SimConfig, rng: &mut R) -> GameScore
where
    P: ScoreablePlayer + ?Sized,
    R: Rng + ?Sized,
{
    let attrs = player.effective_attributes();
    let profile = tier_profile(ctx.tier);
    let multiplier = venue_multiplier(&attrs, ctx, cfg) * ctx.lane_quality.max(0.0);

    let sd = profile.spread * (1.25 - 0.5 * f64::from(attrs.consistency) / 99.0);
    let noise = Normal::new(0.0, sd.max(0.1)).ok();
    let lo = profile.section_floor - 3.0 * profile.spread;
    let hi = profile.section_ceiling + 3.0 * profile.spread;

    let mut sections = [0u32; SECTIONS];
    for (idx, section) in sections.iter_mut().enumerate() {
        let mean = section_mean(&attrs, idx, ctx.slot, &profile);
        let jitter = noise.as_ref().map(|n| n.sample(rng)).unwrap_or(0.0);
        let raw = (mean + jitter).clamp(lo, hi);
        *section = (raw * multiplier).round().max(0.0) as u32;
    }
    let total = sections.iter().sum::<u32>();

    let share = 2.0 / 3.0 + (f64::from(attrs.full_pins) - f64::from(attrs.clearing)) / 99.0 * 0.05;
    let full_pins = ((f64::from(total) * share).round() as u32).min(total);
    let clearing = total - full_pins;

    GameScore {
        sections,
        total,
        full_pins,
        clearing,
        errors: draw_errors(&attrs, &profile, rng),
    }
}

fn draw_errors<R: Rng + ?Sized>(attrs: &Attributes, profile: &TierProfile, rng: &mut R) -> u32 {
    let base = f64::from(rng.gen_range(profile.errors.clone()));
    let factor = 1.4 - 0.8 * f64::from(attrs.safety) / 99.0;
    let lo = f64::from(*profile.errors.start());
    let hi = f64::from(*profile.errors.end());
    (base * factor).round().clamp(lo, hi) as u32
}
