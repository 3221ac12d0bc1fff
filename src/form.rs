use std::ops::RangeInclusive;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::{ATTR_MAX, ATTR_MIN, Player};
use crate::scoring::ScoreablePlayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormScale {
    Short,
    Medium,
    Long,
}

#[derive(Debug, Clone, Copy)]
pub struct FormBand {
    pub amplitude: f64,
    pub min_days: u32,
    pub max_days: u32,
    pub trigger_chance: f64,
}

impl FormBand {
    pub fn days(&self) -> RangeInclusive<u32> {
        self.min_days..=self.max_days
    }
}

pub const SHORT_BAND: FormBand = FormBand {
    amplitude: 10.0,
    min_days: 1,
    max_days: 3,
    trigger_chance: 0.15,
};

pub const MEDIUM_BAND: FormBand = FormBand {
    amplitude: 7.0,
    min_days: 4,
    max_days: 8,
    trigger_chance: 0.08,
};

pub const LONG_BAND: FormBand = FormBand {
    amplitude: 5.0,
    min_days: 10,
    max_days: 20,
    trigger_chance: 0.04,
};

impl FormScale {
    pub const ALL: [FormScale; 3] = [FormScale::Short, FormScale::Medium, FormScale::Long];

    pub fn band(self) -> FormBand {
        match self {
            FormScale::Short => SHORT_BAND,
            FormScale::Medium => MEDIUM_BAND,
            FormScale::Long => LONG_BAND,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FormTrack {
    pub modifier: f64,
    pub remaining_days: u32,
}

impl FormTrack {
    pub fn is_active(&self) -> bool {
        self.remaining_days > 0
    }

    /// One simulated day. An expiring track is cleared and stays quiet until
    /// the next call.
    pub fn advance<R: Rng + ?Sized>(&mut self, band: FormBand, rng: &mut R) {
        if self.remaining_days > 0 {
            self.remaining_days -= 1;
            if self.remaining_days == 0 {
                self.modifier = 0.0;
            }
            return;
        }

        if rng.gen_bool(band.trigger_chance) {
            self.modifier = rng.gen_range(-band.amplitude..=band.amplitude);
            self.remaining_days = rng.gen_range(band.days());
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    pub short: FormTrack,
    pub medium: FormTrack,
    pub long: FormTrack,
}

impl FormState {
    pub fn track(&self, scale: FormScale) -> &FormTrack {
        match scale {
            FormScale::Short => &self.short,
            FormScale::Medium => &self.medium,
            FormScale::Long => &self.long,
        }
    }

    pub fn track_mut(&mut self, scale: FormScale) -> &mut FormTrack {
        match scale {
            FormScale::Short => &mut self.short,
            FormScale::Medium => &mut self.medium,
            FormScale::Long => &mut self.long,
        }
    }

    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for scale in FormScale::ALL {
            self.track_mut(scale).advance(scale.band(), rng);
        }
    }

    pub fn total_modifier(&self) -> f64 {
        self.short.modifier + self.medium.modifier + self.long.modifier
    }
}

pub fn advance_all<'a, R, I>(players: I, rng: &mut R) -> usize
where
    R: Rng + ?Sized,
    I: IntoIterator<Item = &'a mut Player>,
{
    let mut count = 0usize;
    for player in players {
        if player.retired {
            continue;
        }
        player.form.advance(rng);
        count += 1;
    }
    count
}

pub fn get_player_total_form_modifier<P: ScoreablePlayer + ?Sized>(player: &P) -> f64 {
    player.form().map(FormState::total_modifier).unwrap_or(0.0)
}

pub fn apply_form(base: u8, modifier: f64) -> u8 {
    let value = (f64::from(base) + modifier).round();
    value.clamp(f64::from(ATTR_MIN), f64::from(ATTR_MAX)) as u8
}

pub fn apply_form_to_strength<P: ScoreablePlayer + ?Sized>(base: u8, player: &P) -> u8 {
    apply_form(base, get_player_total_form_modifier(player))
}
