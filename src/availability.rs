use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SimConfig;
use crate::day_context::DayContext;
use crate::model::{AttributeStore, ClubId, PlayerId, SQUAD_SIZE, TeamId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamFixtureStatus {
    pub team_id: TeamId,
    pub tier: u8,
    pub playing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClubFixtureContext {
    Teams(Vec<TeamFixtureStatus>),
    CountOnly { total_teams: usize, playing_teams: usize },
}

#[derive(Debug, Clone)]
pub struct ClubDay {
    pub club_id: ClubId,
    pub context: ClubFixtureContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AvailabilityMode {
    AllPlaying,
    PartialPlaying { stronger_idle: usize },
    CountOnlyFallback { idle: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct ClubAvailability {
    pub club_id: ClubId,
    pub mode: AvailabilityMode,
    pub roster_size: usize,
    pub forced_rate: f64,
    pub random_rate: f64,
    pub forced_unavailable: Vec<PlayerId>,
    pub random_unavailable: Vec<PlayerId>,
}

impl ClubAvailability {
    pub fn unavailable_count(&self) -> usize {
        self.forced_unavailable.len() + self.random_unavailable.len()
    }

    pub fn available_count(&self) -> usize {
        self.roster_size.saturating_sub(self.unavailable_count())
    }
}

pub fn club_fixture_context<S: AttributeStore + ?Sized>(
    store: &S,
    club_id: ClubId,
    playing: &HashSet<TeamId>,
) -> ClubFixtureContext {
    let Some(club) = store.club(club_id) else {
        return ClubFixtureContext::CountOnly {
            total_teams: playing.len(),
            playing_teams: playing.len(),
        };
    };

    let mut statuses = Vec::with_capacity(club.teams.len());
    let mut missing = false;
    for team_id in &club.teams {
        match store.team(*team_id) {
            Some(team) => statuses.push(TeamFixtureStatus {
                team_id: team.id,
                tier: team.tier(),
                playing: playing.contains(&team.id),
            }),
            None => missing = true,
        }
    }

    if missing {
        let playing_teams = club.teams.iter().filter(|t| playing.contains(t)).count();
        return ClubFixtureContext::CountOnly {
            total_teams: club.teams.len(),
            playing_teams,
        };
    }
    ClubFixtureContext::Teams(statuses)
}

/// Number of idle teams that sit in a strictly better tier than the best
/// playing team. `None` when every team plays.
pub fn stronger_idle_teams(statuses: &[TeamFixtureStatus]) -> Option<usize> {
    let best_playing = statuses.iter().filter(|s| s.playing).map(|s| s.tier).min();
    let idle = statuses.iter().filter(|s| !s.playing).collect::<Vec<_>>();
    if idle.is_empty() {
        return None;
    }
    let Some(best_playing) = best_playing else {
        return Some(0);
    };
    Some(idle.iter().filter(|s| s.tier < best_playing).count())
}

pub fn resolve_availability<S, R>(
    store: &S,
    ctx: &mut DayContext,
    clubs: &[ClubDay],
    cfg: &SimConfig,
    rng: &mut R,
) -> Vec<ClubAvailability>
where
    S: AttributeStore + ?Sized,
    R: Rng + ?Sized,
{
    let mut out = Vec::with_capacity(clubs.len());
    for club_day in clubs {
        let summary = resolve_club(store, ctx, club_day, cfg, rng);
        debug!(
            club = %summary.club_id,
            mode = ?summary.mode,
            roster = summary.roster_size,
            unavailable = summary.unavailable_count(),
            "availability resolved"
        );
        out.push(summary);
    }
    out
}

fn resolve_club<S, R>(
    store: &S,
    ctx: &mut DayContext,
    club_day: &ClubDay,
    cfg: &SimConfig,
    rng: &mut R,
) -> ClubAvailability
where
    S: AttributeStore + ?Sized,
    R: Rng + ?Sized,
{
    let mut players = store
        .club_players(club_day.club_id)
        .into_iter()
        .map(|p| (p.id, p.rating()))
        .collect::<Vec<_>>();
    players.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    let ranked = players.iter().map(|(id, _)| *id).collect::<Vec<_>>();

    let (mode, idle_to_protect) = match &club_day.context {
        ClubFixtureContext::Teams(statuses) => match stronger_idle_teams(statuses) {
            None => (AvailabilityMode::AllPlaying, 0),
            Some(n) => (AvailabilityMode::PartialPlaying { stronger_idle: n }, n),
        },
        ClubFixtureContext::CountOnly {
            total_teams,
            playing_teams,
        } => {
            let idle = total_teams.saturating_sub(*playing_teams);
            warn!(
                club = %club_day.club_id,
                idle,
                "team tiers unavailable, using count-only availability"
            );
            if idle == 0 {
                (AvailabilityMode::AllPlaying, 0)
            } else {
                (AvailabilityMode::CountOnlyFallback { idle }, idle)
            }
        }
    };

    let mut forced = Vec::new();
    let mut forced_rate = 0.0;
    if idle_to_protect > 0 {
        let n = (SQUAD_SIZE * idle_to_protect).min(ranked.len());
        let lo = cfg.forced_unavailable_min.clamp(0.0, 1.0);
        let hi = cfg.forced_unavailable_max.clamp(lo, 1.0);
        forced_rate = rng.gen_range(lo..=hi);
        // floor keeps the realised share at or below the drawn rate
        let count = ((n as f64) * forced_rate).floor() as usize;
        let mut candidates = ranked[..n].to_vec();
        candidates.shuffle(rng);
        candidates.truncate(count.min(n));
        candidates.sort_unstable();
        forced = candidates;
    }

    let forced_set = forced.iter().copied().collect::<HashSet<_>>();
    let mut remaining = ranked
        .iter()
        .copied()
        .filter(|id| !forced_set.contains(id))
        .collect::<Vec<_>>();
    let random_rate = rng.gen_range(0.0..=cfg.max_unavailable_rate.clamp(0.0, 1.0));
    let random_count = ((remaining.len() as f64) * random_rate).floor() as usize;
    remaining.shuffle(rng);
    let mut random_out = remaining[..random_count.min(remaining.len())].to_vec();
    random_out.sort_unstable();

    let random_set = random_out.iter().copied().collect::<HashSet<_>>();
    for id in &ranked {
        let unavailable = forced_set.contains(id) || random_set.contains(id);
        ctx.set_available(*id, !unavailable);
    }

    ClubAvailability {
        club_id: club_day.club_id,
        mode,
        roster_size: ranked.len(),
        forced_rate,
        random_rate,
        forced_unavailable: forced,
        random_unavailable: random_out,
    }
}
