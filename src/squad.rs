use std::collections::{HashMap, HashSet};

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::day_context::DayContext;
use crate::error::{LineupRejection, SimError, SimResult};
use crate::model::{
    AttributeStore, ClubId, CompetitionKind, MatchId, Player, PlayerId, SQUAD_SIZE, Slot,
    SlotPair, TeamId, Venue,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStrategy {
    Random,
    BestFit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineupKey {
    pub match_id: MatchId,
    pub team_id: TeamId,
    pub venue: Venue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualLineup {
    pub key: LineupKey,
    pub players: Vec<PlayerId>,
}

pub trait LineupSource: Sync {
    fn lineup(&self, key: &LineupKey) -> SimResult<Option<ManualLineup>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectionSource {
    Manual,
    Automatic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SquadAssignment {
    pub match_id: MatchId,
    pub team_id: TeamId,
    pub club_id: ClubId,
    pub competition: CompetitionKind,
    pub venue: Venue,
    pub source: SelectionSource,
    pub slots: [Option<PlayerId>; SQUAD_SIZE],
}

impl SquadAssignment {
    pub fn shortfall(&self) -> usize {
        self.slots.iter().filter(|s| s.is_none()).count()
    }

    pub fn players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.slots.iter().flatten().copied()
    }

    pub fn player_at(&self, slot: Slot) -> Option<PlayerId> {
        self.slots[slot.index()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamFixture {
    pub match_id: MatchId,
    pub team_id: TeamId,
    pub competition: CompetitionKind,
    pub venue: Venue,
}

impl TeamFixture {
    pub fn key(&self) -> LineupKey {
        LineupKey {
            match_id: self.match_id,
            team_id: self.team_id,
            venue: self.venue,
        }
    }
}

pub type AssignmentResult = SimResult<SquadAssignment>;

pub fn position_affinity(player: &Player, pair: SlotPair) -> f64 {
    let attrs = &player.attributes;
    let own = f64::from(attrs.phase_skill(pair));
    let mean = (f64::from(attrs.start_skill) + f64::from(attrs.mid_skill) + f64::from(attrs.end_skill)) / 3.0;
    // Raw phase skill dominates; the relative term breaks ties toward specialists.
    own + 0.5 * (own - mean)
}

pub fn validate_manual_lineup<S: AttributeStore + ?Sized>(
    store: &S,
    ctx: &DayContext,
    club_id: ClubId,
    fixture: &TeamFixture,
    lineup: &ManualLineup,
) -> SimResult<()> {
    let reject = |reason: LineupRejection| SimError::InvalidManualLineup {
        match_id: fixture.match_id,
        team_id: fixture.team_id,
        venue: fixture.venue,
        reason,
    };

    if lineup.players.len() != SQUAD_SIZE {
        return Err(reject(LineupRejection::WrongSize {
            found: lineup.players.len(),
        }));
    }

    let mut seen = HashSet::new();
    for id in &lineup.players {
        if !seen.insert(*id) {
            return Err(reject(LineupRejection::DuplicatePlayer(*id)));
        }
        let belongs = store
            .player(*id)
            .is_some_and(|p| p.club_id == club_id && !p.retired);
        if !belongs {
            return Err(reject(LineupRejection::NotInClub(*id)));
        }
        if !ctx.is_available(*id) {
            return Err(reject(LineupRejection::Unavailable(*id)));
        }
        if let Some(by_team) = ctx
            .ledger(fixture.competition)
            .and_then(|l| l.claimed_by(*id))
            .filter(|t| *t != fixture.team_id)
        {
            return Err(reject(LineupRejection::AlreadyClaimed {
                player: *id,
                by_team,
            }));
        }
    }
    Ok(())
}

pub fn apply_manual_lineup<S: AttributeStore + ?Sized>(
    store: &S,
    ctx: &mut DayContext,
    club_id: ClubId,
    fixture: &TeamFixture,
    lineup: &ManualLineup,
) -> AssignmentResult {
    validate_manual_lineup(store, ctx, club_id, fixture, lineup)?;

    let ledger = ctx.ledger_mut(fixture.competition);
    let mut slots = [None; SQUAD_SIZE];
    for (idx, id) in lineup.players.iter().enumerate() {
        ledger.claim(*id, club_id, fixture.team_id)?;
        slots[idx] = Some(*id);
    }

    Ok(SquadAssignment {
        match_id: fixture.match_id,
        team_id: fixture.team_id,
        club_id,
        competition: fixture.competition,
        venue: fixture.venue,
        source: SelectionSource::Manual,
        slots,
    })
}

pub fn eligible_players<'a, S: AttributeStore + ?Sized>(
    store: &'a S,
    ctx: &DayContext,
    club_id: ClubId,
    competition: CompetitionKind,
) -> Vec<&'a Player> {
    let mut players = store
        .club_players(club_id)
        .into_iter()
        .filter(|p| ctx.is_available(p.id) && !ctx.is_claimed(competition, p.id))
        .collect::<Vec<_>>();
    players.sort_by(|a, b| b.rating().total_cmp(&a.rating()).then(a.id.cmp(&b.id)));
    players
}

pub fn assign_automatic<S, R>(
    store: &S,
    ctx: &mut DayContext,
    club_id: ClubId,
    fixture: &TeamFixture,
    strategy: SlotStrategy,
    rng: &mut R,
) -> AssignmentResult
where
    S: AttributeStore + ?Sized,
    R: Rng + ?Sized,
{
    let chosen = eligible_players(store, ctx, club_id, fixture.competition)
        .into_iter()
        .take(SQUAD_SIZE)
        .collect::<Vec<_>>();

    let ledger = ctx.ledger_mut(fixture.competition);
    for player in &chosen {
        ledger.claim(player.id, club_id, fixture.team_id)?;
    }

    let slots = match strategy {
        SlotStrategy::Random => place_random(&chosen, rng),
        SlotStrategy::BestFit => place_best_fit(&chosen),
    };

    let assignment = SquadAssignment {
        match_id: fixture.match_id,
        team_id: fixture.team_id,
        club_id,
        competition: fixture.competition,
        venue: fixture.venue,
        source: SelectionSource::Automatic,
        slots,
    };
    if assignment.shortfall() > 0 {
        info!(
            team = %fixture.team_id,
            match_id = %fixture.match_id,
            shortfall = assignment.shortfall(),
            "not enough players, emergency substitutes needed"
        );
    }
    Ok(assignment)
}

pub fn place_random<R: Rng + ?Sized>(players: &[&Player], rng: &mut R) -> [Option<PlayerId>; SQUAD_SIZE] {
    let mut ids = players.iter().map(|p| p.id).collect::<Vec<_>>();
    ids.shuffle(rng);
    let mut slots = [None; SQUAD_SIZE];
    for (slot, id) in slots.iter_mut().zip(ids) {
        *slot = Some(id);
    }
    slots
}

/// Greedy best fit: repeatedly commits the highest-affinity (player, slot)
/// pair among what is left.
pub fn place_best_fit(players: &[&Player]) -> [Option<PlayerId>; SQUAD_SIZE] {
    let mut candidates = Vec::with_capacity(players.len() * SQUAD_SIZE);
    for (p_idx, player) in players.iter().enumerate() {
        for slot in Slot::all() {
            candidates.push((position_affinity(player, slot.pair()), p_idx, slot.index()));
        }
    }
    candidates.sort_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then(a.2.cmp(&b.2))
            .then(players[a.1].id.cmp(&players[b.1].id))
    });

    let mut slots = [None; SQUAD_SIZE];
    let mut placed = vec![false; players.len()];
    for (_, p_idx, s_idx) in candidates {
        if placed[p_idx] || slots[s_idx].is_some() {
            continue;
        }
        slots[s_idx] = Some(players[p_idx].id);
        placed[p_idx] = true;
    }
    slots
}

/// Resolves every fixture of one club for one day.
///
/// Manual lineups are claimed first for all of the club's teams so an
/// automatic pick for a stronger team cannot steal a submitted player. The
/// remaining teams then pick automatically in tier order, best tier first.
/// Each competition kind has its own ledger.
pub fn assign_club_day<S, L, R>(
    store: &S,
    ctx: &mut DayContext,
    club_id: ClubId,
    fixtures: &[TeamFixture],
    lineups: &L,
    strategy: SlotStrategy,
    rng: &mut R,
) -> Vec<(TeamFixture, AssignmentResult)>
where
    S: AttributeStore + ?Sized,
    L: LineupSource + ?Sized,
    R: Rng + ?Sized,
{
    let tier_of = store
        .teams_by_tier(club_id)
        .into_iter()
        .map(|t| (t.id, t.tier()))
        .collect::<HashMap<_, _>>();

    let mut ordered = fixtures.to_vec();
    ordered.sort_by(|a, b| {
        let ta = tier_of.get(&a.team_id).copied().unwrap_or(u8::MAX);
        let tb = tier_of.get(&b.team_id).copied().unwrap_or(u8::MAX);
        ta.cmp(&tb)
            .then(a.team_id.cmp(&b.team_id))
            .then(a.match_id.cmp(&b.match_id))
    });

    let mut results: Vec<Option<AssignmentResult>> = (0..ordered.len()).map(|_| None).collect();

    for (idx, fixture) in ordered.iter().enumerate() {
        match lineups.lineup(&fixture.key()) {
            Ok(Some(lineup)) => {
                debug!(team = %fixture.team_id, match_id = %fixture.match_id, "using manual lineup");
                results[idx] = Some(apply_manual_lineup(store, ctx, club_id, fixture, &lineup));
            }
            Ok(None) => {}
            Err(err) => results[idx] = Some(Err(err)),
        }
    }

    for (idx, fixture) in ordered.iter().enumerate() {
        if results[idx].is_some() {
            continue;
        }
        results[idx] = Some(assign_automatic(store, ctx, club_id, fixture, strategy, rng));
    }

    ordered
        .into_iter()
        .zip(results)
        .filter_map(|(fixture, result)| result.map(|r| (fixture, r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attributes, ClubId};

    fn player(id: u32, start: u8, mid: u8, end: u8) -> Player {
        let mut attrs = Attributes::uniform(50);
        attrs.start_skill = start;
        attrs.mid_skill = mid;
        attrs.end_skill = end;
        Player::new(PlayerId(id), ClubId(1), format!("p{id}"), attrs)
    }

    #[test]
    fn best_fit_puts_specialists_in_their_pair() {
        let players = [
            player(1, 90, 40, 40),
            player(2, 40, 40, 90),
            player(3, 40, 90, 40),
            player(4, 85, 45, 45),
            player(5, 45, 45, 85),
            player(6, 45, 85, 45),
        ];
        let refs = players.iter().collect::<Vec<_>>();
        let slots = place_best_fit(&refs);
        let pair_of = |id: u32| {
            let idx = slots.iter().position(|s| *s == Some(PlayerId(id))).unwrap();
            Slot::from_index(idx).unwrap().pair()
        };
        assert_eq!(pair_of(1), SlotPair::Start);
        assert_eq!(pair_of(4), SlotPair::Start);
        assert_eq!(pair_of(3), SlotPair::Middle);
        assert_eq!(pair_of(6), SlotPair::Middle);
        assert_eq!(pair_of(2), SlotPair::End);
        assert_eq!(pair_of(5), SlotPair::End);
    }

    #[test]
    fn best_fit_fills_only_as_many_slots_as_players() {
        let players = [player(1, 50, 50, 50), player(2, 50, 50, 50)];
        let refs = players.iter().collect::<Vec<_>>();
        let slots = place_best_fit(&refs);
        assert_eq!(slots.iter().filter(|s| s.is_some()).count(), 2);
    }
}
