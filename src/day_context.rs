use std::collections::{HashMap, HashSet};

use crate::error::{SimError, SimResult};
use crate::model::{ClubId, CompetitionKind, PlayerId, TeamId};

#[derive(Debug, Clone, Default)]
pub struct AllocationLedger {
    claims: HashMap<PlayerId, (ClubId, TeamId)>,
}

impl AllocationLedger {
    pub fn claimed_by(&self, player: PlayerId) -> Option<TeamId> {
        self.claims.get(&player).map(|(_, team)| *team)
    }

    pub fn is_claimed(&self, player: PlayerId) -> bool {
        self.claims.contains_key(&player)
    }

    /// Claiming the same player twice for the same team is a no-op; a claim
    /// from a different team is a violation.
    pub fn claim(&mut self, player: PlayerId, club: ClubId, team: TeamId) -> SimResult<()> {
        match self.claims.get(&player) {
            Some((_, existing)) if *existing == team => Ok(()),
            Some((club_id, existing)) => Err(SimError::ConcurrencyViolation {
                player_id: player,
                club_id: *club_id,
                claimed_by: *existing,
                requested_by: team,
            }),
            None => {
                self.claims.insert(player, (club, team));
                Ok(())
            }
        }
    }

    pub fn players_of(&self, team: TeamId) -> Vec<PlayerId> {
        let mut out = self
            .claims
            .iter()
            .filter(|(_, (_, t))| *t == team)
            .map(|(p, _)| *p)
            .collect::<Vec<_>>();
        out.sort_unstable();
        out
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DayContext {
    pub day: u32,
    availability: HashMap<PlayerId, bool>,
    ledgers: HashMap<CompetitionKind, AllocationLedger>,
    played: HashSet<(PlayerId, CompetitionKind)>,
}

impl DayContext {
    pub fn new(day: u32) -> Self {
        Self {
            day,
            availability: HashMap::new(),
            ledgers: HashMap::new(),
            played: HashSet::new(),
        }
    }

    pub fn set_available(&mut self, player: PlayerId, available: bool) {
        self.availability.insert(player, available);
    }

    pub fn is_available(&self, player: PlayerId) -> bool {
        self.availability.get(&player).copied().unwrap_or(false)
    }

    pub fn availability(&self) -> &HashMap<PlayerId, bool> {
        &self.availability
    }

    pub fn ledger(&self, kind: CompetitionKind) -> Option<&AllocationLedger> {
        self.ledgers.get(&kind)
    }

    pub fn ledger_mut(&mut self, kind: CompetitionKind) -> &mut AllocationLedger {
        self.ledgers.entry(kind).or_default()
    }

    pub fn is_claimed(&self, kind: CompetitionKind, player: PlayerId) -> bool {
        self.ledger(kind).is_some_and(|l| l.is_claimed(player))
    }

    pub fn mark_played(&mut self, player: PlayerId, kind: CompetitionKind) {
        self.played.insert((player, kind));
    }

    pub fn played_players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.played.iter().map(|(p, _)| *p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_rejects_second_team() {
        let mut ledger = AllocationLedger::default();
        ledger.claim(PlayerId(1), ClubId(1), TeamId(10)).unwrap();
        ledger.claim(PlayerId(1), ClubId(1), TeamId(10)).unwrap();
        let err = ledger.claim(PlayerId(1), ClubId(1), TeamId(11)).unwrap_err();
        assert!(matches!(err, SimError::ConcurrencyViolation { .. }));
        assert_eq!(ledger.players_of(TeamId(10)), vec![PlayerId(1)]);
    }

    #[test]
    fn competitions_use_independent_ledgers() {
        let mut ctx = DayContext::new(3);
        ctx.ledger_mut(CompetitionKind::League)
            .claim(PlayerId(7), ClubId(1), TeamId(1))
            .unwrap();
        assert!(ctx.is_claimed(CompetitionKind::League, PlayerId(7)));
        assert!(!ctx.is_claimed(CompetitionKind::Cup, PlayerId(7)));
        ctx.ledger_mut(CompetitionKind::Cup)
            .claim(PlayerId(7), ClubId(1), TeamId(2))
            .unwrap();
    }
}
