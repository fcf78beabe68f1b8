//! Pairing history helpers used for repeat-matchup avoidance.

use super::models::PairingHistory;
use crate::errors::{TournamentError, TournamentResult};
use crate::tournament::models::TeamId;
use crate::tournament::record::TournamentRecord;

/// Count one more game between two teams
///
/// Called once when a game is created. Cancelling the game does not undo it.
pub fn record_pairing(
    record: &mut TournamentRecord,
    team_a: TeamId,
    team_b: TeamId,
) -> TournamentResult<u32> {
    if team_a == team_b {
        return Err(TournamentError::validation("a team cannot be paired with itself"));
    }
    record.team(team_a)?;
    record.team(team_b)?;
    Ok(record.pairings.record(team_a, team_b).games_played)
}

/// Candidate with the fewest games against `anchor`, earliest in `queue` on ties
pub fn least_played_opponent(
    history: &PairingHistory,
    anchor: TeamId,
    queue: &[TeamId],
) -> Option<TeamId> {
    let mut best: Option<(TeamId, u32)> = None;
    for &candidate in queue.iter().filter(|id| **id != anchor) {
        let played = history.games_between(anchor, candidate);
        match best {
            // Strict comparison keeps the earlier queue position on ties
            Some((_, fewest)) if played >= fewest => {}
            _ => best = Some((candidate, played)),
        }
    }
    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ties_go_to_queue_order() {
        let history = PairingHistory::default();
        assert_eq!(least_played_opponent(&history, 1, &[5, 3, 4]), Some(5));
    }

    #[test]
    fn test_fewest_games_wins() {
        let mut history = PairingHistory::default();
        history.record(1, 5);
        history.record(1, 5);
        history.record(1, 3);
        assert_eq!(least_played_opponent(&history, 1, &[5, 3, 4]), Some(4));
        assert_eq!(least_played_opponent(&history, 1, &[5, 3]), Some(3));
        assert_eq!(least_played_opponent(&history, 1, &[]), None);
    }
}
