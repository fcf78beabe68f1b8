//! Director authorization.
//!
//! Every override on a running tournament is gated by a [`DirectorAuthority`].
//! The default [`DirectorRoster`] trusts the director list stored on the
//! tournament record; deployments with an external identity service plug in
//! their own implementation.

use crate::tournament::models::UserId;
use crate::tournament::record::TournamentRecord;

/// Decides whether a user may direct a tournament
pub trait DirectorAuthority: Send + Sync {
    fn is_director(&self, record: &TournamentRecord, user_id: UserId) -> bool;
}

/// Authority backed by the record's own director list
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectorRoster;

impl DirectorAuthority for DirectorRoster {
    fn is_director(&self, record: &TournamentRecord, user_id: UserId) -> bool {
        record.is_director(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::TournamentSettings;

    #[test]
    fn test_roster_uses_record_directors() {
        let mut record = TournamentRecord::new(1, "Auth", 1, TournamentSettings::default(), vec![], 7);
        assert!(DirectorRoster.is_director(&record, 7), "creator directs");
        assert!(!DirectorRoster.is_director(&record, 8));

        record.directors.push(8);
        assert!(DirectorRoster.is_director(&record, 8));
    }
}
