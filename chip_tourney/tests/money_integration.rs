//! Integration tests for prize money.
//!
//! A 16-team field at 20.00 entry with 5.00 admin and 100.00 added pays
//! three places from a 340.00 pool.

use chip_tourney::db::MemoryTournamentRepository;
use chip_tourney::money::{
    NewPayoutSplit, NewSidePot, SidePotEntrant, SidePotEntryType, SplitRecipient, SplitShare,
};
use chip_tourney::table::StaticVenueCatalog;
use chip_tourney::tournament::{
    ActionOutcome, ManualPayout, NewTeam, TeamMember, TournamentId, TournamentManager,
    TournamentSettings,
};
use chip_tourney::{DirectorAction, TournamentError};
use std::sync::Arc;

const DIRECTOR: i64 = 1;

async fn sixteen_team_field() -> (TournamentManager, TournamentId) {
    let manager = TournamentManager::new(Arc::new(MemoryTournamentRepository::new()))
        .with_venues(Arc::new(StaticVenueCatalog::new().with_tables(2, 4)));
    let settings = TournamentSettings::default().with_fees(2000, 500, 10000);
    let id = manager
        .create_tournament("Money Night", 2, settings, DIRECTOR)
        .await
        .unwrap();
    for n in 0..16 {
        let team = NewTeam::new(format!("Team {n}"), vec![TeamMember::new(100 + n, "Player")]);
        manager.add_team(id, DIRECTOR, team).await.unwrap();
    }
    (manager, id)
}

async fn completed_field() -> (TournamentManager, TournamentId) {
    let (manager, id) = sixteen_team_field().await;
    manager.start(id, DIRECTOR).await.unwrap();
    manager.complete(id, DIRECTOR).await.unwrap();
    (manager, id)
}

fn team_share(team_id: i64, amount: i64) -> SplitShare {
    SplitShare {
        recipient: SplitRecipient::Team(team_id),
        amount,
    }
}

#[tokio::test]
async fn test_projection_before_start() {
    let (manager, id) = sixteen_team_field().await;
    let summary = manager.money_summary(id).await.unwrap();

    assert_eq!(summary.breakdown.total_entry_fees, 32000);
    assert_eq!(summary.breakdown.total_admin_fees, 8000);
    assert_eq!(summary.breakdown.total_payout, 34000);

    let amounts: Vec<i64> = summary.projected_payouts.iter().map(|p| p.amount).collect();
    assert_eq!(amounts, vec![17000, 10200, 6800]);
    assert_eq!(summary.projected_payouts[2].description, "3rd Place");
    assert!(summary.payouts.is_empty(), "nothing is assigned until completion");
}

#[tokio::test]
async fn test_completion_assigns_payouts_in_finishing_order() {
    let (manager, id) = completed_field().await;
    let payouts = manager.money_summary(id).await.unwrap().payouts;

    assert_eq!(payouts.len(), 3);
    // Nobody has played: equal chips fall back to registration order
    let recipients: Vec<_> = payouts.iter().map(|p| p.team_id).collect();
    assert_eq!(recipients, vec![Some(1), Some(2), Some(3)]);
    assert!(payouts.iter().all(|p| p.amount == p.original_amount && !p.is_paid));
}

#[tokio::test]
async fn test_split_then_pay() {
    let (manager, id) = completed_field().await;
    let first = manager.money_summary(id).await.unwrap().payouts[0].clone();

    let mismatched = NewPayoutSplit {
        payout_id: first.id,
        name: "Chop".to_string(),
        description: None,
        shares: vec![team_share(1, 9000), team_share(2, 9000)],
    };
    let result = manager.create_payout_split(id, DIRECTOR, mismatched).await;
    assert!(matches!(
        result,
        Err(TournamentError::InvalidSplit { expected: 17000, actual: 18000 })
    ));

    let chop = NewPayoutSplit {
        payout_id: first.id,
        name: "Chop".to_string(),
        description: Some("finalists agreed to chop first".to_string()),
        shares: vec![team_share(1, 8500), team_share(2, 8500)],
    };
    manager.create_payout_split(id, DIRECTOR, chop.clone()).await.unwrap();
    assert!(
        manager.create_payout_split(id, DIRECTOR, chop).await.is_err(),
        "a payout can only be split once"
    );

    manager.mark_payout_paid(id, DIRECTOR, first.id).await.unwrap();
    let summary = manager.money_summary(id).await.unwrap();
    let paid = &summary.payouts[0];
    assert!(paid.is_split);
    assert!(paid.is_paid);
    assert_eq!(paid.paid_by, Some(DIRECTOR));
    assert_eq!(summary.splits.len(), 1);
    assert_eq!(summary.splits[0].total_amount, 17000);

    let again = manager.mark_payout_paid(id, DIRECTOR, first.id).await;
    assert!(matches!(again, Err(TournamentError::Payment(_))));
}

#[tokio::test]
async fn test_manual_payout_override_keeps_original() {
    let (manager, id) = completed_field().await;
    let third = manager.money_summary(id).await.unwrap().payouts[2].clone();

    let action = DirectorAction::from(ManualPayout {
        payout_id: third.id,
        team_id: Some(16),
        amount: 5000,
    });
    let outcome = manager.perform(id, DIRECTOR, action).await.unwrap();
    assert_eq!(
        outcome,
        ActionOutcome::PayoutAdjusted {
            payout_id: third.id,
            amount: 5000
        }
    );

    let payout = manager.money_summary(id).await.unwrap().payouts[2].clone();
    assert_eq!(payout.amount, 5000);
    assert_eq!(payout.original_amount, 6800);
    assert_eq!(payout.team_id, Some(16));

    let negative = DirectorAction::from(ManualPayout {
        payout_id: third.id,
        team_id: None,
        amount: -1,
    });
    assert!(manager.perform(id, DIRECTOR, negative).await.is_err());

    let outsider = DirectorAction::from(ManualPayout {
        payout_id: third.id,
        team_id: None,
        amount: 1,
    });
    assert!(matches!(
        manager.perform(id, 99, outsider).await,
        Err(TournamentError::NotDirector { .. })
    ));
}

#[tokio::test]
async fn test_side_pot_lifecycle() {
    let (manager, id) = sixteen_team_field().await;
    let pot = manager
        .create_side_pot(
            id,
            DIRECTOR,
            NewSidePot {
                name: "Break and run".to_string(),
                description: None,
                entry_fee: 500,
                entry_type: SidePotEntryType::Individual,
            },
        )
        .await
        .unwrap();

    for player in [100, 101, 102] {
        manager
            .enter_side_pot(id, DIRECTOR, pot, SidePotEntrant::Player(player))
            .await
            .unwrap();
    }
    assert!(
        manager
            .enter_side_pot(id, DIRECTOR, pot, SidePotEntrant::Player(100))
            .await
            .is_err(),
        "duplicate entry"
    );
    assert!(
        manager
            .enter_side_pot(id, DIRECTOR, pot, SidePotEntrant::Team(1))
            .await
            .is_err(),
        "teams cannot enter an individual pot"
    );
    assert!(
        manager
            .enter_side_pot(id, DIRECTOR, pot, SidePotEntrant::Player(4242))
            .await
            .is_err(),
        "unregistered player"
    );

    assert!(
        manager.mark_side_pot_paid(id, DIRECTOR, pot).await.is_err(),
        "a pot is paid only after it has a winner"
    );
    manager
        .complete_side_pot(id, DIRECTOR, pot, SidePotEntrant::Player(101))
        .await
        .unwrap();
    manager.mark_side_pot_paid(id, DIRECTOR, pot).await.unwrap();

    let summary = manager.money_summary(id).await.unwrap();
    assert_eq!(summary.total_side_pot_money, 1500);
    let side_pot = &summary.side_pots[0];
    assert_eq!(side_pot.winner, Some(SidePotEntrant::Player(101)));
    assert!(side_pot.paid_out);
    assert_eq!(side_pot.completed_by, Some(DIRECTOR));
}

#[tokio::test]
async fn test_side_pot_limit() {
    let (manager, id) = sixteen_team_field().await;
    let request = |n: usize| NewSidePot {
        name: format!("Pot {n}"),
        description: None,
        entry_fee: 100,
        entry_type: SidePotEntryType::Team,
    };
    for n in 0..10 {
        manager.create_side_pot(id, DIRECTOR, request(n)).await.unwrap();
    }
    let result = manager.create_side_pot(id, DIRECTOR, request(10)).await;
    assert!(matches!(result, Err(TournamentError::SidePotLimit { max: 10 })));
}
