use anyhow::Result;
use relief_db::Database;
use relief_types::api::{BadgeInfo, BadgeKind};
use relief_types::models::BadgeTier;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

/// Cumulative donated amount needed for each supporter tier, ascending.
pub const DONATION_THRESHOLDS: [(i64, BadgeTier); 4] = [
    (1_000, BadgeTier::Bronze),
    (5_000, BadgeTier::Silver),
    (10_000, BadgeTier::Gold),
    (50_000, BadgeTier::Platinum),
];

/// Help count needed for each helper tier, ascending.
pub const HELP_THRESHOLDS: [(i64, BadgeTier); 4] = [
    (10, BadgeTier::Helper),
    (50, BadgeTier::Champion),
    (100, BadgeTier::Hero),
    (500, BadgeTier::Legend),
];

pub fn donation_tiers_reached(total: Decimal) -> Vec<BadgeTier> {
    DONATION_THRESHOLDS
        .iter()
        .take_while(|(threshold, _)| total >= Decimal::from(*threshold))
        .map(|(_, tier)| *tier)
        .collect()
}

pub fn help_tiers_reached(count: i64) -> Vec<BadgeTier> {
    HELP_THRESHOLDS
        .iter()
        .take_while(|(threshold, _)| count >= *threshold)
        .map(|(_, tier)| *tier)
        .collect()
}

/// Every earnable badge, donation tiers first, each ladder ascending.
pub fn catalogue() -> Vec<BadgeInfo> {
    let donation = DONATION_THRESHOLDS.iter().map(|t| badge_info(BadgeKind::Donation, t));
    let help = HELP_THRESHOLDS.iter().map(|t| badge_info(BadgeKind::Help, t));
    donation.chain(help).collect()
}

fn badge_info(kind: BadgeKind, &(threshold, tier): &(i64, BadgeTier)) -> BadgeInfo {
    BadgeInfo {
        tier,
        name: tier.display_name(),
        kind,
        threshold: Decimal::from(threshold),
    }
}

/// Grant every supporter badge the donor's current total qualifies for.
/// Already-held tiers are left alone. Returns the newly granted tiers.
pub fn award_donation_badges(db: &Database, user_id: Uuid) -> Result<Vec<BadgeTier>> {
    let Some(user) = db.get_user(user_id)? else {
        return Ok(Vec::new());
    };
    grant_all(db, user_id, donation_tiers_reached(user.total_donation_amount))
}

pub fn award_help_badges(db: &Database, user_id: Uuid, help_count: i64) -> Result<Vec<BadgeTier>> {
    grant_all(db, user_id, help_tiers_reached(help_count))
}

fn grant_all(db: &Database, user_id: Uuid, tiers: Vec<BadgeTier>) -> Result<Vec<BadgeTier>> {
    let mut granted = Vec::new();
    for tier in tiers {
        if db.grant_badge(user_id, tier)? {
            info!("User {} earned the {} badge", user_id, tier.display_name());
            granted.push(tier);
        }
    }
    Ok(granted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::insert_user;

    #[test]
    fn thresholds_are_inclusive() {
        assert!(donation_tiers_reached(Decimal::new(99_999, 2)).is_empty());
        assert_eq!(donation_tiers_reached(Decimal::from(1000)), vec![BadgeTier::Bronze]);
        assert_eq!(help_tiers_reached(50), vec![BadgeTier::Helper, BadgeTier::Champion]);
    }

    #[test]
    fn one_large_total_jumps_several_tiers() {
        assert_eq!(
            donation_tiers_reached(Decimal::from(12_000)),
            vec![BadgeTier::Bronze, BadgeTier::Silver, BadgeTier::Gold]
        );
    }

    #[test]
    fn catalogue_lists_both_ladders() {
        let all = catalogue();
        assert_eq!(all.len(), 8);
        assert_eq!(all[0].tier, BadgeTier::Bronze);
        assert_eq!(all[0].name, "Bronze Supporter");
        assert_eq!(all[3].threshold, Decimal::from(50_000));
        assert_eq!(all[4].kind, BadgeKind::Help);
        assert_eq!(all[7].tier, BadgeTier::Legend);
        assert_eq!(all[7].threshold, Decimal::from(500));
    }

    #[test]
    fn crossing_bronze_grants_once() {
        let db = Database::open_in_memory().unwrap();
        let user = insert_user(&db, "a@example.com");

        db.adjust_totals(None, user, 1, 90_000, 0).unwrap();
        assert!(award_donation_badges(&db, user).unwrap().is_empty());

        db.adjust_totals(None, user, 1, 20_000, 0).unwrap();
        assert_eq!(award_donation_badges(&db, user).unwrap(), vec![BadgeTier::Bronze]);

        db.adjust_totals(None, user, 1, 20_000, 0).unwrap();
        assert!(award_donation_badges(&db, user).unwrap().is_empty());
        assert!(award_donation_badges(&db, user).unwrap().is_empty());

        let badges = db.get_user(user).unwrap().unwrap().badges;
        assert_eq!(badges.len(), 1);
        assert_eq!(badges[0].tier, BadgeTier::Bronze);
    }
}
