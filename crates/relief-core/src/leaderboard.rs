use relief_db::Database;
use relief_types::api::{LeaderboardEntry, MyRank};
use relief_types::models::{RankTier, User, UserCategory};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Sort by total donated, highest first. The sort is stable, so equal totals
/// keep registration order.
fn sort_by_total(users: &mut [User]) {
    users.sort_by(|a, b| b.total_donation_amount.cmp(&a.total_donation_amount));
}

/// Band for the entry at zero-based `index` out of `total`: first place is
/// platinum, anyone else inside the top 10% gold, inside the top 30% silver,
/// the rest bronze. Integer comparisons keep the boundaries exact.
pub fn tier_for(index: usize, total: usize) -> RankTier {
    if index == 0 {
        RankTier::Platinum
    } else if index * 10 < total {
        RankTier::Gold
    } else if index * 10 < total * 3 {
        RankTier::Silver
    } else {
        RankTier::Bronze
    }
}

/// `round((total - index) / total * 100)`, halves rounded up.
pub fn percentile(index: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((200 * (total - index) + total) / (2 * total)) as u32
}

pub fn rank(mut users: Vec<User>) -> Vec<LeaderboardEntry> {
    sort_by_total(&mut users);
    let total = users.len();
    users
        .into_iter()
        .enumerate()
        .map(|(index, user)| LeaderboardEntry {
            user_id: user.id,
            name: user.name,
            category: user.category,
            total_amount: user.total_donation_amount,
            total_donations: user.total_donations,
            badges: user.badges,
            rank: index + 1,
            tier: tier_for(index, total),
            percentile: percentile(index, total),
        })
        .collect()
}

pub fn position_of(mut users: Vec<User>, user_id: Uuid) -> Option<MyRank> {
    sort_by_total(&mut users);
    let total = users.len();
    let index = users.iter().position(|u| u.id == user_id)?;
    let user = &users[index];
    Some(MyRank {
        rank: index + 1,
        total_users: total,
        total_amount: user.total_donation_amount,
        total_donations: user.total_donations,
        percentile: percentile(index, total),
    })
}

pub fn leaderboard(db: &Database, category: Option<UserCategory>) -> CoreResult<Vec<LeaderboardEntry>> {
    Ok(rank(db.list_users(category)?))
}

/// Caller's place among all users, regardless of category.
pub fn my_rank(db: &Database, user_id: Uuid) -> CoreResult<MyRank> {
    position_of(db.list_users(None)?, user_id).ok_or(CoreError::NotFound("user"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn user(name: &str, amount: i64) -> User {
        User {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", name),
            name: name.into(),
            phone: None,
            category: UserCategory::Individual,
            is_admin: false,
            is_active: true,
            email_verified: false,
            phone_verified: false,
            total_donations: 1,
            total_donation_amount: Decimal::from(amount),
            help_count: 0,
            badges: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ranks_are_dense_and_ordered() {
        let users: Vec<User> = [300, 100, 500, 100, 0, 900, 50]
            .iter()
            .enumerate()
            .map(|(i, a)| user(&format!("u{}", i), *a))
            .collect();
        let board = rank(users);

        let ranks: Vec<usize> = board.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, (1..=7).collect::<Vec<_>>());
        assert!(board.windows(2).all(|w| w[0].total_amount >= w[1].total_amount));
    }

    #[test]
    fn ties_keep_registration_order() {
        let first = user("first", 100);
        let second = user("second", 100);
        let (a, b) = (first.id, second.id);
        let board = rank(vec![first, second]);
        assert_eq!(board[0].user_id, a);
        assert_eq!(board[1].user_id, b);
    }

    fn tiers(total: usize) -> Vec<RankTier> {
        (0..total).map(|i| tier_for(i, total)).collect()
    }

    #[test]
    fn tiers_for_twenty_users() {
        use RankTier::*;
        let mut expected = vec![Platinum, Gold, Silver, Silver, Silver, Silver];
        expected.resize(20, Bronze);
        assert_eq!(tiers(20), expected);
        assert_eq!(tier_for(6, 20), Bronze);
    }

    #[test]
    fn tiers_for_ten_users() {
        use RankTier::*;
        let mut expected = vec![Platinum, Silver, Silver];
        expected.resize(10, Bronze);
        assert_eq!(tiers(10), expected);
    }

    #[test]
    fn tiers_for_seven_users() {
        use RankTier::*;
        assert_eq!(
            tiers(7),
            vec![Platinum, Silver, Silver, Bronze, Bronze, Bronze, Bronze]
        );
    }

    #[test]
    fn small_boards_have_no_gold() {
        assert_eq!(tier_for(0, 3), RankTier::Platinum);
        assert_eq!(tier_for(1, 3), RankTier::Bronze);
    }

    #[test]
    fn percentile_rounds() {
        assert_eq!(percentile(0, 7), 100);
        // 6/7 = 85.71
        assert_eq!(percentile(1, 7), 86);
        // 1/8 = 12.5
        assert_eq!(percentile(7, 8), 13);
    }

    #[test]
    fn position_of_unknown_user_is_none() {
        let users = vec![user("a", 10)];
        assert!(position_of(users, Uuid::new_v4()).is_none());
    }

    #[test]
    fn position_uses_full_population() {
        let top = user("top", 1000);
        let me = user("me", 10);
        let my_id = me.id;
        let pos = position_of(vec![me, top, user("low", 0)], my_id).unwrap();
        assert_eq!(pos.rank, 2);
        assert_eq!(pos.total_users, 3);
        assert_eq!(pos.percentile, 67);
    }
}
