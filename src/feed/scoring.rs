//! Engagement and trending scores.
//!
//! Pure functions of a post and an explicit `now`; nothing here reads a clock.

use crate::feed::{CommunityPost, ScoredPost};

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Hours after which a post no longer trends.
pub const TRENDING_WINDOW_HOURS: f64 = 48.0;

/// Hours during which a post gets the recency bonus.
const FRESH_HOURS: f64 = 6.0;

/// Engagement decays with e^(-hours / DECAY_HOURS).
const DECAY_HOURS: f64 = 24.0;

/// Hours elapsed since the post was created. Negative for future timestamps.
pub fn hours_since(post: &CommunityPost, now_ms: i64) -> f64 {
    // Subtract in f64: the difference of two extreme i64 values overflows.
    (now_ms as f64 - post.timestamp_ms as f64) / MS_PER_HOUR
}

/// Time-decayed weighted interaction volume.
///
/// Likes weigh 1, comments 3, shares 5; admin posts count double.
pub fn engagement_score(post: &CommunityPost, now_ms: i64) -> f64 {
    let hours = hours_since(post, now_ms);
    let time_decay = (-hours / DECAY_HOURS).exp();
    let raw = post.like_count as f64 + post.comment_count as f64 * 3.0 + post.share_count as f64 * 5.0;
    let admin_bonus = if post.is_admin { 2.0 } else { 1.0 };

    raw * time_decay * admin_bonus
}

/// Engagement velocity inside the trending window, zero outside it.
pub fn trending_score(post: &CommunityPost, now_ms: i64) -> f64 {
    let hours = hours_since(post, now_ms);
    if hours > TRENDING_WINDOW_HOURS {
        return 0.0;
    }

    let recent = post.like_count as f64 + post.comment_count as f64 * 2.0 + post.share_count as f64 * 3.0;
    let time_boost = (TRENDING_WINDOW_HOURS - hours).max(0.0) / TRENDING_WINDOW_HOURS;
    let velocity = recent / hours.max(1.0);
    let admin_bonus = if post.is_admin { 1.5 } else { 1.0 };
    let recency_bonus = if hours < FRESH_HOURS { 1.3 } else { 1.0 };

    velocity * time_boost * admin_bonus * recency_bonus
}

/// Annotates a post with both scores at `now_ms`.
pub fn score(post: CommunityPost, now_ms: i64) -> ScoredPost {
    ScoredPost {
        engagement_score: engagement_score(&post, now_ms),
        trending_score: trending_score(&post, now_ms),
        post,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::PostStatus;

    const NOW: i64 = 1_700_000_000_000;
    const HOUR: i64 = 3_600_000;

    fn post(likes: u64, comments: u64, shares: u64, hours_ago: i64) -> CommunityPost {
        CommunityPost {
            id: "p".to_string(),
            author_id: "u".to_string(),
            is_admin: false,
            like_count: likes,
            comment_count: comments,
            share_count: shares,
            timestamp_ms: NOW - hours_ago * HOUR,
            status: PostStatus::Approved,
            content: String::new(),
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_engagement_weights_at_zero_age() {
        assert!(approx(engagement_score(&post(1, 1, 1, 0), NOW), 9.0));
    }

    #[test]
    fn test_engagement_decays_over_one_day() {
        let expected = 10.0 * (-1.0f64).exp();
        assert!(approx(engagement_score(&post(10, 0, 0, 24), NOW), expected));
    }

    #[test]
    fn test_engagement_strictly_decreases_with_age() {
        let fresh = engagement_score(&post(3, 2, 1, 1), NOW);
        let older = engagement_score(&post(3, 2, 1, 5), NOW);
        assert!(fresh > older);
    }

    #[test]
    fn test_more_comments_means_higher_engagement() {
        let fewer = engagement_score(&post(3, 2, 1, 10), NOW);
        let more = engagement_score(&post(3, 3, 1, 10), NOW);
        assert!(more > fewer);
    }

    #[test]
    fn test_admin_doubles_engagement() {
        let mut admin = post(2, 0, 0, 3);
        let normal = engagement_score(&admin, NOW);
        admin.is_admin = true;
        assert!(approx(engagement_score(&admin, NOW), normal * 2.0));
    }

    #[test]
    fn test_trending_window() {
        assert_eq!(trending_score(&post(5, 5, 5, 49), NOW), 0.0);
        assert!(trending_score(&post(1, 0, 0, 47), NOW) > 0.0);
    }

    #[test]
    fn test_trending_formula_mid_window() {
        // 12h old: velocity = (2 + 2 + 3) / 12, boost = 36 / 48, no bonuses.
        let expected = 7.0 / 12.0 * 0.75;
        assert!(approx(trending_score(&post(2, 1, 1, 12), NOW), expected));
    }

    #[test]
    fn test_trending_recency_and_admin_bonus() {
        let mut p = post(0, 0, 2, 2);
        // velocity = 6 / 2, boost = 46 / 48, fresh bonus 1.3
        let base = 3.0 * (46.0 / 48.0) * 1.3;
        assert!(approx(trending_score(&p, NOW), base));

        p.is_admin = true;
        assert!(approx(trending_score(&p, NOW), base * 1.5));
    }

    #[test]
    fn test_future_timestamp_guards_division() {
        let p = post(4, 0, 0, -2);
        let score = trending_score(&p, NOW);
        // hours = -2: velocity = 4 / 1, boost = 50 / 48, fresh bonus applies
        assert!(approx(score, 4.0 * (50.0 / 48.0) * 1.3));
        assert!(score.is_finite());
    }

    #[test]
    fn test_score_annotates_both() {
        let scored = score(post(1, 1, 1, 0), NOW);
        assert!(approx(scored.engagement_score, 9.0));
        assert!(scored.trending_score > 0.0);
        assert_eq!(scored.post.id, "p");
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let mut ancient = post(3, 2, 1, 0);
        ancient.timestamp_ms = i64::MIN;
        let scored = score(ancient, i64::MAX);
        assert!(scored.engagement_score.is_finite());
        assert_eq!(scored.engagement_score, 0.0);
        assert_eq!(scored.trending_score, 0.0);

        let mut distant = post(3, 2, 1, 0);
        distant.timestamp_ms = i64::MAX;
        let hours = hours_since(&distant, i64::MIN);
        assert!(hours.is_finite() && hours < 0.0);
        // Ranking must still see a comparable number.
        assert!(!score(distant, i64::MIN).trending_score.is_nan());
    }
}
