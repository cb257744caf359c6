//! Match formation and conversation access control.
//!
//! A match is the unique record of a mutual like between two users. The pair
//! is stored in canonical order (byte-wise smaller uuid first) so that the
//! `(user1_id, user2_id)` unique constraint admits at most one row per
//! unordered pair. Both insert paths use `on_conflict do_nothing`, which
//! makes the constraint the race arbiter instead of any check-then-act in
//! application code.

use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use duoq_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Match, NewMatch, NewSwipe};
use crate::schema::{matches, swipes};

/// Deterministic total order over a user pair: the byte-wise smaller uuid
/// comes first. Fixed forever; the match uniqueness constraint depends on it.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a < b { (a, b) } else { (b, a) }
}

/// Decision of a recorded swipe, derived from the conditional insert's row
/// count and the mutual-like lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeOutcome {
    /// A decision for this ordered pair already existed; nothing was written.
    Duplicate,
    /// The swipe was recorded but no mutual like exists.
    NoMatch,
    /// The swipe was recorded and completes a mutual like.
    Mutual,
}

/// Pure decision step of [`record_swipe`]: `inserted` is the number of rows
/// the conditional swipe insert affected (0 means a prior decision exists).
pub fn swipe_outcome(inserted: usize, is_like: bool, mutual_like_exists: bool) -> SwipeOutcome {
    if inserted == 0 {
        SwipeOutcome::Duplicate
    } else if is_like && mutual_like_exists {
        SwipeOutcome::Mutual
    } else {
        SwipeOutcome::NoMatch
    }
}

/// Records a swipe decision and, on a mutual like, forms the match.
///
/// Returns `Ok(None)` when no match exists after the swipe, `Ok(Some(m))`
/// when a mutual like produced (or raced into) match `m`. A prior decision
/// on the same target fails with `DuplicateSwipe`; swipes are never
/// overwritten.
pub fn record_swipe(
    conn: &mut PgConnection,
    swiper_id: Uuid,
    swiped_id: Uuid,
    is_like: bool,
) -> AppResult<Option<Match>> {
    if swiper_id == swiped_id {
        return Err(AppError::new(ErrorCode::CannotSwipeSelf, "you cannot swipe on yourself"));
    }

    // Single conditional insert: zero rows affected means a decision for
    // this ordered pair already exists. Concurrent duplicates lose at the
    // unique constraint, not at a racy pre-read.
    let new_swipe = NewSwipe {
        swiper_id,
        swiped_id,
        is_like,
    };
    let inserted = diesel::insert_into(swipes::table)
        .values(&new_swipe)
        .on_conflict((swipes::swiper_id, swipes::swiped_id))
        .do_nothing()
        .execute(conn)?;

    let mutual_like_exists = if inserted > 0 && is_like {
        swipes::table
            .filter(swipes::swiper_id.eq(swiped_id))
            .filter(swipes::swiped_id.eq(swiper_id))
            .filter(swipes::is_like.eq(true))
            .select(swipes::id)
            .first::<Uuid>(conn)
            .optional()?
            .is_some()
    } else {
        false
    };

    match swipe_outcome(inserted, is_like, mutual_like_exists) {
        SwipeOutcome::Duplicate => Err(AppError::new(
            ErrorCode::DuplicateSwipe,
            "you have already swiped on this user",
        )),
        SwipeOutcome::NoMatch => Ok(None),
        SwipeOutcome::Mutual => {
            let formed = find_or_create_match(conn, swiper_id, swiped_id)?;
            tracing::info!(match_id = %formed.id, user1 = %formed.user1_id, user2 = %formed.user2_id, "match formed");
            Ok(Some(formed))
        }
    }
}

/// Creates the canonical match row for an unordered pair, or returns the
/// existing one. Idempotent per pair: when both sides of a mutual like race
/// here, the loser observes the winner's row and treats it as success.
fn find_or_create_match(conn: &mut PgConnection, a: Uuid, b: Uuid) -> AppResult<Match> {
    let (user1_id, user2_id) = canonical_pair(a, b);
    let new_match = NewMatch { user1_id, user2_id };

    let insert = |conn: &mut PgConnection| {
        diesel::insert_into(matches::table)
            .values(&new_match)
            .on_conflict((matches::user1_id, matches::user2_id))
            .do_nothing()
            .get_result::<Match>(conn)
            .optional()
    };

    let created = match insert(conn) {
        Ok(row) => row,
        // Transient storage failure: one retry. The unique constraint keeps
        // the pair single-rowed no matter how often this runs.
        Err(e) => {
            tracing::warn!(error = %e, "match insert failed, retrying once");
            insert(conn)?
        }
    };

    match created {
        Some(m) => Ok(m),
        None => matches::table
            .filter(matches::user1_id.eq(user1_id))
            .filter(matches::user2_id.eq(user2_id))
            .first::<Match>(conn)
            .map_err(AppError::from),
    }
}

/// Authorizes `user_id` to act on match `match_id` and returns the match
/// together with the other participant's id.
///
/// A missing match and a match the caller is not part of fail identically,
/// so probing ids reveals nothing about which matches exist.
pub fn require_membership(
    conn: &mut PgConnection,
    match_id: Uuid,
    user_id: Uuid,
) -> AppResult<(Match, Uuid)> {
    let found: Option<Match> = matches::table
        .find(match_id)
        .first::<Match>(conn)
        .optional()?;

    let m = found
        .filter(|m| m.has_participant(user_id))
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;

    let other = m.other_user(user_id);
    Ok((m, other))
}

/// Normalizes message content for posting: surrounding whitespace is
/// stripped and empty results are rejected.
pub fn normalize_content(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::new(ErrorCode::EmptyMessage, "message content is required"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uuid(byte: u8) -> Uuid {
        Uuid::from_bytes([byte; 16])
    }

    #[test]
    fn canonical_pair_is_order_independent() {
        let (a, b) = (uuid(1), uuid(2));
        assert_eq!(canonical_pair(a, b), canonical_pair(b, a));
    }

    #[test]
    fn canonical_pair_puts_the_smaller_id_first() {
        let (lo, hi) = (uuid(3), uuid(7));
        assert_eq!(canonical_pair(hi, lo), (lo, hi));
        assert_eq!(canonical_pair(lo, hi), (lo, hi));
    }

    #[test]
    fn canonical_pair_is_deterministic_across_calls() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let first = canonical_pair(a, b);
        for _ in 0..10 {
            assert_eq!(canonical_pair(a, b), first);
            assert_eq!(canonical_pair(b, a), first);
        }
    }

    #[test]
    fn content_is_trimmed() {
        assert_eq!(normalize_content("  hello  ").unwrap(), "hello");
        assert_eq!(normalize_content("gg").unwrap(), "gg");
    }

    #[test]
    fn whitespace_only_content_is_rejected() {
        for raw in ["", "   ", "\t\n "] {
            let err = normalize_content(raw).unwrap_err();
            match err {
                AppError::Known { code, .. } => assert_eq!(code, ErrorCode::EmptyMessage),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn like_then_like_is_mutual() {
        assert_eq!(swipe_outcome(1, true, true), SwipeOutcome::Mutual);
    }

    #[test]
    fn like_without_a_prior_like_is_no_match() {
        assert_eq!(swipe_outcome(1, true, false), SwipeOutcome::NoMatch);
    }

    #[test]
    fn a_pass_never_matches_even_against_a_like() {
        assert_eq!(swipe_outcome(1, false, true), SwipeOutcome::NoMatch);
        assert_eq!(swipe_outcome(1, false, false), SwipeOutcome::NoMatch);
    }

    #[test]
    fn zero_inserted_rows_means_duplicate_regardless_of_decision() {
        assert_eq!(swipe_outcome(0, true, true), SwipeOutcome::Duplicate);
        assert_eq!(swipe_outcome(0, true, false), SwipeOutcome::Duplicate);
        assert_eq!(swipe_outcome(0, false, false), SwipeOutcome::Duplicate);
    }
}

// Ledger-level tests against a real database. Set DUOQ_TEST_DATABASE_URL to
// a database with the migrations applied; each test runs inside a rolled-back
// transaction.
#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::models::NewUser;
    use crate::schema::users;
    use diesel::Connection;

    fn test_conn() -> Option<PgConnection> {
        let url = std::env::var("DUOQ_TEST_DATABASE_URL").ok()?;
        PgConnection::establish(&url).ok()
    }

    fn create_user(conn: &mut PgConnection, email: &str) -> Uuid {
        diesel::insert_into(users::table)
            .values(&NewUser {
                email: email.to_string(),
                password_hash: "x".to_string(),
                email_confirmed: true,
            })
            .returning(users::id)
            .get_result(conn)
            .unwrap()
    }

    fn match_count(conn: &mut PgConnection, a: Uuid, b: Uuid) -> i64 {
        let (u1, u2) = canonical_pair(a, b);
        matches::table
            .filter(matches::user1_id.eq(u1))
            .filter(matches::user2_id.eq(u2))
            .count()
            .get_result(conn)
            .unwrap()
    }

    #[test]
    fn mutual_likes_form_exactly_one_match() {
        let Some(mut conn) = test_conn() else { return };
        conn.test_transaction::<_, AppError, _>(|conn| {
            let a = create_user(conn, "a@duoq.test");
            let b = create_user(conn, "b@duoq.test");

            assert!(record_swipe(conn, a, b, true)?.is_none());
            let formed = record_swipe(conn, b, a, true)?.expect("mutual like must match");
            assert!(formed.has_participant(a));
            assert!(formed.has_participant(b));
            assert_eq!(match_count(conn, a, b), 1);
            Ok(())
        });
    }

    #[test]
    fn a_like_answered_with_a_pass_forms_no_match() {
        let Some(mut conn) = test_conn() else { return };
        conn.test_transaction::<_, AppError, _>(|conn| {
            let a = create_user(conn, "a@duoq.test");
            let b = create_user(conn, "b@duoq.test");

            assert!(record_swipe(conn, a, b, true)?.is_none());
            assert!(record_swipe(conn, b, a, false)?.is_none());
            assert_eq!(match_count(conn, a, b), 0);
            Ok(())
        });
    }

    #[test]
    fn a_second_swipe_on_the_same_target_is_rejected() {
        let Some(mut conn) = test_conn() else { return };
        conn.test_transaction::<_, AppError, _>(|conn| {
            let a = create_user(conn, "a@duoq.test");
            let b = create_user(conn, "b@duoq.test");

            record_swipe(conn, a, b, false)?;
            let err = record_swipe(conn, a, b, true).unwrap_err();
            match err {
                AppError::Known { code, .. } => assert_eq!(code, ErrorCode::DuplicateSwipe),
                other => panic!("unexpected error: {other:?}"),
            }

            let swipe_rows: i64 = swipes::table
                .filter(swipes::swiper_id.eq(a))
                .filter(swipes::swiped_id.eq(b))
                .count()
                .get_result(conn)?;
            assert_eq!(swipe_rows, 1);
            Ok(())
        });
    }

    #[test]
    fn match_creation_is_idempotent_per_pair() {
        let Some(mut conn) = test_conn() else { return };
        conn.test_transaction::<_, AppError, _>(|conn| {
            let a = create_user(conn, "a@duoq.test");
            let b = create_user(conn, "b@duoq.test");

            let first = find_or_create_match(conn, a, b)?;
            let second = find_or_create_match(conn, b, a)?;
            assert_eq!(first.id, second.id);
            assert_eq!(match_count(conn, a, b), 1);
            Ok(())
        });
    }

    #[test]
    fn only_participants_may_access_a_match() {
        let Some(mut conn) = test_conn() else { return };
        conn.test_transaction::<_, AppError, _>(|conn| {
            let a = create_user(conn, "a@duoq.test");
            let b = create_user(conn, "b@duoq.test");
            let c = create_user(conn, "c@duoq.test");

            let m = find_or_create_match(conn, a, b)?;

            let (found, other) = require_membership(conn, m.id, a)?;
            assert_eq!(found.id, m.id);
            assert_eq!(other, b);

            let err = require_membership(conn, m.id, c).unwrap_err();
            match err {
                AppError::Known { code, .. } => assert_eq!(code, ErrorCode::MatchNotFound),
                other => panic!("unexpected error: {other:?}"),
            }

            let err = require_membership(conn, Uuid::new_v4(), a).unwrap_err();
            match err {
                AppError::Known { code, .. } => assert_eq!(code, ErrorCode::MatchNotFound),
                other => panic!("unexpected error: {other:?}"),
            }
            Ok(())
        });
    }
}
