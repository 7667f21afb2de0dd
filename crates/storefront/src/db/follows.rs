//! Follow graph between users.

use std::collections::HashSet;

use sqlx::PgPool;

use atelier_core::UserId;
use atelier_core::coupon::Redeemer;

use super::RepositoryError;

/// Repository for follow edges (`follower_id` follows `followee_id`).
pub struct FollowRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> FollowRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Follow `followee`. Returns `false` if the edge already existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if `followee` does not exist.
    pub async fn follow(&self, follower: UserId, followee: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO storefront.user_follow (follower_id, followee_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(follower)
        .bind(followee)
        .execute(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Stop following `followee`. Returns `false` if there was no edge.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unfollow(
        &self,
        follower: UserId,
        followee: UserId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM storefront.user_follow WHERE follower_id = $1 AND followee_id = $2",
        )
        .bind(follower)
        .bind(followee)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Load a user's follow edges in both directions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn redeemer(&self, user_id: UserId) -> Result<Redeemer, RepositoryError> {
        let following: Vec<(UserId,)> = sqlx::query_as(
            "SELECT followee_id FROM storefront.user_follow WHERE follower_id = $1",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        let followers: Vec<(UserId,)> = sqlx::query_as(
            "SELECT follower_id FROM storefront.user_follow WHERE followee_id = $1",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(Redeemer {
            user_id,
            following: following.into_iter().map(|(id,)| id).collect::<HashSet<_>>(),
            followers: followers.into_iter().map(|(id,)| id).collect::<HashSet<_>>(),
        })
    }
}
