//! User repository: the shipping-profile slice of the user directory.

use sqlx::{PgConnection, PgPool};

use urban_fable_core::UserId;

use super::RepositoryError;
use crate::models::{ShippingDetails, User};

/// Repository for user reads and the shipping-profile upsert.
pub struct UserRepository;

impl UserRepository {
    /// Fetch a user by id. A plain read, no locks.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(pool: &PgPool, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<(i32, String)> = sqlx::query_as(
            r"
            SELECT id, email
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|(id, email)| User {
            id: UserId::new(id),
            email,
        }))
    }

    /// Write the checkout shipping details onto the user profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_shipping_profile(
        conn: &mut PgConnection,
        id: UserId,
        details: &ShippingDetails,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE users
            SET first_name = $2,
                last_name = $3,
                address = $4,
                phone_number = $5,
                city = $6,
                postal_code = $7,
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(&details.first_name)
        .bind(&details.last_name)
        .bind(&details.address)
        .bind(&details.phone_number)
        .bind(&details.city)
        .bind(&details.postal_code)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
