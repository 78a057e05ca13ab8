//! Repository for the `profile_images` table.

use biodata_core::types::DbId;
use sqlx::postgres::PgConnection;
use sqlx::PgPool;

use crate::models::profile_image::ProfileImage;

const COLUMNS: &str = "id, profile_id, file_path, is_primary, sort_order, created_at";

pub struct ProfileImageRepo;

impl ProfileImageRepo {
    /// Attach stored images to a profile, preserving their order.
    ///
    /// Runs on the caller's connection so it joins the registration
    /// transaction. The first path becomes the primary image.
    pub async fn insert_for_profile(
        conn: &mut PgConnection,
        profile_id: DbId,
        paths: &[String],
    ) -> Result<Vec<ProfileImage>, sqlx::Error> {
        let query = format!(
            "INSERT INTO profile_images (profile_id, file_path, is_primary, sort_order) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );

        let mut images = Vec::with_capacity(paths.len());
        for (index, path) in paths.iter().enumerate() {
            let image = sqlx::query_as::<_, ProfileImage>(&query)
                .bind(profile_id)
                .bind(path)
                .bind(index == 0)
                .bind(index as i32)
                .fetch_one(&mut *conn)
                .await?;
            images.push(image);
        }
        Ok(images)
    }

    /// List a profile's images, primary first.
    pub async fn list_by_profile(
        pool: &PgPool,
        profile_id: DbId,
    ) -> Result<Vec<ProfileImage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM profile_images \
             WHERE profile_id = $1 \
             ORDER BY is_primary DESC, sort_order, id"
        );
        sqlx::query_as::<_, ProfileImage>(&query)
            .bind(profile_id)
            .fetch_all(pool)
            .await
    }
}
