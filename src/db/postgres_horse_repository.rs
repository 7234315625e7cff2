use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::horse_repository::HorseRepository;
use crate::models::horse::{Horse, NewHorse};

pub struct PostgresHorseRepository {
    pub pool: PgPool,
}

#[async_trait]
impl HorseRepository for PostgresHorseRepository {
    async fn list_horses_for_owner(&self, owner_id: Uuid) -> Result<Vec<Horse>, sqlx::Error> {
        sqlx::query_as::<_, Horse>(
            r#"
            SELECT id, owner_id, name, breed, date_of_birth, created_at
            FROM horses
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn create_horse(&self, owner_id: Uuid, horse: &NewHorse) -> Result<Horse, sqlx::Error> {
        sqlx::query_as::<_, Horse>(
            r#"
            INSERT INTO horses (owner_id, name, breed, date_of_birth)
            VALUES ($1, $2, $3, $4)
            RETURNING id, owner_id, name, breed, date_of_birth, created_at
            "#,
        )
        .bind(owner_id)
        .bind(&horse.name)
        .bind(&horse.breed)
        .bind(horse.date_of_birth)
        .fetch_one(&self.pool)
        .await
    }
}
