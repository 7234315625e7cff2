use async_trait::async_trait;
use uuid::Uuid;

use crate::models::horse::{Horse, NewHorse};

#[async_trait]
pub trait HorseRepository: Send + Sync {
    async fn list_horses_for_owner(&self, owner_id: Uuid) -> Result<Vec<Horse>, sqlx::Error>;
    async fn create_horse(&self, owner_id: Uuid, horse: &NewHorse) -> Result<Horse, sqlx::Error>;
}
