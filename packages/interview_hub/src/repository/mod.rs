// Repository layer: each domain lives in its own file with `impl HubRepository`.
//
// `gateway.rs` adapts the repository to the room layer's `PersistenceGateway`.

use sqlx::sqlite::SqlitePool;

mod candidates;
mod gateway;
mod interviews;
mod transcripts;

#[cfg(test)]
pub(crate) mod test_helpers;

#[derive(Clone)]
pub struct HubRepository {
    pub(crate) pool: SqlitePool,
}

impl HubRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}
