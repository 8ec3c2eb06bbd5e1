//! Database repository for simulations and their memberships.

use crate::auth::access::AccessGrant;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::simulations::{SIMULATION_DEFAULTS, SimulationCreateDBRequest, SimulationDBResponse},
};
use crate::types::{SimulationId, UserId};
use chrono::{DateTime, Duration, Utc};
use sqlx::{Connection, FromRow, SqliteConnection};
use tracing::instrument;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Simulation {
    pub id: SimulationId,
    pub name: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub status: Option<String>,
    pub progress: Option<i64>,
    pub participants: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub estimated_end: Option<DateTime<Utc>>,
}

// Joined existence + global role + membership row, read in one query so
// the authorization decision never spans two lookups.
#[derive(Debug, Clone, FromRow)]
struct GrantRow {
    pub global_role: String,
    pub membership_role: Option<String>,
}

pub struct Simulations<'c> {
    db: &'c mut SqliteConnection,
}

impl From<Simulation> for SimulationDBResponse {
    fn from(simulation: Simulation) -> Self {
        Self {
            id: simulation.id,
            name: simulation.name,
            kind: simulation.kind,
            status: simulation
                .status
                .unwrap_or_else(|| SIMULATION_DEFAULTS.status.to_string()),
            progress: simulation.progress.unwrap_or(SIMULATION_DEFAULTS.progress),
            participants: simulation.participants.unwrap_or(SIMULATION_DEFAULTS.participants),
            started_at: simulation.started_at,
            estimated_end: simulation.estimated_end,
        }
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Simulations<'c> {
    type CreateRequest = SimulationCreateDBRequest;
    type Response = SimulationDBResponse;
    type Id = SimulationId;

    /// Insert the simulation and grant the creator the "admin" membership
    /// in one transaction. A simulation must never exist without at least
    /// one admin member.
    #[instrument(skip(self, request), fields(name = %request.name), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let started_at = Utc::now();
        let estimated_end = started_at + Duration::days(SIMULATION_DEFAULTS.duration_days);

        let mut tx = self.db.begin().await?;

        let simulation = sqlx::query_as::<_, Simulation>(
            r#"
            INSERT INTO simulations (name, type, status, progress, participants, started_at, estimated_end)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&request.name)
        .bind(&request.kind)
        .bind(SIMULATION_DEFAULTS.status)
        .bind(SIMULATION_DEFAULTS.progress)
        .bind(SIMULATION_DEFAULTS.participants)
        .bind(started_at)
        .bind(estimated_end)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO user_simulations (user_id, simulation_id, role) VALUES (?, ?, 'admin') ON CONFLICT DO NOTHING",
        )
        .bind(request.created_by)
        .bind(simulation.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SimulationDBResponse::from(simulation))
    }

    #[instrument(skip(self), fields(simulation_id = id), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let simulation = sqlx::query_as::<_, Simulation>("SELECT * FROM simulations WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(simulation.map(SimulationDBResponse::from))
    }

    /// Delete the simulation and all of its membership rows in one
    /// transaction. Partial deletion must never be observable.
    #[instrument(skip(self), fields(simulation_id = id), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM user_simulations WHERE simulation_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM simulations WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }
}

impl<'c> Simulations<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }

    /// Every simulation the user holds a membership row for, newest first.
    #[instrument(skip(self), fields(user_id = user_id), err)]
    pub async fn list_for_member(&mut self, user_id: UserId) -> Result<Vec<SimulationDBResponse>> {
        let simulations = sqlx::query_as::<_, Simulation>(
            r#"
            SELECT s.* FROM simulations s
            INNER JOIN user_simulations us ON us.simulation_id = s.id
            WHERE us.user_id = ?
            ORDER BY s.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.db)
        .await?;

        Ok(simulations.into_iter().map(SimulationDBResponse::from).collect())
    }

    /// Idempotent membership grant: inserting an existing (user, simulation)
    /// pair is a no-op, not an error.
    #[instrument(skip(self), fields(user_id = user_id, simulation_id = simulation_id), err)]
    pub async fn grant_membership(&mut self, user_id: UserId, simulation_id: SimulationId, role: &str) -> Result<()> {
        match sqlx::query(
            "INSERT INTO user_simulations (user_id, simulation_id, role) VALUES (?, ?, ?) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(simulation_id)
        .bind(role)
        .execute(&mut *self.db)
        .await
        {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => {
                // Foreign key violation means either user or simulation doesn't exist
                Err(DbError::NotFound)
            }
            Err(e) => Err(DbError::from(e)),
        }
    }

    /// Fetch the caller's standing on a simulation in a single query:
    /// their global role plus the membership role when a membership row
    /// exists. `None` means the simulation (or the caller) does not exist.
    #[instrument(skip(self), fields(user_id = user_id, simulation_id = simulation_id), err)]
    pub async fn find_grant(&mut self, user_id: UserId, simulation_id: SimulationId) -> Result<Option<AccessGrant>> {
        let row = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT u.role AS global_role, us.role AS membership_role
            FROM simulations s
            CROSS JOIN users u
            LEFT JOIN user_simulations us ON us.simulation_id = s.id AND us.user_id = u.id
            WHERE s.id = ? AND u.id = ?
            "#,
        )
        .bind(simulation_id)
        .bind(user_id)
        .fetch_optional(&mut *self.db)
        .await?;

        Ok(row.map(|r| AccessGrant {
            global_role: r.global_role,
            membership_role: r.membership_role,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::Users;
    use crate::db::models::users::UserCreateDBRequest;
    use sqlx::SqlitePool;

    async fn seed_user(pool: &SqlitePool, email: &str, role: &str) -> UserId {
        let mut conn = pool.acquire().await.unwrap();
        let mut users = Users::new(&mut conn);
        users
            .create(&UserCreateDBRequest {
                email: email.to_string(),
                password_hash: "$argon2id$v=19$m=1024,t=1,p=1$not-a-real-hash".to_string(),
                role: role.to_string(),
                name: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn membership_count(pool: &SqlitePool, simulation_id: SimulationId) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_simulations WHERE simulation_id = ?")
            .bind(simulation_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_applies_defaults_and_grants_creator(pool: SqlitePool) {
        let user_id = seed_user(&pool, "creator@example.com", "member").await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Simulations::new(&mut conn);

        let created = repo
            .create(&SimulationCreateDBRequest {
                name: "Q-Phish".to_string(),
                kind: SIMULATION_DEFAULTS.kind.to_string(),
                created_by: user_id,
            })
            .await
            .unwrap();

        assert_eq!(created.name, "Q-Phish");
        assert_eq!(created.kind, "phishing");
        assert_eq!(created.status, "running");
        assert_eq!(created.progress, 0);
        assert_eq!(created.participants, 0);
        let started_at = created.started_at.expect("started_at set at construction");
        let estimated_end = created.estimated_end.expect("estimated_end set at construction");
        assert_eq!(estimated_end - started_at, Duration::days(7));

        let grant = repo.find_grant(user_id, created.id).await.unwrap().unwrap();
        assert_eq!(grant.membership_role.as_deref(), Some("admin"));
        assert_eq!(grant.global_role, "member");
    }

    #[sqlx::test]
    async fn test_grant_membership_is_idempotent(pool: SqlitePool) {
        let owner = seed_user(&pool, "owner@example.com", "member").await;
        let invitee = seed_user(&pool, "invitee@example.com", "member").await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Simulations::new(&mut conn);
        let simulation = repo
            .create(&SimulationCreateDBRequest {
                name: "Drill".to_string(),
                kind: "phishing".to_string(),
                created_by: owner,
            })
            .await
            .unwrap();

        repo.grant_membership(invitee, simulation.id, "member").await.unwrap();
        repo.grant_membership(invitee, simulation.id, "member").await.unwrap();

        assert_eq!(membership_count(&pool, simulation.id).await, 2);

        // The duplicate insert is a no-op: the original role survives
        let grant = repo.find_grant(invitee, simulation.id).await.unwrap().unwrap();
        assert_eq!(grant.membership_role.as_deref(), Some("member"));
    }

    #[sqlx::test]
    async fn test_find_grant_shapes(pool: SqlitePool) {
        let owner = seed_user(&pool, "owner@example.com", "member").await;
        let outsider = seed_user(&pool, "outsider@example.com", "member").await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Simulations::new(&mut conn);
        let simulation = repo
            .create(&SimulationCreateDBRequest {
                name: "Drill".to_string(),
                kind: "phishing".to_string(),
                created_by: owner,
            })
            .await
            .unwrap();

        // Existing simulation, no membership: grant present, membership absent
        let grant = repo.find_grant(outsider, simulation.id).await.unwrap().unwrap();
        assert_eq!(grant.global_role, "member");
        assert!(grant.membership_role.is_none());

        // Nonexistent simulation: no grant at all
        assert!(repo.find_grant(outsider, 999_999).await.unwrap().is_none());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_delete_removes_all_memberships(pool: SqlitePool) {
        let owner = seed_user(&pool, "owner@example.com", "member").await;
        let other = seed_user(&pool, "other@example.com", "member").await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Simulations::new(&mut conn);
        let simulation = repo
            .create(&SimulationCreateDBRequest {
                name: "Drill".to_string(),
                kind: "phishing".to_string(),
                created_by: owner,
            })
            .await
            .unwrap();
        repo.grant_membership(other, simulation.id, "member").await.unwrap();
        assert_eq!(membership_count(&pool, simulation.id).await, 2);

        assert!(repo.delete(simulation.id).await.unwrap());
        assert!(repo.get_by_id(simulation.id).await.unwrap().is_none());
        assert_eq!(membership_count(&pool, simulation.id).await, 0);

        // A second delete finds no row
        assert!(!repo.delete(simulation.id).await.unwrap());
    }

    #[sqlx::test]
    async fn test_list_for_member_newest_first(pool: SqlitePool) {
        let user = seed_user(&pool, "lister@example.com", "member").await;
        let outsider = seed_user(&pool, "outsider@example.com", "member").await;

        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Simulations::new(&mut conn);

        let first = repo
            .create(&SimulationCreateDBRequest {
                name: "First".to_string(),
                kind: "phishing".to_string(),
                created_by: user,
            })
            .await
            .unwrap();
        let second = repo
            .create(&SimulationCreateDBRequest {
                name: "Second".to_string(),
                kind: "training".to_string(),
                created_by: user,
            })
            .await
            .unwrap();
        // Not visible to `user`
        repo.create(&SimulationCreateDBRequest {
            name: "Foreign".to_string(),
            kind: "phishing".to_string(),
            created_by: outsider,
        })
        .await
        .unwrap();

        let listed = repo.list_for_member(user).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
