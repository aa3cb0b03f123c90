use crate::models::{CommonInterestIndex, ExistingPairingIndex, Interest, Person, Profile, Role, SharedInterest, UserId};
use crate::services::repository::{AvailableMentor, CandidateRepository, RepositoryError};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::time::Duration;

const INTERESTS_QUERY: &str = r#"
    SELECT interest, ordering
    FROM interest
    WHERE userid = $1 AND kind = $2
    ORDER BY ordering
"#;

const INTERESTS_BULK_QUERY: &str = r#"
    SELECT userid, interest, ordering
    FROM interest
    WHERE userid = ANY($1) AND kind = $2
    ORDER BY userid, ordering
"#;

const MENTEE_PROFILE_QUERY: &str = r#"
    SELECT userid, name, businessarea, email, bio
    FROM users
    WHERE userid = $1
"#;

/// Candidate repository over the mentoring schema:
///
/// - `users(userid, name, businessarea, email, bio)`
/// - `mentor(mentorid)`, `mentee(menteeid)`
/// - `mentoring(menteeid, mentorid)`: existing pairings
/// - `interest(userid, interest, ordering, kind)`: `kind` is `mentee` or `mentor`
///
/// User id columns are `text`/`varchar`. Filters compare the bare column
/// against a text parameter so the id indexes stay usable.
pub struct PostgresRepository {
    pool: PgPool,
    max_interests: u32,
}

impl PostgresRepository {
    /// Create a new repository from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        max_interests: u32,
    ) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self::from_pool(pool, max_interests))
    }

    /// Create a new repository from database settings
    pub async fn from_settings(
        settings: &crate::config::DatabaseSettings,
        max_interests: u32,
    ) -> Result<Self, RepositoryError> {
        tracing::info!("Connecting to PostgreSQL (max {} connections)", settings.max_connections.unwrap_or(10));

        Self::new(
            &settings.url,
            settings.max_connections.unwrap_or(10),
            settings.min_connections.unwrap_or(1),
            Duration::from_secs(settings.acquire_timeout_secs.unwrap_or(5)),
            max_interests,
        )
        .await
    }

    pub fn from_pool(pool: PgPool, max_interests: u32) -> Self {
        Self { pool, max_interests }
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, RepositoryError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

/// Validate one user's interest rows, naming the user in the log when they
/// are rejected
fn checked_interests(
    user_id: &str,
    role: Role,
    interests: Vec<Interest>,
    max_interests: u32,
) -> Result<Vec<Interest>, RepositoryError> {
    let person = Person::new(Profile::new(user_id, "", ""), interests);
    if let Err(e) = person.check_interests(max_interests) {
        tracing::warn!(user_id, %role, error = %e, "Rejecting invalid interest rows");
        return Err(RepositoryError::InvalidData(e));
    }
    Ok(person.interests)
}

/// Convert a database rank to the domain type
fn rank_from_db(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| RepositoryError::InvalidData(format!("negative {}: {}", column, value)))
}

fn profile_from_row(row: &PgRow) -> Result<Profile, RepositoryError> {
    Ok(Profile {
        user_id: row.try_get("userid")?,
        name: row.try_get::<Option<String>, _>("name")?.unwrap_or_default(),
        department: row.try_get::<Option<String>, _>("businessarea")?.unwrap_or_default(),
        email: row.try_get::<Option<String>, _>("email")?.unwrap_or_default(),
        bio: row.try_get("bio")?,
    })
}

#[async_trait]
impl CandidateRepository for PostgresRepository {
    async fn fetch_interests(&self, user_id: &str, role: Role) -> Result<Vec<Interest>, RepositoryError> {
        let rows = sqlx::query(INTERESTS_QUERY)
            .bind(user_id)
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Err(RepositoryError::InterestsNotFound {
                user_id: user_id.to_string(),
                role,
            });
        }

        let interests = rows
            .iter()
            .map(|row| -> Result<Interest, RepositoryError> {
                Ok(Interest {
                    rank: rank_from_db(row.try_get("ordering")?, "ordering")?,
                    name: row.try_get("interest")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        checked_interests(user_id, role, interests, self.max_interests)
    }

    async fn fetch_interests_bulk(
        &self,
        user_ids: &[UserId],
        role: Role,
    ) -> Result<HashMap<UserId, Vec<Interest>>, RepositoryError> {
        let rows = sqlx::query(INTERESTS_BULK_QUERY)
            .bind(user_ids)
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await?;

        let mut grouped: HashMap<UserId, Vec<Interest>> = HashMap::new();
        for row in &rows {
            let user_id: String = row.try_get("userid")?;
            let interest = Interest {
                rank: rank_from_db(row.try_get("ordering")?, "ordering")?,
                name: row.try_get("interest")?,
            };
            grouped.entry(user_id).or_default().push(interest);
        }

        let mut out = HashMap::with_capacity(grouped.len());
        for (user_id, interests) in grouped {
            let interests = checked_interests(&user_id, role, interests, self.max_interests)?;
            out.insert(user_id, interests);
        }

        tracing::debug!("Fetched interests for {}/{} {}s", out.len(), user_ids.len(), role);

        Ok(out)
    }

    async fn fetch_mentee_profile(&self, mentee_id: &str) -> Result<Profile, RepositoryError> {
        let row = sqlx::query(MENTEE_PROFILE_QUERY)
            .bind(mentee_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("mentee {}", mentee_id)))?;

        profile_from_row(&row)
    }

    async fn fetch_available_mentors(&self, max_mentees: u32) -> Result<Vec<AvailableMentor>, RepositoryError> {
        let query = r#"
            SELECT u.userid, u.name, u.businessarea, u.email, u.bio,
                   COALESCE(load.mentee_num, 0) AS mentee_num
            FROM users u
            JOIN mentor ON mentor.mentorid = u.userid
            LEFT JOIN (
                SELECT mentorid, COUNT(menteeid) AS mentee_num
                FROM mentoring
                GROUP BY mentorid
            ) load ON load.mentorid = u.userid
            WHERE COALESCE(load.mentee_num, 0) < $1
            ORDER BY u.userid
        "#;

        let rows = sqlx::query(query)
            .bind(i64::from(max_mentees))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<AvailableMentor, RepositoryError> {
                let mentee_num: i64 = row.try_get("mentee_num")?;
                Ok(AvailableMentor {
                    profile: profile_from_row(row)?,
                    mentee_count: u32::try_from(mentee_num).map_err(|_| {
                        RepositoryError::InvalidData(format!("mentee count out of range: {}", mentee_num))
                    })?,
                })
            })
            .collect()
    }

    async fn fetch_common_interest_index(&self) -> Result<CommonInterestIndex, RepositoryError> {
        let query = r#"
            SELECT me.userid AS menteeid,
                   mo.userid AS mentorid,
                   me.interest AS common_interest,
                   me.ordering AS mentee_rank,
                   mo.ordering AS mentor_rank
            FROM interest me
            JOIN mentee ON mentee.menteeid = me.userid
            JOIN interest mo ON mo.interest = me.interest AND mo.kind = 'mentor'
            JOIN mentor ON mentor.mentorid = mo.userid
            WHERE me.kind = 'mentee'
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let mut index = CommonInterestIndex::new();
        for row in &rows {
            let mentee_id: String = row.try_get("menteeid")?;
            let mentor_id: String = row.try_get("mentorid")?;
            index.insert(
                &mentee_id,
                &mentor_id,
                SharedInterest {
                    name: row.try_get("common_interest")?,
                    mentee_rank: rank_from_db(row.try_get("mentee_rank")?, "mentee_rank")?,
                    mentor_rank: rank_from_db(row.try_get("mentor_rank")?, "mentor_rank")?,
                },
            );
        }

        tracing::debug!("Common interest index covers {} pairs", index.pair_count());

        Ok(index)
    }

    async fn fetch_existing_pairings(&self) -> Result<ExistingPairingIndex, RepositoryError> {
        let query = r#"
            SELECT menteeid, mentorid
            FROM mentoring
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<(UserId, UserId), RepositoryError> {
                Ok((row.try_get("menteeid")?, row.try_get("mentorid")?))
            })
            .collect()
    }
}
