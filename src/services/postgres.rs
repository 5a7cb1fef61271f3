use crate::error::StoreError;
use crate::models::{
    CandidateQuery, Engagement, GeoPoint, Provider, ProviderId, RatingSummary, Review,
    SentimentTally, Skill, TrustFactors, TrustRecord, VerificationState, VerificationStatus,
};
use crate::services::traits::{
    CandidateSource, EngagementSource, ProviderStore, ReviewStore, VerificationSource,
};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::HashSet;
use std::time::Duration;
use uuid::Uuid;

const PROVIDER_COLUMNS: &str = r#"
    id, user_id, name, skills, experience_years, expected_price, latitude, longitude,
    rating_average, rating_count, trust_score, trust_status, trust_updated_at,
    verification_status, is_active, created_at
"#;

/// Hard filters shared by the proximity query and the full scan.
/// $1 skills, $2 experience floor, $3 min price, $4 max price.
const HARD_FILTERS: &str = r#"
    is_active = TRUE
    AND verification_status = 'verified'
    AND (cardinality($1::text[]) = 0 OR skills && $1::text[])
    AND experience_years >= $2
    AND ($3::float8 IS NULL OR expected_price >= $3)
    AND ($4::float8 IS NULL OR expected_price <= $4)
"#;

/// PostgreSQL-backed implementation of every collaborator
///
/// Proximity retrieval is a bounding-box range query over the
/// (latitude, longitude) index ordered by planar approximate distance; the
/// engine applies the exact Haversine cutoff afterwards.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store from a connection string and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    fn skill_names(skills: &[Skill]) -> Vec<String> {
        skills.iter().map(|s| s.as_str().to_string()).collect()
    }
}

fn provider_from_row(row: &PgRow) -> Result<Provider, StoreError> {
    let skills = row
        .try_get::<Vec<String>, _>("skills")?
        .iter()
        .map(|s| s.parse::<Skill>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(StoreError::InvalidData)?;

    let experience_years: i32 = row.try_get("experience_years")?;
    let rating_count: i32 = row.try_get("rating_count")?;

    Ok(Provider {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        skills,
        experience_years: u32::try_from(experience_years)
            .map_err(|_| StoreError::InvalidData(format!("negative experience {}", experience_years)))?,
        expected_price: row.try_get("expected_price")?,
        location: GeoPoint::new(row.try_get("latitude")?, row.try_get("longitude")?),
        rating: RatingSummary {
            average: row.try_get("rating_average")?,
            count: u32::try_from(rating_count).unwrap_or(0),
        },
        trust: TrustRecord {
            score: row.try_get("trust_score")?,
            status: row.try_get("trust_status")?,
            last_updated: row.try_get("trust_updated_at")?,
        },
        verification_status: row.try_get("verification_status")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn review_from_row(row: &PgRow) -> Result<Review, StoreError> {
    let rating: i16 = row.try_get("rating")?;
    Ok(Review {
        id: row.try_get("id")?,
        provider_id: row.try_get("provider_id")?,
        engagement_id: row.try_get("engagement_id")?,
        requester_id: row.try_get("requester_id")?,
        rating: u8::try_from(rating)
            .map_err(|_| StoreError::InvalidData(format!("rating {}", rating)))?,
        comment: row.try_get("comment")?,
        sentiment: row.try_get("sentiment")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl CandidateSource for PgStore {
    async fn near(&self, query: &CandidateQuery) -> Result<Vec<Provider>, StoreError> {
        let sql = format!(
            r#"
            SELECT {PROVIDER_COLUMNS}
            FROM providers
            WHERE {HARD_FILTERS}
              AND latitude BETWEEN $5 AND $6
              AND longitude BETWEEN $7 AND $8
            ORDER BY (latitude - $9) ^ 2 + ((longitude - $10) * cos(radians($9))) ^ 2
            LIMIT $11
            "#
        );

        let bbox = &query.bounding_box;
        let rows = sqlx::query(&sql)
            .bind(Self::skill_names(&query.skills))
            .bind(query.min_experience as i32)
            .bind(query.price_range.map(|r| r.min))
            .bind(query.price_range.map(|r| r.max))
            .bind(bbox.min_lat)
            .bind(bbox.max_lat)
            .bind(bbox.min_lon)
            .bind(bbox.max_lon)
            .bind(query.center.latitude)
            .bind(query.center.longitude)
            .bind(query.limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::IndexUnavailable(e.to_string()))?;

        rows.iter().map(provider_from_row).collect()
    }

    async fn scan(&self, query: &CandidateQuery) -> Result<Vec<Provider>, StoreError> {
        let sql = format!("SELECT {PROVIDER_COLUMNS} FROM providers WHERE {HARD_FILTERS}");

        let rows = sqlx::query(&sql)
            .bind(Self::skill_names(&query.skills))
            .bind(query.min_experience as i32)
            .bind(query.price_range.map(|r| r.min))
            .bind(query.price_range.map(|r| r.max))
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("Full scan returned {} providers", rows.len());

        rows.iter().map(provider_from_row).collect()
    }
}

#[async_trait]
impl EngagementSource for PgStore {
    async fn open_engagement_providers(&self) -> Result<HashSet<ProviderId>, StoreError> {
        let query = r#"
            SELECT DISTINCT provider_id
            FROM engagements
            WHERE status IN ('pending', 'accepted')
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| row.try_get::<ProviderId, _>("provider_id").map_err(StoreError::from))
            .collect()
    }

    async fn engagement(&self, id: Uuid) -> Result<Option<Engagement>, StoreError> {
        let query = r#"
            SELECT id, provider_id, requester_id, status
            FROM engagements
            WHERE id = $1
        "#;

        let row = sqlx::query(query).bind(id).fetch_optional(&self.pool).await?;

        row.map(|row| -> Result<Engagement, StoreError> {
            Ok(Engagement {
                id: row.try_get("id")?,
                provider_id: row.try_get("provider_id")?,
                requester_id: row.try_get("requester_id")?,
                status: row.try_get("status")?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl VerificationSource for PgStore {
    async fn verification_state(
        &self,
        provider_id: ProviderId,
    ) -> Result<Option<VerificationState>, StoreError> {
        let query = r#"
            SELECT verification_status, identity_document_verified, tax_document_verified
            FROM providers
            WHERE id = $1
        "#;

        let row = sqlx::query(query)
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> Result<VerificationState, StoreError> {
            Ok(VerificationState {
                status: row.try_get("verification_status")?,
                identity_document_verified: row.try_get("identity_document_verified")?,
                tax_document_verified: row.try_get("tax_document_verified")?,
            })
        })
        .transpose()
    }

    async fn set_verification(
        &self,
        provider_id: ProviderId,
        status: VerificationStatus,
    ) -> Result<(), StoreError> {
        let verified = status == VerificationStatus::Verified;
        let query = r#"
            UPDATE providers
            SET verification_status = $2,
                identity_document_verified = identity_document_verified OR $3,
                tax_document_verified = tax_document_verified OR $3,
                is_active = is_active OR $3
            WHERE id = $1
        "#;

        let result = sqlx::query(query)
            .bind(provider_id)
            .bind(status)
            .bind(verified)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("provider {}", provider_id)));
        }

        Ok(())
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn sentiment_tally(&self, provider_id: ProviderId) -> Result<SentimentTally, StoreError> {
        let query = r#"
            SELECT
                COUNT(*) FILTER (WHERE sentiment = 'positive') AS positive,
                COUNT(*) FILTER (WHERE sentiment = 'neutral') AS neutral,
                COUNT(*) FILTER (WHERE sentiment = 'negative') AS negative
            FROM reviews
            WHERE provider_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(provider_id)
            .fetch_one(&self.pool)
            .await?;

        let count = |column: &str| -> Result<u32, StoreError> {
            let value: i64 = row.try_get(column)?;
            Ok(u32::try_from(value).unwrap_or(u32::MAX))
        };

        Ok(SentimentTally {
            positive: count("positive")?,
            neutral: count("neutral")?,
            negative: count("negative")?,
        })
    }

    async fn review_for_engagement(
        &self,
        engagement_id: Uuid,
    ) -> Result<Option<Review>, StoreError> {
        let query = r#"
            SELECT id, provider_id, engagement_id, requester_id, rating, comment, sentiment, created_at
            FROM reviews
            WHERE engagement_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(engagement_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(review_from_row).transpose()
    }

    async fn reviews_for(
        &self,
        provider_id: ProviderId,
        limit: usize,
    ) -> Result<Vec<Review>, StoreError> {
        let query = r#"
            SELECT id, provider_id, engagement_id, requester_id, rating, comment, sentiment, created_at
            FROM reviews
            WHERE provider_id = $1
            ORDER BY created_at DESC
            LIMIT $2
        "#;

        let rows = sqlx::query(query)
            .bind(provider_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(review_from_row).collect()
    }

    /// Insert the review and update the running mean in one transaction
    async fn record(&self, review: &Review) -> Result<RatingSummary, StoreError> {
        let mut tx = self.pool.begin().await?;

        let insert = r#"
            INSERT INTO reviews (id, provider_id, engagement_id, requester_id, rating, comment, sentiment, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#;

        sqlx::query(insert)
            .bind(review.id)
            .bind(review.provider_id)
            .bind(review.engagement_id)
            .bind(review.requester_id)
            .bind(review.rating as i16)
            .bind(review.comment.as_deref())
            .bind(review.sentiment)
            .bind(review.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db) = &e {
                    if db.is_unique_violation() {
                        return StoreError::Conflict(format!(
                            "review already exists for engagement {}",
                            review.engagement_id
                        ));
                    }
                }
                StoreError::Database(e)
            })?;

        let update = r#"
            UPDATE providers
            SET rating_average = LEAST(5.0, (rating_average * rating_count + $2) / (rating_count + 1)),
                rating_count = rating_count + 1
            WHERE id = $1
            RETURNING rating_average, rating_count
        "#;

        let row = sqlx::query(update)
            .bind(review.provider_id)
            .bind(review.rating as f64)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("provider {}", review.provider_id)))?;

        let rating_count: i32 = row.try_get("rating_count")?;
        let summary = RatingSummary {
            average: row.try_get("rating_average")?,
            count: u32::try_from(rating_count).unwrap_or(0),
        };

        tx.commit().await?;

        tracing::debug!(
            "Recorded review for engagement {} (provider {} now {:.2} over {})",
            review.engagement_id,
            review.provider_id,
            summary.average,
            summary.count
        );

        Ok(summary)
    }
}

#[async_trait]
impl ProviderStore for PgStore {
    async fn provider(&self, id: ProviderId) -> Result<Option<Provider>, StoreError> {
        let sql = format!("SELECT {PROVIDER_COLUMNS} FROM providers WHERE id = $1");

        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;

        row.as_ref().map(provider_from_row).transpose()
    }

    async fn provider_ids(&self) -> Result<Vec<ProviderId>, StoreError> {
        let rows = sqlx::query("SELECT id FROM providers")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<ProviderId, _>("id").map_err(StoreError::from))
            .collect()
    }

    async fn save_trust(
        &self,
        id: ProviderId,
        record: &TrustRecord,
        factors: &TrustFactors,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let update = r#"
            UPDATE providers
            SET trust_score = $2, trust_status = $3, trust_updated_at = $4
            WHERE id = $1
        "#;

        let result = sqlx::query(update)
            .bind(id)
            .bind(record.score)
            .bind(record.status)
            .bind(record.last_updated)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("provider {}", id)));
        }

        let audit = r#"
            INSERT INTO trust_factors (
                provider_id, document_verification, review_sentiment, rating_average,
                experience, response_rate, score, status, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (provider_id)
            DO UPDATE SET
                document_verification = EXCLUDED.document_verification,
                review_sentiment = EXCLUDED.review_sentiment,
                rating_average = EXCLUDED.rating_average,
                experience = EXCLUDED.experience,
                response_rate = EXCLUDED.response_rate,
                score = EXCLUDED.score,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
        "#;

        sqlx::query(audit)
            .bind(id)
            .bind(factors.document_verification)
            .bind(factors.review_sentiment)
            .bind(factors.rating_average)
            .bind(factors.experience)
            .bind(factors.response_rate)
            .bind(record.score)
            .bind(record.status)
            .bind(record.last_updated)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_active(&self, id: ProviderId, active: bool) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE providers SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn response_rate(&self, id: ProviderId) -> Result<Option<f64>, StoreError> {
        let rate: Option<Option<f64>> =
            sqlx::query_scalar("SELECT response_rate FROM providers WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(rate.flatten())
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
