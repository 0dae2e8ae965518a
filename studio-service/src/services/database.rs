//! PostgreSQL data access for studio-service.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::{FromRow, Postgres, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use super::{AuthStore, ServiceError};
use crate::dtos::category::{CreateCategoryRequest, UpdateCategoryRequest};
use crate::dtos::job::{CreateJobRequest, UpdateJobRequest};
use crate::dtos::location::{CreateLocationRequest, UpdateLocationRequest};
use crate::dtos::payment::{CreatePaymentRequest, UpdatePaymentRequest};
use crate::models::{
    Category, Job, JobDetails, JobPhoto, Location, NewUser, Payment, RefreshToken,
    RefreshTokenState, User,
};

/// Partial user update with the password already hashed.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub admin: Option<bool>,
}

#[derive(FromRow)]
struct JobCategoryRow {
    job_id: i64,
    #[sqlx(flatten)]
    category: Category,
}

#[derive(FromRow)]
struct JobLocationRow {
    job_id: i64,
    #[sqlx(flatten)]
    location: Location,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(|e| {
            tracing::error!("Database health check failed: {}", e);
            ServiceError::from(e)
        })?;
        Ok(())
    }

    // ==================== User Operations ====================

    pub async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get_user(&self, user_id: i64) -> Result<User, ServiceError> {
        self.find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User with ID {} not found", user_id)))
    }

    async fn find_user(&self, user_id: i64) -> Result<Option<User>, ServiceError> {
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn update_user(&self, user_id: i64, changes: UserChanges) -> Result<User, ServiceError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                admin = COALESCE($5, admin),
                updated_utc = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(changes.admin)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::EmailAlreadyRegistered
            } else {
                ServiceError::from(e)
            }
        })?
        .ok_or_else(|| ServiceError::NotFound(format!("User with ID {} not found", user_id)))
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<User, ServiceError> {
        sqlx::query_as::<_, User>("DELETE FROM users WHERE id = $1 RETURNING *")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    ServiceError::Validation(format!("User with ID {} still has jobs", user_id))
                } else {
                    ServiceError::from(e)
                }
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("User with ID {} not found", user_id)))
    }

    // ==================== Category Operations ====================

    pub async fn list_categories(&self) -> Result<Vec<Category>, ServiceError> {
        Ok(sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get_category(&self, id: i64) -> Result<Category, ServiceError> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category with ID {} not found", id)))
    }

    pub async fn create_category(&self, req: &CreateCategoryRequest) -> Result<Category, ServiceError> {
        Ok(sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, price, description, working_minutes)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(req.price)
        .bind(&req.description)
        .bind(req.working_minutes)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn update_category(
        &self,
        id: i64,
        req: &UpdateCategoryRequest,
    ) -> Result<Category, ServiceError> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories SET
                name = COALESCE($2, name),
                price = COALESCE($3, price),
                description = COALESCE($4, description),
                working_minutes = COALESCE($5, working_minutes)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.name.as_deref())
        .bind(req.price)
        .bind(req.description.as_deref())
        .bind(req.working_minutes)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Category with ID {} not found", id)))
    }

    pub async fn delete_category(&self, id: i64) -> Result<Category, ServiceError> {
        sqlx::query_as::<_, Category>("DELETE FROM categories WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    ServiceError::Validation(format!("Category with ID {} is used by jobs", id))
                } else {
                    ServiceError::from(e)
                }
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Category with ID {} not found", id)))
    }

    // ==================== Location Operations ====================

    pub async fn list_locations(&self) -> Result<Vec<Location>, ServiceError> {
        Ok(sqlx::query_as::<_, Location>("SELECT * FROM locations ORDER BY id")
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get_location(&self, id: i64) -> Result<Location, ServiceError> {
        sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Location with ID {} not found", id)))
    }

    pub async fn create_location(&self, req: &CreateLocationRequest) -> Result<Location, ServiceError> {
        Ok(sqlx::query_as::<_, Location>(
            r#"
            INSERT INTO locations
                (name, address, coordinates, displacement_rate, free_site, out_of_state, out_of_country)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.address)
        .bind(req.coordinates.as_deref())
        .bind(req.displacement_rate)
        .bind(req.free_site)
        .bind(req.out_of_state)
        .bind(req.out_of_country)
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn update_location(
        &self,
        id: i64,
        req: &UpdateLocationRequest,
    ) -> Result<Location, ServiceError> {
        sqlx::query_as::<_, Location>(
            r#"
            UPDATE locations SET
                name = COALESCE($2, name),
                address = COALESCE($3, address),
                coordinates = COALESCE($4, coordinates),
                displacement_rate = COALESCE($5, displacement_rate),
                free_site = COALESCE($6, free_site),
                out_of_state = COALESCE($7, out_of_state),
                out_of_country = COALESCE($8, out_of_country)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.name.as_deref())
        .bind(req.address.as_deref())
        .bind(req.coordinates.as_deref())
        .bind(req.displacement_rate)
        .bind(req.free_site)
        .bind(req.out_of_state)
        .bind(req.out_of_country)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Location with ID {} not found", id)))
    }

    pub async fn delete_location(&self, id: i64) -> Result<Location, ServiceError> {
        sqlx::query_as::<_, Location>("DELETE FROM locations WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    ServiceError::Validation(format!("Location with ID {} is used by jobs", id))
                } else {
                    ServiceError::from(e)
                }
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Location with ID {} not found", id)))
    }

    // ==================== Job Operations ====================

    pub async fn list_jobs(&self) -> Result<Vec<JobDetails>, ServiceError> {
        let jobs = sqlx::query_as::<_, Job>("SELECT * FROM jobs ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        self.attach_job_details(jobs).await
    }

    pub async fn get_job(&self, id: i64) -> Result<JobDetails, ServiceError> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Job with ID {} not found", id)))?;

        self.attach_job_details(vec![job])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::NotFound(format!("Job with ID {} not found", id)))
    }

    pub async fn job_exists(&self, id: i64) -> Result<bool, ServiceError> {
        Ok(sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM jobs WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    /// Creates a job and its links in one transaction. Every referenced
    /// customer, category and location is checked before the first write.
    pub async fn create_job(&self, req: &CreateJobRequest) -> Result<JobDetails, ServiceError> {
        let mut tx = self.pool.begin().await?;

        ensure_exists(&mut tx, "users", req.customer_id, "Customer").await?;
        for category_id in &req.category_ids {
            ensure_exists(&mut tx, "categories", *category_id, "Category").await?;
        }
        for location_id in req.location_ids.iter().flatten() {
            ensure_exists(&mut tx, "locations", *location_id, "Location").await?;
        }

        let job = sqlx::query_as::<_, Job>(
            r#"
            INSERT INTO jobs
                (customer_id, payment, photos, customer_link, discount, closing_date, event_date, gift)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(req.customer_id)
        .bind(&req.payment)
        .bind(req.photos.as_deref())
        .bind(req.customer_link.as_deref())
        .bind(req.discount)
        .bind(req.closing_date)
        .bind(req.event_date)
        .bind(req.gift)
        .fetch_one(&mut *tx)
        .await?;

        link_categories(&mut tx, job.id, &req.category_ids).await?;
        if let Some(location_ids) = &req.location_ids {
            link_locations(&mut tx, job.id, location_ids).await?;
        }

        tx.commit().await?;

        tracing::info!(job_id = job.id, customer_id = job.customer_id, "Job created");
        self.get_job(job.id).await
    }

    /// Partial update. Provided category/location lists replace the existing links.
    pub async fn update_job(&self, id: i64, req: &UpdateJobRequest) -> Result<JobDetails, ServiceError> {
        let mut tx = self.pool.begin().await?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM jobs WHERE id = $1 FOR UPDATE)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if !exists {
            return Err(ServiceError::NotFound("Job not found".to_string()));
        }

        if let Some(customer_id) = req.customer_id {
            ensure_exists(&mut tx, "users", customer_id, "Customer").await?;
        }
        for category_id in req.category_ids.iter().flatten() {
            ensure_exists(&mut tx, "categories", *category_id, "Category").await?;
        }
        for location_id in req.location_ids.iter().flatten() {
            ensure_exists(&mut tx, "locations", *location_id, "Location").await?;
        }

        sqlx::query(
            r#"
            UPDATE jobs SET
                customer_id = COALESCE($2, customer_id),
                payment = COALESCE($3, payment),
                photos = COALESCE($4, photos),
                customer_link = COALESCE($5, customer_link),
                discount = COALESCE($6, discount),
                closing_date = COALESCE($7, closing_date),
                event_date = COALESCE($8, event_date),
                gift = COALESCE($9, gift)
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(req.customer_id)
        .bind(req.payment.as_deref())
        .bind(req.photos.as_deref())
        .bind(req.customer_link.as_deref())
        .bind(req.discount)
        .bind(req.closing_date)
        .bind(req.event_date)
        .bind(req.gift)
        .execute(&mut *tx)
        .await?;

        if let Some(category_ids) = &req.category_ids {
            sqlx::query("DELETE FROM job_categories WHERE job_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_categories(&mut tx, id, category_ids).await?;
        }
        if let Some(location_ids) = &req.location_ids {
            sqlx::query("DELETE FROM job_locations WHERE job_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            link_locations(&mut tx, id, location_ids).await?;
        }

        tx.commit().await?;
        self.get_job(id).await
    }

    /// Removes the job's links, then the job. Returns the job as it was.
    pub async fn delete_job(&self, id: i64) -> Result<JobDetails, ServiceError> {
        let details = self.get_job(id).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM job_categories WHERE job_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM job_locations WHERE job_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(job_id = id, "Job deleted");
        Ok(details)
    }

    async fn attach_job_details(&self, jobs: Vec<Job>) -> Result<Vec<JobDetails>, ServiceError> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let job_ids: Vec<i64> = jobs.iter().map(|j| j.id).collect();
        let customer_ids: Vec<i64> = jobs.iter().map(|j| j.customer_id).collect();

        let customers: HashMap<i64, User> =
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
                .bind(&customer_ids)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|u| (u.id, u))
                .collect();

        let mut categories: HashMap<i64, Vec<Category>> = HashMap::new();
        for row in sqlx::query_as::<_, JobCategoryRow>(
            r#"
            SELECT jc.job_id, c.*
            FROM job_categories jc
            JOIN categories c ON c.id = jc.category_id
            WHERE jc.job_id = ANY($1)
            ORDER BY c.id
            "#,
        )
        .bind(&job_ids)
        .fetch_all(&self.pool)
        .await?
        {
            categories.entry(row.job_id).or_default().push(row.category);
        }

        let mut locations: HashMap<i64, Vec<Location>> = HashMap::new();
        for row in sqlx::query_as::<_, JobLocationRow>(
            r#"
            SELECT jl.job_id, l.*
            FROM job_locations jl
            JOIN locations l ON l.id = jl.location_id
            WHERE jl.job_id = ANY($1)
            ORDER BY l.id
            "#,
        )
        .bind(&job_ids)
        .fetch_all(&self.pool)
        .await?
        {
            locations.entry(row.job_id).or_default().push(row.location);
        }

        jobs.into_iter()
            .map(|job| {
                let customer = customers
                    .get(&job.customer_id)
                    .map(User::sanitized)
                    .ok_or_else(|| {
                        ServiceError::Internal(anyhow::anyhow!(
                            "Job {} references missing customer {}",
                            job.id,
                            job.customer_id
                        ))
                    })?;
                Ok(JobDetails {
                    categories: categories.remove(&job.id).unwrap_or_default(),
                    locations: locations.remove(&job.id).unwrap_or_default(),
                    customer,
                    job,
                })
            })
            .collect()
    }

    // ==================== Job Photo Operations ====================

    pub async fn list_job_photos(&self, job_id: i64) -> Result<Vec<JobPhoto>, ServiceError> {
        Ok(sqlx::query_as::<_, JobPhoto>(
            "SELECT * FROM job_photos WHERE job_id = $1 ORDER BY id",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn insert_job_photos(
        &self,
        job_id: i64,
        keys: &[String],
    ) -> Result<Vec<JobPhoto>, ServiceError> {
        Ok(sqlx::query_as::<_, JobPhoto>(
            r#"
            INSERT INTO job_photos (job_id, photo_key)
            SELECT $1, key FROM UNNEST($2::text[]) AS key
            RETURNING *
            "#,
        )
        .bind(job_id)
        .bind(keys)
        .fetch_all(&self.pool)
        .await?)
    }

    // ==================== Payment Operations ====================

    pub async fn list_payments(&self) -> Result<Vec<Payment>, ServiceError> {
        Ok(sqlx::query_as::<_, Payment>("SELECT * FROM payments ORDER BY created_utc ASC")
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get_payment(&self, id: i64) -> Result<Payment, ServiceError> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment with ID {} not found", id)))
    }

    pub async fn create_payment(&self, req: &CreatePaymentRequest) -> Result<Payment, ServiceError> {
        Ok(sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments
                (name, times, observation, first_date, last_date, day_of_payment, installment_date, gift_giver)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(req.times)
        .bind(req.observation.as_deref())
        .bind(req.first_date)
        .bind(req.last_date)
        .bind(req.day_of_payment)
        .bind(req.installment_date)
        .bind(req.gift_giver.as_deref())
        .fetch_one(&self.pool)
        .await?)
    }

    pub async fn update_payment(
        &self,
        id: i64,
        req: &UpdatePaymentRequest,
    ) -> Result<Payment, ServiceError> {
        sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments SET
                name = COALESCE($2, name),
                times = COALESCE($3, times),
                observation = COALESCE($4, observation),
                first_date = COALESCE($5, first_date),
                last_date = COALESCE($6, last_date),
                day_of_payment = COALESCE($7, day_of_payment),
                installment_date = COALESCE($8, installment_date),
                gift_giver = COALESCE($9, gift_giver),
                updated_utc = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.name.as_deref())
        .bind(req.times)
        .bind(req.observation.as_deref())
        .bind(req.first_date)
        .bind(req.last_date)
        .bind(req.day_of_payment)
        .bind(req.installment_date)
        .bind(req.gift_giver.as_deref())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Payment with ID {} not found", id)))
    }

    pub async fn delete_payment(&self, id: i64) -> Result<Payment, ServiceError> {
        sqlx::query_as::<_, Payment>("DELETE FROM payments WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment with ID {} not found", id)))
    }
}

/// `table` is always a compile-time constant from this module.
async fn ensure_exists(
    tx: &mut Transaction<'_, Postgres>,
    table: &'static str,
    id: i64,
    label: &str,
) -> Result<(), ServiceError> {
    let query = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", table);
    let exists = sqlx::query_scalar::<_, bool>(&query)
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

    if exists {
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!("{} with ID {} not found", label, id)))
    }
}

async fn link_categories(
    tx: &mut Transaction<'_, Postgres>,
    job_id: i64,
    category_ids: &[i64],
) -> Result<(), ServiceError> {
    sqlx::query(
        r#"
        INSERT INTO job_categories (job_id, category_id)
        SELECT $1, id FROM UNNEST($2::bigint[]) AS id
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(job_id)
    .bind(category_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn link_locations(
    tx: &mut Transaction<'_, Postgres>,
    job_id: i64,
    location_ids: &[i64],
) -> Result<(), ServiceError> {
    sqlx::query(
        r#"
        INSERT INTO job_locations (job_id, location_id)
        SELECT $1, id FROM UNNEST($2::bigint[]) AS id
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(job_id)
    .bind(location_ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl AuthStore for Database {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, ServiceError> {
        self.find_user(user_id).await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, ServiceError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, admin)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.admin)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::EmailAlreadyRegistered
            } else {
                ServiceError::from(e)
            }
        })
    }

    async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_id, user_id, token_hash, state_code, expiry_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.token_id)
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(&token.state_code)
        .bind(token.expiry_utc)
        .bind(token.created_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn rotate_refresh_token(
        &self,
        old_token_id: Uuid,
        user_id: i64,
        presented_hash: &str,
        replacement: &RefreshToken,
    ) -> Result<bool, ServiceError> {
        let mut tx = self.pool.begin().await?;

        // The row lock taken by this UPDATE serializes concurrent rotations;
        // a waiting caller re-checks state_code after the winner commits.
        let rotated = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET state_code = $4, state_changed_utc = NOW()
            WHERE token_id = $1
              AND user_id = $2
              AND token_hash = $3
              AND state_code = $5
              AND expiry_utc > NOW()
            "#,
        )
        .bind(old_token_id)
        .bind(user_id)
        .bind(presented_hash)
        .bind(RefreshTokenState::Rotated.as_str())
        .bind(RefreshTokenState::Active.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if rotated != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_id, user_id, token_hash, state_code, expiry_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(replacement.token_id)
        .bind(replacement.user_id)
        .bind(&replacement.token_hash)
        .bind(&replacement.state_code)
        .bind(replacement.expiry_utc)
        .bind(replacement.created_utc)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn revoke_refresh_token(
        &self,
        token_id: Uuid,
        presented_hash: &str,
    ) -> Result<bool, ServiceError> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET state_code = $3, state_changed_utc = NOW()
            WHERE token_id = $1 AND token_hash = $2 AND state_code = $4
            "#,
        )
        .bind(token_id)
        .bind(presented_hash)
        .bind(RefreshTokenState::Revoked.as_str())
        .bind(RefreshTokenState::Active.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_expired_refresh_tokens(&self) -> Result<u64, ServiceError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expiry_utc <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
