use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, postgres::PgPoolOptions};
use tracing::info;
use uuid::Uuid;

use super::{
    ApplicantView, ApplicationStatus, ApplicationView, Company, CompanyJob, Job, JobApplication,
    JobListing, NewApplication, NewCompany, NewJob, Repository, User, UserProfile,
};
use crate::{
    backoff::{BackoffPolicy, retry_with_backoff},
    config::DatabaseConfig,
};

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

const JOB_LISTING_SELECT: &str = "SELECT j.*, c.name AS company_name, c.image AS company_image \
     FROM jobs j JOIN companies c ON c.id = j.company_id";

#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pub pool: Pool<Postgres>,
}

impl PostgresRepository {
    /// Opens the pool, retrying with backoff, then runs pending migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        if config.uri.trim().is_empty() {
            bail!("database uri is not configured (set DATABASE_URL)");
        }
        let options = PgPoolOptions::new()
            .max_connections(config.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS))
            .acquire_timeout(Duration::from_secs(
                config
                    .connection_timeout_seconds
                    .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            ));
        let policy = config
            .connect_retries
            .map(BackoffPolicy::with_retries)
            .unwrap_or_default();

        let pool = retry_with_backoff(policy, "database connection", || {
            options.clone().connect(&config.uri)
        })
        .await
        .context("failed to connect to the database")?;
        info!("Connected to the database");

        let repository = Self { pool };
        repository.migrate().await?;
        Ok(repository)
    }

    pub async fn migrate(&self) -> Result<()> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations completed");
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn upsert_user(&self, profile: &UserProfile) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, image) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, email = EXCLUDED.email, \
             image = EXCLUDED.image",
        )
        .bind(&profile.id)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.image)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_user(&self, profile: &UserProfile) -> Result<bool> {
        let result =
            sqlx::query("UPDATE users SET name = $2, email = $3, image = $4 WHERE id = $1")
                .bind(&profile.id)
                .bind(&profile.name)
                .bind(&profile.email)
                .bind(&profile.image)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_user_resume(&self, id: &str, resume: &str) -> Result<Option<User>> {
        Ok(
            sqlx::query_as("UPDATE users SET resume = $2 WHERE id = $1 RETURNING *")
                .bind(id)
                .bind(resume)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn insert_company(&self, company: NewCompany) -> Result<Option<Company>> {
        Ok(sqlx::query_as(
            "INSERT INTO companies (id, owner_id, name, email, image) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (owner_id) DO NOTHING RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&company.owner_id)
        .bind(&company.name)
        .bind(&company.email)
        .bind(&company.image)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_company_by_owner(&self, owner_id: &str) -> Result<Option<Company>> {
        Ok(sqlx::query_as("SELECT * FROM companies WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_job(&self, job: NewJob) -> Result<Job> {
        Ok(sqlx::query_as(
            "INSERT INTO jobs (id, company_id, title, description, location, category, level, \
             salary, date, visible) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(job.company_id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.location)
        .bind(&job.category)
        .bind(&job.level)
        .bind(job.salary)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_visible_jobs(&self) -> Result<Vec<JobListing>> {
        Ok(
            sqlx::query_as(&format!("{JOB_LISTING_SELECT} WHERE j.visible ORDER BY j.date DESC"))
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<JobListing>> {
        Ok(sqlx::query_as(&format!("{JOB_LISTING_SELECT} WHERE j.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_company_jobs(&self, company_id: Uuid) -> Result<Vec<CompanyJob>> {
        Ok(sqlx::query_as(
            "SELECT j.*, COUNT(a.id) AS applicants FROM jobs j \
             LEFT JOIN job_applications a ON a.job_id = j.id \
             WHERE j.company_id = $1 GROUP BY j.id ORDER BY j.date DESC",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn toggle_job_visibility(&self, company_id: Uuid, job_id: Uuid) -> Result<Option<Job>> {
        Ok(sqlx::query_as(
            "UPDATE jobs SET visible = NOT visible WHERE id = $1 AND company_id = $2 RETURNING *",
        )
        .bind(job_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Option<JobApplication>> {
        Ok(sqlx::query_as(
            "INSERT INTO job_applications (id, user_id, company_id, job_id, status, date) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (user_id, job_id) DO NOTHING RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&application.user_id)
        .bind(application.company_id)
        .bind(application.job_id)
        .bind(ApplicationStatus::Pending)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_user_applications(&self, user_id: &str) -> Result<Vec<ApplicationView>> {
        Ok(sqlx::query_as(
            "SELECT a.id, a.job_id, j.title AS job_title, j.location, c.name AS company_name, \
             c.image AS company_image, a.status, a.date FROM job_applications a \
             JOIN jobs j ON j.id = a.job_id JOIN companies c ON c.id = a.company_id \
             WHERE a.user_id = $1 ORDER BY a.date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_company_applications(&self, company_id: Uuid) -> Result<Vec<ApplicantView>> {
        Ok(sqlx::query_as(
            "SELECT a.id, a.job_id, j.title AS job_title, j.location, a.user_id, \
             u.name AS user_name, u.image AS user_image, u.resume, a.status, a.date \
             FROM job_applications a JOIN jobs j ON j.id = a.job_id \
             JOIN users u ON u.id = a.user_id WHERE a.company_id = $1 ORDER BY a.date DESC",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn set_application_status(
        &self,
        company_id: Uuid,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<bool> {
        let result =
            sqlx::query("UPDATE job_applications SET status = $3 WHERE id = $1 AND company_id = $2")
                .bind(application_id)
                .bind(company_id)
                .bind(status)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
