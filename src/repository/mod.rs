#[cfg(any(test, feature = "test-support"))]
mod memory;
mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// A user mirrored from the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image: String,
    /// URL of the uploaded resume, empty until the user uploads one.
    pub resume: String,
}

/// The provider-owned part of a user, as carried by webhook events.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Company {
    pub id: Uuid,
    /// Identity provider user that registered the company.
    pub owner_id: String,
    pub name: String,
    pub email: String,
    pub image: String,
}

#[derive(Debug, Clone)]
pub struct NewCompany {
    pub owner_id: String,
    pub name: String,
    pub email: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Job {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: String,
    pub level: String,
    pub salary: i64,
    pub date: DateTime<Utc>,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: String,
    pub level: String,
    pub salary: i64,
}

/// A job together with the company that posted it.
#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
pub struct JobListing {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub job: Job,
    pub company_name: String,
    pub company_image: String,
}

/// A company's job together with its number of applications.
#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
pub struct CompanyJob {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub job: Job,
    pub applicants: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "application_status")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema, sqlx::FromRow)]
pub struct JobApplication {
    pub id: Uuid,
    pub user_id: String,
    pub company_id: Uuid,
    pub job_id: Uuid,
    pub status: ApplicationStatus,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub user_id: String,
    pub company_id: Uuid,
    pub job_id: Uuid,
}

/// An application as its applicant sees it.
#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
pub struct ApplicationView {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub location: String,
    pub company_name: String,
    pub company_image: String,
    pub status: ApplicationStatus,
    pub date: DateTime<Utc>,
}

/// An application as the hiring company sees it.
#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
pub struct ApplicantView {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub location: String,
    pub user_id: String,
    pub user_name: String,
    pub user_image: String,
    pub resume: String,
    pub status: ApplicationStatus,
    pub date: DateTime<Utc>,
}

/// Persistence for users, companies, jobs and applications.
///
/// Mutating operations report a missing target through their return value
/// instead of an error so callers decide whether absence matters.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    async fn health_check(&self) -> bool;

    /// Inserts the user or overwrites its provider-owned fields.
    async fn upsert_user(&self, profile: &UserProfile) -> Result<()>;
    /// Returns `false` when no such user exists.
    async fn update_user(&self, profile: &UserProfile) -> Result<bool>;
    /// Returns `false` when no such user exists.
    async fn delete_user(&self, id: &str) -> Result<bool>;
    async fn find_user(&self, id: &str) -> Result<Option<User>>;
    async fn set_user_resume(&self, id: &str, resume: &str) -> Result<Option<User>>;

    /// Returns `None` when the owner already has a company.
    async fn insert_company(&self, company: NewCompany) -> Result<Option<Company>>;
    async fn find_company_by_owner(&self, owner_id: &str) -> Result<Option<Company>>;

    async fn insert_job(&self, job: NewJob) -> Result<Job>;
    async fn list_visible_jobs(&self) -> Result<Vec<JobListing>>;
    async fn find_job(&self, id: Uuid) -> Result<Option<JobListing>>;
    async fn list_company_jobs(&self, company_id: Uuid) -> Result<Vec<CompanyJob>>;
    /// Flips `visible` on a job owned by `company_id`.
    async fn toggle_job_visibility(&self, company_id: Uuid, job_id: Uuid) -> Result<Option<Job>>;

    /// Returns `None` when the user already applied to that job.
    async fn insert_application(&self, application: NewApplication)
    -> Result<Option<JobApplication>>;
    async fn list_user_applications(&self, user_id: &str) -> Result<Vec<ApplicationView>>;
    async fn list_company_applications(&self, company_id: Uuid) -> Result<Vec<ApplicantView>>;
    /// Returns `false` unless the application belongs to `company_id`.
    async fn set_application_status(
        &self,
        company_id: Uuid,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<bool>;
}
