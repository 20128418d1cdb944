use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ApplicantView, ApplicationStatus, ApplicationView, Company, CompanyJob, Job, JobApplication,
    JobListing, NewApplication, NewCompany, NewJob, Repository, User, UserProfile,
};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<String, User>,
    companies: BTreeMap<Uuid, Company>,
    jobs: BTreeMap<Uuid, Job>,
    applications: BTreeMap<Uuid, JobApplication>,
}

/// Process-local repository with the same semantics as the Postgres one,
/// including cascading deletes of a user's applications.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
    writes: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn users(&self) -> Vec<User> {
        self.tables.read().await.users.values().cloned().collect()
    }

    /// Number of mutating calls that reached the store.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn listing(tables: &Tables, job: &Job) -> Option<JobListing> {
    let company = tables.companies.get(&job.company_id)?;
    Some(JobListing {
        job: job.clone(),
        company_name: company.name.clone(),
        company_image: company.image.clone(),
    })
}

fn newest_first<T>(items: &mut [T], date: impl Fn(&T) -> chrono::DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(date(item)));
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn health_check(&self) -> bool {
        true
    }

    async fn upsert_user(&self, profile: &UserProfile) -> Result<()> {
        self.record_write();
        let mut tables = self.tables.write().await;
        let user = tables.users.entry(profile.id.clone()).or_insert_with(|| User {
            id: profile.id.clone(),
            name: String::new(),
            email: String::new(),
            image: String::new(),
            resume: String::new(),
        });
        user.name = profile.name.clone();
        user.email = profile.email.clone();
        user.image = profile.image.clone();
        Ok(())
    }

    async fn update_user(&self, profile: &UserProfile) -> Result<bool> {
        self.record_write();
        let mut tables = self.tables.write().await;
        Ok(match tables.users.get_mut(&profile.id) {
            Some(user) => {
                user.name = profile.name.clone();
                user.email = profile.email.clone();
                user.image = profile.image.clone();
                true
            }
            None => false,
        })
    }

    async fn delete_user(&self, id: &str) -> Result<bool> {
        self.record_write();
        let mut tables = self.tables.write().await;
        let removed = tables.users.remove(id).is_some();
        tables.applications.retain(|_, a| a.user_id != id);
        Ok(removed)
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn set_user_resume(&self, id: &str, resume: &str) -> Result<Option<User>> {
        self.record_write();
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(id).map(|user| {
            user.resume = resume.to_string();
            user.clone()
        }))
    }

    async fn insert_company(&self, company: NewCompany) -> Result<Option<Company>> {
        self.record_write();
        let mut tables = self.tables.write().await;
        if tables.companies.values().any(|c| c.owner_id == company.owner_id) {
            return Ok(None);
        }
        let company = Company {
            id: Uuid::new_v4(),
            owner_id: company.owner_id,
            name: company.name,
            email: company.email,
            image: company.image,
        };
        tables.companies.insert(company.id, company.clone());
        Ok(Some(company))
    }

    async fn find_company_by_owner(&self, owner_id: &str) -> Result<Option<Company>> {
        let tables = self.tables.read().await;
        Ok(tables
            .companies
            .values()
            .find(|c| c.owner_id == owner_id)
            .cloned())
    }

    async fn insert_job(&self, job: NewJob) -> Result<Job> {
        self.record_write();
        let job = Job {
            id: Uuid::new_v4(),
            company_id: job.company_id,
            title: job.title,
            description: job.description,
            location: job.location,
            category: job.category,
            level: job.level,
            salary: job.salary,
            date: Utc::now(),
            visible: true,
        };
        self.tables.write().await.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn list_visible_jobs(&self) -> Result<Vec<JobListing>> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<_> = tables
            .jobs
            .values()
            .filter(|job| job.visible)
            .filter_map(|job| listing(&tables, job))
            .collect();
        newest_first(&mut jobs, |l| l.job.date);
        Ok(jobs)
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<JobListing>> {
        let tables = self.tables.read().await;
        Ok(tables.jobs.get(&id).and_then(|job| listing(&tables, job)))
    }

    async fn list_company_jobs(&self, company_id: Uuid) -> Result<Vec<CompanyJob>> {
        let tables = self.tables.read().await;
        let mut jobs: Vec<_> = tables
            .jobs
            .values()
            .filter(|job| job.company_id == company_id)
            .map(|job| CompanyJob {
                job: job.clone(),
                applicants: tables
                    .applications
                    .values()
                    .filter(|a| a.job_id == job.id)
                    .count() as i64,
            })
            .collect();
        newest_first(&mut jobs, |j| j.job.date);
        Ok(jobs)
    }

    async fn toggle_job_visibility(&self, company_id: Uuid, job_id: Uuid) -> Result<Option<Job>> {
        self.record_write();
        let mut tables = self.tables.write().await;
        Ok(tables
            .jobs
            .get_mut(&job_id)
            .filter(|job| job.company_id == company_id)
            .map(|job| {
                job.visible = !job.visible;
                job.clone()
            }))
    }

    async fn insert_application(
        &self,
        application: NewApplication,
    ) -> Result<Option<JobApplication>> {
        self.record_write();
        let mut tables = self.tables.write().await;
        if tables
            .applications
            .values()
            .any(|a| a.user_id == application.user_id && a.job_id == application.job_id)
        {
            return Ok(None);
        }
        let application = JobApplication {
            id: Uuid::new_v4(),
            user_id: application.user_id,
            company_id: application.company_id,
            job_id: application.job_id,
            status: ApplicationStatus::Pending,
            date: Utc::now(),
        };
        tables
            .applications
            .insert(application.id, application.clone());
        Ok(Some(application))
    }

    async fn list_user_applications(&self, user_id: &str) -> Result<Vec<ApplicationView>> {
        let tables = self.tables.read().await;
        let mut views: Vec<_> = tables
            .applications
            .values()
            .filter(|a| a.user_id == user_id)
            .filter_map(|a| {
                let job = tables.jobs.get(&a.job_id)?;
                let company = tables.companies.get(&a.company_id)?;
                Some(ApplicationView {
                    id: a.id,
                    job_id: a.job_id,
                    job_title: job.title.clone(),
                    location: job.location.clone(),
                    company_name: company.name.clone(),
                    company_image: company.image.clone(),
                    status: a.status,
                    date: a.date,
                })
            })
            .collect();
        newest_first(&mut views, |v| v.date);
        Ok(views)
    }

    async fn list_company_applications(&self, company_id: Uuid) -> Result<Vec<ApplicantView>> {
        let tables = self.tables.read().await;
        let mut views: Vec<_> = tables
            .applications
            .values()
            .filter(|a| a.company_id == company_id)
            .filter_map(|a| {
                let job = tables.jobs.get(&a.job_id)?;
                let user = tables.users.get(&a.user_id)?;
                Some(ApplicantView {
                    id: a.id,
                    job_id: a.job_id,
                    job_title: job.title.clone(),
                    location: job.location.clone(),
                    user_id: user.id.clone(),
                    user_name: user.name.clone(),
                    user_image: user.image.clone(),
                    resume: user.resume.clone(),
                    status: a.status,
                    date: a.date,
                })
            })
            .collect();
        newest_first(&mut views, |v| v.date);
        Ok(views)
    }

    async fn set_application_status(
        &self,
        company_id: Uuid,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<bool> {
        self.record_write();
        let mut tables = self.tables.write().await;
        Ok(match tables.applications.get_mut(&application_id) {
            Some(application) if application.company_id == company_id => {
                application.status = status;
                true
            }
            _ => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str, email: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            name: "Ada".to_string(),
            email: email.to_string(),
            image: String::new(),
        }
    }

    #[tokio::test]
    async fn test_upsert_keeps_resume() {
        let repo = MemoryRepository::new();
        repo.upsert_user(&profile("u1", "a@b.com")).await.unwrap();
        repo.set_user_resume("u1", "https://cdn/resume.pdf").await.unwrap();
        repo.upsert_user(&profile("u1", "new@b.com")).await.unwrap();

        let users = repo.users().await;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "new@b.com");
        assert_eq!(users[0].resume, "https://cdn/resume.pdf");
    }

    #[tokio::test]
    async fn test_one_company_per_owner() {
        let repo = MemoryRepository::new();
        let company = || NewCompany {
            owner_id: "u1".to_string(),
            name: "Acme".to_string(),
            email: "hr@acme.test".to_string(),
            image: String::new(),
        };
        assert!(repo.insert_company(company()).await.unwrap().is_some());
        assert!(repo.insert_company(company()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_user_drops_applications() {
        let repo = MemoryRepository::new();
        repo.upsert_user(&profile("u1", "a@b.com")).await.unwrap();
        let company = repo
            .insert_company(NewCompany {
                owner_id: "owner".to_string(),
                name: "Acme".to_string(),
                email: "hr@acme.test".to_string(),
                image: String::new(),
            })
            .await
            .unwrap()
            .unwrap();
        let job = repo
            .insert_job(NewJob {
                company_id: company.id,
                title: "Engineer".to_string(),
                description: "Build".to_string(),
                location: "Remote".to_string(),
                category: "Programming".to_string(),
                level: "Senior".to_string(),
                salary: 100_000,
            })
            .await
            .unwrap();
        let application = NewApplication {
            user_id: "u1".to_string(),
            company_id: company.id,
            job_id: job.id,
        };
        assert!(repo.insert_application(application.clone()).await.unwrap().is_some());
        assert!(repo.insert_application(application).await.unwrap().is_none());

        assert!(repo.delete_user("u1").await.unwrap());
        assert!(repo.list_company_applications(company.id).await.unwrap().is_empty());
        assert!(!repo.delete_user("u1").await.unwrap());
    }
}
