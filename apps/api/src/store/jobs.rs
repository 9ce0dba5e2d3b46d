use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::models::job::JobPosting;

/// The immutable set of job postings, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct JobPool {
    jobs: Vec<JobPosting>,
    by_id: HashMap<String, usize>,
}

impl JobPool {
    /// Builds the pool, keeping the first posting for each id and skipping postings whose
    /// salary range is inverted.
    pub fn new(jobs: Vec<JobPosting>) -> Self {
        let mut pool = JobPool::default();
        for job in jobs {
            if job.salary_min > job.salary_max {
                warn!(job_id = %job.id, "skipping posting with salary_min above salary_max");
                continue;
            }
            if pool.by_id.contains_key(&job.id) {
                warn!(job_id = %job.id, "skipping duplicate job id");
                continue;
            }
            pool.by_id.insert(job.id.clone(), pool.jobs.len());
            pool.jobs.push(job);
        }
        pool
    }

    /// Reads a JSON array of postings. A missing file yields an empty pool.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "job file not found, starting with an empty pool");
                return Ok(JobPool::default());
            }
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        let jobs: Vec<JobPosting> = serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse job postings from {}", path.display()))?;
        let pool = JobPool::new(jobs);
        info!(count = pool.len(), "job pool loaded");
        Ok(pool)
    }

    pub fn all(&self) -> &[JobPosting] {
        &self.jobs
    }

    pub fn get(&self, id: &str) -> Option<&JobPosting> {
        self.by_id.get(id).map(|&i| &self.jobs[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn page(&self, offset: usize, limit: usize) -> &[JobPosting] {
        let start = offset.min(self.jobs.len());
        let end = start.saturating_add(limit).min(self.jobs.len());
        &self.jobs[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::LocationType;

    fn posting(id: &str, salary_min: u64, salary_max: u64) -> JobPosting {
        JobPosting {
            id: id.to_string(),
            title: "Driver".to_string(),
            company: "Acme".to_string(),
            description: String::new(),
            required_skills: vec![],
            preferred_skills: vec![],
            location_type: LocationType::Onsite,
            location: None,
            salary_min,
            salary_max,
            industry: "Logistics".to_string(),
            department: None,
            benefits: vec![],
            min_years_experience: 0,
        }
    }

    #[test]
    fn test_new_skips_duplicates_and_inverted_ranges() {
        let pool = JobPool::new(vec![
            posting("a", 1, 2),
            posting("a", 5, 6),
            posting("b", 9, 3),
            posting("c", 1, 1),
        ]);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get("a").map(|j| j.salary_max), Some(2));
        assert!(!pool.contains("b"));
        assert!(pool.contains("c"));
    }

    #[test]
    fn test_page_clamps_to_bounds() {
        let pool = JobPool::new((0..5).map(|i| posting(&format!("j{i}"), 1, 2)).collect());
        assert_eq!(pool.page(0, 2).len(), 2);
        assert_eq!(pool.page(4, 10).len(), 1);
        assert!(pool.page(10, 10).is_empty());
        assert_eq!(pool.page(1, usize::MAX)[0].id, "j1");
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let pool = JobPool::load(&dir.path().join("jobs.json")).await.unwrap();
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_load_parses_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        std::fs::write(&path, serde_json::to_vec(&vec![posting("x", 1, 2)]).unwrap()).unwrap();
        let pool = JobPool::load(&path).await.unwrap();
        assert_eq!(pool.all()[0].id, "x");
    }
}
