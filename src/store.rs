//! Movie persistence. The `MovieStore` trait is the seam between the
//! catalog service and whatever holds the documents; `MemoryStore` is the
//! in-process implementation. Every mutating method runs its check and its
//! write under one lock, so uniqueness and the one-vote-per-user rule hold
//! even under concurrent requests.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::catalog::CatalogError;
use crate::models::Movie;

#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Persists a new movie, stamping `createdAt`/`updatedAt`. Fails when
    /// another movie already holds the title or watch URL.
    async fn insert(&self, movie: Movie) -> Result<Movie, CatalogError>;

    async fn find_by_id(&self, id: Uuid) -> Option<Movie>;

    /// Whole collection in insertion order.
    async fn find_all(&self) -> Vec<Movie>;

    /// Writes back a modified record, keeping its `createdAt` and stamping
    /// `updatedAt`. Uniqueness is re-checked against every other record.
    async fn replace(&self, movie: Movie) -> Result<Movie, CatalogError>;

    /// Returns whether a record was removed.
    async fn remove(&self, id: Uuid) -> bool;

    /// Increments `totalViews` by one and returns the updated record.
    async fn bump_views(&self, id: Uuid) -> Option<Movie>;

    /// Appends a voter if and only if they are not already present.
    async fn push_voter(&self, id: Uuid, voter: &str) -> Result<Movie, CatalogError>;

    /// Removes a voter if and only if they are present.
    async fn pull_voter(&self, id: Uuid, voter: &str) -> Result<Movie, CatalogError>;
}

/// In-memory collection. A `Vec` keeps insertion order, which is the
/// documented default listing order.
#[derive(Default)]
pub struct MemoryStore {
    movies: Mutex<Vec<Movie>>,
}

fn uniqueness_conflict(movies: &[Movie], candidate: &Movie) -> Option<CatalogError> {
    for existing in movies {
        if existing.id == candidate.id {
            continue;
        }
        if existing.title == candidate.title {
            return Some(CatalogError::DuplicateTitle);
        }
        if existing.watch_url == candidate.watch_url {
            return Some(CatalogError::DuplicateWatchUrl);
        }
    }
    None
}

#[async_trait]
impl MovieStore for MemoryStore {
    async fn insert(&self, mut movie: Movie) -> Result<Movie, CatalogError> {
        let mut movies = self.movies.lock().await;
        if let Some(conflict) = uniqueness_conflict(&movies, &movie) {
            return Err(conflict);
        }
        let now = Utc::now();
        movie.created_at = now;
        movie.updated_at = now;
        movies.push(movie.clone());
        Ok(movie)
    }

    async fn find_by_id(&self, id: Uuid) -> Option<Movie> {
        let movies = self.movies.lock().await;
        movies.iter().find(|m| m.id == id).cloned()
    }

    async fn find_all(&self) -> Vec<Movie> {
        self.movies.lock().await.clone()
    }

    async fn replace(&self, mut movie: Movie) -> Result<Movie, CatalogError> {
        let mut movies = self.movies.lock().await;
        if let Some(conflict) = uniqueness_conflict(&movies, &movie) {
            return Err(conflict);
        }
        let slot = movies
            .iter_mut()
            .find(|m| m.id == movie.id)
            .ok_or(CatalogError::NotFound)?;
        movie.created_at = slot.created_at;
        movie.updated_at = Utc::now();
        *slot = movie.clone();
        Ok(movie)
    }

    async fn remove(&self, id: Uuid) -> bool {
        let mut movies = self.movies.lock().await;
        let before = movies.len();
        movies.retain(|m| m.id != id);
        movies.len() < before
    }

    async fn bump_views(&self, id: Uuid) -> Option<Movie> {
        let mut movies = self.movies.lock().await;
        let movie = movies.iter_mut().find(|m| m.id == id)?;
        movie.total_views += 1;
        movie.updated_at = Utc::now();
        Some(movie.clone())
    }

    async fn push_voter(&self, id: Uuid, voter: &str) -> Result<Movie, CatalogError> {
        let mut movies = self.movies.lock().await;
        let movie = movies
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(CatalogError::NotFound)?;
        if movie.users_vote.iter().any(|v| v == voter) {
            return Err(CatalogError::AlreadyVoted);
        }
        movie.users_vote.push(voter.to_string());
        movie.total_vote += 1;
        movie.updated_at = Utc::now();
        Ok(movie.clone())
    }

    async fn pull_voter(&self, id: Uuid, voter: &str) -> Result<Movie, CatalogError> {
        let mut movies = self.movies.lock().await;
        let movie = movies
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(CatalogError::NotFound)?;
        let position = movie
            .users_vote
            .iter()
            .position(|v| v == voter)
            .ok_or(CatalogError::NotVoted)?;
        movie.users_vote.remove(position);
        movie.total_vote -= 1;
        movie.updated_at = Utc::now();
        Ok(movie.clone())
    }
}
