//! Catalog operations and their failure taxonomy. Every operation is a
//! single conditional write against the store; failures are deterministic
//! given the current collection state and are surfaced to the caller
//! without retries.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::models::{
    paginate, sort_movies, Movie, MovieFilter, MovieInput, MoviePatch, Page, QueryOptions,
};
use crate::store::MovieStore;

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Movie not found")]
    NotFound,
    #[error("Title already taken")]
    DuplicateTitle,
    #[error("Watch URL already taken")]
    DuplicateWatchUrl,
    #[error("User already vote")]
    AlreadyVoted,
    #[error("User not taken vote")]
    NotVoted,
}

impl CatalogError {
    /// Stable machine-readable identifier, used in error response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::DuplicateTitle => "DUPLICATE_TITLE",
            Self::DuplicateWatchUrl => "DUPLICATE_WATCH_URL",
            Self::AlreadyVoted => "ALREADY_VOTED",
            Self::NotVoted => "NOT_VOTED",
        }
    }
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn MovieStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn MovieStore>) -> Self {
        Self { store }
    }

    /// Creates a movie with zeroed counters. Title and watch URL uniqueness
    /// are enforced by the store at insert time.
    pub async fn create(&self, input: MovieInput) -> Result<Movie, CatalogError> {
        let now = Utc::now();
        let movie = Movie {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            duration: input.duration,
            artists: input.artists,
            genres: input.genres,
            watch_url: input.watch_url,
            total_vote: 0,
            total_views: 0,
            users_vote: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        let movie = self.store.insert(movie).await?;
        info!("Created movie '{}' ({})", movie.title, movie.id);
        Ok(movie)
    }

    /// Filters, sorts and pages the collection. Default order is creation
    /// order; the sort is stable so ties preserve it.
    pub async fn query(&self, filter: &MovieFilter, options: &QueryOptions) -> Page<Movie> {
        let mut movies: Vec<Movie> = self
            .store
            .find_all()
            .await
            .into_iter()
            .filter(|m| filter.matches(m))
            .collect();
        sort_movies(&mut movies, &options.sort_keys());
        paginate(movies, options.page(), options.limit())
    }

    /// Fetches one movie, counting the fetch: `totalViews` is incremented
    /// and persisted before the record is returned.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Movie, CatalogError> {
        self.store
            .bump_views(id)
            .await
            .ok_or(CatalogError::NotFound)
    }

    /// Applies the supplied fields over the existing record. Uniqueness is
    /// re-checked excluding the record itself, so re-submitting the current
    /// title is not a conflict.
    pub async fn update_by_id(&self, id: Uuid, patch: MoviePatch) -> Result<Movie, CatalogError> {
        let mut movie = self
            .store
            .find_by_id(id)
            .await
            .ok_or(CatalogError::NotFound)?;
        if let Some(title) = patch.title {
            movie.title = title;
        }
        if let Some(description) = patch.description {
            movie.description = description;
        }
        if let Some(duration) = patch.duration {
            movie.duration = duration;
        }
        if let Some(artists) = patch.artists {
            movie.artists = artists;
        }
        if let Some(genres) = patch.genres {
            movie.genres = genres;
        }
        if let Some(watch_url) = patch.watch_url {
            movie.watch_url = watch_url;
        }
        self.store.replace(movie).await
    }

    pub async fn delete_by_id(&self, id: Uuid) -> Result<(), CatalogError> {
        if self.store.remove(id).await {
            info!("Deleted movie {}", id);
            Ok(())
        } else {
            Err(CatalogError::NotFound)
        }
    }

    /// Records one vote per voter. The append is conditional inside the
    /// store, so two racing votes from the same voter cannot both land;
    /// the loser gets `AlreadyVoted`.
    pub async fn vote_by_id(&self, id: Uuid, voter: &str) -> Result<Movie, CatalogError> {
        let movie = self.store.push_voter(id, voter).await?;
        info!("'{}' voted for movie '{}'", voter, movie.title);
        Ok(movie)
    }

    pub async fn unvote_by_id(&self, id: Uuid, voter: &str) -> Result<Movie, CatalogError> {
        let movie = self.store.pull_voter(id, voter).await?;
        info!("'{}' withdrew their vote for movie '{}'", voter, movie.title);
        Ok(movie)
    }
}
