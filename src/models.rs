use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog entry. Serialized with the camelCase field names the public
/// API exposes (`watchUrl`, `totalVote`, ...).
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub duration: i64,
    pub artists: String,
    pub genres: String,
    pub watch_url: String,
    pub total_vote: i64,
    pub total_views: i64,
    pub users_vote: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of POST /movies. All fields are required; bounds are enforced by
/// `validation::validate_create`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MovieInput {
    pub title: String,
    pub description: String,
    pub duration: i64,
    pub artists: String,
    pub genres: String,
    pub watch_url: String,
}

/// Body of PATCH /movies/:id. Unset fields leave the stored value unchanged.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MoviePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration: Option<i64>,
    pub artists: Option<String>,
    pub genres: Option<String>,
    pub watch_url: Option<String>,
}

impl MoviePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.duration.is_none()
            && self.artists.is_none()
            && self.genres.is_none()
            && self.watch_url.is_none()
    }
}

/// Query string of GET /movies. `duration` and `watchUrl` are accepted by
/// the validation contract but never applied as filters, so `split` drops
/// them.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListQuery {
    pub title: Option<String>,
    pub description: Option<String>,
    pub artists: Option<String>,
    pub genres: Option<String>,
    pub total_vote: Option<i64>,
    pub duration: Option<i64>,
    pub watch_url: Option<String>,
    pub sort_by: Option<String>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

impl ListQuery {
    pub fn split(self) -> (MovieFilter, QueryOptions) {
        let filter = MovieFilter {
            title: self.title,
            description: self.description,
            artists: self.artists,
            genres: self.genres,
            total_vote: self.total_vote,
        };
        let options = QueryOptions {
            sort_by: self.sort_by,
            limit: self.limit,
            page: self.page,
        };
        (filter, options)
    }
}

/// Exact-match filter over the listable fields. Every set field must match
/// for a movie to be included.
#[derive(Debug, Clone, Default)]
pub struct MovieFilter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub artists: Option<String>,
    pub genres: Option<String>,
    pub total_vote: Option<i64>,
}

impl MovieFilter {
    pub fn matches(&self, movie: &Movie) -> bool {
        if let Some(title) = &self.title {
            if *title != movie.title {
                return false;
            }
        }
        if let Some(description) = &self.description {
            if *description != movie.description {
                return false;
            }
        }
        if let Some(artists) = &self.artists {
            if *artists != movie.artists {
                return false;
            }
        }
        if let Some(genres) = &self.genres {
            if *genres != movie.genres {
                return false;
            }
        }
        if let Some(total_vote) = self.total_vote {
            if total_vote != movie.total_vote {
                return false;
            }
        }
        true
    }
}

pub const DEFAULT_LIMIT: usize = 10;

/// Sort/limit/page options for List. Out-of-range values fall back to the
/// defaults rather than erroring, like the upstream pagination contract.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub sort_by: Option<String>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
}

impl QueryOptions {
    pub fn limit(&self) -> usize {
        match self.limit {
            Some(l) if l > 0 => l as usize,
            _ => DEFAULT_LIMIT,
        }
    }

    pub fn page(&self) -> usize {
        match self.page {
            Some(p) if p > 0 => p as usize,
            _ => 1,
        }
    }

    pub fn sort_keys(&self) -> Vec<SortKey> {
        self.sort_by.as_deref().map(parse_sort).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Duration,
    TotalVote,
    TotalViews,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

/// Parses a `field:direction` list such as `totalVote:desc,title:asc`.
/// Unknown fields are skipped; any direction other than `desc` sorts
/// ascending.
pub fn parse_sort(raw: &str) -> Vec<SortKey> {
    raw.split(',')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, ':');
            let field = match parts.next().map(str::trim) {
                Some("title") => SortField::Title,
                Some("duration") => SortField::Duration,
                Some("totalVote") => SortField::TotalVote,
                Some("totalViews") => SortField::TotalViews,
                Some("createdAt") => SortField::CreatedAt,
                _ => return None,
            };
            let descending = parts.next().map(str::trim) == Some("desc");
            Some(SortKey { field, descending })
        })
        .collect()
}

/// Stable sort, so ties keep insertion order and an empty key list is the
/// documented default ordering (creation order).
pub fn sort_movies(movies: &mut [Movie], keys: &[SortKey]) {
    use std::cmp::Ordering;

    movies.sort_by(|a, b| {
        for key in keys {
            let ord = match key.field {
                SortField::Title => a.title.cmp(&b.title),
                SortField::Duration => a.duration.cmp(&b.duration),
                SortField::TotalVote => a.total_vote.cmp(&b.total_vote),
                SortField::TotalViews => a.total_views.cmp(&b.total_views),
                SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// One page of List results.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub results: Vec<T>,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
    pub total_results: u64,
}

/// Shapes an already-filtered, already-sorted list into a page. Pages past
/// the end come back with empty results but accurate totals.
pub fn paginate(movies: Vec<Movie>, page: usize, limit: usize) -> Page<Movie> {
    let total_results = movies.len();
    let total_pages = total_results.div_ceil(limit);
    let results = movies
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .collect();
    Page {
        results,
        page: page as u64,
        limit: limit as u64,
        total_pages: total_pages as u64,
        total_results: total_results as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(title: &str, total_vote: i64) -> Movie {
        Movie {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: "A movie".to_string(),
            duration: 90,
            artists: "Cast".to_string(),
            genres: "Drama".to_string(),
            watch_url: format!("https://example.com/{title}"),
            total_vote,
            total_views: 0,
            users_vote: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn parses_sort_pairs_and_skips_unknown_fields() {
        let keys = parse_sort("totalVote:desc,title:asc,bogus:desc,createdAt");
        assert_eq!(
            keys,
            vec![
                SortKey {
                    field: SortField::TotalVote,
                    descending: true
                },
                SortKey {
                    field: SortField::Title,
                    descending: false
                },
                SortKey {
                    field: SortField::CreatedAt,
                    descending: false
                },
            ]
        );
    }

    #[test]
    fn sorts_by_vote_then_keeps_insertion_order() {
        let mut movies = vec![movie("Alpha", 1), movie("Beta", 3), movie("Gamma", 1)];
        sort_movies(
            &mut movies,
            &[SortKey {
                field: SortField::TotalVote,
                descending: true,
            }],
        );
        let titles: Vec<&str> = movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Beta", "Alpha", "Gamma"]);
    }

    #[test]
    fn paginates_a_partial_last_page() {
        let movies: Vec<Movie> = (0..15).map(|i| movie(&format!("Movie{i}"), 0)).collect();
        let page = paginate(movies, 2, 10);
        assert_eq!(page.results.len(), 5);
        assert_eq!(page.page, 2);
        assert_eq!(page.limit, 10);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.total_results, 15);
    }

    #[test]
    fn page_past_the_end_is_empty_with_accurate_totals() {
        let movies = vec![movie("Only", 0)];
        let page = paginate(movies, 5, 10);
        assert!(page.results.is_empty());
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_results, 1);
    }

    #[test]
    fn skip_arithmetic_saturates_for_enormous_page_numbers() {
        let movies = vec![movie("Only", 0)];
        let page = paginate(movies, usize::MAX, 10);
        assert!(page.results.is_empty());
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.total_results, 1);
    }

    #[test]
    fn filter_requires_every_set_field_to_match() {
        let m = movie("Alpha", 2);
        let mut filter = MovieFilter {
            genres: Some("Drama".to_string()),
            total_vote: Some(2),
            ..Default::default()
        };
        assert!(filter.matches(&m));
        filter.total_vote = Some(3);
        assert!(!filter.matches(&m));
    }

    #[test]
    fn query_options_clamp_bad_limit_and_page() {
        let options = QueryOptions {
            sort_by: None,
            limit: Some(-3),
            page: Some(0),
        };
        assert_eq!(options.limit(), DEFAULT_LIMIT);
        assert_eq!(options.page(), 1);
    }
}
