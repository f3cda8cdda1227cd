//! Request-body validation for the movie endpoints. Bounds mirror the
//! published API contract: title alphanumeric 3-30, description 3-300,
//! artists 3-100, genres 3-30, watchUrl a parseable URL. Duration is any
//! integer; the contract never constrained it.

use url::Url;

use crate::models::{MovieInput, MoviePatch};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

fn bounded(field: &str, value: &str, min: usize, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min {
        return Err(ValidationError::new(format!(
            "\"{field}\" length must be at least {min} characters long"
        )));
    }
    if len > max {
        return Err(ValidationError::new(format!(
            "\"{field}\" length must be less than or equal to {max} characters long"
        )));
    }
    Ok(trimmed.to_string())
}

fn alphanum(field: &str, value: &str, min: usize, max: usize) -> Result<String, ValidationError> {
    let trimmed = bounded(field, value, min, max)?;
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::new(format!(
            "\"{field}\" must only contain alpha-numeric characters"
        )));
    }
    Ok(trimmed)
}

fn valid_url(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || Url::parse(trimmed).is_err() {
        return Err(ValidationError::new(format!("\"{field}\" must be a valid url")));
    }
    Ok(trimmed.to_string())
}

/// Checks a create body and returns it with every string field trimmed.
pub fn validate_create(input: MovieInput) -> Result<MovieInput, ValidationError> {
    Ok(MovieInput {
        title: alphanum("title", &input.title, 3, 30)?,
        description: bounded("description", &input.description, 3, 300)?,
        duration: input.duration,
        artists: bounded("artists", &input.artists, 3, 100)?,
        genres: bounded("genres", &input.genres, 3, 30)?,
        watch_url: valid_url("watchUrl", &input.watch_url)?,
    })
}

/// Checks a patch body. At least one field must be present; each supplied
/// field is held to the same bounds as on create.
pub fn validate_patch(patch: MoviePatch) -> Result<MoviePatch, ValidationError> {
    if patch.is_empty() {
        return Err(ValidationError::new("body must have at least 1 key"));
    }
    Ok(MoviePatch {
        title: patch
            .title
            .map(|v| alphanum("title", &v, 3, 30))
            .transpose()?,
        description: patch
            .description
            .map(|v| bounded("description", &v, 3, 300))
            .transpose()?,
        duration: patch.duration,
        artists: patch
            .artists
            .map(|v| bounded("artists", &v, 3, 100))
            .transpose()?,
        genres: patch
            .genres
            .map(|v| bounded("genres", &v, 3, 30))
            .transpose()?,
        watch_url: patch
            .watch_url
            .map(|v| valid_url("watchUrl", &v))
            .transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> MovieInput {
        MovieInput {
            title: "Transformers".to_string(),
            description: "An ancient struggle between two Cybertronian races.".to_string(),
            duration: 60,
            artists: "Shia LaBeouf, Megan Fox".to_string(),
            genres: "Action, Adventure".to_string(),
            watch_url: "https://www.vidio.com/premier/5461/transformers".to_string(),
        }
    }

    #[test]
    fn accepts_a_well_formed_body_and_trims_it() {
        let mut body = input();
        body.genres = "  Action  ".to_string();
        let validated = validate_create(body).unwrap();
        assert_eq!(validated.genres, "Action");
    }

    #[test]
    fn rejects_short_and_non_alphanumeric_titles() {
        let mut body = input();
        body.title = "ab".to_string();
        assert!(validate_create(body).is_err());

        let mut body = input();
        body.title = "Mad Max!".to_string();
        assert!(validate_create(body).is_err());
    }

    #[test]
    fn rejects_a_malformed_watch_url() {
        let mut body = input();
        body.watch_url = "not a url".to_string();
        assert!(validate_create(body).is_err());
    }

    #[test]
    fn duration_is_unconstrained() {
        let mut body = input();
        body.duration = -5;
        assert!(validate_create(body).is_ok());
    }

    #[test]
    fn patch_needs_at_least_one_field() {
        assert!(validate_patch(MoviePatch::default()).is_err());
        let patch = MoviePatch {
            duration: Some(120),
            ..Default::default()
        };
        assert!(validate_patch(patch).is_ok());
    }

    #[test]
    fn patch_fields_keep_create_bounds() {
        let patch = MoviePatch {
            genres: Some("x".repeat(31)),
            ..Default::default()
        };
        assert!(validate_patch(patch).is_err());
    }
}
