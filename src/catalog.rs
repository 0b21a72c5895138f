//! The movie catalog: every state transition on the `movie` table goes through here.
//!
//! Each operation re-reads the store; nothing is cached between requests. Mutating
//! operations run inside a single transaction so a lookup and the write that depends
//! on it cannot interleave with a concurrent delete.

use std::{cmp::Ordering, sync::Arc};

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::{debug, info};

use crate::{
    entities::movie,
    error::{AppError, AppResult},
    models::SearchCandidate,
    tmdb::{MetadataSource, poster_url, release_year},
};

const MAX_RATING: f64 = 10.0;
const MAX_REVIEW_CHARS: usize = 50;
const MAX_TITLE_CHARS: usize = 30;
const MAX_DESCRIPTION_CHARS: usize = 100;
const MAX_IMG_URL_CHARS: usize = 100;

#[derive(Clone)]
pub struct MovieCatalog {
    db: DatabaseConnection,
    metadata: Arc<dyn MetadataSource>,
    image_base_url: String,
}

impl MovieCatalog {
    pub fn new(
        db: DatabaseConnection,
        metadata: Arc<dyn MetadataSource>,
        image_base_url: String,
    ) -> Self {
        Self { db, metadata, image_base_url }
    }

    #[cfg(test)]
    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Orders every movie by rating and persists the resulting 1-based ranking.
    ///
    /// This is a write hidden behind a read: rows whose stored ranking differs from
    /// the freshly computed one are updated before the list is returned.
    pub async fn list_ranked(&self) -> AppResult<Vec<movie::Model>> {
        let txn = self.db.begin().await?;

        let mut movies =
            movie::Entity::find().order_by_asc(movie::Column::Id).all(&txn).await?;
        sort_by_rating(&mut movies);

        let mut updated = 0usize;
        for (idx, m) in movies.iter_mut().enumerate() {
            let rank = i32::try_from(idx + 1)
                .map_err(|_| AppError::Internal("ranking overflow".to_string()))?;
            if m.ranking == Some(rank) {
                continue;
            }
            let mut active: movie::ActiveModel = m.clone().into();
            active.ranking = Set(Some(rank));
            *m = active.update(&txn).await?;
            updated += 1;
        }

        txn.commit().await?;

        debug!(total = movies.len(), updated, "recomputed rankings");
        Ok(movies)
    }

    pub async fn get(&self, id: i32) -> AppResult<movie::Model> {
        movie::Entity::find_by_id(id).one(&self.db).await?.ok_or(AppError::NotFound(id))
    }

    /// Candidates from the metadata search, in the order the service returned them.
    pub async fn search_candidates(&self, title_query: &str) -> AppResult<Vec<SearchCandidate>> {
        let query = title_query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("movie title is required".to_string()));
        }

        let candidates = self.metadata.search(query).await?;
        debug!(query = %query, results = candidates.len(), "search candidates");
        Ok(candidates)
    }

    /// Fetches full details for an external id and stores them as an unrated movie.
    ///
    /// Returns the id of the new row. A title that already exists yields
    /// [`AppError::Conflict`] and leaves the table untouched.
    pub async fn create_from_external_id(&self, external_id: i64) -> AppResult<i32> {
        let details = self.metadata.details(external_id).await?;

        let title = details.original_title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::ExternalApi(format!("movie {external_id} has no title")));
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(AppError::InvalidInput(format!(
                "{title:?} is longer than {MAX_TITLE_CHARS} characters and cannot be stored"
            )));
        }
        let year = release_year(details.release_date.as_deref())?;
        let img_url = poster_url(&self.image_base_url, details.poster_path.as_deref());
        if img_url.chars().count() > MAX_IMG_URL_CHARS {
            return Err(AppError::ExternalApi(format!(
                "poster url for movie {external_id} is too long"
            )));
        }
        let description = truncate_chars(details.overview.trim(), MAX_DESCRIPTION_CHARS);

        let txn = self.db.begin().await?;

        movie::ActiveModel {
            title: Set(title.clone()),
            year: Set(year),
            description: Set(description),
            img_url: Set(img_url),
            rating: Set(None),
            ranking: Set(None),
            review: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let created = movie::Entity::find()
            .filter(movie::Column::Title.eq(title.as_str()))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::Internal(format!("inserted movie {title:?} vanished")))?;

        txn.commit().await?;

        info!(id = created.id, external_id, title = %created.title, "added movie");
        Ok(created.id)
    }

    /// Sets rating and review. Ranking is left alone until the next listing.
    pub async fn edit(&self, id: i32, rating: &str, review: &str) -> AppResult<movie::Model> {
        let rating = parse_rating(rating)?;
        let review = parse_review(review)?;

        let txn = self.db.begin().await?;

        let existing =
            movie::Entity::find_by_id(id).one(&txn).await?.ok_or(AppError::NotFound(id))?;
        let mut active: movie::ActiveModel = existing.into();
        active.rating = Set(Some(rating));
        active.review = Set(Some(review));
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        info!(id, rating, "rated movie");
        Ok(updated)
    }

    /// Removes a movie permanently and returns the row as it was.
    pub async fn delete(&self, id: i32) -> AppResult<movie::Model> {
        let txn = self.db.begin().await?;

        let existing =
            movie::Entity::find_by_id(id).one(&txn).await?.ok_or(AppError::NotFound(id))?;
        movie::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        info!(id, title = %existing.title, "deleted movie");
        Ok(existing)
    }
}

/// Rating descending, unrated last, ties by ascending id. Stable.
pub fn sort_by_rating(movies: &mut [movie::Model]) {
    movies.sort_by(|a, b| {
        let by_rating = match (a.rating, b.rating) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_rating.then(a.id.cmp(&b.id))
    });
}

/// Cuts `text` to at most `max` characters, never splitting a code point.
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].trim_end().to_string(),
        None => text.to_string(),
    }
}

fn parse_rating(raw: &str) -> AppResult<f64> {
    let raw = raw.trim();
    let rating: f64 = raw
        .parse()
        .map_err(|_| AppError::InvalidInput(format!("rating {raw:?} is not a number")))?;
    if !rating.is_finite() || !(0.0..=MAX_RATING).contains(&rating) {
        return Err(AppError::InvalidInput(format!("rating must be between 0 and {MAX_RATING}")));
    }
    Ok(rating)
}

fn parse_review(raw: &str) -> AppResult<String> {
    let review = raw.trim();
    if review.is_empty() {
        return Err(AppError::InvalidInput("review is required".to_string()));
    }
    if review.chars().count() > MAX_REVIEW_CHARS {
        return Err(AppError::InvalidInput(format!(
            "review must be at most {MAX_REVIEW_CHARS} characters"
        )));
    }
    Ok(review.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::{db, models::MovieDetails};

    const IMG_BASE: &str = "https://image.tmdb.org/t/p/w500";

    #[derive(Default)]
    struct FakeMetadata {
        details: HashMap<i64, MovieDetails>,
    }

    impl FakeMetadata {
        fn with(mut self, id: i64, title: &str, poster: &str, release: &str) -> Self {
            self.details.insert(
                id,
                MovieDetails {
                    original_title: title.to_string(),
                    overview: format!("About {title}"),
                    poster_path: Some(poster.to_string()),
                    release_date: Some(release.to_string()),
                },
            );
            self
        }
    }

    #[async_trait::async_trait]
    impl MetadataSource for FakeMetadata {
        async fn search(&self, query: &str) -> AppResult<Vec<SearchCandidate>> {
            let mut hits: Vec<_> = self
                .details
                .iter()
                .filter(|(_, d)| d.original_title.contains(query))
                .map(|(id, d)| SearchCandidate {
                    id: *id,
                    original_title: d.original_title.clone(),
                    title: None,
                    release_date: d.release_date.clone(),
                    poster_path: d.poster_path.clone(),
                    overview: None,
                })
                .collect();
            hits.sort_by_key(|c| c.id);
            Ok(hits)
        }

        async fn details(&self, external_id: i64) -> AppResult<MovieDetails> {
            self.details
                .get(&external_id)
                .cloned()
                .ok_or_else(|| AppError::ExternalApi(format!("404 for {external_id}")))
        }
    }

    async fn count(catalog: &MovieCatalog) -> u64 {
        movie::Entity::find().count(catalog.db()).await.unwrap()
    }

    async fn catalog(fake: FakeMetadata) -> MovieCatalog {
        let db = db::connect_and_migrate("sqlite::memory:").await.unwrap();
        MovieCatalog::new(db, Arc::new(fake), IMG_BASE.to_string())
    }

    async fn seed(catalog: &MovieCatalog, title: &str, rating: Option<f64>) -> i32 {
        let saved = movie::ActiveModel {
            title: Set(title.to_string()),
            year: Set(2000),
            description: Set(format!("About {title}")),
            img_url: Set(String::new()),
            rating: Set(rating),
            review: Set(rating.map(|_| "seeded".to_string())),
            ..Default::default()
        }
        .insert(catalog.db())
        .await
        .unwrap();
        saved.id
    }

    fn model(id: i32, rating: Option<f64>) -> movie::Model {
        movie::Model {
            id,
            title: format!("m{id}"),
            year: 2000,
            description: String::new(),
            rating,
            ranking: None,
            review: None,
            img_url: String::new(),
        }
    }

    #[test]
    fn sort_puts_unrated_last_and_breaks_ties_by_id() {
        let mut movies = vec![
            model(1, None),
            model(2, Some(7.0)),
            model(3, Some(9.0)),
            model(4, Some(7.0)),
            model(5, None),
        ];
        sort_by_rating(&mut movies);
        let ids: Vec<i32> = movies.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 2, 4, 1, 5]);
    }

    #[test]
    fn rating_validation() {
        assert_eq!(parse_rating(" 7.5 ").unwrap(), 7.5);
        assert_eq!(parse_rating("10").unwrap(), 10.0);
        assert!(matches!(parse_rating("great"), Err(AppError::InvalidInput(_))));
        assert!(matches!(parse_rating("11"), Err(AppError::InvalidInput(_))));
        assert!(matches!(parse_rating("-1"), Err(AppError::InvalidInput(_))));
        assert!(matches!(parse_rating("NaN"), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn review_validation() {
        assert_eq!(parse_review("  Great ").unwrap(), "Great");
        assert!(matches!(parse_review("   "), Err(AppError::InvalidInput(_))));
        assert!(matches!(parse_review(&"a".repeat(51)), Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn list_ranked_orders_by_rating_with_unrated_last() {
        let catalog = catalog(FakeMetadata::default()).await;
        seed(&catalog, "A", Some(8.5)).await;
        seed(&catalog, "B", Some(9.2)).await;
        seed(&catalog, "C", None).await;

        let ranked = catalog.list_ranked().await.unwrap();
        let view: Vec<(&str, Option<i32>, Option<f64>)> =
            ranked.iter().map(|m| (m.title.as_str(), m.ranking, m.rating)).collect();
        assert_eq!(
            view,
            vec![("B", Some(1), Some(9.2)), ("A", Some(2), Some(8.5)), ("C", Some(3), None)]
        );

        let stored = catalog.get(ranked[0].id).await.unwrap();
        assert_eq!(stored.ranking, Some(1));
    }

    #[tokio::test]
    async fn list_ranked_is_idempotent() {
        let catalog = catalog(FakeMetadata::default()).await;
        for (title, rating) in [("X", 3.0), ("Y", 6.5), ("Z", 4.25)] {
            seed(&catalog, title, Some(rating)).await;
        }

        let first = catalog.list_ranked().await.unwrap();
        let second = catalog.list_ranked().await.unwrap();
        assert_eq!(first, second);

        let ranks: Vec<i32> = first.iter().filter_map(|m| m.ranking).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert!(first.windows(2).all(|w| w[0].rating > w[1].rating));
    }

    #[tokio::test]
    async fn create_from_external_id_stores_unrated_movie() {
        let catalog =
            catalog(FakeMetadata::default().with(42, "Dune", "/abc.jpg", "2021-10-22")).await;

        let id = catalog.create_from_external_id(42).await.unwrap();
        let stored = catalog.get(id).await.unwrap();

        assert_eq!(stored.title, "Dune");
        assert_eq!(stored.year, 2021);
        assert_eq!(stored.img_url, format!("{IMG_BASE}/abc.jpg"));
        assert_eq!(stored.description, "About Dune");
        assert_eq!(stored.rating, None);
        assert_eq!(stored.review, None);
        assert_eq!(stored.ranking, None);
        assert!(!stored.is_rated());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("ééééé", 3), "ééé");
        assert_eq!(truncate_chars("ab cd", 3), "ab");
    }

    #[tokio::test]
    async fn long_overview_is_cut_to_column_width() {
        let mut fake = FakeMetadata::default().with(42, "Dune", "/abc.jpg", "2021-10-22");
        let overview = "é".repeat(150);
        fake.details.get_mut(&42).unwrap().overview = overview.clone();
        let catalog = catalog(fake).await;

        let id = catalog.create_from_external_id(42).await.unwrap();
        let stored = catalog.get(id).await.unwrap();
        assert_eq!(stored.description.chars().count(), 100);
        assert!(overview.starts_with(&stored.description));
    }

    #[tokio::test]
    async fn over_long_title_is_rejected() {
        let title = "T".repeat(40);
        let catalog =
            catalog(FakeMetadata::default().with(42, &title, "/abc.jpg", "2021-10-22")).await;

        let err = catalog.create_from_external_id(42).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)), "got {err:?}");
        assert_eq!(count(&catalog).await, 0);
    }

    #[tokio::test]
    async fn over_long_poster_url_is_rejected() {
        let poster = format!("/{}.jpg", "p".repeat(120));
        let catalog = catalog(FakeMetadata::default().with(42, "Dune", &poster, "2021-10-22")).await;

        let err = catalog.create_from_external_id(42).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalApi(_)));
        assert_eq!(count(&catalog).await, 0);
    }

    #[tokio::test]
    async fn duplicate_title_is_a_conflict() {
        let catalog =
            catalog(FakeMetadata::default().with(42, "Dune", "/abc.jpg", "2021-10-22")).await;
        catalog.create_from_external_id(42).await.unwrap();

        let err = catalog.create_from_external_id(42).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
        assert_eq!(count(&catalog).await, 1);
    }

    #[tokio::test]
    async fn unknown_external_id_is_an_api_failure() {
        let catalog = catalog(FakeMetadata::default()).await;
        let err = catalog.create_from_external_id(7).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalApi(_)));
        assert_eq!(count(&catalog).await, 0);
    }

    #[tokio::test]
    async fn edit_sets_rating_and_review_without_touching_ranking() {
        let catalog = catalog(FakeMetadata::default()).await;
        seed(&catalog, "Other", Some(9.0)).await;
        let id = seed(&catalog, "Target", None).await;
        catalog.list_ranked().await.unwrap();

        let updated = catalog.edit(id, "7.5", "Great").await.unwrap();
        assert_eq!(updated.rating, Some(7.5));
        assert_eq!(updated.review.as_deref(), Some("Great"));
        assert_eq!(updated.ranking, Some(2));
        assert!(updated.is_rated());

        catalog.edit(id, "9.5", "Even better").await.unwrap();
        let stored = catalog.get(id).await.unwrap();
        assert_eq!(stored.rating, Some(9.5));
        assert_eq!(stored.ranking, Some(2));

        let ranked = catalog.list_ranked().await.unwrap();
        assert_eq!(ranked[0].id, id);
        assert_eq!(ranked[0].ranking, Some(1));
    }

    #[tokio::test]
    async fn edit_missing_movie_is_not_found() {
        let catalog = catalog(FakeMetadata::default()).await;
        let id = seed(&catalog, "Only", None).await;

        let err = catalog.edit(id + 100, "5", "fine").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(missing) if missing == id + 100));

        let stored = catalog.get(id).await.unwrap();
        assert_eq!(stored.rating, None);
        assert_eq!(count(&catalog).await, 1);
    }

    #[tokio::test]
    async fn edit_rejects_bad_rating_before_touching_store() {
        let catalog = catalog(FakeMetadata::default()).await;
        let id = seed(&catalog, "Only", None).await;

        let err = catalog.edit(id, "ten", "fine").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(catalog.get(id).await.unwrap().rating, None);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_movie() {
        let catalog = catalog(FakeMetadata::default()).await;
        let keep = seed(&catalog, "Keep", Some(5.0)).await;
        let gone = seed(&catalog, "Gone", Some(6.0)).await;

        let deleted = catalog.delete(gone).await.unwrap();
        assert_eq!(deleted.title, "Gone");
        assert_eq!(count(&catalog).await, 1);
        assert!(catalog.get(keep).await.is_ok());
        assert!(matches!(catalog.get(gone).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_missing_movie_is_not_found() {
        let catalog = catalog(FakeMetadata::default()).await;
        seed(&catalog, "Keep", None).await;

        let err = catalog.delete(999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(999)));
        assert_eq!(count(&catalog).await, 1);
    }

    #[tokio::test]
    async fn search_requires_a_query() {
        let catalog =
            catalog(FakeMetadata::default().with(42, "Dune", "/abc.jpg", "2021-10-22")).await;

        assert!(matches!(
            catalog.search_candidates("  ").await,
            Err(AppError::InvalidInput(_))
        ));

        let hits = catalog.search_candidates("Dune").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 42);
    }
}
