//! Home screen: the genre feed and the recommended shelf.

use std::collections::HashMap;

use serde::Serialize;

use crate::feed::{CuratedShelf, Feed, FeedKind, FeedState};
use crate::models::{FilterSnapshot, Genre, RatingAggregate, SortOrder, WorkSummary, DEFAULT_GENRE_ID};
use crate::storage::keys;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct HomeState {
    pub genres: Vec<Genre>,
    pub feed: FeedState,
    pub recommended: Vec<WorkSummary>,
    /// Keyed by work id; works without ratings are absent
    pub ratings: HashMap<String, RatingAggregate>,
}

pub struct HomeView {
    app: AppState,
    feed: Feed,
    recommended: CuratedShelf,
    genres: Vec<Genre>,
    ratings: HashMap<String, RatingAggregate>,
}

impl HomeView {
    /// Open with the remembered genre, serving cached content while page 1 and
    /// the shelf revalidate.
    pub async fn open(app: &AppState) -> Self {
        let storage = &app.storage;
        let genre_id = storage
            .read_json::<u32>(FeedKind::Home.genre_key())
            .await
            .unwrap_or(DEFAULT_GENRE_ID);

        let feed = Feed::open(
            FeedKind::Home,
            FilterSnapshot::for_genre(genre_id),
            app.config.page_size,
            SortOrder::LATEST,
            app.feed_source.clone(),
            Some(storage.clone()),
        )
        .await;

        let mut recommended = CuratedShelf::open(
            keys::SHELF_RECOMMENDED,
            app.config.recommended_slugs.clone(),
            storage,
        )
        .await;
        recommended.refresh(&app.catalog, storage).await;

        let mut view = Self {
            app: app.clone(),
            feed,
            recommended,
            genres: app.catalog.filter_options(&[]).genres,
            ratings: HashMap::new(),
        };
        view.refresh_ratings().await;
        view
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut Feed {
        &mut self.feed
    }

    pub fn ratings(&self) -> &HashMap<String, RatingAggregate> {
        &self.ratings
    }

    /// Switch genre and remember the choice.
    pub async fn select_genre(&mut self, genre_id: u32) -> bool {
        if let Err(e) = self
            .app
            .storage
            .write_json(FeedKind::Home.genre_key(), &genre_id)
            .await
        {
            tracing::warn!("Failed to remember home genre: {}", e);
        }
        let snapshot = self.feed.snapshot().clone().with_genre(genre_id);
        self.feed.set_filter(snapshot).await
    }

    /// The user scrolled to the end of the list.
    pub fn reach_end(&mut self) -> bool {
        match self.feed.sentinel() {
            Some(token) => self.feed.on_sentinel_visible(token),
            None => false,
        }
    }

    /// Fetch the current page again, e.g. after a failed load.
    pub fn refresh(&mut self) -> bool {
        self.feed.refresh()
    }

    /// Apply outstanding page results, then reload ratings for what is shown.
    pub async fn settle(&mut self) {
        self.feed.settle().await;
        self.refresh_ratings().await;
    }

    pub async fn refresh_ratings(&mut self) {
        let shown = self.feed.items().iter().chain(self.recommended.items());
        super::refresh_ratings(&self.app, shown, &mut self.ratings).await;
    }

    pub fn state(&self) -> HomeState {
        HomeState {
            genres: self.genres.clone(),
            feed: self.feed.state(),
            recommended: self.recommended.items().to_vec(),
            ratings: self.ratings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_user;
    use crate::catalog::fixtures::{CatalogFixture, WorkSpec};
    use crate::social::RatingState;
    use crate::views::testing::{app_state, test_config};
    use tempfile::TempDir;

    fn fixture() -> CatalogFixture {
        let catalog = CatalogFixture::new();
        for i in 0..3 {
            catalog.add_work(&WorkSpec::new(&format!("webtoon-{}", i)).chapters(1));
        }
        catalog.add_work(&WorkSpec::new("shoujo-0").genre(4).chapters(1));
        catalog
    }

    #[tokio::test]
    async fn test_genre_is_remembered() {
        let catalog = fixture();
        let dir = TempDir::new().unwrap();
        let app = app_state(&catalog, &dir).await;

        let mut view = HomeView::open(&app).await;
        view.settle().await;
        assert_eq!(view.feed().items().len(), 3);
        assert_eq!(view.state().genres.len(), 2);

        assert!(view.select_genre(4).await);
        assert!(view.feed().items().is_empty());
        view.settle().await;
        assert_eq!(view.feed().items()[0].id, "shoujo-0");

        assert!(view.refresh());
        view.settle().await;
        assert_eq!(view.feed().items().len(), 1);

        let reopened = HomeView::open(&app).await;
        assert_eq!(reopened.feed().snapshot().genre_id, 4);
        // Page 1 of the remembered genre is served from cache right away.
        assert_eq!(reopened.feed().items().len(), 1);
        assert!(reopened.feed().controller().is_seeded());
    }

    #[tokio::test]
    async fn test_shelf_and_ratings() {
        let catalog = fixture();
        let dir = TempDir::new().unwrap();
        let mut config = test_config(&catalog, &dir);
        config.recommended_slugs = vec!["shoujo-0".to_string(), "gone".to_string()];
        let app = crate::AppState::init(config).await.unwrap();

        app.session.sign_in(test_user("u1"));
        RatingState::new(app.store.clone(), app.session.clone(), "shoujo-0")
            .submit(5)
            .await
            .unwrap();
        RatingState::new(app.store.clone(), app.session.clone(), "webtoon-1")
            .submit(2)
            .await
            .unwrap();

        let mut view = HomeView::open(&app).await;
        view.settle().await;
        let state = view.state();
        assert_eq!(state.recommended.len(), 1);
        assert_eq!(state.ratings["shoujo-0"].average, 5.0);
        assert_eq!(state.ratings["webtoon-1"].total, 1);
        assert!(!state.ratings.contains_key("webtoon-0"));
    }
}
