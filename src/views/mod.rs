//! View layer.
//!
//! Each route has a view controller that owns the state of one screen and turns
//! user intents into calls on the feed, catalog and social modules. Views expose
//! a serializable state snapshot for presentation.

pub mod catalog;
pub mod detail;
pub mod format;
pub mod home;
pub mod profile;
pub mod reader;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{CatalogState, CatalogView};
pub use detail::{DetailState, DetailView};
pub use home::{HomeState, HomeView};
pub use profile::{ProfileState, ProfileTab, ProfileView};
pub use reader::{ReaderState, ReaderView};

use std::collections::HashMap;

use serde::Serialize;

use crate::auth::User;
use crate::errors::AppError;
use crate::models::{RatingAggregate, WorkSummary};
use crate::social::ratings;
use crate::AppState;

/// A parsed application path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Works,
    SignIn,
    /// `None` is the signed-in user's own profile
    Profile(Option<String>),
    Work(String),
    Chapter { slug: String, chapter_id: u32 },
    NotFound(String),
}

impl Route {
    /// Parse a path; query strings, fragments and trailing slashes are ignored.
    pub fn parse(path: &str) -> Route {
        let clean = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let segments: Vec<&str> = clean.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Home,
            ["works"] => Route::Works,
            ["sign-in"] => Route::SignIn,
            ["profile"] => Route::Profile(None),
            ["profile", handle] => Route::Profile(Some(handle.to_string())),
            ["work", slug] => Route::Work(slug.to_string()),
            ["chapter", slug, id] => match id.parse() {
                Ok(chapter_id) => Route::Chapter {
                    slug: slug.to_string(),
                    chapter_id,
                },
                Err(_) => Route::NotFound(path.to_string()),
            },
            _ => Route::NotFound(path.to_string()),
        }
    }

    /// Canonical path of the route.
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Works => "/works".to_string(),
            Route::SignIn => "/sign-in".to_string(),
            Route::Profile(None) => "/profile".to_string(),
            Route::Profile(Some(handle)) => format!("/profile/{}", handle),
            Route::Work(slug) => format!("/work/{}", slug),
            Route::Chapter { slug, chapter_id } => format!("/chapter/{}/{}", slug, chapter_id),
            Route::NotFound(path) => path.clone(),
        }
    }
}

/// Sign-in screen. The OAuth flow itself happens outside the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignInState {
    pub user: Option<User>,
    /// Where to go instead when a session already exists
    pub redirect: Option<String>,
}

/// The rendered state of one route.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum Page {
    Home(HomeState),
    Catalog(CatalogState),
    SignIn(SignInState),
    Profile(ProfileState),
    Work(DetailState),
    Chapter(ReaderState),
    /// The route needs a session
    SignInRequired { path: String },
    NotFound { path: String },
}

/// Open the view for `route`, let its first loads finish and return its state.
///
/// Missing works, chapters and profiles render as [`Page::NotFound`]; routes
/// that need a session render as [`Page::SignInRequired`].
pub async fn render(state: &AppState, route: &Route) -> Result<Page, AppError> {
    let result = match route {
        Route::Home => {
            let mut view = HomeView::open(state).await;
            view.settle().await;
            Ok(Page::Home(view.state()))
        }
        Route::Works => {
            let mut view = CatalogView::open(state).await;
            view.settle().await;
            Ok(Page::Catalog(view.state()))
        }
        Route::SignIn => {
            let user = state.session.current();
            let redirect = user.as_ref().map(|_| Route::Home.path());
            Ok(Page::SignIn(SignInState { user, redirect }))
        }
        Route::Profile(handle) => ProfileView::open(state, handle.as_deref())
            .await
            .map(|view| Page::Profile(view.state())),
        Route::Work(slug) => DetailView::open(state, slug)
            .await
            .map(|view| Page::Work(view.state())),
        Route::Chapter { slug, chapter_id } => ReaderView::open(state, slug, *chapter_id)
            .await
            .map(|view| Page::Chapter(view.state())),
        Route::NotFound(path) => Ok(Page::NotFound { path: path.clone() }),
    };

    match result {
        Err(AppError::NotFound(msg)) => {
            tracing::debug!("Rendering not found for {}: {}", route.path(), msg);
            Ok(Page::NotFound { path: route.path() })
        }
        Err(AppError::Unauthorized(_)) => Ok(Page::SignInRequired { path: route.path() }),
        other => other,
    }
}

/// Rating aggregates for every displayed work, in one batched query.
///
/// On failure the previous aggregates are kept.
pub(crate) async fn refresh_ratings<'a>(
    state: &AppState,
    works: impl IntoIterator<Item = &'a WorkSummary>,
    current: &mut HashMap<String, RatingAggregate>,
) {
    let mut ids: Vec<String> = works.into_iter().map(|w| w.id.clone()).collect();
    ids.sort_unstable();
    ids.dedup();
    match ratings::aggregates_for(state.store.as_ref(), &ids).await {
        Ok(aggregates) => *current = aggregates,
        Err(e) => tracing::warn!("Failed to load rating aggregates: {}", e),
    }
}
