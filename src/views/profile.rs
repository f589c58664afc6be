//! Profile page: a user's favorites, reviews, history and statistics.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::User;
use crate::errors::AppError;
use crate::models::{ProfileRow, RatingRow, ReadMarkRow, WorkSummary};
use crate::social::favorites::favorites_of;
use crate::social::history::{recent_reads, RECENT_READS};
use crate::social::ratings::{aggregates_for, ratings_by, round_one};
use crate::store::{select_as, Query, Table};
use crate::AppState;

use super::format::relative_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileTab {
    #[default]
    Favorites,
    Reviews,
    History,
    Stats,
}

/// Whose profile is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileOwner {
    /// `None` for a placeholder whose handle is not a user id
    pub user_id: Option<String>,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_own: bool,
}

impl ProfileOwner {
    fn own(user: &User) -> Self {
        Self {
            user_id: Some(user.id.clone()),
            username: user.handle(),
            display_name: user.display_name(),
            avatar_url: user.avatar_url.clone(),
            is_own: true,
        }
    }

    fn from_row(row: ProfileRow) -> Self {
        Self {
            user_id: Some(row.user_id),
            display_name: row.full_name.unwrap_or_else(|| row.username.clone()),
            username: row.username,
            avatar_url: row.avatar_url,
            is_own: false,
        }
    }

    /// Stand-in for a handle with no profile row.
    fn placeholder(handle: &str) -> Self {
        Self {
            user_id: Uuid::parse_str(handle).ok().map(|id| id.to_string()),
            username: handle.to_string(),
            display_name: handle.to_string(),
            avatar_url: None,
            is_own: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoriteEntry {
    pub work: WorkSummary,
    /// Rounded to one decimal
    pub average: Option<f64>,
    pub ratings: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewEntry {
    pub work: WorkSummary,
    pub rating: u8,
    pub rated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub mark: ReadMarkRow,
    pub read: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileStats {
    pub favorites: usize,
    pub reviews: usize,
    pub chapters_read: usize,
    /// Mean of the ratings this user gave, rounded to one decimal
    pub average_given: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileState {
    pub owner: ProfileOwner,
    pub tab: ProfileTab,
    pub favorites: Vec<FavoriteEntry>,
    pub reviews: Vec<ReviewEntry>,
    pub history: Vec<HistoryEntry>,
    pub stats: ProfileStats,
}

pub struct ProfileView {
    owner: ProfileOwner,
    tab: ProfileTab,
    favorites: Vec<FavoriteEntry>,
    reviews: Vec<ReviewEntry>,
    history: Vec<ReadMarkRow>,
}

impl ProfileView {
    /// Without a handle, the signed-in user's own profile (`Unauthorized` when
    /// signed out). With a handle, the matching profile or a placeholder.
    pub async fn open(app: &AppState, handle: Option<&str>) -> Result<Self, AppError> {
        let current = app.session.current();
        let owner = match (handle, &current) {
            (None, None) => return Err(AppError::Unauthorized("Sign in to see your profile".to_string())),
            (None, Some(user)) => ProfileOwner::own(user),
            (Some(handle), Some(user)) if handle.eq_ignore_ascii_case(&user.handle()) => {
                ProfileOwner::own(user)
            }
            (Some(handle), _) => lookup(app, handle).await?,
        };

        let mut view = Self {
            owner,
            tab: ProfileTab::default(),
            favorites: Vec::new(),
            reviews: Vec::new(),
            history: Vec::new(),
        };
        if let Some(user_id) = view.owner.user_id.clone() {
            view.load(app, &user_id).await;
        }
        Ok(view)
    }

    async fn load(&mut self, app: &AppState, user_id: &str) {
        let store = app.store.as_ref();

        match favorites_of(store, user_id).await {
            Ok(rows) => {
                let works: Vec<WorkSummary> = rows
                    .iter()
                    .filter_map(|row| catalog_work(app, &row.work_id))
                    .collect();
                let ids: Vec<String> = works.iter().map(|w| w.id.clone()).collect();
                let aggregates = aggregates_for(store, &ids).await.unwrap_or_else(|e| {
                    tracing::warn!("Failed to load favorite ratings: {}", e);
                    Default::default()
                });
                self.favorites = works
                    .into_iter()
                    .map(|work| {
                        let aggregate = aggregates.get(&work.id);
                        FavoriteEntry {
                            average: aggregate.map(|a| round_one(a.average)),
                            ratings: aggregate.map(|a| a.total).unwrap_or(0),
                            work,
                        }
                    })
                    .collect();
            }
            Err(e) => tracing::warn!("Failed to load favorites of {}: {}", user_id, e),
        }

        match ratings_by(store, user_id).await {
            Ok(rows) => self.reviews = reviews_from(app, rows),
            Err(e) => tracing::warn!("Failed to load ratings of {}: {}", user_id, e),
        }

        if self.owner.is_own {
            match recent_reads(store, user_id, RECENT_READS).await {
                Ok(reads) => self.history = reads,
                Err(e) => tracing::warn!("Failed to load history of {}: {}", user_id, e),
            }
        }
    }

    pub fn owner(&self) -> &ProfileOwner {
        &self.owner
    }

    pub fn select_tab(&mut self, tab: ProfileTab) {
        self.tab = tab;
    }

    pub fn stats(&self) -> ProfileStats {
        let given: Vec<f64> = self.reviews.iter().map(|r| r.rating as f64).collect();
        ProfileStats {
            favorites: self.favorites.len(),
            reviews: self.reviews.len(),
            chapters_read: self.history.len(),
            average_given: (!given.is_empty())
                .then(|| round_one(given.iter().sum::<f64>() / given.len() as f64)),
        }
    }

    pub fn state(&self) -> ProfileState {
        let now = Utc::now();
        ProfileState {
            owner: self.owner.clone(),
            tab: self.tab,
            favorites: self.favorites.clone(),
            reviews: self.reviews.clone(),
            history: self
                .history
                .iter()
                .map(|mark| HistoryEntry {
                    read: relative_time(mark.read_at, now),
                    mark: mark.clone(),
                })
                .collect(),
            stats: self.stats(),
        }
    }
}

async fn lookup(app: &AppState, handle: &str) -> Result<ProfileOwner, AppError> {
    let query = Query::from(Table::Profiles).eq("username", handle).limit(1);
    let rows: Vec<ProfileRow> = select_as(app.store.as_ref(), &query).await?;
    Ok(match rows.into_iter().next() {
        Some(row) => ProfileOwner::from_row(row),
        None => {
            tracing::debug!("No profile named {}, showing a placeholder", handle);
            ProfileOwner::placeholder(handle)
        }
    })
}

fn catalog_work(app: &AppState, work_id: &str) -> Option<WorkSummary> {
    let work = app.catalog.get_work_by_slug(work_id).map(|w| w.summary.clone());
    if work.is_none() {
        tracing::debug!("Skipping {} which is not in the catalog", work_id);
    }
    work
}

fn reviews_from(app: &AppState, rows: Vec<RatingRow>) -> Vec<ReviewEntry> {
    let now = Utc::now();
    rows.into_iter()
        .filter_map(|row| {
            let work = catalog_work(app, &row.work_id)?;
            Some(ReviewEntry {
                work,
                rating: row.rating,
                rated: row
                    .updated_at
                    .or(row.created_at)
                    .map(|at| relative_time(at, now)),
            })
        })
        .collect()
}
