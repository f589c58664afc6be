//! Per-user relations: favorites, ratings, comments and read history.
//!
//! Favorite and rating changes are shown before the store confirms them; see
//! [`optimistic`] for how concurrent intents are reconciled.

pub mod comments;
pub mod favorites;
pub mod history;
pub mod optimistic;
pub mod ratings;

pub use comments::CommentThread;
pub use favorites::FavoriteState;
pub use optimistic::{OptimisticCell, Relation};
pub use ratings::RatingState;

use serde::Serialize;

/// How a user-issued mutation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOutcome {
    /// The store confirmed the latest intent
    Saved,
    /// Another write for the same relation is running and will pick this up
    Queued,
    /// The store refused; the shown value went back to the confirmed one
    Reverted,
    /// A previous submission is still being sent
    Busy,
    /// Nothing changed because no one is signed in
    SignInRequired,
}
