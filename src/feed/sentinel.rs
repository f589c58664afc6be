//! Scroll sentinel.
//!
//! Watches the last rendered item of a feed. Every attachment gets a fresh
//! token and a visibility signal only counts when it carries the current one,
//! so an observer left over from an earlier attachment cannot trigger a second
//! advance.

use serde::Serialize;

/// Identifies one attachment of the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ObservationToken(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attachment {
    index: usize,
    token: ObservationToken,
}

#[derive(Debug, Default)]
pub struct Sentinel {
    attached: Option<Attachment>,
    next_token: u64,
}

impl Sentinel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile with the feed: detached while loading or empty, re-attached
    /// whenever the last index moves. Returns the live token.
    pub fn sync(&mut self, last_index: Option<usize>, loading: bool) -> Option<ObservationToken> {
        let Some(index) = last_index.filter(|_| !loading) else {
            self.attached = None;
            return None;
        };

        match self.attached {
            Some(attachment) if attachment.index == index => Some(attachment.token),
            _ => {
                self.next_token += 1;
                let token = ObservationToken(self.next_token);
                self.attached = Some(Attachment { index, token });
                Some(token)
            }
        }
    }

    pub fn token(&self) -> Option<ObservationToken> {
        self.attached.map(|a| a.token)
    }

    /// Report that the observed item became visible. Returns whether this
    /// should advance the feed; the attachment is consumed either way.
    pub fn on_visible(&mut self, token: ObservationToken) -> bool {
        match self.attached {
            Some(attachment) if attachment.token == token => {
                self.attached = None;
                true
            }
            _ => {
                tracing::debug!("Ignoring visibility from stale sentinel {:?}", token);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_stable_while_index_is() {
        let mut sentinel = Sentinel::new();
        let first = sentinel.sync(Some(23), false).unwrap();
        assert_eq!(sentinel.sync(Some(23), false), Some(first));

        let moved = sentinel.sync(Some(47), false).unwrap();
        assert_ne!(first, moved);
        assert!(!sentinel.on_visible(first));
        assert!(sentinel.on_visible(moved));
    }

    #[test]
    fn test_fires_once_per_attachment() {
        let mut sentinel = Sentinel::new();
        let token = sentinel.sync(Some(5), false).unwrap();
        assert!(sentinel.on_visible(token));
        assert!(!sentinel.on_visible(token));
    }

    #[test]
    fn test_detached_while_loading() {
        let mut sentinel = Sentinel::new();
        let token = sentinel.sync(Some(5), false).unwrap();
        assert_eq!(sentinel.sync(Some(5), true), None);
        assert!(!sentinel.on_visible(token));

        let again = sentinel.sync(Some(5), false).unwrap();
        assert_ne!(again, token);
        assert_eq!(sentinel.sync(None, false), None);
    }
}
