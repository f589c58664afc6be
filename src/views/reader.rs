//! Chapter reader.

use serde::Serialize;

use crate::errors::AppError;
use crate::models::{sort_chapters, Chapter, ChapterOrder, WorkSummary};
use crate::social::history;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct ReaderState {
    pub work: WorkSummary,
    pub chapter: Chapter,
    pub previous: Option<u32>,
    pub next: Option<u32>,
    /// Every chapter of the work, lowest sequence number first
    pub chapters: Vec<Chapter>,
    /// Whether the visit was added to the read history
    pub recorded: bool,
}

pub struct ReaderView {
    work: WorkSummary,
    chapter: Chapter,
    chapters: Vec<Chapter>,
    recorded: bool,
}

impl ReaderView {
    /// Load one chapter and record the visit for the signed-in user.
    pub async fn open(app: &AppState, slug: &str, chapter_id: u32) -> Result<Self, AppError> {
        let work = app
            .catalog
            .get_work_by_slug(slug)
            .map(|info| info.summary.clone())
            .ok_or_else(|| AppError::NotFound(format!("Work {} not found", slug)))?;
        let chapter = app
            .catalog
            .get_chapter(slug, chapter_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Chapter {} of {} not found", chapter_id, slug))
            })?;

        let mut chapters = app.catalog.get_chapters_for_work(slug).await?;
        sort_chapters(&mut chapters, ChapterOrder::Ascending);

        let recorded = history::record_read(app.store.as_ref(), &app.session, &work, &chapter).await;
        tracing::debug!("Opened {} chapter {}", slug, chapter_id);

        Ok(Self {
            work,
            chapter,
            chapters,
            recorded,
        })
    }

    pub fn chapter(&self) -> &Chapter {
        &self.chapter
    }

    fn position(&self) -> Option<usize> {
        self.chapters.iter().position(|c| c.id == self.chapter.id)
    }

    /// Chapter before this one in sequence order.
    pub fn previous(&self) -> Option<u32> {
        let index = self.position()?;
        index
            .checked_sub(1)
            .and_then(|i| self.chapters.get(i))
            .map(|c| c.id)
    }

    /// Chapter after this one in sequence order.
    pub fn next(&self) -> Option<u32> {
        let index = self.position()?;
        self.chapters.get(index + 1).map(|c| c.id)
    }

    pub fn state(&self) -> ReaderState {
        ReaderState {
            work: self.work.clone(),
            chapter: self.chapter.clone(),
            previous: self.previous(),
            next: self.next(),
            chapters: self.chapters.clone(),
            recorded: self.recorded,
        }
    }
}
