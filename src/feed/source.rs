//! Where feed pages come from.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::errors::AppError;
use crate::models::{SortField, WorkSummary};
use crate::search::CatalogIndex;

use super::PageRequest;

/// One fetched page plus the total the source reports, if any.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedPage {
    pub works: Vec<WorkSummary>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Answers page requests for a feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<FeedPage, AppError>;
}

/// Serves pages straight from the local catalog.
pub struct CatalogFeedSource {
    catalog: Arc<Catalog>,
    index: Arc<CatalogIndex>,
}

impl CatalogFeedSource {
    pub fn new(catalog: Arc<Catalog>, index: Arc<CatalogIndex>) -> Self {
        Self { catalog, index }
    }

    /// Every work matching the request's snapshot, in the requested order.
    fn matching(&self, request: &PageRequest) -> Result<Vec<WorkSummary>, AppError> {
        let snapshot = &request.snapshot;
        let search_hits = if snapshot.has_search() {
            Some(self.index.matching_ids(&snapshot.search)?)
        } else {
            None
        };

        let mut works: Vec<WorkSummary> = self
            .catalog
            .list_all_works()
            .into_iter()
            .filter(|w| w.genre.id == snapshot.genre_id)
            .filter(|w| snapshot.tag_ids.iter().all(|&tag| w.has_tag(tag)))
            .filter(|w| snapshot.status_id.map_or(true, |status| w.status.id == status))
            .filter(|w| search_hits.as_ref().map_or(true, |hits| hits.contains(&w.id)))
            .collect();

        let sort = request.sort;
        works.sort_by(|a, b| {
            let ord = compare(a, b, sort.field);
            if sort.descending {
                ord.reverse()
            } else {
                ord
            }
        });
        Ok(works)
    }
}

fn compare(a: &WorkSummary, b: &WorkSummary, field: SortField) -> Ordering {
    match field {
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::ChapterCount => a.chapter_count.cmp(&b.chapter_count),
    }
}

#[async_trait]
impl FeedSource for CatalogFeedSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<FeedPage, AppError> {
        let works = self.matching(request)?;
        let total = works.len() as u64;
        let works = works
            .into_iter()
            .skip(request.offset())
            .take(request.page_size)
            .collect();
        Ok(FeedPage {
            works,
            total: Some(total),
        })
    }
}

/// Serves pages from a remote search endpoint.
pub struct HttpFeedSource {
    client: Client,
    url: String,
    api_token: Option<String>,
}

impl HttpFeedSource {
    pub fn new(url: &str, api_token: Option<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("webtoon-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            api_token,
        })
    }
}

/// Query parameters of a page request.
pub fn query_pairs(request: &PageRequest) -> Vec<(&'static str, String)> {
    let snapshot = &request.snapshot;
    let mut pairs = vec![
        ("page", request.page.to_string()),
        ("limit", request.page_size.to_string()),
        ("genre_id", snapshot.genre_id.to_string()),
    ];
    if !snapshot.tag_ids.is_empty() {
        let tags: Vec<String> = snapshot.tag_ids.iter().map(u32::to_string).collect();
        pairs.push(("tag_ids", tags.join(",")));
    }
    if let Some(status_id) = snapshot.status_id {
        pairs.push(("status_id", status_id.to_string()));
    }
    if snapshot.has_search() {
        pairs.push(("q", snapshot.search.clone()));
    }
    pairs.push(("order_by", request.sort.field.as_str().to_string()));
    pairs.push(("order_direction", request.sort.direction().to_string()));
    pairs
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<FeedPage, AppError> {
        let mut builder = self.client.get(&self.url).query(&query_pairs(request));
        if let Some(token) = &self.api_token {
            builder = builder.header("Authorization", token);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Fetch(format!(
                "Feed endpoint answered {} for page {}",
                status, request.page
            )));
        }

        let page: FeedPage = response.json().await?;
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{CatalogFixture, WorkSpec};
    use crate::feed::FeedKind;
    use crate::models::{FilterSnapshot, SortOrder};

    fn request(snapshot: FilterSnapshot, page: u32, page_size: usize) -> PageRequest {
        PageRequest {
            ticket: 1,
            kind: FeedKind::Catalog,
            snapshot,
            page,
            page_size,
            sort: SortOrder::LATEST,
        }
    }

    async fn source(fixture: &CatalogFixture) -> CatalogFeedSource {
        let catalog = Arc::new(fixture.open().await);
        let index = Arc::new(CatalogIndex::build(catalog.works()).unwrap());
        CatalogFeedSource::new(catalog, index)
    }

    #[tokio::test]
    async fn test_filters_by_every_dimension() {
        let fixture = CatalogFixture::new();
        fixture.add_work(&WorkSpec::new("both").tags(&[3, 5]).status(2).chapters(1));
        fixture.add_work(&WorkSpec::new("fantasy-only").tags(&[3]).status(2).chapters(1));
        fixture.add_work(&WorkSpec::new("other-genre").genre(4).tags(&[3, 5]).status(2));
        fixture.add_work(&WorkSpec::new("other-status").tags(&[3, 5]).status(1));
        let source = source(&fixture).await;

        let snapshot = FilterSnapshot::for_genre(1)
            .with_tag_toggled(3)
            .with_tag_toggled(5)
            .with_status_toggled(Some(2));
        let page = source.fetch_page(&request(snapshot, 1, 24)).await.unwrap();
        let ids: Vec<&str> = page.works.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["both"]);
        assert_eq!(page.total, Some(1));
    }

    #[tokio::test]
    async fn test_pages_follow_update_order() {
        let fixture = CatalogFixture::new();
        for day in 0..5 {
            fixture.add_work(
                &WorkSpec::new(&format!("w{}", day))
                    .chapters(1)
                    .published_days_after_epoch(day),
            );
        }
        let source = source(&fixture).await;

        let first = source
            .fetch_page(&request(FilterSnapshot::default(), 1, 2))
            .await
            .unwrap();
        let third = source
            .fetch_page(&request(FilterSnapshot::default(), 3, 2))
            .await
            .unwrap();
        let first: Vec<&str> = first.works.iter().map(|w| w.id.as_str()).collect();
        let third: Vec<&str> = third.works.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(first, vec!["w4", "w3"]);
        assert_eq!(third, vec!["w0"]);
    }

    #[tokio::test]
    async fn test_search_dimension() {
        let fixture = CatalogFixture::new();
        fixture.add_work(&WorkSpec::new("sereia").title("O Lamento da Sereia"));
        fixture.add_work(&WorkSpec::new("tamer").title("Dragon Tamer"));
        let source = source(&fixture).await;

        let snapshot = FilterSnapshot::default().with_search("sere");
        let page = source.fetch_page(&request(snapshot, 1, 24)).await.unwrap();
        assert_eq!(page.works.len(), 1);
        assert_eq!(page.works[0].id, "sereia");
    }

    #[test]
    fn test_query_pairs() {
        let snapshot = FilterSnapshot::for_genre(4)
            .with_tag_toggled(8)
            .with_tag_toggled(3)
            .with_search("o deus");
        let pairs = query_pairs(&request(snapshot, 2, 24));
        assert_eq!(
            pairs,
            vec![
                ("page", "2".to_string()),
                ("limit", "24".to_string()),
                ("genre_id", "4".to_string()),
                ("tag_ids", "3,8".to_string()),
                ("q", "o deus".to_string()),
                ("order_by", "updated_at".to_string()),
                ("order_direction", "DESC".to_string()),
            ]
        );
    }
}
