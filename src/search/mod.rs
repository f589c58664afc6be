//! Tantivy-based search over the catalog.
//!
//! Answers the free-text dimension of a feed filter. The index lives in memory and
//! is built once from the catalog; titles additionally match on plain substrings so
//! partially typed words still find their work.

use std::collections::HashSet;

use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, Query, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};

use crate::errors::AppError;
use crate::models::WorkInfo;

/// Field boost values.
const BOOST_TITLE: f32 = 10.0;
const BOOST_ALT_TITLE: f32 = 8.0;
const BOOST_TAG_NAMES: f32 = 4.0;
const BOOST_DESCRIPTION: f32 = 2.5;

/// Search result with work slug and relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub work_id: String,
    pub score: f32,
}

/// Search index schema fields.
struct SearchFields {
    work_id: Field,
    title: Field,
    alt_title: Field,
    description: Field,
    tag_names: Field,
}

/// In-memory full-text index of catalog works.
pub struct CatalogIndex {
    index: Index,
    reader: IndexReader,
    fields: SearchFields,
    /// (slug, lowercased titles) for substring matching
    titles: Vec<(String, String)>,
}

impl CatalogIndex {
    /// Build the index from catalog works.
    pub fn build(works: &[WorkInfo]) -> Result<Self, AppError> {
        let mut schema_builder = Schema::builder();
        let work_id = schema_builder.add_text_field("work_id", STRING | STORED);
        let title = schema_builder.add_text_field("title", TEXT);
        let alt_title = schema_builder.add_text_field("alt_title", TEXT);
        let description = schema_builder.add_text_field("description", TEXT);
        let tag_names = schema_builder.add_text_field("tag_names", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            work_id,
            title,
            alt_title,
            description,
            tag_names,
        };

        let index = Index::create_in_ram(schema);

        let mut writer: IndexWriter = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        for work in works {
            let tags: Vec<&str> = work.summary.tags.iter().map(|t| t.name.as_str()).collect();
            writer.add_document(doc!(
                fields.work_id => work.summary.id.clone(),
                fields.title => work.summary.title.clone(),
                fields.alt_title => work.alt_title.clone(),
                fields.description => work.description.clone(),
                fields.tag_names => tags.join(" ")
            ))?;
        }
        writer.commit()?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let titles = works
            .iter()
            .map(|w| {
                (
                    w.summary.id.clone(),
                    format!("{} {}", w.summary.title, w.alt_title).to_lowercase(),
                )
            })
            .collect();

        tracing::info!("Search index built with {} works", works.len());

        Ok(Self {
            index,
            reader,
            fields,
            titles,
        })
    }

    /// Ranked full-text matches for the query.
    pub fn search(&self, query_str: &str, limit: usize) -> Result<Vec<SearchResult>, AppError> {
        if query_str.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let field_queries = [
            (self.fields.title, BOOST_TITLE),
            (self.fields.alt_title, BOOST_ALT_TITLE),
            (self.fields.tag_names, BOOST_TAG_NAMES),
            (self.fields.description, BOOST_DESCRIPTION),
        ];

        let mut subqueries: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for (field, boost) in field_queries {
            let mut field_parser = QueryParser::for_index(&self.index, vec![field]);
            field_parser.set_conjunction_by_default();
            // User input is free text; unparsable fragments are dropped, not fatal.
            let (field_query, _errors) = field_parser.parse_query_lenient(query_str);
            subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
        }
        let combined = BooleanQuery::new(subqueries);

        let top_docs = searcher
            .search(&combined, &TopDocs::with_limit(limit))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let work_id = doc.get_first(self.fields.work_id)?.as_str()?.to_string();
                Some(SearchResult { work_id, score })
            })
            .collect();

        Ok(results)
    }

    /// Slugs of every work matching the query, by full text or title substring.
    pub fn matching_ids(&self, query_str: &str) -> Result<HashSet<String>, AppError> {
        let needle = query_str.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(HashSet::new());
        }

        let mut ids: HashSet<String> = self
            .search(query_str, self.titles.len())?
            .into_iter()
            .map(|r| r.work_id)
            .collect();

        ids.extend(
            self.titles
                .iter()
                .filter(|(_, titles)| titles.contains(&needle))
                .map(|(id, _)| id.clone()),
        );

        Ok(ids)
    }
}
