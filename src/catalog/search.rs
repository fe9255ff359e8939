use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, FuzzyTermQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::*;
use tantivy::{DocAddress, Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument};
use tokio::sync::RwLock;
use tracing::debug;

use crate::db::Celebrity;

/// Non-relevance sorts rank at most this many matches, and no page
/// reaches past it.
const SORT_WINDOW: usize = 1000;

/// A published celebrity together with the text that makes it findable.
#[derive(Debug, Clone)]
pub struct IndexedCelebrity {
    pub celebrity: Celebrity,
    pub tag_slugs: Vec<String>,
    pub bios: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchSort {
    #[default]
    Relevance,
    Popularity,
    Name,
}

impl SearchSort {
    pub fn from_param(value: Option<&str>) -> SearchSort {
        match value {
            Some("popularity") => SearchSort::Popularity,
            Some("name") => SearchSort::Name,
            _ => SearchSort::Relevance,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub text: String,
    pub country: Option<String>,
    pub profession: Option<String>,
    pub tags: Vec<String>,
    pub sort: SearchSort,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: i64,
    pub slug: String,
    pub full_name: String,
    pub nickname: Option<String>,
    pub profession: Option<String>,
    pub country: Option<String>,
    pub profile_image_url: Option<String>,
    pub popularity_score: f64,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub hits: Vec<SearchHit>,
    pub total: usize,
}

/// Lowercased alphanumeric words, split the way the default tokenizer does.
fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    id_field: Field,
    slug_field: Field,
    full_name_field: Field,
    nickname_field: Field,
    profession_field: Field,
    bio_field: Field,
    country_field: Field,
    country_key_field: Field,
    tags_field: Field,
    image_field: Field,
    popularity_field: Field,
}

impl SearchIndex {
    pub fn new() -> Result<Self, SearchError> {
        let mut schema_builder = Schema::builder();

        let id_field = schema_builder.add_i64_field("id", INDEXED | STORED);
        let slug_field = schema_builder.add_text_field("slug", STORED);
        let full_name_field = schema_builder.add_text_field("full_name", TEXT | STORED);
        let nickname_field = schema_builder.add_text_field("nickname", TEXT | STORED);
        let profession_field = schema_builder.add_text_field("profession", TEXT | STORED);
        let bio_field = schema_builder.add_text_field("bio", TEXT);
        let country_field = schema_builder.add_text_field("country", STORED);
        let country_key_field = schema_builder.add_text_field("country_key", STRING);
        let tags_field = schema_builder.add_text_field("tags", STRING);
        let image_field = schema_builder.add_text_field("image", STORED);
        let popularity_field = schema_builder.add_f64_field("popularity", STORED | FAST);

        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);

        let writer = index.writer_with_num_threads(1, 50_000_000)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            id_field,
            slug_field,
            full_name_field,
            nickname_field,
            profession_field,
            bio_field,
            country_field,
            country_key_field,
            tags_field,
            image_field,
            popularity_field,
        })
    }

    pub async fn rebuild(&self, entries: &[IndexedCelebrity]) -> Result<(), SearchError> {
        debug!("Rebuilding search index");

        let mut writer = self.writer.write().await;
        writer.delete_all_documents()?;

        for entry in entries {
            let c = &entry.celebrity;
            let mut doc = TantivyDocument::default();
            doc.add_i64(self.id_field, c.id);
            doc.add_text(self.slug_field, &c.slug);
            doc.add_text(self.full_name_field, &c.full_name);
            if let Some(ref nickname) = c.nickname {
                doc.add_text(self.nickname_field, nickname);
            }
            if let Some(ref profession) = c.profession {
                doc.add_text(self.profession_field, profession);
            }
            if let Some(ref country) = c.country {
                doc.add_text(self.country_field, country);
                doc.add_text(self.country_key_field, country.trim().to_lowercase());
            }
            if let Some(ref image) = c.profile_image_url {
                doc.add_text(self.image_field, image);
            }
            for bio in &entry.bios {
                doc.add_text(self.bio_field, bio);
            }
            for tag in &entry.tag_slugs {
                doc.add_text(self.tags_field, tag);
            }
            doc.add_f64(self.popularity_field, c.popularity_score);

            writer.add_document(doc)?;
        }

        writer.commit()?;
        self.reader.reload()?;

        debug!("Search index rebuilt with {} celebrities", entries.len());
        Ok(())
    }

    fn filters(&self, request: &SearchRequest) -> Vec<(Occur, Box<dyn Query>)> {
        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();

        if let Some(country) = request.country.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            let term = Term::from_field_text(self.country_key_field, &country.to_lowercase());
            clauses.push((
                Occur::Must,
                Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
            ));
        }

        if let Some(ref profession) = request.profession {
            for word in words(profession) {
                let term = Term::from_field_text(self.profession_field, &word);
                clauses.push((
                    Occur::Must,
                    Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
                ));
            }
        }

        let tags: Vec<(Occur, Box<dyn Query>)> = request
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|t| {
                let term = Term::from_field_text(self.tags_field, t);
                let q: Box<dyn Query> = Box::new(TermQuery::new(term, IndexRecordOption::Basic));
                (Occur::Should, q)
            })
            .collect();
        if !tags.is_empty() {
            clauses.push((Occur::Must, Box::new(BooleanQuery::new(tags))));
        }

        clauses
    }

    /// Full-text search with filters, sorting and pagination.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchPage, SearchError> {
        let searcher = self.reader.searcher();

        let mut query_parser = QueryParser::for_index(
            &self.index,
            vec![
                self.full_name_field,
                self.nickname_field,
                self.profession_field,
                self.bio_field,
            ],
        );
        query_parser.set_field_boost(self.full_name_field, 3.0);
        query_parser.set_field_boost(self.nickname_field, 2.0);

        let (text_query, errors) = query_parser.parse_query_lenient(&request.text);
        if !errors.is_empty() {
            debug!("Lenient parse of {:?}: {} errors", request.text, errors.len());
        }

        let mut clauses = vec![(Occur::Must, text_query)];
        clauses.extend(self.filters(request));
        let query = BooleanQuery::new(clauses);

        if request.offset >= SORT_WINDOW {
            let total = searcher.search(&query, &Count)?;
            return Ok(SearchPage {
                hits: Vec::new(),
                total,
            });
        }
        let limit = request.limit.min(SORT_WINDOW - request.offset);

        match request.sort {
            SearchSort::Relevance => {
                let collector = (
                    TopDocs::with_limit(limit.max(1)).and_offset(request.offset),
                    Count,
                );
                let (top_docs, total) = searcher.search(&query, &collector)?;
                let hits = self.load_hits(&searcher, top_docs)?;
                Ok(SearchPage {
                    hits: hits.into_iter().take(limit).collect(),
                    total,
                })
            }
            SearchSort::Popularity | SearchSort::Name => {
                let collector = (TopDocs::with_limit(SORT_WINDOW), Count);
                let (top_docs, total) = searcher.search(&query, &collector)?;
                let mut hits = self.load_hits(&searcher, top_docs)?;
                if request.sort == SearchSort::Popularity {
                    hits.sort_by(|a, b| {
                        b.popularity_score
                            .partial_cmp(&a.popularity_score)
                            .unwrap_or(Ordering::Equal)
                            .then_with(|| a.id.cmp(&b.id))
                    });
                } else {
                    hits.sort_by(|a, b| {
                        a.full_name
                            .to_lowercase()
                            .cmp(&b.full_name.to_lowercase())
                            .then_with(|| a.id.cmp(&b.id))
                    });
                }
                Ok(SearchPage {
                    hits: hits
                        .into_iter()
                        .skip(request.offset)
                        .take(limit)
                        .collect(),
                    total,
                })
            }
        }
    }

    /// Prefix match on full name and nickname, most popular first.
    pub fn autocomplete(&self, text: &str, limit: usize) -> Result<SearchPage, SearchError> {
        let words = words(text);
        if words.is_empty() || limit == 0 {
            return Ok(SearchPage::default());
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for word in &words {
            let mut either: Vec<(Occur, Box<dyn Query>)> = Vec::new();
            for field in [self.full_name_field, self.nickname_field] {
                let term = Term::from_field_text(field, word);
                either.push((Occur::Should, Box::new(FuzzyTermQuery::new_prefix(term, 0, true))));
            }
            clauses.push((Occur::Must, Box::new(BooleanQuery::new(either))));
        }
        let query = BooleanQuery::new(clauses);

        let searcher = self.reader.searcher();
        let (top_docs, total) =
            searcher.search(&query, &(TopDocs::with_limit(SORT_WINDOW), Count))?;
        let mut hits = self.load_hits(&searcher, top_docs)?;
        hits.sort_by(|a, b| {
            b.popularity_score
                .partial_cmp(&a.popularity_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);

        Ok(SearchPage { hits, total })
    }

    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    fn load_hits(
        &self,
        searcher: &Searcher,
        top_docs: Vec<(f32, DocAddress)>,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            let text = |field: Field| -> Option<String> {
                doc.get_first(field).and_then(|v| v.as_str()).map(str::to_string)
            };

            if let (Some(id), Some(slug), Some(full_name)) = (
                doc.get_first(self.id_field).and_then(|v| v.as_i64()),
                text(self.slug_field),
                text(self.full_name_field),
            ) {
                hits.push(SearchHit {
                    id,
                    slug,
                    full_name,
                    nickname: text(self.nickname_field),
                    profession: text(self.profession_field),
                    country: text(self.country_field),
                    profile_image_url: text(self.image_field),
                    popularity_score: doc
                        .get_first(self.popularity_field)
                        .and_then(|v| v.as_f64())
                        .unwrap_or(0.0),
                    score,
                });
            }
        }
        Ok(hits)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),
    #[error("Query parse error: {0}")]
    QueryParse(#[from] tantivy::query::QueryParserError),
}
