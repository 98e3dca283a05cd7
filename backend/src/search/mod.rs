//! Tantivy-based search index module.
//!
//! Provides full-text search over weekly reports and timeline events with
//! field boosting.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, BoostQuery, Occur, QueryParser};
use tantivy::schema::{Field, Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{Project, TimelineEvent, WeeklyReport};

/// Field boost values.
const BOOST_CONTENT: f32 = 10.0;
const BOOST_AUTHOR: f32 = 6.0;
const BOOST_CONTEXT: f32 = 4.0;

/// Kind of an indexed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Report,
    Event,
}

impl DocKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocKind::Report => "report",
            DocKind::Event => "event",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "report" => Some(DocKind::Report),
            "event" => Some(DocKind::Event),
            _ => None,
        }
    }
}

/// Search hit with entity kind, id and relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub kind: DocKind,
    pub id: String,
    pub score: f32,
}

/// Search index schema fields.
struct SearchFields {
    /// `<kind>:<id>`, used to replace or delete a document
    doc_key: Field,
    kind: Field,
    entity_id: Field,
    author: Field,
    content: Field,
    context: Field,
}

/// Tantivy search index for reports and timeline events.
pub struct SearchIndex {
    index: Index,
    reader: IndexReader,
    writer: Arc<RwLock<IndexWriter>>,
    fields: SearchFields,
}

fn doc_key(kind: DocKind, id: &str) -> String {
    format!("{}:{}", kind.as_str(), id)
}

impl SearchIndex {
    /// Create or open a search index at the specified path.
    pub fn open(index_path: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(index_path)
            .map_err(|e| AppError::Search(format!("Failed to create index directory: {}", e)))?;

        let mut schema_builder = Schema::builder();
        let doc_key = schema_builder.add_text_field("doc_key", STRING);
        let kind = schema_builder.add_text_field("kind", STRING | STORED);
        let entity_id = schema_builder.add_text_field("entity_id", STORED);
        let author = schema_builder.add_text_field("author", TEXT);
        let content = schema_builder.add_text_field("content", TEXT);
        let context = schema_builder.add_text_field("context", TEXT);
        let schema = schema_builder.build();

        let fields = SearchFields {
            doc_key,
            kind,
            entity_id,
            author,
            content,
            context,
        };

        // Try to open existing index or create new one
        let index = Index::open_in_dir(index_path)
            .or_else(|_| Index::create_in_dir(index_path, schema.clone()))
            .map_err(|e| AppError::Search(format!("Failed to open/create index: {}", e)))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::OnCommitWithDelay)
            .try_into()
            .map_err(|e| AppError::Search(format!("Failed to create reader: {}", e)))?;

        let writer = index
            .writer(50_000_000) // 50MB buffer
            .map_err(|e| AppError::Search(format!("Failed to create writer: {}", e)))?;

        Ok(Self {
            index,
            reader,
            writer: Arc::new(RwLock::new(writer)),
            fields,
        })
    }

    /// Rebuild the entire index.
    pub async fn rebuild(
        &self,
        reports: &[WeeklyReport],
        events: &[TimelineEvent],
        projects: &[Project],
    ) -> Result<(), AppError> {
        let titles: HashMap<&str, &str> = projects
            .iter()
            .map(|p| (p.id.as_str(), p.title.as_str()))
            .collect();

        let mut writer = self.writer.write().await;
        writer.delete_all_documents()?;

        for report in reports {
            writer.add_document(self.report_document(report))?;
        }
        for event in events {
            let title = titles.get(event.project_id.as_str()).copied();
            writer.add_document(self.event_document(event, title))?;
        }

        writer.commit()?;
        self.reader.reload()?;

        tracing::info!(
            "Search index rebuilt with {} reports and {} events",
            reports.len(),
            events.len()
        );
        Ok(())
    }

    /// Index (or re-index) a single report.
    pub async fn index_report(&self, report: &WeeklyReport) -> Result<(), AppError> {
        self.replace(DocKind::Report, &report.id, self.report_document(report))
            .await
    }

    /// Index (or re-index) a single event.
    pub async fn index_event(
        &self,
        event: &TimelineEvent,
        project_title: Option<&str>,
    ) -> Result<(), AppError> {
        self.replace(
            DocKind::Event,
            &event.id,
            self.event_document(event, project_title),
        )
        .await
    }

    /// Remove a document from the index.
    pub async fn remove(&self, kind: DocKind, id: &str) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;
        writer.delete_term(Term::from_field_text(self.fields.doc_key, &doc_key(kind, id)));
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    async fn replace(&self, kind: DocKind, id: &str, doc: TantivyDocument) -> Result<(), AppError> {
        let mut writer = self.writer.write().await;
        writer.delete_term(Term::from_field_text(self.fields.doc_key, &doc_key(kind, id)));
        writer.add_document(doc)?;
        writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    /// Search for reports and events matching the query.
    pub fn search(
        &self,
        query_str: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SearchResult>, AppError> {
        if query_str.trim().is_empty() {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();

        let query_parser = QueryParser::for_index(
            &self.index,
            vec![self.fields.content, self.fields.author, self.fields.context],
        );

        let base_query = query_parser
            .parse_query(query_str)
            .map_err(|e| AppError::Search(format!("Invalid search query: {}", e)))?;

        let mut subqueries: Vec<(Occur, Box<dyn tantivy::query::Query>)> = Vec::new();

        let field_queries = [
            (self.fields.content, BOOST_CONTENT),
            (self.fields.author, BOOST_AUTHOR),
            (self.fields.context, BOOST_CONTEXT),
        ];

        for (field, boost) in field_queries {
            let field_parser = QueryParser::for_index(&self.index, vec![field]);
            if let Ok(field_query) = field_parser.parse_query(query_str) {
                subqueries.push((Occur::Should, Box::new(BoostQuery::new(field_query, boost))));
            }
        }

        let combined_query = if subqueries.is_empty() {
            base_query
        } else {
            Box::new(BooleanQuery::new(subqueries))
        };

        let top_docs = searcher
            .search(&combined_query, &TopDocs::with_limit(limit + offset))
            .map_err(|e| AppError::Search(format!("Search failed: {}", e)))?;

        let results = top_docs
            .into_iter()
            .skip(offset)
            .take(limit)
            .filter_map(|(score, doc_address)| {
                let doc: TantivyDocument = searcher.doc(doc_address).ok()?;
                let kind = DocKind::from_str(doc.get_first(self.fields.kind)?.as_str()?)?;
                let id = doc.get_first(self.fields.entity_id)?.as_str()?.to_string();
                Some(SearchResult { kind, id, score })
            })
            .collect();

        Ok(results)
    }

    fn report_document(&self, report: &WeeklyReport) -> TantivyDocument {
        let context = report
            .details
            .iter()
            .flat_map(|d| {
                [
                    d.project_title.as_str(),
                    d.content.as_deref().unwrap_or(""),
                    d.plan.as_deref().unwrap_or(""),
                ]
            })
            .collect::<Vec<_>>()
            .join(" ");

        doc!(
            self.fields.doc_key => doc_key(DocKind::Report, &report.id),
            self.fields.kind => DocKind::Report.as_str(),
            self.fields.entity_id => report.id.clone(),
            self.fields.author => report.username.clone(),
            self.fields.content => report.content.clone(),
            self.fields.context => context
        )
    }

    fn event_document(&self, event: &TimelineEvent, project_title: Option<&str>) -> TantivyDocument {
        let captions = event
            .attachments
            .iter()
            .filter_map(|a| a.caption.as_deref())
            .collect::<Vec<_>>()
            .join(" ");

        doc!(
            self.fields.doc_key => doc_key(DocKind::Event, &event.id),
            self.fields.kind => DocKind::Event.as_str(),
            self.fields.entity_id => event.id.clone(),
            self.fields.author => event.author_name.clone(),
            self.fields.content => event.content.clone(),
            self.fields.context => format!("{} {}", project_title.unwrap_or(""), captions)
        )
    }
}
