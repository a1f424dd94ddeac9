//! Read queries over `marketing_hub.ai_overviews_*`.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use cmt_core::{CitedSource, OverviewResult, Prompt, SourcePage};
use serde_json::Value;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from `marketing_hub.ai_overviews_prompts`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PromptRow {
    pub id: Uuid,
    pub prompt_text: String,
    pub primary_product: String,
    pub location: Option<String>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<PromptRow> for Prompt {
    fn from(row: PromptRow) -> Self {
        Prompt {
            id: row.id,
            prompt_text: row.prompt_text,
            primary_product: row.primary_product,
            location: row.location,
            status: row.status,
            tags: row.tags,
            created_at: row.created_at,
        }
    }
}

/// A result joined with its prompt.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OverviewResultRow {
    pub prompt_id: Uuid,
    pub prompt_text: String,
    pub primary_product: String,
    pub location: Option<String>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
    pub prompt_created_at: Option<DateTime<Utc>>,
    pub result_id: Uuid,
    pub provider: String,
    pub scraped_date: NaiveDate,
    pub scraped_at: Option<DateTime<Utc>>,
    pub response_text: Option<String>,
    /// Raw `sources` JSONB; see [`parse_cited_sources`].
    pub sources: Option<Value>,
    pub ahrefs_volume: Option<i32>,
    pub sentiment_label: Option<String>,
}

impl OverviewResultRow {
    #[must_use]
    pub fn into_pair(self) -> (Prompt, OverviewResult) {
        let prompt = Prompt {
            id: self.prompt_id,
            prompt_text: self.prompt_text,
            primary_product: self.primary_product,
            location: self.location,
            status: self.status,
            tags: self.tags,
            created_at: self.prompt_created_at,
        };
        let result = OverviewResult {
            id: self.result_id,
            prompt_id: self.prompt_id,
            provider: self.provider,
            scraped_date: self.scraped_date,
            scraped_at: self.scraped_at,
            response_text: self.response_text,
            sources: self.sources.as_ref().and_then(parse_cited_sources),
            ahrefs_volume: self.ahrefs_volume,
            sentiment_label: self.sentiment_label,
        };
        (prompt, result)
    }
}

/// A cited page with HTML, tagged with the result that cited it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourcePageRow {
    pub id: Uuid,
    pub source_url: String,
    pub source_domain: String,
    pub source_html_content: Option<String>,
    pub page_title: Option<String>,
    pub scraped_at: Option<NaiveDateTime>,
    pub scrape_status: Option<String>,
    pub result_id: Uuid,
}

impl SourcePageRow {
    #[must_use]
    pub fn into_page(self) -> SourcePage {
        SourcePage {
            url: self.source_url,
            domain: self.source_domain,
            html: self.source_html_content,
            page_title: self.page_title,
            scraped_at: self.scraped_at.map(|t| t.and_utc()),
            scrape_status: self.scrape_status,
        }
    }
}

/// Filters for [`get_prompts`]. Empty `tags` means no tag filter.
#[derive(Debug, Clone)]
pub struct PromptFilter {
    pub status: String,
    pub product: Option<String>,
    pub location: Option<String>,
    pub tags: Vec<String>,
}

impl Default for PromptFilter {
    fn default() -> Self {
        Self {
            status: "active".to_string(),
            product: None,
            location: None,
            tags: Vec::new(),
        }
    }
}

/// Decode a result's `sources` column.
///
/// Accepts a JSON array or a string holding one. Entries without a `url` are
/// dropped; anything else yields `None`.
#[must_use]
pub fn parse_cited_sources(value: &Value) -> Option<Vec<CitedSource>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<CitedSource>(item.clone()).ok())
                .collect(),
        ),
        Value::String(raw) => serde_json::from_str::<Value>(raw)
            .ok()
            .filter(Value::is_array)
            .and_then(|v| parse_cited_sources(&v)),
        _ => None,
    }
}

fn tags_param(tags: &[String]) -> Option<Vec<String>> {
    (!tags.is_empty()).then(|| tags.to_vec())
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Prompts matching `filter`, newest first. Tags must all be present.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_prompts(
    conn: &mut PgConnection,
    filter: &PromptFilter,
) -> Result<Vec<Prompt>, DbError> {
    let rows = sqlx::query_as::<_, PromptRow>(
        "SELECT id, prompt_text, primary_product, location, status, tags, created_at \
         FROM marketing_hub.ai_overviews_prompts \
         WHERE status = $1 \
           AND ($2::text IS NULL OR primary_product = $2) \
           AND ($3::text IS NULL OR location = $3) \
           AND ($4::text[] IS NULL OR tags @> $4) \
         ORDER BY created_at DESC",
    )
    .bind(&filter.status)
    .bind(filter.product.as_deref())
    .bind(filter.location.as_deref())
    .bind(tags_param(&filter.tags))
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(Prompt::from).collect())
}

/// Results with text scraped in `[start, end]` for `provider`, paired with
/// their prompts. Ordered by scrape date descending, then keyword.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_results_for_period(
    conn: &mut PgConnection,
    start: NaiveDate,
    end: NaiveDate,
    provider: &str,
    tags: &[String],
) -> Result<Vec<(Prompt, OverviewResult)>, DbError> {
    let rows = sqlx::query_as::<_, OverviewResultRow>(
        "SELECT \
             p.id AS prompt_id, p.prompt_text, p.primary_product, p.location, \
             p.status, p.tags, p.created_at AS prompt_created_at, \
             r.id AS result_id, r.provider, r.scraped_date, r.scraped_at, \
             r.response_text, r.sources, r.ahrefs_volume, r.sentiment_label \
         FROM marketing_hub.ai_overviews_results r \
         JOIN marketing_hub.ai_overviews_prompts p ON r.prompt_id = p.id \
         WHERE r.scraped_date BETWEEN $1 AND $2 \
           AND r.provider = $3 \
           AND r.response_text IS NOT NULL \
           AND ($4::text[] IS NULL OR p.tags @> $4) \
         ORDER BY r.scraped_date DESC, p.prompt_text",
    )
    .bind(start)
    .bind(end)
    .bind(provider)
    .bind(tags_param(tags))
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(OverviewResultRow::into_pair).collect())
}

/// Successfully scraped cited pages with HTML, keyed by the citing result.
///
/// URL fragments are ignored when joining citations to pages. When a page was
/// scraped more than once the latest scrape wins. Results with no usable
/// pages are absent from the map.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_sources_with_html(
    conn: &mut PgConnection,
    result_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<SourcePage>>, DbError> {
    if result_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, SourcePageRow>(
        "SELECT DISTINCT ON (source_item->>'url', r.id) \
             s.id, \
             source_item->>'url' AS source_url, \
             s.source_domain, \
             s.source_html_content, \
             s.page_title, \
             s.scraped_at, \
             s.scrape_status, \
             r.id AS result_id \
         FROM marketing_hub.ai_overviews_results r \
         CROSS JOIN LATERAL jsonb_array_elements( \
             CASE WHEN jsonb_typeof(r.sources) = 'array' THEN r.sources ELSE '[]'::jsonb END \
         ) AS source_item \
         JOIN marketing_hub.ai_overviews_sources s \
             ON s.source_url = SPLIT_PART(source_item->>'url', '#', 1) \
         WHERE r.id = ANY($1::uuid[]) \
           AND s.source_html_content IS NOT NULL \
           AND s.scrape_status = 'success' \
         ORDER BY source_item->>'url', r.id, s.scraped_at DESC",
    )
    .bind(result_ids)
    .fetch_all(conn)
    .await?;

    let mut by_result: HashMap<Uuid, Vec<SourcePage>> = HashMap::new();
    for row in rows {
        by_result
            .entry(row.result_id)
            .or_default()
            .push(row.into_page());
    }
    Ok(by_result)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_cited_sources_reads_array() {
        let value = json!([
            {"url": "https://a.example", "title": "A"},
            {"url": "https://b.example", "domain": "b.example", "position": 2},
            {"title": "no url"}
        ]);

        let sources = parse_cited_sources(&value).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].title.as_deref(), Some("A"));
        assert_eq!(sources[1].domain.as_deref(), Some("b.example"));
    }

    #[test]
    fn parse_cited_sources_reads_stringified_array() {
        let value = json!("[{\"url\": \"https://a.example\"}]");
        let sources = parse_cited_sources(&value).unwrap();
        assert_eq!(sources[0].url, "https://a.example");
    }

    #[test]
    fn parse_cited_sources_rejects_other_shapes() {
        assert!(parse_cited_sources(&json!({"url": "https://a.example"})).is_none());
        assert!(parse_cited_sources(&json!("not json")).is_none());
        assert!(parse_cited_sources(&Value::Null).is_none());
    }

    #[test]
    fn tags_param_is_null_when_empty() {
        assert!(tags_param(&[]).is_none());
        assert_eq!(
            tags_param(&["vpn".to_string()]),
            Some(vec!["vpn".to_string()])
        );
    }
}
