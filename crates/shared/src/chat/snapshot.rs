use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::repos::{OrderBy, PortfolioRow, PortfolioSource, TableQuery};

const DOCUMENT_HEADING: &str = "# Portfolio snapshot";
const EMPTY_SECTION: &str = "No data available.";
const MAX_FIELD_CHARS: usize = 200;
const SECTION_ROW_LIMIT: i64 = 10;

/// Plain-text grounding document. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub text: String,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("portfolio source unavailable: every section read failed")]
    SourceUnavailable,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub label: &'static str,
    pub column: &'static str,
}

const fn field(label: &'static str, column: &'static str) -> FieldSpec {
    FieldSpec { label, column }
}

#[derive(Debug, Clone, Copy)]
pub struct SectionDescriptor {
    pub title: &'static str,
    pub query: TableQuery,
    /// Column rendered as the bullet's lead text.
    pub headline: &'static str,
    pub fields: &'static [FieldSpec],
}

pub static PORTFOLIO_SECTIONS: &[SectionDescriptor] = &[
    SectionDescriptor {
        title: "Owner Profile",
        query: TableQuery {
            table: "profile",
            order_by: Some(OrderBy::desc("updated_at")),
            limit: 1,
        },
        headline: "full_name",
        fields: &[
            field("Title", "title"),
            field("Bio", "bio"),
            field("Location", "location"),
        ],
    },
    SectionDescriptor {
        title: "Projects",
        query: TableQuery {
            table: "projects",
            order_by: Some(OrderBy::desc("created_at")),
            limit: SECTION_ROW_LIMIT,
        },
        headline: "title",
        fields: &[
            field("Description", "description"),
            field("Technologies", "technologies"),
            field("Link", "live_url"),
            field("Source", "github_url"),
        ],
    },
    SectionDescriptor {
        title: "Experience",
        query: TableQuery {
            table: "experiences",
            order_by: Some(OrderBy::desc("start_date")),
            limit: SECTION_ROW_LIMIT,
        },
        headline: "position",
        fields: &[
            field("Company", "company"),
            field("Start", "start_date"),
            field("End", "end_date"),
            field("Current", "is_current"),
            field("Description", "description"),
        ],
    },
    SectionDescriptor {
        title: "Skills",
        query: TableQuery {
            table: "skills",
            order_by: Some(OrderBy::asc("display_order")),
            limit: SECTION_ROW_LIMIT,
        },
        headline: "name",
        fields: &[
            field("Category", "category"),
            field("Proficiency", "proficiency"),
        ],
    },
    SectionDescriptor {
        title: "Achievements",
        query: TableQuery {
            table: "achievements",
            order_by: Some(OrderBy::desc("date")),
            limit: SECTION_ROW_LIMIT,
        },
        headline: "title",
        fields: &[field("Date", "date"), field("Description", "description")],
    },
    SectionDescriptor {
        title: "Education",
        query: TableQuery {
            table: "education",
            order_by: Some(OrderBy::desc("start_date")),
            limit: SECTION_ROW_LIMIT,
        },
        headline: "institution",
        fields: &[
            field("Degree", "degree"),
            field("Field", "field_of_study"),
            field("Start", "start_date"),
            field("End", "end_date"),
        ],
    },
    SectionDescriptor {
        title: "Certifications",
        query: TableQuery {
            table: "certifications",
            order_by: Some(OrderBy::desc("issue_date")),
            limit: SECTION_ROW_LIMIT,
        },
        headline: "name",
        fields: &[
            field("Issuer", "issuer"),
            field("Issued", "issue_date"),
            field("Credential", "credential_url"),
        ],
    },
    SectionDescriptor {
        title: "Testimonials",
        query: TableQuery {
            table: "testimonials",
            order_by: Some(OrderBy::desc("created_at")),
            limit: SECTION_ROW_LIMIT,
        },
        headline: "author_name",
        fields: &[
            field("Role", "author_role"),
            field("Company", "author_company"),
            field("Quote", "content"),
        ],
    },
    SectionDescriptor {
        title: "Contact Info",
        query: TableQuery {
            table: "contact_info",
            order_by: None,
            limit: SECTION_ROW_LIMIT,
        },
        headline: "email",
        fields: &[field("Phone", "phone"), field("Location", "location")],
    },
    SectionDescriptor {
        title: "Social Links",
        query: TableQuery {
            table: "social_links",
            order_by: None,
            limit: SECTION_ROW_LIMIT,
        },
        headline: "platform",
        fields: &[field("URL", "url")],
    },
];

#[derive(Clone)]
pub struct SnapshotBuilder {
    source: Arc<dyn PortfolioSource>,
    sections: &'static [SectionDescriptor],
}

impl SnapshotBuilder {
    pub fn new(source: Arc<dyn PortfolioSource>) -> Self {
        Self {
            source,
            sections: PORTFOLIO_SECTIONS,
        }
    }

    /// Reads every section concurrently and renders them in descriptor order.
    pub async fn build(&self, now: DateTime<Utc>) -> Result<Snapshot, SnapshotError> {
        let reads = self
            .sections
            .iter()
            .map(|section| self.source.select_rows(&section.query));
        let results = join_all(reads).await;

        let mut failed_sections = 0usize;
        let mut text = String::from(DOCUMENT_HEADING);
        text.push('\n');

        for (section, result) in self.sections.iter().zip(results) {
            let rows = match result {
                Ok(rows) => rows,
                Err(err) => {
                    failed_sections += 1;
                    warn!(
                        table = section.query.table,
                        error = %err,
                        "portfolio section read failed; rendering as empty"
                    );
                    Vec::new()
                }
            };
            render_section(&mut text, section, &rows);
        }

        if !self.sections.is_empty() && failed_sections == self.sections.len() {
            return Err(SnapshotError::SourceUnavailable);
        }

        debug!(
            sections = self.sections.len(),
            failed_sections,
            chars = text.len(),
            "portfolio snapshot built"
        );

        Ok(Snapshot {
            text,
            built_at: now,
        })
    }
}

fn render_section(out: &mut String, section: &SectionDescriptor, rows: &[PortfolioRow]) {
    out.push_str(&format!("\n## {}\n", section.title));

    let mut rendered_any = false;
    for row in rows {
        let headline = row
            .get(section.headline)
            .and_then(render_value)
            .unwrap_or_else(|| "(untitled)".to_string());
        out.push_str(&format!("- {headline}\n"));

        for field in section.fields {
            if let Some(value) = row.get(field.column).and_then(render_value) {
                out.push_str(&format!("  {}: {value}\n", field.label));
            }
        }
        rendered_any = true;
    }

    if !rendered_any {
        out.push_str(EMPTY_SECTION);
        out.push('\n');
    }
}

/// Flattens one cell into a single bounded line. Nulls and blanks render as nothing.
fn render_value(value: &Value) -> Option<String> {
    let raw = match value {
        Value::Null => return None,
        Value::String(text) => text.clone(),
        Value::Bool(flag) => (if *flag { "yes" } else { "no" }).to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    };

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }

    Some(truncate_chars(&collapsed, MAX_FIELD_CHARS))
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;

    use super::{PORTFOLIO_SECTIONS, SnapshotBuilder, render_value, truncate_chars};
    use crate::repos::{
        MemoryStore, PortfolioRow, PortfolioSource, StoreError, StoreFuture, TableQuery,
    };

    fn row(value: serde_json::Value) -> PortfolioRow {
        value.as_object().cloned().expect("fixture should be an object")
    }

    /// Serves rows from memory except for one table whose reads always fail.
    struct OneTableDown {
        inner: MemoryStore,
        broken_table: &'static str,
    }

    impl PortfolioSource for OneTableDown {
        fn select_rows<'a>(
            &'a self,
            query: &'a TableQuery,
        ) -> StoreFuture<'a, Vec<PortfolioRow>> {
            if query.table == self.broken_table {
                return Box::pin(async move {
                    Err(StoreError::Unavailable(format!("{} offline", query.table)))
                });
            }
            self.inner.select_rows(query)
        }
    }

    #[test]
    fn descriptors_cover_every_portfolio_table_in_order() {
        let tables: Vec<_> = PORTFOLIO_SECTIONS
            .iter()
            .map(|section| section.query.table)
            .collect();
        assert_eq!(
            tables,
            vec![
                "profile",
                "projects",
                "experiences",
                "skills",
                "achievements",
                "education",
                "certifications",
                "testimonials",
                "contact_info",
                "social_links",
            ]
        );
        assert_eq!(PORTFOLIO_SECTIONS[0].query.limit, 1);
    }

    #[tokio::test]
    async fn empty_store_renders_every_header_with_placeholder() {
        let builder = SnapshotBuilder::new(Arc::new(MemoryStore::new()));
        let snapshot = builder.build(Utc::now()).await.expect("build succeeds");

        for section in PORTFOLIO_SECTIONS {
            assert!(
                snapshot.text.contains(&format!("## {}\n", section.title)),
                "missing header {}",
                section.title
            );
        }
        assert_eq!(
            snapshot.text.matches("No data available.").count(),
            PORTFOLIO_SECTIONS.len()
        );
    }

    #[tokio::test]
    async fn projects_section_lists_rows_and_other_sections_stay_empty() {
        let store = MemoryStore::new();
        store.put_rows(
            "projects",
            vec![row(json!({
                "title": "Compiler",
                "description": "A  toy\n compiler",
                "technologies": ["Rust", "LLVM"],
                "created_at": "2024-01-01T00:00:00Z"
            }))],
        );

        let snapshot = SnapshotBuilder::new(Arc::new(store))
            .build(Utc::now())
            .await
            .expect("build succeeds");

        assert!(snapshot.text.contains("## Projects\n- Compiler\n"));
        assert!(snapshot.text.contains("  Description: A toy compiler\n"));
        assert!(snapshot.text.contains("  Technologies: Rust, LLVM\n"));
        assert!(snapshot.text.contains("## Skills\nNo data available.\n"));
        assert_eq!(
            snapshot.text.matches("No data available.").count(),
            PORTFOLIO_SECTIONS.len() - 1
        );
    }

    #[tokio::test]
    async fn one_failed_section_renders_empty_and_the_rest_still_render() {
        let store = MemoryStore::new();
        store.put_rows(
            "projects",
            vec![row(json!({ "title": "Ledger Sync", "created_at": "2024-03-01T00:00:00Z" }))],
        );
        store.put_rows(
            "testimonials",
            vec![row(json!({ "author_name": "Dana", "content": "Great to work with" }))],
        );
        store.put_rows("skills", vec![row(json!({ "name": "Rust", "display_order": 1 }))]);

        let snapshot = SnapshotBuilder::new(Arc::new(OneTableDown {
            inner: store,
            broken_table: "testimonials",
        }))
        .build(Utc::now())
        .await
        .expect("a single failed section does not fail the build");

        assert!(snapshot.text.contains("## Testimonials\nNo data available.\n"));
        assert!(!snapshot.text.contains("Dana"));
        assert!(snapshot.text.contains("## Projects\n- Ledger Sync\n"));
        assert!(snapshot.text.contains("## Skills\n- Rust\n"));
    }

    #[test]
    fn values_are_collapsed_and_truncated() {
        let long = "x".repeat(500);
        let rendered = render_value(&json!(long)).expect("value renders");
        assert_eq!(rendered.chars().count(), 200);
        assert_eq!(render_value(&json!("   ")), None);
        assert_eq!(render_value(&json!(null)), None);
        assert_eq!(render_value(&json!(true)).as_deref(), Some("yes"));
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
