//! Builder for the game database query language.
//!
//! Produces bodies of the form
//! `fields a,b; search "x"; where c = 1; sort d desc; limit 10; offset 20;`.

use std::fmt::Write as _;

/// Largest page size the API accepts.
pub const MAX_LIMIT: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Query {
    fields: Vec<String>,
    search: Option<String>,
    filters: Vec<String>,
    sort: Option<(String, SortOrder)>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Comma separated field projection; may be called repeatedly.
    pub fn fields(mut self, fields: &str) -> Self {
        self.fields.extend(
            fields
                .split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(str::to_string),
        );
        self
    }

    /// Full-text search term. Double quotes in the term are dropped.
    pub fn search(mut self, term: &str) -> Self {
        self.search = Some(term.replace('"', ""));
        self
    }

    /// Adds a `where` condition; multiple conditions are joined with `&`.
    pub fn filter(mut self, condition: impl Into<String>) -> Self {
        self.filters.push(condition.into());
        self
    }

    /// Adds `where id = (..)` for the given ids.
    pub fn ids(self, ids: &[i64]) -> Self {
        self.filter(format!("id = {}", id_list(ids)))
    }

    pub fn sort(mut self, field: &str, order: SortOrder) -> Self {
        self.sort = Some((field.to_string(), order));
        self
    }

    /// Page size, clamped to `1..=MAX_LIMIT`.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit.clamp(1, MAX_LIMIT));
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// 1-based pagination: sets the clamped limit and `offset = (page - 1) * limit`.
    pub fn page(self, page: u32, limit: u32) -> Self {
        let query = self.limit(limit);
        let limit = query.limit.unwrap_or(MAX_LIMIT);
        let offset = page.max(1).saturating_sub(1).saturating_mul(limit);
        query.offset(offset)
    }

    pub fn build(&self) -> String {
        let mut body = String::new();

        if self.fields.is_empty() {
            body.push_str("fields *;");
        } else {
            let _ = write!(body, "fields {};", self.fields.join(","));
        }
        if let Some(term) = &self.search {
            let _ = write!(body, " search \"{term}\";");
        }
        if !self.filters.is_empty() {
            let _ = write!(body, " where {};", self.filters.join(" & "));
        }
        if let Some((field, order)) = &self.sort {
            let _ = write!(body, " sort {field} {};", order.as_str());
        }
        if let Some(limit) = self.limit {
            let _ = write!(body, " limit {limit};");
        }
        if let Some(offset) = self.offset {
            let _ = write!(body, " offset {offset};");
        }

        body
    }
}

/// Renders `(1,2,3)`.
pub fn id_list(ids: &[i64]) -> String {
    let joined = ids
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("({joined})")
}
