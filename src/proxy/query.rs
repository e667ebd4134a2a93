//! Query resolution, authorization and dispatch.

use bytes::Bytes;

use crate::error::{ProxyError, Result};
use crate::influxql;
use crate::observability::metrics;
use crate::proxy::coordinator::Proxy;
use crate::proxy::executors;

/// A query as received from the transport layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequest {
    /// Raw `q` parameter.
    pub q: String,
    /// `db` parameter, if any.
    pub db: Option<String>,
    /// Remaining parameters, forwarded to backends untouched.
    pub params: Vec<(String, String)>,
}

impl QueryRequest {
    pub fn new(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Default::default()
        }
    }

    pub fn with_db(mut self, db: impl Into<String>) -> Self {
        self.db = Some(db.into()).filter(|d: &String| !d.is_empty());
        self
    }

    /// Build from decoded form or query-string pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut request = Self::default();
        for (k, v) in pairs {
            let (k, v) = (k.into(), v.into());
            match k.as_str() {
                "q" => request.q = v,
                "db" => request.db = Some(v).filter(|d| !d.is_empty()),
                // credentials stay at the proxy
                "u" | "p" => {}
                _ => request.params.push((k, v)),
            }
        }
        request
    }

    /// Copy of this request targeting `db`.
    pub(crate) fn for_database(&self, db: Option<&str>) -> Self {
        Self {
            q: self.q.clone(),
            db: db.map(str::to_string).or_else(|| self.db.clone()),
            params: self.params.clone(),
        }
    }
}

/// Dispatch target chosen for a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// SELECT/SHOW with a FROM clause, served by one circle.
    From,
    /// SELECT/SHOW without FROM, merged across circles.
    Show,
    /// DELETE, DROP MEASUREMENT or DROP SERIES on every circle.
    DeleteOrDrop,
    /// Database or retention-policy DDL on every backend.
    Alter,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryKind::From => "from",
            QueryKind::Show => "show",
            QueryKind::DeleteOrDrop => "delete_or_drop",
            QueryKind::Alter => "alter",
        }
    }
}

impl Proxy {
    /// Classify, authorize and execute a query, returning the response body.
    pub async fn query(&self, request: &QueryRequest) -> Result<Bytes> {
        let result = self.dispatch(request).await;
        if result.is_err() {
            metrics::record_query_error();
        }
        result
    }

    async fn dispatch(&self, request: &QueryRequest) -> Result<Bytes> {
        let q = request.q.trim();
        if q.is_empty() {
            return Err(ProxyError::EmptyQuery);
        }

        let (tokens, valid, from) = influxql::check_query(q);
        if !valid {
            return Err(ProxyError::IllegalQuery);
        }

        let class = influxql::classify_database(&tokens);
        let db = if class.explicit {
            class.database.clone()
        } else {
            request
                .db
                .clone()
                .or_else(|| influxql::database_from_body(&tokens))
        };

        if !class.show_databases {
            let db = db.as_deref().ok_or(ProxyError::DatabaseNotFound)?;
            if !self.is_database_allowed(db) {
                return Err(ProxyError::DatabaseForbidden(db.to_string()));
            }
        }

        let kind = classify_kind(&tokens, from, class.alter_database).ok_or(ProxyError::IllegalQuery)?;
        metrics::record_query(kind.as_str());
        tracing::debug!(kind = kind.as_str(), db = ?db, "Dispatching query");

        let request = QueryRequest {
            q: q.to_string(),
            ..request.clone()
        };
        match kind {
            QueryKind::From => {
                // db is always resolved here, only SHOW DATABASES skips the gate
                let db = db.ok_or(ProxyError::DatabaseNotFound)?;
                executors::query_from(self, &request, &tokens, &db).await
            }
            QueryKind::Show => executors::query_show(self, &request, db.as_deref()).await,
            QueryKind::DeleteOrDrop => {
                let db = db.ok_or(ProxyError::DatabaseNotFound)?;
                executors::query_delete_or_drop(self, &request, &tokens, &db).await
            }
            QueryKind::Alter => executors::query_alter(self, &request, db.as_deref()).await,
        }
    }
}

/// First matching dispatch row wins.
fn classify_kind(tokens: &[String], from: bool, alter_database: bool) -> Option<QueryKind> {
    let select_or_show = influxql::is_select_or_show(tokens);
    if select_or_show && from {
        Some(QueryKind::From)
    } else if select_or_show {
        Some(QueryKind::Show)
    } else if influxql::is_delete_or_drop_measurement(tokens) {
        Some(QueryKind::DeleteOrDrop)
    } else if alter_database || influxql::is_retention_policy_statement(tokens) {
        Some(QueryKind::Alter)
    } else {
        None
    }
}
