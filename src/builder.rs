//! Request builder stages.
//!
//! Each verb on [`RequestBuilder`] consumes it and returns a narrower stage,
//! so a chain can only carry one verb and only offers the calls valid for it:
//!
//! | verb | stage | capabilities |
//! |---|---|---|
//! | `select` | [`SelectBuilder`] | filters, pagination, `single` |
//! | `update`, `delete` | [`FilterBuilder`] | filters |
//! | `insert`, `upsert` | [`QueryBuilder`] | execute only |
//!
//! Stages own their [`RequestState`]; cloning a stage branches the chain and
//! the branches never observe each other's later calls.

use std::{fmt, future::Future};

use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    executor,
    params::{list_literal, range_literal, sanitize_param},
    request::{RequestState, ACCEPT, PREFER},
    PostgrestClient, ReqwestTransport, Result, Transport,
};

const RETURN_REPRESENTATION: &str = "return=representation";
const MERGE_DUPLICATES: &str = "return=representation,resolution=merge-duplicates";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

mod sealed {
    use crate::request::RequestState;

    pub trait Stage {
        fn request_mut(&mut self) -> &mut RequestState;
    }
}

/// Filter operators shared by [`FilterBuilder`] and [`SelectBuilder`].
///
/// Every operator appends one `column=<operator>.<criteria>` query parameter,
/// so repeated filters on a column combine with AND. Scalar values are sent
/// as opaque strings after [`sanitize_param`](crate::sanitize_param).
pub trait Filterable: sealed::Stage + Sized {
    /// Negates the next filter call, and only that one.
    fn not(mut self) -> Self {
        self.request_mut().mark_negate_next();
        self
    }

    /// Appends `column=<operator>.<criteria>`; `criteria` is sent verbatim.
    fn filter(mut self, column: &str, operator: &str, criteria: &str) -> Self {
        self.request_mut().push_filter(column, operator, criteria);
        self
    }

    fn eq(self, column: &str, value: impl AsRef<str>) -> Self {
        self.filter(column, "eq", &sanitize_param(value.as_ref()))
    }

    fn neq(self, column: &str, value: impl AsRef<str>) -> Self {
        self.filter(column, "neq", &sanitize_param(value.as_ref()))
    }

    fn gt(self, column: &str, value: impl AsRef<str>) -> Self {
        self.filter(column, "gt", &sanitize_param(value.as_ref()))
    }

    fn gte(self, column: &str, value: impl AsRef<str>) -> Self {
        self.filter(column, "gte", &sanitize_param(value.as_ref()))
    }

    fn lt(self, column: &str, value: impl AsRef<str>) -> Self {
        self.filter(column, "lt", &sanitize_param(value.as_ref()))
    }

    fn lte(self, column: &str, value: impl AsRef<str>) -> Self {
        self.filter(column, "lte", &sanitize_param(value.as_ref()))
    }

    /// Exact match against `null`, `true`, `false` and friends.
    fn is(self, column: &str, value: impl AsRef<str>) -> Self {
        self.filter(column, "is", &sanitize_param(value.as_ref()))
    }

    /// Pattern match; PostgREST reads `*` as the wildcard.
    fn like(self, column: &str, pattern: impl AsRef<str>) -> Self {
        self.filter(column, "like", &sanitize_param(pattern.as_ref()))
    }

    fn ilike(self, column: &str, pattern: impl AsRef<str>) -> Self {
        self.filter(column, "ilike", &sanitize_param(pattern.as_ref()))
    }

    /// Full-text search using `to_tsquery`.
    fn fts(self, column: &str, query: impl AsRef<str>) -> Self {
        self.filter(column, "fts", &sanitize_param(query.as_ref()))
    }

    /// Full-text search using `plainto_tsquery`.
    fn plfts(self, column: &str, query: impl AsRef<str>) -> Self {
        self.filter(column, "plfts", &sanitize_param(query.as_ref()))
    }

    /// Full-text search using `phraseto_tsquery`.
    fn phfts(self, column: &str, query: impl AsRef<str>) -> Self {
        self.filter(column, "phfts", &sanitize_param(query.as_ref()))
    }

    /// Full-text search using `websearch_to_tsquery`.
    fn wfts(self, column: &str, query: impl AsRef<str>) -> Self {
        self.filter(column, "wfts", &sanitize_param(query.as_ref()))
    }

    /// One of a list: `in.(a,b)`. An empty list is sent as `in.()`.
    fn in_<I, S>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filter(column, "in", &list_literal(values, '(', ')'))
    }

    /// Contains: `cs.{a,b}`.
    fn cs<I, S>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filter(column, "cs", &list_literal(values, '{', '}'))
    }

    /// Contained in: `cd.{a,b}`.
    fn cd<I, S>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filter(column, "cd", &list_literal(values, '{', '}'))
    }

    /// Overlap: `ov.{a,b}`.
    fn ov<I, S>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filter(column, "ov", &list_literal(values, '{', '}'))
    }

    /// Strictly left of the range: `sl.(from,to)`.
    fn sl(self, column: &str, from: i64, to: i64) -> Self {
        self.filter(column, "sl", &range_literal(from, to))
    }

    /// Strictly right of the range: `sr.(from,to)`.
    fn sr(self, column: &str, from: i64, to: i64) -> Self {
        self.filter(column, "sr", &range_literal(from, to))
    }

    /// Does not extend to the left of the range: `nxl.(from,to)`.
    fn nxl(self, column: &str, from: i64, to: i64) -> Self {
        self.filter(column, "nxl", &range_literal(from, to))
    }

    /// Does not extend to the right of the range: `nxr.(from,to)`.
    fn nxr(self, column: &str, from: i64, to: i64) -> Self {
        self.filter(column, "nxr", &range_literal(from, to))
    }

    /// Adjacent to the range: `adj.(from,to)`.
    fn adj(self, column: &str, from: i64, to: i64) -> Self {
        self.filter(column, "adj", &range_literal(from, to))
    }
}

/// Root stage returned by [`PostgrestClient::from`]; pick exactly one verb.
pub struct RequestBuilder<'c, T = ReqwestTransport> {
    client: &'c PostgrestClient<T>,
    state: RequestState,
}

impl<'c, T: Transport> RequestBuilder<'c, T> {
    pub(crate) fn new(client: &'c PostgrestClient<T>, state: RequestState) -> Self {
        Self { client, state }
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    /// `GET` with `select=<columns joined by ,>`.
    pub fn select<I, S>(mut self, columns: I) -> SelectBuilder<'c, T>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns = columns
            .into_iter()
            .map(|column| column.as_ref().to_owned())
            .collect::<Vec<_>>()
            .join(",");
        self.state.set_param("select", columns);
        self.state.set_method(Method::GET);
        SelectBuilder {
            inner: FilterBuilder {
                inner: QueryBuilder::new(self.client, self.state),
            },
        }
    }

    /// `POST` of `body`, asking for the inserted rows back.
    pub fn insert<B>(self, body: &B) -> QueryBuilder<'c, T>
    where
        B: Serialize + ?Sized,
    {
        self.with_body(Method::POST, RETURN_REPRESENTATION, body)
    }

    /// `POST` of `body`, merging rows that collide on the primary key.
    pub fn upsert<B>(self, body: &B) -> QueryBuilder<'c, T>
    where
        B: Serialize + ?Sized,
    {
        self.with_body(Method::POST, MERGE_DUPLICATES, body)
    }

    /// `PATCH` of `body` onto every row matched by the following filters.
    pub fn update<B>(self, body: &B) -> FilterBuilder<'c, T>
    where
        B: Serialize + ?Sized,
    {
        FilterBuilder {
            inner: self.with_body(Method::PATCH, RETURN_REPRESENTATION, body),
        }
    }

    /// `DELETE` of every row matched by the following filters.
    pub fn delete(mut self) -> FilterBuilder<'c, T> {
        self.state.set_method(Method::DELETE);
        FilterBuilder {
            inner: QueryBuilder::new(self.client, self.state),
        }
    }

    fn with_body<B>(mut self, method: Method, prefer: &str, body: &B) -> QueryBuilder<'c, T>
    where
        B: Serialize + ?Sized,
    {
        self.state.set_method(method);
        self.state.set_header(PREFER, prefer);
        self.state
            .set_body(serde_json::to_vec(body).map_err(|err| err.to_string()));
        QueryBuilder::new(self.client, self.state)
    }
}

/// Stage that can only be executed.
pub struct QueryBuilder<'c, T = ReqwestTransport> {
    client: &'c PostgrestClient<T>,
    state: RequestState,
}

impl<'c, T: Transport> QueryBuilder<'c, T> {
    pub(crate) fn new(client: &'c PostgrestClient<T>, state: RequestState) -> Self {
        Self { client, state }
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    /// Sends the request and decodes a 2xx payload into `R`.
    ///
    /// Returns `Ok(None)` for `204 No Content`. Non-2xx responses become
    /// [`PostgrestError::Api`](crate::PostgrestError::Api).
    pub async fn execute<R: DeserializeOwned>(self) -> Result<Option<R>> {
        executor::execute(self.client, self.state).await
    }

    /// Sends the request and only checks the status.
    pub async fn execute_discard(self) -> Result<()> {
        executor::execute_discard(self.client, self.state).await
    }

    /// Like [`execute`](Self::execute), aborting with
    /// [`PostgrestError::Cancelled`](crate::PostgrestError::Cancelled) if
    /// `signal` completes first.
    pub async fn execute_with_cancellation<R, F>(self, signal: F) -> Result<Option<R>>
    where
        R: DeserializeOwned,
        F: Future<Output = ()>,
    {
        executor::execute_with_cancellation(self.client, self.state, signal).await
    }

    /// Like [`execute_discard`](Self::execute_discard), aborting with
    /// [`PostgrestError::Cancelled`](crate::PostgrestError::Cancelled) if
    /// `signal` completes first.
    pub async fn execute_discard_with_cancellation<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        executor::execute_discard_with_cancellation(self.client, self.state, signal).await
    }
}

/// Stage for `update` and `delete`: filters, then execute.
pub struct FilterBuilder<'c, T = ReqwestTransport> {
    inner: QueryBuilder<'c, T>,
}

impl<'c, T: Transport> FilterBuilder<'c, T> {
    pub fn state(&self) -> &RequestState {
        self.inner.state()
    }

    pub async fn execute<R: DeserializeOwned>(self) -> Result<Option<R>> {
        self.inner.execute().await
    }

    pub async fn execute_discard(self) -> Result<()> {
        self.inner.execute_discard().await
    }

    pub async fn execute_with_cancellation<R, F>(self, signal: F) -> Result<Option<R>>
    where
        R: DeserializeOwned,
        F: Future<Output = ()>,
    {
        self.inner.execute_with_cancellation(signal).await
    }

    pub async fn execute_discard_with_cancellation<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.inner.execute_discard_with_cancellation(signal).await
    }
}

/// Stage for `select`: filters, pagination and single-object responses.
pub struct SelectBuilder<'c, T = ReqwestTransport> {
    inner: FilterBuilder<'c, T>,
}

impl<'c, T: Transport> SelectBuilder<'c, T> {
    pub fn state(&self) -> &RequestState {
        self.inner.state()
    }

    /// Requests `size` rows starting at the first one.
    pub fn limit(self, size: u64) -> Self {
        self.limit_with_offset(size, 0)
    }

    /// Requests `size` rows starting at row `start`.
    ///
    /// Sent as `Range-Unit: items` and the inclusive
    /// `Range: {start}-{start+size-1}`; a zero size yields an empty window
    /// such as `0--1`.
    pub fn limit_with_offset(mut self, size: u64, start: u64) -> Self {
        self.inner.inner.state.set_range(size, start);
        self
    }

    /// Asks the server for one object instead of an array.
    pub fn single(mut self) -> Self {
        self.inner.inner.state.set_header(ACCEPT, SINGLE_OBJECT);
        self
    }

    pub async fn execute<R: DeserializeOwned>(self) -> Result<Option<R>> {
        self.inner.execute().await
    }

    pub async fn execute_discard(self) -> Result<()> {
        self.inner.execute_discard().await
    }

    pub async fn execute_with_cancellation<R, F>(self, signal: F) -> Result<Option<R>>
    where
        R: DeserializeOwned,
        F: Future<Output = ()>,
    {
        self.inner.execute_with_cancellation(signal).await
    }

    pub async fn execute_discard_with_cancellation<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.inner.execute_discard_with_cancellation(signal).await
    }
}

impl<T> sealed::Stage for FilterBuilder<'_, T> {
    fn request_mut(&mut self) -> &mut RequestState {
        &mut self.inner.state
    }
}

impl<T> sealed::Stage for SelectBuilder<'_, T> {
    fn request_mut(&mut self) -> &mut RequestState {
        &mut self.inner.inner.state
    }
}

impl<T> Filterable for FilterBuilder<'_, T> {}

impl<T> Filterable for SelectBuilder<'_, T> {}

// Manual impls: a derive would demand `T: Clone`/`T: Debug` of the transport.

impl<T> Clone for RequestBuilder<'_, T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client,
            state: self.state.clone(),
        }
    }
}

impl<T> Clone for QueryBuilder<'_, T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client,
            state: self.state.clone(),
        }
    }
}

impl<T> Clone for FilterBuilder<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Clone for SelectBuilder<'_, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> fmt::Debug for RequestBuilder<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("state", &self.state)
            .finish()
    }
}

impl<T> fmt::Debug for QueryBuilder<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("state", &self.state)
            .finish()
    }
}

impl<T> fmt::Debug for FilterBuilder<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterBuilder")
            .field("state", &self.inner.state)
            .finish()
    }
}

impl<T> fmt::Debug for SelectBuilder<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectBuilder")
            .field("state", &self.inner.inner.state)
            .finish()
    }
}
