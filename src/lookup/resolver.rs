//! Paginated Resolver
//!
//! Maps a name-or-id request to a single concrete record. Collections are
//! reachable only through a cursor-paginated list call and a direct get; the
//! resolver drives them and never buffers more than one page.

use super::error::LookupError;
use crate::ibm::http::RemoteError;
use futures::stream::{self, Stream, TryStreamExt};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use tokio::sync::watch;
use tokio::time::{Duration, Instant};

/// A remote entity with a stable id and a user-assigned name
pub trait Named {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
}

/// One batch of records plus the continuation cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub records: Vec<T>,
    /// `None` when no further pages exist
    pub next: Option<String>,
}

impl<T> Page<T> {
    /// Build a page, treating an empty cursor as the end of the listing
    pub fn new(records: Vec<T>, next: Option<String>) -> Self {
        Self {
            records,
            next: next.filter(|cursor| !cursor.is_empty()),
        }
    }

    /// Final page of a listing
    pub fn last(records: Vec<T>) -> Self {
        Self::new(records, None)
    }
}

/// A remote collection that can be listed page by page or fetched by id
#[allow(async_fn_in_trait)]
pub trait Collection {
    type Record: Named;

    /// Human-readable entity type used in errors and logs
    const ENTITY: &'static str;

    /// Fetch one page. `None` requests the first page.
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<Self::Record>, RemoteError>;

    async fn fetch_by_id(&self, id: &str) -> Result<Self::Record, RemoteError>;
}

/// How the caller identified the record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Id(String),
    Name(String),
}

impl Lookup {
    /// Build a lookup from an id/name argument pair.
    ///
    /// Empty strings count as unset. Exactly one of the two must be present,
    /// otherwise `AmbiguousInput` names both argument fields.
    pub fn exactly_one_of(
        entity: &'static str,
        fields: (&str, &str),
        id: Option<&str>,
        name: Option<&str>,
    ) -> Result<Self, LookupError> {
        let id = id.filter(|s| !s.is_empty());
        let name = name.filter(|s| !s.is_empty());

        match (id, name) {
            (Some(id), None) => Ok(Lookup::Id(id.to_string())),
            (None, Some(name)) => Ok(Lookup::Name(name.to_string())),
            _ => Err(LookupError::AmbiguousInput {
                entity,
                fields: format!("{}, {}", fields.0, fields.1),
            }),
        }
    }

    /// The id or name being searched for
    pub fn key(&self) -> &str {
        match self {
            Lookup::Id(key) | Lookup::Name(key) => key,
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lookup::Id(id) => write!(f, "id {}", id),
            Lookup::Name(name) => write!(f, "name '{}'", name),
        }
    }
}

/// Signals cancellation to every context cloned from the one it was made with
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Per-call deadline and cancellation, supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct LookupContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

impl LookupContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach a cancellation signal and return the handle that trips it
    pub fn cancellable(mut self) -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        self.cancel = Some(rx);
        (self, CancelHandle { tx })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Run one remote call, racing it against the deadline and cancel signal.
    ///
    /// A call is never issued once the context is already cancelled.
    async fn run<T, F>(
        &self,
        entity: &'static str,
        operation: &'static str,
        call: F,
    ) -> Result<T, LookupError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        if self.is_cancelled() {
            return Err(LookupError::Cancelled { entity, operation });
        }

        let mut cancel = self.cancel.clone();
        let cancelled = async move {
            match cancel.as_mut() {
                Some(rx) => {
                    // A dropped handle can no longer cancel
                    if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = call => result.map_err(|source| LookupError::Remote {
                entity,
                operation,
                source,
            }),
            _ = cancelled => {
                tracing::debug!("{} {} cancelled by caller", entity, operation);
                Err(LookupError::Cancelled { entity, operation })
            }
            _ = deadline => {
                tracing::debug!("{} {} hit deadline", entity, operation);
                Err(LookupError::Cancelled { entity, operation })
            }
        }
    }
}

/// Position in a paginated listing
#[derive(Debug, Default)]
struct PageCursor {
    next: Option<String>,
    seen: HashSet<String>,
    exhausted: bool,
}

impl PageCursor {
    fn advance(&mut self, entity: &str, next: Option<String>) {
        match next.filter(|cursor| !cursor.is_empty()) {
            Some(next) if self.seen.insert(next.clone()) => self.next = Some(next),
            Some(next) => {
                tracing::warn!("{} listing repeated cursor {}, stopping", entity, next);
                self.exhausted = true;
            }
            None => self.exhausted = true,
        }
    }
}

async fn next_page<C: Collection>(
    ctx: &LookupContext,
    collection: &C,
    mut cursor: PageCursor,
) -> Result<Option<(Vec<C::Record>, PageCursor)>, LookupError> {
    if cursor.exhausted {
        return Ok(None);
    }

    tracing::debug!("Listing {} (cursor: {:?})", C::ENTITY, cursor.next);
    let page = ctx
        .run(C::ENTITY, "list", collection.fetch_page(cursor.next.as_deref()))
        .await?;
    cursor.advance(C::ENTITY, page.next);

    Ok(Some((page.records, cursor)))
}

/// Resolve a record by id (one direct get) or by name (paginated scan).
pub async fn resolve<C: Collection>(
    ctx: &LookupContext,
    collection: &C,
    lookup: &Lookup,
) -> Result<C::Record, LookupError> {
    if lookup.key().is_empty() {
        return Err(LookupError::AmbiguousInput {
            entity: C::ENTITY,
            fields: "id, name".to_string(),
        });
    }

    match lookup {
        Lookup::Id(id) => {
            tracing::debug!("Resolving {} by id {}", C::ENTITY, id);
            ctx.run(C::ENTITY, "get", collection.fetch_by_id(id)).await
        }
        Lookup::Name(name) => find_by_name(ctx, collection, name).await,
    }
}

/// Scan pages in API order and return the first record named `name`.
///
/// Names are compared exactly. Duplicates are not reported; the earliest one
/// wins.
pub async fn find_by_name<C: Collection>(
    ctx: &LookupContext,
    collection: &C,
    name: &str,
) -> Result<C::Record, LookupError> {
    let mut cursor = PageCursor::default();
    let mut pages = 0usize;

    while let Some((records, next)) = next_page(ctx, collection, cursor).await? {
        pages += 1;
        if let Some(found) = records.into_iter().find(|record| record.name() == name) {
            tracing::info!(
                "Resolved {} '{}' to {} after {} page(s)",
                C::ENTITY,
                name,
                found.id(),
                pages
            );
            return Ok(found);
        }
        cursor = next;
    }

    tracing::debug!("{} '{}' not found in {} page(s)", C::ENTITY, name, pages);
    Err(LookupError::NotFound {
        entity: C::ENTITY,
        key: name.to_string(),
    })
}

/// Stream every record of a collection, page by page
pub fn list_all<'a, C>(
    ctx: &'a LookupContext,
    collection: &'a C,
) -> impl Stream<Item = Result<C::Record, LookupError>> + 'a
where
    C: Collection,
    C::Record: 'a,
{
    stream::try_unfold(PageCursor::default(), move |cursor| {
        next_page(ctx, collection, cursor)
    })
    .map_ok(|records| stream::iter(records.into_iter().map(Ok::<C::Record, LookupError>)))
    .try_flatten()
}
