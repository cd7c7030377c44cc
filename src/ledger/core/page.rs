use serde::Serialize;

// ============================================================================
// Pagination Envelope
// ============================================================================

/// Pagination window
///
/// `limit = None` is the unbounded sentinel used to request the full result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LimitOffset {
    pub limit: Option<usize>,
    pub offset: usize,
}

impl LimitOffset {
    /// Every result, starting at the first
    pub const ALL: LimitOffset = LimitOffset { limit: None, offset: 0 };

    pub const fn new(limit: usize, offset: usize) -> Self {
        Self { limit: Some(limit), offset }
    }

    pub const fn unbounded(offset: usize) -> Self {
        Self { limit: None, offset }
    }

    pub fn is_unbounded(&self) -> bool {
        self.limit.is_none()
    }

    /// Skip `offset` items, then take up to `limit`
    pub fn window<T>(&self, items: Vec<T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

impl Default for LimitOffset {
    fn default() -> Self {
        Self::ALL
    }
}

/// Page invariant violations. These indicate a bug in the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    #[error("Page holds {returned} results but the applied limit is {limit}")]
    ResultsExceedLimit { returned: usize, limit: usize },

    #[error("Page total {total} is smaller than the {returned} results it holds")]
    TotalBelowReturned { total: usize, returned: usize },
}

/// One window of a result set plus the count ignoring pagination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    results: Vec<T>,
    total: usize,
    applied: LimitOffset,
}

impl<T> Page<T> {
    pub fn new(results: Vec<T>, total: usize, applied: LimitOffset) -> Result<Self, ConsistencyError> {
        if let Some(limit) = applied.limit {
            if results.len() > limit {
                return Err(ConsistencyError::ResultsExceedLimit {
                    returned: results.len(),
                    limit,
                });
            }
        }
        if total < results.len() {
            return Err(ConsistencyError::TotalBelowReturned {
                total,
                returned: results.len(),
            });
        }
        Ok(Self { results, total, applied })
    }

    pub fn results(&self) -> &[T] {
        &self.results
    }

    pub fn into_results(self) -> Vec<T> {
        self.results
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn applied(&self) -> LimitOffset {
        self.applied
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// One-to-one mapping; the invariants carry over unchanged.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            results: self.results.into_iter().map(f).collect(),
            total: self.total,
            applied: self.applied,
        }
    }
}
