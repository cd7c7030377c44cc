use crate::ledger::{LimitOffset, SortOrder, UpdateType};

/// Page size of the global feed when the caller names none
pub const DEFAULT_LIMIT: usize = 100;

/// Every option an update request can carry, with its default filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateQueryParams {
    pub update_type: UpdateType,
    pub from: Option<String>,
    pub to: Option<String>,
    pub detail: bool,
    pub order: SortOrder,
    pub limit_offset: LimitOffset,
}

impl Default for UpdateQueryParams {
    fn default() -> Self {
        Self::for_global_feed()
    }
}

impl UpdateQueryParams {
    /// Published tokens, newest first, 100 per page
    pub fn for_global_feed() -> Self {
        Self {
            update_type: UpdateType::Published,
            from: None,
            to: None,
            detail: false,
            order: SortOrder::Desc,
            limit_offset: LimitOffset::new(DEFAULT_LIMIT, 0),
        }
    }

    /// Published digests, newest first, unbounded
    pub fn for_entity_feed() -> Self {
        Self {
            detail: true,
            limit_offset: LimitOffset::ALL,
            ..Self::for_global_feed()
        }
    }

    pub fn with_range(mut self, from: Option<String>, to: Option<String>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn with_update_type(mut self, update_type: UpdateType) -> Self {
        self.update_type = update_type;
        self
    }

    pub fn with_detail(mut self, detail: bool) -> Self {
        self.detail = detail;
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_limit_offset(mut self, limit_offset: LimitOffset) -> Self {
        self.limit_offset = limit_offset;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_feed_defaults() {
        let params = UpdateQueryParams::default();

        assert_eq!(params.update_type, UpdateType::Published);
        assert_eq!(params.order, SortOrder::Desc);
        assert_eq!(params.limit_offset, LimitOffset::new(100, 0));
        assert!(!params.detail);
        assert!(params.from.is_none() && params.to.is_none());
    }

    #[test]
    fn test_entity_feed_is_unbounded() {
        let params = UpdateQueryParams::for_entity_feed();

        assert_eq!(params.limit_offset, LimitOffset::ALL);
        assert_eq!(params.order, SortOrder::Desc);
    }
}
