//! Offset-based paging.

/// An offset/limit window over a newest-first listing.
///
/// The limit is clamped to `1..=MAX_LIMIT` so a client cannot ask the store
/// for an unbounded result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    offset: u32,
    limit: u32,
}

impl Page {
    /// Limit used when the client does not send one.
    pub const DEFAULT_LIMIT: u32 = 20;
    /// Largest limit honoured.
    pub const MAX_LIMIT: u32 = 100;

    /// Build a page from optional query parameters.
    #[must_use]
    pub fn new(offset: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            offset: offset.unwrap_or(0),
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
        }
    }

    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u32 {
        self.offset
    }

    /// Maximum number of rows to return.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Apply this window to an in-memory slice.
    #[must_use]
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = usize::try_from(self.offset)
            .unwrap_or(usize::MAX)
            .min(items.len());
        let end = start
            .saturating_add(usize::try_from(self.limit).unwrap_or(usize::MAX))
            .min(items.len());
        items.get(start..end).unwrap_or_default()
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}
