//! Response and pagination data types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decoded body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Success with no content
    Empty,
    /// Opaque binary payload passed through untouched
    Binary(Vec<u8>),
    /// Tabular text payload
    Text(String),
    /// Structured payload
    Json(Value),
}

impl ResponseBody {
    /// True for a success without content.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The structured payload, if any.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Number of records this body contributes to a paginated result.
    pub fn record_count(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Json(Value::Array(items)) => items.len(),
            _ => 1,
        }
    }

    /// Flatten into page records.
    ///
    /// Arrays contribute their items; any other body is one opaque record.
    pub fn into_records(self) -> Vec<Value> {
        match self {
            Self::Empty => Vec::new(),
            Self::Json(Value::Array(items)) => items,
            Self::Json(value) => vec![value],
            Self::Text(text) => vec![Value::String(text)],
            Self::Binary(bytes) => vec![Value::Array(bytes.into_iter().map(Value::from).collect())],
        }
    }
}

/// How a call is driven by the pagination orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FetchMode {
    /// One request, result returned as-is
    #[default]
    Single,
    /// Page-by-page on the caller's task
    Sequential,
    /// Page 0 first, remaining pages fanned out to a bounded worker pool
    Concurrent { workers: usize },
}

impl FetchMode {
    /// Whether the call is split into pages.
    pub fn is_paginated(&self) -> bool {
        !matches!(self, Self::Single)
    }
}

/// One slice of a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    /// Index of the first record.
    pub offset: u64,
    /// Maximum records per page.
    pub limit: u64,
}

impl PageRequest {
    /// Page of `limit` records starting at `offset`.
    pub fn new(offset: u64, limit: u64) -> Self {
        Self { offset, limit }
    }

    /// The page right after this one, or `None` once the offset would overflow.
    pub fn next_page(self) -> Option<Self> {
        self.offset.checked_add(self.limit).map(|offset| Self { offset, limit: self.limit })
    }

    /// Number of pages after the first needed to cover `total` records.
    pub fn remaining_pages(limit: u64, total: u64) -> u64 {
        if limit == 0 || total <= limit {
            0
        } else {
            (total - 1) / limit
        }
    }

    /// Offsets of every page after the first, in ascending order.
    ///
    /// Offsets are produced lazily, so a huge `total` costs nothing until
    /// pages are actually claimed. Empty when the first page already covers
    /// `total`.
    pub fn remaining_offsets(limit: u64, total: u64) -> RemainingOffsets {
        RemainingOffsets { next: (limit > 0).then_some(limit), limit, total }
    }
}

/// Lazy iterator over `limit, 2 * limit, ...` below a total.
///
/// Stops instead of wrapping when the next offset would overflow `u64`.
#[derive(Debug, Clone)]
pub struct RemainingOffsets {
    next: Option<u64>,
    limit: u64,
    total: u64,
}

impl Iterator for RemainingOffsets {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let offset = self.next.filter(|offset| *offset < self.total)?;
        self.next = offset.checked_add(self.limit);
        Some(offset)
    }
}
