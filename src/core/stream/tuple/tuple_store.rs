// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only ring of packed tuples shared by every query
//!
//! One writer, many readers. Appends serialize on the writer lock; readers
//! never take it. Each slot has its own `RwLock`, so a reader only contends
//! with the writer on the single slot being overwritten. The head position is
//! published with release ordering after the slot is filled.
//!
//! Positions are monotonic: `slot = position % capacity` and the slot records
//! the position it holds, so a reader holding an old reference detects that
//! its slot was reused and gets `StaleReference` instead of another tuple.

use super::cursor::QueryCursor;
use super::schema::{Schema, SchemaId};
use super::tuple_view::TupleView;
use crate::core::config::{ReclaimPolicy, StoreConfig};
use crate::core::error::{EventFluxError, EventFluxResult};
use crate::core::event::value::AttributeValue;
use crate::sql_compiler::catalog::CatalogLookup;
use crossbeam::utils::CachePadded;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Stable handle to an appended tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TupleRef {
    pub position: u64,
}

impl TupleRef {
    #[inline]
    pub const fn new(position: u64) -> Self {
        Self { position }
    }

    #[inline]
    pub fn slot(&self, capacity: usize) -> usize {
        (self.position % capacity as u64) as usize
    }
}

impl fmt::Display for TupleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.position)
    }
}

struct StoredTuple {
    position: u64,
    schema: Arc<Schema>,
    data: Arc<[u8]>,
}

struct WriterState {
    last_timestamp: i64,
}

/// Counters snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    pub appended: u64,
    /// Slots overwritten after the ring wrapped
    pub reclaimed: u64,
    /// Appends refused because the slot to overwrite was pinned
    pub rejected: u64,
    pub head: u64,
    pub oldest_retained: u64,
}

pub struct TupleStore {
    config: StoreConfig,
    schemas: Vec<Option<Arc<Schema>>>,
    slots: Box<[RwLock<Option<StoredTuple>>]>,
    writer: Mutex<WriterState>,
    /// Next position to write
    head: CachePadded<AtomicU64>,
    /// cursor id -> oldest position that cursor still needs
    pins: DashMap<u64, u64>,
    next_cursor_id: AtomicU64,
    appended: CachePadded<AtomicU64>,
    reclaimed: AtomicU64,
    rejected: AtomicU64,
}

impl fmt::Debug for TupleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TupleStore")
            .field("capacity", &self.config.capacity)
            .field("reclaim", &self.config.reclaim)
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("cursors", &self.pins.len())
            .finish()
    }
}

impl TupleStore {
    /// Create a store for every event type registered in `catalog`
    ///
    /// Event types registered later are unknown to this store.
    pub fn new(catalog: &dyn CatalogLookup, config: StoreConfig) -> Arc<Self> {
        let capacity = config.capacity.max(1);
        let schemas = (0..catalog.event_type_count() as SchemaId)
            .map(|id| catalog.event_type_by_id(id).and_then(|info| info.schema.clone()))
            .collect();
        let slots = (0..capacity)
            .map(|_| RwLock::new(None))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        log::debug!(
            "Tuple store created: {} slots, reclaim policy {:?}",
            capacity,
            config.reclaim
        );
        Arc::new(Self {
            config: StoreConfig {
                capacity,
                ..config
            },
            schemas,
            slots,
            writer: Mutex::new(WriterState {
                last_timestamp: i64::MIN,
            }),
            head: CachePadded::new(AtomicU64::new(0)),
            pins: DashMap::new(),
            next_cursor_id: AtomicU64::new(0),
            appended: CachePadded::new(AtomicU64::new(0)),
            reclaimed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Next position to be written
    #[inline]
    pub fn head(&self) -> u64 {
        self.head.load(Ordering::Acquire)
    }

    /// Oldest position that may still be readable
    #[inline]
    pub fn oldest_retained(&self) -> u64 {
        self.head().saturating_sub(self.config.capacity as u64)
    }

    pub fn schema_of(&self, schema_id: SchemaId) -> EventFluxResult<Arc<Schema>> {
        self.schemas
            .get(schema_id as usize)
            .and_then(|s| s.clone())
            .ok_or(EventFluxError::UnknownSchema(schema_id))
    }

    /// Append a tuple stamped with `timestamp` (event time, millis)
    pub fn append(
        &self,
        schema_id: SchemaId,
        timestamp: i64,
        values: &[AttributeValue],
    ) -> EventFluxResult<TupleRef> {
        let schema = self.schema_of(schema_id)?;
        let data: Arc<[u8]> = schema
            .encode(timestamp, chrono::Utc::now().timestamp_millis(), values)?
            .into();

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if timestamp < writer.last_timestamp {
            return Err(EventFluxError::OutOfOrderTimestamp {
                timestamp,
                last: writer.last_timestamp,
            });
        }

        let position = self.head.load(Ordering::Relaxed);
        let capacity = self.config.capacity as u64;
        if position >= capacity {
            let victim = position - capacity;
            if let Some(pinned) = self.min_pin() {
                if pinned <= victim {
                    match self.config.reclaim {
                        ReclaimPolicy::Reject => {
                            self.rejected.fetch_add(1, Ordering::Relaxed);
                            return Err(EventFluxError::Backpressure { position, pinned });
                        }
                        ReclaimPolicy::Overwrite => {
                            log::warn!(
                                "Overwriting tuple #{} still pinned by a cursor at #{}",
                                victim,
                                pinned
                            );
                        }
                    }
                }
            }
            self.reclaimed.fetch_add(1, Ordering::Relaxed);
        }

        let tuple_ref = TupleRef::new(position);
        {
            let mut slot = self.slots[tuple_ref.slot(self.config.capacity)]
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *slot = Some(StoredTuple {
                position,
                schema,
                data,
            });
        }
        self.head.store(position + 1, Ordering::Release);
        writer.last_timestamp = timestamp;
        self.appended.fetch_add(1, Ordering::Relaxed);
        Ok(tuple_ref)
    }

    /// Append stamped with the current wall-clock time
    pub fn append_now(
        &self,
        schema_id: SchemaId,
        values: &[AttributeValue],
    ) -> EventFluxResult<TupleRef> {
        self.append(schema_id, chrono::Utc::now().timestamp_millis(), values)
    }

    /// Zero-copy read
    pub fn read(&self, tuple_ref: TupleRef) -> EventFluxResult<TupleView> {
        let head = self.head();
        if tuple_ref.position >= head {
            return Err(EventFluxError::TupleNotWritten {
                position: tuple_ref.position,
                head,
            });
        }
        let slot = self.slots[tuple_ref.slot(self.config.capacity)]
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(stored) if stored.position == tuple_ref.position => Ok(TupleView::from_encoded(
                stored.position,
                Arc::clone(&stored.schema),
                Arc::clone(&stored.data),
            )),
            _ => Err(EventFluxError::StaleReference {
                position: tuple_ref.position,
                oldest_retained: self.oldest_retained(),
            }),
        }
    }

    /// Cursor starting at the current head
    pub fn open_cursor(self: &Arc<Self>) -> QueryCursor {
        let head = self.head();
        self.open_cursor_at(head)
    }

    /// Cursor starting at `position`, pinned there until its owner moves the pin
    pub fn open_cursor_at(self: &Arc<Self>, position: u64) -> QueryCursor {
        let id = self.next_cursor_id.fetch_add(1, Ordering::Relaxed);
        self.pins.insert(id, position);
        QueryCursor::new(Arc::clone(self), id, position)
    }

    pub(crate) fn pin(&self, cursor_id: u64, position: u64) {
        self.pins.insert(cursor_id, position);
    }

    pub(crate) fn unpin(&self, cursor_id: u64) {
        self.pins.remove(&cursor_id);
    }

    fn min_pin(&self) -> Option<u64> {
        self.pins.iter().map(|entry| *entry.value()).min()
    }

    pub fn cursor_count(&self) -> usize {
        self.pins.len()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            appended: self.appended.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            head: self.head(),
            oldest_retained: self.oldest_retained(),
        }
    }
}
