//! Per-slot state and per-row evaluation.
//!
//! Every worker owns one [`SlotState`] outright for the duration of the
//! event loop, so nothing here needs synchronization. Filter verdicts and
//! derived values are cached per row through a one-row cache (`row`
//! sentinel + payload): within a row each gate is evaluated at most once
//! no matter how many actions share it, and the caches invalidate
//! themselves when the worker moves to the next row.

use std::sync::atomic::{AtomicBool, Ordering};

use common_error::{VeldError, VeldResult};
use veld_core::Value;
use veld_storage::{ColumnReader, ColumnStore};

use crate::graph::{ColumnSource, Graph, Node, NodeId};
use crate::ops::ActionPartial;

/// Row sentinel meaning "not evaluated yet".
const NO_ROW: u64 = u64::MAX;

pub(crate) struct FilterSlot {
    row: u64,
    verdict: bool,
    pub passed: u64,
    pub total: u64,
}

pub(crate) struct DefineSlot {
    row: u64,
    value: Option<Value>,
}

pub(crate) struct RangeSlot {
    row: u64,
    admit: bool,
    /// Rows that reached this gate so far; persists across tasks.
    seen: u64,
    terminal: bool,
}

/// All mutable state one worker needs: gate caches, bound readers and the
/// action partials for this slot.
pub(crate) struct SlotState {
    pub slot: usize,
    pub filters: Vec<FilterSlot>,
    pub defines: Vec<DefineSlot>,
    pub ranges: Vec<RangeSlot>,
    pub readers: Vec<Box<dyn ColumnReader>>,
    /// One partial per pending action, in pending order.
    pub partials: Vec<Box<dyn ActionPartial>>,
}

impl SlotState {
    pub(crate) fn new(
        slot: usize,
        graph: &Graph,
        pending: &[usize],
        store: &dyn ColumnStore,
    ) -> VeldResult<Self> {
        let readers = graph
            .reader_specs
            .iter()
            .map(|name| store.reader(name))
            .collect::<VeldResult<Vec<_>>>()?;
        let partials = pending
            .iter()
            .map(|&aid| graph.actions[aid].def.make_partial())
            .collect();
        Ok(Self {
            slot,
            filters: (0..graph.n_filters)
                .map(|_| FilterSlot {
                    row: NO_ROW,
                    verdict: false,
                    passed: 0,
                    total: 0,
                })
                .collect(),
            defines: (0..graph.n_defines)
                .map(|_| DefineSlot {
                    row: NO_ROW,
                    value: None,
                })
                .collect(),
            ranges: (0..graph.n_ranges)
                .map(|_| RangeSlot {
                    row: NO_ROW,
                    admit: false,
                    seen: 0,
                    terminal: false,
                })
                .collect(),
            readers,
            partials,
        })
    }

    /// Reset the one-row caches. Counters, range progress and action
    /// partials carry over to the next task on this slot.
    pub(crate) fn begin_task(&mut self) {
        for cache in &mut self.filters {
            cache.row = NO_ROW;
        }
        for cache in &mut self.defines {
            cache.row = NO_ROW;
        }
        for cache in &mut self.ranges {
            cache.row = NO_ROW;
        }
    }
}

/// Evaluate the gate chain from `node` up to the source for `row`.
///
/// Filters short-circuit: once any gate on the path rejects the row, no
/// further predicate or derived column on that path is evaluated. A range
/// gate that exhausts its `stop` bound raises the shared stop flag.
pub(crate) fn pass_gates(
    graph: &Graph,
    node: NodeId,
    row: u64,
    state: &mut SlotState,
    stop: &AtomicBool,
) -> VeldResult<bool> {
    match graph.node(node) {
        Node::Source { .. } => Ok(true),
        Node::Define(define) => pass_gates(graph, define.parent, row, state, stop),
        Node::Filter(filter) => {
            if state.filters[filter.cache_idx].row == row {
                return Ok(state.filters[filter.cache_idx].verdict);
            }
            let verdict = if pass_gates(graph, filter.parent, row, state, stop)? {
                let values = resolve_inputs(graph, &filter.inputs, row, state)?;
                let pass = (filter.predicate.func)(&values)?;
                let cache = &mut state.filters[filter.cache_idx];
                cache.total += 1;
                if pass {
                    cache.passed += 1;
                }
                pass
            } else {
                false
            };
            let cache = &mut state.filters[filter.cache_idx];
            cache.row = row;
            cache.verdict = verdict;
            Ok(verdict)
        }
        Node::Range(range) => {
            if state.ranges[range.cache_idx].row == row {
                return Ok(state.ranges[range.cache_idx].admit);
            }
            let cache_idx = range.cache_idx;
            let admit = if state.ranges[cache_idx].terminal {
                false
            } else if pass_gates(graph, range.parent, row, state, stop)? {
                let cache = &mut state.ranges[cache_idx];
                let index = cache.seen;
                cache.seen += 1;
                if range.stop != 0 && cache.seen >= range.stop {
                    cache.terminal = true;
                    stop.store(true, Ordering::Release);
                }
                index >= range.start
                    && (range.stop == 0 || index < range.stop)
                    && (index - range.start) % range.stride == 0
            } else {
                false
            };
            let cache = &mut state.ranges[cache_idx];
            cache.row = row;
            cache.admit = admit;
            Ok(admit)
        }
    }
}

/// Resolve a consumer's input columns for `row`, computing and memoizing
/// derived columns on demand.
pub(crate) fn resolve_inputs(
    graph: &Graph,
    inputs: &[ColumnSource],
    row: u64,
    state: &mut SlotState,
) -> VeldResult<Vec<Value>> {
    inputs
        .iter()
        .map(|source| resolve_source(graph, source, row, state))
        .collect()
}

fn resolve_source(
    graph: &Graph,
    source: &ColumnSource,
    row: u64,
    state: &mut SlotState,
) -> VeldResult<Value> {
    match source {
        ColumnSource::Reader { spec } => Ok(state.readers[*spec].read(state.slot, row)),
        ColumnSource::Derived { node } => {
            let Node::Define(define) = graph.node(*node) else {
                return Err(VeldError::internal("derived source points at a non-define"));
            };
            if state.defines[define.cache_idx].row == row {
                if let Some(value) = &state.defines[define.cache_idx].value {
                    return Ok(value.clone());
                }
            }
            let values = resolve_inputs(graph, &define.inputs, row, state)?;
            let value = (define.producer.func)(&values)?;
            let cache = &mut state.defines[define.cache_idx];
            cache.row = row;
            cache.value = Some(value.clone());
            Ok(value)
        }
    }
}
