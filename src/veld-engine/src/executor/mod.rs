//! The event-loop executor.
//!
//! The engine owns the source store and the computation graph, and runs
//! one combined pass over the source that materializes every pending
//! action. The row range is partitioned into contiguous tasks; each of
//! the `S` workers exclusively owns one slot's state and pulls tasks from
//! a shared cursor, so the per-row hot path is lock-free. Per-slot
//! results are merged in ascending slot order when all tasks finish.

mod slot;

pub(crate) use slot::SlotState;

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use common_config::ExecutionConfig;
use common_error::{VeldError, VeldResult};
use veld_storage::ColumnStore;

use crate::expr::ExpressionCompiler;
use crate::graph::{Graph, Node};
use crate::ops::ActionPartial;

pub(crate) struct Engine {
    store: Arc<dyn ColumnStore>,
    config: ExecutionConfig,
    compiler: Arc<dyn ExpressionCompiler>,
    graph: RwLock<Graph>,
    running: AtomicBool,
}

impl Engine {
    pub(crate) fn new(
        store: Arc<dyn ColumnStore>,
        config: ExecutionConfig,
        compiler: Arc<dyn ExpressionCompiler>,
    ) -> Self {
        let graph = Graph::new(
            store.schema().clone(),
            store.default_columns().to_vec(),
        );
        Self {
            store,
            config,
            compiler,
            graph: RwLock::new(graph),
            running: AtomicBool::new(false),
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn ColumnStore> {
        &self.store
    }

    pub(crate) fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub(crate) fn compiler(&self) -> &Arc<dyn ExpressionCompiler> {
        &self.compiler
    }

    /// Mutate the graph through a booking operation.
    ///
    /// Rejected while the event loop is running: the graph is read-only
    /// from the moment a terminal action starts executing.
    pub(crate) fn book<R>(&self, op: impl FnOnce(&mut Graph) -> VeldResult<R>) -> VeldResult<R> {
        if self.running.load(Ordering::Acquire) {
            return Err(VeldError::unsupported(
                "the graph is read-only while the event loop is running",
            ));
        }
        op(&mut self.graph.write())
    }

    pub(crate) fn read_graph<R>(&self, op: impl FnOnce(&Graph) -> R) -> R {
        op(&self.graph.read())
    }

    pub(crate) fn has_run(&self) -> bool {
        self.graph.read().has_run
    }

    /// Run the event loop, materializing every pending action.
    pub(crate) fn run(&self) -> VeldResult<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(VeldError::execution("the event loop is already running"));
        }
        let result = self.run_locked();
        self.running.store(false, Ordering::Release);
        result
    }

    fn run_locked(&self) -> VeldResult<()> {
        let mut graph = self.graph.write();
        let graph = &mut *graph;
        let pending = graph.pending_actions();
        if pending.is_empty() {
            graph.has_run = true;
            return Ok(());
        }

        let n_rows = self.store.row_count();
        let n_slots = if graph.has_range() {
            1
        } else {
            self.config.resolved_slots().max(1)
        };
        let tasks = partition(n_rows, n_slots, self.config.chunk_rows, graph.has_range());
        debug!(
            rows = n_rows,
            slots = n_slots,
            tasks = tasks.len(),
            actions = pending.len(),
            "starting event loop"
        );
        let started = Instant::now();

        let mut slots = (0..n_slots)
            .map(|slot| SlotState::new(slot, graph, &pending, self.store.as_ref()))
            .collect::<VeldResult<Vec<_>>>()?;

        let cursor = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);
        if n_slots == 1 {
            run_worker(graph, &mut slots[0], &tasks, &cursor, &stop, &pending)?;
        } else {
            let shared: &Graph = graph;
            let failure: Mutex<Option<VeldError>> = Mutex::new(None);
            std::thread::scope(|scope| {
                for state in &mut slots {
                    let (cursor, stop, failure) = (&cursor, &stop, &failure);
                    let (tasks, pending) = (&tasks, &pending);
                    scope.spawn(move || {
                        if let Err(err) =
                            run_worker(shared, state, tasks, cursor, stop, pending)
                        {
                            stop.store(true, Ordering::Release);
                            failure.lock().get_or_insert(err);
                        }
                    });
                }
            });
            if let Some(err) = failure.into_inner() {
                return Err(err);
            }
        }

        // Merge in ascending slot order: counters into the graph nodes,
        // partials into each action's final result.
        let mut per_action: Vec<Vec<Box<dyn ActionPartial>>> =
            (0..pending.len()).map(|_| Vec::with_capacity(n_slots)).collect();
        let mut filter_counts = vec![(0u64, 0u64); graph.n_filters];
        for state in slots {
            for (cache_idx, cache) in state.filters.iter().enumerate() {
                filter_counts[cache_idx].0 += cache.passed;
                filter_counts[cache_idx].1 += cache.total;
            }
            for (i, partial) in state.partials.into_iter().enumerate() {
                per_action[i].push(partial);
            }
        }
        for node in &mut graph.nodes {
            if let Node::Filter(filter) = node {
                let (passed, total) = filter_counts[filter.cache_idx];
                filter.passed += passed;
                filter.total += total;
            }
        }
        for (i, &aid) in pending.iter().enumerate() {
            let action = &mut graph.actions[aid];
            action.def.finalize(std::mem::take(&mut per_action[i]))?;
            action.executed = true;
        }
        graph.has_run = true;
        debug!(elapsed = ?started.elapsed(), "event loop finished");
        Ok(())
    }
}

/// Process tasks until the cursor runs dry or the stop flag is raised.
fn run_worker(
    graph: &Graph,
    state: &mut SlotState,
    tasks: &[Range<u64>],
    cursor: &AtomicUsize,
    stop: &AtomicBool,
    pending: &[usize],
) -> VeldResult<()> {
    let slot = state.slot;
    loop {
        if stop.load(Ordering::Acquire) {
            return Ok(());
        }
        let next = cursor.fetch_add(1, Ordering::Relaxed);
        let Some(task) = tasks.get(next) else {
            return Ok(());
        };
        state.begin_task();
        for row in task.clone() {
            for (i, &aid) in pending.iter().enumerate() {
                let action = &graph.actions[aid];
                if slot::pass_gates(graph, action.parent, row, state, stop)? {
                    let values = slot::resolve_inputs(graph, &action.inputs, row, state)?;
                    state.partials[i].exec(slot, row, &values)?;
                }
            }
        }
    }
}

/// Split `[0, n_rows)` into contiguous tasks.
///
/// Coarse tasks (about two per slot) amortize per-task setup; when a
/// range gate is present, tasks are capped so its early-termination
/// signal is honored promptly.
fn partition(n_rows: u64, n_slots: usize, chunk_rows: u64, fine: bool) -> Vec<Range<u64>> {
    if n_rows == 0 {
        return Vec::new();
    }
    let mut chunk = if chunk_rows > 0 {
        chunk_rows
    } else {
        (n_rows / (n_slots as u64 * 2)).max(1)
    };
    if fine && chunk_rows == 0 {
        chunk = chunk.min(1024);
    }
    let mut tasks = Vec::new();
    let mut start = 0;
    while start < n_rows {
        let end = (start + chunk).min(n_rows);
        tasks.push(start..end);
        start = end;
    }
    tasks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_covers_range() {
        for (n_rows, n_slots) in [(1000u64, 1usize), (1000, 4), (7, 3), (1, 1)] {
            let tasks = partition(n_rows, n_slots, 0, false);
            assert_eq!(tasks.first().unwrap().start, 0);
            assert_eq!(tasks.last().unwrap().end, n_rows);
            for pair in tasks.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition(0, 4, 0, false).is_empty());
    }

    #[test]
    fn test_partition_respects_chunk_override() {
        let tasks = partition(100, 1, 10, false);
        assert_eq!(tasks.len(), 10);
        assert!(tasks.iter().all(|t| t.end - t.start == 10));
    }

    #[test]
    fn test_partition_fine_with_ranges() {
        let tasks = partition(1_000_000, 1, 0, true);
        assert!(tasks.iter().all(|t| t.end - t.start <= 1024));
    }
}
