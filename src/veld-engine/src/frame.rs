//! The public builder surface: [`DataFrame`] and [`Frame`].

use std::path::Path;
use std::sync::{Arc, Weak};

use common_config::ExecutionConfig;
use common_error::{ensure, VeldError, VeldResult};
use veld_core::{
    ColumnInfo, DataType, Fillable, FromValue, Hist1D, Hist2D, Hist3D, Profile1D, Profile2D,
};
use veld_storage::ColumnStore;

use crate::executor::Engine;
use crate::expr::{ExprKind, ExpressionCompiler, NativeCompiler};
use crate::graph::{NodeId, SOURCE};
use crate::ops::{
    CountDef, FillDef, ForeachDef, MaxDef, MeanDef, MinDef, ReduceDef, SnapshotDef, TakeDef,
};
use crate::report::{FilterStats, Report};
use crate::result::{ResultCell, ResultHandle};
use crate::row_fn::{
    ErasedCallback, ErasedPredicate, ErasedProducer, IntoRowCallback, IntoRowMap,
    IntoRowPredicate, IntoSlotCallback,
};

/// A lazy, declarative view over a columnar store.
///
/// `DataFrame` owns the engine; [`Frame`] handles returned by the graph
/// builders keep it only weakly, so results and child frames expire when
/// the `DataFrame` goes out of scope.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use veld_engine::DataFrame;
/// # use veld_storage::ColumnStore;
/// # fn demo(store: Arc<dyn ColumnStore>) -> common_error::VeldResult<()> {
/// let df = DataFrame::new(store);
/// let even = df.filter(|x: i64| x % 2 == 0, &["x"])?;
/// let count = even.count()?;
/// let sum = even.reduce(|a: i64, b: i64| a + b, "x")?;
/// // One event loop materializes both results.
/// println!("{} rows, sum {}", count.get()?, sum.get()?);
/// # Ok(())
/// # }
/// ```
pub struct DataFrame {
    engine: Arc<Engine>,
    root: Frame,
}

impl std::fmt::Debug for DataFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFrame").field("root", &self.root).finish()
    }
}

impl DataFrame {
    /// Create a sequential data frame over `store`.
    pub fn new(store: Arc<dyn ColumnStore>) -> Self {
        Self::with_config(store, ExecutionConfig::default())
    }

    /// Create a data frame with an explicit execution configuration.
    pub fn with_config(store: Arc<dyn ColumnStore>, config: ExecutionConfig) -> Self {
        Self::with_compiler(store, config, Arc::new(NativeCompiler))
    }

    /// Create a data frame with a custom expression compiler.
    pub fn with_compiler(
        store: Arc<dyn ColumnStore>,
        config: ExecutionConfig,
        compiler: Arc<dyn ExpressionCompiler>,
    ) -> Self {
        let engine = Arc::new(Engine::new(store, config, compiler));
        let root = Frame {
            engine: Arc::downgrade(&engine),
            node: SOURCE,
        };
        Self { engine, root }
    }

    /// The frame rooted at the source.
    pub fn root(&self) -> Frame {
        self.root.clone()
    }

    /// Number of rows in the source store.
    pub fn row_count(&self) -> u64 {
        self.engine.store().row_count()
    }
}

impl std::ops::Deref for DataFrame {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.root
    }
}

/// A handle to one node of the computation graph.
///
/// Every transformation appends a node and returns the frame for it, so
/// chained calls extend that branch while the original frame can keep
/// growing siblings.
#[derive(Clone)]
pub struct Frame {
    engine: Weak<Engine>,
    node: NodeId,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame").field("node", &self.node).finish()
    }
}

impl Frame {
    /// Get the engine if the owning `DataFrame` is still alive.
    fn engine(&self) -> VeldResult<Arc<Engine>> {
        self.engine.upgrade().ok_or(VeldError::EngineGone)
    }

    fn child(&self, node: NodeId) -> Frame {
        Frame {
            engine: self.engine.clone(),
            node,
        }
    }

    // ------------------------------------------------------------------
    // Transformations
    // ------------------------------------------------------------------

    /// Append a filter.
    ///
    /// The predicate must return `bool`; its arity decides how many
    /// columns it reads. Empty or missing column names are completed from
    /// the source's default column list. The predicate is evaluated at
    /// most once per row and slot; downstream work is skipped for rows it
    /// rejects.
    pub fn filter<Args>(
        &self,
        predicate: impl IntoRowPredicate<Args>,
        columns: &[&str],
    ) -> VeldResult<Frame> {
        self.filter_erased(None, predicate.into_predicate(), columns)
    }

    /// Append a filter that shows up in [`report`](Self::report) under
    /// `name`. An empty name disables reporting; a non-empty name must be
    /// unique along this branch.
    pub fn filter_named<Args>(
        &self,
        name: &str,
        predicate: impl IntoRowPredicate<Args>,
        columns: &[&str],
    ) -> VeldResult<Frame> {
        let name = (!name.is_empty()).then(|| name.to_string());
        self.filter_erased(name, predicate.into_predicate(), columns)
    }

    fn filter_erased(
        &self,
        name: Option<String>,
        predicate: ErasedPredicate,
        columns: &[&str],
    ) -> VeldResult<Frame> {
        let engine = self.engine()?;
        let node = engine.book(|graph| {
            let columns = graph.complete_columns(columns, predicate.arg_types.len())?;
            graph.book_filter(self.node, name, predicate, columns)
        })?;
        Ok(self.child(node))
    }

    /// Append a filter from a textual expression, e.g. `"x % 2 = 0"`.
    ///
    /// The expression is compiled against the columns visible here; the
    /// resulting node behaves exactly like the callable form.
    pub fn filter_expr(&self, expression: &str) -> VeldResult<Frame> {
        self.filter_expr_named("", expression)
    }

    /// Named variant of [`filter_expr`](Self::filter_expr).
    pub fn filter_expr_named(&self, name: &str, expression: &str) -> VeldResult<Frame> {
        let engine = self.engine()?;
        let visible = engine.read_graph(|graph| graph.visible_schema(self.node));
        let compiled = engine
            .compiler()
            .compile(expression, &visible, ExprKind::Filter)?;
        let arg_types = compiled
            .columns
            .iter()
            .map(|column| {
                visible.dtype(column).ok_or_else(|| {
                    VeldError::expression(format!(
                        "compiler referenced a column '{column}' that is not visible"
                    ))
                })
            })
            .collect::<VeldResult<Vec<_>>>()?;
        let eval = compiled.eval;
        let predicate = ErasedPredicate {
            arg_types,
            func: Box::new(move |values| {
                (*eval)(values)?
                    .as_bool()
                    .ok_or_else(|| VeldError::internal("filter expression yielded a non-Bool"))
            }),
        };
        let name = (!name.is_empty()).then(|| name.to_string());
        let columns = compiled.columns;
        let node =
            engine.book(|graph| graph.book_filter(self.node, name, predicate, columns))?;
        Ok(self.child(node))
    }

    /// Append a derived column.
    ///
    /// `name` becomes visible to every downstream node as if it were a
    /// source column; it must not collide with any column visible here.
    /// The producer runs only for rows that pass the preceding filters,
    /// at most once per row and slot.
    pub fn define<Args>(
        &self,
        name: &str,
        producer: impl IntoRowMap<Args>,
        columns: &[&str],
    ) -> VeldResult<Frame> {
        let producer = producer.into_producer();
        let engine = self.engine()?;
        let node = engine.book(|graph| {
            let columns = graph.complete_columns(columns, producer.arg_types.len())?;
            graph.book_define(self.node, name.to_string(), producer, columns)
        })?;
        Ok(self.child(node))
    }

    /// Append a derived column computed from a textual expression.
    pub fn define_expr(&self, name: &str, expression: &str) -> VeldResult<Frame> {
        let engine = self.engine()?;
        let visible = engine.read_graph(|graph| graph.visible_schema(self.node));
        let compiled = engine
            .compiler()
            .compile(expression, &visible, ExprKind::Define)?;
        let arg_types = compiled
            .columns
            .iter()
            .map(|column| {
                visible.dtype(column).ok_or_else(|| {
                    VeldError::expression(format!(
                        "compiler referenced a column '{column}' that is not visible"
                    ))
                })
            })
            .collect::<VeldResult<Vec<_>>>()?;
        let eval = compiled.eval;
        let producer = ErasedProducer {
            arg_types,
            out_type: compiled.return_type,
            func: Box::new(move |values| (*eval)(values)),
        };
        let columns = compiled.columns;
        let node = engine
            .book(|graph| graph.book_define(self.node, name.to_string(), producer, columns))?;
        Ok(self.child(node))
    }

    /// Append a range gate admitting rows whose index among the rows
    /// reaching it is in `[start, stop)` (stop `0` means unbounded) and
    /// congruent to `start` modulo `stride`.
    ///
    /// When `stop` is exhausted the engine stops dispatching tasks. Range
    /// gates require sequential execution.
    pub fn range(&self, start: u64, stop: u64, stride: u64) -> VeldResult<Frame> {
        ensure!(stride != 0, InvalidArgument: "stride must be strictly greater than 0");
        ensure!(
            stop == 0 || stop >= start,
            InvalidArgument: "stop ({stop}) must not precede start ({start})"
        );
        let engine = self.engine()?;
        if engine.config().is_parallel() {
            return Err(VeldError::unsupported(
                "range gates require sequential execution",
            ));
        }
        let node = engine.book(|graph| Ok(graph.book_range(self.node, start, stop, stride)))?;
        Ok(self.child(node))
    }

    // ------------------------------------------------------------------
    // Lazy actions
    // ------------------------------------------------------------------

    /// Count the rows reaching this node. Lazy.
    pub fn count(&self) -> VeldResult<ResultHandle<u64>> {
        let engine = self.engine()?;
        let cell = Arc::new(ResultCell::new());
        engine.book(|graph| {
            graph.book_action(self.node, &[], &[], Box::new(CountDef::new(cell.clone())))
        })?;
        Ok(ResultHandle::new(cell, self.engine.clone()))
    }

    /// Collect the values of `column`. Lazy.
    ///
    /// Values are insertion-ordered within each slot and concatenated in
    /// ascending slot order at merge, which is source-row order only
    /// under sequential execution.
    pub fn take<T>(&self, column: &str) -> VeldResult<ResultHandle<Vec<T>>>
    where
        T: FromValue + Clone + Send + Sync + 'static,
    {
        let engine = self.engine()?;
        let cell = Arc::new(ResultCell::new());
        engine.book(|graph| {
            let columns = graph.complete_columns(&[column], 1)?;
            graph.book_action(
                self.node,
                &columns,
                &[T::DTYPE],
                Box::new(TakeDef::<T>::new(cell.clone())),
            )
        })?;
        Ok(ResultHandle::new(cell, self.engine.clone()))
    }

    /// Fold `f` over the values of `column`, seeded with `T::default()`.
    /// Lazy.
    pub fn reduce<T, F>(&self, f: F, column: &str) -> VeldResult<ResultHandle<T>>
    where
        T: FromValue + Default + Clone + Send + Sync + 'static,
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        self.reduce_with_init(f, column, T::default())
    }

    /// Fold `f` over the values of `column`, seeded with `init`. Lazy.
    ///
    /// Under parallel execution `f` must be associative and commutative
    /// with `init` as its identity.
    pub fn reduce_with_init<T, F>(
        &self,
        f: F,
        column: &str,
        init: T,
    ) -> VeldResult<ResultHandle<T>>
    where
        T: FromValue + Clone + Send + Sync + 'static,
        F: Fn(T, T) -> T + Send + Sync + 'static,
    {
        let engine = self.engine()?;
        let cell = Arc::new(ResultCell::new());
        engine.book(|graph| {
            let columns = graph.complete_columns(&[column], 1)?;
            graph.book_action(
                self.node,
                &columns,
                &[T::DTYPE],
                Box::new(ReduceDef::new(f, init, cell.clone())),
            )
        })?;
        Ok(ResultHandle::new(cell, self.engine.clone()))
    }

    /// Minimum of `column` (`+inf` when no row survives). Lazy.
    pub fn min(&self, column: &str) -> VeldResult<ResultHandle<f64>> {
        let engine = self.engine()?;
        let cell = Arc::new(ResultCell::new());
        engine.book(|graph| {
            let columns = graph.complete_columns(&[column], 1)?;
            graph.book_action(
                self.node,
                &columns,
                &[DataType::Float64],
                Box::new(MinDef::new(cell.clone())),
            )
        })?;
        Ok(ResultHandle::new(cell, self.engine.clone()))
    }

    /// Maximum of `column` (`-inf` when no row survives). Lazy.
    pub fn max(&self, column: &str) -> VeldResult<ResultHandle<f64>> {
        let engine = self.engine()?;
        let cell = Arc::new(ResultCell::new());
        engine.book(|graph| {
            let columns = graph.complete_columns(&[column], 1)?;
            graph.book_action(
                self.node,
                &columns,
                &[DataType::Float64],
                Box::new(MaxDef::new(cell.clone())),
            )
        })?;
        Ok(ResultHandle::new(cell, self.engine.clone()))
    }

    /// Mean of `column` (`0.0` when no row survives). Lazy.
    pub fn mean(&self, column: &str) -> VeldResult<ResultHandle<f64>> {
        let engine = self.engine()?;
        let cell = Arc::new(ResultCell::new());
        engine.book(|graph| {
            let columns = graph.complete_columns(&[column], 1)?;
            graph.book_action(
                self.node,
                &columns,
                &[DataType::Float64],
                Box::new(MeanDef::new(cell.clone())),
            )
        })?;
        Ok(ResultHandle::new(cell, self.engine.clone()))
    }

    /// Fill a clone of `model` with the values of `column`. Lazy.
    ///
    /// A model with degenerate limits buffers its fills and derives the
    /// axis range from the data.
    pub fn histo1d(&self, model: Hist1D, column: &str) -> VeldResult<ResultHandle<Hist1D>> {
        self.fill_model(model, &[column], true)
    }

    /// Weighted variant of [`histo1d`](Self::histo1d); `weight` supplies
    /// the per-row fill weight.
    pub fn histo1d_weighted(
        &self,
        model: Hist1D,
        column: &str,
        weight: &str,
    ) -> VeldResult<ResultHandle<Hist1D>> {
        self.fill_model(model, &[column, weight], true)
    }

    /// Fill a two-dimensional histogram. Lazy; finite limits required.
    pub fn histo2d(&self, model: Hist2D, x: &str, y: &str) -> VeldResult<ResultHandle<Hist2D>> {
        self.fill_model(model, &[x, y], false)
    }

    /// Fill a three-dimensional histogram. Lazy; finite limits required.
    pub fn histo3d(
        &self,
        model: Hist3D,
        x: &str,
        y: &str,
        z: &str,
    ) -> VeldResult<ResultHandle<Hist3D>> {
        self.fill_model(model, &[x, y, z], false)
    }

    /// Fill a one-dimensional profile. Lazy; finite limits required.
    pub fn profile1d(
        &self,
        model: Profile1D,
        x: &str,
        y: &str,
    ) -> VeldResult<ResultHandle<Profile1D>> {
        self.fill_model(model, &[x, y], false)
    }

    /// Fill a two-dimensional profile. Lazy; finite limits required.
    pub fn profile2d(
        &self,
        model: Profile2D,
        x: &str,
        y: &str,
        z: &str,
    ) -> VeldResult<ResultHandle<Profile2D>> {
        self.fill_model(model, &[x, y, z], false)
    }

    /// Fill any aggregator exposing the [`Fillable`] capability. Lazy;
    /// finite limits required. The column count must match the model's
    /// dimensionality, optionally plus one weight column.
    pub fn fill<A>(&self, model: A, columns: &[&str]) -> VeldResult<ResultHandle<A>>
    where
        A: Fillable + Clone + Send + Sync + 'static,
    {
        self.fill_model(model, columns, false)
    }

    fn fill_model<A>(
        &self,
        model: A,
        columns: &[&str],
        allow_extension: bool,
    ) -> VeldResult<ResultHandle<A>>
    where
        A: Fillable + Clone + Send + Sync + 'static,
    {
        if !model.has_finite_limits() && !(allow_extension && model.can_extend_axes()) {
            return Err(VeldError::unsupported(
                "aggregator axes without finite limits are not supported",
            ));
        }
        let dims = model.dimensions();
        let engine = self.engine()?;
        let cell = Arc::new(ResultCell::new());
        engine.book(|graph| {
            let columns: Vec<String> = if columns.is_empty() {
                graph.complete_columns(&[], dims)?
            } else if columns.len() == dims || columns.len() == dims + 1 {
                graph.complete_columns(columns, columns.len())?
            } else {
                return Err(VeldError::aggregator_binding(format!(
                    "{} columns supplied for a {dims}-dimensional aggregator",
                    columns.len()
                )));
            };
            let expected = vec![DataType::Float64; columns.len()];
            graph.book_action(
                self.node,
                &columns,
                &expected,
                Box::new(FillDef::new(model, cell.clone())),
            )
        })?;
        Ok(ResultHandle::new(cell, self.engine.clone()))
    }

    // ------------------------------------------------------------------
    // Instant actions
    // ------------------------------------------------------------------

    /// Invoke `f` on every surviving row. Instant: this triggers the
    /// event loop, together with every lazy action booked so far.
    ///
    /// Under parallel execution `f` is called concurrently from multiple
    /// workers.
    pub fn foreach<Args>(
        &self,
        f: impl IntoRowCallback<Args>,
        columns: &[&str],
    ) -> VeldResult<()> {
        self.foreach_erased(IntoRowCallback::into_callback(f), columns)
    }

    /// Like [`foreach`](Self::foreach), but `f` additionally receives the
    /// processing slot id as its first argument, enabling lock-free
    /// per-slot accumulation.
    pub fn foreach_slot<Args>(
        &self,
        f: impl IntoSlotCallback<Args>,
        columns: &[&str],
    ) -> VeldResult<()> {
        self.foreach_erased(IntoSlotCallback::into_callback(f), columns)
    }

    fn foreach_erased(&self, callback: ErasedCallback, columns: &[&str]) -> VeldResult<()> {
        let engine = self.engine()?;
        engine.book(|graph| {
            let expected = callback.arg_types.clone();
            let columns = graph.complete_columns(columns, expected.len())?;
            graph.book_action(
                self.node,
                &columns,
                &expected,
                Box::new(ForeachDef::new(callback)),
            )
        })?;
        engine.run()
    }

    /// Write the surviving rows of `columns` to a new table store and
    /// return a data frame rooted at it. Instant.
    ///
    /// The written columns become the new frame's default column list.
    /// Row order matches the source under sequential execution.
    pub fn snapshot(
        &self,
        table: &str,
        path: impl AsRef<Path>,
        columns: &[&str],
    ) -> VeldResult<DataFrame> {
        self.snapshot_impl(table, path.as_ref(), columns, None)
    }

    /// Like [`snapshot`](Self::snapshot) with the output column types
    /// declared explicitly; the two lists must have the same length.
    pub fn snapshot_with_types(
        &self,
        table: &str,
        path: impl AsRef<Path>,
        columns: &[&str],
        types: &[DataType],
    ) -> VeldResult<DataFrame> {
        if types.len() != columns.len() {
            return Err(VeldError::arity_mismatch(format!(
                "{} types declared for {} snapshot columns",
                types.len(),
                columns.len()
            )));
        }
        self.snapshot_impl(table, path.as_ref(), columns, Some(types))
    }

    fn snapshot_impl(
        &self,
        table: &str,
        path: &Path,
        columns: &[&str],
        types: Option<&[DataType]>,
    ) -> VeldResult<DataFrame> {
        if columns.is_empty() {
            return Err(VeldError::invalid_argument(
                "snapshot needs an explicit column list",
            ));
        }
        let engine = self.engine()?;
        let cell = Arc::new(ResultCell::new());
        engine.book(|graph| {
            let names: Vec<String> = columns.iter().map(|c| (*c).to_string()).collect();
            let infos = names
                .iter()
                .map(|name| {
                    Ok(ColumnInfo::new(
                        name,
                        graph.visible_dtype(self.node, name)?,
                    ))
                })
                .collect::<VeldResult<Vec<_>>>()?;
            if let Some(types) = types {
                for (info, want) in infos.iter().zip(types) {
                    if info.dtype != *want {
                        return Err(VeldError::type_mismatch(format!(
                            "snapshot column '{}' is {}, declared {}",
                            info.name, info.dtype, want
                        )));
                    }
                }
            }
            let expected: Vec<DataType> = infos.iter().map(|info| info.dtype).collect();
            graph.book_action(
                self.node,
                &names,
                &expected,
                Box::new(SnapshotDef::new(
                    table.to_string(),
                    path.to_path_buf(),
                    infos,
                    cell.clone(),
                )),
            )
        })?;
        engine.run()?;
        let store = cell
            .get_clone()
            .ok_or_else(|| VeldError::internal("snapshot produced no store"))?;
        Ok(DataFrame::with_compiler(
            store,
            engine.config().clone(),
            engine.compiler().clone(),
        ))
    }

    // ------------------------------------------------------------------
    // Reporting
    // ------------------------------------------------------------------

    /// Pass/total statistics for every named filter between the source
    /// and this node, in declaration order. Triggers the event loop if it
    /// has not run yet.
    pub fn report(&self) -> VeldResult<Report> {
        let engine = self.engine()?;
        if !engine.has_run() {
            engine.run()?;
        }
        let stats = engine.read_graph(|graph| graph.named_filter_stats(self.node));
        Ok(Report::new(
            stats
                .into_iter()
                .map(|(name, passed, total)| FilterStats {
                    name,
                    passed,
                    total,
                })
                .collect(),
        ))
    }
}
