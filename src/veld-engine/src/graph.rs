//! The computation graph: source, filters, derived columns, range gates
//! and booked actions.
//!
//! Nodes are appended by the builder surface and never mutated afterwards
//! except for the filter counters, which the executor folds in after each
//! successful run. All validation (visibility, typing, naming) happens at
//! booking time so the event loop never sees a malformed graph.

use common_error::{VeldError, VeldResult};
use veld_core::{ColumnInfo, DataType, Schema};

use crate::ops::ActionDef;
use crate::row_fn::{ErasedPredicate, ErasedProducer};

/// Index of a node in the graph arena.
pub(crate) type NodeId = usize;

/// The source node is always the first entry.
pub(crate) const SOURCE: NodeId = 0;

/// Where a consumer reads one of its input columns from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ColumnSource {
    /// Store column, by index into [`Graph::reader_specs`].
    Reader { spec: usize },
    /// Derived column produced by the given define node.
    Derived { node: NodeId },
}

pub(crate) struct FilterNode {
    pub parent: NodeId,
    pub name: Option<String>,
    pub predicate: ErasedPredicate,
    pub inputs: Vec<ColumnSource>,
    /// Index into the per-slot filter caches.
    pub cache_idx: usize,
    pub children: u32,
    /// Rows that passed, summed over all successful runs.
    pub passed: u64,
    /// Rows that reached this filter, summed over all successful runs.
    pub total: u64,
}

pub(crate) struct DefineNode {
    pub parent: NodeId,
    pub name: String,
    pub producer: ErasedProducer,
    pub inputs: Vec<ColumnSource>,
    pub dtype: DataType,
    /// Index into the per-slot derived-value caches.
    pub cache_idx: usize,
    pub children: u32,
}

pub(crate) struct RangeNode {
    pub parent: NodeId,
    pub start: u64,
    /// Exclusive upper bound on rows seen; `0` means unbounded.
    pub stop: u64,
    pub stride: u64,
    /// Index into the per-slot range counters.
    pub cache_idx: usize,
    pub children: u32,
}

pub(crate) enum Node {
    Source { children: u32 },
    Filter(FilterNode),
    Define(DefineNode),
    Range(RangeNode),
}

impl Node {
    fn parent(&self) -> Option<NodeId> {
        match self {
            Self::Source { .. } => None,
            Self::Filter(f) => Some(f.parent),
            Self::Define(d) => Some(d.parent),
            Self::Range(r) => Some(r.parent),
        }
    }

    fn bump_children(&mut self) {
        match self {
            Self::Source { children } => *children += 1,
            Self::Filter(f) => f.children += 1,
            Self::Define(d) => d.children += 1,
            Self::Range(r) => r.children += 1,
        }
    }

    /// Number of nodes and actions attached below this node.
    pub(crate) fn children(&self) -> u32 {
        match self {
            Self::Source { children } => *children,
            Self::Filter(f) => f.children,
            Self::Define(d) => d.children,
            Self::Range(r) => r.children,
        }
    }
}

/// A booked action: the graph node it hangs off, its resolved inputs and
/// the type-erased operation.
pub(crate) struct ActionEntry {
    pub parent: NodeId,
    pub inputs: Vec<ColumnSource>,
    pub def: Box<dyn ActionDef>,
    pub executed: bool,
}

pub(crate) struct Graph {
    pub nodes: Vec<Node>,
    pub actions: Vec<ActionEntry>,
    /// Store columns bound by at least one consumer, deduplicated.
    pub reader_specs: Vec<String>,
    pub n_filters: usize,
    pub n_defines: usize,
    pub n_ranges: usize,
    pub has_run: bool,
    schema: Schema,
    defaults: Vec<String>,
}

impl Graph {
    pub(crate) fn new(schema: Schema, defaults: Vec<String>) -> Self {
        Self {
            nodes: vec![Node::Source { children: 0 }],
            actions: Vec::new(),
            reader_specs: Vec::new(),
            n_filters: 0,
            n_defines: 0,
            n_ranges: 0,
            has_run: false,
            schema,
            defaults,
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub(crate) fn has_range(&self) -> bool {
        self.n_ranges > 0
    }

    /// Walk ancestors of `id` (inclusive), source last.
    fn ancestors(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Node)> {
        let mut next = Some(id);
        std::iter::from_fn(move || {
            let id = next?;
            let node = &self.nodes[id];
            next = node.parent();
            Some((id, node))
        })
    }

    /// Find the define visible at `at` that produces `name`.
    fn define_above(&self, at: NodeId, name: &str) -> Option<NodeId> {
        self.ancestors(at).find_map(|(id, node)| match node {
            Node::Define(d) if d.name == name => Some(id),
            _ => None,
        })
    }

    /// Type of the column `name` as visible at `at`.
    pub(crate) fn visible_dtype(&self, at: NodeId, name: &str) -> VeldResult<DataType> {
        if let Some(id) = self.define_above(at, name) {
            let Node::Define(d) = &self.nodes[id] else {
                unreachable!()
            };
            return Ok(d.dtype);
        }
        self.schema
            .dtype(name)
            .ok_or_else(|| VeldError::unknown_column(name))
    }

    /// The full schema visible at `at`: source columns first, then derived
    /// columns in declaration order.
    pub(crate) fn visible_schema(&self, at: NodeId) -> Schema {
        let mut columns: Vec<ColumnInfo> = self.schema.columns().to_vec();
        let mut derived: Vec<ColumnInfo> = self
            .ancestors(at)
            .filter_map(|(_, node)| match node {
                Node::Define(d) => Some(ColumnInfo::new(&d.name, d.dtype)),
                _ => None,
            })
            .collect();
        derived.reverse();
        columns.extend(derived);
        // Names are unique by construction, so this cannot fail.
        Schema::new(columns).expect("visible columns are unique")
    }

    /// Complete a user-supplied column list to `arity` entries.
    ///
    /// Empty entries and missing trailing entries are taken from the
    /// source's default column list at the same position.
    pub(crate) fn complete_columns(
        &self,
        provided: &[&str],
        arity: usize,
    ) -> VeldResult<Vec<String>> {
        if provided.len() > arity {
            return Err(VeldError::arity_mismatch(format!(
                "{} columns supplied, callable takes {arity}",
                provided.len()
            )));
        }
        (0..arity)
            .map(|i| match provided.get(i) {
                Some(name) if !name.is_empty() => Ok((*name).to_string()),
                _ => self.defaults.get(i).cloned().ok_or_else(|| {
                    VeldError::missing_column_spec(format!(
                        "{arity} columns needed, {} supplied and the default list has {}",
                        provided.len(),
                        self.defaults.len()
                    ))
                }),
            })
            .collect()
    }

    /// Resolve column names at `at` into value sources, checking each
    /// column's runtime type against the consumer's expected type.
    pub(crate) fn resolve_inputs(
        &mut self,
        at: NodeId,
        names: &[String],
        expected: &[DataType],
    ) -> VeldResult<Vec<ColumnSource>> {
        debug_assert_eq!(names.len(), expected.len());
        names
            .iter()
            .zip(expected)
            .map(|(name, want)| {
                let dtype = self.visible_dtype(at, name)?;
                if !dtype.can_coerce_to(want) {
                    return Err(VeldError::type_mismatch(format!(
                        "column '{name}' is {dtype}, expected {want}"
                    )));
                }
                Ok(match self.define_above(at, name) {
                    Some(node) => ColumnSource::Derived { node },
                    None => ColumnSource::Reader {
                        spec: self.intern_reader(name),
                    },
                })
            })
            .collect()
    }

    fn intern_reader(&mut self, name: &str) -> usize {
        if let Some(i) = self.reader_specs.iter().position(|n| n == name) {
            return i;
        }
        self.reader_specs.push(name.to_string());
        self.reader_specs.len() - 1
    }

    pub(crate) fn book_filter(
        &mut self,
        at: NodeId,
        name: Option<String>,
        predicate: ErasedPredicate,
        columns: Vec<String>,
    ) -> VeldResult<NodeId> {
        if let Some(name) = &name {
            let clash = self.ancestors(at).any(|(_, node)| {
                matches!(node, Node::Filter(f) if f.name.as_deref() == Some(name))
            });
            if clash {
                return Err(VeldError::invalid_argument(format!(
                    "filter name '{name}' already used on this branch"
                )));
            }
        }
        let inputs = self.resolve_inputs(at, &columns, &predicate.arg_types)?;
        let cache_idx = self.n_filters;
        self.n_filters += 1;
        self.nodes[at].bump_children();
        self.nodes.push(Node::Filter(FilterNode {
            parent: at,
            name,
            predicate,
            inputs,
            cache_idx,
            children: 0,
            passed: 0,
            total: 0,
        }));
        Ok(self.nodes.len() - 1)
    }

    pub(crate) fn book_define(
        &mut self,
        at: NodeId,
        name: String,
        producer: ErasedProducer,
        columns: Vec<String>,
    ) -> VeldResult<NodeId> {
        if name.is_empty() {
            return Err(VeldError::invalid_argument("column name may not be empty"));
        }
        if self.schema.contains(&name) || self.define_above(at, &name).is_some() {
            return Err(VeldError::duplicate_column(name));
        }
        let inputs = self.resolve_inputs(at, &columns, &producer.arg_types)?;
        let cache_idx = self.n_defines;
        self.n_defines += 1;
        let dtype = producer.out_type;
        self.nodes[at].bump_children();
        self.nodes.push(Node::Define(DefineNode {
            parent: at,
            name,
            producer,
            inputs,
            dtype,
            cache_idx,
            children: 0,
        }));
        Ok(self.nodes.len() - 1)
    }

    pub(crate) fn book_range(
        &mut self,
        at: NodeId,
        start: u64,
        stop: u64,
        stride: u64,
    ) -> NodeId {
        let cache_idx = self.n_ranges;
        self.n_ranges += 1;
        self.nodes[at].bump_children();
        self.nodes.push(Node::Range(RangeNode {
            parent: at,
            start,
            stop,
            stride,
            cache_idx,
            children: 0,
        }));
        self.nodes.len() - 1
    }

    pub(crate) fn book_action(
        &mut self,
        at: NodeId,
        names: &[String],
        expected: &[DataType],
        def: Box<dyn ActionDef>,
    ) -> VeldResult<usize> {
        let inputs = self.resolve_inputs(at, names, expected)?;
        self.nodes[at].bump_children();
        self.actions.push(ActionEntry {
            parent: at,
            inputs,
            def,
            executed: false,
        });
        Ok(self.actions.len() - 1)
    }

    /// Indices of actions not yet materialized.
    pub(crate) fn pending_actions(&self) -> Vec<usize> {
        self.actions
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.executed)
            .map(|(i, _)| i)
            .collect()
    }

    /// `(name, passed, total)` for each named filter on the path from the
    /// source to `at`, in declaration order.
    pub(crate) fn named_filter_stats(&self, at: NodeId) -> Vec<(String, u64, u64)> {
        let mut stats: Vec<(String, u64, u64)> = self
            .ancestors(at)
            .filter_map(|(_, node)| match node {
                Node::Filter(f) => f
                    .name
                    .clone()
                    .map(|name| (name, f.passed, f.total)),
                _ => None,
            })
            .collect();
        stats.reverse();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row_fn::IntoRowPredicate;
    use veld_core::ColumnInfo;

    fn test_graph() -> Graph {
        let schema = Schema::new(vec![
            ColumnInfo::new("x", DataType::Int64),
            ColumnInfo::new("y", DataType::Float64),
        ])
        .unwrap();
        Graph::new(schema, vec!["x".to_string(), "y".to_string()])
    }

    fn pred() -> ErasedPredicate {
        (|x: i64| x > 0).into_predicate()
    }

    #[test]
    fn test_complete_columns_from_defaults() {
        let graph = test_graph();
        assert_eq!(graph.complete_columns(&[], 2).unwrap(), vec!["x", "y"]);
        assert_eq!(graph.complete_columns(&["y"], 2).unwrap(), vec!["y", "y"]);
        assert_eq!(graph.complete_columns(&["", "x"], 2).unwrap(), vec!["x", "x"]);
        assert!(matches!(
            graph.complete_columns(&["x", "y", "x"], 2).unwrap_err(),
            VeldError::ArityMismatch(_)
        ));
    }

    #[test]
    fn test_complete_columns_missing_spec() {
        let schema = Schema::new(vec![ColumnInfo::new("x", DataType::Int64)]).unwrap();
        let graph = Graph::new(schema, Vec::new());
        assert!(matches!(
            graph.complete_columns(&[], 1).unwrap_err(),
            VeldError::MissingColumnSpec(_)
        ));
    }

    #[test]
    fn test_duplicate_filter_name_on_branch() {
        let mut graph = test_graph();
        let f1 = graph
            .book_filter(SOURCE, Some("cut".into()), pred(), vec!["x".into()])
            .unwrap();
        let err = graph
            .book_filter(f1, Some("cut".into()), pred(), vec!["x".into()])
            .unwrap_err();
        assert!(matches!(err, VeldError::InvalidArgument(_)));
        // The same name on a sibling branch is fine.
        graph
            .book_filter(SOURCE, Some("cut".into()), pred(), vec!["x".into()])
            .unwrap();
    }

    #[test]
    fn test_define_collisions() {
        let mut graph = test_graph();
        let producer = |x: i64| x + 1;
        let d = graph
            .book_define(SOURCE, "z".into(), crate::row_fn::IntoRowMap::into_producer(producer), vec!["x".into()])
            .unwrap();
        assert!(matches!(
            graph.book_define(d, "x".into(), crate::row_fn::IntoRowMap::into_producer(|x: i64| x), vec!["x".into()]),
            Err(VeldError::DuplicateColumn(_))
        ));
        assert!(matches!(
            graph.book_define(d, "z".into(), crate::row_fn::IntoRowMap::into_producer(|x: i64| x), vec!["x".into()]),
            Err(VeldError::DuplicateColumn(_))
        ));
    }

    #[test]
    fn test_visible_schema_includes_defines() {
        let mut graph = test_graph();
        let d = graph
            .book_define(
                SOURCE,
                "z".into(),
                crate::row_fn::IntoRowMap::into_producer(|x: i64| x * 2),
                vec!["x".into()],
            )
            .unwrap();
        let visible = graph.visible_schema(d);
        assert_eq!(visible.dtype("z"), Some(DataType::Int64));
        assert_eq!(visible.dtype("x"), Some(DataType::Int64));
        // Not visible at the source node.
        assert!(graph.visible_schema(SOURCE).dtype("z").is_none());
    }

    #[test]
    fn test_resolve_type_mismatch() {
        let mut graph = test_graph();
        let err = graph
            .resolve_inputs(SOURCE, &["y".to_string()], &[DataType::Int64])
            .unwrap_err();
        assert!(matches!(err, VeldError::TypeMismatch(_)));
        // Int64 widens to Float64.
        assert!(graph
            .resolve_inputs(SOURCE, &["x".to_string()], &[DataType::Float64])
            .is_ok());
    }

    #[test]
    fn test_reader_specs_deduplicated() {
        let mut graph = test_graph();
        graph
            .resolve_inputs(SOURCE, &["x".to_string(), "x".to_string()], &[
                DataType::Int64,
                DataType::Int64,
            ])
            .unwrap();
        assert_eq!(graph.reader_specs, vec!["x"]);
    }

    #[test]
    fn test_unknown_column() {
        let mut graph = test_graph();
        assert!(matches!(
            graph.resolve_inputs(SOURCE, &["nope".to_string()], &[DataType::Int64]),
            Err(VeldError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_children_counts_track_booking() {
        let mut graph = test_graph();
        let f = graph
            .book_filter(SOURCE, None, pred(), vec!["x".into()])
            .unwrap();
        graph.book_filter(f, None, pred(), vec!["x".into()]).unwrap();
        graph.book_filter(f, None, pred(), vec!["x".into()]).unwrap();
        assert_eq!(graph.node(SOURCE).children(), 1);
        assert_eq!(graph.node(f).children(), 2);
    }
}
