//! Fixed mart catalog and its dependency graph

use crate::errors::{PipelineError, Result};
use crate::silver::SourceTable;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Every mart the Gold stage can build, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MartKind {
    DimCustomer,
    DimProduct,
    DimLocation,
    FactSales,
    AggExecKpis,
    AggProductPerformance,
    AggGeoPerformance,
    WideSalesEnriched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MartCategory {
    Dimension,
    Fact,
    Aggregate,
    Wide,
}

/// Where a mart reads one of its inputs from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upstream {
    Source(SourceTable),
    Mart(MartKind),
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::Source(t) => write!(f, "{}", t),
            Upstream::Mart(m) => write!(f, "{}", m),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub upstream: Upstream,
    pub required: bool,
}

impl Dependency {
    fn source(table: SourceTable, required: bool) -> Self {
        Self {
            upstream: Upstream::Source(table),
            required,
        }
    }

    fn mart(mart: MartKind, required: bool) -> Self {
        Self {
            upstream: Upstream::Mart(mart),
            required,
        }
    }
}

impl MartKind {
    pub const ALL: [MartKind; 8] = [
        MartKind::DimCustomer,
        MartKind::DimProduct,
        MartKind::DimLocation,
        MartKind::FactSales,
        MartKind::AggExecKpis,
        MartKind::AggProductPerformance,
        MartKind::AggGeoPerformance,
        MartKind::WideSalesEnriched,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MartKind::DimCustomer => "dim_customer",
            MartKind::DimProduct => "dim_product",
            MartKind::DimLocation => "dim_location",
            MartKind::FactSales => "fact_sales",
            MartKind::AggExecKpis => "agg_exec_kpis",
            MartKind::AggProductPerformance => "agg_product_performance",
            MartKind::AggGeoPerformance => "agg_geo_performance",
            MartKind::WideSalesEnriched => "wide_sales_enriched",
        }
    }

    /// # Errors
    ///
    /// Returns `PipelineError::UnknownMart` for names outside the catalog.
    pub fn from_name(name: &str) -> Result<Self> {
        let wanted = name.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PipelineError::UnknownMart {
                name: name.to_string(),
            })
    }

    pub fn category(&self) -> MartCategory {
        match self {
            MartKind::DimCustomer | MartKind::DimProduct | MartKind::DimLocation => {
                MartCategory::Dimension
            }
            MartKind::FactSales => MartCategory::Fact,
            MartKind::AggExecKpis
            | MartKind::AggProductPerformance
            | MartKind::AggGeoPerformance => MartCategory::Aggregate,
            MartKind::WideSalesEnriched => MartCategory::Wide,
        }
    }

    /// Upstream inputs in declaration order
    pub fn dependencies(&self) -> Vec<Dependency> {
        use MartKind::*;
        match self {
            DimCustomer => vec![
                Dependency::source(SourceTable::CstInfo, true),
                Dependency::source(SourceTable::CstAz12, false),
                Dependency::source(SourceTable::LocA101, false),
            ],
            DimProduct => vec![
                Dependency::source(SourceTable::PrdInfo, true),
                Dependency::source(SourceTable::PxCatG1v2, false),
            ],
            DimLocation => vec![Dependency::source(SourceTable::LocA101, true)],
            FactSales => vec![Dependency::source(SourceTable::SalesDetails, true)],
            AggExecKpis => vec![
                Dependency::mart(FactSales, true),
                Dependency::mart(DimCustomer, true),
            ],
            AggProductPerformance => vec![
                Dependency::mart(FactSales, true),
                Dependency::mart(DimProduct, true),
            ],
            AggGeoPerformance => vec![
                Dependency::mart(FactSales, true),
                Dependency::mart(DimLocation, true),
                Dependency::mart(DimProduct, true),
                Dependency::mart(DimCustomer, false),
            ],
            WideSalesEnriched => vec![
                Dependency::mart(FactSales, true),
                Dependency::mart(DimCustomer, true),
                Dependency::mart(DimProduct, true),
                Dependency::mart(DimLocation, true),
            ],
        }
    }

    /// Output file inside the Gold run's `data/` directory
    pub fn output_file_name(&self) -> String {
        format!("gold_{}.csv", self.name())
    }
}

impl fmt::Display for MartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Topological build order over the given marts.
///
/// Edges run from each mart dependency to its dependent; ties between ready
/// marts are broken by catalog order so the order is deterministic. Marts
/// outside `marts` are not part of the graph.
///
/// # Errors
///
/// Returns `PipelineError::CycleDetected` if the dependencies form a cycle.
pub fn build_order(marts: &[MartKind]) -> Result<Vec<MartKind>> {
    let mut nodes: Vec<MartKind> = marts.to_vec();
    nodes.sort();
    nodes.dedup();

    let mut graph: DiGraph<MartKind, ()> = DiGraph::new();
    let index: HashMap<MartKind, NodeIndex> =
        nodes.iter().map(|m| (*m, graph.add_node(*m))).collect();

    for mart in &nodes {
        for dep in mart.dependencies() {
            if let Upstream::Mart(upstream) = dep.upstream {
                if let (Some(&from), Some(&to)) = (index.get(&upstream), index.get(mart)) {
                    graph.add_edge(from, to, ());
                }
            }
        }
    }

    let mut in_degree: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|idx| (idx, graph.neighbors_directed(idx, Direction::Incoming).count()))
        .collect();

    let mut queue: VecDeque<NodeIndex> = graph
        .node_indices()
        .filter(|idx| in_degree.get(idx).copied().unwrap_or(0) == 0)
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(idx) = queue.pop_front() {
        order.push(graph[idx]);

        let mut ready: Vec<NodeIndex> = Vec::new();
        for next in graph.neighbors_directed(idx, Direction::Outgoing) {
            if let Some(deg) = in_degree.get_mut(&next) {
                *deg = deg.saturating_sub(1);
                if *deg == 0 {
                    ready.push(next);
                }
            }
        }
        queue.extend(ready);
        queue.make_contiguous().sort_by_key(|n| graph[*n]);
    }

    if order.len() != nodes.len() {
        let stuck = nodes
            .iter()
            .find(|m| !order.contains(m))
            .copied()
            .unwrap_or(MartKind::DimCustomer);
        return Err(PipelineError::CycleDetected {
            mart: stuck.name().to_string(),
        });
    }
    Ok(order)
}
