// src/compose/graph.rs

//! Construction-time cycle checking for composite tasks.

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::compose::Step;
use crate::errors::{PipelineError, Result};

/// Compute an order in which the given composites can be registered so that
/// every composite is registered after the composites it references.
///
/// References to names that are not in `defs` (leaf tasks, or composites that
/// were registered earlier) impose no ordering. Fails with
/// [`PipelineError::TaskCycle`] if the composites reference each other in a
/// loop, including a composite that references itself.
pub fn registration_order(defs: &BTreeMap<String, Step>) -> Result<Vec<String>> {
    // Edge direction: member -> composite.
    // For `build = series(clean, assets)` with `assets` also a composite we
    // add assets -> build.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in defs.keys() {
        graph.add_node(name.as_str());
    }

    for (name, step) in defs.iter() {
        for member in step.referenced_tasks() {
            if member == name.as_str() {
                return Err(PipelineError::TaskCycle(format!(
                    "composite task '{name}' references itself"
                )));
            }
            if defs.contains_key(member) {
                graph.add_edge(member, name.as_str(), ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(PipelineError::TaskCycle(format!(
            "cycle detected among composite tasks involving '{}'",
            cycle.node_id()
        ))),
    }
}
