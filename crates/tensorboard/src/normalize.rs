use std::time::Instant;

use crate::graph::{NodeKind, TraceGraph};

/// Splice out every value node that merely forwards data from one operation
/// to others: the producer absorbs its shape, edges are rerouted to bypass
/// it, and the node is marked deleted. Pure endpoints (no inputs, or no
/// outputs) stay. Rerouting only follows existing dependencies, so the
/// graph stays acyclic.
pub(crate) fn remove_intermediate_values(graph: &mut TraceGraph) {
    let start = Instant::now();

    let targets: Vec<_> = graph
        .live()
        .filter(|(_, n)| {
            n.kind == NodeKind::Value && !n.inputs.is_empty() && !n.outputs.is_empty()
        })
        .map(|(id, _)| id)
        .collect();

    for &vid in &targets {
        let (ins, outs, shape) = {
            let node = &graph.nodes[vid];
            (node.inputs.clone(), node.outputs.clone(), node.shape.clone())
        };
        for &producer in &ins {
            graph.nodes[producer].shape = shape.clone();
            graph.nodes[producer].outputs.remove(&vid);
            graph.nodes[producer].outputs.extend(outs.iter().copied());
        }
        for &consumer in &outs {
            graph.nodes[consumer].inputs.remove(&vid);
            graph.nodes[consumer].inputs.extend(ins.iter().copied());
        }
        graph.nodes[vid].deleted = true;
    }

    log::info!(
        "remove_intermediate_values({}): {:?}",
        targets.len(),
        start.elapsed()
    );
}
