use rustc_hash::FxHashSet;

use crate::{
    graph::{NodeKind, TraceGraph, TraceNodeId},
    ExportError,
};

/// Export-wide name claims. The first request keeps the base name; later
/// identical requests get `_1`, `_2`, ... in first-seen order.
struct NameTable {
    used: FxHashSet<String>,
}

impl NameTable {
    fn new() -> Self {
        Self {
            used: FxHashSet::default(),
        }
    }

    fn claim(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{base}_{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Give every captured node a unique display name.
///
/// Operations claim the scope-path names the trace assigned them; leaf
/// values (graph inputs, parameters) and model outputs keep their synthetic
/// names; every other value derives `<producer>_out[<slot>]`. The viewer
/// indexes nodes by name, so claims go through one table.
pub(crate) fn assign_display_names(graph: &mut TraceGraph) -> Result<(), ExportError> {
    let mut table = NameTable::new();
    let ids: Vec<TraceNodeId> = graph.nodes.iter().map(|(id, _)| id).collect();

    // Named endpoints and operations first, so derived names never steal
    // a synthetic name.
    for &id in &ids {
        match graph.nodes[id].kind {
            NodeKind::Value => {
                let node = &graph.nodes[id];
                if node.inputs.is_empty() || node.is_graph_output {
                    let base = node
                        .display_name
                        .clone()
                        .unwrap_or_else(|| format!("value.{}", id.index()));
                    graph.nodes[id].display_name = Some(table.claim(&base));
                }
            }
            NodeKind::Operation => {
                for &in_id in &graph.nodes[id].inputs {
                    if graph.nodes[in_id].kind != NodeKind::Value {
                        return Err(ExportError::UnrecognizedNode(describe(graph, in_id)));
                    }
                }
                let node = &graph.nodes[id];
                let base = node.display_name.clone().unwrap_or_else(|| node.label.clone());
                graph.nodes[id].display_name = Some(table.claim(&base));
            }
        }
    }

    // Produced, non-output values take their producer's name plus the slot.
    for &id in &ids {
        let node = &graph.nodes[id];
        if node.kind != NodeKind::Value || node.inputs.is_empty() || node.is_graph_output {
            continue;
        }
        let mut producers = node.inputs.iter();
        let producer = match (producers.next(), producers.next()) {
            (Some(&p), None) => p,
            _ => return Err(ExportError::UnrecognizedNode(describe(graph, id))),
        };
        if graph.nodes[producer].kind != NodeKind::Operation {
            return Err(ExportError::UnrecognizedNode(describe(graph, id)));
        }
        let base = match &graph.nodes[producer].display_name {
            Some(name) => format!("{}_out[{}]", name, graph.nodes[id].slot),
            None => return Err(ExportError::UnrecognizedNode(describe(graph, producer))),
        };
        graph.nodes[id].display_name = Some(table.claim(&base));
    }

    Ok(())
}

fn describe(graph: &TraceGraph, id: TraceNodeId) -> String {
    let node = &graph.nodes[id];
    node.display_name.clone().unwrap_or_else(|| node.label.clone())
}
