use rustc_hash::{FxHashMap, FxHashSet};

use sumie_core::{
    module::{Inputs, Module, Outputs},
    node::NodeId,
    tape::Tape,
    trace::TraceObserver,
    value::ValueId,
    variable::Variable,
};

use crate::{
    graph::{TraceGraph, TraceNode, TraceNodeId},
    ExportError,
};

/// Scope name used for the model itself and for anonymous sub-modules.
pub(crate) const TOP_SCOPE: &str = "main";

/// Tracks the scope-path stack during one traced forward run and hands
/// every operation its `scope/.../label` name. State lives here, scoped to
/// the extraction that registered it.
struct ScopeTracker {
    scopes: Vec<String>,
}

impl TraceObserver for ScopeTracker {
    fn on_operation_start(&mut self, label: &str) -> Option<String> {
        let mut path = self.scopes.join("/");
        if !path.is_empty() {
            path.push('/');
        }
        path.push_str(label);
        Some(path)
    }

    fn on_scope_enter(&mut self, name: Option<&str>) {
        self.scopes.push(name.unwrap_or(TOP_SCOPE).to_string());
    }

    fn on_scope_exit(&mut self) {
        self.scopes.pop();
    }
}

/// Caller-owned names rewritten for the duration of one extraction.
/// Restores on drop, earliest save last, so original names win on every
/// exit path even if a variable was renamed twice.
struct SavedNames {
    saved: Vec<(Variable, Option<String>)>,
}

impl SavedNames {
    fn new() -> Self {
        Self { saved: Vec::new() }
    }

    fn rename(&mut self, var: &Variable, name: String) {
        self.saved.push((var.clone(), var.name()));
        var.set_name(Some(name));
    }
}

impl Drop for SavedNames {
    fn drop(&mut self) {
        for (var, name) in self.saved.drain(..).rev() {
            var.set_name(name);
        }
    }
}

/// Deregisters the trace observer unconditionally when the extraction ends.
struct ObserverGuard {
    tape: Tape,
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.tape.take_observer();
    }
}

/// Run the model once and capture the backward-reachable dataflow of its
/// outputs as a [`TraceGraph`].
pub(crate) fn run<M: Module + ?Sized>(
    model: &M,
    inputs: &Inputs,
) -> Result<TraceGraph, ExportError> {
    validate_inputs(inputs)?;

    let params = model.named_parameters();
    let tape = find_tape(inputs, &params)?;

    // Claim the observer slot before touching any names, so an overlapping
    // extraction fails without side effects.
    tape.set_observer(Box::new(ScopeTracker { scopes: Vec::new() }))
        .map_err(|_| ExportError::ExtractionInProgress)?;
    let _observer = ObserverGuard { tape: tape.clone() };

    let mut names = SavedNames::new();
    match inputs {
        Inputs::One(v) => names.rename(v, "input[0]".to_string()),
        Inputs::List(vs) => {
            for (i, v) in vs.iter().enumerate() {
                names.rename(v, format!("input[{i}]"));
            }
        }
        Inputs::Map(kvs) => {
            for (k, v) in kvs {
                names.rename(v, format!("input[{k}]"));
            }
        }
    }
    for (path, param) in &params {
        names.rename(param, format!("{TOP_SCOPE}/{path}"));
    }

    let outputs = model.apply(inputs)?;
    let output_vars = name_outputs(&tape, &outputs)?;

    Ok(build(&tape, &output_vars))
}

fn validate_inputs(inputs: &Inputs) -> Result<(), ExportError> {
    match inputs {
        Inputs::One(_) => Ok(()),
        Inputs::List(vs) => {
            if vs.is_empty() {
                return Err(ExportError::InvalidInput("empty input list".into()));
            }
            Ok(())
        }
        Inputs::Map(kvs) => {
            if kvs.is_empty() {
                return Err(ExportError::InvalidInput("empty input map".into()));
            }
            let mut keys = FxHashSet::default();
            for (k, _) in kvs {
                if !keys.insert(k.as_str()) {
                    return Err(ExportError::InvalidInput(
                        format!("duplicate input key '{k}'").into(),
                    ));
                }
            }
            Ok(())
        }
    }
}

/// All inputs and parameters must live on one tape; that tape is the one
/// the computation will be read back from.
fn find_tape(inputs: &Inputs, params: &[(String, Variable)]) -> Result<Tape, ExportError> {
    let mut vars = inputs.variables();
    vars.extend(params.iter().map(|(_, v)| v.clone()));
    let mut it = vars.iter();

    let tape = match it.next() {
        Some(v) => v.tape().clone(),
        None => return Err(ExportError::InvalidInput("no input variables".into())),
    };
    for v in it {
        if !tape.same_tape(v.tape()) {
            return Err(ExportError::TapeMismatch);
        }
    }
    Ok(tape)
}

/// Stamp the model's return values with their `output[...]` names. Output
/// names are part of the export, not caller state, so they are not saved
/// for restoration.
fn name_outputs(tape: &Tape, outputs: &Outputs) -> Result<Vec<Variable>, ExportError> {
    let vars = outputs.variables();
    if vars.is_empty() {
        return Err(ExportError::InvalidOutput("empty output set".into()));
    }
    for v in &vars {
        if !tape.same_tape(v.tape()) {
            return Err(ExportError::InvalidOutput(
                "output variable lives on a different tape".into(),
            ));
        }
    }

    match outputs {
        Outputs::One(v) => v.set_name(Some("output".to_string())),
        Outputs::List(vs) => {
            for (i, v) in vs.iter().enumerate() {
                v.set_name(Some(format!("output[{i}]")));
            }
        }
        Outputs::Map(kvs) => {
            let mut keys = FxHashSet::default();
            for (k, _) in kvs {
                if !keys.insert(k.as_str()) {
                    return Err(ExportError::InvalidOutput(
                        format!("duplicate output key '{k}'").into(),
                    ));
                }
            }
            for (k, v) in kvs {
                v.set_name(Some(format!("output[{k}]")));
            }
        }
    }
    Ok(vars)
}

/// Materialize the captured graph: walk backward from the outputs, then
/// connect every reached operation to its reached inputs and outputs.
/// Values feeding nothing on the path to an output do not appear, matching
/// the dataflow a viewer can actually display.
fn build(tape: &Tape, output_vars: &[Variable]) -> TraceGraph {
    let g = tape.graph();

    let mut reached_vals: FxHashSet<ValueId> = FxHashSet::default();
    let mut reached_nodes: FxHashSet<NodeId> = FxHashSet::default();
    let mut stack: Vec<ValueId> = Vec::new();
    for v in output_vars {
        if reached_vals.insert(v.id()) {
            stack.push(v.id());
        }
    }
    while let Some(vid) = stack.pop() {
        if let Some(producer) = g.values[vid].producer {
            if reached_nodes.insert(producer.node) {
                for &in_vid in &g.nodes[producer.node].inputs {
                    if reached_vals.insert(in_vid) {
                        stack.push(in_vid);
                    }
                }
            }
        }
    }

    let mut graph = TraceGraph::default();
    let mut val_map: FxHashMap<ValueId, TraceNodeId> = FxHashMap::default();
    let mut node_map: FxHashMap<NodeId, TraceNodeId> = FxHashMap::default();

    for (vid, val) in g.values.inner().iter() {
        if !reached_vals.contains(&vid) {
            continue;
        }
        let slot = val.producer.map(|p| p.slot).unwrap_or(0);
        let id = graph.nodes.alloc(TraceNode::value(
            val.name.clone(),
            val.data.dims().to_vec(),
            slot,
        ));
        val_map.insert(vid, id);
    }
    for (nid, node) in g.nodes.iter() {
        if !reached_nodes.contains(&nid) {
            continue;
        }
        let id = graph
            .nodes
            .alloc(TraceNode::operation(node.op.name(), node.name.clone()));
        node_map.insert(nid, id);
    }

    let users = g.value_users();
    for (&vid, &val_id) in &val_map {
        if let Some(consumers) = users.get(&vid) {
            for nid in consumers {
                if let Some(&op_id) = node_map.get(nid) {
                    graph.nodes[val_id].outputs.insert(op_id);
                    graph.nodes[op_id].inputs.insert(val_id);
                }
            }
        }
    }
    for (nid, node) in g.nodes.iter() {
        if let Some(&op_id) = node_map.get(&nid) {
            for out_vid in &node.outputs {
                // outputs that feed nothing on the way to a model output
                // were not reached and stay out of the capture
                if let Some(&val_id) = val_map.get(out_vid) {
                    graph.nodes[op_id].outputs.insert(val_id);
                    graph.nodes[val_id].inputs.insert(op_id);
                }
            }
        }
    }

    for v in output_vars {
        graph.nodes[val_map[&v.id()]].is_graph_output = true;
    }

    log::debug!(
        "captured {} operations, {} values",
        node_map.len(),
        val_map.len()
    );

    graph
}
