use std::time::Instant;

use sumie_core::module::{Inputs, Module};

use crate::{
    capture,
    graph::TraceGraph,
    namer, normalize,
    proto::{
        attr_value, tensor_shape_proto::Dim, AttrValue, GraphDef, ListValue, NodeDef,
        RunMetadata, TensorShapeProto, VersionDef,
    },
    ExportError,
};

/// Producer version stamped into every emitted graph record.
const GRAPH_PRODUCER: i32 = 22;

const OUTPUT_SHAPES_ATTR: &str = "_output_shapes";

/// Extracts the structural graph of one forward run of `model`.
///
/// ```ignore
/// let (graph_def, run_metadata) = GraphExportBuilder::new(&model)
///     .with_remove_intermediate_vars(false)
///     .export(&Inputs::One(x))?;
/// writer.write_graph(graph_def, run_metadata)?;
/// ```
pub struct GraphExportBuilder<'a, M: Module + ?Sized> {
    model: &'a M,
    remove_intermediate_vars: bool,
}

impl<'a, M: Module + ?Sized> GraphExportBuilder<'a, M> {
    pub const fn new(model: &'a M) -> Self {
        Self {
            model,
            remove_intermediate_vars: true,
        }
    }

    /// Splice pass-through value nodes out of the export (the default), or
    /// keep them all.
    pub const fn with_remove_intermediate_vars(mut self, enabled: bool) -> Self {
        self.remove_intermediate_vars = enabled;
        self
    }

    /// Run the model once on `inputs` (the real computation executes) and
    /// encode the captured dataflow as a graph record plus the paired,
    /// always-empty runtime-statistics record.
    ///
    /// While the forward pass runs, input and parameter variables carry
    /// synthetic traced names; their original names are restored before
    /// this returns, on success and on every failure.
    pub fn export(self, inputs: &Inputs) -> Result<(GraphDef, RunMetadata), ExportError> {
        let start = Instant::now();

        let mut graph = capture::run(self.model, inputs)?;
        namer::assign_display_names(&mut graph)?;
        if self.remove_intermediate_vars {
            normalize::remove_intermediate_values(&mut graph);
        }
        let records = encode_graph(&graph);

        log::info!("export({} nodes): {:?}", records.0.node.len(), start.elapsed());
        Ok(records)
    }
}

fn encode_graph(graph: &TraceGraph) -> (GraphDef, RunMetadata) {
    let mut graph_def = GraphDef {
        node: Vec::new(),
        versions: Some(VersionDef {
            producer: GRAPH_PRODUCER,
            min_consumer: 0,
        }),
    };

    for (_, node) in graph.live() {
        let name = node
            .display_name
            .clone()
            .unwrap_or_else(|| node.label.clone());
        let mut input: Vec<String> = node
            .inputs
            .iter()
            .map(|&id| {
                let src = &graph.nodes[id];
                src.display_name.clone().unwrap_or_else(|| src.label.clone())
            })
            .collect();
        // edge sets are unordered; keep the record deterministic
        input.sort();

        let mut node_def = NodeDef {
            name,
            op: node.label.clone(),
            input,
            attr: Default::default(),
        };
        if let Some(dims) = &node.shape {
            node_def
                .attr
                .insert(OUTPUT_SHAPES_ATTR.to_string(), shape_attr(dims));
        }
        graph_def.node.push(node_def);
    }

    (graph_def, RunMetadata::default())
}

fn shape_attr(dims: &[usize]) -> AttrValue {
    AttrValue {
        value: Some(attr_value::Value::List(ListValue {
            shape: vec![TensorShapeProto {
                dim: dims
                    .iter()
                    .map(|&d| Dim {
                        size: d as i64,
                        name: String::new(),
                    })
                    .collect(),
                unknown_rank: false,
            }],
        })),
    }
}
