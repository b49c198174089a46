use sumie_core::{
    module::{ForwardError, Inputs, Module, Outputs},
    nn::Linear,
    tape::Tape,
    tensor::Tensor,
    variable::Variable,
};
use sumie_tensorboard::{proto::GraphDef, ExportError, GraphExportBuilder};

/// Shared trunk with a sigmoid gate head and a tanh state head.
struct TwoHead {
    trunk: Linear,
}

impl TwoHead {
    fn new(tape: &Tape) -> Self {
        Self {
            trunk: Linear::new(tape, "trunk", 8, 4),
        }
    }
}

impl Module for TwoHead {
    fn forward(&self, inputs: &Inputs) -> Result<Outputs, ForwardError> {
        let h = self.trunk.apply1(inputs.one()?)?;
        Ok(Outputs::Map(vec![
            ("gate".to_string(), h.sigmoid()?),
            ("state".to_string(), h.tanh()?),
        ]))
    }

    fn named_parameters(&self) -> Vec<(String, Variable)> {
        self.trunk
            .named_parameters()
            .into_iter()
            .map(|(name, var)| (format!("trunk/{name}"), var))
            .collect()
    }
}

fn terminal(graph: &GraphDef, name: &str) -> bool {
    graph.node.iter().any(|n| n.name == name)
        && !graph
            .node
            .iter()
            .any(|n| n.input.iter().any(|i| i == name))
}

#[test]
fn map_outputs_get_keyed_names_and_stay_terminal() {
    let tape = Tape::new();
    let model = TwoHead::new(&tape);
    let x = tape.new_var(Tensor::zeros(&[2, 8]));

    let (graph, _) = GraphExportBuilder::new(&model)
        .export(&Inputs::One(x))
        .unwrap();

    assert!(terminal(&graph, "output[gate]"));
    assert!(terminal(&graph, "output[state]"));
}

struct SoftmaxPair;

impl Module for SoftmaxPair {
    fn forward(&self, inputs: &Inputs) -> Result<Outputs, ForwardError> {
        let x = inputs.one()?;
        Ok(Outputs::List(vec![x.softmax()?, x.relu()?]))
    }

    fn named_parameters(&self) -> Vec<(String, Variable)> {
        Vec::new()
    }
}

#[test]
fn list_outputs_get_positional_names() {
    let tape = Tape::new();
    let x = tape.new_var(Tensor::zeros(&[2, 3]));

    let (graph, _) = GraphExportBuilder::new(&SoftmaxPair)
        .export(&Inputs::One(x))
        .unwrap();

    assert!(terminal(&graph, "output[0]"));
    assert!(terminal(&graph, "output[1]"));
}

struct Gate;

impl Module for Gate {
    fn forward(&self, inputs: &Inputs) -> Result<Outputs, ForwardError> {
        let a = inputs
            .get("a")
            .ok_or(ForwardError::Message("missing input 'a'".into()))?;
        let b = inputs
            .get("b")
            .ok_or(ForwardError::Message("missing input 'b'".into()))?;
        Ok(Outputs::One(a.mul(b)?))
    }

    fn named_parameters(&self) -> Vec<(String, Variable)> {
        Vec::new()
    }
}

#[test]
fn map_inputs_get_keyed_names() {
    let tape = Tape::new();
    let a = tape.new_var(Tensor::zeros(&[2, 2]));
    let b = tape.new_var(Tensor::zeros(&[2, 2]));

    let (graph, _) = GraphExportBuilder::new(&Gate)
        .export(&Inputs::Map(vec![
            ("a".to_string(), a),
            ("b".to_string(), b),
        ]))
        .unwrap();

    let mul = graph
        .node
        .iter()
        .find(|n| n.name == "main/Mul")
        .unwrap();
    assert_eq!(mul.input, vec!["input[a]".to_string(), "input[b]".to_string()]);
    assert!(terminal(&graph, "output"));
}

struct NoOutputs;

impl Module for NoOutputs {
    fn forward(&self, _: &Inputs) -> Result<Outputs, ForwardError> {
        Ok(Outputs::List(Vec::new()))
    }

    fn named_parameters(&self) -> Vec<(String, Variable)> {
        Vec::new()
    }
}

#[test]
fn empty_output_set_is_rejected() {
    let tape = Tape::new();
    let x = tape.new_var(Tensor::zeros(&[2]));

    let err = GraphExportBuilder::new(&NoOutputs)
        .export(&Inputs::One(x))
        .unwrap_err();
    assert!(matches!(err, ExportError::InvalidOutput(_)));
}

#[test]
fn empty_and_duplicate_inputs_are_rejected() {
    let tape = Tape::new();
    let model = Gate;

    let err = GraphExportBuilder::new(&model)
        .export(&Inputs::List(Vec::new()))
        .unwrap_err();
    assert!(matches!(err, ExportError::InvalidInput(_)));

    let a = tape.new_var(Tensor::zeros(&[2]));
    let b = tape.new_var(Tensor::zeros(&[2]));
    let err = GraphExportBuilder::new(&model)
        .export(&Inputs::Map(vec![
            ("a".to_string(), a),
            ("a".to_string(), b),
        ]))
        .unwrap_err();
    assert!(matches!(err, ExportError::InvalidInput(_)));
}

#[test]
fn inputs_and_parameters_must_share_a_tape() {
    let model_tape = Tape::new();
    let model = TwoHead::new(&model_tape);
    let x = Tape::new().new_var(Tensor::zeros(&[2, 8]));

    let err = GraphExportBuilder::new(&model)
        .export(&Inputs::One(x))
        .unwrap_err();
    assert!(matches!(err, ExportError::TapeMismatch));
}
