use sumie_core::{
    module::{ForwardError, Inputs, Module, Outputs},
    nn::Linear,
    tape::Tape,
    tensor::Tensor,
    variable::Variable,
};
use sumie_tensorboard::{proto::GraphDef, GraphExportBuilder};

fn names(graph: &GraphDef) -> Vec<&str> {
    graph.node.iter().map(|n| n.name.as_str()).collect()
}

/// Applies the same layer twice in one forward pass.
struct Recurrent {
    fc: Linear,
}

impl Module for Recurrent {
    fn forward(&self, inputs: &Inputs) -> Result<Outputs, ForwardError> {
        let x = inputs.one()?;
        let h = self.fc.apply1(x)?;
        Ok(Outputs::One(self.fc.apply1(&h)?))
    }

    fn named_parameters(&self) -> Vec<(String, Variable)> {
        self.fc
            .named_parameters()
            .into_iter()
            .map(|(name, var)| (format!("fc/{name}"), var))
            .collect()
    }
}

#[test]
fn repeated_submodule_applications_are_counted() {
    let tape = Tape::new();
    let model = Recurrent {
        fc: Linear::new(&tape, "fc", 4, 4),
    };
    let x = tape.new_var(Tensor::zeros(&[2, 4]));

    let (graph, _) = GraphExportBuilder::new(&model)
        .export(&Inputs::One(x))
        .unwrap();

    let names = names(&graph);
    assert!(names.contains(&"main/fc/Linear"));
    assert!(names.contains(&"main/fc/Linear_1"));
}

#[test]
fn derived_names_follow_the_counted_producer() {
    let tape = Tape::new();
    let model = Recurrent {
        fc: Linear::new(&tape, "fc", 4, 4),
    };
    let x = tape.new_var(Tensor::zeros(&[2, 4]));

    let (graph, _) = GraphExportBuilder::new(&model)
        .with_remove_intermediate_vars(false)
        .export(&Inputs::One(x))
        .unwrap();

    // first application's result is the pass-through value, the second's is
    // the model output
    let names = names(&graph);
    assert!(names.contains(&"main/fc/Linear_out[0]"));
    assert!(names.contains(&"output"));
    assert!(!names.contains(&"main/fc/Linear_1_out[0]"));
}

struct Halver;

impl Module for Halver {
    fn forward(&self, inputs: &Inputs) -> Result<Outputs, ForwardError> {
        let x = inputs.one()?;
        let parts = x.split(0, 2)?;
        Ok(Outputs::One(parts[0].add(&parts[1])?))
    }

    fn named_parameters(&self) -> Vec<(String, Variable)> {
        Vec::new()
    }
}

#[test]
fn split_slots_number_derived_values() {
    let tape = Tape::new();
    let x = tape.new_var(Tensor::zeros(&[4, 2]));

    let (graph, _) = GraphExportBuilder::new(&Halver)
        .with_remove_intermediate_vars(false)
        .export(&Inputs::One(x))
        .unwrap();

    let names = names(&graph);
    assert!(names.contains(&"main/Split"));
    assert!(names.contains(&"main/Split_out[0]"));
    assert!(names.contains(&"main/Split_out[1]"));
}

/// A nameless wrapper around a tanh, to pin the placeholder scope name.
struct Anonymous;

impl Module for Anonymous {
    fn forward(&self, inputs: &Inputs) -> Result<Outputs, ForwardError> {
        Ok(Outputs::One(inputs.one()?.tanh()?))
    }

    fn named_parameters(&self) -> Vec<(String, Variable)> {
        Vec::new()
    }
}

struct Outer {
    inner: Anonymous,
}

impl Module for Outer {
    fn forward(&self, inputs: &Inputs) -> Result<Outputs, ForwardError> {
        self.inner.apply(inputs)
    }

    fn named_parameters(&self) -> Vec<(String, Variable)> {
        Vec::new()
    }
}

#[test]
fn anonymous_submodules_fall_back_to_the_placeholder_scope() {
    let tape = Tape::new();
    let x = tape.new_var(Tensor::zeros(&[2]));

    let (graph, _) = GraphExportBuilder::new(&Outer { inner: Anonymous })
        .export(&Inputs::One(x))
        .unwrap();

    assert!(names(&graph).contains(&"main/main/Tanh"));
}
