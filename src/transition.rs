//! Screen transitions derived from a graph view, and their deduplication into
//! flow-chart edges.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::graph::{GraphTestStep, GraphView, GraphViewNode, GraphViewStore, TestPurpose};
use crate::model::{op, Note};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerTarget {
    pub xpath: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iframe_index: Option<u32>,
}

/// The operation that drove a transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub test_step_id: String,
    #[serde(rename = "type")]
    pub op_type: String,
    pub target_element_id: Option<String>,
    pub target: Option<TriggerTarget>,
    pub input: String,
    pub page_url: String,
    pub page_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInput {
    pub test_step_id: String,
    pub value: String,
}

/// An input-capable element visible during a transition, with the inputs
/// made to it before the transition happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputElement {
    pub id: String,
    pub xpath: String,
    pub tagname: String,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    pub default_value: Option<String>,
    pub inputs: Vec<ElementInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenTransition {
    pub window_id: String,
    pub source: ScreenRef,
    pub destination: Option<ScreenRef>,
    pub trigger: Option<Trigger>,
    pub input_elements: Vec<InputElement>,
    pub notes: Vec<Note>,
    pub test_purposes: Vec<TestPurpose>,
}

/// Deduplicated transitions between one pair of screens with one trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source_screen_id: String,
    pub dest_screen_id: String,
    pub trigger: Option<Trigger>,
    pub details: Vec<ScreenTransition>,
}

impl Edge {
    fn matches(&self, source: &str, dest: &str, key: &TriggerKey<'_>) -> bool {
        self.source_screen_id == source
            && self.dest_screen_id == dest
            && trigger_key(self.trigger.as_ref()) == *key
    }
}

/// (operation type, target xpath, target iframe index)
type TriggerKey<'a> = (Option<&'a str>, Option<&'a str>, Option<u32>);

fn trigger_key(trigger: Option<&Trigger>) -> TriggerKey<'_> {
    match trigger {
        Some(t) => (
            Some(t.op_type.as_str()),
            t.target.as_ref().map(|x| x.xpath.as_str()),
            t.target.as_ref().and_then(|x| x.iframe_index),
        ),
        None => (None, None, None),
    }
}

/// One transition per node, walking each window's nodes in order. The
/// destination is the next node of the same window.
pub fn derive_screen_transitions(view: &GraphView) -> Vec<ScreenTransition> {
    let store = &view.store;
    let mut transitions = Vec::new();

    for window in &store.windows {
        let nodes: Vec<&GraphViewNode> = view
            .nodes
            .iter()
            .filter(|n| n.window_id == window.id)
            .collect();

        for (i, node) in nodes.iter().enumerate() {
            let Some(source) = screen_ref(store, &node.screen_id) else {
                continue;
            };
            let destination = nodes
                .get(i + 1)
                .and_then(|next| screen_ref(store, &next.screen_id));

            transitions.push(ScreenTransition {
                window_id: window.id.clone(),
                source,
                destination,
                trigger: node.test_steps.last().map(|s| trigger(store, s)),
                input_elements: input_elements(store, node),
                notes: node
                    .test_steps
                    .iter()
                    .flat_map(|s| s.note_ids.iter())
                    .filter_map(|id| store.note(id))
                    .cloned()
                    .collect(),
                test_purposes: test_purposes(store, &node.test_steps),
            });
        }
    }

    debug!(transitions = transitions.len(), "screen transitions derived");
    transitions
}

fn screen_ref(store: &GraphViewStore, screen_id: &str) -> Option<ScreenRef> {
    store.screen(screen_id).map(|s| ScreenRef {
        id: s.id.clone(),
        name: s.name.clone(),
    })
}

fn trigger(store: &GraphViewStore, step: &GraphTestStep) -> Trigger {
    let target = step
        .target_element_id
        .as_deref()
        .and_then(|id| store.element(id))
        .map(|e| TriggerTarget {
            xpath: e.xpath.clone(),
            text: e.text.clone(),
            iframe_index: e.iframe_index,
        });
    Trigger {
        test_step_id: step.id.clone(),
        op_type: step.op_type.clone(),
        target_element_id: step.target_element_id.clone(),
        target,
        input: step.input.clone(),
        page_url: step.page_url.clone(),
        page_title: step.page_title.clone(),
    }
}

fn input_elements(store: &GraphViewStore, node: &GraphViewNode) -> Vec<InputElement> {
    let mut elements: Vec<InputElement> = node
        .default_values
        .iter()
        .filter_map(|dv| {
            store
                .element(&dv.element_id)
                .map(|e| new_input_element(e, Some(dv.value.clone())))
        })
        .collect();

    for step in node.test_steps.iter().filter(|s| s.op_type == op::CHANGE) {
        let Some(element_id) = step.target_element_id.as_deref() else {
            continue;
        };
        let input = ElementInput {
            test_step_id: step.id.clone(),
            value: step.input.clone(),
        };
        match elements.iter_mut().find(|e| e.id == element_id) {
            Some(existing) => existing.inputs.push(input),
            None => {
                if let Some(e) = store.element(element_id) {
                    let mut element = new_input_element(e, None);
                    element.inputs.push(input);
                    elements.push(element);
                }
            }
        }
    }

    elements
}

fn new_input_element(e: &crate::identity::Element, default_value: Option<String>) -> InputElement {
    InputElement {
        id: e.id.clone(),
        xpath: e.xpath.clone(),
        tagname: e.tagname.clone(),
        text: e.text.clone(),
        attributes: e.attributes.clone(),
        default_value,
        inputs: Vec::new(),
    }
}

fn test_purposes(store: &GraphViewStore, steps: &[GraphTestStep]) -> Vec<TestPurpose> {
    let mut purposes: Vec<TestPurpose> = Vec::new();
    for id in steps.iter().filter_map(|s| s.test_purpose_id.as_deref()) {
        if purposes.iter().any(|p| p.id == id) {
            continue;
        }
        if let Some(purpose) = store.test_purpose(id) {
            purposes.push(purpose.clone());
        }
    }
    purposes
}

/// Collapse transitions into edges keyed by source screen, destination
/// screen, trigger type, trigger xpath and trigger iframe index. Transitions
/// without a destination produce no edge.
pub fn collect_edges(transitions: &[ScreenTransition]) -> Vec<Edge> {
    let mut edges: Vec<Edge> = Vec::new();

    for transition in transitions {
        let Some(dest) = &transition.destination else {
            continue;
        };
        let key = trigger_key(transition.trigger.as_ref());
        match edges
            .iter_mut()
            .find(|e| e.matches(&transition.source.id, &dest.id, &key))
        {
            Some(edge) => edge.details.push(transition.clone()),
            None => edges.push(Edge {
                source_screen_id: transition.source.id.clone(),
                dest_screen_id: dest.id.clone(),
                trigger: transition.trigger.clone(),
                details: vec![transition.clone()],
            }),
        }
    }

    edges
}
