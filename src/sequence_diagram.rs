//! Sequence diagrams as Mermaid text, one per scenario.
//!
//! Each node becomes an activation of its screen holding the notes of its
//! steps and the message leading to the next node. Contiguous nodes of one
//! window are wrapped in an `opt` block named after the window.

use serde::Serialize;
use tracing::debug;

use crate::config::DiagramOptions;
use crate::sequence::{Scenario, SequenceNode, SequenceView};
use crate::text::{escape, truncate, wrap, LINE_BREAK};

/// Placeholder note text for nodes that would otherwise render nothing.
pub const DUMMY_COMMENT: &str = "DUMMY_COMMENT";

/// What a rendered message arrow refers to, in rendering order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageTarget {
    /// A transition driven by the last step of the node.
    TestStep { node_index: usize, test_step_id: String },
    /// A transition no recorded operation drove.
    ScreenTransition { node_index: usize },
    /// The window or capture state changed; the real transition is unknown.
    Unknown { node_index: usize },
}

/// What a rendered note refers to, in rendering order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoteTarget {
    Note {
        node_index: usize,
        test_step_id: String,
        note_id: String,
    },
    Dummy { node_index: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceDiagramGraph {
    pub test_purpose_id: Option<String>,
    pub graph_text: String,
    pub messages: Vec<MessageTarget>,
    pub notes: Vec<NoteTarget>,
    /// Node index of every `activate` block, in rendering order.
    pub activations: Vec<usize>,
}

pub fn generate_sequence_diagrams(
    view: &SequenceView,
    options: &DiagramOptions,
) -> Vec<SequenceDiagramGraph> {
    view.scenarios
        .iter()
        .map(|scenario| {
            let graph = sequence_diagram(view, scenario, options);
            debug!(
                nodes = scenario.nodes.len(),
                messages = graph.messages.len(),
                notes = graph.notes.len(),
                "sequence diagram generated"
            );
            graph
        })
        .collect()
}

pub fn sequence_diagram(
    view: &SequenceView,
    scenario: &Scenario,
    options: &DiagramOptions,
) -> SequenceDiagramGraph {
    let mut participants: Vec<&str> = Vec::new();
    for node in &scenario.nodes {
        if !participants.contains(&node.screen_id.as_str()) {
            participants.push(&node.screen_id);
        }
    }
    let screen_index = |id: &str| participants.iter().position(|p| *p == id).unwrap_or(0);

    let mut graph = SequenceDiagramGraph {
        test_purpose_id: scenario.test_purpose.as_ref().map(|p| p.id.clone()),
        graph_text: String::from("sequenceDiagram;\n"),
        messages: Vec::new(),
        notes: Vec::new(),
        activations: Vec::new(),
    };

    for &id in &participants {
        let name = view.screen(id).map(|s| s.name.as_str()).unwrap_or(id);
        graph
            .graph_text
            .push_str(&format!("participant {id} as {};\n", escape(name)));
    }

    let nodes = &scenario.nodes;
    for (i, node) in nodes.iter().enumerate() {
        let prev = i.checked_sub(1).map(|p| &nodes[p]);
        let next = nodes.get(i + 1);

        if prev.map_or(true, |p| p.window_id != node.window_id) {
            let window_name = view
                .window(&node.window_id)
                .map(|w| w.name.as_str())
                .unwrap_or(&node.window_id);
            // Labelled with the sequence number of the block's first step.
            let first_seq = nodes[i..]
                .iter()
                .take_while(|n| n.window_id == node.window_id)
                .find_map(|n| n.test_steps.first())
                .map(|s| s.sequence);
            let label = match first_seq {
                Some(seq) => format!("({seq}){window_name}"),
                None => window_name.to_string(),
            };
            graph
                .graph_text
                .push_str(&format!("opt {};\n", escape(&label)));
        }

        let index = screen_index(&node.screen_id);
        let prev_index = prev.map_or(0, |p| screen_index(&p.screen_id));
        let side = if index >= 1 && index >= prev_index {
            "left"
        } else {
            "right"
        };

        graph.activations.push(i);
        graph
            .graph_text
            .push_str(&format!("activate {};\n", node.screen_id));

        let noted = render_notes(&mut graph, i, node, side, options);
        let messaged = match next {
            Some(next) => {
                render_message(&mut graph, i, node, next, options);
                true
            }
            None => false,
        };
        if !noted && !messaged {
            graph.notes.push(NoteTarget::Dummy { node_index: i });
            graph.graph_text.push_str(&format!(
                "Note {side} of {}: {DUMMY_COMMENT};\n",
                node.screen_id
            ));
        }

        graph
            .graph_text
            .push_str(&format!("deactivate {};\n", node.screen_id));

        if next.map_or(true, |n| n.window_id != node.window_id) {
            graph.graph_text.push_str("end;\n");
        }
    }

    graph
}

/// Returns whether any note was written.
fn render_notes(
    graph: &mut SequenceDiagramGraph,
    node_index: usize,
    node: &SequenceNode,
    side: &str,
    options: &DiagramOptions,
) -> bool {
    let mut written = false;
    for step in &node.test_steps {
        for (n, note) in step.notes.iter().enumerate() {
            let tags: String = note.tags.iter().map(|t| format!("[{}]", escape(t))).collect();
            let value = escape(&wrap(&note.value, options.note_wrap_width));
            graph.graph_text.push_str(&format!(
                "Note {side} of {}: ({}-{}){tags}{LINE_BREAK}-{LINE_BREAK}{value};\n",
                node.screen_id,
                step.sequence,
                n + 1,
            ));
            graph.notes.push(NoteTarget::Note {
                node_index,
                test_step_id: step.id.clone(),
                note_id: note.id.clone(),
            });
            written = true;
        }
    }
    written
}

fn render_message(
    graph: &mut SequenceDiagramGraph,
    node_index: usize,
    node: &SequenceNode,
    next: &SequenceNode,
    options: &DiagramOptions,
) {
    let screen = &node.screen_id;

    if node.window_id != next.window_id || node.is_disabled() != next.is_disabled() {
        graph.graph_text.push_str(&format!("{screen} --x {screen}: ;\n"));
        graph.messages.push(MessageTarget::Unknown { node_index });
        return;
    }

    match node.test_steps.last() {
        Some(step) => {
            let text = step.element.as_ref().map(|e| e.text.as_str()).unwrap_or("");
            graph.graph_text.push_str(&format!(
                "{screen} ->> {}: ({}){}: {};\n",
                next.screen_id,
                step.sequence,
                step.op_type,
                escape(&truncate(text, options.message_text_limit))
            ));
            graph.messages.push(MessageTarget::TestStep {
                node_index,
                test_step_id: step.id.clone(),
            });
        }
        None => {
            graph.graph_text.push_str(&format!(
                "{screen} ->> {}: screen transition;\n",
                next.screen_id
            ));
            graph.messages.push(MessageTarget::ScreenTransition { node_index });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{TestPurpose, Window};
    use crate::sequence::{SequenceScreen, SequenceTestStep, StepElement, StepNote};

    fn test_step(id: &str, sequence: usize, text: Option<&str>) -> SequenceTestStep {
        SequenceTestStep {
            id: id.into(),
            sequence,
            op_type: "click".into(),
            input: String::new(),
            element: text.map(|t| StepElement {
                xpath: "/html/body/a".into(),
                tagname: "A".into(),
                text: t.into(),
            }),
            notes: vec![],
        }
    }

    fn node(window: &str, screen: &str, steps: Vec<SequenceTestStep>) -> SequenceNode {
        SequenceNode {
            window_id: window.into(),
            screen_id: screen.into(),
            test_steps: steps,
            disabled: None,
        }
    }

    fn view(nodes: Vec<SequenceNode>) -> SequenceView {
        SequenceView {
            windows: vec![
                Window {
                    id: "w0".into(),
                    name: "window1".into(),
                },
                Window {
                    id: "w1".into(),
                    name: "window2".into(),
                },
            ],
            screens: vec![
                SequenceScreen {
                    id: "s0".into(),
                    name: "Top".into(),
                },
                SequenceScreen {
                    id: "s1".into(),
                    name: "Login".into(),
                },
            ],
            scenarios: vec![Scenario {
                test_purpose: Some(TestPurpose {
                    id: "p0".into(),
                    value: "login".into(),
                    details: String::new(),
                }),
                nodes,
            }],
        }
    }

    fn render(view: &SequenceView) -> SequenceDiagramGraph {
        sequence_diagram(view, &view.scenarios[0], &DiagramOptions::default())
    }

    #[test]
    fn normal_transition_between_screens() {
        let v = view(vec![
            node("w0", "s0", vec![test_step("a", 1, Some("Sign in"))]),
            node("w0", "s1", vec![test_step("b", 2, None)]),
        ]);
        let graph = render(&v);
        assert_eq!(
            graph.graph_text,
            "sequenceDiagram;\n\
             participant s0 as Top;\n\
             participant s1 as Login;\n\
             opt (1)window1;\n\
             activate s0;\n\
             s0 ->> s1: (1)click: Sign in;\n\
             deactivate s0;\n\
             activate s1;\n\
             Note left of s1: DUMMY_COMMENT;\n\
             deactivate s1;\n\
             end;\n"
        );
        assert_eq!(graph.test_purpose_id.as_deref(), Some("p0"));
        assert_eq!(
            graph.messages,
            vec![MessageTarget::TestStep {
                node_index: 0,
                test_step_id: "a".into()
            }]
        );
        assert_eq!(graph.notes, vec![NoteTarget::Dummy { node_index: 1 }]);
        assert_eq!(graph.activations, vec![0, 1]);
    }

    #[test]
    fn window_change_renders_unknown_arrow_and_blocks() {
        let v = view(vec![
            node("w0", "s0", vec![test_step("a", 1, None)]),
            node("w1", "s1", vec![test_step("b", 2, None)]),
        ]);
        let text = render(&v).graph_text;
        assert!(text.contains("opt (1)window1;\nactivate s0;\ns0 --x s0: ;\ndeactivate s0;\nend;\nopt (2)window2;\n"));
    }

    #[test]
    fn disabled_change_renders_unknown_arrow() {
        let mut paused = node("w0", "s0", vec![]);
        paused.disabled = Some(true);
        let v = view(vec![node("w0", "s0", vec![test_step("a", 1, None)]), paused]);
        let graph = render(&v);
        assert!(graph.graph_text.contains("s0 --x s0: ;"));
        assert_eq!(graph.messages, vec![MessageTarget::Unknown { node_index: 0 }]);
    }

    #[test]
    fn stepless_node_renders_screen_transition_label() {
        let mut a = node("w0", "s0", vec![]);
        a.disabled = Some(true);
        let mut b = node("w0", "s1", vec![]);
        b.disabled = Some(true);
        let graph = render(&view(vec![a, b]));
        assert!(graph.graph_text.contains("s0 ->> s1: screen transition;"));
    }

    #[test]
    fn notes_are_wrapped_tagged_and_escaped() {
        let mut step = test_step("a", 3, None);
        step.notes = vec![
            StepNote {
                id: "n0".into(),
                value: "value<is>broken;over sixteen columns".into(),
                details: String::new(),
                tags: vec!["bug".into(), "ui".into()],
            },
            StepNote {
                id: "n1".into(),
                value: "ok".into(),
                details: String::new(),
                tags: vec![],
            },
        ];
        let graph = render(&view(vec![node("w0", "s0", vec![step])]));
        assert!(graph.graph_text.contains(
            "Note right of s0: (3-1)[bug][ui]<br/>-<br/>value#60;is#62;broken#59;<br/>over sixteen col<br/>umns;\n"
        ), "{}", graph.graph_text);
        assert!(graph.graph_text.contains("Note right of s0: (3-2)<br/>-<br/>ok;\n"));
        assert_eq!(graph.notes.len(), 2);
    }

    #[test]
    fn note_side_follows_screen_order() {
        let v = view(vec![
            node("w0", "s0", vec![test_step("a", 1, None)]),
            node("w0", "s1", vec![test_step("b", 2, None)]),
            node("w0", "s0", vec![test_step("c", 3, None)]),
        ]);
        let text = render(&v).graph_text;
        assert!(text.contains("activate s1;\ns1 ->> s0"));
        assert!(text.ends_with("activate s0;\nNote right of s0: DUMMY_COMMENT;\ndeactivate s0;\nend;\n"));
    }

    #[test]
    fn message_text_truncated_to_twenty() {
        let v = view(vec![
            node("w0", "s0", vec![test_step("a", 1, Some("aaaaaaaaaaaaaaaaaaaaa"))]),
            node("w0", "s1", vec![]),
        ]);
        assert!(render(&v)
            .graph_text
            .contains("s0 ->> s1: (1)click: aaaaaaaaaaaaaaaaaaaa...;"));
    }
}
