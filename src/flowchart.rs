//! Screen transition diagrams as Mermaid flow-chart text, one per window.
//!
//! Example output:
//! ```text
//! graph TD;
//! s0["Top"];
//! s1["Login"];
//! s0 --> |"click: Sign in"|s1;
//! ```

use serde::Serialize;
use tracing::debug;

use crate::config::DiagramOptions;
use crate::graph::GraphView;
use crate::text::{escape, truncate};
use crate::transition::{collect_edges, derive_screen_transitions, Edge, ScreenTransition, Trigger};

/// Diagram text plus the click-target tables a renderer binds handlers with:
/// Mermaid node `i` is `screen_ids[i]`, link `i` is `edges[i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowChartGraph {
    pub window_id: String,
    pub graph_text: String,
    pub screen_ids: Vec<String>,
    pub edges: Vec<Edge>,
}

pub fn generate_flow_charts(view: &GraphView, options: &DiagramOptions) -> Vec<FlowChartGraph> {
    let transitions = derive_screen_transitions(view);

    view.store
        .windows
        .iter()
        .map(|window| {
            let in_window: Vec<ScreenTransition> = transitions
                .iter()
                .filter(|t| t.window_id == window.id)
                .cloned()
                .collect();
            let chart = flow_chart(&window.id, &in_window, options);
            debug!(
                window = %window.name,
                screens = chart.screen_ids.len(),
                edges = chart.edges.len(),
                "flow chart generated"
            );
            chart
        })
        .collect()
}

/// Render one window's transitions.
pub fn flow_chart(
    window_id: &str,
    transitions: &[ScreenTransition],
    options: &DiagramOptions,
) -> FlowChartGraph {
    let mut screens: Vec<(&str, &str)> = Vec::new();
    let screen_refs = transitions
        .iter()
        .flat_map(|t| std::iter::once(&t.source).chain(t.destination.as_ref()));
    for screen in screen_refs {
        if !screens.iter().any(|(id, _)| *id == screen.id) {
            screens.push((screen.id.as_str(), screen.name.as_str()));
        }
    }

    let edges = collect_edges(transitions);
    let name_limit = options.screen_name_line_length.saturating_sub(3);

    let mut text = String::from("graph TD;\n");
    for (id, name) in &screens {
        text.push_str(&format!("{id}[\"{}\"];\n", escape(&truncate(name, name_limit))));
    }
    for edge in &edges {
        text.push_str(&format!(
            "{} --> |\"{}\"|{};\n",
            edge.source_screen_id,
            trigger_label(edge.trigger.as_ref(), options.trigger_text_limit),
            edge.dest_screen_id
        ));
    }

    FlowChartGraph {
        window_id: window_id.to_string(),
        graph_text: text,
        screen_ids: screens.into_iter().map(|(id, _)| id.to_string()).collect(),
        edges,
    }
}

fn trigger_label(trigger: Option<&Trigger>, limit: usize) -> String {
    match trigger {
        Some(t) => {
            let target_text = t.target.as_ref().map(|x| x.text.as_str()).unwrap_or("");
            format!("{}: {}", t.op_type, escape(&truncate(target_text, limit)))
        }
        None => "screen transition".to_string(),
    }
}
