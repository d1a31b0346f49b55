use crate::graph::{GraphTestStep, GraphView, GraphViewStore};
use crate::sequence::{SequenceTestStep, SequenceView};

/// Serialize a GraphView into a compact text outline.
///
/// Example output:
/// ```text
/// graph: 1 windows, 2 screens, 3 elements
/// ---
/// window1:
///   screen "Top" @s0:
///     click -> button "Sign in"
///   screen "Login" @s1:
///     change = "alice" -> input "name"
///     defaults: name = "alice"
/// ```
pub fn graph_to_text(view: &GraphView) -> String {
    let store = &view.store;
    let mut output = format!(
        "graph: {} windows, {} screens, {} elements\n---\n",
        store.windows.len(),
        store.screens.len(),
        store.elements.len()
    );

    let mut current_window: Option<&str> = None;
    for node in &view.nodes {
        if current_window != Some(node.window_id.as_str()) {
            let name = store
                .window(&node.window_id)
                .map(|w| w.name.as_str())
                .unwrap_or(node.window_id.as_str());
            output.push_str(&format!("{name}:\n"));
            current_window = Some(node.window_id.as_str());
        }

        let screen_name = store
            .screen(&node.screen_id)
            .map(|s| s.name.as_str())
            .unwrap_or("");
        output.push_str(&format!("  screen \"{screen_name}\" @{}:\n", node.screen_id));

        for step in &node.test_steps {
            serialize_graph_step(step, store, &mut output);
        }

        if !node.default_values.is_empty() {
            let defaults: Vec<String> = node
                .default_values
                .iter()
                .map(|d| format!("{} = \"{}\"", element_label(store, &d.element_id), d.value))
                .collect();
            output.push_str(&format!("    defaults: {}\n", defaults.join(", ")));
        }
    }

    output
}

fn serialize_graph_step(step: &GraphTestStep, store: &GraphViewStore, output: &mut String) {
    output.push_str(&format!("    {}", step.op_type));
    if !step.input.is_empty() {
        output.push_str(&format!(" = \"{}\"", step.input));
    }
    if let Some(element) = step.target_element_id.as_deref().and_then(|id| store.element(id)) {
        output.push_str(&format!(" -> {}", describe(&element.tagname, &element.text, &element.xpath)));
    }
    output.push('\n');

    for note in step.note_ids.iter().filter_map(|id| store.note(id)) {
        output.push_str(&format!("      note \"{}\"", note.value));
        if !note.tags.is_empty() {
            output.push_str(&format!(" [{}]", note.tags.join(", ")));
        }
        output.push('\n');
    }
}

/// The element's `name` attribute, or its id when it has none.
fn element_label(store: &GraphViewStore, element_id: &str) -> String {
    store
        .element(element_id)
        .and_then(|e| e.attributes.get("name").cloned())
        .unwrap_or_else(|| element_id.to_string())
}

fn describe(tagname: &str, text: &str, xpath: &str) -> String {
    let tag = tagname.to_ascii_lowercase();
    if text.is_empty() {
        format!("{tag} {xpath}")
    } else {
        format!("{tag} \"{text}\"")
    }
}

/// Serialize a SequenceView into a compact text outline.
///
/// Example output:
/// ```text
/// sequence: 2 scenarios
/// ---
/// scenario "login":
///   window1 screen "Top" @s0:
///     (1) click -> button "Sign in"
///   window1 screen "Login" @s1 [disabled]
/// ```
pub fn sequence_to_text(view: &SequenceView) -> String {
    let mut output = format!("sequence: {} scenarios\n---\n", view.scenarios.len());

    for scenario in &view.scenarios {
        match &scenario.test_purpose {
            Some(purpose) => output.push_str(&format!("scenario \"{}\":\n", purpose.value)),
            None => output.push_str("scenario:\n"),
        }

        for node in &scenario.nodes {
            let window = view
                .window(&node.window_id)
                .map(|w| w.name.as_str())
                .unwrap_or(node.window_id.as_str());
            let screen = view.screen(&node.screen_id).map(|s| s.name.as_str()).unwrap_or("");
            output.push_str(&format!("  {window} screen \"{screen}\" @{}", node.screen_id));
            if node.is_disabled() {
                output.push_str(" [disabled]");
            }

            if node.test_steps.is_empty() {
                output.push('\n');
                continue;
            }
            output.push_str(":\n");
            for step in &node.test_steps {
                serialize_sequence_step(step, &mut output);
            }
        }
    }

    output
}

fn serialize_sequence_step(step: &SequenceTestStep, output: &mut String) {
    output.push_str(&format!("    ({}) {}", step.sequence, step.op_type));
    if !step.input.is_empty() {
        output.push_str(&format!(" = \"{}\"", step.input));
    }
    if let Some(element) = &step.element {
        output.push_str(&format!(" -> {}", describe(&element.tagname, &element.text, &element.xpath)));
    }
    output.push('\n');

    for note in &step.notes {
        output.push_str(&format!("      note \"{}\"", note.value));
        if !note.tags.is_empty() {
            output.push_str(&format!(" [{}]", note.tags.join(", ")));
        }
        output.push('\n');
    }
}
