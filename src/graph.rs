//! Graph view: the screen-transition graph of a test result.
//!
//! Test steps are grouped into nodes, each a contiguous run sharing one window
//! and one screen. Windows, screens, elements, notes and test purposes are
//! deduplicated into a store that nodes refer to by id.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::identity::{normalize_xpath, Element, ElementMapper};
use crate::ids::IdGenerator;
use crate::model::{is_radio, op, CoverageSource, ElementInfo, Note, TestStep};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Window {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Screen {
    pub id: String,
    pub name: String,
    pub element_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestPurpose {
    pub id: String,
    pub value: String,
    pub details: String,
}

impl From<&Note> for TestPurpose {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            value: note.value.clone(),
            details: note.details.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadioGroup {
    pub name: String,
    pub element_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphViewStore {
    pub windows: Vec<Window>,
    pub screens: Vec<Screen>,
    pub elements: Vec<Element>,
    pub test_purposes: Vec<TestPurpose>,
    pub notes: Vec<Note>,
    pub radio_group: Vec<RadioGroup>,
}

impl GraphViewStore {
    pub fn screen(&self, id: &str) -> Option<&Screen> {
        self.screens.iter().find(|s| s.id == id)
    }

    pub fn window(&self, id: &str) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn test_purpose(&self, id: &str) -> Option<&TestPurpose> {
        self.test_purposes.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphTestStep {
    pub id: String,
    #[serde(rename = "type")]
    pub op_type: String,
    pub input: String,
    pub target_element_id: Option<String>,
    pub note_ids: Vec<String>,
    pub test_purpose_id: Option<String>,
    pub page_url: String,
    pub page_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultValue {
    pub element_id: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphViewNode {
    pub window_id: String,
    pub screen_id: String,
    pub test_steps: Vec<GraphTestStep>,
    pub default_values: Vec<DefaultValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphView {
    pub nodes: Vec<GraphViewNode>,
    pub store: GraphViewStore,
}

/// Build the graph view. `test_steps` must already be free of capture
/// bookkeeping steps (see [`crate::model::TestResult::graph_steps`]).
pub fn build_graph_view(
    test_steps: &[TestStep],
    coverage_sources: &[CoverageSource],
    ids: &mut impl IdGenerator,
) -> GraphView {
    let sources = normalized_sources(coverage_sources);
    let mapper = ElementMapper::new(&sources, ids);

    let screens = collect_screens(test_steps, &mapper, ids);
    let windows = collect_windows(test_steps.iter().map(|s| s.operation.window_handle.as_str()));

    let targets: Vec<Option<String>> = test_steps
        .iter()
        .map(|step| {
            let op = &step.operation;
            op.element_info
                .as_ref()
                .and_then(|info| resolve(&mapper, &op.url, &op.title, info))
                .map(|e| e.id.clone())
        })
        .collect();

    let unresolved = test_steps
        .iter()
        .zip(&targets)
        .filter(|(s, t)| s.operation.element_info.is_some() && t.is_none())
        .count();
    if unresolved > 0 {
        warn!(unresolved, "test steps target elements missing from coverage sources");
    }

    let triggers = collect_trigger_elements(test_steps, &targets);
    let screen_ids: HashMap<&str, &str> = screens
        .iter()
        .map(|s| (s.name.as_str(), s.id.as_str()))
        .collect();

    let mut nodes: Vec<GraphViewNode> = Vec::new();
    let mut node_ranges: Vec<(usize, usize)> = Vec::new();

    for (i, step) in test_steps.iter().enumerate() {
        let starts_node = i == 0
            || step.operation.is(op::SCREEN_TRANSITION)
            || targets[i - 1]
                .as_ref()
                .is_some_and(|prev| triggers.contains(prev));

        if starts_node {
            nodes.push(GraphViewNode {
                window_id: step.operation.window_handle.clone(),
                screen_id: screen_ids
                    .get(step.screen_def.as_str())
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
                test_steps: Vec::new(),
                default_values: Vec::new(),
            });
            node_ranges.push((i, i));
        }

        if let (Some(node), Some(range)) = (nodes.last_mut(), node_ranges.last_mut()) {
            node.test_steps.push(project_step(step, targets[i].clone()));
            range.1 = i + 1;
        }
    }

    for (node, &(start, end)) in nodes.iter_mut().zip(&node_ranges) {
        node.default_values = collect_default_values(&test_steps[start..end], &mapper);
    }

    let elements: Vec<Element> = mapper.collect_elements(None).into_iter().cloned().collect();
    let radio_group = collect_radio_groups(&elements);

    debug!(
        steps = test_steps.len(),
        nodes = nodes.len(),
        screens = screens.len(),
        windows = windows.len(),
        triggers = triggers.len(),
        "graph view built"
    );

    GraphView {
        nodes,
        store: GraphViewStore {
            windows,
            screens,
            elements,
            test_purposes: collect_test_purposes(test_steps),
            notes: collect_notes(test_steps),
            radio_group,
        },
    }
}

fn normalized_sources(sources: &[CoverageSource]) -> Vec<CoverageSource> {
    sources
        .iter()
        .map(|source| {
            let mut source = source.clone();
            for captured in &mut source.screen_elements {
                captured.element.xpath = normalize_xpath(&captured.element.xpath);
            }
            source
        })
        .collect()
}

fn resolve<'a>(
    mapper: &'a ElementMapper,
    page_url: &str,
    page_title: &str,
    info: &ElementInfo,
) -> Option<&'a Element> {
    mapper.find_element(page_url, page_title, &normalize_xpath(&info.xpath), info.iframe_index)
}

fn collect_screens(
    test_steps: &[TestStep],
    mapper: &ElementMapper,
    ids: &mut impl IdGenerator,
) -> Vec<Screen> {
    let mut screens: Vec<Screen> = Vec::new();
    for step in test_steps {
        if screens.iter().any(|s| s.name == step.screen_def) {
            continue;
        }
        screens.push(Screen {
            id: ids.generate_screen_id(),
            name: step.screen_def.clone(),
            element_ids: mapper
                .collect_elements(Some(&step.screen_def))
                .into_iter()
                .map(|e| e.id.clone())
                .collect(),
        });
    }
    screens
}

/// One window per distinct handle in first-seen order, named `window1`, `window2`, ...
pub(crate) fn collect_windows<'a>(handles: impl Iterator<Item = &'a str>) -> Vec<Window> {
    let mut windows: Vec<Window> = Vec::new();
    for handle in handles {
        if windows.iter().any(|w| w.id == handle) {
            continue;
        }
        windows.push(Window {
            id: handle.to_string(),
            name: format!("window{}", windows.len() + 1),
        });
    }
    windows
}

/// Elements whose operation is inferred to have caused a screen change: the
/// target of the last step of every screen-bounded group that is followed by
/// a group with a window and a screen.
fn collect_trigger_elements(test_steps: &[TestStep], targets: &[Option<String>]) -> HashSet<String> {
    let mut group_starts: Vec<usize> = Vec::new();
    for (i, step) in test_steps.iter().enumerate() {
        if i == 0 || step.operation.is(op::SCREEN_TRANSITION) {
            group_starts.push(i);
        }
    }

    let mut triggers = HashSet::new();
    for pair in group_starts.windows(2) {
        let next = &test_steps[pair[1]];
        if next.operation.window_handle.is_empty() || next.screen_def.is_empty() {
            continue;
        }
        if let Some(target) = &targets[pair[1] - 1] {
            triggers.insert(target.clone());
        }
    }
    triggers
}

fn project_step(step: &TestStep, target_element_id: Option<String>) -> GraphTestStep {
    let op = &step.operation;
    GraphTestStep {
        id: step.id.clone(),
        op_type: op.op_type.clone(),
        input: op.input.clone(),
        target_element_id,
        note_ids: step.notes().map(|n| n.id.clone()).collect(),
        test_purpose_id: step.intention.as_ref().map(|p| p.id.clone()),
        page_url: op.url.clone(),
        page_title: op.title.clone(),
    }
}

/// Last-known value of every input element seen during a node.
fn collect_default_values(steps: &[TestStep], mapper: &ElementMapper) -> Vec<DefaultValue> {
    let mut scanned: Vec<DefaultValue> = steps
        .iter()
        .rev()
        .filter(|s| !s.operation.input_elements.is_empty())
        .flat_map(|s| {
            let op = &s.operation;
            op.input_elements.iter().rev().filter_map(move |info| {
                resolve(mapper, &op.url, &op.title, info).map(|e| DefaultValue {
                    element_id: e.id.clone(),
                    value: info.current_value(),
                })
            })
        })
        .collect();
    scanned.reverse();

    let mut values: Vec<DefaultValue> = Vec::new();
    for value in scanned {
        match values.iter_mut().find(|v| v.element_id == value.element_id) {
            Some(existing) => existing.value = value.value,
            None => values.push(value),
        }
    }
    values
}

fn collect_test_purposes(test_steps: &[TestStep]) -> Vec<TestPurpose> {
    let mut purposes: Vec<TestPurpose> = Vec::new();
    for intention in test_steps.iter().filter_map(|s| s.intention.as_ref()) {
        if !purposes.iter().any(|p| p.id == intention.id) {
            purposes.push(TestPurpose::from(intention));
        }
    }
    purposes
}

fn collect_notes(test_steps: &[TestStep]) -> Vec<Note> {
    let mut notes: Vec<Note> = Vec::new();
    for note in test_steps.iter().flat_map(|s| s.notes()) {
        if !notes.iter().any(|n| n.id == note.id) {
            notes.push(note.clone());
        }
    }
    notes
}

fn collect_radio_groups(elements: &[Element]) -> Vec<RadioGroup> {
    let mut groups: Vec<RadioGroup> = Vec::new();
    for element in elements {
        let radio = is_radio(&element.tagname, &element.attributes);
        let Some(name) = element.attributes.get("name").filter(|_| radio) else {
            continue;
        };
        match groups.iter_mut().find(|g| &g.name == name) {
            Some(group) => group.element_ids.push(element.id.clone()),
            None => groups.push(RadioGroup {
                name: name.clone(),
                element_ids: vec![element.id.clone()],
            }),
        }
    }
    groups
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::model::{CapturedElement, Operation};

    pub(crate) fn element(xpath: &str, text: &str) -> ElementInfo {
        ElementInfo {
            tagname: "BUTTON".into(),
            xpath: xpath.into(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub(crate) fn text_input(xpath: &str, value: &str) -> ElementInfo {
        ElementInfo {
            tagname: "INPUT".into(),
            xpath: xpath.into(),
            value: Some(value.into()),
            attributes: [("type".to_string(), "text".to_string())].into(),
            ..Default::default()
        }
    }

    pub(crate) fn step(
        id: &str,
        op_type: &str,
        window: &str,
        screen: &str,
        target: Option<ElementInfo>,
    ) -> TestStep {
        TestStep {
            id: id.into(),
            screen_def: screen.into(),
            operation: Operation {
                op_type: op_type.into(),
                url: format!("https://example.com/{screen}"),
                title: screen.into(),
                window_handle: window.into(),
                element_info: target,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub(crate) fn coverage(screen: &str, elements: Vec<ElementInfo>) -> CoverageSource {
        CoverageSource {
            screen_def: screen.into(),
            screen_elements: elements
                .into_iter()
                .map(|element| CapturedElement {
                    page_url: format!("https://example.com/{screen}"),
                    page_title: screen.into(),
                    element,
                })
                .collect(),
        }
    }

    fn node_step_ids(view: &GraphView) -> Vec<Vec<&str>> {
        view.nodes
            .iter()
            .map(|n| n.test_steps.iter().map(|s| s.id.as_str()).collect())
            .collect()
    }

    #[test]
    fn empty_input_produces_empty_view() {
        let view = build_graph_view(&[], &[], &mut SequentialIds::new());
        assert!(view.nodes.is_empty());
        assert!(view.store.screens.is_empty());
    }

    #[test]
    fn screens_and_windows_in_first_seen_order() {
        let steps = vec![
            step("1", "click", "w1", "Top", None),
            step("2", op::SCREEN_TRANSITION, "w2", "Login", None),
            step("3", op::SCREEN_TRANSITION, "w1", "Top", None),
        ];
        let view = build_graph_view(&steps, &[], &mut SequentialIds::new());
        let screens: Vec<(&str, &str)> = view
            .store
            .screens
            .iter()
            .map(|s| (s.id.as_str(), s.name.as_str()))
            .collect();
        assert_eq!(screens, vec![("s0", "Top"), ("s1", "Login")]);
        assert_eq!(view.store.windows[0].name, "window1");
        assert_eq!(view.store.windows[1].id, "w2");
        assert_eq!(view.store.windows[1].name, "window2");
    }

    #[test]
    fn screen_transition_opens_node() {
        let steps = vec![
            step("1", "click", "w1", "Top", None),
            step("2", "click", "w1", "Top", None),
            step("3", op::SCREEN_TRANSITION, "w1", "Login", None),
            step("4", "change", "w1", "Login", None),
        ];
        let view = build_graph_view(&steps, &[], &mut SequentialIds::new());
        assert_eq!(node_step_ids(&view), vec![vec!["1", "2"], vec!["3", "4"]]);
        assert_eq!(view.nodes[1].screen_id, "s1");
    }

    #[test]
    fn known_trigger_element_splits_later_nodes() {
        let link = element("/html/body/a", "Next");
        let sources = vec![coverage("Top", vec![link.clone()])];
        let steps = vec![
            step("1", "click", "w1", "Top", Some(link.clone())),
            step("2", op::SCREEN_TRANSITION, "w1", "Next", None),
            step("3", op::SCREEN_TRANSITION, "w1", "Top", None),
            step("4", "click", "w1", "Top", Some(link)),
            // no screen_transition recorded, but the link is a known trigger
            step("5", "click", "w1", "Top", None),
        ];
        let view = build_graph_view(&steps, &sources, &mut SequentialIds::new());
        assert_eq!(
            node_step_ids(&view),
            vec![vec!["1"], vec!["2"], vec!["3", "4"], vec!["5"]]
        );
    }

    #[test]
    fn mid_group_clicks_are_not_triggers() {
        let a = element("/html/body/a", "A");
        let b = element("/html/body/b", "B");
        let sources = vec![coverage("Top", vec![a.clone(), b.clone()])];
        let steps = vec![
            step("1", "click", "w1", "Top", Some(a.clone())),
            step("2", "click", "w1", "Top", Some(b)),
            step("3", op::SCREEN_TRANSITION, "w1", "Next", None),
            step("4", op::SCREEN_TRANSITION, "w1", "Top", None),
            step("5", "click", "w1", "Top", Some(a)),
            step("6", "click", "w1", "Top", None),
        ];
        let view = build_graph_view(&steps, &sources, &mut SequentialIds::new());
        assert_eq!(
            node_step_ids(&view),
            vec![vec!["1", "2"], vec!["3"], vec!["4", "5", "6"]]
        );
    }

    #[test]
    fn unresolved_element_keeps_step() {
        let steps = vec![step("1", "click", "w1", "Top", Some(element("/html/body/x", "X")))];
        let view = build_graph_view(&steps, &[], &mut SequentialIds::new());
        assert_eq!(view.nodes[0].test_steps.len(), 1);
        assert_eq!(view.nodes[0].test_steps[0].target_element_id, None);
    }

    #[test]
    fn xpath_index_one_is_normalized_for_lookup() {
        let sources = vec![coverage("Top", vec![element("/html[1]/body[1]/a", "A")])];
        let steps = vec![step("1", "click", "w1", "Top", Some(element("/html/body/a", "A")))];
        let view = build_graph_view(&steps, &sources, &mut SequentialIds::new());
        assert_eq!(view.nodes[0].test_steps[0].target_element_id.as_deref(), Some("e0"));
        assert_eq!(view.store.screens[0].element_ids, vec!["e0"]);
    }

    #[test]
    fn default_values_last_write_wins_in_first_seen_order() {
        let name = text_input("/html/body/input[2]", "");
        let mail = text_input("/html/body/input[3]", "");
        let sources = vec![coverage("Form", vec![name.clone(), mail.clone()])];

        let mut first = step("1", "click", "w1", "Form", None);
        first.operation.input_elements = vec![
            text_input("/html/body/input[2]", "alice"),
            text_input("/html/body/input[3]", "a@example.com"),
        ];
        let middle = step("2", "click", "w1", "Form", None);
        let mut last = step("3", "click", "w1", "Form", None);
        last.operation.input_elements = vec![text_input("/html/body/input[2]", "bob")];

        let view = build_graph_view(&[first, middle, last], &sources, &mut SequentialIds::new());
        let values: Vec<(&str, &str)> = view.nodes[0]
            .default_values
            .iter()
            .map(|v| (v.element_id.as_str(), v.value.as_str()))
            .collect();
        assert_eq!(values, vec![("e0", "bob"), ("e1", "a@example.com")]);
    }

    #[test]
    fn notes_and_purposes_deduplicated() {
        let purpose = Note {
            id: "p0".into(),
            value: "login".into(),
            details: String::new(),
            tags: vec![],
            image_file_url: None,
        };
        let bug = Note {
            id: "n0".into(),
            value: "broken".into(),
            ..purpose.clone()
        };
        let mut a = step("1", "click", "w1", "Top", None);
        a.intention = Some(purpose.clone());
        a.bugs = vec![bug.clone()];
        let mut b = step("2", "click", "w1", "Top", None);
        b.intention = Some(purpose);
        b.notices = vec![bug];

        let view = build_graph_view(&[a, b], &[], &mut SequentialIds::new());
        assert_eq!(view.store.test_purposes.len(), 1);
        assert_eq!(view.store.notes.len(), 1);
        assert_eq!(view.nodes[0].test_steps[0].note_ids, vec!["n0"]);
        assert_eq!(view.nodes[0].test_steps[1].test_purpose_id.as_deref(), Some("p0"));
    }

    #[test]
    fn radio_buttons_grouped_by_name() {
        let radio = |xpath: &str| ElementInfo {
            tagname: "INPUT".into(),
            xpath: xpath.into(),
            attributes: [
                ("type".to_string(), "radio".to_string()),
                ("name".to_string(), "plan".to_string()),
            ]
            .into(),
            ..Default::default()
        };
        let sources = vec![coverage("Form", vec![radio("/r[2]"), radio("/r[3]")])];
        let view = build_graph_view(&[], &sources, &mut SequentialIds::new());
        assert_eq!(view.store.radio_group.len(), 1);
        assert_eq!(view.store.radio_group[0].element_ids, vec!["e0", "e1"]);
    }
}
