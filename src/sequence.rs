//! Sequence view: test steps segmented into purpose-scoped scenarios, each a
//! run of window/screen nodes. Nodes recorded while capture was paused are
//! marked disabled.

use serde::Serialize;
use tracing::debug;

use crate::graph::{collect_windows, TestPurpose, Window};
use crate::ids::ScreenIdGenerator;
use crate::model::{op, Note, TestStep};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceScreen {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepElement {
    pub xpath: String,
    pub tagname: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepNote {
    pub id: String,
    pub value: String,
    pub details: String,
    pub tags: Vec<String>,
}

impl From<&Note> for StepNote {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            value: note.value.clone(),
            details: note.details.clone(),
            tags: note.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceTestStep {
    pub id: String,
    /// 1-based position of the step in the whole test result.
    pub sequence: usize,
    #[serde(rename = "type")]
    pub op_type: String,
    pub input: String,
    pub element: Option<StepElement>,
    pub notes: Vec<StepNote>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceNode {
    pub window_id: String,
    pub screen_id: String,
    pub test_steps: Vec<SequenceTestStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl SequenceNode {
    pub fn is_disabled(&self) -> bool {
        self.disabled == Some(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub test_purpose: Option<TestPurpose>,
    pub nodes: Vec<SequenceNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SequenceView {
    pub windows: Vec<Window>,
    pub screens: Vec<SequenceScreen>,
    pub scenarios: Vec<Scenario>,
}

impl SequenceView {
    pub fn screen(&self, id: &str) -> Option<&SequenceScreen> {
        self.screens.iter().find(|s| s.id == id)
    }

    pub fn window(&self, id: &str) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == id)
    }
}

/// Build the sequence view over the full, unfiltered step list of a test result.
pub fn build_sequence_view(
    test_result_id: &str,
    test_steps: &[TestStep],
    ids: &mut impl ScreenIdGenerator,
) -> SequenceView {
    let windows = collect_windows(test_steps.iter().map(|s| s.operation.window_handle.as_str()));

    let mut screens: Vec<SequenceScreen> = Vec::new();
    for step in test_steps {
        if !screens.iter().any(|s| s.name == step.screen_def) {
            screens.push(SequenceScreen {
                id: ids.generate_screen_id(),
                name: step.screen_def.clone(),
            });
        }
    }
    let screen_id = |def: &str| {
        screens
            .iter()
            .find(|s| s.name == def)
            .map(|s| s.id.clone())
            .unwrap_or_default()
    };

    let mut scenarios = vec![Scenario {
        test_purpose: None,
        nodes: Vec::new(),
    }];
    let mut paused = false;
    let mut prev: Option<&TestStep> = None;

    for (i, step) in test_steps.iter().enumerate() {
        if let Some(intention) = &step.intention {
            let current = scenarios
                .last()
                .and_then(|s| s.test_purpose.as_ref())
                .map(|p| p.id.as_str());
            if current != Some(intention.id.as_str()) {
                let purpose = Some(TestPurpose::from(intention));
                match scenarios.last_mut() {
                    Some(open) if open.nodes.is_empty() => open.test_purpose = purpose,
                    _ => scenarios.push(Scenario {
                        test_purpose: purpose,
                        nodes: Vec::new(),
                    }),
                }
                prev = None;
            }
        }

        let resumes = paused && step.operation.is_resume();
        if resumes {
            paused = false;
        }

        let starts_node = match prev {
            None => true,
            Some(p) => {
                p.operation.window_handle != step.operation.window_handle
                    || p.screen_def != step.screen_def
                    || p.operation.is(op::PAUSE_CAPTURING)
                    || step.operation.is(op::SCREEN_TRANSITION)
                    || resumes
            }
        };

        let Some(scenario) = scenarios.last_mut() else {
            continue;
        };
        if starts_node {
            scenario.nodes.push(SequenceNode {
                window_id: step.operation.window_handle.clone(),
                screen_id: screen_id(&step.screen_def),
                test_steps: Vec::new(),
                disabled: paused.then_some(true),
            });
        }
        if let Some(node) = scenario.nodes.last_mut() {
            node.test_steps.push(project_step(step, i + 1));
        }

        if step.operation.is(op::PAUSE_CAPTURING) {
            paused = true;
            scenario.nodes.push(SequenceNode {
                window_id: step.operation.window_handle.clone(),
                screen_id: screen_id(&step.screen_def),
                test_steps: Vec::new(),
                disabled: Some(true),
            });
        }
        prev = Some(step);
    }

    scenarios.retain(|s| !s.nodes.is_empty());

    debug!(
        test_result_id = %test_result_id,
        steps = test_steps.len(),
        scenarios = scenarios.len(),
        screens = screens.len(),
        "sequence view built"
    );

    SequenceView {
        windows,
        screens,
        scenarios,
    }
}

fn project_step(step: &TestStep, sequence: usize) -> SequenceTestStep {
    let op = &step.operation;
    SequenceTestStep {
        id: step.id.clone(),
        sequence,
        op_type: op.op_type.clone(),
        input: op.input.clone(),
        element: op.element_info.as_ref().map(|info| StepElement {
            xpath: info.xpath.clone(),
            tagname: info.tagname.clone(),
            text: info.text_or_empty().to_string(),
        }),
        notes: step.notes().map(StepNote::from).collect(),
    }
}
