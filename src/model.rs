use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Operation types with special meaning for view generation.
pub mod op {
    pub const SCREEN_TRANSITION: &str = "screen_transition";
    pub const PAUSE_CAPTURING: &str = "pause_capturing";
    pub const RESUME_CAPTURING: &str = "resume_capturing";
    pub const START_CAPTURING: &str = "start_capturing";
    pub const OPEN_WINDOW: &str = "open_window";
    pub const CHANGE: &str = "change";
}

/// A note attached to a test step. Test purposes (intentions) share the shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub value: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_file_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// A DOM element as observed by the capture agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementInfo {
    pub tagname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub xpath: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iframe_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_rect: Option<BoundingRect>,
    #[serde(default)]
    pub inner_height: f64,
    #[serde(default)]
    pub inner_width: f64,
    #[serde(default)]
    pub outer_height: f64,
    #[serde(default)]
    pub outer_width: f64,
}

impl ElementInfo {
    /// The value an input-capable element currently shows. Checkable inputs
    /// report their checked state instead of the `value` attribute.
    pub fn current_value(&self) -> String {
        match self.checked {
            Some(checked) if self.is_checkable() => checked.to_string(),
            _ => self.value.clone().unwrap_or_default(),
        }
    }

    pub fn is_checkable(&self) -> bool {
        self.tagname.eq_ignore_ascii_case("input")
            && matches!(
                self.attributes.get("type").map(String::as_str),
                Some("checkbox") | Some("radio")
            )
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Whether a tag and attribute set describe an `<input type="radio">`.
pub fn is_radio(tagname: &str, attributes: &BTreeMap<String, String>) -> bool {
    tagname.eq_ignore_ascii_case("input")
        && attributes.get("type").map(String::as_str) == Some("radio")
}

/// One captured user operation (or bookkeeping event such as a pause).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub window_handle: String,
    #[serde(default)]
    pub element_info: Option<ElementInfo>,
    #[serde(default)]
    pub input_elements: Vec<ElementInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_size: Option<Size>,
}

impl Operation {
    pub fn is(&self, op_type: &str) -> bool {
        self.op_type == op_type
    }

    /// Whether capture resumes with this operation.
    pub fn is_resume(&self) -> bool {
        self.is(op::RESUME_CAPTURING) || self.is(op::START_CAPTURING)
    }
}

/// One captured operation plus the notes and purpose attached to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    pub id: String,
    pub screen_def: String,
    pub operation: Operation,
    #[serde(default)]
    pub intention: Option<Note>,
    #[serde(default)]
    pub bugs: Vec<Note>,
    #[serde(default)]
    pub notices: Vec<Note>,
    /// Visible texts of the page, used by keyword screen conditions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyword_set: Vec<String>,
}

impl TestStep {
    /// Bugs followed by notices, the order notes are displayed in.
    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.bugs.iter().chain(self.notices.iter())
    }
}

/// An element from a coverage catalog, tagged with the page it was seen on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedElement {
    pub page_url: String,
    pub page_title: String,
    #[serde(flatten)]
    pub element: ElementInfo,
}

/// Every element ever observed on one screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSource {
    pub screen_def: String,
    #[serde(default)]
    pub screen_elements: Vec<CapturedElement>,
}

/// A persisted test result: the ordered steps plus the coverage catalogs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub test_steps: Vec<TestStep>,
    #[serde(default)]
    pub coverage_sources: Vec<CoverageSource>,
}

impl TestResult {
    /// Steps relevant to the graph view: capture bookkeeping is dropped.
    pub fn graph_steps(&self) -> Vec<TestStep> {
        self.test_steps
            .iter()
            .filter(|s| !s.operation.is(op::START_CAPTURING) && !s.operation.is(op::OPEN_WINDOW))
            .cloned()
            .collect()
    }
}
