//! Pivot table of per-element input history across screen transitions.

use serde::Serialize;

use crate::graph::{GraphView, TestPurpose};
use crate::model::Note;
use crate::transition::{derive_screen_transitions, ScreenTransition};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSummary {
    pub element_text: String,
    pub event_type: String,
}

/// One column header per transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputValueHeader {
    pub source_screen_name: String,
    pub target_screen_name: Option<String>,
    pub trigger: Option<TriggerSummary>,
    pub notes: Vec<Note>,
    pub test_purposes: Vec<TestPurpose>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputValue {
    pub value: String,
    pub is_default_value: bool,
}

/// One row per element, one cell per transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputValueRow {
    pub element_id: String,
    pub xpath: String,
    pub tagname: String,
    pub element_name: String,
    pub element_text: String,
    pub inputs: Vec<InputValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InputValueTable {
    pub headers: Vec<InputValueHeader>,
    pub rows: Vec<InputValueRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInputValueTable {
    pub window_id: String,
    pub table: InputValueTable,
}

/// One table per window, over that window's transitions.
pub fn project_window_tables(view: &GraphView) -> Vec<WindowInputValueTable> {
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
            WindowInputValueTable {
                window_id: window.id.clone(),
                table: project_input_value_table(&in_window),
            }
        })
        .collect()
}

pub fn project_input_value_table(transitions: &[ScreenTransition]) -> InputValueTable {
    let headers = transitions
        .iter()
        .map(|t| InputValueHeader {
            source_screen_name: t.source.name.clone(),
            target_screen_name: t.destination.as_ref().map(|d| d.name.clone()),
            trigger: t.trigger.as_ref().map(|trigger| TriggerSummary {
                element_text: trigger
                    .target
                    .as_ref()
                    .map(|x| x.text.clone())
                    .unwrap_or_default(),
                event_type: trigger.op_type.clone(),
            }),
            notes: t.notes.clone(),
            test_purposes: t.test_purposes.clone(),
        })
        .collect();

    let mut rows: Vec<InputValueRow> = Vec::new();
    for element in transitions.iter().flat_map(|t| t.input_elements.iter()) {
        if rows.iter().any(|r| r.element_id == element.id) {
            continue;
        }
        rows.push(InputValueRow {
            element_id: element.id.clone(),
            xpath: element.xpath.clone(),
            tagname: element.tagname.clone(),
            element_name: element.attributes.get("name").cloned().unwrap_or_default(),
            element_text: element.text.clone(),
            inputs: Vec::new(),
        });
    }

    for row in &mut rows {
        row.inputs = transitions
            .iter()
            .map(|t| {
                let element = t.input_elements.iter().find(|e| e.id == row.element_id);
                let default_value = element.and_then(|e| e.default_value.clone());
                match element.and_then(|e| e.inputs.last()) {
                    None => InputValue {
                        value: default_value.unwrap_or_default(),
                        is_default_value: true,
                    },
                    // The default value is shown even when something was typed.
                    Some(last) => InputValue {
                        value: default_value.unwrap_or_else(|| last.value.clone()),
                        is_default_value: false,
                    },
                }
            })
            .collect();
    }

    InputValueTable { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::tests::transition;
    use crate::transition::{ElementInput, InputElement};

    fn input_element(id: &str, default_value: Option<&str>, inputs: &[&str]) -> InputElement {
        InputElement {
            id: id.into(),
            xpath: format!("/html/body/input[@id='{id}']"),
            tagname: "INPUT".into(),
            text: String::new(),
            attributes: [("name".to_string(), id.to_string())].into(),
            default_value: default_value.map(Into::into),
            inputs: inputs
                .iter()
                .map(|v| ElementInput {
                    test_step_id: "t".into(),
                    value: v.to_string(),
                })
                .collect(),
        }
    }

    fn cells(row: &InputValueRow) -> Vec<(&str, bool)> {
        row.inputs
            .iter()
            .map(|i| (i.value.as_str(), i.is_default_value))
            .collect()
    }

    #[test]
    fn rows_are_union_in_first_seen_order() {
        let mut first = transition("s0", Some("s1"), Some(("click", "/a", None)));
        first.input_elements = vec![input_element("name", Some(""), &[])];
        let mut second = transition("s1", None, None);
        second.input_elements = vec![
            input_element("mail", Some(""), &[]),
            input_element("name", Some(""), &[]),
        ];
        let table = project_input_value_table(&[first, second]);
        let ids: Vec<&str> = table.rows.iter().map(|r| r.element_id.as_str()).collect();
        assert_eq!(ids, vec!["name", "mail"]);
        assert_eq!(table.rows[0].element_name, "name");
    }

    #[test]
    fn untouched_element_carries_default() {
        let mut first = transition("s0", Some("s1"), None);
        first.input_elements = vec![input_element("name", Some("alice"), &[])];
        let second = transition("s1", None, None);
        let table = project_input_value_table(&[first, second]);
        assert_eq!(cells(&table.rows[0]), vec![("alice", true), ("", true)]);
    }

    #[test]
    fn typed_input_without_default_shows_last_input() {
        let mut t = transition("s0", None, None);
        t.input_elements = vec![input_element("name", None, &["a", "ab"])];
        let table = project_input_value_table(&[t]);
        assert_eq!(cells(&table.rows[0]), vec![("ab", false)]);
    }

    /// Documented but suspect: when an element both has a default value and
    /// received input, the default value is what gets displayed.
    #[test]
    fn default_value_takes_precedence_over_typed_input() {
        let mut t = transition("s0", None, None);
        t.input_elements = vec![input_element("name", Some("initial"), &["typed"])];
        let table = project_input_value_table(&[t]);
        assert_eq!(cells(&table.rows[0]), vec![("initial", false)]);
    }

    #[test]
    fn headers_describe_transitions() {
        let t = transition("s0", Some("s1"), Some(("click", "/a", None)));
        let table = project_input_value_table(&[t]);
        let header = &table.headers[0];
        assert_eq!(header.source_screen_name, "screen s0");
        assert_eq!(header.target_screen_name.as_deref(), Some("screen s1"));
        assert_eq!(
            header.trigger,
            Some(TriggerSummary {
                element_text: "link".into(),
                event_type: "click".into(),
            })
        );
        assert!(table.rows.is_empty());
    }
}
