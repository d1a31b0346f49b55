//! Element identity across repeated page visits.
//!
//! The capture agent sees the same DOM element many times: once per visit of
//! its screen, plus once per coverage snapshot. Identity is the tuple
//! (page URL, page title, xpath, iframe index); object identity and insertion
//! order play no part, so revisiting a screen resolves to the same element id.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::ids::ElementIdGenerator;
use crate::model::CoverageSource;

/// An element with a stable id, as stored in the graph view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: String,
    pub page_url: String,
    pub page_title: String,
    pub xpath: String,
    pub tagname: String,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iframe_index: Option<u32>,
}

/// Strip `[1]` index steps so `/html[1]/body/div[1]` and `/html/body/div`
/// compare equal. `[10]` and friends are left untouched.
pub fn normalize_xpath(xpath: &str) -> String {
    xpath.replace("[1]", "")
}

fn identity_key(page_url: &str, page_title: &str, xpath: &str, iframe_index: Option<u32>) -> String {
    let iframe = iframe_index.map(|i| i.to_string()).unwrap_or_default();
    format!("{page_url}_{page_title}_{xpath}_{iframe}")
}

/// Read-only lookup table from identity key to element, built once per view
/// generation. Keys are matched exactly; callers normalize xpaths first.
#[derive(Debug, Default)]
pub struct ElementMapper {
    elements: Vec<Element>,
    /// Screen definitions whose catalog contained each element, parallel to `elements`.
    owners: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl ElementMapper {
    pub fn new(sources: &[CoverageSource], ids: &mut impl ElementIdGenerator) -> Self {
        let mut mapper = Self::default();

        for source in sources {
            for captured in &source.screen_elements {
                let info = &captured.element;
                let key = identity_key(
                    &captured.page_url,
                    &captured.page_title,
                    &info.xpath,
                    info.iframe_index,
                );

                let idx = match mapper.index.get(&key) {
                    Some(&idx) => idx,
                    None => {
                        let idx = mapper.elements.len();
                        mapper.elements.push(Element {
                            id: ids.generate_element_id(),
                            page_url: captured.page_url.clone(),
                            page_title: captured.page_title.clone(),
                            xpath: info.xpath.clone(),
                            tagname: info.tagname.clone(),
                            text: info.text_or_empty().to_string(),
                            attributes: info.attributes.clone(),
                            iframe_index: info.iframe_index,
                        });
                        mapper.owners.push(Vec::new());
                        mapper.index.insert(key, idx);
                        idx
                    }
                };

                let owners = &mut mapper.owners[idx];
                if !owners.contains(&source.screen_def) {
                    owners.push(source.screen_def.clone());
                }
            }
        }

        debug!(
            sources = sources.len(),
            elements = mapper.elements.len(),
            "element mapper built"
        );
        mapper
    }

    pub fn find_element(
        &self,
        page_url: &str,
        page_title: &str,
        xpath: &str,
        iframe_index: Option<u32>,
    ) -> Option<&Element> {
        let key = identity_key(page_url, page_title, xpath, iframe_index);
        self.index.get(&key).map(|&idx| &self.elements[idx])
    }

    /// All elements in construction order, optionally restricted to those
    /// whose owning catalog belongs to `screen_def`.
    pub fn collect_elements(&self, screen_def: Option<&str>) -> Vec<&Element> {
        self.elements
            .iter()
            .zip(&self.owners)
            .filter(|(_, owners)| match screen_def {
                Some(def) => owners.iter().any(|o| o == def),
                None => true,
            })
            .map(|(element, _)| element)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
