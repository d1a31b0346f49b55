//! Screen definition: resolves a page (title, URL, keywords) to a screen name.
//!
//! Rule groups are checked in order; the first enabled group whose enabled
//! conditions all match names the screen. Without a match the page falls back
//! to its URL or title, depending on the configured definition type.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::{CoverageSource, TestResult, TestStep};

/// Screen name used for pages without a title.
pub const NO_TITLE: &str = "(No Title)";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenDefType {
    #[default]
    Title,
    Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionType {
    Url,
    Title,
    Keyword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Contains,
    Equals,
    Regex,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(default = "enabled")]
    pub is_enabled: bool,
    pub definition_type: DefinitionType,
    pub match_type: MatchType,
    pub word: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionGroup {
    #[serde(default = "enabled")]
    pub is_enabled: bool,
    pub screen_name: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenDefinitionConfig {
    #[serde(default)]
    pub screen_def_type: ScreenDefType,
    #[serde(default)]
    pub conditions: Vec<ConditionGroup>,
}

fn enabled() -> bool {
    true
}

/// A compiled condition. Regex conditions whose pattern does not compile
/// hold `None` and never match.
#[derive(Debug)]
struct Matcher {
    definition_type: DefinitionType,
    match_type: MatchType,
    word: String,
    regex: Option<Regex>,
}

impl Matcher {
    fn matches_text(&self, text: &str) -> bool {
        match self.match_type {
            MatchType::Contains => text.contains(&self.word),
            MatchType::Equals => text == self.word,
            MatchType::Regex => self.regex.as_ref().is_some_and(|re| re.is_match(text)),
        }
    }

    fn matches(&self, title: &str, url: &str, keyword_set: &[String]) -> bool {
        match self.definition_type {
            DefinitionType::Url => self.matches_text(url),
            DefinitionType::Title => self.matches_text(title),
            DefinitionType::Keyword => keyword_set.iter().any(|k| self.matches_text(k)),
        }
    }
}

#[derive(Debug)]
pub struct ScreenDefFactory {
    screen_def_type: ScreenDefType,
    /// (screen name, enabled conditions) per enabled group, in order.
    groups: Vec<(String, Vec<Matcher>)>,
}

impl ScreenDefFactory {
    pub fn new(config: &ScreenDefinitionConfig) -> Self {
        let groups = config
            .conditions
            .iter()
            .filter(|g| g.is_enabled)
            .map(|group| {
                let matchers = group
                    .conditions
                    .iter()
                    .filter(|c| c.is_enabled)
                    .map(|c| Matcher {
                        definition_type: c.definition_type,
                        match_type: c.match_type,
                        word: c.word.clone(),
                        regex: compile(c),
                    })
                    .collect();
                (group.screen_name.clone(), matchers)
            })
            .collect();

        Self {
            screen_def_type: config.screen_def_type,
            groups,
        }
    }

    /// Screen name for a page.
    pub fn create(&self, title: &str, url: &str, keyword_set: &[String]) -> String {
        let matched = self.groups.iter().find(|(_, matchers)| {
            !matchers.is_empty() && matchers.iter().all(|m| m.matches(title, url, keyword_set))
        });
        if let Some((name, _)) = matched {
            return name.clone();
        }

        match self.screen_def_type {
            ScreenDefType::Url => url.to_string(),
            ScreenDefType::Title if title.is_empty() => NO_TITLE.to_string(),
            ScreenDefType::Title => title.to_string(),
        }
    }
}

fn compile(condition: &Condition) -> Option<Regex> {
    if condition.match_type != MatchType::Regex {
        return None;
    }
    match Regex::new(&condition.word) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(pattern = %condition.word, error = %e, "invalid screen definition regex");
            None
        }
    }
}

/// Recompute every step's screen and regroup the coverage catalogs under the
/// new screen names. A catalog page seen by a step takes that step's screen,
/// so keyword rules reach the catalogs too; other pages are named from title
/// and url alone.
pub fn redefine_screens(result: &TestResult, factory: &ScreenDefFactory) -> TestResult {
    let test_steps: Vec<TestStep> = result
        .test_steps
        .iter()
        .map(|step| {
            let mut step = step.clone();
            let op = &step.operation;
            step.screen_def = factory.create(&op.title, &op.url, &step.keyword_set);
            step
        })
        .collect();

    let mut step_screens: HashMap<(&str, &str), &str> = HashMap::new();
    for step in &test_steps {
        let op = &step.operation;
        step_screens
            .entry((op.url.as_str(), op.title.as_str()))
            .or_insert(step.screen_def.as_str());
    }

    let mut coverage_sources: Vec<CoverageSource> = Vec::new();
    for captured in result.coverage_sources.iter().flat_map(|s| s.screen_elements.iter()) {
        let screen_def = match step_screens
            .get(&(captured.page_url.as_str(), captured.page_title.as_str()))
        {
            Some(name) => name.to_string(),
            None => factory.create(&captured.page_title, &captured.page_url, &[]),
        };
        match coverage_sources.iter_mut().find(|s| s.screen_def == screen_def) {
            Some(source) => source.screen_elements.push(captured.clone()),
            None => coverage_sources.push(CoverageSource {
                screen_def,
                screen_elements: vec![captured.clone()],
            }),
        }
    }

    debug!(
        steps = result.test_steps.len(),
        sources = coverage_sources.len(),
        "screens redefined"
    );

    TestResult {
        id: result.id.clone(),
        name: result.name.clone(),
        test_steps,
        coverage_sources,
    }
}
