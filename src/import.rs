//! Versioned test-result documents.
//!
//! Version 0 (no `version` key) is the legacy layout where each step carries
//! `testPurpose` and `notes`. Version 1 carries `intention`, `bugs` and
//! `notices`. Both are normalized into [`TestResult`].

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::model::TestResult;

pub const CURRENT_VERSION: u64 = 1;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("ImportData is invalid format")]
    InvalidFormat { reason: String },
}

impl ImportError {
    fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::InvalidFormat { reason } => reason,
        }
    }
}

pub fn deserialize_test_result(json: &str) -> Result<TestResult, ImportError> {
    let mut document: Value =
        serde_json::from_str(json).map_err(|e| ImportError::invalid(e.to_string()))?;

    let version = match document.get("version") {
        None | Some(Value::Null) => 0,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| ImportError::invalid(format!("version is not a number: {v}")))?,
    };
    if version > CURRENT_VERSION {
        return Err(ImportError::invalid(format!("unsupported version {version}")));
    }

    let steps = document
        .get_mut("testSteps")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| ImportError::invalid("testSteps is missing"))?;

    for (index, step) in steps.iter_mut().enumerate() {
        let step = step
            .as_object_mut()
            .ok_or_else(|| ImportError::invalid(format!("step {index} is not an object")))?;
        if version == 0 {
            upgrade_legacy_step(step, index)?;
        } else {
            check_current_step(step, index)?;
        }
    }

    let result: TestResult =
        serde_json::from_value(document).map_err(|e| ImportError::invalid(e.to_string()))?;
    debug!(
        version,
        steps = result.test_steps.len(),
        "test result imported"
    );
    Ok(result)
}

fn require<'a>(
    step: &'a Map<String, Value>,
    key: &str,
    index: usize,
) -> Result<&'a Value, ImportError> {
    step.get(key)
        .ok_or_else(|| ImportError::invalid(format!("step {index} has no {key}")))
}

fn check_current_step(step: &Map<String, Value>, index: usize) -> Result<(), ImportError> {
    require(step, "intention", index)?;
    for key in ["bugs", "notices"] {
        if !require(step, key, index)?.is_array() {
            return Err(ImportError::invalid(format!("step {index}: {key} is not an array")));
        }
    }
    Ok(())
}

/// Legacy notes all become notices; legacy data has no bugs.
fn upgrade_legacy_step(step: &mut Map<String, Value>, index: usize) -> Result<(), ImportError> {
    let purpose = require(step, "testPurpose", index)?.clone();
    let notes = require(step, "notes", index)?.clone();
    if !notes.is_array() {
        return Err(ImportError::invalid(format!("step {index}: notes is not an array")));
    }

    step.remove("testPurpose");
    step.remove("notes");
    step.insert("intention".into(), purpose);
    step.insert("bugs".into(), Value::Array(Vec::new()));
    step.insert("notices".into(), notes);
    Ok(())
}

/// Read and import a test-result file.
pub fn load_test_result(path: &Path) -> anyhow::Result<TestResult> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read test result {}", path.display()))?;
    deserialize_test_result(&json)
        .with_context(|| format!("Failed to import test result {}", path.display()))
}
