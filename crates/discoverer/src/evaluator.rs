//! Evaluation of isolated fragments inside a [`Sandbox`].
//!
//! Structured results are flattened by a small helper running inside the
//! interpreter and handed back as JSON text, so nothing but plain strings
//! crosses the sandbox boundary.

use crate::error::{EvaluationFailure, EvaluationOutcome};
use crate::sandbox::{Completion, Sandbox};
use crate::types::{CandidateParameter, ChunkPath};
use std::collections::BTreeSet;

/// String elements of every own array-valued property
const FLATTEN_MANIFEST: &str = r#"(function (value) {
  var found = [];
  if (value === null || typeof value !== "object") {
    return JSON.stringify(found);
  }
  Object.keys(value).forEach(function (key) {
    var entry = value[key];
    if (Array.isArray(entry)) {
      entry.forEach(function (item) {
        if (typeof item === "string") {
          found.push(item);
        }
      });
    }
  });
  return JSON.stringify(found);
})"#;

/// String elements of an array
const STRING_ELEMENTS: &str = r#"(function (value) {
  var found = [];
  if (Array.isArray(value)) {
    value.forEach(function (item) {
      if (typeof item === "string") {
        found.push(item);
      }
    });
  }
  return JSON.stringify(found);
})"#;

/// Evaluate a manifest expression once and flatten its array-valued
/// properties. A non-object result yields nothing.
pub fn evaluate_manifest(sandbox: &mut Sandbox, expression: &str) -> Vec<String> {
    collect(sandbox, FLATTEN_MANIFEST, expression, "manifest")
}

/// String elements of an array-valued expression
pub fn evaluate_string_list(sandbox: &mut Sandbox, expression: &str) -> Vec<String> {
    collect(sandbox, STRING_ELEMENTS, expression, "string list")
}

fn collect(sandbox: &mut Sandbox, helper: &str, expression: &str, what: &str) -> Vec<String> {
    let code = format!("{helper}(\n{expression}\n)");
    match sandbox.eval(&code).and_then(decode_list) {
        Ok(values) => values,
        Err(failure) => {
            log::debug!("Evaluating {what} failed: {failure}");
            Vec::new()
        }
    }
}

fn decode_list(completion: Completion) -> Result<Vec<String>, EvaluationFailure> {
    match completion {
        Completion::String(json) => serde_json::from_str(&json)
            .map_err(|err| EvaluationFailure::Malformed(err.to_string())),
        other => Err(EvaluationFailure::NonString(other.type_name())),
    }
}

/// Invoke `function_text` with one candidate argument.
///
/// Only non-empty strings free of `undefined` are accepted; a result like
/// `"undefined.js"` means the lookup missed and the miss was concatenated.
pub fn evaluate_candidate(
    sandbox: &mut Sandbox,
    function_text: &str,
    candidate: &CandidateParameter,
) -> EvaluationOutcome {
    let code = format!("({function_text})({})", candidate.to_js_argument());
    match sandbox.eval(&code)? {
        Completion::String(value) if value.is_empty() => Err(EvaluationFailure::Empty),
        Completion::String(value) if value.contains("undefined") => {
            Err(EvaluationFailure::UndefinedConcatenation(value))
        }
        Completion::String(value) => Ok(value),
        other => Err(EvaluationFailure::NonString(other.type_name())),
    }
}

/// Invoke `function_text` once per candidate and keep the accepted results.
///
/// A failing candidate is discarded on its own; the rest still run.
pub fn evaluate_candidates(
    sandbox: &mut Sandbox,
    function_text: &str,
    candidates: &[CandidateParameter],
) -> BTreeSet<ChunkPath> {
    let mut chunks = BTreeSet::new();
    for candidate in candidates {
        match evaluate_candidate(sandbox, function_text, candidate) {
            Ok(value) => chunks.extend(ChunkPath::new(value)),
            Err(failure) => log::trace!("Candidate {candidate} discarded: {failure}"),
        }
    }
    chunks
}
