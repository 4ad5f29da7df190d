//! Expectation suites as persisted documents
//!
//! The context does not interpret expectations. It only needs suite names
//! and the `$PARAMETER` references that tie one suite to another suite's
//! validation results.

use crate::metrics::{EvaluationParameterDependencies, MetricRequest};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Kwarg key marking an evaluation parameter expression.
pub const PARAMETER_KEY: &str = "$PARAMETER";

/// Prefix of validation metric URNs.
pub const VALIDATIONS_URN_PREFIX: &str = "urn:datactx:validations:";

static URN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"urn:datactx:validations:[^\s()*+/,]+").expect("Invalid validations URN regex")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationConfiguration {
    pub expectation_type: String,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl ExpectationConfiguration {
    pub fn new(expectation_type: impl Into<String>, kwargs: Map<String, Value>) -> Self {
        Self {
            expectation_type: expectation_type.into(),
            kwargs,
            meta: Map::new(),
        }
    }

    /// Metrics of other suites referenced by `$PARAMETER` kwargs.
    pub fn evaluation_parameter_dependencies(&self) -> EvaluationParameterDependencies {
        let mut dependencies = EvaluationParameterDependencies::new();
        let expressions = self
            .kwargs
            .values()
            .filter_map(|value| value.get(PARAMETER_KEY))
            .filter_map(Value::as_str);
        for expression in expressions {
            for urn in URN_REGEX.find_iter(expression) {
                match parse_validations_urn(urn.as_str()) {
                    Some(reference) => dependencies.add(reference.suite, reference.request),
                    None => tracing::warn!(urn = urn.as_str(), "Unable to parse evaluation parameter URN"),
                }
            }
        }
        dependencies
    }
}

struct UrnReference {
    suite: String,
    request: MetricRequest,
}

// urn:datactx:validations:<suite>:<metric>[:<metric_kwargs_id>]
fn parse_validations_urn(urn: &str) -> Option<UrnReference> {
    let rest = urn.strip_prefix(VALIDATIONS_URN_PREFIX)?;
    let mut parts = rest.splitn(3, ':');
    let suite = parts.next().filter(|s| !s.is_empty())?;
    let metric = parts.next().filter(|s| !s.is_empty())?;
    let request = match parts.next().filter(|s| !s.is_empty()) {
        Some(kwargs_id) => MetricRequest::with_kwargs_id(kwargs_id, metric),
        None => MetricRequest::name(metric),
    };
    Some(UrnReference {
        suite: suite.to_string(),
        request,
    })
}

/// A named collection of expectations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationSuite {
    pub expectation_suite_name: String,
    #[serde(default)]
    pub expectations: Vec<ExpectationConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_asset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl ExpectationSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            expectation_suite_name: name.into(),
            expectations: Vec::new(),
            data_asset_type: None,
            meta: Map::new(),
        }
    }

    pub fn with_expectation(mut self, expectation: ExpectationConfiguration) -> Self {
        self.expectations.push(expectation);
        self
    }

    pub fn name(&self) -> &str {
        &self.expectation_suite_name
    }

    /// Union of every expectation's dependencies.
    pub fn evaluation_parameter_dependencies(&self) -> EvaluationParameterDependencies {
        let mut dependencies = EvaluationParameterDependencies::new();
        for expectation in &self.expectations {
            dependencies.merge(&expectation.evaluation_parameter_dependencies());
        }
        dependencies
    }
}
