//! Requested metrics and cross-suite evaluation parameter dependencies
//!
//! A metric request is either a plain metric name or a grouping
//! `{kwarg_name: {kwarg_value: [requests...]}}`. The special
//! `metric_kwargs_id` grouping names already-identified kwargs and cannot be
//! nested under other kwargs.

use crate::store::StoreKey;
use crate::validation::RunIdentifier;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Kwarg name of the pre-identified grouping.
pub const METRIC_KWARGS_ID: &str = "metric_kwargs_id";

/// Placeholder key segment for an absent value.
pub const EMPTY_KEY_SEGMENT: &str = "__";

/// Kwargs selecting one instance of a metric.
pub type MetricKwargs = BTreeMap<String, String>;

/// One requested metric, or a grouping of requests by kwarg value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricRequest {
    Name(String),
    Grouped(BTreeMap<String, BTreeMap<String, Vec<MetricRequest>>>),
}

impl MetricRequest {
    pub fn name(metric: impl Into<String>) -> Self {
        Self::Name(metric.into())
    }

    /// `{metric_kwargs_id: {kwargs_id: [metric]}}`
    pub fn with_kwargs_id(kwargs_id: impl Into<String>, metric: impl Into<String>) -> Self {
        Self::grouped(METRIC_KWARGS_ID, kwargs_id, vec![Self::name(metric)])
    }

    /// `{kwarg_name: {kwarg_value: requests}}`
    pub fn grouped(kwarg_name: impl Into<String>, kwarg_value: impl Into<String>, requests: Vec<Self>) -> Self {
        let inner = BTreeMap::from([(kwarg_value.into(), requests)]);
        Self::Grouped(BTreeMap::from([(kwarg_name.into(), inner)]))
    }
}

/// Identifier for a set of metric kwargs: the explicit `metric_kwargs_id`,
/// else `column=<column>`, else none.
pub fn metric_kwargs_id(kwargs: &MetricKwargs) -> Option<String> {
    if let Some(id) = kwargs.get(METRIC_KWARGS_ID) {
        return Some(id.clone());
    }
    kwargs.get("column").map(|column| format!("column={column}"))
}

/// [`metric_kwargs_id`] over raw expectation kwargs.
pub fn metric_kwargs_id_from_config(kwargs: &Map<String, Value>) -> Option<String> {
    let as_string = |value: &Value| match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if let Some(id) = kwargs.get(METRIC_KWARGS_ID).filter(|v| !v.is_null()) {
        return Some(as_string(id));
    }
    kwargs
        .get("column")
        .filter(|v| !v.is_null())
        .map(|column| format!("column={}", as_string(column)))
}

/// Expand a request into `(metric_name, kwargs)` pairs.
pub fn metric_configuration_tuples(request: &MetricRequest, base_kwargs: &MetricKwargs) -> Result<Vec<(String, MetricKwargs)>> {
    let groupings = match request {
        MetricRequest::Name(metric) => return Ok(vec![(metric.clone(), base_kwargs.clone())]),
        MetricRequest::Grouped(groupings) => groupings,
    };

    let mut tuples = Vec::new();
    for (kwarg_name, values) in groupings {
        if kwarg_name == METRIC_KWARGS_ID {
            if !base_kwargs.is_empty() {
                return Err(Error::data_context(
                    "Invalid metric_configuration: when specifying metric_kwargs_id, no other keys or values may be defined.",
                ));
            }
            for (kwargs_id, requests) in values {
                for request in requests {
                    let MetricRequest::Name(metric) = request else {
                        return Err(Error::data_context(
                            "Invalid metric_configuration: metric_kwargs_id groupings must list metric names.",
                        ));
                    };
                    let kwargs = MetricKwargs::from([(METRIC_KWARGS_ID.to_string(), kwargs_id.clone())]);
                    tuples.push((metric.clone(), kwargs));
                }
            }
            continue;
        }

        for (kwarg_value, requests) in values {
            let mut kwargs = base_kwargs.clone();
            kwargs.insert(kwarg_name.clone(), kwarg_value.clone());
            for request in requests {
                tuples.extend(metric_configuration_tuples(request, &kwargs)?);
            }
        }
    }
    Ok(tuples)
}

fn merge_requests(base: &mut Vec<MetricRequest>, incoming: &[MetricRequest]) {
    for request in incoming {
        match request {
            MetricRequest::Name(_) => {
                if !base.contains(request) {
                    base.push(request.clone());
                }
            }
            MetricRequest::Grouped(groupings) => {
                let existing = base.iter_mut().find_map(|candidate| match candidate {
                    MetricRequest::Grouped(current) if current.keys().eq(groupings.keys()) => Some(current),
                    _ => None,
                });
                match existing {
                    Some(current) => {
                        for (kwarg_name, values) in groupings {
                            let target = current.entry(kwarg_name.clone()).or_default();
                            for (kwarg_value, requests) in values {
                                merge_requests(target.entry(kwarg_value.clone()).or_default(), requests);
                            }
                        }
                    }
                    None => base.push(request.clone()),
                }
            }
        }
    }
}

/// Metrics each expectation suite needs from other suites' validation results.
///
/// Keyed by the suite that produces the metric; `*` matches every suite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationParameterDependencies(BTreeMap<String, Vec<MetricRequest>>);

impl EvaluationParameterDependencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, suite: &str) -> Option<&[MetricRequest]> {
        self.0.get(suite).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<MetricRequest>)> {
        self.0.iter()
    }

    /// Add one request for `suite`, merging with what is already there.
    pub fn add(&mut self, suite: impl Into<String>, request: MetricRequest) {
        merge_requests(self.0.entry(suite.into()).or_default(), std::slice::from_ref(&request));
    }

    /// Additive union: names are deduplicated, groupings with the same kwarg
    /// names merge recursively.
    pub fn merge(&mut self, other: &EvaluationParameterDependencies) {
        for (suite, requests) in &other.0 {
            merge_requests(self.0.entry(suite.clone()).or_default(), requests);
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Store key for one stored metric value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationMetricIdentifier {
    pub run_id: RunIdentifier,
    pub data_asset_name: Option<String>,
    pub expectation_suite_name: String,
    pub metric_name: String,
    pub metric_kwargs_id: Option<String>,
}

impl ValidationMetricIdentifier {
    pub fn to_store_key(&self) -> StoreKey {
        StoreKey::new([
            self.run_id.run_name_segment(),
            self.run_id.run_time_segment(),
            self.data_asset_name.clone().unwrap_or_else(|| EMPTY_KEY_SEGMENT.to_string()),
            self.expectation_suite_name.clone(),
            self.metric_name.clone(),
            self.metric_kwargs_id.clone().unwrap_or_else(|| EMPTY_KEY_SEGMENT.to_string()),
        ])
    }
}
