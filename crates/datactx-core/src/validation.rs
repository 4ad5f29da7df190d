//! Validation results and metric lookup

use crate::metrics::{MetricKwargs, metric_kwargs_id, metric_kwargs_id_from_config};
use crate::suite::ExpectationConfiguration;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const RUN_TIME_FORMAT: &str = "%Y%m%dT%H%M%S%.6fZ";
const NO_RUN_NAME: &str = "__none__";

/// Identifies one validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentifier {
    #[serde(default)]
    pub run_name: Option<String>,
    pub run_time: DateTime<Utc>,
}

impl RunIdentifier {
    pub fn new(run_name: Option<String>, run_time: DateTime<Utc>) -> Self {
        Self { run_name, run_time }
    }

    /// A run named `run_name` happening now.
    pub fn now(run_name: Option<String>) -> Self {
        Self::new(run_name, Utc::now())
    }

    pub fn run_name_segment(&self) -> String {
        self.run_name.clone().unwrap_or_else(|| NO_RUN_NAME.to_string())
    }

    pub fn run_time_segment(&self) -> String {
        self.run_time.format(RUN_TIME_FORMAT).to_string()
    }
}

/// Outcome of one expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationValidationResult {
    pub success: bool,
    #[serde(default)]
    pub expectation_config: Option<ExpectationConfiguration>,
    #[serde(default)]
    pub result: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResultMeta {
    pub expectation_suite_name: String,
    pub run_id: RunIdentifier,
    #[serde(default)]
    pub batch_kwargs: Map<String, Value>,
}

/// Outcome of validating a batch against a suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    #[serde(default)]
    pub results: Vec<ExpectationValidationResult>,
    #[serde(default)]
    pub statistics: Map<String, Value>,
    pub meta: ValidationResultMeta,
}

impl ValidationResult {
    pub fn expectation_suite_name(&self) -> &str {
        &self.meta.expectation_suite_name
    }

    pub fn run_id(&self) -> &RunIdentifier {
        &self.meta.run_id
    }

    /// `data_asset_name` from the batch kwargs, if any.
    pub fn data_asset_name(&self) -> Option<&str> {
        self.meta
            .batch_kwargs
            .get("data_asset_name")
            .and_then(Value::as_str)
    }

    /// Look up a metric by name.
    ///
    /// Supported names are `statistics.<name>`, `<expectation_type>.success`,
    /// `<expectation_type>.result.<field>` and
    /// `<expectation_type>.result.details.<field>`. Expectation metrics are
    /// matched by the kwargs id derived from `kwargs`.
    pub fn get_metric(&self, metric_name: &str, kwargs: &MetricKwargs) -> Result<Value> {
        let parts: Vec<&str> = metric_name.split('.').collect();
        let unavailable = || Error::unavailable_metric(format!("metric {metric_name} is not available"));

        match parts.as_slice() {
            ["statistics", stat] => self.statistics.get(*stat).cloned().ok_or_else(unavailable),
            [expectation_type, rest @ ..] if !rest.is_empty() => {
                let wanted_id = metric_kwargs_id(kwargs);
                let result = self
                    .results
                    .iter()
                    .find(|r| {
                        r.expectation_config.as_ref().is_some_and(|config| {
                            config.expectation_type == *expectation_type
                                && metric_kwargs_id_from_config(&config.kwargs) == wanted_id
                        })
                    })
                    .ok_or_else(unavailable)?;

                match rest {
                    ["success"] => Ok(Value::Bool(result.success)),
                    ["result", "details", field] => result
                        .result
                        .get("details")
                        .and_then(|details| details.get(*field))
                        .cloned()
                        .ok_or_else(unavailable),
                    ["result", field] => result.result.get(*field).cloned().ok_or_else(unavailable),
                    _ => Err(Error::unavailable_metric(format!(
                        "metric name {metric_name} must have an expectation type and a supported property"
                    ))),
                }
            }
            _ => Err(Error::unavailable_metric(format!(
                "metric name {metric_name} must have at least two parts"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn result() -> ValidationResult {
        serde_json::from_value(json!({
            "success": true,
            "statistics": {"evaluated_expectations": 2, "success_percent": 100.0},
            "results": [
                {
                    "success": true,
                    "expectation_config": {
                        "expectation_type": "expect_column_mean_to_be_between",
                        "kwargs": {"column": "Age"}
                    },
                    "result": {"observed_value": 41.5, "details": {"sample": 10}}
                },
                {
                    "success": false,
                    "expectation_config": {
                        "expectation_type": "expect_table_row_count_to_equal",
                        "kwargs": {"value": 3}
                    },
                    "result": {"observed_value": 4}
                }
            ],
            "meta": {
                "expectation_suite_name": "source",
                "run_id": {"run_name": "nightly", "run_time": "2024-01-02T03:04:05Z"},
                "batch_kwargs": {"data_asset_name": "people"}
            }
        }))
        .unwrap()
    }

    fn column(name: &str) -> MetricKwargs {
        MetricKwargs::from([("column".to_string(), name.to_string())])
    }

    #[test]
    fn statistics_metrics() {
        assert_eq!(
            result().get_metric("statistics.evaluated_expectations", &MetricKwargs::new()).unwrap(),
            json!(2)
        );
    }

    #[test]
    fn expectation_metrics_match_by_kwargs_id() {
        let r = result();
        assert_eq!(
            r.get_metric("expect_column_mean_to_be_between.result.observed_value", &column("Age"))
                .unwrap(),
            json!(41.5)
        );
        assert_eq!(
            r.get_metric("expect_column_mean_to_be_between.result.details.sample", &column("Age"))
                .unwrap(),
            json!(10)
        );
        assert_eq!(
            r.get_metric("expect_table_row_count_to_equal.success", &MetricKwargs::new())
                .unwrap(),
            json!(false)
        );
        assert!(matches!(
            r.get_metric("expect_column_mean_to_be_between.result.observed_value", &column("Name")),
            Err(Error::UnavailableMetric { .. })
        ));
    }

    #[test]
    fn malformed_names_are_unavailable() {
        let r = result();
        for name in ["statistics", "single", "expect_table_row_count_to_equal.meta"] {
            assert!(
                matches!(r.get_metric(name, &MetricKwargs::new()), Err(Error::UnavailableMetric { .. })),
                "{name}"
            );
        }
    }

    #[test]
    fn exposes_run_metadata() {
        let r = result();
        assert_eq!(r.data_asset_name(), Some("people"));
        assert_eq!(r.run_id().run_time_segment(), "20240102T030405.000000Z");
        assert_eq!(RunIdentifier::now(None).run_name_segment(), "__none__");
    }
}
