//! Project lifecycle: scaffold, configure, reopen

use datactx_core::environment::Environment;
use datactx_core::metrics::{MetricRequest, ValidationMetricIdentifier};
use datactx_core::suite::{ExpectationConfiguration, ExpectationSuite};
use datactx_core::validation::ValidationResult;
use datactx_core::{ContextOptions, DataContext, EvaluationParameterDependencies};
use datactx_test_utils::project::{CONFIG_VARIABLES, PROJECT_CONFIG, TestProject};
use pretty_assertions::assert_eq;
use serde_json::json;

fn options() -> ContextOptions {
    ContextOptions::new(Environment::empty())
}

#[test]
fn scaffolded_project_round_trips_through_disk() {
    let project = TestProject::new();
    let id = {
        let mut ctx = DataContext::create(project.root(), options()).unwrap();
        ctx.save_config_variable("DB_PASSWORD", "hunter2").unwrap();
        ctx.add_datasource(
            "warehouse",
            true,
            true,
            json!({
                "class_name": "SimpleSqlDatasource",
                "connection_string": "postgresql://app:${DB_PASSWORD}@db/app"
            })
            .as_object()
            .cloned()
            .unwrap(),
        )
        .unwrap();
        ctx.data_context_id().to_string()
    };

    project.assert_file_contains(PROJECT_CONFIG, "${DB_PASSWORD}");
    project.assert_file_lacks(PROJECT_CONFIG, "hunter2");
    project.assert_file_contains(CONFIG_VARIABLES, "hunter2");

    let mut reopened = DataContext::open(project.root(), options()).unwrap();
    assert_eq!(reopened.data_context_id(), id);
    let listed = reopened.list_datasources().unwrap();
    assert_eq!(listed[0]["connection_string"], json!("postgresql://app:***@db/app"));
    assert_eq!(
        reopened.get_datasource("warehouse").unwrap().config()["connection_string"],
        json!("postgresql://app:hunter2@db/app")
    );
}

#[test]
fn evaluation_parameters_flow_between_suites() {
    let project = TestProject::new();
    let mut ctx = DataContext::create(project.root(), options()).unwrap();

    let downstream = ExpectationSuite::new("downstream").with_expectation(ExpectationConfiguration::new(
        "expect_table_row_count_to_equal",
        json!({"value": {"$PARAMETER": "urn:datactx:validations:upstream:expect_table_row_count_to_be_between.result.observed_value"}})
            .as_object()
            .cloned()
            .unwrap(),
    ));
    ctx.save_expectation_suite(&downstream, None, false).unwrap();

    let results: ValidationResult = serde_json::from_value(json!({
        "success": true,
        "statistics": {"evaluated_expectations": 1},
        "results": [{
            "success": true,
            "expectation_config": {"expectation_type": "expect_table_row_count_to_be_between", "kwargs": {}},
            "result": {"observed_value": 1200}
        }],
        "meta": {
            "expectation_suite_name": "upstream",
            "run_id": {"run_name": "daily", "run_time": "2024-05-01T00:00:00Z"},
            "batch_kwargs": {"data_asset_name": "orders"}
        }
    }))
    .unwrap();

    assert_eq!(ctx.store_evaluation_parameters(&results, None).unwrap(), 1);

    let mut expected = EvaluationParameterDependencies::new();
    expected.add(
        "upstream",
        MetricRequest::name("expect_table_row_count_to_be_between.result.observed_value"),
    );
    assert_eq!(ctx.evaluation_parameter_dependencies(), &expected);

    let identifier = ValidationMetricIdentifier {
        run_id: results.run_id().clone(),
        data_asset_name: Some("orders".to_string()),
        expectation_suite_name: "upstream".to_string(),
        metric_name: "expect_table_row_count_to_be_between.result.observed_value".to_string(),
        metric_kwargs_id: None,
    };
    assert_eq!(ctx.get_validation_metric(&identifier).unwrap(), json!(1200));
}

#[test]
fn legacy_project_without_store_names_still_opens() {
    let project = TestProject::new()
        .with_config(datactx_test_utils::fixtures::LEGACY_CONFIG)
        .with_dirs(&["checkpoints", "profilers"]);
    let mut ctx = DataContext::open(project.root(), options()).unwrap();

    assert_eq!(ctx.checkpoint_store_name().unwrap(), "checkpoint_store");
    assert_eq!(ctx.profiler_store_name().unwrap(), "profiler_store");
    assert!(ctx.checkpoint_store().is_ok());
    assert!(ctx.profiler_store().is_ok());
}
