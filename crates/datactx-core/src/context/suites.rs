//! Expectation suites and evaluation parameter bookkeeping

use super::DataContext;
use crate::config::VariableSchema;
use crate::metrics::{
    EvaluationParameterDependencies, MetricKwargs, ValidationMetricIdentifier, metric_configuration_tuples,
    metric_kwargs_id,
};
use crate::store::StoreKey;
use crate::suite::ExpectationSuite;
use crate::validation::ValidationResult;
use crate::{Error, Result};
use serde_json::{Value, json};

/// Dependency key matching every suite.
const ANY_SUITE: &str = "*";

impl DataContext {
    fn suite_key(name: &str) -> Result<StoreKey> {
        if name.is_empty() {
            return Err(Error::invalid_argument("expectation suite names must not be empty"));
        }
        Ok(StoreKey::single(name))
    }

    /// Save `suite`, optionally under a different name.
    pub fn save_expectation_suite(
        &mut self,
        suite: &ExpectationSuite,
        expectation_suite_name: Option<&str>,
        overwrite_existing: bool,
    ) -> Result<()> {
        let mut suite = suite.clone();
        if let Some(name) = expectation_suite_name {
            suite.expectation_suite_name = name.to_string();
        }
        let key = Self::suite_key(suite.name())?;

        let store = self.expectations_store_mut()?;
        if !overwrite_existing && store.has_key(&key)? {
            return Err(Error::data_context(format!(
                "expectation suite `{}` already exists; pass overwrite_existing to replace it",
                suite.name()
            )));
        }
        store.set(&key, serde_json::to_value(&suite)?)?;
        self.evaluation_parameter_dependencies_compiled = false;

        tracing::info!(suite = suite.name(), "Saved expectation suite");
        self.record_usage(
            "data_context.save_expectation_suite",
            json!({"anonymized_expectation_suite_name": self.anonymize(suite.name())}),
            true,
        );
        Ok(())
    }

    pub fn get_expectation_suite(&self, name: &str) -> Result<ExpectationSuite> {
        let key = Self::suite_key(name)?;
        match self.expectations_store()?.get(&key) {
            Ok(value) => Ok(serde_json::from_value(value)?),
            Err(err) if err.is_not_found() => Err(Error::data_context(format!(
                "expectation suite `{name}` not found"
            ))),
            Err(err) => Err(err),
        }
    }

    /// Names of every saved suite, sorted.
    pub fn list_expectation_suite_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .expectations_store()?
            .list_keys()?
            .into_iter()
            .map(|key| key.parts().join("."))
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn delete_expectation_suite(&mut self, name: &str) -> Result<()> {
        let key = Self::suite_key(name)?;
        let store = self.expectations_store_mut()?;
        if !store.has_key(&key)? {
            return Err(Error::data_context(format!("expectation suite `{name}` not found")));
        }
        store.remove_key(&key)?;
        self.evaluation_parameter_dependencies_compiled = false;
        Ok(())
    }

    /// Collect `$PARAMETER` dependencies from every saved suite.
    ///
    /// No-op once compiled until a suite is saved or deleted.
    pub fn compile_evaluation_parameter_dependencies(&mut self) -> Result<()> {
        if self.evaluation_parameter_dependencies_compiled {
            return Ok(());
        }
        let mut dependencies = EvaluationParameterDependencies::new();
        for name in self.list_expectation_suite_names()? {
            let suite = self.get_expectation_suite(&name)?;
            dependencies.merge(&suite.evaluation_parameter_dependencies());
        }
        tracing::debug!(suites = dependencies.len(), "Compiled evaluation parameter dependencies");
        self.evaluation_parameter_dependencies = dependencies;
        self.evaluation_parameter_dependencies_compiled = true;
        Ok(())
    }

    pub fn evaluation_parameter_dependencies(&self) -> &EvaluationParameterDependencies {
        &self.evaluation_parameter_dependencies
    }

    pub fn evaluation_parameter_dependencies_compiled(&self) -> bool {
        self.evaluation_parameter_dependencies_compiled
    }

    /// Store the metrics other suites depend on from `results`.
    ///
    /// Defaults to the configured evaluation parameter store.
    pub fn store_evaluation_parameters(
        &mut self,
        results: &ValidationResult,
        target_store_name: Option<&str>,
    ) -> Result<usize> {
        self.compile_evaluation_parameter_dependencies()?;
        let target = match target_store_name {
            Some(name) => name.to_string(),
            None => self.store_name(VariableSchema::EvaluationParameterStoreName)?,
        };
        let requested = self.evaluation_parameter_dependencies.clone();
        self.store_metrics(&requested, results, &target)
    }

    /// Store each requested metric available in `results`; returns how many were stored.
    ///
    /// Requests under `*` apply to every suite. Unavailable metrics are skipped.
    pub fn store_metrics(
        &mut self,
        requested: &EvaluationParameterDependencies,
        results: &ValidationResult,
        target_store_name: &str,
    ) -> Result<usize> {
        if !self.stores.contains_key(target_store_name) {
            return Err(Error::StoreConfiguration {
                message: format!("target store `{target_store_name}` is not configured"),
            });
        }
        let suite_name = results.expectation_suite_name();
        let mut pending = Vec::new();

        for (dependency_suite, requests) in requested.iter() {
            if dependency_suite.as_str() != ANY_SUITE && dependency_suite.as_str() != suite_name {
                continue;
            }
            for request in requests {
                for (metric_name, kwargs) in metric_configuration_tuples(request, &MetricKwargs::new())? {
                    match results.get_metric(&metric_name, &kwargs) {
                        Ok(value) => {
                            let identifier = ValidationMetricIdentifier {
                                run_id: results.run_id().clone(),
                                data_asset_name: results.data_asset_name().map(str::to_string),
                                expectation_suite_name: suite_name.to_string(),
                                metric_kwargs_id: metric_kwargs_id(&kwargs),
                                metric_name,
                            };
                            pending.push((identifier.to_store_key(), value));
                        }
                        Err(Error::UnavailableMetric { message }) => {
                            tracing::debug!(metric = %metric_name, "{message}");
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }

        let stored = pending.len();
        let store = self
            .stores
            .get_mut(target_store_name)
            .ok_or_else(|| Error::StoreConfiguration {
                message: format!("target store `{target_store_name}` is not configured"),
            })?;
        for (key, value) in pending {
            store.set(&key, value)?;
        }
        tracing::debug!(store = target_store_name, stored, "Stored validation metrics");
        Ok(stored)
    }

    /// Stored metric value for one identifier.
    pub fn get_validation_metric(&self, identifier: &ValidationMetricIdentifier) -> Result<Value> {
        self.evaluation_parameter_store()?
            .get(&identifier.to_store_key())
    }
}
