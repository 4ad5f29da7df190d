//! Cross-crate properties of a data context
//!
//! Each test pins one externally observable guarantee: substitution
//! precedence, document store keys, datasource rollback and caching.

use datactx_core::config::{ConfigDocument, ProjectConfig};
use datactx_core::datasource::{Datasource, DatasourceRegistry};
use datactx_core::environment::Environment;
use datactx_core::store::InlineStoreBackend;
use datactx_core::substitution::{DOLLAR_SIGN_ESCAPE, Substitutions, substitute};
use datactx_core::{ContextOptions, DataContext, Error, StoreBackend, StoreKey};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Map, Value, json};
use std::rc::Rc;

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn engine_datasource(extra: Value) -> Map<String, Value> {
    let mut config = object(json!({
        "class_name": "Datasource",
        "execution_engine": {"class_name": "PandasExecutionEngine"}
    }));
    config.extend(object(extra));
    config
}

#[rstest]
#[case(json!("${A}-${B}"))]
#[case(json!({"nested": ["${A}", {"deeper": "${B}"}], "n": 3}))]
#[case(json!(r"price: \$5 for ${A}"))]
fn substitution_is_idempotent_on_resolved_values(#[case] input: Value) {
    let substitutions: Substitutions = [
        ("A".to_string(), json!("alpha")),
        ("B".to_string(), json!(7)),
    ]
    .into_iter()
    .collect();
    let once = substitute(&input, &substitutions, DOLLAR_SIGN_ESCAPE);
    let twice = substitute(&once, &substitutions, DOLLAR_SIGN_ESCAPE);
    assert_eq!(once, twice);
}

#[test]
fn runtime_overrides_beat_environment_and_file() {
    let env = Environment::fixed([("HOST", "fromenv")]);
    let options = ContextOptions::new(env).with_runtime_var("HOST", "fromruntime");
    let mut ctx = DataContext::ephemeral(ProjectConfig::default(), options).unwrap();
    ctx.save_config_variable("HOST", "fromfile").unwrap();

    assert_eq!(ctx.determine_substitutions()["HOST"], json!("fromruntime"));
}

#[test]
fn document_store_round_trips_datasources() {
    let document = ConfigDocument::in_memory(ProjectConfig::default());
    let mut backend = InlineStoreBackend::new(Rc::clone(&document));
    let key = StoreKey::new(["datasources", "d1"]);
    let config = json!({"class_name": "Datasource", "execution_engine": {"class_name": "E"}});

    backend.set(&key, config.clone()).unwrap();
    assert_eq!(backend.get(&key).unwrap(), config);
    assert_eq!(document.read().datasources().unwrap()["d1"], config);
}

#[test]
fn document_store_rejects_unknown_sections_before_reading() {
    let document = ConfigDocument::in_memory(ProjectConfig::default());
    let before = document.snapshot();
    let backend = InlineStoreBackend::new(Rc::clone(&document));

    let err = backend.get(&StoreKey::single("not_a_real_section")).unwrap_err();
    assert!(matches!(err, Error::InvalidKey { .. }), "{err}");
    assert_eq!(document.snapshot(), before);
}

#[test]
fn document_store_deletes_fail_as_backend_errors() {
    let document = ConfigDocument::in_memory(ProjectConfig::default());
    let mut backend = InlineStoreBackend::new(Rc::clone(&document));

    assert!(matches!(
        backend.remove_key(&StoreKey::new(["datasources", "ghost"])),
        Err(Error::Backend { .. })
    ));
    assert!(matches!(
        backend.remove_key(&StoreKey::single("data_context_variables")),
        Err(Error::Backend { .. })
    ));

    backend
        .set(&StoreKey::new(["datasources", "real"]), json!({}))
        .unwrap();
    assert!(matches!(
        backend.remove_key(&StoreKey::single("data_context_variables")),
        Err(Error::Backend { .. })
    ));
}

#[test]
fn failed_datasource_leaves_no_trace() {
    let mut registry = DatasourceRegistry::with_builtins();
    registry.register("ExplodingDatasource", |name, _config, _ctx| {
        Err(Error::configuration(format!("{name} cannot connect")))
    });
    let options = ContextOptions::new(Environment::empty()).with_datasource_registry(registry);
    let mut ctx = DataContext::ephemeral(ProjectConfig::default(), options).unwrap();

    let err = ctx
        .add_datasource("flaky", true, true, object(json!({"class_name": "ExplodingDatasource"})))
        .unwrap_err();
    assert!(
        matches!(&err, Error::DatasourceInitialization { name, .. } if name == "flaky"),
        "{err}"
    );
    assert!(ctx.list_datasources().unwrap().is_empty());
    assert!(!ctx.datasource_store().has_name("flaky").unwrap());
}

#[test]
fn cached_datasource_is_the_same_instance() {
    let mut ctx = DataContext::ephemeral(ProjectConfig::default(), ContextOptions::new(Environment::empty())).unwrap();
    ctx.add_datasource("events", false, true, engine_datasource(json!({})))
        .unwrap();

    let first: Rc<dyn Datasource> = ctx.get_datasource("events").unwrap();
    let second = ctx.get_datasource("events").unwrap();
    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn credentials_resolve_from_three_layers() {
    let env = Environment::fixed([("DB_HOST", "prod.example")]);
    let options = ContextOptions::new(env).with_runtime_var("DB_PASS", "secret");
    let mut ctx = DataContext::ephemeral(ProjectConfig::default(), options).unwrap();
    ctx.save_config_variable("DB_USER", "alice").unwrap();

    ctx.add_datasource(
        "warehouse",
        true,
        true,
        engine_datasource(json!({"credentials": "${DB_USER}@${DB_HOST}:${DB_PASS}"})),
    )
    .unwrap();

    let substituted = ctx.get_config_with_variables_substituted().unwrap();
    assert_eq!(
        substituted.datasources().unwrap()["warehouse"]["credentials"],
        json!("alice@prod.example:secret")
    );
    assert_eq!(
        ctx.config().datasources().unwrap()["warehouse"]["credentials"],
        json!("${DB_USER}@${DB_HOST}:${DB_PASS}")
    );
}
