use super::*;
use async_trait::async_trait;
use shared::{
    domain::Identity,
    error::HandlerError,
    protocol::{HandlerResult, Parameters},
};
use storage::StoreHandle;

struct Noop;

#[async_trait]
impl ActionHandler for Noop {
    async fn execute(
        &self,
        _store: &mut StoreHandle,
        _params: &Parameters,
        _caller: &Identity,
    ) -> Result<HandlerResult, HandlerError> {
        Ok(HandlerResult::ok(serde_json::Value::Null))
    }
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut builder = RegistryBuilder::new();
    builder.register("add_note", Noop).expect("first");
    let err = builder
        .register("add_note", Noop)
        .err()
        .expect("duplicate should fail");
    assert_eq!(err, RegistryError::Duplicate("add_note".to_string()));
}

#[test]
fn declared_identifier_also_blocks_duplicates() {
    let mut builder = RegistryBuilder::new();
    builder.declare("delete_note").expect("declare");
    assert!(builder.register("delete_note", Noop).is_err());
}

#[test]
fn empty_identifier_is_rejected() {
    let mut builder = RegistryBuilder::new();
    assert_eq!(
        builder.register("", Noop).err(),
        Some(RegistryError::EmptyId)
    );
}

#[test]
fn resolve_returns_the_same_handler_every_time() {
    let mut builder = RegistryBuilder::new();
    builder.register("get_charges", Noop).expect("register");
    let registry = builder.build();

    let first = registry.resolve("get_charges").expect("hit");
    let second = registry.resolve("get_charges").expect("hit");
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn lookup_is_exact_and_case_sensitive() {
    let mut builder = RegistryBuilder::new();
    builder.register("get_charges", Noop).expect("register");
    let registry = builder.build();

    assert!(registry.resolve("GET_CHARGES").is_none());
    assert!(registry.resolve("get_charges ").is_none());
    assert!(registry.resolve("get_charge").is_none());
}

#[test]
fn declared_identifier_resolves_to_nothing() {
    let mut builder = RegistryBuilder::new();
    builder.declare("get_citizen").expect("declare");
    let registry = builder.build();

    assert_eq!(registry.action_ids(), vec!["get_citizen"]);
    assert!(registry.resolve("get_citizen").is_none());
}

#[tokio::test]
async fn registry_is_shared_across_tasks_without_locking() {
    let mut builder = RegistryBuilder::new();
    builder
        .register("a", Noop)
        .and_then(|b| b.register("b", Noop))
        .expect("register");
    let registry = Arc::new(builder.build());
    let expected = registry.resolve("a").expect("hit");

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let registry = Arc::clone(&registry);
        tasks.push(tokio::spawn(async move { registry.resolve("a") }));
    }
    for task in tasks {
        let resolved = task.await.expect("join").expect("hit");
        assert!(Arc::ptr_eq(&resolved, &expected));
    }
    assert_eq!(registry.action_ids(), vec!["a", "b"]);
}
