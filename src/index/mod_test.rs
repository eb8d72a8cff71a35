use std::sync::Arc;

use tempfile::TempDir;

use super::*;
use crate::{codec::PropertyType, config::EnvConfig, ids::ClassId, schema::{Catalog, ClassKind}};

fn temp_env() -> (TempDir, Environment) {
    let dir = TempDir::new().unwrap();
    let env = Environment::open(dir.path(), &EnvConfig::default()).unwrap();
    (dir, env)
}

fn fixture(unique: bool) -> (Catalog, ClassId, IndexDescriptor) {
    let mut overlay = Arc::new(Catalog::default()).begin_overlay();
    overlay.add_class("person", ClassKind::Vertex, None).unwrap();
    overlay.add_property("person", "age", PropertyType::Int).unwrap();
    let ix = overlay.create_index("person", "age", unique).unwrap();
    let class = overlay.view().class_by_name("person").unwrap().id;
    (overlay.view().clone(), class, ix)
}

fn rid(class: ClassId, pos: u64) -> RecordId {
    RecordId::new(class, crate::ids::PositionId(pos))
}

#[test]
fn test_unique_index_insert_then_lookup() {
    let (_dir, env) = temp_env();
    let (_cat, class, ix) = fixture(true);
    let db = open_index_db(&env, ix.id).unwrap();

    let mut txn = env.begin_rw().unwrap();
    index_insert(&mut txn, db, &ix, &Value::Int(30), rid(class, 0)).unwrap();
    txn.commit().unwrap();

    let ro = env.begin_ro().unwrap();
    let found = lookup(&ro, db, &ix, &Condition::Eq(Value::Int(30))).unwrap();
    assert_eq!(found, vec![rid(class, 0)]);
}

#[test]
fn test_unique_index_rejects_duplicate_value() {
    let (_dir, env) = temp_env();
    let (_cat, class, ix) = fixture(true);
    let db = open_index_db(&env, ix.id).unwrap();

    let mut txn = env.begin_rw().unwrap();
    index_insert(&mut txn, db, &ix, &Value::Int(30), rid(class, 0)).unwrap();
    let err = index_insert(&mut txn, db, &ix, &Value::Int(30), rid(class, 1)).unwrap_err();
    assert_eq!(err.code(), crate::error::UsageError::DuplicateKey.code());
}

#[test]
fn test_non_unique_index_allows_duplicate_value() {
    let (_dir, env) = temp_env();
    let (_cat, class, ix) = fixture(false);
    let db = open_index_db(&env, ix.id).unwrap();

    let mut txn = env.begin_rw().unwrap();
    index_insert(&mut txn, db, &ix, &Value::Int(30), rid(class, 0)).unwrap();
    index_insert(&mut txn, db, &ix, &Value::Int(30), rid(class, 1)).unwrap();
    txn.commit().unwrap();

    let ro = env.begin_ro().unwrap();
    let found = lookup(&ro, db, &ix, &Condition::Eq(Value::Int(30))).unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn test_index_delete_removes_entry() {
    let (_dir, env) = temp_env();
    let (_cat, class, ix) = fixture(true);
    let db = open_index_db(&env, ix.id).unwrap();

    let mut txn = env.begin_rw().unwrap();
    index_insert(&mut txn, db, &ix, &Value::Int(30), rid(class, 0)).unwrap();
    index_delete(&mut txn, db, &ix, &Value::Int(30), rid(class, 0)).unwrap();
    txn.commit().unwrap();

    let ro = env.begin_ro().unwrap();
    let found = lookup(&ro, db, &ix, &Condition::Eq(Value::Int(30))).unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_range_conditions() {
    let (_dir, env) = temp_env();
    let (_cat, class, ix) = fixture(false);
    let db = open_index_db(&env, ix.id).unwrap();

    let mut txn = env.begin_rw().unwrap();
    for (i, age) in [10, 20, 30, 40].into_iter().enumerate() {
        index_insert(&mut txn, db, &ix, &Value::Int(age), rid(class, i as u64)).unwrap();
    }
    txn.commit().unwrap();

    let ro = env.begin_ro().unwrap();
    assert_eq!(lookup(&ro, db, &ix, &Condition::Lt(Value::Int(30))).unwrap().len(), 2);
    assert_eq!(lookup(&ro, db, &ix, &Condition::Le(Value::Int(30))).unwrap().len(), 3);
    assert_eq!(lookup(&ro, db, &ix, &Condition::Gt(Value::Int(30))).unwrap().len(), 1);
    assert_eq!(lookup(&ro, db, &ix, &Condition::Ge(Value::Int(30))).unwrap().len(), 2);
    assert_eq!(
        lookup(&ro, db, &ix, &Condition::Between(Value::Int(20), Value::Int(30), true, true)).unwrap().len(),
        2
    );
    assert_eq!(
        lookup(&ro, db, &ix, &Condition::Between(Value::Int(20), Value::Int(30), false, false)).unwrap().len(),
        0
    );
}

#[test]
fn test_reindex_class_populates_from_existing_records() {
    let (_dir, env) = temp_env();
    let mut overlay = Arc::new(Catalog::default()).begin_overlay();
    overlay.add_class("person", ClassKind::Vertex, None).unwrap();
    overlay.add_property("person", "age", PropertyType::Int).unwrap();
    let class = overlay.view().class_by_name("person").unwrap().id;
    let cat = overlay.view().clone();

    let class_db = store::open_class_db(&env, class).unwrap();
    let mut txn = env.begin_rw().unwrap();
    store::add_record(&mut txn, class_db, &cat, class, &vec![("age".to_string(), Value::Int(25))]).unwrap();
    store::add_record(&mut txn, class_db, &cat, class, &vec![("age".to_string(), Value::Int(40))]).unwrap();
    txn.commit().unwrap();

    let mut overlay = Arc::new(cat.clone()).begin_overlay();
    let ix = overlay.create_index("person", "age", false).unwrap();

    let mut txn = env.begin_rw().unwrap();
    reindex_class(&mut txn, &env, overlay.view(), &ix).unwrap();
    txn.commit().unwrap();

    let ro = env.begin_ro().unwrap();
    let index_db = open_index_db(&env, ix.id).unwrap();
    let found = lookup(&ro, index_db, &ix, &Condition::Ge(Value::Int(0))).unwrap();
    assert_eq!(found.len(), 2);
}
