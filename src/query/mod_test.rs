use std::sync::Arc;

use tempfile::TempDir;

use super::*;
use crate::{codec::PropertyType, config::EnvConfig, schema::ClassKind};

fn temp_env() -> (TempDir, Environment) {
    let dir = TempDir::new().unwrap();
    let env = Environment::open(dir.path(), &EnvConfig::default()).unwrap();
    (dir, env)
}

#[test]
fn test_matches_condition_eq_and_ordering() {
    assert!(matches_condition(&Value::Int(5), &Condition::Eq(Value::Int(5))));
    assert!(!matches_condition(&Value::Int(5), &Condition::Eq(Value::Int(6))));
    assert!(matches_condition(&Value::Int(5), &Condition::Lt(Value::Int(6))));
    assert!(matches_condition(&Value::Int(5), &Condition::Le(Value::Int(5))));
    assert!(matches_condition(&Value::Int(5), &Condition::Gt(Value::Int(4))));
    assert!(matches_condition(&Value::Int(5), &Condition::Ge(Value::Int(5))));
}

#[test]
fn test_matches_condition_between_inclusive_and_exclusive() {
    assert!(matches_condition(&Value::Int(5), &Condition::Between(Value::Int(1), Value::Int(5), true, true)));
    assert!(!matches_condition(&Value::Int(5), &Condition::Between(Value::Int(1), Value::Int(5), true, false)));
}

fn fixture() -> (Environment, TempDir, Catalog, ClassId) {
    let (dir, env) = temp_env();
    let mut overlay = Arc::new(Catalog::default()).begin_overlay();
    overlay.add_class("person", ClassKind::Vertex, None).unwrap();
    overlay.add_property("person", "age", PropertyType::Int).unwrap();
    let class = overlay.view().class_by_name("person").unwrap().id;
    let cat = overlay.view().clone();

    let db = store::open_class_db(&env, class).unwrap();
    let mut txn = env.begin_rw().unwrap();
    for age in [20, 30, 40] {
        store::add_record(&mut txn, db, &cat, class, &vec![("age".to_string(), Value::Int(age))]).unwrap();
    }
    txn.commit().unwrap();
    (env, dir, cat, class)
}

#[test]
fn test_find_unindexed_scan_all() {
    let (env, _dir, cat, class) = fixture();
    let ro = env.begin_ro().unwrap();
    let ids = Find::new(&cat, class).get(&ro, &env).unwrap();
    assert_eq!(ids.len(), 3);
}

#[test]
fn test_find_unindexed_filtered() {
    let (env, _dir, cat, class) = fixture();
    let ro = env.begin_ro().unwrap();
    let ids = Find::new(&cat, class).where_cond("age", Condition::Gt(Value::Int(25))).get(&ro, &env).unwrap();
    assert_eq!(ids.len(), 2);
}

#[test]
fn test_find_cursor_matches_materialized_get() {
    let (env, _dir, cat, class) = fixture();
    let ro = env.begin_ro().unwrap();
    let want = Find::new(&cat, class).where_cond("age", Condition::Ge(Value::Int(30))).get(&ro, &env).unwrap();

    let mut cursor = Find::new(&cat, class).where_cond("age", Condition::Ge(Value::Int(30))).get_cursor(&ro, &env).unwrap();
    let mut got = Vec::new();
    while let Some(rid) = cursor.next().unwrap() {
        got.push(rid);
    }
    assert_eq!(got, want);
}

#[test]
fn test_shortest_path_dijkstra_prefers_lower_total_weight() {
    use crate::relation;

    let (_dir, env) = temp_env();
    let mut overlay = Arc::new(Catalog::default()).begin_overlay();
    overlay.add_class("person", ClassKind::Vertex, None).unwrap();
    overlay.add_class("knows", ClassKind::Edge, None).unwrap();
    overlay.add_property("knows", "weight", PropertyType::Real).unwrap();
    let person = overlay.view().class_by_name("person").unwrap().id;
    let knows = overlay.view().class_by_name("knows").unwrap().id;
    let cat = overlay.view().clone();

    let rel = RelationDbs::open(&env).unwrap();
    let db = store::open_class_db(&env, person).unwrap();
    let mut txn = env.begin_rw().unwrap();
    let a = store::add_record(&mut txn, db, &cat, person, &vec![]).unwrap();
    let b = store::add_record(&mut txn, db, &cat, person, &vec![]).unwrap();
    let c = store::add_record(&mut txn, db, &cat, person, &vec![]).unwrap();
    // direct a->c is expensive; a->b->c is cheaper despite the extra hop.
    relation::add_edge(&mut txn, &env, &rel, &cat, knows, a, c, &vec![("weight".to_string(), Value::Real(10.0))]).unwrap();
    relation::add_edge(&mut txn, &env, &rel, &cat, knows, a, b, &vec![("weight".to_string(), Value::Real(1.0))]).unwrap();
    relation::add_edge(&mut txn, &env, &rel, &cat, knows, b, c, &vec![("weight".to_string(), Value::Real(1.0))]).unwrap();
    txn.commit().unwrap();

    let ro = env.begin_ro().unwrap();
    let path = shortest_path(&ro, &env, &rel, &cat, a, c, Direction::Out, None, None, Some("weight")).unwrap().unwrap();
    assert_eq!(path, vec![a, b, c]);
}

#[test]
fn test_shortest_path_without_weight_takes_fewest_hops() {
    use crate::relation;

    let (_dir, env) = temp_env();
    let mut overlay = Arc::new(Catalog::default()).begin_overlay();
    overlay.add_class("person", ClassKind::Vertex, None).unwrap();
    overlay.add_class("knows", ClassKind::Edge, None).unwrap();
    overlay.add_property("knows", "weight", PropertyType::Real).unwrap();
    let person = overlay.view().class_by_name("person").unwrap().id;
    let knows = overlay.view().class_by_name("knows").unwrap().id;
    let cat = overlay.view().clone();

    let rel = RelationDbs::open(&env).unwrap();
    let db = store::open_class_db(&env, person).unwrap();
    let mut txn = env.begin_rw().unwrap();
    let a = store::add_record(&mut txn, db, &cat, person, &vec![]).unwrap();
    let b = store::add_record(&mut txn, db, &cat, person, &vec![]).unwrap();
    let c = store::add_record(&mut txn, db, &cat, person, &vec![]).unwrap();
    relation::add_edge(&mut txn, &env, &rel, &cat, knows, a, c, &vec![("weight".to_string(), Value::Real(10.0))]).unwrap();
    relation::add_edge(&mut txn, &env, &rel, &cat, knows, a, b, &vec![("weight".to_string(), Value::Real(1.0))]).unwrap();
    relation::add_edge(&mut txn, &env, &rel, &cat, knows, b, c, &vec![("weight".to_string(), Value::Real(1.0))]).unwrap();
    txn.commit().unwrap();

    let ro = env.begin_ro().unwrap();
    let path = shortest_path(&ro, &env, &rel, &cat, a, c, Direction::Out, None, None, None).unwrap().unwrap();
    assert_eq!(path, vec![a, c]);
}
