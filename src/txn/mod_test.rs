use tempfile::TempDir;

use super::*;
use crate::{
    codec::{PropertyType, Value},
    index::Condition,
};

fn temp_manager() -> (TempDir, TransactionManager) {
    let dir = TempDir::new().unwrap();
    let env = Environment::open(dir.path(), &crate::config::EnvConfig::default()).unwrap();
    (dir, TransactionManager::open(env).unwrap())
}

fn rec(fields: &[(&str, Value)]) -> store::Record {
    fields.iter().map(|(n, v)| (n.to_string(), v.clone())).collect()
}

#[test]
fn test_schema_changes_are_visible_after_commit() {
    let (_dir, mgr) = temp_manager();
    let mut wtxn = mgr.begin_write().unwrap();
    wtxn.add_class("person", ClassKind::Vertex, None).unwrap();
    wtxn.add_property("person", "name", PropertyType::Text).unwrap();
    wtxn.commit().unwrap();

    let rtxn = mgr.begin_read().unwrap();
    assert!(rtxn.catalog.class_by_name("person").is_some());
}

#[test]
fn test_rollback_discards_schema_changes() {
    let (_dir, mgr) = temp_manager();
    let mut wtxn = mgr.begin_write().unwrap();
    wtxn.add_class("ghost", ClassKind::Vertex, None).unwrap();
    wtxn.rollback();

    let rtxn = mgr.begin_read().unwrap();
    assert!(rtxn.catalog.class_by_name("ghost").is_none());
}

#[test]
fn test_second_writer_rejected_while_first_is_open() {
    let (_dir, mgr) = temp_manager();
    let _first = mgr.begin_write().unwrap();
    let err = mgr.begin_write().unwrap_err();
    assert_eq!(err.code(), UsageError::WriterBusy.code());
}

#[test]
fn test_writer_slot_released_after_commit() {
    let (_dir, mgr) = temp_manager();
    let wtxn = mgr.begin_write().unwrap();
    wtxn.commit().unwrap();
    assert!(mgr.begin_write().is_ok());
}

#[test]
fn test_read_snapshot_does_not_see_later_commit() {
    let (_dir, mgr) = temp_manager();
    let rtxn = mgr.begin_read().unwrap();

    let mut wtxn = mgr.begin_write().unwrap();
    wtxn.add_class("late", ClassKind::Vertex, None).unwrap();
    wtxn.commit().unwrap();

    assert!(rtxn.catalog.class_by_name("late").is_none());
    let fresh = mgr.begin_read().unwrap();
    assert!(fresh.catalog.class_by_name("late").is_some());
}

#[test]
fn test_add_vertex_then_fetch_by_rid() {
    let (_dir, mgr) = temp_manager();
    let mut wtxn = mgr.begin_write().unwrap();
    wtxn.add_class("person", ClassKind::Vertex, None).unwrap();
    wtxn.add_property("person", "name", PropertyType::Text).unwrap();
    let rid = wtxn.add_vertex("person", &rec(&[("name", Value::Text("alice".to_string()))])).unwrap();
    assert_eq!(wtxn.fetch_by_rid(rid).unwrap(), Some(rec(&[("name", Value::Text("alice".to_string()))])));
    wtxn.commit().unwrap();

    let rtxn = mgr.begin_read().unwrap();
    assert_eq!(rtxn.fetch_by_rid(rid).unwrap(), Some(rec(&[("name", Value::Text("alice".to_string()))])));
}

#[test]
fn test_add_vertex_rejects_edge_class() {
    let (_dir, mgr) = temp_manager();
    let mut wtxn = mgr.begin_write().unwrap();
    wtxn.add_class("knows", ClassKind::Edge, None).unwrap();
    assert!(wtxn.add_vertex("knows", &rec(&[])).is_err());
}

#[test]
fn test_add_edge_then_traverse() {
    let (_dir, mgr) = temp_manager();
    let mut wtxn = mgr.begin_write().unwrap();
    wtxn.add_class("person", ClassKind::Vertex, None).unwrap();
    wtxn.add_class("knows", ClassKind::Edge, None).unwrap();
    let alice = wtxn.add_vertex("person", &rec(&[])).unwrap();
    let bob = wtxn.add_vertex("person", &rec(&[])).unwrap();
    wtxn.add_edge("knows", alice, bob, &rec(&[])).unwrap();
    wtxn.commit().unwrap();

    let rtxn = mgr.begin_read().unwrap();
    let rel = RelationDbs::open(rtxn.env()).unwrap();
    let out = rtxn.traverse_out(&rel, alice, None, None, None, None).unwrap();
    assert_eq!(out.len(), 2);
    assert!(out.contains(&(bob, 1)));
}

#[test]
fn test_shortest_path_across_vertices() {
    let (_dir, mgr) = temp_manager();
    let mut wtxn = mgr.begin_write().unwrap();
    wtxn.add_class("person", ClassKind::Vertex, None).unwrap();
    wtxn.add_class("knows", ClassKind::Edge, None).unwrap();
    let a = wtxn.add_vertex("person", &rec(&[])).unwrap();
    let b = wtxn.add_vertex("person", &rec(&[])).unwrap();
    let c = wtxn.add_vertex("person", &rec(&[])).unwrap();
    wtxn.add_edge("knows", a, b, &rec(&[])).unwrap();
    wtxn.add_edge("knows", b, c, &rec(&[])).unwrap();
    wtxn.commit().unwrap();

    let rtxn = mgr.begin_read().unwrap();
    let rel = RelationDbs::open(rtxn.env()).unwrap();
    let path = rtxn.shortest_path(&rel, a, c, query::Direction::Out, None, None, None).unwrap().unwrap();
    assert_eq!(path, vec![a, b, c]);
}

#[test]
fn test_indexed_and_unindexed_find_agree() {
    let (_dir, mgr) = temp_manager();
    let mut wtxn = mgr.begin_write().unwrap();
    wtxn.add_class("person", ClassKind::Vertex, None).unwrap();
    wtxn.add_property("person", "age", PropertyType::Int).unwrap();
    wtxn.create_index("person", "age", false).unwrap();
    for age in [20, 30, 30, 40] {
        wtxn.add_vertex("person", &rec(&[("age", Value::Int(age))])).unwrap();
    }
    wtxn.commit().unwrap();

    let rtxn = mgr.begin_read().unwrap();
    let env = rtxn.env();
    let unindexed = rtxn.find("person").unwrap().where_cond("age", Condition::Eq(Value::Int(30))).get(&rtxn.kv, env).unwrap();
    let indexed = rtxn.find("person").unwrap().where_cond("age", Condition::Eq(Value::Int(30))).indexed().get(&rtxn.kv, env).unwrap();
    assert_eq!(unindexed.len(), 2);
    let mut a = unindexed.clone();
    let mut b = indexed.clone();
    a.sort();
    b.sort();
    assert_eq!(a, b);
}

#[test]
fn test_create_index_reindexes_existing_records() {
    let (_dir, mgr) = temp_manager();
    let mut wtxn = mgr.begin_write().unwrap();
    wtxn.add_class("person", ClassKind::Vertex, None).unwrap();
    wtxn.add_property("person", "age", PropertyType::Int).unwrap();
    wtxn.add_vertex("person", &rec(&[("age", Value::Int(99))])).unwrap();
    wtxn.create_index("person", "age", false).unwrap();
    wtxn.commit().unwrap();

    let rtxn = mgr.begin_read().unwrap();
    let env = rtxn.env();
    let found = rtxn.find("person").unwrap().where_cond("age", Condition::Eq(Value::Int(99))).indexed().get(&rtxn.kv, env).unwrap();
    assert_eq!(found.len(), 1);
}

#[test]
fn test_update_moves_indexed_value() {
    let (_dir, mgr) = temp_manager();
    let mut wtxn = mgr.begin_write().unwrap();
    wtxn.add_class("person", ClassKind::Vertex, None).unwrap();
    wtxn.add_property("person", "age", PropertyType::Int).unwrap();
    wtxn.create_index("person", "age", true).unwrap();
    let rid = wtxn.add_vertex("person", &rec(&[("age", Value::Int(30))])).unwrap();
    wtxn.update(rid, &rec(&[("age", Value::Int(31))])).unwrap();
    wtxn.commit().unwrap();

    let rtxn = mgr.begin_read().unwrap();
    let env = rtxn.env();
    let old = rtxn.find("person").unwrap().where_cond("age", Condition::Eq(Value::Int(30))).indexed().get(&rtxn.kv, env).unwrap();
    let new = rtxn.find("person").unwrap().where_cond("age", Condition::Eq(Value::Int(31))).indexed().get(&rtxn.kv, env).unwrap();
    assert!(old.is_empty());
    assert_eq!(new, vec![rid]);
}

#[test]
fn test_remove_detaches_from_index_and_deletes_record() {
    let (_dir, mgr) = temp_manager();
    let mut wtxn = mgr.begin_write().unwrap();
    wtxn.add_class("person", ClassKind::Vertex, None).unwrap();
    wtxn.add_property("person", "age", PropertyType::Int).unwrap();
    wtxn.create_index("person", "age", true).unwrap();
    let rid = wtxn.add_vertex("person", &rec(&[("age", Value::Int(55))])).unwrap();
    wtxn.remove(rid).unwrap();
    wtxn.commit().unwrap();

    let rtxn = mgr.begin_read().unwrap();
    let env = rtxn.env();
    assert!(rtxn.fetch_by_rid(rid).unwrap().is_none());
    let found = rtxn.find("person").unwrap().where_cond("age", Condition::Eq(Value::Int(55))).indexed().get(&rtxn.kv, env).unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_remove_vertex_cascades_to_incident_edges() {
    let (_dir, mgr) = temp_manager();
    let mut wtxn = mgr.begin_write().unwrap();
    wtxn.add_class("person", ClassKind::Vertex, None).unwrap();
    wtxn.add_class("knows", ClassKind::Edge, None).unwrap();
    let a = wtxn.add_vertex("person", &rec(&[])).unwrap();
    let b = wtxn.add_vertex("person", &rec(&[])).unwrap();
    wtxn.add_edge("knows", a, b, &rec(&[])).unwrap();
    wtxn.remove(a).unwrap();
    wtxn.commit().unwrap();

    let rtxn = mgr.begin_read().unwrap();
    let rel = RelationDbs::open(rtxn.env()).unwrap();
    assert!(rtxn.traverse_out(&rel, b, None, None, None, None).unwrap().len() <= 1);
}

#[test]
fn test_drop_class_rejects_nonempty_class() {
    let (_dir, mgr) = temp_manager();
    let mut wtxn = mgr.begin_write().unwrap();
    wtxn.add_class("person", ClassKind::Vertex, None).unwrap();
    wtxn.add_vertex("person", &rec(&[])).unwrap();
    let err = wtxn.drop_class("person").unwrap_err();
    assert_eq!(err.code(), UsageError::ClassNotEmpty.code());
}

#[test]
fn test_drop_class_succeeds_once_empty() {
    let (_dir, mgr) = temp_manager();
    let mut wtxn = mgr.begin_write().unwrap();
    wtxn.add_class("person", ClassKind::Vertex, None).unwrap();
    let rid = wtxn.add_vertex("person", &rec(&[])).unwrap();
    wtxn.remove(rid).unwrap();
    wtxn.drop_class("person").unwrap();
}

#[test]
fn test_add_subclass_of_through_write_txn_rejects_cycle() {
    let (_dir, mgr) = temp_manager();
    let mut wtxn = mgr.begin_write().unwrap();
    wtxn.add_class("a", ClassKind::Vertex, None).unwrap();
    wtxn.add_class("b", ClassKind::Vertex, Some("a")).unwrap();
    let err = wtxn.add_subclass_of("a", "b").unwrap_err();
    assert_eq!(err.code(), UsageError::CyclicInheritance.code());
}
