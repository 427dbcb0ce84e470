//! End-to-end scenarios over the public API.
//!
//! Each test below materialises a worked example end to end: concrete
//! tag data, a query, and the expected fingerprint/result.

mod common;

use common::TestDb;
use rds_cache::coordinator::Coordinator;
use rds_cache::fingerprint::canonical_text;
use rds_cache::query::{AndNode, Branch, Op, Predicate, Query};

fn names(loaded: &std::collections::HashMap<String, Vec<rds_cache::Handle>>) -> Vec<String> {
    let mut v: Vec<String> = loaded.keys().cloned().collect();
    v.sort();
    v
}

#[test]
fn scenario_1_single_tag() {
    let db = TestDb::new();
    let conn = db.connect();
    db.seed_tags(
        &conn,
        r#"
        INSERT INTO objects (inode, objectname) VALUES (1, 'A'), (2, 'B'), (3, 'C');
        INSERT INTO tags (tag_id, tagname) VALUES (1, 't1'), (2, 't2');
        INSERT INTO tagging (inode, tag_id) VALUES (1, 1), (2, 1), (2, 2), (3, 2);
        "#,
    );

    let coordinator = Coordinator::new();
    let query = Query::single(Branch::new(vec![AndNode::new(Predicate::tag("t1"))]));
    let fp = coordinator.prepare(&conn, &query, false, false).unwrap().unwrap();

    assert_eq!(fp.to_string(), "1");
    assert_eq!(names(&coordinator.load(&conn, &fp).unwrap()), vec!["A", "B"]);
}

#[test]
fn scenario_2_conjunction() {
    let db = TestDb::new();
    let conn = db.connect();
    db.seed_tags(
        &conn,
        r#"
        INSERT INTO objects (inode, objectname) VALUES (1, 'A'), (2, 'B'), (3, 'C');
        INSERT INTO tags (tag_id, tagname) VALUES (1, 't1'), (2, 't2');
        INSERT INTO tagging (inode, tag_id) VALUES (1, 1), (2, 1), (2, 2), (3, 2);
        "#,
    );

    let coordinator = Coordinator::new();
    let branch = Branch::new(vec![
        AndNode::new(Predicate::tag("t1")),
        AndNode::new(Predicate::tag("t2")),
    ]);
    assert_eq!(canonical_text(&branch), "t1/t2/");

    let query = Query::single(branch);
    let fp = coordinator.prepare(&conn, &query, false, false).unwrap().unwrap();
    assert_eq!(names(&coordinator.load(&conn, &fp).unwrap()), vec!["B"]);
}

#[test]
fn scenario_3_negation() {
    let db = TestDb::new();
    let conn = db.connect();
    db.seed_tags(
        &conn,
        r#"
        INSERT INTO objects (inode, objectname) VALUES (1, 'A'), (2, 'B'), (3, 'C');
        INSERT INTO tags (tag_id, tagname) VALUES (1, 't1'), (2, 't2');
        INSERT INTO tagging (inode, tag_id) VALUES (1, 1), (2, 1), (2, 2), (3, 2);
        "#,
    );

    let coordinator = Coordinator::new();
    let branch = Branch::new(vec![
        AndNode::new(Predicate::tag("t1")).with_negated(vec![AndNode::new(Predicate::tag("t2"))]),
    ]);
    assert_eq!(canonical_text(&branch), "t1/-/t2/");

    let query = Query::single(branch);
    let fp = coordinator.prepare(&conn, &query, false, false).unwrap().unwrap();
    assert_eq!(names(&coordinator.load(&conn, &fp).unwrap()), vec!["A"]);
}

#[test]
fn scenario_4_disjunctive_two_branches_dedups() {
    let db = TestDb::new();
    let conn = db.connect();
    db.seed_tags(
        &conn,
        r#"
        INSERT INTO objects (inode, objectname) VALUES (1, 'A'), (2, 'B'), (3, 'C');
        INSERT INTO tags (tag_id, tagname) VALUES (1, 't1'), (2, 't2');
        INSERT INTO tagging (inode, tag_id) VALUES (1, 1), (2, 1), (2, 2), (3, 2);
        "#,
    );

    let coordinator = Coordinator::new();
    let query = Query::new(vec![
        Branch::new(vec![AndNode::new(Predicate::tag("t1"))]),
        Branch::new(vec![AndNode::new(Predicate::tag("t2"))]),
    ])
    .unwrap();
    let fp = coordinator.prepare(&conn, &query, false, false).unwrap().unwrap();

    assert_eq!(fp.to_string(), "1,2");
    let loaded = coordinator.load(&conn, &fp).unwrap();
    assert_eq!(names(&loaded), vec!["A", "B", "C"]);
    // B is in both branches' RDS rows but must appear once.
    assert_eq!(loaded.get("B").unwrap().len(), 1);
}

#[test]
fn scenario_5_triple_predicate_gt_and_lt() {
    let db = TestDb::new();
    let conn = db.connect();
    db.seed_tags(
        &conn,
        r#"
        INSERT INTO objects (inode, objectname) VALUES (1, 'X');
        INSERT INTO tags (tag_id, namespace, key, value) VALUES (1, 'ns1', 'size', '100');
        INSERT INTO tagging (inode, tag_id) VALUES (1, 1);
        "#,
    );

    let coordinator = Coordinator::new();

    let gt_branch = Branch::new(vec![AndNode::new(Predicate::triple(
        "ns1",
        "size",
        Op::Gt,
        "50",
    ))]);
    assert_eq!(canonical_text(&gt_branch), "ns1/size/gt/50/");
    let fp_gt = coordinator
        .prepare(&conn, &Query::single(gt_branch), false, false)
        .unwrap()
        .unwrap();
    assert_eq!(names(&coordinator.load(&conn, &fp_gt).unwrap()), vec!["X"]);

    let lt_branch = Branch::new(vec![AndNode::new(Predicate::triple(
        "ns1",
        "size",
        Op::Lt,
        "50",
    ))]);
    assert_eq!(canonical_text(&lt_branch), "ns1/size/lt/50/");
    let fp_lt = coordinator
        .prepare(&conn, &Query::single(lt_branch), false, false)
        .unwrap()
        .unwrap();
    assert!(coordinator.load(&conn, &fp_lt).unwrap().is_empty());
}

#[test]
fn scenario_6_invalidate_and_rebuild() {
    let db = TestDb::new();
    let conn = db.connect();
    db.seed_tags(
        &conn,
        r#"
        INSERT INTO objects (inode, objectname) VALUES (1, 'A'), (2, 'B'), (3, 'C');
        INSERT INTO tags (tag_id, tagname) VALUES (1, 't1'), (2, 't2'), (3, 't3');
        INSERT INTO tagging (inode, tag_id) VALUES (1, 1), (2, 1), (2, 2), (3, 2);
        "#,
    );

    let coordinator = Coordinator::new();
    let query = Query::single(Branch::new(vec![
        AndNode::new(Predicate::tag("t1")),
        AndNode::new(Predicate::tag("t2")),
    ]));
    let fp = coordinator.prepare(&conn, &query, false, false).unwrap().unwrap();
    assert_eq!(names(&coordinator.load(&conn, &fp).unwrap()), vec!["B"]);

    // Tag B with t3 — doesn't change t1/t2 membership, but exercises the
    // invalidate+rebuild path regardless.
    conn.execute("INSERT INTO tagging (inode, tag_id) VALUES (2, 3)", [])
        .unwrap();

    coordinator.invalidate(&conn, &fp).unwrap();
    let fp2 = coordinator.prepare(&conn, &query, false, true).unwrap().unwrap();
    assert_eq!(names(&coordinator.load(&conn, &fp2).unwrap()), vec!["B"]);
}
