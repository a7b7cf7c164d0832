use crate::RegresqlError;
use crate::plan::schema::{Bindings, PlanDocument, PlanError};
use crate::plan::store::*;
use crate::query::parse_query_string;
use pretty_assertions::assert_eq;
use std::path::Path;

fn bindings(pairs: &[(&str, &str)]) -> Bindings {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_plan_path_replaces_extension() {
    let q = parse_query_string("src/sql/album-tracks.sql", "select :album");
    assert_eq!(
        plan_path(&q, Path::new("regresql/plans/src/sql")),
        Path::new("regresql/plans/src/sql/album-tracks.yaml")
    );
}

#[test]
fn test_create_empty_plan() {
    let dir = tempfile::tempdir().unwrap();
    let q = parse_query_string("q/artist.sql", "select * from t where a = :a and b = :b or c = :a");

    let plan = create_empty_plan(&q, dir.path()).unwrap();
    assert_eq!(plan.names, vec!["1"]);
    assert_eq!(plan.bindings, vec![bindings(&[("a", ""), ("b", "")])]);

    let reloaded = get_plan(&q, dir.path()).unwrap();
    assert_eq!(reloaded.names, plan.names);
    assert_eq!(reloaded.bindings, plan.bindings);
}

#[test]
fn test_create_empty_plan_twice_fails() {
    let dir = tempfile::tempdir().unwrap();
    let q = parse_query_string("q/artist.sql", "select * from artist where id = :id");

    create_empty_plan(&q, dir.path()).unwrap();
    let path = plan_path(&q, dir.path());
    std::fs::write(&path, "'1':\n  id: '42'\n").unwrap();

    let err = create_empty_plan(&q, dir.path()).unwrap_err();
    assert!(matches!(
        err,
        RegresqlError::Plan(PlanError::AlreadyExists { .. })
    ));

    // the user's edit is still there
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "'1':\n  id: '42'\n"
    );
}

#[test]
fn test_trivial_plan_is_not_written() {
    let dir = tempfile::tempdir().unwrap();
    let q = parse_query_string("q/genre.sql", "select * from genre");

    let plan = create_empty_plan(&q, dir.path()).unwrap();
    assert!(plan.is_empty());
    assert!(!plan_path(&q, dir.path()).exists());

    // and reading it back is not an error
    let plan = get_plan(&q, dir.path()).unwrap();
    assert!(plan.is_empty());
}

#[test]
fn test_get_plan_missing_with_variables() {
    let dir = tempfile::tempdir().unwrap();
    let q = parse_query_string("q/artist.sql", "select * from artist where id = :id");

    let err = get_plan(&q, dir.path()).unwrap_err();
    assert!(matches!(err, RegresqlError::Plan(PlanError::Missing { .. })));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn test_plan_round_trip_keeps_order() {
    let dir = tempfile::tempdir().unwrap();
    let q = parse_query_string("q/album.sql", "select * from album where id = :id");

    let plan = Plan {
        query: &q,
        path: plan_path(&q, dir.path()),
        names: vec!["1".to_string(), "2".to_string()],
        bindings: vec![bindings(&[("id", "5")]), bindings(&[("id", "6")])],
    };
    plan.write().unwrap();

    let reloaded = get_plan(&q, dir.path()).unwrap();
    assert_eq!(reloaded.names, vec!["1", "2"]);
    assert_eq!(
        reloaded.bindings,
        vec![bindings(&[("id", "5")]), bindings(&[("id", "6")])]
    );
}

#[test]
fn test_user_labels_and_unquoted_scalars() {
    let dir = tempfile::tempdir().unwrap();
    let q = parse_query_string("q/track.sql", "select :album, :limit, :flag");
    std::fs::write(
        plan_path(&q, dir.path()),
        "zeppelin:\n  album: Houses of the Holy\n  limit: 10\n  flag: true\n1:\n  album: ~\n  limit: 2.5\n  flag: false\n",
    )
    .unwrap();

    let plan = get_plan(&q, dir.path()).unwrap();
    assert_eq!(plan.names, vec!["zeppelin", "1"]);
    assert_eq!(
        plan.bindings[0],
        bindings(&[("album", "Houses of the Holy"), ("limit", "10"), ("flag", "true")])
    );
    assert_eq!(
        plan.bindings[1],
        bindings(&[("album", ""), ("limit", "2.5"), ("flag", "false")])
    );
}

#[test]
fn test_malformed_plan() {
    let path = Path::new("plans/q.yaml");

    let err = PlanDocument::parse(path, "- 1\n- 2\n").unwrap_err();
    assert!(matches!(err, PlanError::Malformed { .. }));

    let err = PlanDocument::parse(path, "'1':\n  id: [1, 2]\n").unwrap_err();
    assert!(err.to_string().contains("must be a scalar"));

    let err = PlanDocument::parse(path, "'1': 42\n").unwrap_err();
    assert!(err.to_string().contains("must be a mapping"));

    let err = PlanDocument::parse(path, "'1': [unterminated\n").unwrap_err();
    assert!(matches!(err, PlanError::Malformed { .. }));
}

#[test]
fn test_label_must_be_a_file_name() {
    let path = Path::new("plans/q.yaml");

    for content in [
        "'../../escape':\n  id: 1\n",
        "a/b:\n  id: 1\n",
        "'a\\b':\n  id: 1\n",
        "'..':\n  id: 1\n",
        "'':\n  id: 1\n",
    ] {
        let err = PlanDocument::parse(path, content).unwrap_err();
        assert!(matches!(err, PlanError::Malformed { .. }), "{}", content);
        assert!(err.to_string().contains("cannot be used in a file name"));
    }

    let doc = PlanDocument::parse(path, "v1.2:\n  id: 1\n").unwrap();
    assert_eq!(doc.names, vec!["v1.2"]);
}

#[test]
fn test_empty_document_has_no_bindings() {
    let doc = PlanDocument::parse(Path::new("plans/q.yaml"), "").unwrap();
    assert!(doc.names.is_empty());
    assert!(doc.bindings.is_empty());
}

#[test]
fn test_output_file_names() {
    let plain = parse_query_string("q/genre.sql", "select * from genre");
    let plan = Plan::empty(&plain, "plans/genre.yaml".into());
    assert_eq!(plan.output_file_name(0), "genre.out");

    let with_vars = parse_query_string("q/album.sql", "select * from album where id = :id");
    let plan = Plan {
        query: &with_vars,
        path: "plans/album.yaml".into(),
        names: vec!["1".to_string(), "big".to_string()],
        bindings: vec![bindings(&[("id", "1")]), bindings(&[("id", "99")])],
    };
    assert_eq!(plan.output_file_name(0), "album.1.out");
    assert_eq!(plan.output_file_name(1), "album.big.out");
}
