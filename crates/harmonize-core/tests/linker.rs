use harmonize_core::{
    ConstraintValidator, ConstraintViolation, LinkError, LinkRequest, Linker, ValidationContext,
    ValidationStage, ViolationDetail, build_default_registry,
};
use harmonize_model::{
    Cardinality, ConstraintKey, ConstraintSet, ForeignKeyDescriptor, JoinHow, Side,
};
use polars::prelude::{Column, DataFrame};

fn frame(columns: Vec<Column>) -> DataFrame {
    DataFrame::new(columns).expect("df")
}

fn strings(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .expect("column")
        .str()
        .expect("str")
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect()
}

fn ints(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
    df.column(name)
        .expect("column")
        .i64()
        .expect("i64")
        .into_iter()
        .collect()
}

fn link(
    local: &DataFrame,
    remote: &DataFrame,
    fk: &ForeignKeyDescriptor,
) -> Result<harmonize_core::LinkOutcome, LinkError> {
    Linker::default().link(&LinkRequest {
        entity: "sample",
        local,
        remote,
        foreign_key: fk,
        remote_id: None,
    })
}

fn samples(unknown_sites: usize) -> DataFrame {
    let sample_ids: Vec<i64> = (1..=1000).collect();
    let site_ids: Vec<i64> = (0..1000)
        .map(|i| {
            if i < unknown_sites {
                9001 + i as i64
            } else {
                (i as i64 % 500) + 1
            }
        })
        .collect();
    frame(vec![
        Column::new("sample_id".into(), sample_ids),
        Column::new("site_id".into(), site_ids),
    ])
}

fn sites() -> DataFrame {
    let site_ids: Vec<i64> = (1..=500).collect();
    let names: Vec<String> = site_ids.iter().map(|id| format!("site-{id}")).collect();
    frame(vec![
        Column::new("site_id".into(), site_ids),
        Column::new("name".into(), names),
    ])
}

fn sample_to_site() -> ForeignKeyDescriptor {
    ForeignKeyDescriptor::new("site", ["site_id"], ["site_id"])
        .with_extra_columns(["name"])
        .with_constraints(
            ConstraintSet::default()
                .with_cardinality(Cardinality::ManyToOne)
                .with_allow_unmatched_left(false),
        )
}

#[test]
fn many_to_one_link_keeps_every_sample() {
    let outcome = link(&samples(0), &sites(), &sample_to_site()).expect("link");
    assert_eq!(outcome.table.height(), 1000);
    assert_eq!(
        outcome.table.get_column_names_str(),
        vec!["sample_id", "site_id", "name"]
    );
    let names = strings(&outcome.table, "name");
    assert_eq!(names[0].as_deref(), Some("site-1"));
    assert_eq!(names[999].as_deref(), Some("site-500"));
    assert!(outcome.warnings.is_empty());
}

#[test]
fn unmatched_samples_are_counted() {
    let err = link(&samples(5), &sites(), &sample_to_site()).expect_err("violation");
    let LinkError::Violations {
        stage, violations, ..
    } = &err
    else {
        panic!("expected violations, got {err}");
    };
    assert_eq!(*stage, ValidationStage::PostMergeMatch);
    assert_eq!(violations.len(), 2);
    assert_eq!(violations[0].key, ConstraintKey::ALLOW_UNMATCHED_LEFT);
    assert!(matches!(
        violations[0].detail,
        ViolationDetail::UnmatchedLeft { count: 5, .. }
    ));
    // The dropped rows also break the many_to_one row count.
    assert_eq!(violations[1].key, ConstraintKey::CARDINALITY);
    insta::assert_snapshot!(
        err.to_string(),
        @"foreign key sample -> site: 2 constraint violation(s) at post_merge_match: sample -> site [allow_unmatched_left]: 5 unmatched left row(s) (e.g. 9001; 9002; 9003; 9004; 9005); sample -> site [cardinality]: many_to_one violated: join returned 995 row(s) for 1000 local row(s) (1000 local row(s), 995 output row(s))"
    );
}

#[test]
fn multiple_matches_follow_local_then_remote_order() {
    let local = frame(vec![
        Column::new("code".into(), ["a", "b", "a"]),
        Column::new("seq".into(), [1i64, 2, 3]),
    ]);
    let remote = frame(vec![
        Column::new("code".into(), ["a", "b", "a"]),
        Column::new("v".into(), [10i64, 20, 30]),
    ]);
    let fk = ForeignKeyDescriptor::new("site", ["code"], ["code"]).with_extra_columns(["v"]);
    let outcome = link(&local, &remote, &fk).expect("link");
    assert_eq!(
        ints(&outcome.table, "seq"),
        vec![Some(1), Some(1), Some(2), Some(3), Some(3)]
    );
    assert_eq!(
        ints(&outcome.table, "v"),
        vec![Some(10), Some(30), Some(20), Some(10), Some(30)]
    );
}

#[test]
fn cross_join_multiplies_rows() {
    let local = frame(vec![Column::new("seq".into(), [1i64, 2, 3])]);
    let remote = frame(vec![Column::new("arm".into(), ["x", "y", "z", "w"])]);
    let fk = ForeignKeyDescriptor::cross("arm")
        .with_extra_columns(["arm"])
        .with_constraints(ConstraintSet::default().with_allow_unmatched_left(false));
    let outcome = link(&local, &remote, &fk).expect("link");
    assert_eq!(outcome.table.height(), 12);
    assert_eq!(ints(&outcome.table, "seq")[..4], [Some(1); 4]);
    assert_eq!(
        strings(&outcome.table, "arm")[..4],
        [
            Some("x".to_string()),
            Some("y".to_string()),
            Some("z".to_string()),
            Some("w".to_string())
        ]
    );
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("allow_unmatched_left"));
}

#[test]
fn left_join_keeps_unmatched_rows_with_null_remote_columns() {
    let local = frame(vec![Column::new("code".into(), ["a", "z"])]);
    let remote = frame(vec![
        Column::new("code".into(), ["a"]),
        Column::new("v".into(), [1i64]),
    ]);
    let fk = ForeignKeyDescriptor::new("site", ["code"], ["code"])
        .with_how(JoinHow::Left)
        .with_extra_columns(["v"]);
    let outcome = link(&local, &remote, &fk).expect("link");
    assert_eq!(ints(&outcome.table, "v"), vec![Some(1), None]);
}

#[test]
fn outer_join_coalesces_shared_keys() {
    let local = frame(vec![
        Column::new("code".into(), ["a", "b"]),
        Column::new("x".into(), [1i64, 2]),
    ]);
    let remote = frame(vec![
        Column::new("code".into(), ["b", "c"]),
        Column::new("v".into(), [20i64, 30]),
    ]);
    let fk = ForeignKeyDescriptor::new("site", ["code"], ["code"])
        .with_how(JoinHow::Outer)
        .with_extra_columns(["v"]);
    let outcome = link(&local, &remote, &fk).expect("link");
    assert_eq!(
        strings(&outcome.table, "code"),
        vec![
            Some("a".to_string()),
            Some("b".to_string()),
            Some("c".to_string())
        ]
    );
    assert_eq!(ints(&outcome.table, "x"), vec![Some(1), Some(2), None]);
    assert_eq!(ints(&outcome.table, "v"), vec![None, Some(20), Some(30)]);
}

#[test]
fn keys_match_on_text_across_dtypes() {
    let local = frame(vec![Column::new("site".into(), ["1", "2"])]);
    let remote = frame(vec![
        Column::new("site_id".into(), [1i64, 2]),
        Column::new("name".into(), ["North", "South"]),
    ]);
    let fk = ForeignKeyDescriptor::new("site", ["site"], ["site_id"])
        .with_extra_columns(["name"])
        .with_constraints(ConstraintSet::default().with_allow_unmatched_left(false));
    let outcome = link(&local, &remote, &fk).expect("link");
    assert_eq!(
        strings(&outcome.table, "name"),
        vec![Some("North".to_string()), Some("South".to_string())]
    );
}

#[test]
fn pre_merge_violations_are_reported_together() {
    let local = frame(vec![Column::new("code".into(), [Some("a"), None])]);
    let remote = frame(vec![Column::new("code".into(), ["a", "a"])]);
    let fk = ForeignKeyDescriptor::new("site", ["code"], ["code"]).with_constraints(
        ConstraintSet::default()
            .with_allow_null_keys(false)
            .with_require_unique_right(true)
            .with_allow_unmatched_left(false),
    );
    let err = link(&local, &remote, &fk).expect_err("violation");
    let LinkError::Violations {
        stage, violations, ..
    } = &err
    else {
        panic!("expected violations, got {err}");
    };
    assert_eq!(*stage, ValidationStage::PreMerge);
    let keys: Vec<ConstraintKey> = violations.iter().map(|v| v.key).collect();
    assert_eq!(
        keys,
        vec![
            ConstraintKey::ALLOW_NULL_KEYS,
            ConstraintKey::REQUIRE_UNIQUE_RIGHT
        ]
    );
    assert_eq!(
        violations[0].detail,
        ViolationDetail::NullKeys {
            left_rows: 1,
            right_rows: 0,
            columns: vec!["sample.code".to_string()],
        }
    );
    assert_eq!(
        violations[1].detail,
        ViolationDetail::DuplicateKeys {
            side: Side::Right,
            columns: vec!["code".to_string()],
            duplicate_rows: 1,
            sample: vec!["a".to_string()],
        }
    );
}

#[test]
fn row_decrease_is_a_post_merge_violation() {
    let local = frame(vec![Column::new("code".into(), ["a", "b", "c"])]);
    let remote = frame(vec![Column::new("code".into(), ["a", "b"])]);
    let fk = ForeignKeyDescriptor::new("site", ["code"], ["code"])
        .with_constraints(ConstraintSet::default().with_allow_row_decrease(false));
    let err = link(&local, &remote, &fk).expect_err("violation");
    assert_eq!(err.violations().len(), 1);
    assert_eq!(
        err.violations()[0].detail,
        ViolationDetail::RowDecrease {
            before: 3,
            after: 2
        }
    );
}

#[test]
fn unmatched_remote_rows_are_counted_for_inner_joins() {
    let local = frame(vec![Column::new("code".into(), ["a"])]);
    let remote = frame(vec![Column::new("code".into(), ["a", "b", "c"])]);
    let fk = ForeignKeyDescriptor::new("site", ["code"], ["code"])
        .with_constraints(ConstraintSet::default().with_allow_unmatched_right(false));
    let err = link(&local, &remote, &fk).expect_err("violation");
    assert!(matches!(
        &err.violations()[0].detail,
        ViolationDetail::UnmatchedRight { count: 2, sample } if sample == &["b", "c"]
    ));
}

#[test]
fn one_to_one_rejects_reused_remote_rows() {
    let local = frame(vec![Column::new("code".into(), ["a", "a"])]);
    let remote = frame(vec![Column::new("code".into(), ["a"])]);
    let fk = ForeignKeyDescriptor::new("site", ["code"], ["code"])
        .with_constraints(ConstraintSet::default().with_cardinality(Cardinality::OneToOne));
    let err = link(&local, &remote, &fk).expect_err("violation");
    let ViolationDetail::Cardinality {
        expected, reason, ..
    } = &err.violations()[0].detail
    else {
        panic!("expected a cardinality violation");
    };
    assert_eq!(*expected, Cardinality::OneToOne);
    assert_eq!(reason, "1 remote row(s) matched more than one local row");
}

#[test]
fn many_to_one_rejects_multiplied_rows() {
    let local = frame(vec![Column::new("code".into(), ["a", "b"])]);
    let remote = frame(vec![Column::new("code".into(), ["a", "a", "b"])]);
    let fk = ForeignKeyDescriptor::new("site", ["code"], ["code"])
        .with_constraints(ConstraintSet::default().with_cardinality(Cardinality::ManyToOne));
    let err = link(&local, &remote, &fk).expect_err("violation");
    assert_eq!(err.violations()[0].key, ConstraintKey::CARDINALITY);
}

fn dropped_row_frames() -> (DataFrame, DataFrame) {
    let local = frame(vec![Column::new("k".into(), [1i64, 2, 3])]);
    let remote = frame(vec![Column::new("k".into(), [1i64, 2])]);
    (local, remote)
}

#[test]
fn one_to_one_rejects_dropped_rows() {
    let (local, remote) = dropped_row_frames();
    let fk = ForeignKeyDescriptor::new("site", ["k"], ["k"])
        .with_constraints(ConstraintSet::default().with_cardinality(Cardinality::OneToOne));
    let err = link(&local, &remote, &fk).expect_err("inner join dropped a row");
    let violations = err.violations();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].key, ConstraintKey::CARDINALITY);
    let ViolationDetail::Cardinality {
        local_rows,
        output_rows,
        reason,
        ..
    } = &violations[0].detail
    else {
        panic!("expected a cardinality violation");
    };
    assert_eq!((*local_rows, *output_rows), (3, 2));
    assert_eq!(reason, "join returned 2 row(s) for 3 local row(s)");
}

#[test]
fn many_to_one_rejects_dropped_rows() {
    let (local, remote) = dropped_row_frames();
    let fk = ForeignKeyDescriptor::new("site", ["k"], ["k"])
        .with_constraints(ConstraintSet::default().with_cardinality(Cardinality::ManyToOne));
    let err = link(&local, &remote, &fk).expect_err("inner join dropped a row");
    assert_eq!(err.violations().len(), 1);
    assert_eq!(err.violations()[0].key, ConstraintKey::CARDINALITY);
    assert!(matches!(
        err.violations()[0].detail,
        ViolationDetail::Cardinality {
            expected: Cardinality::ManyToOne,
            local_rows: 3,
            output_rows: 2,
            ..
        }
    ));
}

#[test]
fn many_to_one_keeps_unmatched_rows_of_left_joins() {
    let (local, remote) = dropped_row_frames();
    let fk = ForeignKeyDescriptor::new("site", ["k"], ["k"])
        .with_how(JoinHow::Left)
        .with_constraints(ConstraintSet::default().with_cardinality(Cardinality::ManyToOne));
    let outcome = link(&local, &remote, &fk).expect("left join keeps every row");
    assert_eq!(outcome.table.height(), 3);
}

#[test]
fn one_to_many_allows_growth_but_not_lost_keys() {
    let local = frame(vec![Column::new("code".into(), ["a", "b"])]);
    let remote = frame(vec![Column::new("code".into(), ["a", "a", "b"])]);
    let fk = ForeignKeyDescriptor::new("visit", ["code"], ["code"])
        .with_constraints(ConstraintSet::default().with_cardinality(Cardinality::OneToMany));
    let outcome = link(&local, &remote, &fk).expect("growth is allowed");
    assert_eq!(outcome.table.height(), 3);

    let remote = frame(vec![Column::new("code".into(), ["a", "a"])]);
    let err = link(&local, &remote, &fk).expect_err("lost key");
    assert_eq!(err.violations()[0].key, ConstraintKey::CARDINALITY);
}

#[test]
fn missing_key_column_is_named() {
    let local = frame(vec![Column::new("code".into(), ["a"])]);
    let remote = frame(vec![Column::new("code".into(), ["a"])]);
    let fk = ForeignKeyDescriptor::new("site", ["site_code"], ["code"]);
    let err = link(&local, &remote, &fk).expect_err("missing");
    assert!(matches!(
        &err,
        LinkError::MissingColumns { side: Side::Left, columns, .. } if columns == &["site_code"]
    ));
}

#[test]
fn carried_column_collision_is_fatal() {
    let local = frame(vec![
        Column::new("code".into(), ["a"]),
        Column::new("name".into(), ["local"]),
    ]);
    let remote = frame(vec![
        Column::new("code".into(), ["a"]),
        Column::new("name".into(), ["remote"]),
    ]);
    let fk = ForeignKeyDescriptor::new("site", ["code"], ["code"]).with_extra_columns(["name"]);
    let err = link(&local, &remote, &fk).expect_err("collision");
    assert!(matches!(err, LinkError::ColumnCollision { column, .. } if column == "name"));
}

#[test]
fn remote_surrogate_id_is_carried_first() {
    let local = frame(vec![Column::new("code".into(), ["b", "a"])]);
    let remote = frame(vec![
        Column::new("site_id".into(), [1i64, 2]),
        Column::new("code".into(), ["a", "b"]),
        Column::new("name".into(), ["North", "South"]),
    ]);
    let fk = ForeignKeyDescriptor::new("site", ["code"], ["code"]).with_extra_columns(["name"]);
    let outcome = Linker::default()
        .link(&LinkRequest {
            entity: "sample",
            local: &local,
            remote: &remote,
            foreign_key: &fk,
            remote_id: Some("site_id"),
        })
        .expect("link");
    assert_eq!(
        outcome.table.get_column_names_str(),
        vec!["code", "site_id", "name"]
    );
    assert_eq!(ints(&outcome.table, "site_id"), vec![Some(2), Some(1)]);
}

#[test]
fn allowed_null_keys_produce_a_warning() {
    let local = frame(vec![Column::new("code".into(), [Some("a"), None])]);
    let remote = frame(vec![Column::new("code".into(), ["a"])]);
    let fk = ForeignKeyDescriptor::new("site", ["code"], ["code"]).with_how(JoinHow::Left);
    let outcome = link(&local, &remote, &fk).expect("link");
    assert_eq!(outcome.table.height(), 2);
    assert_eq!(
        outcome.warnings,
        vec!["foreign key sample -> site: 1 local row(s) have a null key and never match"]
    );
}

struct MaxFanout;

impl ConstraintValidator for MaxFanout {
    fn key(&self) -> ConstraintKey {
        ConstraintKey::custom("max_fanout")
    }

    fn stage(&self) -> ValidationStage {
        ValidationStage::PostMergeMatch
    }

    fn check(&self, ctx: &ValidationContext<'_>) -> Option<ConstraintViolation> {
        let limit = ctx.constraints().custom_value(self.key())?.as_u64()? as usize;
        let worst = ctx.merge?.left_matches.iter().copied().max().unwrap_or(0);
        (worst > limit).then(|| {
            ctx.violation(
                self.key(),
                self.stage(),
                ViolationDetail::Custom {
                    message: format!("a local row matched {worst} remote rows (limit {limit})"),
                },
            )
        })
    }
}

#[test]
fn registered_custom_validator_runs_by_key() {
    let mut registry = build_default_registry();
    registry.register(Box::new(MaxFanout));
    let local = frame(vec![Column::new("code".into(), ["a"])]);
    let remote = frame(vec![Column::new("code".into(), ["a", "a", "a"])]);
    let fk = ForeignKeyDescriptor::new("site", ["code"], ["code"])
        .with_constraints(ConstraintSet::default().with_custom("max_fanout", serde_json::json!(2)));

    let err = Linker::new(&registry)
        .link(&LinkRequest {
            entity: "sample",
            local: &local,
            remote: &remote,
            foreign_key: &fk,
            remote_id: None,
        })
        .expect_err("fanout");
    assert_eq!(err.violations()[0].key.as_str(), "max_fanout");
    assert_eq!(
        err.violations()[0].detail.to_string(),
        "a local row matched 3 remote rows (limit 2)"
    );

    let outcome = link(&local, &remote, &fk).expect("no validator registered");
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("no validator registered for constraint max_fanout"));
}

#[test]
fn cross_join_with_keys_is_a_shape_error() {
    let local = frame(vec![Column::new("code".into(), ["a"])]);
    let fk = ForeignKeyDescriptor::new("site", ["code"], ["code"]).with_how(JoinHow::Cross);
    let err = link(&local, &local, &fk).expect_err("shape");
    assert!(matches!(err, LinkError::Shape(_)));
}
