use std::collections::BTreeMap;

use harmonize_core::{
    DefaultExtractor, ExtractError, Extractor, Normalizer, PipelineError, PipelineStage,
    ProcessState, TableStore, ValidatorRegistry, build_default_pipeline, default_registry,
};
use harmonize_model::{
    Cardinality, ConstraintKey, ConstraintSet, DropDuplicates, EntityDescriptor,
    FilterDescriptor, ForeignKeyDescriptor, ScalarValue, SourceDescriptor, UnnestDescriptor,
};
use polars::prelude::{Column, DataFrame};

fn text_rows(rows: &[&[&str]]) -> Vec<Vec<ScalarValue>> {
    rows.iter()
        .map(|row| row.iter().map(|value| ScalarValue::from(*value)).collect())
        .collect()
}

fn site() -> EntityDescriptor {
    EntityDescriptor::new(
        "site",
        SourceDescriptor::fixed(
            ["code", "label"],
            text_rows(&[&["N", "North"], &["S", "South"]]),
        ),
    )
    .with_surrogate_id("site_id")
    .with_keys(["code"])
}

fn sample(codes: &[&[&str]]) -> EntityDescriptor {
    EntityDescriptor::new(
        "sample",
        SourceDescriptor::fixed(["sample_code", "site_code"], text_rows(codes)),
    )
    .with_surrogate_id("sample_id")
    .with_foreign_key(
        ForeignKeyDescriptor::new("site", ["site_code"], ["code"])
            .with_extra_columns(["label"])
            .with_constraints(
                ConstraintSet::default()
                    .with_cardinality(Cardinality::ManyToOne)
                    .with_allow_unmatched_left(false),
            ),
    )
    .with_rename("label", "site_label")
    .with_columns(["sample_code", "site_id", "site_label"])
}

fn run(entities: &[EntityDescriptor]) -> Result<TableStore, PipelineError> {
    let state = ProcessState::build(entities)?;
    Normalizer::new().run(&state, entities, TableStore::new())
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

#[test]
fn links_entities_in_dependency_order() {
    let entities = vec![
        sample(&[&["s1", "S"], &["s2", "N"], &["s3", "S"]]),
        site(),
    ];
    let store = run(&entities).expect("run");

    assert_eq!(store.names().collect::<Vec<_>>(), vec!["site", "sample"]);
    let site = store.get("site").expect("site");
    assert_eq!(site.get_column_names_str(), vec!["site_id", "code", "label"]);
    assert_eq!(ints(site, "site_id"), vec![Some(1), Some(2)]);

    let sample = store.get("sample").expect("sample");
    assert_eq!(
        sample.get_column_names_str(),
        vec!["sample_id", "sample_code", "site_id", "site_label"]
    );
    assert_eq!(ints(sample, "sample_id"), vec![Some(1), Some(2), Some(3)]);
    assert_eq!(ints(sample, "site_id"), vec![Some(2), Some(1), Some(2)]);
    assert_eq!(
        strings(sample, "site_label"),
        vec![
            Some("South".to_string()),
            Some("North".to_string()),
            Some("South".to_string())
        ]
    );
}

#[test]
fn constraint_violation_aborts_the_run() {
    let entities = vec![site(), sample(&[&["s1", "S"], &["s2", "W"]])];
    let err = run(&entities).expect_err("violation");
    assert_eq!(err.entity(), Some("sample"));
    assert_eq!(err.stage(), Some(PipelineStage::Link));
    let keys: Vec<ConstraintKey> = err.violations().iter().map(|v| v.key).collect();
    assert_eq!(
        keys,
        vec![ConstraintKey::ALLOW_UNMATCHED_LEFT, ConstraintKey::CARDINALITY]
    );
    assert_eq!(err.violations()[0].remote_entity, "site");
}

#[test]
fn default_registry_applies_until_replaced() {
    let normalizer = Normalizer::new();
    assert_eq!(normalizer.registry().len(), default_registry().len());

    // Without validators the unmatched sample is dropped and only warned about.
    let entities = vec![site(), sample(&[&["s1", "S"], &["s2", "W"]])];
    let state = ProcessState::build(&entities).expect("order");
    let output = Normalizer::new()
        .with_registry(ValidatorRegistry::new())
        .run_with_report(&state, &entities, TableStore::new())
        .expect("nothing is validated");
    assert_eq!(output.store.get("sample").expect("sample").height(), 1);
    assert!(output.warning_count() > 0);
}

#[test]
fn duplicate_natural_key_is_fatal() {
    let entities = vec![
        EntityDescriptor::new(
            "site",
            SourceDescriptor::fixed(["code"], text_rows(&[&["N"], &["S"], &["N"]])),
        )
        .with_keys(["code"]),
    ];
    let err = run(&entities).expect_err("duplicate");
    let PipelineError::DuplicateKey {
        entity,
        stage,
        duplicates,
        sample,
        ..
    } = &err
    else {
        panic!("expected a duplicate key error, got {err}");
    };
    assert_eq!(entity, "site");
    assert_eq!(*stage, PipelineStage::KeyCheck);
    assert_eq!(*duplicates, 1);
    assert_eq!(sample, &["N"]);
    insta::assert_snapshot!(
        err.to_string(),
        @"entity site: key_check: 1 duplicate row(s) on [code] (e.g. N)"
    );
}

#[test]
fn removing_the_key_check_step_skips_uniqueness() {
    let entities = vec![
        EntityDescriptor::new(
            "site",
            SourceDescriptor::fixed(["code"], text_rows(&[&["N"], &["N"]])),
        )
        .with_keys(["code"]),
    ];
    let state = ProcessState::build(&entities).expect("order");
    let normalizer =
        Normalizer::new().with_pipeline(build_default_pipeline().remove_step("key_check"));
    let store = normalizer
        .run(&state, &entities, TableStore::new())
        .expect("run");
    assert_eq!(store.get("site").expect("site").height(), 2);
}

#[test]
fn filters_and_dedupe_remove_rows() {
    let entities = vec![
        site(),
        EntityDescriptor::new(
            "visit",
            SourceDescriptor::fixed(
                ["code", "status"],
                text_rows(&[&["N", "ok"], &["X", "ok"], &["S", "bad"], &["N", "ok"]]),
            ),
        )
        .with_filter(FilterDescriptor::ExistsIn {
            column: "code".to_string(),
            entity: "site".to_string(),
            remote_column: "code".to_string(),
        })
        .with_filter(FilterDescriptor::Equals {
            column: "status".to_string(),
            value: ScalarValue::from("ok"),
        })
        .with_drop_duplicates(DropDuplicates::All(true)),
    ];
    let store = run(&entities).expect("run");
    let visit = store.get("visit").expect("visit");
    assert_eq!(strings(visit, "code"), vec![Some("N".to_string())]);
}

#[test]
fn extra_columns_are_appended_by_name() {
    let entities = vec![
        EntityDescriptor::new("study", SourceDescriptor::fixed(["code"], text_rows(&[&["A"]])))
            .with_extra_column("version", 2i64)
            .with_extra_column("phase", "III"),
    ];
    let store = run(&entities).expect("run");
    let study = store.get("study").expect("study");
    assert_eq!(study.get_column_names_str(), vec!["code", "phase", "version"]);
    assert_eq!(ints(study, "version"), vec![Some(2)]);
}

#[test]
fn extra_column_collision_is_fatal() {
    let entities = vec![
        EntityDescriptor::new("study", SourceDescriptor::fixed(["code"], text_rows(&[&["A"]])))
            .with_extra_column("code", "B"),
    ];
    let err = run(&entities).expect_err("collision");
    assert!(matches!(
        err,
        PipelineError::ColumnCollision { stage: PipelineStage::Extract, ref column, .. } if column == "code"
    ));
}

#[test]
fn unnest_missing_column_names_the_entity() {
    let entities = vec![
        EntityDescriptor::new(
            "measurement",
            SourceDescriptor::fixed(["id", "a"], text_rows(&[&["1", "x"]])),
        )
        .with_unnest(UnnestDescriptor::new(["id"], ["a", "d"])),
    ];
    let err = run(&entities).expect_err("missing");
    assert_eq!(err.entity(), Some("measurement"));
    assert_eq!(err.stage(), Some(PipelineStage::Unnest));
    assert!(err.to_string().contains("missing column(s) d"));
}

#[test]
fn entity_source_copies_a_stored_table() {
    let entities = vec![
        EntityDescriptor::new("site_copy", SourceDescriptor::entity("site"))
            .with_columns(["code"]),
        site(),
    ];
    let store = run(&entities).expect("run");
    let copy = store.get("site_copy").expect("copy");
    assert_eq!(copy.get_column_names_str(), vec!["code"]);
    assert_eq!(copy.height(), 2);
}

#[test]
fn unreadable_source_is_an_extract_error() {
    let entities = vec![EntityDescriptor::new(
        "raw",
        SourceDescriptor::csv("/nonexistent/harmonize/raw.csv"),
    )];
    let err = run(&entities).expect_err("missing file");
    assert_eq!(err.entity(), Some("raw"));
    assert_eq!(err.stage(), Some(PipelineStage::Extract));
}

#[test]
fn repeated_runs_produce_identical_tables() {
    let entities = vec![
        sample(&[&["s1", "S"], &["s2", "N"], &["s3", "S"], &["s4", "N"]]),
        site(),
    ];
    let first = run(&entities).expect("first run");
    let second = run(&entities).expect("second run");
    for (name, table) in first.iter() {
        let other = second.get(name).expect("same entities");
        assert!(table.equals_missing(other), "{name} differs between runs");
    }
}

struct MemoryExtractor {
    tables: BTreeMap<String, DataFrame>,
}

impl Extractor for MemoryExtractor {
    fn extract(
        &self,
        entity: &EntityDescriptor,
        store: &TableStore,
    ) -> Result<DataFrame, ExtractError> {
        match self.tables.get(&entity.name) {
            Some(table) => Ok(table.clone()),
            None => DefaultExtractor.extract(entity, store),
        }
    }
}

#[test]
fn custom_extractor_supplies_tables_and_reports_steps() {
    let raw = DataFrame::new(vec![
        Column::new("subject".into(), ["001", "002"]),
        Column::new("weight".into(), [Some("70"), None]),
        Column::new("height".into(), [Some("180"), Some("165")]),
    ])
    .expect("df");
    let mut tables = BTreeMap::new();
    tables.insert("vitals".to_string(), raw);

    let entities = vec![
        EntityDescriptor::new("vitals", SourceDescriptor::csv("vitals.csv"))
            .with_unnest(UnnestDescriptor::new(["subject"], ["weight", "height"]))
            .with_surrogate_id("vital_id")
            .with_keys(["subject", "variable"]),
    ];
    let state = ProcessState::build(&entities).expect("order");
    let normalizer = Normalizer::new().with_extractor(Box::new(MemoryExtractor { tables }));
    let output = normalizer
        .run_with_report(&state, &entities, TableStore::new())
        .expect("run");

    let vitals = output.store.get("vitals").expect("vitals");
    assert_eq!(vitals.height(), 4);
    assert_eq!(
        vitals.get_column_names_str(),
        vec!["vital_id", "subject", "variable", "value"]
    );

    let report = &output.reports[0];
    assert_eq!(report.entity, "vitals");
    assert_eq!(report.source, "csv");
    assert_eq!(report.rows, 4);
    assert!(report.generated_surrogate_id);
    assert_eq!(
        report.steps,
        vec!["extract", "unnest", "surrogate_id", "key_check"]
    );
    assert_eq!(output.warning_count(), 0);
}
