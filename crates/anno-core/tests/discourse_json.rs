//! The JSON form of `DiscourseData` is the contract with ingestion collaborators.

use anno_core::{DiscourseData, Span, TierDefinition};
use pretty_assertions::assert_eq;

const CAT: &str = r#"{
  "name": "cat",
  "tiers": [
    { "definition": { "name": "word" }, "spans": [ { "label": "cat", "refs": { "phone": [0, 3] } } ] },
    { "definition": { "name": "phone", "anchor": true, "base": true, "token": true },
      "spans": [ { "label": "k" }, { "label": "a" }, { "label": "t" } ] }
  ]
}"#;

fn schema_errors(instance: &serde_json::Value) -> Vec<String> {
    let schema = serde_json::to_value(DiscourseData::json_schema()).unwrap();
    let validator = jsonschema::validator_for(&schema).expect("schema should be valid");
    validator.iter_errors(instance).map(|e| format!("{e}")).collect()
}

#[test]
fn parses_minimal_discourse() {
    let data = DiscourseData::from_json(CAT).unwrap();

    let expected = DiscourseData::new("cat")
        .with_tier(
            TierDefinition::dependent("word"),
            vec![Span::over("cat", "phone", 0, 3)],
        )
        .with_tier(
            TierDefinition::anchor("phone"),
            vec![Span::unit("k"), Span::unit("a"), Span::unit("t")],
        );
    assert_eq!(data, expected);
}

#[test]
fn builder_output_validates_against_schema() {
    let data = DiscourseData::new("timed")
        .with_tier(
            TierDefinition::anchor("phone").with_delimiter("."),
            vec![Span::timed("k", 0.0, 0.1), Span::timed("a", 0.1, 0.25)],
        )
        .with_tier(
            TierDefinition::dependent("word"),
            vec![Span::over("ka", "phone", 0, 2)],
        );

    let instance = serde_json::to_value(&data).unwrap();
    let errors = schema_errors(&instance);
    assert!(errors.is_empty(), "schema validation failed: {errors:?}");
}

#[test]
fn rejects_span_without_label() {
    let err = DiscourseData::from_json(
        r#"{ "name": "x", "tiers": [ { "definition": { "name": "phone" }, "spans": [ {} ] } ] }"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("label"), "{err}");
}
