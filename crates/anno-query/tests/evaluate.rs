//! Direct evaluation against a built graph.

use anno_core::{DiscourseData, Span, TierDefinition};
use anno_graph::{AnnotationGraph, ClosureEngine, GraphBuilder};
use anno_query::{
    AttributeKind, EvalError, Hierarchy, QuerySpecification, SpecificationError, compile, count,
    evaluate,
};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};

#[fixture]
fn cat() -> AnnotationGraph {
    let data = DiscourseData::new("s01")
        .with_tier(
            TierDefinition::dependent("word"),
            vec![Span::over("cat", "phone", 0, 3)],
        )
        .with_tier(
            TierDefinition::anchor("phone"),
            vec![
                Span::timed("k", 0.00, 0.08),
                Span::timed("a", 0.08, 0.20),
                Span::timed("t", 0.20, 0.27),
            ],
        );
    let mut graph = AnnotationGraph::new();
    GraphBuilder::new(&mut graph).build(&data).unwrap();
    graph
}

fn labels(graph: &AnnotationGraph, spec: &QuerySpecification) -> Vec<String> {
    evaluate(graph, spec)
        .unwrap()
        .into_iter()
        .map(|id| graph.label(graph.edge(id).unwrap()).to_string())
        .collect()
}

#[rstest]
fn label_query_after_closure(cat: AnnotationGraph) {
    let word = cat.tier_by_label("word").unwrap();
    let phone = cat.tier_by_label("phone").unwrap();
    let closure = ClosureEngine::new(&cat).compute_closure(word, phone).unwrap();
    let cat_id = cat.annotation_id("cat").unwrap();
    assert_eq!(closure.subarcs_of(cat_id).collect::<Vec<_>>(), vec!["k.a.t."]);

    let h = Hierarchy::from_graph("buckeye", &cat);
    let spec = h
        .find("phone")
        .unwrap()
        .filter(h.tier("phone").unwrap().label().equals("a"));

    assert_eq!(labels(&cat, &spec), vec!["a"]);
    assert!(compile(&spec).unwrap().text.contains("r_phone.label = 'a'"));
}

#[rstest]
#[case(-1, "k", vec!["a"])]
#[case(-2, "k", vec!["t"])]
#[case(1, "t", vec!["a"])]
#[case(2, "k", vec![])]
fn neighbours_by_offset(
    cat: AnnotationGraph,
    #[case] offset: i32,
    #[case] label: &str,
    #[case] expected: Vec<&str>,
) {
    let h = Hierarchy::from_graph("buckeye", &cat);
    let phone = h.tier("phone").unwrap();
    let spec = h
        .find("phone")
        .unwrap()
        .filter(phone.at(offset).label().equals(label));
    assert_eq!(labels(&cat, &spec), expected);
}

#[rstest]
fn durations_compare_numerically(cat: AnnotationGraph) {
    let h = Hierarchy::from_graph("buckeye", &cat);
    let phone = h.tier("phone").unwrap();
    let spec = h
        .find("phone")
        .unwrap()
        .filter(phone.duration().greater_than(0.1));
    assert_eq!(labels(&cat, &spec), vec!["a"]);
}

#[rstest]
fn enclosing_and_contained_annotations(cat: AnnotationGraph) {
    let h = Hierarchy::from_graph("buckeye", &cat);
    let word = h.tier("word").unwrap();
    let phone = h.tier("phone").unwrap();

    let in_cat = h.find("phone").unwrap().filter(word.label().equals("cat"));
    assert_eq!(count(&cat, &in_cat).unwrap(), 3);
    let in_dog = h.find("phone").unwrap().filter(word.label().equals("dog"));
    assert_eq!(count(&cat, &in_dog).unwrap(), 0);

    let with_t = h
        .find("word")
        .unwrap()
        .filter_contains(phone.label().equals("t"));
    assert_eq!(labels(&cat, &with_t), vec!["cat"]);
    let with_z = h
        .find("word")
        .unwrap()
        .filter_contains(phone.label().equals("z"));
    assert_eq!(count(&cat, &with_z).unwrap(), 0);
}

#[rstest]
fn alignment_with_word_edges(cat: AnnotationGraph) {
    let h = Hierarchy::from_graph("buckeye", &cat);
    let initial = h.find("phone").unwrap().filter_left_aligned("word");
    assert_eq!(labels(&cat, &initial), vec!["k"]);
    let last = h.find("phone").unwrap().filter_right_aligned("word");
    assert_eq!(labels(&cat, &last), vec!["t"]);
}

#[rstest]
fn metadata_filters_are_not_evaluable(cat: AnnotationGraph) {
    let spec = QuerySpecification::new("buckeye", "phone").filter(
        AttributeKind::Speaker {
            property: "gender".into(),
        }
        .equals("f"),
    );
    match evaluate(&cat, &spec) {
        Err(EvalError::NotEvaluable { what }) => assert_eq!(what, "speaker_gender"),
        other => panic!("unexpected {other:?}"),
    }
    // The same specification is valid for the compiler.
    assert!(compile(&spec).is_ok());
}

#[rstest]
fn tiers_missing_from_the_graph(cat: AnnotationGraph) {
    let spec = QuerySpecification::new("buckeye", "syllable");
    match evaluate(&cat, &spec) {
        Err(EvalError::Specification(SpecificationError::UnknownTier { tier, available })) => {
            assert_eq!(tier, "syllable");
            assert_eq!(available.len(), 2);
        }
        other => panic!("unexpected {other:?}"),
    }
}
