//! Compilation of specifications built through a hierarchy.

use anno_query::{Hierarchy, SpecificationError, compile, plan};
use pretty_assertions::assert_eq;

fn buckeye() -> Hierarchy {
    Hierarchy::new("buckeye")
        .with_tier("word", ["transcription"])
        .with_tier("phone", [])
        .with_speaker_property("gender")
}

#[test]
fn single_label_filter() {
    let h = buckeye();
    let phone = h.tier("phone").unwrap();
    let spec = h.find("phone").unwrap().filter(phone.label().equals("aa"));

    let compiled = compile(&spec).unwrap();
    assert_eq!(
        compiled.text,
        "MATCH (b_phone)-[r_phone:phone]->(e_phone)\n\
         WHERE b_phone.corpus = 'buckeye'\n\
         AND r_phone.label = 'aa'\n\
         RETURN DISTINCT r_phone"
    );
    assert_eq!(compiled.columns, vec!["r_phone".to_string()]);
}

#[test]
fn unreferenced_offsets_are_bridged() {
    let h = buckeye();
    let phone = h.tier("phone").unwrap();
    let spec = h
        .find("phone")
        .unwrap()
        .filter(phone.at(-2).label().equals("k"))
        .filter(phone.following().label().equals("t"));

    let query = plan(&spec).unwrap();
    assert_eq!(query.matches[0].synthesized().count(), 1);

    let text = compile(&spec).unwrap().text;
    assert!(text.contains(
        "(b_phone_m2)-[r_phone_m2:phone]->(b_phone_m1)-[:phone]->(b_phone)\
         -[r_phone:phone]->(e_phone)-[r_phone_p1:phone]->(e_phone_p1)"
    ));
    assert!(text.contains("r_phone_m2.label = 'k'"));
    assert!(text.contains("r_phone_p1.label = 't'"));
}

#[test]
fn offset_times_use_chain_boundaries() {
    let h = buckeye();
    let phone = h.tier("phone").unwrap();
    let spec = h
        .find("phone")
        .unwrap()
        .columns([phone.previous().duration(), phone.following().begin()]);

    let compiled = compile(&spec).unwrap();
    assert!(compiled
        .text
        .contains("b_phone.time - b_phone_m1.time AS phone_m1_duration"));
    assert!(compiled.text.contains("e_phone.time AS phone_p1_begin"));
    assert_eq!(
        compiled.columns,
        vec!["r_phone", "phone_m1_duration", "phone_p1_begin"]
    );
}

#[test]
fn zero_offset_is_redundant() {
    let h = buckeye();
    let phone = h.tier("phone").unwrap();
    let spec = h.find("phone").unwrap().filter(phone.at(0).label().equals("a"));
    assert_eq!(
        compile(&spec).unwrap_err(),
        SpecificationError::RedundantZeroOffset {
            tier: "phone".into()
        }
    );
}

#[test]
fn offsets_on_other_tiers_are_rejected() {
    let h = buckeye();
    let word = h.tier("word").unwrap();
    let spec = h.find("phone").unwrap().filter(word.following().label().equals("the"));
    assert_eq!(
        compile(&spec).unwrap_err(),
        SpecificationError::UnsupportedOffset {
            tier: "word".into(),
            offset: 1
        }
    );
}

#[test]
fn queried_tier_cannot_contain_itself() {
    let h = buckeye();
    let phone = h.tier("phone").unwrap();
    let by = h
        .find("phone")
        .unwrap()
        .filter_contained_by(phone.label().equals("a"));
    let contains = h
        .find("phone")
        .unwrap()
        .filter_contains(phone.label().equals("a"));
    for spec in [by, contains] {
        assert_eq!(
            compile(&spec).unwrap_err(),
            SpecificationError::SelfContainment {
                tier: "phone".into()
            }
        );
    }
}

#[test]
fn other_tier_filters_become_enclosing_patterns() {
    let h = buckeye();
    let word = h.tier("word").unwrap();
    let spec = h.find("phone").unwrap().filter(word.label().equals("cat"));

    let text = compile(&spec).unwrap().text;
    assert!(text.contains(
        "(b_phone)<-[:phone*0..]-(b_word)-[r_word:word]->(e_word)<-[:phone*0..]-(e_phone)"
    ));
    assert!(text.contains("r_word.label = 'cat'"));
}

#[test]
fn contains_filters_quantify_over_the_inner_path() {
    let h = buckeye();
    let phone = h.tier("phone").unwrap();
    let spec = h
        .find("word")
        .unwrap()
        .filter_contains(phone.label().one_of(["aa", "ae"]));

    let text = compile(&spec).unwrap().text;
    assert!(text.contains("(b_word)-[c_phone:phone*0..]->(e_word)"));
    assert!(text.contains("any(x IN c_phone WHERE x.label IN ['aa', 'ae'])"));

    let timed = h
        .find("word")
        .unwrap()
        .filter_contains(phone.begin().greater_than(1.0));
    assert_eq!(
        compile(&timed).unwrap_err(),
        SpecificationError::UnsupportedInContains {
            property: "phone_begin".into()
        }
    );
}

#[test]
fn contained_list_and_enclosing_edge_use_distinct_aliases() {
    let h = buckeye();
    let phone = h.tier("phone").unwrap();
    let spec = h
        .find("word")
        .unwrap()
        .filter(phone.label().equals("k"))
        .filter_contains(phone.label().equals("a"));

    let text = compile(&spec).unwrap().text;
    assert!(text.contains("-[r_phone:phone]->"));
    assert!(text.contains("(b_word)-[c_phone:phone*0..]->(e_word)"));
    assert!(text.contains("r_phone.label = 'k'"));
    assert!(text.contains("any(x IN c_phone WHERE x.label = 'a')"));
    assert!(!text.contains("[r_phone:phone*0..]"));
}

#[test]
fn alignment_anchors_either_end() {
    let h = buckeye();
    let spec = h
        .find("phone")
        .unwrap()
        .filter_left_aligned("word")
        .filter_right_aligned("word");
    let text = compile(&spec).unwrap().text;
    assert!(text.contains("()<-[:word]-(b_phone)"));
    assert!(text.contains("()-[:word]->(e_phone)"));
}

#[test]
fn empty_in_list_is_rejected() {
    let h = buckeye();
    let phone = h.tier("phone").unwrap();
    let spec = h
        .find("phone")
        .unwrap()
        .filter(phone.label().one_of(Vec::<&str>::new()));
    assert_eq!(
        compile(&spec).unwrap_err(),
        SpecificationError::EmptyInList {
            column: "phone_label".into()
        }
    );
}

#[test]
fn order_by_columns_are_projected() {
    let h = buckeye();
    let phone = h.tier("phone").unwrap();
    let spec = h
        .find("phone")
        .unwrap()
        .columns([phone.label()])
        .order_by(phone.duration(), true);

    let compiled = compile(&spec).unwrap();
    assert_eq!(
        compiled.columns,
        vec!["r_phone", "phone_label", "phone_duration"]
    );
    assert!(compiled
        .text
        .contains("e_phone.time - b_phone.time AS phone_duration"));
    assert!(compiled.text.ends_with("\nORDER BY phone_duration DESC"));
}

#[test]
fn aggregates_need_grouped_columns() {
    let h = buckeye();
    let word = h.tier("word").unwrap();
    let ungrouped = h.find("word").unwrap().columns([word.label()]).count();
    assert_eq!(
        compile(&ungrouped).unwrap_err(),
        SpecificationError::UngroupedColumn {
            column: "word_label".into()
        }
    );

    let grouped = h
        .find("word")
        .unwrap()
        .columns([word.label()])
        .group_by(word.label())
        .count();
    let compiled = compile(&grouped).unwrap();
    assert!(compiled
        .text
        .ends_with("\nRETURN r_word.label AS word_label, count(*) AS count_all"));
    assert_eq!(compiled.columns, vec!["word_label", "count_all"]);
}

#[test]
fn subarc_columns_join_the_closure() {
    let h = buckeye();
    let word = h.tier("word").unwrap();
    let spec = h
        .find("word")
        .unwrap()
        .columns([word.subarc("phone").unwrap()]);

    let text = compile(&spec).unwrap().text;
    assert!(text.contains("(s_word_phone:Subarc {higher: 'word', lower: 'phone'})"));
    assert!(text.contains("s_word_phone.annotation_id = r_word.annotation_id"));
    assert!(text.contains("s_word_phone.subarc AS word_subarc_phone"));
}

#[test]
fn speaker_filters_join_discourse_metadata() {
    let h = buckeye();
    let spec = h
        .find("phone")
        .unwrap()
        .filter(h.speaker("gender").unwrap().equals("f"))
        .columns([h.discourse("channel").unwrap()]);

    let text = compile(&spec).unwrap().text;
    assert!(text.contains("(b_phone)-[:in_discourse]->(discourse:Discourse)"));
    assert!(text.contains("(speaker:Speaker)-[speaks:speaks_in]->(discourse)"));
    assert!(text.contains("speaker.gender = 'f'"));
    assert!(text.contains("speaks.channel AS channel"));
}

#[test]
fn labels_are_quoted_safely() {
    let h = buckeye();
    let word = h.tier("word").unwrap();
    let spec = h
        .find("word")
        .unwrap()
        .filter(word.label().equals("o'clock"));
    assert!(compile(&spec).unwrap().text.contains(r"r_word.label = 'o\'clock'"));
}
