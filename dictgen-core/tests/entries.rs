use dictgen_core::view::{ListFilterOptions, SenseOptions, WritingSystemOptions};
use dictgen_core::{
    CapabilityTable, ClassDef, ConfigNode, DocumentWriter, FieldValue, GeneratorContext,
    NodeOptions, Record, RecordGraph, Relation, RelationKind, RelationType, Schema, ValueType,
    ViewConfig,
};
use dictgen_types::{RecordId, WritingSystem};
use std::collections::BTreeMap;

fn schema() -> Schema {
    Schema::new(vec![
        ClassDef::new("LexEntry")
            .field("HeadWord", ValueType::MultiString)
            .field("Senses", ValueType::Collection("LexSense".into()))
            .field("Relations", ValueType::Relations),
        ClassDef::new("LexSense")
            .field("Gloss", ValueType::MultiString)
            .field("Senses", ValueType::Collection("LexSense".into())),
    ])
}

fn ctx() -> GeneratorContext {
    GeneratorContext::new("out").with_writing_systems(
        vec![WritingSystem::new("fr"), WritingSystem::new("en")],
        "fr",
        "en",
    )
}

fn headword() -> ConfigNode {
    ConfigNode::new("HeadWord")
        .with_options(NodeOptions::WritingSystems(WritingSystemOptions::new(&["vernacular"])))
}

fn gloss() -> ConfigNode {
    ConfigNode::new("Gloss")
        .with_options(NodeOptions::WritingSystems(WritingSystemOptions::new(&["analysis"])))
}

fn view(children: Vec<ConfigNode>) -> ViewConfig {
    ViewConfig::new(ConfigNode::new("LexEntry").with_children(children), BTreeMap::new()).unwrap()
}

fn entry(id: &str, headword: &str) -> Record {
    Record::new(id, "LexEntry").with("HeadWord", FieldValue::multi(&[("fr", headword)]))
}

fn sense(id: &str, owner: &str, text: &str) -> Record {
    Record::new(id, "LexSense")
        .owned_by(owner)
        .with("Gloss", FieldValue::multi(&[("en", text)]))
}

fn render(graph: &RecordGraph, view: &ViewConfig, ctx: &GeneratorContext, id: &str) -> String {
    let table = CapabilityTable::build(&graph.schema).unwrap();
    DocumentWriter::new(graph, view, &table, ctx)
        .generate_entry(&RecordId::new(id))
        .unwrap()
}

#[test]
fn single_sense_entry_fragment() {
    let mut g = RecordGraph::new(schema());
    g.insert_record(entry("e1", "chat").with("Senses", FieldValue::records(&["s1"])))
        .unwrap();
    g.insert_record(sense("s1", "e1", "cat")).unwrap();

    let senses = ConfigNode::new("Senses")
        .with_options(NodeOptions::Senses(SenseOptions::numbered("%d")))
        .with_children(vec![gloss()]);
    let html = render(&g, &view(vec![headword(), senses]), &ctx(), "e1");

    insta::assert_snapshot!(html, @r#"<div class="lexentry" id="ge1"><span class="headword"><span lang="fr" dir="ltr">chat</span></span><span class="senses"><span class="sensecontent"><span class="sense" id="gs1"><span class="gloss"><span lang="en" dir="ltr">cat</span></span></span></span></span></div>"#);
}

#[test]
fn nested_senses_join_parent_numbers() {
    let mut g = RecordGraph::new(schema());
    g.insert_record(entry("e1", "chat").with("Senses", FieldValue::records(&["s1", "s2"])))
        .unwrap();
    g.insert_record(sense("s1", "e1", "gloss")).unwrap();
    g.insert_record(sense("s2", "e1", "second gloss").with("Senses", FieldValue::records(&["s2a"])))
        .unwrap();
    g.insert_record(sense("s2a", "s2", "sub gloss")).unwrap();

    let subsenses = ConfigNode::new("Senses")
        .with_options(NodeOptions::Senses(SenseOptions {
            parent_join_style: "%.".into(),
            number_even_single: true,
            ..SenseOptions::numbered("%a")
        }))
        .with_children(vec![gloss()]);
    let senses = ConfigNode::new("Senses")
        .with_options(NodeOptions::Senses(SenseOptions::numbered("%d")))
        .with_children(vec![gloss(), subsenses]);
    let html = render(&g, &view(vec![senses]), &ctx(), "e1");

    let numbers: Vec<&str> = html
        .split("<span class=\"sensenumber\" lang=\"en\" dir=\"ltr\">")
        .skip(1)
        .filter_map(|rest| rest.split("</span>").next())
        .collect();
    assert_eq!(numbers, ["1", "2", "2.a"]);
}

#[test]
fn excluded_records_never_appear_as_cross_reference_targets() {
    let mut g = RecordGraph::new(schema());
    g.insert_record(entry("e1", "chat")).unwrap();
    g.insert_record(entry("e2", "minet").excluded_from("kids")).unwrap();
    g.insert_record(entry("e3", "matou")).unwrap();
    g.add_relation_type(RelationType::new("syn", "Synonym", RelationKind::Collection));
    g.add_relation(Relation::new("r1", "syn", &["e1", "e2", "e3"])).unwrap();

    let relations = ConfigNode::new("Relations")
        .with_options(NodeOptions::ListFilter(ListFilterOptions::new(&["syn"])));
    let v = view(vec![relations]);

    let everything = render(&g, &v, &ctx(), "e1");
    assert!(everything.contains("href=\"#ge2\""));
    assert!(everything.contains("href=\"#ge3\""));

    let kids = render(&g, &v, &ctx().with_publication("kids"), "e1");
    assert!(!kids.contains("ge2"));
    assert!(!kids.contains("minet"));
    assert!(kids.contains("href=\"#ge3\""));
}

#[test]
fn direction_tags_show_relation_on_one_side_only() {
    let mut g = RecordGraph::new(schema());
    g.insert_record(entry("car", "voiture")).unwrap();
    g.insert_record(entry("wheel", "roue")).unwrap();
    g.add_relation_type(
        RelationType::new("pw", "Part", RelationKind::Tree).with_reverse("Whole"),
    );
    g.add_relation(Relation::new("r1", "pw", &["car", "wheel"])).unwrap();

    let tagged = |tag: &str| {
        view(vec![ConfigNode::new("Relations")
            .with_options(NodeOptions::ListFilter(ListFilterOptions::new(&[tag])))])
    };

    let forward = tagged("pw:f");
    assert!(render(&g, &forward, &ctx(), "car").contains("href=\"#gwheel\""));
    assert!(!render(&g, &forward, &ctx(), "wheel").contains("href=\"#gcar\""));

    let reverse = tagged("pw:r");
    assert!(!render(&g, &reverse, &ctx(), "car").contains("href=\"#gwheel\""));
    assert!(render(&g, &reverse, &ctx(), "wheel").contains("href=\"#gcar\""));
}
