use modelsmith::build::DefinitionTree;
use modelsmith::config::ConnectionSpec;
use modelsmith::emitter::{render_model, ModelOutput, PRESERVED_MARKER};
use modelsmith::lineage::LineageStore;
use modelsmith::schema::{
    AttributeKind, AttributeSpec, DateRelationship, DateTableSpec, RelationshipSpec, SchemaModel,
    TableRole, TableSpec,
};
use modelsmith::tmdl::parse_document;

const RELATIONSHIPS: &str = "relationships.tmdl";

fn opportunity(display: &str) -> TableSpec {
    TableSpec::new("opportunity", display, TableRole::Fact)
        .with_attribute(AttributeSpec::new("name", "Topic", AttributeKind::String))
        .with_attribute(
            AttributeSpec::new("parentaccountid", "Account", AttributeKind::Lookup).with_targets(["account"]),
        )
        .with_attribute(AttributeSpec::new("estimatedclosedate", "Est. Close Date", AttributeKind::DateTime))
}

fn model_with(fact: TableSpec) -> SchemaModel {
    SchemaModel::new("Sales", ConnectionSpec::tds("https://org.crm.dynamics.com"))
        .with_table(fact)
        .with_table(TableSpec::new("account", "Account", TableRole::Dimension))
        .with_relationship(RelationshipSpec::new("opportunity", "parentaccountid", "account"))
}

fn model() -> SchemaModel {
    model_with(opportunity("Opportunity"))
}

fn with_relationships(previous: &DefinitionTree, text: &str) -> DefinitionTree {
    let mut tree = previous.clone();
    let mut combined = tree.get(RELATIONSHIPS).unwrap_or_default().to_string();
    combined.push('\n');
    combined.push_str(text);
    tree.insert(RELATIONSHIPS, combined);
    tree
}

fn render(model: &SchemaModel, previous: &DefinitionTree) -> ModelOutput {
    render_model(model, previous, &LineageStore::load(previous)).unwrap()
}

#[test]
fn test_generated_blocks_precede_preserved_blocks() {
    let first = render(&model(), &DefinitionTree::new()).tree;
    let previous = with_relationships(
        &first,
        "// reporting join\nrelationship user-rel-1\n\tisActive: false\n\tfromColumn: Opportunity.opportunityid\n\ttoColumn: Account.accountid\n",
    );

    let out = render(&model(), &previous);
    assert_eq!(out.produced_relationships, vec!["Opportunity.parentaccountid→Account.accountid"]);
    assert_eq!(out.preserved_relationships, vec!["Opportunity.opportunityid→Account.accountid"]);

    let text = out.tree.get(RELATIONSHIPS).unwrap();
    let generated_at = text.find("annotation GeneratedBy = modelsmith").unwrap();
    let preserved_at = text.find(PRESERVED_MARKER).unwrap();
    assert!(generated_at < preserved_at);
    assert!(text.contains("// reporting join\n// preserved: user relationship\nrelationship user-rel-1\n"));

    let again = render(&model(), &out.tree);
    assert_eq!(again.tree.get(RELATIONSHIPS), Some(text));
    assert_eq!(text.matches("user-rel-1").count(), 1);
}

#[test]
fn test_generated_identifier_survives_regeneration_and_rename() {
    let first = render(&model(), &DefinitionTree::new()).tree;
    let id = parse_document(first.get(RELATIONSHIPS).unwrap()).relationships[0]
        .id
        .clone();

    let renamed = render(&model_with(opportunity("Deal")), &first).tree;
    let doc = parse_document(renamed.get(RELATIONSHIPS).unwrap());
    assert_eq!(doc.relationships.len(), 1);
    assert_eq!(doc.relationships[0].id, id);
    assert_eq!(
        doc.relationships[0].canonical_key().as_deref(),
        Some("Deal.parentaccountid→Account.accountid")
    );
}

#[test]
fn test_dangling_user_relationship_is_repaired() {
    let first = render(&model(), &DefinitionTree::new()).tree;
    let previous = with_relationships(
        &first,
        "relationship user-rel-2\n\tfromColumn: Opportunity.new_region\n\ttoColumn: Account.accountid\n",
    );

    let out = render(&model(), &previous);
    assert!(out.preserved_relationships.is_empty());
    assert_eq!(out.repaired.len(), 1);
    assert_eq!(out.repaired[0].key, "Opportunity.new_region→Account.accountid");
    assert!(out.repaired[0].reason.contains("no longer exists"));
    assert!(!out.tree.get(RELATIONSHIPS).unwrap().contains("user-rel-2"));
}

#[test]
fn test_relationship_to_missing_table_is_repaired() {
    let model = model().with_relationship(RelationshipSpec::new("opportunity", "parentaccountid", "contact"));
    let out = render(&model, &DefinitionTree::new());
    assert_eq!(out.produced_relationships.len(), 1);
    assert_eq!(out.repaired.len(), 1);
    assert!(out.repaired[0].reason.contains("not part of the model"));
}

#[test]
fn test_date_relationships_are_tool_managed() {
    let mut model = model();
    model.date_table = Some(DateTableSpec::new(2020, 2030));
    model.date_relationships.push(DateRelationship {
        table: "opportunity".to_string(),
        attribute: "estimatedclosedate".to_string(),
        is_active: true,
    });

    let first = render(&model, &DefinitionTree::new());
    assert!(first.tree.contains("tables/Date.tmdl"));
    let text = first.tree.get(RELATIONSHIPS).unwrap();
    assert!(text.contains(
        "\tjoinOnDateBehavior: datePartOnly\n\tfromColumn: Opportunity.'Est. Close Date'\n\ttoColumn: Date.Date\n"
    ));

    // a hand-made relationship into the calendar is not carried over
    let previous = with_relationships(
        &first.tree,
        "relationship user-date\n\tfromColumn: Opportunity.Topic\n\ttoColumn: Date.Year\n",
    );
    let out = render(&model, &previous);
    assert!(!out.tree.get(RELATIONSHIPS).unwrap().contains("user-date"));
    assert!(out.preserved_relationships.is_empty());
    assert!(out.repaired.is_empty());
}

#[test]
fn test_leading_source_comment_stays_with_user_relationship() {
    let first = render(&model(), &DefinitionTree::new()).tree;
    let mut previous = first.clone();
    let user = "// source: finance\nrelationship user-rel-1\n\tisActive: false\n\tfromColumn: Opportunity.opportunityid\n\ttoColumn: Account.accountid\n\n";
    previous.insert(
        RELATIONSHIPS,
        format!("{user}{}", first.get(RELATIONSHIPS).unwrap()),
    );

    let out = render(&model(), &previous);
    let text = out.tree.get(RELATIONSHIPS).unwrap();
    assert!(text.contains("// source: finance\n// preserved: user relationship\nrelationship user-rel-1\n"));

    let again = render(&model(), &out.tree);
    assert_eq!(again.tree.get(RELATIONSHIPS), Some(text));
}
