use modelsmith::build::DefinitionTree;
use modelsmith::config::ConnectionSpec;
use modelsmith::diff::{analyze_changes, annotate_repairs, has_breaking, ChangeType, Impact, ObjectKind};
use modelsmith::emitter::render_model;
use modelsmith::lineage::LineageStore;
use modelsmith::schema::{
    AttributeKind, AttributeSpec, RelationshipSpec, SchemaModel, TableRole, TableSpec,
};

fn sales_order() -> TableSpec {
    TableSpec::new("salesorder", "Sales Order", TableRole::Fact)
        .with_attribute(AttributeSpec::new("name", "Order Name", AttributeKind::String))
        .with_attribute(AttributeSpec::new("totalamount", "Total Amount", AttributeKind::Money))
        .with_attribute(
            AttributeSpec::new("customerid", "Customer", AttributeKind::Lookup).with_targets(["account"]),
        )
}

fn model_with(fact: TableSpec) -> SchemaModel {
    SchemaModel::new("Sales", ConnectionSpec::tds("https://org.crm.dynamics.com"))
        .with_table(fact)
        .with_table(TableSpec::new("account", "Account", TableRole::Dimension))
        .with_relationship(RelationshipSpec::new("salesorder", "customerid", "account"))
}

fn render(model: &SchemaModel, previous: &DefinitionTree) -> DefinitionTree {
    render_model(model, previous, &LineageStore::load(previous))
        .unwrap()
        .tree
}

#[test]
fn test_unchanged_model_has_no_changes() {
    let model = model_with(sales_order());
    let first = render(&model, &DefinitionTree::new());
    let second = render(&model, &first);
    assert!(analyze_changes(&first, &second).is_empty());
}

#[test]
fn test_first_build_is_all_additions() {
    let tree = render(&model_with(sales_order()), &DefinitionTree::new());
    let changes = analyze_changes(&DefinitionTree::new(), &tree);

    let tables: Vec<&str> = changes
        .iter()
        .filter(|c| c.object_kind == ObjectKind::Table)
        .map(|c| c.object_name.as_str())
        .collect();
    assert_eq!(tables, vec!["Account", "DataverseURL", "Sales Order"]);
    assert!(changes.iter().all(|c| c.change_type == ChangeType::Added));
    assert!(!has_breaking(&changes));
    assert_eq!(
        changes.last().map(|c| c.object_name.as_str()),
        Some("Sales Order.customerid→Account.accountid")
    );
}

#[test]
fn test_type_change_is_breaking() {
    let first = render(&model_with(sales_order()), &DefinitionTree::new());
    let mut fact = sales_order();
    fact.attributes[1].kind = AttributeKind::Integer;
    let second = render(&model_with(fact), &first);

    let changes = analyze_changes(&first, &second);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].object_name, "Sales Order.Total Amount");
    assert_eq!(changes[0].change_type, ChangeType::Modified);
    assert!(changes[0].is_breaking());
    assert_eq!(changes[0].detail.as_deref(), Some("dataType decimal → int64"));
}

#[test]
fn test_removed_column_used_by_user_measure_is_breaking() {
    let mut first = render(&model_with(sales_order()), &DefinitionTree::new());
    let path = "tables/Sales Order.tmdl";
    let edited = first.get(path).unwrap().replacen(
        "\tcolumn salesorderid\n",
        "\tmeasure Revenue = SUM('Sales Order'[Total Amount])\n\t\tlineageTag: user-revenue\n\n\tcolumn salesorderid\n",
        1,
    );
    first.insert(path, edited);

    let mut fact = sales_order();
    fact.attributes.retain(|a| a.logical_name != "totalamount");
    let second = render(&model_with(fact), &first);

    let changes = analyze_changes(&first, &second);
    let removed = changes
        .iter()
        .find(|c| c.object_name == "Sales Order.Total Amount")
        .unwrap();
    assert_eq!(removed.change_type, ChangeType::Removed);
    assert_eq!(removed.impact, Impact::Breaking);
    assert!(has_breaking(&changes));
}

#[test]
fn test_removed_table_with_relationship_is_breaking() {
    let first = render(&model_with(sales_order()), &DefinitionTree::new());
    let model = SchemaModel::new("Sales", ConnectionSpec::tds("https://org.crm.dynamics.com"))
        .with_table(sales_order());
    let second = render(&model, &first);

    let changes = analyze_changes(&first, &second);
    let table = changes
        .iter()
        .find(|c| c.object_kind == ObjectKind::Table)
        .unwrap();
    assert_eq!(table.object_name, "Account");
    assert_eq!(table.change_type, ChangeType::Removed);
    assert!(table.is_breaking());

    let relationship = changes
        .iter()
        .find(|c| c.object_kind == ObjectKind::Relationship)
        .unwrap();
    assert_eq!(relationship.change_type, ChangeType::Removed);
    assert!(relationship.is_breaking());
}

#[test]
fn test_deactivated_relationship_is_breaking() {
    let first = render(&model_with(sales_order()), &DefinitionTree::new());
    let mut model = model_with(sales_order());
    model.relationships[0].is_active = false;
    let second = render(&model, &first);

    let changes = analyze_changes(&first, &second);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].object_kind, ObjectKind::Relationship);
    assert_eq!(changes[0].detail.as_deref(), Some("deactivated"));
    assert!(changes[0].is_breaking());

    let back = analyze_changes(&second, &render(&model_with(sales_order()), &second));
    assert_eq!(back[0].detail.as_deref(), Some("activated"));
    assert!(!back[0].is_breaking());
}

#[test]
fn test_repairs_explain_removals() {
    let mut first = render(&model_with(sales_order()), &DefinitionTree::new());
    let mut relationships = first.get("relationships.tmdl").unwrap().to_string();
    relationships.push_str(
        "\nrelationship user-rel\n\tisActive: false\n\tfromColumn: 'Sales Order'.'Order Name'\n\ttoColumn: Account.accountid\n",
    );
    first.insert("relationships.tmdl", relationships);

    let mut fact = sales_order();
    fact.attributes.retain(|a| a.logical_name != "name");
    let model = model_with(fact);
    let out = render_model(&model, &first, &LineageStore::load(&first)).unwrap();

    let mut changes = analyze_changes(&first, &out.tree);
    annotate_repairs(&mut changes, &out.repaired);
    let removal = changes
        .iter()
        .find(|c| c.object_name == "Sales Order.Order Name→Account.accountid")
        .unwrap();
    assert_eq!(
        removal.detail.as_deref(),
        Some("repaired: column Sales Order.Order Name no longer exists")
    );
    assert_eq!(removal.impact, Impact::NonBreaking);
}

#[test]
fn test_change_records_serialize_camel_case() {
    let first = render(&model_with(sales_order()), &DefinitionTree::new());
    let mut fact = sales_order();
    fact.attributes[1].kind = AttributeKind::Integer;
    let changes = analyze_changes(&first, &render(&model_with(fact), &first));

    let json = serde_json::to_value(&changes).unwrap();
    assert_eq!(json[0]["objectKind"], "column");
    assert_eq!(json[0]["changeType"], "modified");
    assert_eq!(json[0]["impact"], "breaking");
    assert_eq!(json[0]["objectName"], "Sales Order.Total Amount");
}
