use modelsmith::build::DefinitionTree;
use modelsmith::config::ConnectionSpec;
use modelsmith::emitter::render_model;
use modelsmith::emitter::table::render_table;
use modelsmith::lineage::LineageStore;
use modelsmith::schema::{
    AttributeKind, AttributeSpec, ExpandedLookup, LookupColumnConfig, RelationshipSpec,
    SchemaModel, TableRole, TableSpec,
};
use modelsmith::tmdl::{parse_document, TableBlock};

const URL: &str = "https://org.crm.dynamics.com";

fn sales_order(display: &str) -> TableSpec {
    TableSpec::new("salesorder", display, TableRole::Fact)
        .with_attribute(AttributeSpec::new("name", "Order Name", AttributeKind::String))
        .with_attribute(AttributeSpec::new("totalamount", "Total Amount", AttributeKind::Money))
        .with_attribute(AttributeSpec::new("statuscode", "Status Reason", AttributeKind::Status))
        .with_attribute(
            AttributeSpec::new("customerid", "Customer", AttributeKind::Customer)
                .with_targets(["account", "contact"]),
        )
}

fn model_with(table: TableSpec) -> SchemaModel {
    SchemaModel::new("Sales", ConnectionSpec::tds(URL))
        .with_table(table)
        .with_table(TableSpec::new("account", "Account", TableRole::Dimension))
        .with_relationship(RelationshipSpec::new("salesorder", "customerid", "account"))
}

fn render(model: &SchemaModel, previous: &DefinitionTree) -> DefinitionTree {
    render_model(model, previous, &LineageStore::load(previous))
        .unwrap()
        .tree
}

fn table_block(tree: &DefinitionTree, path: &str) -> TableBlock {
    let text = tree.get(path).unwrap_or_else(|| panic!("{path} not rendered"));
    parse_document(text).tables.remove(0)
}

fn column_tag<'a>(table: &'a TableBlock, name: &str) -> &'a str {
    table
        .columns
        .iter()
        .find(|c| c.name == name)
        .and_then(|c| c.lineage_tag.as_deref())
        .unwrap_or_else(|| panic!("column {name} missing"))
}

fn measure_tag<'a>(table: &'a TableBlock, name: &str) -> &'a str {
    table
        .measures
        .iter()
        .find(|m| m.name == name)
        .and_then(|m| m.lineage_tag.as_deref())
        .unwrap_or_else(|| panic!("measure {name} missing"))
}

#[test]
fn test_regeneration_is_byte_identical() {
    let model = model_with(sales_order("Sales Order"));
    let first = render(&model, &DefinitionTree::new());
    let second = render(&model, &first);
    assert_eq!(first, second);
}

#[test]
fn test_renamed_table_keeps_identifiers() {
    let first = render(&model_with(sales_order("Sales Order")), &DefinitionTree::new());
    let before = table_block(&first, "tables/Sales Order.tmdl");

    let renamed = model_with(sales_order("Orders"));
    let out = render_model(&renamed, &first, &LineageStore::load(&first)).unwrap();
    let after = table_block(&out.tree, "tables/Orders.tmdl");

    assert_eq!(after.lineage_tag, before.lineage_tag);
    assert_eq!(column_tag(&after, "Order Name"), column_tag(&before, "Order Name"));
    assert_eq!(measure_tag(&after, "Orders Count"), measure_tag(&before, "Sales Order Count"));
    assert_eq!(
        measure_tag(&after, "Link to Orders"),
        measure_tag(&before, "Link to Sales Order")
    );
    assert_eq!(out.stale, vec!["tables/Sales Order.tmdl"]);
    assert!(!out.tree.contains("tables/Sales Order.tmdl"));
}

#[test]
fn test_renamed_column_keeps_identifier() {
    let first = render(&model_with(sales_order("Sales Order")), &DefinitionTree::new());
    let before = table_block(&first, "tables/Sales Order.tmdl");

    let mut table = sales_order("Sales Order");
    table.attributes[0].display_name = "Order Title".to_string();
    let second = render(&model_with(table), &first);
    let after = table_block(&second, "tables/Sales Order.tmdl");

    assert_eq!(column_tag(&after, "Order Title"), column_tag(&before, "Order Name"));
    assert!(after.columns.iter().all(|c| c.name != "Order Name"));
}

#[test]
fn test_user_measure_is_preserved_once() {
    let model = model_with(sales_order("Sales Order"));
    let mut tree = render(&model, &DefinitionTree::new());
    let path = "tables/Sales Order.tmdl";
    let edited = tree.get(path).unwrap().replacen(
        "\tcolumn salesorderid\n",
        "\t/// Half the order value\n\tmeasure 'Weighted Total' = SUM('Sales Order'[Total Amount]) * 0.5\n\t\tlineageTag: user-measure-1\n\n\tcolumn salesorderid\n",
        1,
    );
    tree.insert(path, edited);

    let first = render(&model, &tree);
    let second = render(&model, &first);
    for tree in [&first, &second] {
        let text = tree.get(path).unwrap();
        assert_eq!(text.matches("measure 'Weighted Total'").count(), 1);
        assert_eq!(text.matches("measure 'Sales Order Count'").count(), 1);
        assert_eq!(text.matches("/// Half the order value").count(), 1);
        assert!(text.contains("\t\tlineageTag: user-measure-1\n"));
    }
    assert_eq!(first, second);
}

#[test]
fn test_auto_measures_follow_the_environment() {
    let first = render(&model_with(sales_order("Sales Order")), &DefinitionTree::new());
    let before = table_block(&first, "tables/Sales Order.tmdl");

    let mut moved = model_with(sales_order("Sales Order"));
    moved.connection = ConnectionSpec::tds("https://contoso.crm4.dynamics.com");
    let second = render(&moved, &first);
    let after = table_block(&second, "tables/Sales Order.tmdl");

    let link = after
        .measures
        .iter()
        .find(|m| m.name == "Link to Sales Order")
        .unwrap();
    assert!(link.expression.contains("https://contoso.crm4.dynamics.com/main.aspx"));
    assert!(!second.get("tables/Sales Order.tmdl").unwrap().contains(URL));
    assert_eq!(
        link.lineage_tag.as_deref(),
        Some(measure_tag(&before, "Link to Sales Order"))
    );
    assert_eq!(after.measures.len(), 2);
}

#[test]
fn test_user_column_metadata_survives() {
    let model = model_with(sales_order("Sales Order"));
    let mut tree = render(&model, &DefinitionTree::new());
    let path = "tables/Sales Order.tmdl";
    let edited = tree
        .get(path)
        .unwrap()
        .replacen("\tcolumn 'Order Name'\n", "\t/// Customer-facing order title\n\tcolumn 'Order Name'\n", 1)
        .replacen(
            "\t\tannotation SourceLogicalName = name\n",
            "\t\tannotation SourceLogicalName = name\n\t\tannotation Steward = order-desk\n",
            1,
        );
    tree.insert(path, edited);

    let second = render(&model, &tree);
    let table = table_block(&second, path);
    let column = table.columns.iter().find(|c| c.name == "Order Name").unwrap();
    assert_eq!(column.description.as_deref(), Some("Customer-facing order title"));
    assert_eq!(column.annotation("Steward"), Some("order-desk"));
    assert_eq!(column.annotation("SummarizationSetBy"), Some("Automatic"));
    assert_eq!(render(&model, &second), second);
}

#[test]
fn test_owner_config_emits_every_sub_column() {
    let table = TableSpec::new("opportunity", "Opportunity", TableRole::Fact)
        .with_attribute(
            AttributeSpec::new("ownerid", "Owner", AttributeKind::Owner).with_targets(["systemuser", "team"]),
        )
        .with_attribute(
            AttributeSpec::new("owneridname", "Owner Name", AttributeKind::String).with_attribute_of("ownerid"),
        )
        .with_lookup_config(
            "ownerid",
            LookupColumnConfig {
                include_id: true,
                id_hidden: true,
                include_name: true,
                name_hidden: false,
                include_type: true,
                include_phonetic: true,
            },
        );
    let model = SchemaModel::new("Sales", ConnectionSpec::tds(URL)).with_table(table);
    let rendered = render_table(&model, &LineageStore::empty(), &model.tables[0]).unwrap();

    assert_eq!(
        rendered.columns,
        vec!["opportunityid", "ownerid", "Owner", "Owner Type", "Owner Phonetic Name"]
    );
    assert!(rendered.text.contains("Base.owneridname AS [Owner]"));
    assert!(!rendered.text.contains("[Owner Name]"));
}

#[test]
fn test_expanded_lookup_joins_by_logical_name() {
    let mut table = sales_order("Sales Order");
    table.expanded_lookups.push(ExpandedLookup {
        lookup_attribute: "customerid".to_string(),
        target_table: "account".to_string(),
        target_primary_id: None,
        columns: vec![AttributeSpec::new("industrycode", "Industry", AttributeKind::Picklist)],
    });
    let mut model = model_with(table);
    model.tables[1].display_name = "Customer Accounts".to_string();

    let rendered = render_table(&model, &LineageStore::empty(), &model.tables[0]).unwrap();
    assert!(rendered.text.contains(
        "LEFT JOIN account AS x_customerid ON x_customerid.accountid = Base.customerid"
    ));
    assert!(rendered.text.contains("x_customerid.industrycodename AS [Customer Industry]"));
    assert!(!rendered.text.contains("Customer Accounts AS"));
    assert!(rendered.columns.contains(&"Customer Industry".to_string()));
}
