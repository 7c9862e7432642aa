use modelsmith::build::DefinitionTree;
use modelsmith::config::ConnectionSpec;
use modelsmith::emitter::render_model;
use modelsmith::lineage::{LineageStore, TABLE_KEY};
use modelsmith::schema::{AttributeKind, AttributeSpec, SchemaModel, TableRole, TableSpec};
use modelsmith::tmdl::parse_document;

fn fabric() -> ConnectionSpec {
    ConnectionSpec::fabric(
        "https://org.crm.dynamics.com",
        "abc.datawarehouse.fabric.microsoft.com",
        "dataverse_org",
    )
}

fn account_model(connection: ConnectionSpec) -> SchemaModel {
    SchemaModel::new("Sales", connection).with_table(
        TableSpec::new("account", "Account", TableRole::Dimension)
            .with_attribute(AttributeSpec::new("name", "Account Name", AttributeKind::String)),
    )
}

fn render(model: &SchemaModel, previous: &DefinitionTree) -> DefinitionTree {
    render_model(model, previous, &LineageStore::load(previous))
        .unwrap()
        .tree
}

fn expression_tags(tree: &DefinitionTree) -> Vec<(String, Option<String>)> {
    parse_document(tree.get("expressions.tmdl").unwrap())
        .expressions
        .into_iter()
        .map(|e| (e.name, e.lineage_tag))
        .collect()
}

#[test]
fn test_fabric_expressions_keep_identifiers() {
    let model = account_model(fabric());
    let first = render(&model, &DefinitionTree::new());
    assert!(!first.contains("tables/DataverseURL.tmdl"));

    let tags = expression_tags(&first);
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].0, "FabricSQLEndpoint");
    assert_eq!(tags[1].0, "FabricLakehouse");

    let second = render(&model, &first);
    assert_eq!(expression_tags(&second), tags);
}

#[test]
fn test_user_expressions_survive_dialect_switch() {
    let mut previous = render(&account_model(fabric()), &DefinitionTree::new());
    let mut expressions = previous.get("expressions.tmdl").unwrap().to_string();
    expressions.push_str("\nexpression FiscalYearStart = 7\n\tlineageTag: user-expr\n");
    previous.insert("expressions.tmdl", expressions);

    let tds = render(&account_model(ConnectionSpec::tds("https://org.crm.dynamics.com")), &previous);
    let tags = expression_tags(&tds);
    assert_eq!(tags, vec![("FiscalYearStart".to_string(), Some("user-expr".to_string()))]);
    assert!(tds.contains("tables/DataverseURL.tmdl"));
}

#[test]
fn test_tds_without_user_expressions_writes_no_expression_file() {
    let previous = render(&account_model(fabric()), &DefinitionTree::new());
    let tds = render(&account_model(ConnectionSpec::tds("https://org.crm.dynamics.com")), &previous);
    assert!(!tds.contains("expressions.tmdl"));
}

#[test]
fn test_crlf_files_are_read() {
    let mut tree = DefinitionTree::new();
    tree.insert(
        "tables/Account.tmdl",
        "// source: account\r\ntable Account\r\n\tlineageTag: crlf-table\r\n\r\n\tcolumn 'Account Name'\r\n\t\tlineageTag: crlf-col\r\n\t\tsourceColumn: Account Name\r\n",
    );
    let store = LineageStore::load(&tree);
    let lineage = store.table("account", "Account");
    assert_eq!(lineage.lookup(TABLE_KEY), Some("crlf-table"));
    assert_eq!(lineage.lookup("col:Account Name"), Some("crlf-col"));
}

#[test]
fn test_display_name_match_without_marker() {
    let mut tree = DefinitionTree::new();
    tree.insert(
        "tables/Account.tmdl",
        "table Account\n\tlineageTag: hand-made\n\n\tcolumn 'Account Name'\n\t\tlineageTag: hand-col\n\t\tsourceColumn: Account Name\n",
    );

    let out = render_model(
        &account_model(ConnectionSpec::tds("https://org.crm.dynamics.com")),
        &tree,
        &LineageStore::load(&tree),
    )
    .unwrap();
    let doc = parse_document(out.tree.get("tables/Account.tmdl").unwrap());
    assert_eq!(doc.source_marker.as_deref(), Some("account"));
    assert_eq!(doc.tables[0].lineage_tag.as_deref(), Some("hand-made"));
    assert!(out.carried_over.is_empty());
}

#[test]
fn test_user_table_is_carried_over() {
    let mut tree = render(
        &account_model(ConnectionSpec::tds("https://org.crm.dynamics.com")),
        &DefinitionTree::new(),
    );
    let targets = "table Targets\n\tlineageTag: targets\n\n\tcolumn accountid\n\t\tdataType: string\n\t\tlineageTag: targets-col\n\t\tsourceColumn: accountid\n";
    tree.insert("tables/Targets.tmdl", targets);
    let mut relationships = tree.get("relationships.tmdl").unwrap_or_default().to_string();
    relationships.push_str("\nrelationship targets-rel\n\tfromColumn: Targets.accountid\n\ttoColumn: Account.accountid\n");
    tree.insert("relationships.tmdl", relationships);

    let out = render_model(
        &account_model(ConnectionSpec::tds("https://org.crm.dynamics.com")),
        &tree,
        &LineageStore::load(&tree),
    )
    .unwrap();
    assert_eq!(out.carried_over, vec!["tables/Targets.tmdl"]);
    assert_eq!(out.tree.get("tables/Targets.tmdl"), Some(targets));
    assert_eq!(out.preserved_relationships, vec!["Targets.accountid→Account.accountid"]);
}
