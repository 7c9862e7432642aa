use modelsmith::config::ConnectionSpec;
use modelsmith::emitter::table::render_table;
use modelsmith::fetchxml::{translate, TranslateOptions, UnsupportedKind};
use modelsmith::lineage::LineageStore;
use modelsmith::schema::{AttributeKind, AttributeSpec, SchemaModel, StorageMode, TableRole, TableSpec};
use modelsmith::sql::Dialect;

const MY_RECORDS: &str = r#"<filter><condition attribute="ownerid" operator="eq-userid" /></filter>"#;

#[test]
fn test_current_user_on_live_tds() {
    let t = translate(MY_RECORDS, &TranslateOptions::new(Dialect::DataverseTds));
    assert_eq!(t.clause.as_deref(), Some("Base.ownerid = CURRENT_USER"));
    assert!(t.fully_supported);
}

#[test]
fn test_current_user_dropped_when_materialized() {
    let options = TranslateOptions::new(Dialect::DataverseTds).materialized(true);
    let t = translate(MY_RECORDS, &options);
    assert!(t.clause.is_none());
    assert!(!t.fully_supported);
    assert_eq!(t.unsupported[0].kind, UnsupportedKind::UserIdentity);
}

#[test]
fn test_current_user_dropped_on_fabric() {
    let t = translate(MY_RECORDS, &TranslateOptions::new(Dialect::FabricLink));
    assert!(t.clause.is_none());
    assert_eq!(t.unsupported.len(), 1);
    assert_eq!(t.unsupported[0].kind, UnsupportedKind::UserIdentity);
    assert!(t.unsupported[0].detail.contains("eq-userid"));
}

#[test]
fn test_user_teams_expands_to_membership_subquery() {
    let xml = r#"<filter><condition attribute="ownerid" operator="eq-useroruserteams" /></filter>"#;
    let t = translate(xml, &TranslateOptions::new(Dialect::DataverseTds));
    assert_eq!(
        t.clause.as_deref(),
        Some("(Base.ownerid = CURRENT_USER OR Base.ownerid IN (SELECT tm.teamid FROM teammembership AS tm WHERE tm.systemuserid = CURRENT_USER))")
    );
}

fn model_with_mode(mode: StorageMode) -> SchemaModel {
    let mut model = SchemaModel::new("Sales", ConnectionSpec::tds("https://org.crm.dynamics.com"))
        .with_table(
            TableSpec::new("opportunity", "Opportunity", TableRole::Fact)
                .with_attribute(AttributeSpec::new("name", "Topic", AttributeKind::String))
                .with_filter(MY_RECORDS),
        );
    model.storage_mode = mode;
    model
}

#[test]
fn test_table_storage_mode_gates_user_filter() {
    let live = model_with_mode(StorageMode::DirectQuery);
    let rendered = render_table(&live, &LineageStore::empty(), &live.tables[0]).unwrap();
    assert!(rendered.text.contains("CURRENT_USER"));
    assert!(rendered.notices.is_empty());

    let imported = model_with_mode(StorageMode::Import);
    let rendered = render_table(&imported, &LineageStore::empty(), &imported.tables[0]).unwrap();
    assert!(!rendered.text.contains("CURRENT_USER"));
    assert_eq!(rendered.notices.len(), 1);
    assert!(rendered.notices[0].starts_with("Opportunity: "));
    assert!(rendered.text.contains("\t\tmode: import\n"));
}

#[test]
fn test_multi_select_splits_on_semicolon_in_both_dialects() {
    for connection in [
        ConnectionSpec::tds("https://org.crm.dynamics.com"),
        ConnectionSpec::fabric(
            "https://org.crm.dynamics.com",
            "abc.datawarehouse.fabric.microsoft.com",
            "dataverse_org",
        ),
    ] {
        let model = SchemaModel::new("Sales", connection).with_table(
            TableSpec::new("account", "Account", TableRole::Dimension).with_attribute(AttributeSpec::new(
                "new_regions",
                "Regions",
                AttributeKind::MultiSelectPicklist,
            )),
        );
        let rendered = render_table(&model, &LineageStore::empty(), &model.tables[0]).unwrap();
        assert!(rendered.text.contains("STRING_SPLIT(CAST("));
        assert!(rendered.text.contains("AS NVARCHAR(4000)), ';')"));
        assert!(!rendered.text.contains("STRING_SPLIT(CAST(Base.new_regions AS NVARCHAR(4000)), ',')"));
    }
}
