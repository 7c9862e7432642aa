use modelsmith::fetchxml::{translate, TranslateOptions, UnsupportedKind};
use modelsmith::sql::Dialect;
use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;

fn tds() -> TranslateOptions {
    TranslateOptions::new(Dialect::DataverseTds)
}

fn fabric() -> TranslateOptions {
    TranslateOptions::new(Dialect::FabricLink)
}

/// The clause must be valid T-SQL once placed behind a WHERE.
fn assert_parses(clause: &str) {
    let sql = format!("SELECT 1 FROM account AS Base WHERE {clause}");
    if let Err(e) = Parser::parse_sql(&MsSqlDialect {}, &sql) {
        panic!("clause does not parse: {e}\n{sql}");
    }
}

#[test]
fn test_apostrophe_is_doubled() {
    let xml = r#"<filter><condition attribute="name" operator="eq" value="O'Brien" /></filter>"#;
    let t = translate(xml, &tds());
    assert_eq!(t.clause.as_deref(), Some("Base.name = 'O''Brien'"));
    assert!(t.fully_supported);
    assert_parses(t.clause.as_deref().unwrap());
}

#[test]
fn test_nested_or_is_parenthesized() {
    let xml = r#"
        <fetch>
          <entity name="opportunity">
            <filter type="and">
              <condition attribute="statecode" operator="eq" value="0" />
              <filter type="or">
                <condition attribute="estimatedvalue" operator="gt" value="1000" />
                <condition attribute="name" operator="like" value="%Renewal%" />
              </filter>
            </filter>
          </entity>
        </fetch>"#;
    let t = translate(xml, &tds());
    assert_eq!(
        t.clause.as_deref(),
        Some("Base.statecode = 0 AND (Base.estimatedvalue > 1000 OR Base.name LIKE '%Renewal%')")
    );
    assert_parses(t.clause.as_deref().unwrap());
}

#[test]
fn test_fabric_brackets_columns() {
    let xml = r#"<filter><condition attribute="statuscode" operator="in"><value>1</value><value>2</value></condition></filter>"#;
    let t = translate(xml, &fabric());
    assert_eq!(t.clause.as_deref(), Some("Base.[statuscode] IN (1, 2)"));
    assert_parses(t.clause.as_deref().unwrap());
}

#[test]
fn test_between_and_null_checks() {
    let xml = r#"
        <filter>
          <condition attribute="estimatedvalue" operator="between"><value>10</value><value>20</value></condition>
          <condition attribute="closedate" operator="not-null" />
        </filter>"#;
    let t = translate(xml, &tds());
    assert_eq!(
        t.clause.as_deref(),
        Some("(Base.estimatedvalue BETWEEN 10 AND 20) AND Base.closedate IS NOT NULL")
    );
    assert_parses(t.clause.as_deref().unwrap());
}

#[test]
fn test_begins_with_escapes_wildcards() {
    let xml = r#"<filter><condition attribute="name" operator="begins-with" value="50%" /></filter>"#;
    let t = translate(xml, &tds());
    let clause = t.clause.unwrap();
    assert!(clause.starts_with("Base.name LIKE '50"));
    assert!(clause.ends_with("%'"));
    assert_ne!(clause, "Base.name LIKE '50%%'");
}

#[test]
fn test_link_entity_becomes_exists() {
    let xml = r#"
        <fetch>
          <entity name="opportunity">
            <link-entity name="account" from="accountid" to="parentaccountid" alias="acct" link-type="inner">
              <filter>
                <condition attribute="industrycode" operator="eq" value="7" />
              </filter>
            </link-entity>
          </entity>
        </fetch>"#;
    let t = translate(xml, &tds());
    assert_eq!(
        t.clause.as_deref(),
        Some("EXISTS (SELECT 1 FROM account AS acct WHERE acct.accountid = Base.parentaccountid AND acct.industrycode = 7)")
    );
    assert_parses(t.clause.as_deref().unwrap());
}

#[test]
fn test_not_any_link_is_negated() {
    let xml = r#"
        <fetch>
          <entity name="account">
            <link-entity name="opportunity" from="parentaccountid" to="accountid" alias="o" link-type="not any" />
          </entity>
        </fetch>"#;
    let t = translate(xml, &fabric());
    let clause = t.clause.unwrap();
    assert!(clause.starts_with("NOT EXISTS (SELECT 1 FROM [dbo].[opportunity] AS o"));
    assert_parses(&clause);
}

#[test]
fn test_outer_link_with_filter_is_unsupported() {
    let xml = r#"
        <fetch>
          <entity name="opportunity">
            <filter><condition attribute="statecode" operator="eq" value="0" /></filter>
            <link-entity name="account" from="accountid" to="parentaccountid" link-type="outer">
              <filter><condition attribute="name" operator="not-null" /></filter>
            </link-entity>
          </entity>
        </fetch>"#;
    let t = translate(xml, &tds());
    assert_eq!(t.clause.as_deref(), Some("Base.statecode = 0"));
    assert!(!t.fully_supported);
    assert_eq!(t.unsupported[0].kind, UnsupportedKind::LinkType);
}

#[test]
fn test_unknown_operator_keeps_the_rest() {
    let xml = r#"
        <filter>
          <condition attribute="statecode" operator="eq" value="0" />
          <condition attribute="categories" operator="contain-values" value="1" />
        </filter>"#;
    let t = translate(xml, &tds());
    assert_eq!(t.clause.as_deref(), Some("Base.statecode = 0"));
    assert!(!t.fully_supported);
    assert_eq!(t.unsupported[0].kind, UnsupportedKind::UnknownOperator);
}

#[test]
fn test_malformed_document_never_fails() {
    let t = translate("<filter><condition attribute=", &tds());
    assert!(t.clause.is_none());
    assert!(!t.fully_supported);
    assert_eq!(t.unsupported.len(), 1);
}

#[test]
fn test_utc_offset_shifts_date_comparisons() {
    let xml = r#"<filter><condition attribute="createdon" operator="on" value="2024-03-01" /></filter>"#;
    let t = translate(xml, &tds().with_utc_offset(-300));
    assert_eq!(
        t.clause.as_deref(),
        Some("CAST(DATEADD(minute, -300, Base.createdon) AS DATE) = '2024-03-01'")
    );
}

#[test]
fn test_baseline_is_anded_around_top_level_or() {
    let xml = r#"
        <filter type="or">
          <condition attribute="a" operator="eq" value="1" />
          <condition attribute="b" operator="eq" value="2" />
        </filter>"#;
    let t = translate(xml, &tds());
    assert_eq!(
        t.and_with(Some("Base.statecode = 0")).as_deref(),
        Some("(Base.statecode = 0) AND (Base.a = 1 OR Base.b = 2)")
    );
    assert_parses(&t.and_with(Some("Base.statecode = 0")).unwrap());
}

#[test]
fn test_default_link_alias_is_a_plain_identifier() {
    let xml = r#"
        <fetch>
          <entity name="opportunity">
            <link-entity name="new_deal line" from="new_opportunityid" to="opportunityid" link-type="inner">
              <filter><condition attribute="statecode" operator="eq" value="0" /></filter>
            </link-entity>
          </entity>
        </fetch>"#;
    let t = translate(xml, &tds());
    let clause = t.clause.as_deref().unwrap();
    assert!(clause.contains("l1_new_deal_line.new_opportunityid = Base.opportunityid"));
    assert!(clause.contains("l1_new_deal_line.statecode = 0"));
    assert_parses(clause);
}

#[test]
fn test_leading_zeros_stay_text() {
    let xml = r#"<filter><condition attribute="accountnumber" operator="eq" value="00123" /></filter>"#;
    let t = translate(xml, &tds());
    assert_eq!(t.clause.as_deref(), Some("Base.accountnumber = '00123'"));
}
