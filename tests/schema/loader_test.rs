use std::io::Write;

use modelsmith::config::{ModelSettings, Settings, SettingsError};
use modelsmith::schema::loader::MetadataDictionary;
use modelsmith::schema::{AttributeKind, StorageMode, TableRole};
use modelsmith::sql::Dialect;

const DICTIONARY: &str = r#"{
    "ProjectName": "Sales",
    "Tables": [
        {
            "LogicalName": "opportunity",
            "DisplayName": "Opportunity",
            "Role": "Fact",
            "PrimaryIdAttribute": "opportunityid",
            "PrimaryNameAttribute": "name",
            "Attributes": [
                { "LogicalName": "name", "DisplayName": "Topic", "AttributeType": "String" },
                { "LogicalName": "ownerid", "DisplayName": "Owner", "AttributeType": "Owner", "Targets": ["systemuser", "team"] },
                { "LogicalName": "owneridname", "DisplayName": "Owner Name", "AttributeType": "String", "AttributeOf": "ownerid" },
                { "LogicalName": "estimatedvalue", "DisplayName": "Est. Revenue", "AttributeType": "Money", "Description": "Forecast" }
            ],
            "LookupColumns": {
                "ownerid": { "IncludeId": true, "IncludeName": true, "IncludeType": true }
            },
            "BaselineFilter": "Base.statecode = 0",
            "StorageMode": "import",
            "View": { "ViewName": "Open Opportunities", "FetchXml": "<filter><condition attribute=\"statecode\" operator=\"eq\" value=\"0\" /></filter>" }
        },
        {
            "LogicalName": "account",
            "DisplayName": "Account",
            "PrimaryIdAttribute": "accountid"
        }
    ],
    "Relationships": [
        { "SourceTable": "opportunity", "SourceAttribute": "parentaccountid", "TargetTable": "account", "IsActive": false }
    ],
    "DateRelationships": [
        { "Table": "opportunity", "Attribute": "estimatedclosedate" }
    ]
}"#;

fn write_config(toml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(toml.as_bytes()).unwrap();
    file
}

#[test]
fn test_dictionary_to_model() {
    let settings = write_config(
        r#"
[connection]
dialect = "fabric"
environment_url = "https://org.crm.dynamics.com"
sql_endpoint = "abc.datawarehouse.fabric.microsoft.com"
database = "dataverse_org"

[model]
storage_mode = "dual"
utc_offset_minutes = -300

[model.date_table]
start_year = 2020
end_year = 2030
"#,
    );
    let settings = Settings::from_file(settings.path()).unwrap();
    let connection = settings.connection.resolve().unwrap();
    assert_eq!(connection.dialect, Dialect::FabricLink);

    let model = MetadataDictionary::from_json(DICTIONARY)
        .unwrap()
        .into_model(connection, &settings.model)
        .unwrap();

    assert_eq!(model.storage_mode, StorageMode::Dual);
    assert_eq!(model.utc_offset_minutes, -300);
    assert_eq!(model.date_table.as_ref().map(|d| d.name.as_str()), Some("Date"));
    assert_eq!(model.date_relationships.len(), 1);
    assert!(model.date_relationships[0].is_active);

    let opp = model.table("opportunity").unwrap();
    assert_eq!(opp.role, TableRole::Fact);
    assert_eq!(opp.storage_mode, Some(StorageMode::Import));
    assert_eq!(opp.baseline_filter.as_deref(), Some("Base.statecode = 0"));
    assert!(opp.filter.as_deref().unwrap_or_default().contains("statecode"));
    assert_eq!(opp.attributes[1].kind, AttributeKind::Owner);
    assert_eq!(opp.attributes[2].attribute_of.as_deref(), Some("ownerid"));
    assert_eq!(opp.attributes[3].description.as_deref(), Some("Forecast"));

    let owner = opp.lookup_columns["ownerid"];
    assert!(owner.include_id);
    assert!(owner.include_type);
    assert!(!owner.include_phonetic);
    // unspecified fields keep the name-only defaults
    assert!(owner.id_hidden);

    let account = model.table("account").unwrap();
    assert_eq!(account.role, TableRole::Dimension);
    assert!(account.filter.is_none());
    assert!(!model.relationships[0].is_active);
}

#[test]
fn test_env_expansion_in_connection() {
    std::env::set_var("MODELSMITH_TEST_ENV_URL", "https://contoso.crm4.dynamics.com");
    let settings = write_config(
        r#"
[connection]
environment_url = "${MODELSMITH_TEST_ENV_URL}"
"#,
    );
    let settings = Settings::from_file(settings.path()).unwrap();
    let connection = settings.connection.resolve().unwrap();
    assert_eq!(connection.dialect, Dialect::DataverseTds);
    assert_eq!(connection.environment_host(), "contoso.crm4.dynamics.com");
}

#[test]
fn test_missing_env_var() {
    let settings = write_config(
        r#"
[connection]
environment_url = "${MODELSMITH_TEST_DEFINITELY_UNSET}"
"#,
    );
    let settings = Settings::from_file(settings.path()).unwrap();
    let err = settings.connection.resolve().unwrap_err();
    assert!(matches!(err, SettingsError::MissingEnvVar(v) if v == "MODELSMITH_TEST_DEFINITELY_UNSET"));
}

#[test]
fn test_missing_config_file() {
    let err = Settings::from_file("/nonexistent/modelsmith.toml").unwrap_err();
    assert!(matches!(err, SettingsError::FileNotFound(_)));
}

#[test]
fn test_inverted_date_range_rejected() {
    let settings = ModelSettings {
        date_table: Some(modelsmith::config::DateTableSettings {
            name: "Calendar".to_string(),
            start_year: 2030,
            end_year: 2020,
        }),
        ..ModelSettings::default()
    };
    assert!(matches!(
        settings.date_table(),
        Err(SettingsError::InvalidConfig(_))
    ));
}

#[test]
fn test_malformed_dictionary() {
    assert!(MetadataDictionary::from_json("{ \"Tables\": [] }").is_err());
}
