use modelsmith::config::ConnectionSpec;
use modelsmith::schema::{
    AttributeKind, AttributeSpec, DateRelationship, DateTableSpec, ExpandedLookup, RelationshipSpec,
    SchemaModel, TableRole, TableSpec,
};
use modelsmith::validation::{self, ValidationError};

fn model() -> SchemaModel {
    SchemaModel::new("Sales", ConnectionSpec::tds("https://org.crm.dynamics.com"))
        .with_table(TableSpec::new("account", "Account", TableRole::Dimension))
        .with_table(
            TableSpec::new("opportunity", "Opportunity", TableRole::Fact)
                .with_attribute(
                    AttributeSpec::new("parentaccountid", "Account", AttributeKind::Lookup)
                        .with_targets(["account"]),
                )
                .with_attribute(
                    AttributeSpec::new("new_endcustomerid", "End Customer", AttributeKind::Customer)
                        .with_targets(["account", "contact"]),
                )
                .with_attribute(AttributeSpec::new("estimatedclosedate", "Est. Close Date", AttributeKind::DateTime))
                .with_attribute(AttributeSpec::new("name", "Topic", AttributeKind::String)),
        )
}

#[test]
fn test_validate_empty_model() {
    let model = SchemaModel::new("Empty", ConnectionSpec::tds("https://org.crm.dynamics.com"));
    assert!(validation::validate(&model).is_ok());
}

#[test]
fn test_validation_error_display() {
    let error = ValidationError::UndefinedReference {
        entity_type: "Relationship".to_string(),
        entity_name: "opportunity.parentaccountid".to_string(),
        reference_type: "table".to_string(),
        reference_name: "account".to_string(),
    };

    let message = error.to_string();
    assert!(message.contains("opportunity.parentaccountid"));
    assert!(message.contains("table"));
    assert!(message.contains("account"));
}

#[test]
fn test_two_active_relationships_between_pair() {
    let model = model()
        .with_relationship(RelationshipSpec::new("opportunity", "parentaccountid", "account"))
        .with_relationship(RelationshipSpec::new("opportunity", "new_endcustomerid", "account"));

    let errors = validation::validate(&model).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        ValidationError::ActiveRelationshipConflict { active: 2, .. }
    ));
}

#[test]
fn test_one_active_one_inactive_is_valid() {
    let model = model()
        .with_relationship(RelationshipSpec::new("opportunity", "parentaccountid", "account"))
        .with_relationship(
            RelationshipSpec::new("opportunity", "new_endcustomerid", "account").inactive(),
        );
    assert!(validation::validate(&model).is_ok());
}

#[test]
fn test_relationship_on_non_lookup_attribute() {
    let model = model().with_relationship(RelationshipSpec::new("opportunity", "name", "account"));
    let errors = validation::validate(&model).unwrap_err();
    assert!(matches!(&errors[0], ValidationError::InvalidReference { issue, .. } if issue.contains("not a lookup")));
}

#[test]
fn test_relationship_to_unknown_table() {
    let model = model().with_relationship(RelationshipSpec::new("opportunity", "parentaccountid", "contact"));
    let errors = validation::validate(&model).unwrap_err();
    assert_eq!(
        errors,
        vec![ValidationError::UndefinedReference {
            entity_type: "Relationship".to_string(),
            entity_name: "opportunity.parentaccountid".to_string(),
            reference_type: "table".to_string(),
            reference_name: "contact".to_string(),
        }]
    );
}

#[test]
fn test_duplicate_logical_and_display_names() {
    let model = model().with_table(TableSpec::new("Account", "ACCOUNT", TableRole::Dimension));
    let errors = validation::validate(&model).unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .all(|e| matches!(e, ValidationError::DuplicateName { .. })));
}

#[test]
fn test_unsafe_display_name() {
    let model = model().with_table(TableSpec::new("new_x", "Sales/Orders", TableRole::Dimension));
    let errors = validation::validate(&model).unwrap_err();
    assert!(matches!(&errors[0], ValidationError::UnsafeName { name, .. } if name == "Sales/Orders"));
}

#[test]
fn test_expanded_lookup_attribute_must_exist() {
    let mut model = model();
    model.tables[1].expanded_lookups.push(ExpandedLookup {
        lookup_attribute: "customerid".to_string(),
        target_table: "account".to_string(),
        target_primary_id: None,
        columns: vec![AttributeSpec::new("industrycode", "Industry", AttributeKind::Picklist)],
    });
    let errors = validation::validate(&model).unwrap_err();
    assert!(errors[0].to_string().contains("customerid"));
}

#[test]
fn test_date_relationships() {
    let mut model = model();
    model.date_relationships.push(DateRelationship {
        table: "opportunity".to_string(),
        attribute: "estimatedclosedate".to_string(),
        is_active: true,
    });

    // no date table configured
    assert!(validation::validate(&model).is_err());

    model.date_table = Some(DateTableSpec::new(2020, 2030));
    assert!(validation::validate(&model).is_ok());

    model.date_relationships.push(DateRelationship {
        table: "opportunity".to_string(),
        attribute: "name".to_string(),
        is_active: false,
    });
    let errors = validation::validate(&model).unwrap_err();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("not DateTime"));
}

#[test]
fn test_all_errors_are_collected() {
    let model = model()
        .with_table(TableSpec::new("account", "Account 2", TableRole::Dimension))
        .with_relationship(RelationshipSpec::new("opportunity", "missing", "account"))
        .with_relationship(RelationshipSpec::new("lead", "parentaccountid", "account"));
    let errors = validation::validate(&model).unwrap_err();
    assert_eq!(errors.len(), 3);
}
