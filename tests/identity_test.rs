//! Tests for display name collapsing.

use message_merge::identity::collapse_name_fragments;
use message_merge::models::ContactRecord;

#[test]
fn first_and_last_name_collapse() {
    assert_eq!(
        collapse_name_fragments([Some("Jane"), Some("Doe"), None]),
        "Jane Doe"
    );
}

#[test]
fn fully_absent_fragments_collapse_to_the_empty_string() {
    assert_eq!(collapse_name_fragments([None, None, None]), "");
}

#[test]
fn organization_only_contacts_use_the_organization() {
    assert_eq!(
        collapse_name_fragments([None, None, Some("Acme Inc")]),
        "Acme Inc"
    );
}

#[test]
fn contact_record_full_name_follows_fragment_order() {
    let record = ContactRecord {
        identifier: "4155550100".to_string(),
        first: Some("Jane".to_string()),
        last: Some("Doe".to_string()),
        organization: Some("Acme Inc".to_string()),
        birthday: None,
        created: None,
        modified: None,
    };
    assert_eq!(record.full_name(), "Jane Doe Acme Inc");
}

#[test]
fn contact_record_with_no_fragments_has_an_empty_name() {
    let record = ContactRecord {
        identifier: "4155550100".to_string(),
        first: None,
        last: None,
        organization: None,
        birthday: None,
        created: None,
        modified: None,
    };
    assert_eq!(record.full_name(), "");
}
