//! Integration tests for the post-commit side channel: activity entries and view invalidation.

use tenantgate::app::domain::{GlobalRole, OrganizationRole, SubscriptionTier};
use tenantgate::app::features::crm::{activity, contacts};

mod common;

use crate::common::*;

#[tokio::test]
async fn successful_create_records_activity() {
    let app = test_app().await;
    let org = create_organization(&app.pool, "Acme").await;
    let principal = member(
        &app.pool,
        &org,
        "owner@acme.test",
        GlobalRole::Admin,
        SubscriptionTier::Growth,
        OrganizationRole::Owner,
    )
    .await;

    let contact = contacts::create_contact(&app.state, Some(&principal), &org, contact_input("Ada"))
        .await
        .unwrap();

    let entries = activity::list_activity(&app.state, Some(&principal), &org, None)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.action, "created_contact");
    assert_eq!(entry.resource_type, "contact");
    assert_eq!(entry.resource_id, contact.id);
    assert_eq!(entry.user_id, principal.id.as_str());
    assert_eq!(entry.old_data, None);
    let snapshot: serde_json::Value = serde_json::from_str(entry.new_data.as_deref().unwrap()).unwrap();
    assert_eq!(snapshot["name"], "Ada");
}

#[tokio::test]
async fn audit_failure_does_not_fail_the_operation() {
    let app = test_app().await;
    let org = create_organization(&app.pool, "Acme").await;
    let principal = crm_user(&app.pool, &org, "member@acme.test", OrganizationRole::Member).await;
    sqlx::query("DROP TABLE activity_logs").execute(&app.pool).await.unwrap();

    let contact = contacts::create_contact(&app.state, Some(&principal), &org, contact_input("Ada"))
        .await
        .unwrap();

    assert_eq!(contact.name, "Ada");
    assert_eq!(count_rows(&app.pool, "contacts").await, 1);
    assert_eq!(app.invalidator.calls().len(), 1);
}

#[tokio::test]
async fn invalidation_runs_after_commit() {
    let app = test_app().await;
    let org = create_organization(&app.pool, "Acme").await;
    let principal = crm_user(&app.pool, &org, "member@acme.test", OrganizationRole::Member).await;

    let contact = contacts::create_contact(&app.state, Some(&principal), &org, contact_input("Ada"))
        .await
        .unwrap();

    let calls = app.invalidator.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].visible_contacts, 1);
    assert!(calls[0].paths.contains(&"/crm/contacts".to_string()));
    assert!(calls[0].paths.contains(&format!("/crm/contacts/{}", contact.id)));
    assert!(calls[0].paths.contains(&"/crm/dashboard".to_string()));
}

#[tokio::test]
async fn failed_operations_neither_audit_nor_invalidate() {
    let app = test_app().await;
    let org = create_organization(&app.pool, "Acme").await;
    let principal = crm_user(&app.pool, &org, "member@acme.test", OrganizationRole::Member).await;

    let result = contacts::create_contact(&app.state, Some(&principal), &org, contact_input("")).await;
    assert!(result.is_err());
    let result = contacts::delete_contact(&app.state, Some(&principal), &org, "01HZZZZZZZZZZZZZZZZZZZZZZZ").await;
    assert!(result.is_err());

    assert!(app.invalidator.calls().is_empty());
    assert_eq!(count_rows(&app.pool, "activity_logs").await, 0);
}

#[tokio::test]
async fn reads_do_not_invalidate() {
    let app = test_app().await;
    let org = create_organization(&app.pool, "Acme").await;
    let principal = crm_user(&app.pool, &org, "member@acme.test", OrganizationRole::Member).await;

    contacts::list_contacts(&app.state, Some(&principal), &org, None)
        .await
        .unwrap();

    assert!(app.invalidator.calls().is_empty());
}

#[tokio::test]
async fn activity_is_scoped_to_the_organization() {
    let app = test_app().await;
    let org_a = create_organization(&app.pool, "A").await;
    let org_b = create_organization(&app.pool, "B").await;
    let auditor_a = member(
        &app.pool,
        &org_a,
        "owner@a.test",
        GlobalRole::Admin,
        SubscriptionTier::Growth,
        OrganizationRole::Owner,
    )
    .await;
    let writer_b = crm_user(&app.pool, &org_b, "member@b.test", OrganizationRole::Member).await;

    contacts::create_contact(&app.state, Some(&writer_b), &org_b, contact_input("Yara"))
        .await
        .unwrap();
    contacts::create_contact(&app.state, Some(&auditor_a), &org_a, contact_input("Ada"))
        .await
        .unwrap();

    let entries = activity::list_activity(&app.state, Some(&auditor_a), &org_a, None)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries.iter().all(|e| e.organization_id == org_a.as_str()));
}

#[tokio::test]
async fn configured_state_runs_operations_with_the_log_adapter() {
    let state = tenantgate::app::AppState::from_config(&tenantgate::app::config::Config::for_tests())
        .await
        .unwrap();
    let org = create_organization(&state.db, "Acme").await;
    let principal = crm_user(&state.db, &org, "member@acme.test", OrganizationRole::Member).await;

    let contact = contacts::create_contact(&state, Some(&principal), &org, contact_input("Ada"))
        .await
        .unwrap();

    assert_eq!(contact.organization_id, org.as_str());
    assert_eq!(count_rows(&state.db, "activity_logs").await, 1);
}
