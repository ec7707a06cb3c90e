//! Integration tests for bulk reassignment across a mixed id list.

use tenantgate::app::domain::OrganizationRole;
use tenantgate::app::error::AppError;
use tenantgate::app::features::crm::contacts;
use tenantgate::app::features::crm::BulkAssignInput;

mod common;

use crate::common::*;

async fn assigned_count(pool: &sqlx::SqlitePool, assignee: &str) -> i64 {
    sqlx::query_scalar("SELECT count(*) FROM contacts WHERE assigned_to_id = ?")
        .bind(assignee)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn bulk_assign_only_touches_the_active_organization() {
    let app = test_app().await;
    let org_a = create_organization(&app.pool, "A").await;
    let org_b = create_organization(&app.pool, "B").await;
    let admin_a = crm_user(&app.pool, &org_a, "admin@a.test", OrganizationRole::Admin).await;
    let owner_b = crm_user(&app.pool, &org_b, "owner@b.test", OrganizationRole::Owner).await;

    let mut ids = Vec::new();
    for i in 0..97 {
        let contact = contacts::create_contact(&app.state, Some(&admin_a), &org_a, contact_input(&format!("a{i}")))
            .await
            .unwrap();
        ids.push(contact.id);
    }
    for i in 0..3 {
        let contact = contacts::create_contact(&app.state, Some(&owner_b), &org_b, contact_input(&format!("b{i}")))
            .await
            .unwrap();
        ids.push(contact.id);
    }

    let updated = contacts::bulk_assign_contacts(
        &app.state,
        Some(&admin_a),
        &org_a,
        BulkAssignInput {
            ids,
            assigned_to_id: Some(admin_a.id.clone()),
        },
    )
    .await
    .unwrap();

    assert_eq!(updated, 97);
    assert_eq!(assigned_count(&app.pool, &admin_a.id.as_str()).await, 97);

    let b_contacts = contacts::list_contacts(&app.state, Some(&owner_b), &org_b, None)
        .await
        .unwrap();
    assert_eq!(b_contacts.len(), 3);
    assert!(b_contacts.iter().all(|c| c.assigned_to_id.is_none()));
}

#[tokio::test]
async fn bulk_assign_records_one_summary_entry() {
    let app = test_app().await;
    let org = create_organization(&app.pool, "Acme").await;
    let admin = crm_user(&app.pool, &org, "admin@acme.test", OrganizationRole::Admin).await;
    let contact = contacts::create_contact(&app.state, Some(&admin), &org, contact_input("Ada"))
        .await
        .unwrap();

    contacts::bulk_assign_contacts(
        &app.state,
        Some(&admin),
        &org,
        BulkAssignInput {
            ids: vec![contact.id, "01HZZZZZZZZZZZZZZZZZZZZZZZ".to_string()],
            assigned_to_id: Some(admin.id.clone()),
        },
    )
    .await
    .unwrap();

    let (resource_id, new_data): (String, String) = sqlx::query_as(
        "SELECT resource_id, new_data FROM activity_logs WHERE action = 'bulk_assigned_contacts'",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(resource_id, "bulk");
    let summary: serde_json::Value = serde_json::from_str(&new_data).unwrap();
    assert_eq!(summary["requested"], 2);
    assert_eq!(summary["updated"], 1);
}

#[tokio::test]
async fn empty_id_list_is_rejected() {
    let app = test_app().await;
    let org = create_organization(&app.pool, "Acme").await;
    let admin = crm_user(&app.pool, &org, "admin@acme.test", OrganizationRole::Admin).await;

    let err = contacts::bulk_assign_contacts(
        &app.state,
        Some(&admin),
        &org,
        BulkAssignInput {
            ids: Vec::new(),
            assigned_to_id: None,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn members_cannot_bulk_assign() {
    let app = test_app().await;
    let org = create_organization(&app.pool, "Acme").await;
    let member = crm_user(&app.pool, &org, "member@acme.test", OrganizationRole::Member).await;

    let err = contacts::bulk_assign_contacts(
        &app.state,
        Some(&member),
        &org,
        BulkAssignInput {
            ids: vec!["01HZZZZZZZZZZZZZZZZZZZZZZZ".to_string()],
            assigned_to_id: None,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::ForbiddenOrg { .. }));
}

#[tokio::test]
async fn bulk_assign_to_a_foreign_user_changes_nothing() {
    let app = test_app().await;
    let org_a = create_organization(&app.pool, "A").await;
    let org_b = create_organization(&app.pool, "B").await;
    let admin_a = crm_user(&app.pool, &org_a, "admin@a.test", OrganizationRole::Admin).await;
    let outsider = crm_user(&app.pool, &org_b, "outsider@b.test", OrganizationRole::Member).await;
    let contact = contacts::create_contact(&app.state, Some(&admin_a), &org_a, contact_input("Ada"))
        .await
        .unwrap();

    let err = contacts::bulk_assign_contacts(
        &app.state,
        Some(&admin_a),
        &org_a,
        BulkAssignInput {
            ids: vec![contact.id],
            assigned_to_id: Some(outsider.id.clone()),
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::NotFoundOrForbidden));
    assert_eq!(assigned_count(&app.pool, &outsider.id.as_str()).await, 0);
}
