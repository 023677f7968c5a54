/// Integration tests for the ResourceX API
///
/// These tests verify the full system works end-to-end:
/// - Registration and login flow
/// - Scoped resource listing with filters and pagination
/// - Owner/assignee/administrator authorization
/// - Dashboard aggregation
/// - Soft deletion
///
/// They need a PostgreSQL instance reachable via `TEST_DATABASE_URL` (or
/// `DATABASE_URL`); without one every test skips.
mod common;

use axum::http::StatusCode;
use common::{create_resource, send, TestContext};
use serde_json::json;
use uuid::Uuid;

macro_rules! require_db {
    () => {
        match TestContext::new().await {
            Some(ctx) => ctx,
            None => {
                eprintln!("Skipping: TEST_DATABASE_URL not set");
                return;
            }
        }
    };
}

#[tokio::test]
async fn test_health_reports_database_and_pool() {
    let ctx = require_db!();

    let (status, body) = send(&ctx.app, "GET", "/health", "", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["databaseReachable"], true);
    assert!(body["pool"]["open"].as_u64().unwrap() >= 1);
    assert!(body["version"].is_string());

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_register_login_and_verify_flow() {
    let ctx = require_db!();

    let email = format!("itest-{}@example.com", Uuid::new_v4());
    let (status, body) = send(
        &ctx.app,
        "POST",
        "/v1/auth/register",
        "",
        Some(json!({
            "name": "Registration Test",
            "email": email,
            "password": "secret-password-1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    assert!(body["accessToken"].is_string());
    assert!(body["refreshToken"].is_string());
    assert_eq!(body["user"]["email"], email.as_str());
    assert!(body["user"]["emailVerifiedAt"].is_null());
    assert_eq!(body["user"]["roles"][0], "Regular User");

    // Duplicate email conflicts
    let (status, _) = send(
        &ctx.app,
        "POST",
        "/v1/auth/register",
        "",
        Some(json!({
            "name": "Duplicate",
            "email": email,
            "password": "secret-password-1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Login with the new credentials
    let (status, login) = send(
        &ctx.app,
        "POST",
        "/v1/auth/login",
        "",
        Some(json!({ "email": email, "password": "secret-password-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", login);
    let token = login["accessToken"].as_str().unwrap().to_string();

    // Refresh produces a usable access token
    let (status, refreshed) = send(
        &ctx.app,
        "POST",
        "/v1/auth/refresh",
        "",
        Some(json!({ "refreshToken": login["refreshToken"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(refreshed["accessToken"].is_string());

    // /me reflects the caller
    let (status, me) = send(&ctx.app, "GET", "/v1/me", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], email.as_str());

    // Wrong password is rejected
    let (status, _) = send(
        &ctx.app,
        "POST",
        "/v1/auth/login",
        "",
        Some(json!({ "email": email, "password": "wrong-password-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Unknown verification token is a 404
    let (status, _) = send(
        &ctx.app,
        "GET",
        &format!("/v1/auth/verify-email/{}", Uuid::new_v4()),
        "",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let user_id = me["id"].as_i64().unwrap();
    ctx.delete_users(&[user_id]).await;
    ctx.cleanup().await;
}

#[tokio::test]
async fn test_member_sees_only_owned_or_assigned() {
    let ctx = require_db!();
    let (other, other_token) = ctx.another_member().await;

    let owned = create_resource(
        &ctx,
        &ctx.member_token,
        json!({ "name": "Owned by member" }),
    )
    .await;
    let assigned = create_resource(
        &ctx,
        &other_token,
        json!({ "name": "Assigned to member", "assigneeId": ctx.member.id }),
    )
    .await;
    let foreign = create_resource(&ctx, &other_token, json!({ "name": "Foreign" })).await;

    let (status, listing) = send(&ctx.app, "GET", "/v1/resources", &ctx.member_token, None).await;
    assert_eq!(status, StatusCode::OK);

    let uuids: Vec<&str> = listing["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["uuid"].as_str().unwrap())
        .collect();
    assert!(uuids.contains(&owned["uuid"].as_str().unwrap()));
    assert!(uuids.contains(&assigned["uuid"].as_str().unwrap()));
    assert!(!uuids.contains(&foreign["uuid"].as_str().unwrap()));
    assert_eq!(listing["pagination"]["total"], 2);

    // The administrator can read the foreign resource directly
    let (status, shown) = send(
        &ctx.app,
        "GET",
        &format!("/v1/resources/{}", foreign["uuid"].as_str().unwrap()),
        &ctx.admin_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shown["owner"]["id"], other.id);

    ctx.delete_users(&[other.id]).await;
    ctx.cleanup().await;
}

#[tokio::test]
async fn test_filtered_listing_and_pagination() {
    let ctx = require_db!();

    for (name, status, priority) in [
        ("alpha", "pending", "low"),
        ("beta", "in_progress", "high"),
        ("gamma", "completed", "high"),
        ("delta", "completed", "medium"),
        ("epsilon", "cancelled", "urgent"),
    ] {
        create_resource(
            &ctx,
            &ctx.member_token,
            json!({ "name": name, "status": status, "priority": priority }),
        )
        .await;
    }

    // Multi-value status filter matches with OR
    let (status, listing) = send(
        &ctx.app,
        "GET",
        "/v1/resources?status=completed,cancelled",
        &ctx.member_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["pagination"]["total"], 3);
    for item in listing["data"].as_array().unwrap() {
        let s = item["status"].as_str().unwrap();
        assert!(s == "completed" || s == "cancelled");
    }

    // Distinct filters combine with AND
    let (_, listing) = send(
        &ctx.app,
        "GET",
        "/v1/resources?status=completed&priority=high",
        &ctx.member_token,
        None,
    )
    .await;
    assert_eq!(listing["pagination"]["total"], 1);
    assert_eq!(listing["data"][0]["name"], "gamma");

    // Pagination envelope and page boundaries
    let (_, page1) = send(
        &ctx.app,
        "GET",
        "/v1/resources?perPage=2&page=1&sortBy=name&sortOrder=asc",
        &ctx.member_token,
        None,
    )
    .await;
    assert_eq!(page1["pagination"]["currentPage"], 1);
    assert_eq!(page1["pagination"]["perPage"], 2);
    assert_eq!(page1["pagination"]["total"], 5);
    assert_eq!(page1["pagination"]["lastPage"], 3);
    assert_eq!(page1["data"].as_array().unwrap().len(), 2);
    assert_eq!(page1["data"][0]["name"], "alpha");

    // A page past the end is empty but keeps the true total
    let (status, past) = send(
        &ctx.app,
        "GET",
        "/v1/resources?perPage=2&page=9",
        &ctx.member_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(past["data"].as_array().unwrap().len(), 0);
    assert_eq!(past["pagination"]["total"], 5);

    // Search matches name substrings case-insensitively
    let (_, found) = send(
        &ctx.app,
        "GET",
        "/v1/resources?search=GAMM",
        &ctx.member_token,
        None,
    )
    .await;
    assert_eq!(found["pagination"]["total"], 1);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_admin_listing_spans_all_owners() {
    let ctx = require_db!();
    let (other, other_token) = ctx.another_member().await;

    let marker = Uuid::new_v4().to_string();
    let mine = create_resource(
        &ctx,
        &ctx.member_token,
        json!({ "name": format!("member {marker}") }),
    )
    .await;
    let foreign = create_resource(
        &ctx,
        &other_token,
        json!({ "name": format!("foreign {marker}") }),
    )
    .await;

    // The unfiltered admin listing covers at least everything the member sees
    let (status, admin_listing) =
        send(&ctx.app, "GET", "/v1/resources", &ctx.admin_token, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, member_listing) =
        send(&ctx.app, "GET", "/v1/resources", &ctx.member_token, None).await;
    let admin_total = admin_listing["pagination"]["total"].as_i64().unwrap();
    let member_total = member_listing["pagination"]["total"].as_i64().unwrap();
    assert!(admin_total >= member_total);
    assert!(admin_total >= 2);

    // Narrowed to this test's rows, the admin sees both owners' resources
    let uri = format!("/v1/resources?search={marker}");
    let (status, narrowed) = send(&ctx.app, "GET", &uri, &ctx.admin_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(narrowed["pagination"]["total"], 2);
    let uuids: Vec<&str> = narrowed["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["uuid"].as_str().unwrap())
        .collect();
    assert!(uuids.contains(&mine["uuid"].as_str().unwrap()));
    assert!(uuids.contains(&foreign["uuid"].as_str().unwrap()));

    // The member's view of the same query stays scoped to their own row
    let (_, member_narrowed) = send(&ctx.app, "GET", &uri, &ctx.member_token, None).await;
    assert_eq!(member_narrowed["pagination"]["total"], 1);
    assert_eq!(member_narrowed["data"][0]["uuid"], mine["uuid"]);

    ctx.delete_users(&[other.id]).await;
    ctx.cleanup().await;
}

#[tokio::test]
async fn test_repeated_query_returns_identical_page() {
    let ctx = require_db!();

    // Two rows share a name so equal sort keys are in play
    for name in ["twin", "twin", "alpha", "omega"] {
        create_resource(
            &ctx,
            &ctx.member_token,
            json!({ "name": name, "priority": "high" }),
        )
        .await;
    }

    let uri = "/v1/resources?priority=high&sortBy=name&sortOrder=asc&perPage=3&page=1";
    let (status, first) = send(&ctx.app, "GET", uri, &ctx.member_token, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = send(&ctx.app, "GET", uri, &ctx.member_token, None).await;
    assert_eq!(status, StatusCode::OK);

    // Same filters, sort, and page against unchanged data: identical records
    // in identical order with identical metadata
    assert_eq!(first["data"], second["data"]);
    assert_eq!(first["pagination"], second["pagination"]);
    assert_eq!(first["data"].as_array().unwrap().len(), 3);
    assert_eq!(first["data"][0]["name"], "alpha");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_invalid_query_parameters_rejected() {
    let ctx = require_db!();

    let (status, body) = send(
        &ctx.app,
        "GET",
        "/v1/resources?perPage=0",
        &ctx.member_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "perPage");

    let (status, body) = send(
        &ctx.app,
        "GET",
        "/v1/resources?status=archived",
        &ctx.member_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "status");

    let (status, body) = send(
        &ctx.app,
        "GET",
        "/v1/resources?sortBy=owner_id",
        &ctx.member_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "sortBy");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_dashboard_statistics() {
    let ctx = require_db!();

    // One overdue, one past-due but completed, one not yet due
    let late = create_resource(
        &ctx,
        &ctx.member_token,
        json!({ "name": "late", "status": "pending", "dueDate": "2020-01-01T00:00:00Z" }),
    )
    .await;
    create_resource(
        &ctx,
        &ctx.member_token,
        json!({ "name": "done late", "status": "completed", "dueDate": "2020-01-01T00:00:00Z" }),
    )
    .await;
    create_resource(
        &ctx,
        &ctx.member_token,
        json!({ "name": "future", "status": "in_progress", "dueDate": "2099-01-01T00:00:00Z" }),
    )
    .await;

    let (status, dash) = send(&ctx.app, "GET", "/v1/dashboard", &ctx.member_token, None).await;
    assert_eq!(status, StatusCode::OK, "dashboard failed: {}", dash);

    let stats = &dash["resourceStats"];
    assert_eq!(stats["totalResources"], 3);
    assert_eq!(stats["overdue"], 1);

    // Grouped counts sum to the total
    let by_status_sum: i64 = stats["byStatus"]
        .as_object()
        .unwrap()
        .values()
        .map(|v| v.as_i64().unwrap())
        .sum();
    assert_eq!(by_status_sum, 3);
    assert_eq!(stats["byStatus"]["pending"], 1);
    assert!(stats["byStatus"].get("cancelled").is_none());

    // Recent activity is newest-first and within the visible scope
    let recent = stats["recentActivity"].as_array().unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0]["name"], "future");

    // Non-admin: no user stats, twelve zero-filled months
    assert!(dash["userStats"].is_null());
    assert_eq!(dash["isAdmin"], false);
    assert_eq!(dash["monthlyData"].as_object().unwrap().len(), 12);

    // Completing the overdue resource removes it from the count
    let (status, _) = send(
        &ctx.app,
        "PUT",
        &format!("/v1/resources/{}", late["uuid"].as_str().unwrap()),
        &ctx.member_token,
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, dash) = send(&ctx.app, "GET", "/v1/dashboard", &ctx.member_token, None).await;
    assert_eq!(dash["resourceStats"]["overdue"], 0);
    assert_eq!(dash["resourceStats"]["byStatus"]["completed"], 2);

    // Admin dashboard carries user statistics
    let (_, admin_dash) = send(&ctx.app, "GET", "/v1/dashboard", &ctx.admin_token, None).await;
    assert_eq!(admin_dash["isAdmin"], true);
    assert!(admin_dash["userStats"]["totalUsers"].as_i64().unwrap() >= 2);
    assert!(admin_dash["userStats"]["byStatus"]["invited"].as_i64().is_some());

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_assignee_can_view_but_not_modify() {
    let ctx = require_db!();
    let (stranger, stranger_token) = ctx.another_member().await;

    let resource = create_resource(
        &ctx,
        &ctx.member_token,
        json!({ "name": "shared work", "assigneeId": stranger.id }),
    )
    .await;
    let uri = format!("/v1/resources/{}", resource["uuid"].as_str().unwrap());

    // Here "stranger" is actually the assignee: read ok, write forbidden
    let (status, shown) = send(&ctx.app, "GET", &uri, &stranger_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shown["assignee"]["id"], stranger.id);

    let (status, _) = send(
        &ctx.app,
        "PUT",
        &uri,
        &stranger_token,
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&ctx.app, "DELETE", &uri, &stranger_token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owner may update, including clearing the assignee with null
    let (status, updated) = send(
        &ctx.app,
        "PUT",
        &uri,
        &ctx.member_token,
        Some(json!({ "status": "completed", "assigneeId": null })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "owner update failed: {}", updated);
    assert_eq!(updated["status"], "completed");
    assert!(updated["assignee"].is_null());

    // Once unassigned, the former assignee loses visibility
    let (status, _) = send(&ctx.app, "GET", &uri, &stranger_token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Unknown assignee ids are rejected per-field
    let (status, body) = send(
        &ctx.app,
        "PUT",
        &uri,
        &ctx.member_token,
        Some(json!({ "assigneeId": 999999999 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"][0]["field"], "assigneeId");

    // Administrators may delete
    let (status, _) = send(&ctx.app, "DELETE", &uri, &ctx.admin_token, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    ctx.delete_users(&[stranger.id]).await;
    ctx.cleanup().await;
}

#[tokio::test]
async fn test_soft_delete_removes_from_listing_and_stats() {
    let ctx = require_db!();

    let keep = create_resource(&ctx, &ctx.member_token, json!({ "name": "keep" })).await;
    let drop = create_resource(&ctx, &ctx.member_token, json!({ "name": "drop" })).await;
    let drop_uri = format!("/v1/resources/{}", drop["uuid"].as_str().unwrap());

    let (status, _) = send(&ctx.app, "DELETE", &drop_uri, &ctx.member_token, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Gone from single reads, listings, and statistics
    let (status, _) = send(&ctx.app, "GET", &drop_uri, &ctx.member_token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listing) = send(&ctx.app, "GET", "/v1/resources", &ctx.member_token, None).await;
    assert_eq!(listing["pagination"]["total"], 1);
    assert_eq!(listing["data"][0]["uuid"], keep["uuid"]);

    let (_, dash) = send(&ctx.app, "GET", "/v1/dashboard", &ctx.member_token, None).await;
    assert_eq!(dash["resourceStats"]["totalResources"], 1);

    // Deleting again is a 404, not a second delete
    let (status, _) = send(&ctx.app, "DELETE", &drop_uri, &ctx.member_token, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_user_collections_are_admin_only() {
    let ctx = require_db!();

    let (status, _) = send(&ctx.app, "GET", "/v1/users", &ctx.member_token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&ctx.app, "GET", "/v1/users/stats", &ctx.member_token, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, listing) = send(&ctx.app, "GET", "/v1/users", &ctx.admin_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(listing["pagination"]["total"].as_i64().unwrap() >= 2);
    assert!(listing["data"][0]["passwordHash"].is_null());

    let (status, stats) = send(&ctx.app, "GET", "/v1/users/stats", &ctx.admin_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(stats["totalUsers"].as_i64().unwrap() >= 2);
    assert!(stats["recentRegistrations"].is_array());

    // Role filter narrows the listing
    let (_, admins) = send(
        &ctx.app,
        "GET",
        "/v1/users?role=Administrator",
        &ctx.admin_token,
        None,
    )
    .await;
    for user in admins["data"].as_array().unwrap() {
        assert!(user["roles"]
            .as_array()
            .unwrap()
            .iter()
            .any(|r| r == "Administrator"));
    }

    // Assignment listing is open to every authenticated caller
    let (status, assignable) = send(
        &ctx.app,
        "GET",
        "/v1/users/assignment",
        &ctx.member_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(assignable.as_array().unwrap().len() >= 2);

    // No token at all is a 401
    let (status, _) = send(&ctx.app, "GET", "/v1/resources", "", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await;
}
