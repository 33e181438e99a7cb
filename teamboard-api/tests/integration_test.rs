/// Integration tests for the Teamboard API
///
/// These drive the full router in-process over volatile storage:
/// - Registration, login and the bearer gate
/// - Profile updates and role gating
/// - Teams, tasks and their realtime announcements
/// - Direct messages and unread counts
/// - Boards, administration and health

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use common::{multipart_body, TestContext};
use serde_json::{json, Value};
use teamboard_shared::realtime::Room;
use tokio::sync::mpsc::UnboundedReceiver;

/// Parses the next frame queued for a test socket
fn next_frame(rx: &mut UnboundedReceiver<String>) -> Value {
    let raw = rx.try_recv().expect("expected a realtime frame");
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn test_register_then_login() {
    let ctx = TestContext::new();

    let body = ctx.register("alice@example.com", "pw123456").await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["name"], "alice");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("passwordHash").is_none());

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "pw123456" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["user"]["role"], "user");
    assert!(body["token"].as_str().unwrap().len() > 20);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let ctx = TestContext::new();
    ctx.register("alice@example.com", "pw123456").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": "pw123456" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_duplicate_email_is_rejected_case_insensitively() {
    let ctx = TestContext::new();
    ctx.register("alice@example.com", "pw123456").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "ALICE@example.com", "password": "other-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already registered");
    assert_eq!(body["code"], "email_taken");
}

#[tokio::test]
async fn test_register_requires_email_and_password() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "alice@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email and password are required");

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "pw123456" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_register_trims_and_lowercases_email() {
    let ctx = TestContext::new();

    let body = ctx.register(" Alice@Example.com ", "pw123456").await;
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["name"], "alice");

    let token = ctx.login("alice@example.com", "pw123456").await;
    assert!(!token.is_empty());

    let (_, admin_token) = ctx.seed_admin("root@example.com").await;
    let (status, user) = ctx
        .send(
            Method::POST,
            "/api/admin/users",
            Some(&admin_token),
            Some(json!({ "email": "  Carol@Example.COM", "password": "pw123456" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "carol@example.com");
}

#[tokio::test]
async fn test_admin_self_registration_is_gated() {
    let ctx = TestContext::new();
    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "root@example.com", "password": "pw123456", "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let ctx = TestContext::with_config(|c| c.allow_admin_registration = true);
    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "root@example.com", "password": "pw123456", "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["role"], "admin");
}

#[tokio::test]
async fn test_login_section_must_match_role() {
    let ctx = TestContext::new();
    ctx.register("alice@example.com", "pw123456").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "alice@example.com", "password": "pw123456", "userType": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "This account is registered as user. Please use the user login section."
    );

    // Admins may use either section
    ctx.seed_admin("root@example.com").await;
    let (status, _) = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "root@example.com", "password": "admin-pass", "userType": "user" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_gate_rejects_missing_and_tampered_tokens() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signup("alice@example.com").await;

    let (status, body) = ctx.send(Method::GET, "/api/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication token required.");

    let mut tampered = token.clone().into_bytes();
    let last = tampered.len() - 1;
    tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(tampered).unwrap();

    let (status, body) = ctx
        .send(Method::GET, "/api/users/me", Some(&tampered), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token.");

    let (status, body) = ctx.send(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["isActive"], true);
    assert!(body["lastLogin"].is_string());
}

#[tokio::test]
async fn test_token_of_deleted_user_is_rejected() {
    let ctx = TestContext::new();
    let (id, token) = ctx.signup("alice@example.com").await;
    let (_, admin_token) = ctx.seed_admin("root@example.com").await;

    let (status, _) = ctx
        .send(
            Method::DELETE,
            &format!("/api/admin/users/{}", id),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx.send(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "User not found.");
}

#[tokio::test]
async fn test_non_admin_cannot_promote_self() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signup("alice@example.com").await;

    let (status, body) = ctx
        .send(
            Method::PATCH,
            "/api/users/me",
            Some(&token),
            Some(json!({ "name": "  Alice A. ", "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "user");
    assert_eq!(body["user"]["name"], "Alice A.");
    assert!(body["token"].is_string());

    let (_, me) = ctx.send(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(me["role"], "user");
}

#[tokio::test]
async fn test_admin_can_change_own_role() {
    let ctx = TestContext::new();
    let (_, token) = ctx.seed_admin("root@example.com").await;

    let (status, body) = ctx
        .send(
            Method::PATCH,
            "/api/users/me",
            Some(&token),
            Some(json!({ "role": "user" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["role"], "user");
}

#[tokio::test]
async fn test_change_password() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signup("alice@example.com").await;

    let (status, body) = ctx
        .send(
            Method::PATCH,
            "/api/users/me/password",
            Some(&token),
            Some(json!({ "currentPassword": "pw123456", "newPassword": "123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "New password must be at least 6 characters long.");

    let (status, body) = ctx
        .send(
            Method::PATCH,
            "/api/users/me/password",
            Some(&token),
            Some(json!({ "currentPassword": "wrong-one", "newPassword": "fresh-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Incorrect current password.");

    let (status, body) = ctx
        .send(
            Method::PATCH,
            "/api/users/me/password",
            Some(&token),
            Some(json!({ "currentPassword": "pw123456", "newPassword": "fresh-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password changed successfully.");

    ctx.login("alice@example.com", "fresh-pass").await;
}

#[tokio::test]
async fn test_reset_password() {
    let ctx = TestContext::new();
    ctx.register("alice@example.com", "pw123456").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/reset-password",
            None,
            Some(json!({ "email": "ghost@example.com", "password": "whatever" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found.");

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/auth/reset-password",
            None,
            Some(json!({ "email": "alice@example.com", "password": "reset-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password has been reset successfully.");

    ctx.login("alice@example.com", "reset-pass").await;
}

#[tokio::test]
async fn test_team_create_and_join() {
    let ctx = TestContext::new();
    let (owner_id, owner_token) = ctx.signup("owner@example.com").await;
    let (member_id, member_token) = ctx.signup("member@example.com").await;

    let (socket, mut rx) = ctx.state.hub.connect().await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/teams",
            Some(&owner_token),
            Some(json!({ "name": " Eng ", "settings": { "maxMembers": 10 } })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let team = &body["team"];
    let team_id = team["id"].as_str().unwrap().to_string();
    assert!(team_id.starts_with("team_"));
    assert_eq!(team["name"], "Eng");
    assert_eq!(team["members"].as_array().unwrap().len(), 1);
    assert_eq!(team["members"][0]["userId"], owner_id.as_str());
    assert_eq!(team["members"][0]["role"], "owner");
    assert_eq!(team["settings"]["visibility"], "public");

    let frame = next_frame(&mut rx);
    assert_eq!(frame["event"], "team:created");
    assert_eq!(frame["data"]["id"], team_id.as_str());

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/teams/{}/join", team_id),
            Some(&member_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let members = body["team"]["members"].as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[1]["userId"], member_id.as_str());
    assert_eq!(members[1]["role"], "member");
    assert_eq!(next_frame(&mut rx)["event"], "team:updated");

    // Joining again changes nothing and broadcasts nothing
    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/teams/{}/join", team_id),
            Some(&member_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Already a member of this team");
    assert_eq!(body["team"]["members"].as_array().unwrap().len(), 2);
    assert!(rx.try_recv().is_err());

    let (_, mine) = ctx
        .send(Method::GET, "/api/teams/mine", Some(&member_token), None)
        .await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    ctx.state.hub.disconnect(socket).await;
}

#[tokio::test]
async fn test_team_validation_and_capacity() {
    let ctx = TestContext::new();
    let (_, owner_token) = ctx.signup("owner@example.com").await;
    let (_, other_token) = ctx.signup("other@example.com").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/teams",
            Some(&owner_token),
            Some(json!({ "name": "   " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Team name is required");

    let (_, body) = ctx
        .send(
            Method::POST,
            "/api/teams",
            Some(&owner_token),
            Some(json!({ "name": "Solo", "settings": { "maxMembers": 1 } })),
        )
        .await;
    let team_id = body["team"]["id"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/teams/{}/join", team_id),
            Some(&other_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "team_full");

    let (status, body) = ctx
        .send(Method::POST, "/api/teams/team_missing/join", Some(&other_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Team not found");
}

#[tokio::test]
async fn test_task_writes_are_announced_to_team_board() {
    let ctx = TestContext::new();
    let (user_id, token) = ctx.signup("alice@example.com").await;

    let (socket, mut rx) = ctx.state.hub.connect().await;
    ctx.state
        .hub
        .subscribe(socket, &Room::team_board("team_T"))
        .await;

    let (status, task) = ctx
        .send(
            Method::POST,
            "/api/tasks/team/team_T",
            Some(&token),
            Some(json!({ "title": "Ship it", "assignedTo": user_id, "priority": "high" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = task["id"].as_str().unwrap().to_string();
    assert_eq!(task["teamId"], "team_T");
    assert_eq!(task["status"], "todo");
    assert_eq!(task["priority"], "high");
    assert_eq!(task["assignedTo"], json!([user_id]));
    assert_eq!(task["createdBy"], user_id.as_str());

    let frame = next_frame(&mut rx);
    assert_eq!(frame["event"], "teamBoard:update");
    assert_eq!(frame["data"]["task"]["id"], task_id.as_str());

    let (status, task) = ctx
        .send(
            Method::PUT,
            &format!("/api/tasks/{}", task_id),
            Some(&token),
            Some(json!({ "status": "in-progress" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["status"], "in-progress");
    assert_eq!(task["title"], "Ship it");
    assert_eq!(next_frame(&mut rx)["data"]["task"]["status"], "in-progress");

    let (status, task) = ctx
        .send(
            Method::POST,
            &format!("/api/tasks/{}/comments", task_id),
            Some(&token),
            Some(json!({ "text": "on it" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["comments"][0]["text"], "on it");
    assert_eq!(task["comments"][0]["authorId"], user_id.as_str());
    next_frame(&mut rx);

    let (_, listed) = ctx
        .send(Method::GET, "/api/tasks/team/team_T", Some(&token), None)
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, body) = ctx
        .send(Method::DELETE, &format!("/api/tasks/{}", task_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(next_frame(&mut rx)["data"]["deletedTaskId"], task_id.as_str());
}

#[tokio::test]
async fn test_task_due_date_can_be_cleared() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signup("alice@example.com").await;

    let (_, task) = ctx
        .send(
            Method::POST,
            "/api/tasks/team/team_T",
            Some(&token),
            Some(json!({ "title": "Plan", "dueDate": "2025-06-01" })),
        )
        .await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());
    assert_eq!(task["dueDate"], "2025-06-01");

    let (_, task) = ctx
        .send(Method::PUT, &uri, Some(&token), Some(json!({ "title": "Plan v2" })))
        .await;
    assert_eq!(task["dueDate"], "2025-06-01");

    let (status, task) = ctx
        .send(Method::PUT, &uri, Some(&token), Some(json!({ "dueDate": null })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(task["dueDate"].is_null());
    assert_eq!(task["title"], "Plan v2");
}

#[tokio::test]
async fn test_task_id_checks() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signup("alice@example.com").await;

    let (status, body) = ctx
        .send(
            Method::PUT,
            "/api/tasks/undefined",
            Some(&token),
            Some(json!({ "title": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid task ID");

    let (status, body) = ctx
        .send(
            Method::PUT,
            "/api/tasks/no-such-task",
            Some(&token),
            Some(json!({ "title": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Task not found");

    let (status, _) = ctx
        .send(Method::DELETE, "/api/tasks/no-such-task", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unread_counts_drop_to_zero_after_read() {
    let ctx = TestContext::new();
    let (alice_id, alice_token) = ctx.signup("alice@example.com").await;
    let (bob_id, bob_token) = ctx.signup("bob@example.com").await;

    let (socket, mut rx) = ctx.state.hub.connect().await;
    ctx.state
        .hub
        .handle_client_message(socket, &json!({ "event": "register", "data": bob_id }).to_string())
        .await
        .unwrap();

    for text in ["hi", "are you there?", "ping"] {
        let (status, msg) = ctx
            .send(
                Method::POST,
                &format!("/api/messages/{}", bob_id),
                Some(&alice_token),
                Some(json!({ "body": text })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(msg["from"], alice_id.as_str());

        let frame = next_frame(&mut rx);
        assert_eq!(frame["event"], "msg:new");
        assert_eq!(frame["data"]["id"], msg["id"]);
    }

    let (_, counts) = ctx
        .send(Method::GET, "/api/messages/unread/counts", Some(&bob_token), None)
        .await;
    assert_eq!(counts[&alice_id], 3);

    let (_, conversation) = ctx
        .send(Method::GET, &format!("/api/messages/{}", alice_id), Some(&bob_token), None)
        .await;
    let bodies: Vec<&str> = conversation
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["body"].as_str().unwrap())
        .collect();
    assert_eq!(bodies, vec!["hi", "are you there?", "ping"]);

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/messages/{}/read", alice_id),
            Some(&bob_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    let (_, counts) = ctx
        .send(Method::GET, "/api/messages/unread/counts", Some(&bob_token), None)
        .await;
    assert!(counts.get(&alice_id).map_or(true, |c| c == 0));
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signup("alice@example.com").await;

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/messages/someone",
            Some(&token),
            Some(json!({ "body": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message body required");
}

#[tokio::test]
async fn test_board_access_rules() {
    let ctx = TestContext::new();
    let (owner_id, owner_token) = ctx.signup("owner@example.com").await;
    let (_, other_token) = ctx.signup("other@example.com").await;

    let (status, board) = ctx
        .send(Method::POST, "/api/boards", Some(&owner_token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(board["title"], "Untitled Board");
    assert_eq!(board["data"], json!({}));
    assert_eq!(board["owner"], owner_id.as_str());
    let board_id = board["id"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .send(Method::GET, &format!("/api/boards/{}", board_id), Some(&other_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");

    let (status, body) = ctx
        .send(Method::GET, "/api/boards/missing", Some(&owner_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not found");

    let (socket, mut rx) = ctx.state.hub.connect().await;
    ctx.state
        .hub
        .subscribe(socket, &Room::team_board(&board_id))
        .await;

    let (status, board) = ctx
        .send(
            Method::PUT,
            &format!("/api/boards/{}", board_id),
            Some(&owner_token),
            Some(json!({ "data": { "columns": 3 } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["title"], "Untitled Board");
    assert_eq!(board["data"]["columns"], 3);

    let frame = next_frame(&mut rx);
    assert_eq!(frame["event"], "teamBoard:update");
    assert_eq!(frame["data"]["id"], board_id.as_str());
    assert_eq!(frame["data"]["data"]["columns"], 3);

    let (_, boards) = ctx.send(Method::GET, "/api/boards", Some(&other_token), None).await;
    assert!(boards.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_board_sharing_needs_persistent_storage() {
    let ctx = TestContext::new();
    let (_, owner_token) = ctx.signup("owner@example.com").await;
    ctx.signup("other@example.com").await;

    let (_, board) = ctx
        .send(
            Method::POST,
            "/api/boards",
            Some(&owner_token),
            Some(json!({ "title": "Plan" })),
        )
        .await;

    let (status, body) = ctx
        .send(
            Method::POST,
            &format!("/api/boards/{}/share", board["id"].as_str().unwrap()),
            Some(&owner_token),
            Some(json!({ "email": "other@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error"], "Sharing is not implemented for in-memory mode.");
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signup("alice@example.com").await;

    let (status, body) = ctx.send(Method::GET, "/api/admin/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Access denied. Admin privileges required.");

    let (status, _) = ctx.send(Method::GET, "/api/admin/stats", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_user_management() {
    let ctx = TestContext::new();
    let (admin, token) = ctx.seed_admin("root@example.com").await;
    ctx.signup("alice@example.com").await;

    let (status, created) = ctx
        .send(
            Method::POST,
            "/api/admin/users/new",
            Some(&token),
            Some(json!({ "email": "bob@example.com", "password": "bob-pass", "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role"], "admin");
    assert_eq!(created["name"], "bob");
    let bob_id = created["id"].as_str().unwrap().to_string();

    let (status, body) = ctx
        .send(
            Method::POST,
            "/api/admin/users",
            Some(&token),
            Some(json!({ "email": "bob@example.com", "password": "bob-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already registered");

    let (_, users) = ctx.send(Method::GET, "/api/admin/users", Some(&token), None).await;
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 3);
    assert_eq!(users[0]["email"], "bob@example.com");
    assert!(users.iter().all(|u| u.get("passwordHash").is_none()));

    let (status, updated) = ctx
        .send(
            Method::PATCH,
            &format!("/api/admin/users/{}", bob_id),
            Some(&token),
            Some(json!({ "isActive": false, "role": "user" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["isActive"], false);
    assert_eq!(updated["role"], "user");

    let (_, stats) = ctx.send(Method::GET, "/api/admin/stats", Some(&token), None).await;
    assert_eq!(stats["totalUsers"], 3);
    assert_eq!(stats["activeUsers"], 2);
    assert_eq!(stats["inactiveUsers"], 1);
    assert_eq!(stats["adminUsers"], 1);
    assert_eq!(stats["regularUsers"], 2);
    assert!(stats["lastUpdated"].is_string());

    let (status, body) = ctx
        .send(
            Method::DELETE,
            &format!("/api/admin/users/{}", admin.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot delete your own account");

    let (status, body) = ctx
        .send(
            Method::DELETE,
            &format!("/api/admin/users/{}", bob_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted successfully");

    let (status, body) = ctx
        .send(
            Method::GET,
            &format!("/api/admin/users/{}", bob_id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn test_avatar_upload_is_stored_and_served() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signup("alice@example.com").await;

    let (content_type, body) = multipart_body("avatar", "me.png", "image/png", b"\x89PNG fake image");
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/users/me/avatar")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();

    let (status, body) = ctx.dispatch(request).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["ok"], true);

    let url = body["user"]["avatarUrl"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/avatar-"));
    assert!(url.ends_with(".png"));
    assert!(body["token"].is_string());

    let file_name = url.trim_start_matches("/uploads/");
    assert!(ctx.upload_dir.join(file_name).exists());

    let response = tower::ServiceExt::oneshot(
        ctx.app.clone(),
        Request::builder().uri(&url).body(Body::empty()).unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_upload_without_file_field() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signup("alice@example.com").await;

    let (content_type, body) = multipart_body("something", "x.txt", "text/plain", b"hello");
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/users/me/avatar")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();

    let (status, body) = ctx.dispatch(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file uploaded.");
}

#[tokio::test]
async fn test_task_attachment() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signup("alice@example.com").await;

    let (_, task) = ctx
        .send(
            Method::POST,
            "/api/tasks/team/team_T",
            Some(&token),
            Some(json!({ "title": "Read the doc" })),
        )
        .await;
    let task_id = task["id"].as_str().unwrap();

    let (content_type, body) = multipart_body("file", "notes.txt", "text/plain", b"some notes");
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/tasks/{}/attachments", task_id))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();

    let (status, task) = ctx.dispatch(request).await;
    assert_eq!(status, StatusCode::CREATED, "{}", task);
    let attachment = &task["attachments"][0];
    assert_eq!(attachment["name"], "notes.txt");
    assert_eq!(attachment["type"], "text/plain");
    assert_eq!(attachment["size"], 10);
    assert!(attachment["url"].as_str().unwrap().starts_with("/uploads/attachment-"));
}

#[tokio::test]
async fn test_user_directory() {
    let ctx = TestContext::new();
    let (_, token) = ctx.signup("alice@example.com").await;
    ctx.signup("bob@example.com").await;

    let (status, users) = ctx.send(Method::GET, "/api/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u["id"].is_string() && u.get("passwordHash").is_none()));
}

#[tokio::test]
async fn test_health_reports_volatile_backing() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["mongo"], false);
    assert_eq!(body["storage"], "volatile");
}

#[tokio::test]
async fn test_security_headers_are_set() {
    let ctx = TestContext::new();

    let response = tower::ServiceExt::oneshot(
        ctx.app.clone(),
        Request::builder().uri("/api/health").body(Body::empty()).unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(response.headers().get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_websocket_register_receives_direct_messages() {
    use futures::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    let ctx = TestContext::new();
    let (_, alice_token) = ctx.signup("alice@example.com").await;
    let (bob_id, _) = ctx.signup("bob@example.com").await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = ctx.app.clone();
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .unwrap();
    ws.send(Message::Text(
        json!({ "event": "register", "data": bob_id }).to_string(),
    ))
    .await
    .unwrap();

    // The register frame is handled on the server task; wait until the room has a member.
    let bob_room = Room::user(&bob_id);
    let mut joined = false;
    for _ in 0..100 {
        if ctx.state.hub.publish(&bob_room, "ready", json!({})).await > 0 {
            joined = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(joined, "socket never joined the user room");

    let (status, msg) = ctx
        .send(
            Method::POST,
            &format!("/api/messages/{}", bob_id),
            Some(&alice_token),
            Some(json!({ "body": "over the wire" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let frame = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    let frame: Value = serde_json::from_str(&text).unwrap();
                    if frame["event"] == "msg:new" {
                        return frame;
                    }
                }
                Some(Ok(_)) => {}
                other => panic!("socket closed before msg:new: {:?}", other),
            }
        }
    })
    .await
    .expect("timed out waiting for msg:new");

    assert_eq!(frame["data"]["id"], msg["id"]);
    assert_eq!(frame["data"]["body"], "over the wire");

    let _ = ws.close(None).await;
    server.abort();
}
