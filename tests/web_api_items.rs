//! Web API Item Tests
//!
//! Integration tests for users, item CRUD, move, upload and accesses.

mod common;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use common::{authorized, TestApp};
use drive::item::{ItemAccessRepository, LinkReach, LinkRole, NewItem, Role, UploadState};
use serde_json::{json, Value};

fn item_url(id: &str) -> String {
    format!("/api/v1.0/items/{id}/")
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_me_provisions_user() {
    let app = TestApp::new().await;
    let token = app
        .state
        .generate_access_token("new-user", Some("new@example.com"), Some("New User"), &[])
        .unwrap();

    let response = authorized(app.server.get("/api/v1.0/users/me/"), &token).await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({"id": "new-user", "email": "new@example.com", "full_name": "New User"})
    );
}

#[tokio::test]
async fn test_me_anonymous() {
    let app = TestApp::new().await;

    let response = app.server.get("/api/v1.0/users/me/").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_token() {
    let app = TestApp::new().await;

    let response = authorized(app.server.get("/api/v1.0/users/me/"), "not-a-token").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.json::<Value>()["errors"][0]["code"],
        "authentication_failed"
    );
}

// ============================================================================
// Item CRUD
// ============================================================================

#[tokio::test]
async fn test_create_root_and_list() {
    let app = TestApp::new().await;
    let user = app.create_user("user").await;
    let token = app.token(&user);

    let created = authorized(app.server.post("/api/v1.0/items/"), &token)
        .json(&json!({"title": "Projects"}))
        .await;
    created.assert_status(StatusCode::CREATED);
    let body: Value = created.json();
    assert_eq!(body["type"], "folder");
    assert_eq!(body["user_role"], "owner");
    assert_eq!(body["abilities"]["destroy"], true);
    assert_eq!(body["abilities"]["accesses_manage"], true);
    assert!(body["parent_id"].is_null());

    let list = authorized(app.server.get("/api/v1.0/items/"), &token).await;
    list.assert_status_ok();
    let list: Value = list.json();
    assert_eq!(list["count"], 1);
    assert_eq!(list["results"][0]["title"], "Projects");

    assert_eq!(app.event_names(), vec!["item_created"]);
}

#[tokio::test]
async fn test_create_root_blank_title() {
    let app = TestApp::new().await;
    let user = app.create_user("user").await;

    let response = authorized(app.server.post("/api/v1.0/items/"), &app.token(&user))
        .json(&json!({"title": "   "}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["errors"][0]["code"], "blank");
}

#[tokio::test]
async fn test_create_root_malformed_json() {
    let app = TestApp::new().await;
    let user = app.create_user("user").await;

    let response = authorized(app.server.post("/api/v1.0/items/"), &app.token(&user))
        .text("{not json")
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["errors"][0]["code"], "parse_error");
}

#[tokio::test]
async fn test_list_items_team_access() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let member = app.create_user("member").await;
    let shared = app.create_root(&owner, "Shared").await;
    app.create_root(&owner, "Private").await;
    app.grant_team(&shared, "ops", Role::Reader).await;

    let response = authorized(
        app.server.get("/api/v1.0/items/"),
        &app.token_with_teams(&member, &["ops"]),
    )
    .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["title"], "Shared");
    assert_eq!(body["results"][0]["user_role"], "reader");
}

#[tokio::test]
async fn test_empty_team_claim_grants_nothing() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let stranger = app.create_user("stranger").await;
    let root = app.create_root(&owner, "Workspace").await;
    let token = app.token_with_teams(&stranger, &["", " "]);

    let list = authorized(app.server.get("/api/v1.0/items/"), &token).await;
    list.assert_status_ok();
    assert_eq!(list.json::<Value>()["count"], 0);

    authorized(app.server.get(&item_url(&root.id)), &token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    authorized(app.server.delete(&item_url(&root.id)), &token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    assert!(app.reload(&root.id).await.is_some());
}

#[tokio::test]
async fn test_retrieve_item_abilities() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let reader = app.create_user("reader").await;
    let root = app.create_root(&owner, "Workspace").await;
    app.grant_user(&root, &reader, Role::Reader).await;

    let response = authorized(app.server.get(&item_url(&root.id)), &app.token(&reader)).await;

    response.assert_status_ok();
    let abilities = &response.json::<Value>()["abilities"];
    assert_eq!(abilities["retrieve"], true);
    assert_eq!(abilities["children_list"], true);
    assert_eq!(abilities["accesses_view"], true);
    assert_eq!(abilities["update"], false);
    assert_eq!(abilities["children_create"], false);
    assert_eq!(abilities["move"], false);
    assert_eq!(abilities["destroy"], false);
    assert_eq!(abilities["favorite"], true);
}

#[tokio::test]
async fn test_retrieve_public_item_anonymous() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let root = app
        .create_item(
            NewItem::folder("Public")
                .with_creator(&owner.id)
                .with_link_reach(LinkReach::Public),
        )
        .await;

    let response = app.server.get(&item_url(&root.id)).await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(body["user_role"].is_null());
    assert_eq!(body["is_favorite"], false);
    assert_eq!(body["abilities"]["favorite"], false);
    assert_eq!(body["abilities"]["update"], false);
}

#[tokio::test]
async fn test_retrieve_restricted_item() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let other = app.create_user("other").await;
    let root = app.create_root(&owner, "Workspace").await;

    app.server
        .get(&item_url(&root.id))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    authorized(app.server.get(&item_url(&root.id)), &app.token(&other))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_link_settings_requires_admin() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let editor = app.create_user("editor").await;
    let root = app.create_root(&owner, "Workspace").await;
    app.grant_user(&root, &editor, Role::Editor).await;

    authorized(app.server.patch(&item_url(&root.id)), &app.token(&editor))
        .json(&json!({"link_reach": "public"}))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let response = authorized(app.server.patch(&item_url(&root.id)), &app.token(&owner))
        .json(&json!({"link_reach": "public", "link_role": "editor"}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["link_reach"], "public");
    assert_eq!(body["link_role"], "editor");

    let item = app.reload(&root.id).await.unwrap();
    assert_eq!(item.link_reach, LinkReach::Public);
    assert_eq!(item.link_role, LinkRole::Editor);
}

#[tokio::test]
async fn test_rename_deduplicates() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let root = app.create_root(&owner, "Workspace").await;
    app.create_item(
        NewItem::folder("Taken")
            .with_parent(&root.id)
            .with_creator(&owner.id),
    )
    .await;
    let folder = app
        .create_item(
            NewItem::folder("Draft")
                .with_parent(&root.id)
                .with_creator(&owner.id),
        )
        .await;

    let response = authorized(app.server.patch(&item_url(&folder.id)), &app.token(&owner))
        .json(&json!({"title": "Taken"}))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["title"], "Taken_01");
}

#[tokio::test]
async fn test_delete_item_cascades() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let editor = app.create_user("editor").await;
    let root = app.create_root(&owner, "Workspace").await;
    app.grant_user(&root, &editor, Role::Editor).await;
    let child = app
        .create_item(
            NewItem::folder("Child")
                .with_parent(&root.id)
                .with_creator(&owner.id),
        )
        .await;

    authorized(app.server.delete(&item_url(&root.id)), &app.token(&editor))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    authorized(app.server.delete(&item_url(&root.id)), &app.token(&owner))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    assert!(app.reload(&root.id).await.is_none());
    assert!(app.reload(&child.id).await.is_none());
}

// ============================================================================
// Move
// ============================================================================

#[tokio::test]
async fn test_move_item() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let root = app.create_root(&owner, "Workspace").await;
    let source = app
        .create_item(NewItem::folder("A").with_parent(&root.id).with_creator(&owner.id))
        .await;
    let target = app
        .create_item(NewItem::folder("B").with_parent(&root.id).with_creator(&owner.id))
        .await;

    let response = authorized(
        app.server.post(&format!("/api/v1.0/items/{}/move/", source.id)),
        &app.token(&owner),
    )
    .json(&json!({"target_item_id": target.id}))
    .await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({"message": "item moved successfully."})
    );
    let moved = app.reload(&source.id).await.unwrap();
    assert_eq!(moved.parent_id.as_deref(), Some(target.id.as_str()));
}

#[tokio::test]
async fn test_move_into_descendant() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let root = app.create_root(&owner, "Workspace").await;
    let parent = app
        .create_item(NewItem::folder("A").with_parent(&root.id).with_creator(&owner.id))
        .await;
    let child = app
        .create_item(NewItem::folder("B").with_parent(&parent.id).with_creator(&owner.id))
        .await;

    let response = authorized(
        app.server.post(&format!("/api/v1.0/items/{}/move/", parent.id)),
        &app.token(&owner),
    )
    .json(&json!({"target_item_id": child.id}))
    .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        app.reload(&parent.id).await.unwrap().parent_id.as_deref(),
        Some(root.id.as_str())
    );
}

#[tokio::test]
async fn test_move_unknown_target() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let root = app.create_root(&owner, "Workspace").await;
    let source = app
        .create_item(NewItem::folder("A").with_parent(&root.id).with_creator(&owner.id))
        .await;

    let response = authorized(
        app.server.post(&format!("/api/v1.0/items/{}/move/", source.id)),
        &app.token(&owner),
    )
    .json(&json!({"target_item_id": "missing"}))
    .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["errors"][0]["attr"],
        "target_item_id"
    );
}

#[tokio::test]
async fn test_move_target_without_rights() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let stranger = app.create_user("stranger").await;
    let root = app.create_root(&owner, "Workspace").await;
    let source = app
        .create_item(NewItem::folder("A").with_parent(&root.id).with_creator(&owner.id))
        .await;
    let foreign = app.create_root(&stranger, "Foreign").await;

    authorized(
        app.server.post(&format!("/api/v1.0/items/{}/move/", source.id)),
        &app.token(&owner),
    )
    .json(&json!({"target_item_id": foreign.id}))
    .await
    .assert_status(StatusCode::FORBIDDEN);
}

// ============================================================================
// Upload
// ============================================================================

async fn create_pending(app: &TestApp, token: &str, parent_id: &str) -> String {
    let response = authorized(
        app.server
            .post(&format!("/api/v1.0/items/{parent_id}/children/")),
        token,
    )
    .json(&json!({"filename": "notes.txt"}))
    .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["id"].as_str().unwrap().to_string()
}

fn upload_form(content: &'static [u8]) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(content)
            .file_name("notes.txt")
            .mime_type("text/plain"),
    )
}

#[tokio::test]
async fn test_upload_content() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let root = app.create_root(&owner, "Workspace").await;
    let token = app.token(&owner);
    let id = create_pending(&app, &token, &root.id).await;

    let response = authorized(
        app.server.post(&format!("/api/v1.0/items/{id}/upload/")),
        &token,
    )
    .multipart(upload_form(b"some notes"))
    .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["upload_state"], "ready");
    assert_eq!(body["size"], 10);
    assert_eq!(body["mimetype"], "text/plain");
    assert_eq!(body["abilities"]["upload"], false);
    assert!(body["url"].as_str().unwrap().ends_with("/notes.txt"));

    let item = app.reload(&id).await.unwrap();
    assert_eq!(item.upload_state, Some(UploadState::Ready));
    assert_eq!(
        app.state.storage.load(&item.file_key().unwrap()).unwrap(),
        b"some notes"
    );
}

#[tokio::test]
async fn test_upload_twice_forbidden() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let root = app.create_root(&owner, "Workspace").await;
    let token = app.token(&owner);
    let id = create_pending(&app, &token, &root.id).await;
    let url = format!("/api/v1.0/items/{id}/upload/");

    authorized(app.server.post(&url), &token)
        .multipart(upload_form(b"first"))
        .await
        .assert_status_ok();
    authorized(app.server.post(&url), &token)
        .multipart(upload_form(b"second"))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_upload_by_other_editor_forbidden() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let editor = app.create_user("editor").await;
    let root = app.create_root(&owner, "Workspace").await;
    app.grant_user(&root, &editor, Role::Editor).await;
    let id = create_pending(&app, &app.token(&owner), &root.id).await;

    authorized(
        app.server.post(&format!("/api/v1.0/items/{id}/upload/")),
        &app.token(&editor),
    )
    .multipart(upload_form(b"content"))
    .await
    .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_upload_too_large() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let root = app.create_root(&owner, "Workspace").await;
    let token = app.token(&owner);
    let id = create_pending(&app, &token, &root.id).await;

    static BIG: [u8; 2048] = [b'x'; 2048];
    let response = authorized(
        app.server.post(&format!("/api/v1.0/items/{id}/upload/")),
        &token,
    )
    .multipart(upload_form(&BIG))
    .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["errors"][0]["code"],
        "file_too_large"
    );
    let item = app.reload(&id).await.unwrap();
    assert_eq!(item.upload_state, Some(UploadState::Pending));
}

// ============================================================================
// Accesses
// ============================================================================

#[tokio::test]
async fn test_access_lifecycle() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let colleague = app.create_user("colleague").await;
    let root = app.create_root(&owner, "Workspace").await;
    let token = app.token(&owner);
    let url = format!("/api/v1.0/items/{}/accesses/", root.id);

    let created = authorized(app.server.post(&url), &token)
        .json(&json!({"user_id": colleague.id, "role": "reader"}))
        .await;
    created.assert_status(StatusCode::CREATED);
    let access: Value = created.json();
    assert_eq!(access["role"], "reader");
    assert_eq!(access["item"], root.id.as_str());
    let access_id = access["id"].as_str().unwrap().to_string();

    let duplicate = authorized(app.server.post(&url), &token)
        .json(&json!({"user_id": colleague.id, "role": "editor"}))
        .await;
    duplicate.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.json::<Value>()["errors"][0]["code"], "unique");

    let updated = authorized(app.server.patch(&format!("{url}{access_id}/")), &token)
        .json(&json!({"role": "admin"}))
        .await;
    updated.assert_status_ok();
    assert_eq!(updated.json::<Value>()["role"], "administrator");

    let list = authorized(app.server.get(&url), &app.token(&colleague)).await;
    list.assert_status_ok();
    assert_eq!(list.json::<Value>()["count"], 2);

    authorized(app.server.delete(&format!("{url}{access_id}/")), &token)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    authorized(app.server.get(&url), &app.token(&colleague))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_access_team_grant() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let root = app.create_root(&owner, "Workspace").await;

    let response = authorized(
        app.server
            .post(&format!("/api/v1.0/items/{}/accesses/", root.id)),
        &app.token(&owner),
    )
    .json(&json!({"team": "marketing", "role": "editor"}))
    .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["team"], "marketing");
    assert!(body["user_id"].is_null());
}

#[tokio::test]
async fn test_access_unknown_user() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let root = app.create_root(&owner, "Workspace").await;

    let response = authorized(
        app.server
            .post(&format!("/api/v1.0/items/{}/accesses/", root.id)),
        &app.token(&owner),
    )
    .json(&json!({"user_id": "ghost", "role": "reader"}))
    .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["errors"][0]["code"],
        "does_not_exist"
    );
}

#[tokio::test]
async fn test_access_admin_cannot_grant_owner() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let admin = app.create_user("admin").await;
    let colleague = app.create_user("colleague").await;
    let root = app.create_root(&owner, "Workspace").await;
    app.grant_user(&root, &admin, Role::Administrator).await;
    let url = format!("/api/v1.0/items/{}/accesses/", root.id);

    authorized(app.server.post(&url), &app.token(&admin))
        .json(&json!({"user_id": colleague.id, "role": "owner"}))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    authorized(app.server.post(&url), &app.token(&admin))
        .json(&json!({"user_id": colleague.id, "role": "editor"}))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_access_last_owner_protected() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let root = app.create_root(&owner, "Workspace").await;
    let token = app.token(&owner);

    let access = ItemAccessRepository::new(app.db.pool())
        .find_for_grantee(&root.id, Some(owner.id.as_str()), "")
        .await
        .unwrap()
        .unwrap();
    let url = format!("/api/v1.0/items/{}/accesses/{}/", root.id, access.id);

    let response = authorized(app.server.delete(&url), &token).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["errors"][0]["code"], "last_owner");

    authorized(app.server.patch(&url), &token)
        .json(&json!({"role": "editor"}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_access_invalid_role() {
    let app = TestApp::new().await;
    let owner = app.create_user("owner").await;
    let colleague = app.create_user("colleague").await;
    let root = app.create_root(&owner, "Workspace").await;

    let response = authorized(
        app.server
            .post(&format!("/api/v1.0/items/{}/accesses/", root.id)),
        &app.token(&owner),
    )
    .json(&json!({"user_id": colleague.id, "role": "superuser"}))
    .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["errors"][0]["attr"], "role");
    assert_eq!(body["errors"][0]["code"], "invalid_choice");
}
