use axum::http::{Method, StatusCode};
use domains::HistoryAction;
use integration_tests::*;
use serde_json::{json, Value};

async fn patch(app: &TestApp, uri: &str, body: Value) -> TestResponse {
    app.json(Method::PATCH, uri, body, true).await
}

fn fields_of(body: &Value) -> Vec<String> {
    body["details"]
        .as_array()
        .map(|d| d.iter().filter_map(|e| e["field"].as_str().map(String::from)).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn create_writes_exactly_one_ledger_entry() {
    let app = TestApp::spawn().await;
    let photo = app
        .create_photo(&[("title", "Sunset"), ("descriptionMd", "desc"), ("tags", "sea,sky")])
        .await;

    assert_eq!(photo["alt"], "Sunset");
    assert_eq!(photo["createdBy"]["username"], ADMIN_USERNAME);
    assert!(photo["imageUrl"].as_str().unwrap().starts_with("/uploads/photos/photo_"));

    let entries = app.history.all();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, HistoryAction::Create);
    assert_eq!(entries[0].payload["title"], "Sunset");
    assert_eq!(entries[0].payload["isVisible"], false);
    assert_eq!(entries[0].payload["tags"], json!(["sea", "sky"]));
}

#[tokio::test]
async fn metadata_field_fills_gaps_but_loses_to_form_fields() {
    let app = TestApp::spawn().await;
    let photo = app
        .create_photo(&[
            ("title", "From the form"),
            (
                "metadata",
                r#"{"title":"From metadata","descriptionMd":"md body","featured":"yes","order":3}"#,
            ),
        ])
        .await;

    assert_eq!(photo["title"], "From the form");
    assert_eq!(photo["descriptionMd"], "md body");
    assert_eq!(photo["featured"], true);
    assert_eq!(photo["order"], 3);
}

#[tokio::test]
async fn create_reports_every_problem_at_once() {
    let app = TestApp::spawn().await;
    let res = app
        .json(Method::POST, "/api/photos", json!({ "tags": "a" }), true)
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let fields = fields_of(&res.body);
    assert!(fields.contains(&"title".to_string()), "{fields:?}");
    assert!(fields.contains(&"image".to_string()), "{fields:?}");
    assert!(app.history.all().is_empty());
}

#[tokio::test]
async fn update_records_a_diff() {
    let app = TestApp::spawn().await;
    let id = app.create_public_photo("Old title", &[]).await;

    let res = app
        .json(
            Method::PUT,
            &format!("/api/photos/{id}"),
            json!({ "title": "New title", "location": "Lisbon" }),
            true,
        )
        .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["title"], "New title");
    assert_eq!(res.body["location"], "Lisbon");

    let latest = &app.history.all()[0];
    assert_eq!(latest.action, HistoryAction::Update);
    assert_eq!(
        latest.payload["changes"]["title"],
        json!({ "from": "Old title", "to": "New title" })
    );
    assert_eq!(latest.payload["changes"]["location"]["to"], "Lisbon");
}

#[tokio::test]
async fn empty_diff_update_is_silent() {
    let app = TestApp::spawn().await;
    let id = app.create_public_photo("Same", &[]).await;
    let before = app.stored(&id).await;

    let res = app
        .json(Method::PUT, &format!("/api/photos/{id}"), json!({ "title": "Same" }), true)
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["updatedAt"], serde_json::to_value(before.updated_at).unwrap());
    assert_eq!(app.history.all().len(), 1);
}

#[tokio::test]
async fn update_of_unknown_photo_is_404() {
    let app = TestApp::spawn().await;
    for id in ["0190a1b2-0000-7000-8000-000000000000", "garbage"] {
        let res = app
            .json(Method::PUT, &format!("/api/photos/{id}"), json!({ "title": "x" }), true)
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn featured_toggle_assigns_and_resets_order() {
    let app = TestApp::spawn().await;
    let id = app.create_public_photo("Feature me", &[]).await;
    let uri = format!("/api/photos/{id}/featured");

    let on = patch(&app, &uri, json!({ "featured": true })).await;
    assert_eq!(on.body["featured"], true);

    let pinned = patch(&app, &uri, json!({ "featured": true, "order": 5 })).await;
    assert_eq!(pinned.body["order"], 5);

    let off = patch(&app, &uri, json!({ "featured": false, "order": 9 })).await;
    assert_eq!(off.body["featured"], false);
    assert_eq!(off.body["order"], 0);

    let toggles = app
        .history
        .all()
        .into_iter()
        .filter(|e| e.action == HistoryAction::ToggleFeatured)
        .count();
    assert_eq!(toggles, 3);
}

#[tokio::test]
async fn visibility_needs_a_boolean() {
    let app = TestApp::spawn().await;
    let id = app.create_public_photo("Strict", &[]).await;

    let uri = format!("/api/photos/{id}/visibility");
    let res = patch(&app, &uri, json!({ "isVisible": "maybe" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(fields_of(&res.body), vec!["isVisible".to_string()]);

    let unchanged = patch(&app, &uri, json!({ "isVisible": "1" })).await;
    assert_eq!(unchanged.status, StatusCode::OK);
    assert_eq!(app.history.all().len(), 1);
}

#[tokio::test]
async fn archiving_hides_from_public_and_default_admin_listing() {
    let app = TestApp::spawn().await;
    let id = app.create_public_photo("Going away", &[]).await;
    app.create_public_photo("Staying", &[]).await;

    let uri = format!("/api/photos/{id}/archive");
    let archived = patch(&app, &uri, json!({ "isArchived": true })).await;
    assert_eq!(archived.status, StatusCode::OK);
    assert_eq!(archived.body["isArchived"], true);
    assert_eq!(archived.body["isVisible"], false);

    assert_eq!(app.get("/api/public/photos").await.body["totalItems"], 1);
    assert_eq!(
        app.get(&format!("/api/public/photos/{id}")).await.status,
        StatusCode::NOT_FOUND
    );

    assert_eq!(app.get_authed("/api/photos").await.body["totalItems"], 1);
    let only_archived = app.get_authed("/api/photos?isArchived=true").await;
    assert_eq!(only_archived.body["totalItems"], 1);
    assert_eq!(only_archived.body["items"][0]["title"], "Going away");
    assert_eq!(app.get_authed("/api/photos?isArchived=all").await.body["totalItems"], 2);

    let latest = &app.history.all()[0];
    assert_eq!(latest.action, HistoryAction::Delete);

    let restored = patch(&app, &uri, json!({ "isArchived": false })).await;
    assert_eq!(restored.body["isArchived"], false);
    assert_eq!(restored.body["isVisible"], false);
}

#[tokio::test]
async fn admin_listing_sees_hidden_photos() {
    let app = TestApp::spawn().await;
    app.create_photo(&[("title", "Draft"), ("descriptionMd", "d")]).await;
    app.create_public_photo("Live", &[]).await;

    assert_eq!(app.get_authed("/api/photos").await.body["totalItems"], 2);
    let hidden = app.get_authed("/api/photos?isVisible=false").await;
    assert_eq!(hidden.body["totalItems"], 1);
    assert_eq!(hidden.body["items"][0]["title"], "Draft");
}

#[tokio::test]
async fn reorder_counts_real_changes() {
    let app = TestApp::spawn().await;
    let a = app.create_public_photo("A", &[]).await;
    let b = app.create_public_photo("B", &[]).await;

    let body = json!({ "items": [
        { "id": a, "order": 1 },
        { "id": b, "order": 2 },
        { "id": "0190a1b2-0000-7000-8000-000000000000", "order": 3 }
    ]});
    let res = patch(&app, "/api/photos/reorder", body.clone()).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body, json!({ "ok": true, "updated": 2 }));
    assert!(app.stored(&a).await.featured);
    assert_eq!(app.stored(&b).await.order, 2);

    let again = patch(&app, "/api/photos/reorder", body).await;
    assert_eq!(again.body["updated"], 0);

    let reorders: Vec<_> = app
        .history
        .all()
        .into_iter()
        .filter(|e| e.action == HistoryAction::Reorder)
        .collect();
    assert_eq!(reorders.len(), 1);
    assert!(reorders[0].photo_id.is_none());
}

#[tokio::test]
async fn reorder_rejects_malformed_items() {
    let app = TestApp::spawn().await;
    let res = patch(
        &app,
        "/api/photos/reorder",
        json!({ "items": [{ "id": "nope", "order": "first" }] }),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let fields = fields_of(&res.body);
    assert!(fields.contains(&"items[0].id".to_string()), "{fields:?}");
    assert!(fields.contains(&"items[0].order".to_string()), "{fields:?}");
}

#[tokio::test]
async fn history_is_paged_newest_first() {
    let app = TestApp::spawn().await;
    let id = app.create_public_photo("Busy", &[]).await;
    for title in ["Busy 2", "Busy 3", "Busy 4"] {
        app.json(Method::PUT, &format!("/api/photos/{id}"), json!({ "title": title }), true)
            .await;
    }

    let page = app.get_authed(&format!("/api/photos/{id}/history?limit=2")).await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["totalItems"], 4);
    assert_eq!(page.body["totalPages"], 2);
    assert_eq!(page.body["items"][0]["action"], "update");
    assert_eq!(page.body["items"][0]["payload"]["changes"]["title"]["to"], "Busy 4");

    let last = app.get_authed(&format!("/api/photos/{id}/history?limit=2&page=2")).await;
    assert_eq!(last.body["items"][1]["action"], "create");

    let defaults = app.get_authed(&format!("/api/photos/{id}/history?limit=500")).await;
    assert_eq!(defaults.body["limit"], 100);

    let missing = app
        .get_authed("/api/photos/0190a1b2-0000-7000-8000-000000000000/history")
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}
