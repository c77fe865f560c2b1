//! Router tests against an in-memory store and a scratch media directory.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use roster_core::validate::PHOTO_MAX_BYTES;
use roster_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{ApiState, MediaStore, api_router};

async fn make_state() -> ApiState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let root = std::env::temp_dir().join(format!("roster-api-{}", Uuid::new_v4()));
  ApiState::new(Arc::new(store), MediaStore::new(root, "/media"))
}

async fn send(
  state: &ApiState<SqliteStore>,
  method: &str,
  uri: &str,
  body: Body,
  content_type: &str,
) -> (StatusCode, Value) {
  let req = Request::builder()
    .method(method)
    .uri(uri)
    .header(header::CONTENT_TYPE, content_type)
    .body(body)
    .unwrap();
  let resp = api_router(state.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  // Extractor rejections answer in plain text.
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes)
      .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
  };
  (status, value)
}

async fn call(
  state: &ApiState<SqliteStore>,
  method: &str,
  uri: &str,
  body: Value,
) -> (StatusCode, Value) {
  send(state, method, uri, Body::from(body.to_string()), "application/json").await
}

async fn get(state: &ApiState<SqliteStore>, uri: &str) -> (StatusCode, Value) {
  send(state, "GET", uri, Body::empty(), "application/json").await
}

fn student_json(first: &str, last: &str, level: &str) -> Value {
  json!({
    "first_name": first,
    "last_name": last,
    "sex": "F",
    "date_of_birth": "2013-04-20",
    "level": level,
    "room": "2",
  })
}

async fn create(state: &ApiState<SqliteStore>, first: &str, last: &str, level: &str) -> Value {
  let (status, body) = call(state, "POST", "/students", student_json(first, last, level)).await;
  assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
  body
}

fn field_names(body: &Value) -> Vec<&str> {
  body["fields"]
    .as_array()
    .unwrap()
    .iter()
    .map(|f| f["field"].as_str().unwrap())
    .collect()
}

// ─── Students ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_get() {
  let state = make_state().await;
  let created = create(&state, "Ann", "Lee", "3").await;
  assert_eq!(created["created_at"], created["updated_at"]);
  assert_eq!(created["sex"], "female");

  let (status, fetched) = get(&state, &format!("/students/{}", created["id"].as_str().unwrap())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn create_reports_every_missing_field() {
  let state = make_state().await;
  let (status, body) = call(&state, "POST", "/students", json!({ "first_name": "Ann" })).await;

  assert_eq!(status, StatusCode::BAD_REQUEST);
  let fields = field_names(&body);
  for f in ["last_name", "sex", "date_of_birth", "level", "room"] {
    assert!(fields.contains(&f), "{f} missing from {body}");
  }

  let (_, list) = get(&state, "/students").await;
  assert_eq!(list, json!([]));
}

#[tokio::test]
async fn create_rejects_unknown_sex() {
  let state = make_state().await;
  let mut input = student_json("Ann", "Lee", "3");
  input["sex"] = json!("Unknown");
  let (status, body) = call(&state, "POST", "/students", input).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(field_names(&body), ["sex"]);
}

#[tokio::test]
async fn missing_student_is_404() {
  let state = make_state().await;
  let (status, body) = get(&state, &format!("/students/{}", Uuid::new_v4())).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn patch_updates_fields_and_timestamp() {
  let state = make_state().await;
  let created = create(&state, "Ann", "Lee", "3").await;
  let uri = format!("/students/{}", created["id"].as_str().unwrap());

  tokio::time::sleep(std::time::Duration::from_millis(5)).await;
  let (status, updated) = call(&state, "PATCH", &uri, json!({ "room": "6" })).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["room"], "6");
  assert_eq!(updated["created_at"], created["created_at"]);
  assert_ne!(updated["updated_at"], created["updated_at"]);

  let (status, body) = call(&state, "PATCH", &uri, json!({ "level": "0" })).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(field_names(&body), ["level"]);
}

#[tokio::test]
async fn delete_then_get_is_404() {
  let state = make_state().await;
  let created = create(&state, "Ann", "Lee", "3").await;
  let uri = format!("/students/{}", created["id"].as_str().unwrap());

  let (status, _) = send(&state, "DELETE", &uri, Body::empty(), "application/json").await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  assert_eq!(get(&state, &uri).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_by_level_and_search() {
  let state = make_state().await;
  create(&state, "Ann", "Lee", "3").await;
  create(&state, "Joanne", "Baker", "3").await;
  create(&state, "Ann", "Hanson", "2").await;
  create(&state, "Bo", "Park", "3").await;

  let (status, list) = get(&state, "/students?level=3&search=ann").await;
  assert_eq!(status, StatusCode::OK);
  let names: Vec<_> = list
    .as_array()
    .unwrap()
    .iter()
    .map(|s| s["first_name"].as_str().unwrap())
    .collect();
  assert_eq!(names, ["Joanne", "Ann"]);

  let (_, page) = get(&state, "/students?ordering=-first_name&limit=1&offset=1").await;
  assert_eq!(page[0]["first_name"], "Bo");
}

#[tokio::test]
async fn malformed_filters_are_400() {
  let state = make_state().await;
  let (status, body) = get(&state, "/students?born_after=soon&limit=many").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(field_names(&body), ["born_after", "limit"]);
}

// ─── Bulk ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn set_level_skips_stale_ids() {
  let state = make_state().await;
  let a = create(&state, "Ann", "Lee", "3").await;
  let b = create(&state, "Bo", "Park", "4").await;

  let body = json!({ "ids": [a["id"], b["id"], Uuid::new_v4()], "level": "1" });
  let (status, reply) = call(&state, "POST", "/students/set-level", body).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(reply, json!({ "updated": 2 }));

  let (_, list) = get(&state, "/students?level=1").await;
  assert_eq!(list.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn set_level_rejects_unknown_level() {
  let state = make_state().await;
  let a = create(&state, "Ann", "Lee", "3").await;
  let body = json!({ "ids": [a["id"]], "level": "12" });
  let (status, reply) = call(&state, "POST", "/students/set-level", body).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(field_names(&reply), ["level"]);
}

#[tokio::test]
async fn named_action_reports_message() {
  let state = make_state().await;
  let a = create(&state, "Ann", "Lee", "3").await;
  let b = create(&state, "Bo", "Park", "4").await;

  let (_, actions) = get(&state, "/admin/students/actions").await;
  assert_eq!(actions[0]["name"], "make_level_1");
  assert_eq!(actions[1]["description"], "Move selected students to Level 2");

  let body = json!({ "ids": [a["id"], b["id"]] });
  let (status, reply) = call(&state, "POST", "/admin/students/actions/make_level_2", body).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(reply["updated"], 2);
  assert_eq!(reply["message"], "2 students moved to Level 2.");

  let (status, _) =
    call(&state, "POST", "/admin/students/actions/expel", json!({ "ids": [a["id"]] })).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Photos ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn photo_upload_replace_and_clear() {
  let state = make_state().await;
  let created = create(&state, "Ann", "Lee", "3").await;
  let uri = format!("/students/{}/photo", created["id"].as_str().unwrap());

  let (status, body) = send(
    &state,
    "PUT",
    &format!("{uri}?filename=portrait.png"),
    Body::from(&b"\x89PNG first"[..]),
    "application/octet-stream",
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let first = state.media.root().join(body["photo"]["path"].as_str().unwrap());
  assert!(first.exists());
  assert_eq!(body["photo"]["media_type"], "image/png");

  let (status, body) = send(
    &state,
    "PUT",
    &format!("{uri}?filename=portrait.jpeg"),
    Body::from(&b"\xff\xd8 second"[..]),
    "application/octet-stream",
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert!(!first.exists(), "replaced photo should be removed");
  let second = state.media.root().join(body["photo"]["path"].as_str().unwrap());
  assert!(second.exists());

  let (status, body) = send(&state, "DELETE", &uri, Body::empty(), "application/json").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["photo"], Value::Null);
  assert!(!second.exists());

  let _ = std::fs::remove_dir_all(state.media.root());
}

#[tokio::test]
async fn photo_format_and_size_are_checked() {
  let state = make_state().await;
  let created = create(&state, "Ann", "Lee", "3").await;
  let uri = format!("/students/{}/photo", created["id"].as_str().unwrap());

  let (status, body) = send(
    &state,
    "PUT",
    &format!("{uri}?filename=anim.gif"),
    Body::from(&b"GIF89a"[..]),
    "application/octet-stream",
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(field_names(&body), ["photo"]);

  let (status, _) = send(
    &state,
    "PUT",
    &format!("{uri}?filename=huge.jpg"),
    Body::from(vec![0u8; PHOTO_MAX_BYTES + 1]),
    "application/octet-stream",
  )
  .await;
  assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

  let (status, body) =
    send(&state, "PUT", &uri, Body::from(&b"x"[..]), "application/octet-stream").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(field_names(&body), ["filename"]);

  let (_, fetched) = get(&state, &format!("/students/{}", created["id"].as_str().unwrap())).await;
  assert_eq!(fetched["photo"], Value::Null);
}

#[tokio::test]
async fn photo_references_cannot_be_shared() {
  let state = make_state().await;
  let a = create(&state, "Ann", "Lee", "3").await;
  let b = create(&state, "Bo", "Park", "3").await;
  let a_uri = format!("/students/{}", a["id"].as_str().unwrap());
  let b_uri = format!("/students/{}", b["id"].as_str().unwrap());

  let (status, uploaded) = send(
    &state,
    "PUT",
    &format!("{a_uri}/photo?filename=a.png"),
    Body::from(&b"\x89PNG ann"[..]),
    "application/octet-stream",
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{uploaded}");
  let a_file = state.media.root().join(uploaded["photo"]["path"].as_str().unwrap());

  let (status, body) =
    call(&state, "PATCH", &b_uri, json!({ "photo": uploaded["photo"] })).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(field_names(&body), ["photo"]);

  let mut input = student_json("Cy", "Moss", "3");
  input["photo"] = uploaded["photo"].clone();
  let (status, body) = call(&state, "POST", "/students", input).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(field_names(&body), ["photo"]);

  for uri in [format!("{b_uri}/photo"), b_uri.clone()] {
    let (status, _) = send(&state, "DELETE", &uri, Body::empty(), "application/json").await;
    assert!(status.is_success(), "{uri}: {status}");
  }
  assert!(a_file.exists(), "another student's photo was removed");

  let (status, cleared) = call(&state, "PATCH", &a_uri, json!({ "photo": null })).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(cleared["photo"], Value::Null);
  assert!(!a_file.exists());

  let _ = std::fs::remove_dir_all(state.media.root());
}

#[tokio::test]
async fn json_routes_keep_the_default_body_limit() {
  let state = make_state().await;
  let mut input = student_json("Ann", "Lee", "3");
  input["first_name"] = json!("a".repeat(3 * 1024 * 1024));
  let (status, _) = call(&state, "POST", "/students", input).await;
  assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

  let (_, list) = get(&state, "/students").await;
  assert_eq!(list, json!([]));
}

// ─── Assessments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn assessments_are_scored_and_listed() {
  let state = make_state().await;
  let id = create(&state, "Ann", "Lee", "3").await["id"].as_str().unwrap().to_owned();

  // Social block (questions 19 to 24) answered highest.
  let mut answers = vec![2; 36];
  answers[18..24].fill(5);
  answers[24..30].fill(4);
  let (status, body) = call(
    &state,
    "POST",
    &format!("/students/{id}/assessments/holland"),
    json!({ "answers": answers }),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["questionnaire"], "holland");
  assert_eq!(body["outcome"]["kind"], "holland");
  assert_eq!(body["outcome"]["primary"], "S");
  assert_eq!(body["outcome"]["code"], "SER");
  assert_eq!(body["outcome"]["scores"]["social"], 100);

  let (status, body) = call(
    &state,
    "POST",
    &format!("/students/{id}/assessments/career-discovery"),
    json!({ "answers": vec![1; 41] }),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["outcome"]["kind"], "intelligence");

  let (status, list) = get(&state, &format!("/students/{id}/assessments")).await;
  assert_eq!(status, StatusCode::OK);
  let kinds: Vec<_> = list.as_array().unwrap().iter().map(|a| a["questionnaire"].clone()).collect();
  assert_eq!(kinds, [json!("career-discovery"), json!("holland")]);

  let (status, profile) = get(&state, &format!("/students/{id}/profile")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(profile["holland"]["outcome"]["code"], "SER");
  assert_eq!(profile["intelligence"]["questionnaire"], "career-discovery");
}

#[tokio::test]
async fn assessment_errors_map_to_status_codes() {
  let state = make_state().await;
  let id = create(&state, "Ann", "Lee", "3").await["id"].as_str().unwrap().to_owned();

  let (status, body) = call(
    &state,
    "POST",
    &format!("/students/{id}/assessments/gardner"),
    json!({ "answers": [3, 3, 3] }),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(field_names(&body), ["answers"]);

  let (status, _) = call(
    &state,
    "POST",
    &format!("/students/{id}/assessments/enneagram"),
    json!({ "answers": [] }),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let missing = Uuid::new_v4();
  let (status, _) = call(
    &state,
    "POST",
    &format!("/students/{missing}/assessments/gardner"),
    json!({ "answers": vec![3; 24] }),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (status, _) = get(&state, &format!("/students/{missing}/profile")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, profile) = get(&state, &format!("/students/{id}/profile")).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(profile, json!({ "holland": null, "intelligence": null }));
}

#[tokio::test]
async fn deleting_a_student_removes_their_assessments() {
  let state = make_state().await;
  let id = create(&state, "Ann", "Lee", "3").await["id"].as_str().unwrap().to_owned();
  let uri = format!("/students/{id}/assessments/gardner");
  let (status, _) = call(&state, "POST", &uri, json!({ "answers": vec![4; 24] })).await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, _) =
    send(&state, "DELETE", &format!("/students/{id}"), Body::empty(), "application/json").await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = get(&state, &format!("/students/{id}/assessments")).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn questionnaires_describe_their_scales() {
  let state = make_state().await;
  let (status, body) = get(&state, "/questionnaires").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(
    body,
    json!([
      { "name": "holland", "questions": 36, "min": 1, "max": 5 },
      { "name": "gardner", "questions": 24, "min": 1, "max": 5 },
      { "name": "career-discovery", "questions": 41, "min": 0, "max": 3 },
    ])
  );
}

// ─── Admin list view ─────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_page_renders_configured_columns() {
  let state = make_state().await;
  for i in 0..30u8 {
    let last = format!("L{}{}", char::from(b'a' + i / 26), char::from(b'a' + i % 26));
    create(&state, "Ann", &last, "3").await;
  }

  let (status, page) = get(&state, "/admin/students?page=2").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(page["pagination"]["total"], 30);
  assert_eq!(page["pagination"]["num_pages"], 2);
  assert_eq!(page["pagination"]["page"], 2);
  assert_eq!(page["rows"].as_array().unwrap().len(), 5);
  assert_eq!(page["search_fields"], json!(["first_name", "last_name"]));

  let row = &page["rows"][0]["cells"];
  assert_eq!(row["level"], "Level 3");
  assert_eq!(row["room"], "Room 2");
  assert_eq!(row["sex"], "Female");
  assert_eq!(row["photo"], Value::Null);

  let (_, clamped) = get(&state, "/admin/students?page=99&level=3").await;
  assert_eq!(clamped["pagination"]["page"], 2);

  let (_, none) = get(&state, "/admin/students?level=5").await;
  assert_eq!(none["pagination"]["total"], 0);
  assert_eq!(none["pagination"]["page"], 1);
}

// ─── Reference data ──────────────────────────────────────────────────────────

#[tokio::test]
async fn choices_and_stats() {
  let state = make_state().await;
  create(&state, "Ann", "Lee", "3").await;
  create(&state, "Bo", "Park", "3").await;

  let (_, choices) = get(&state, "/choices").await;
  assert_eq!(choices["levels"].as_array().unwrap().len(), 6);
  assert_eq!(choices["rooms"][0], json!({ "code": "1", "label": "Room 1" }));
  assert_eq!(choices["sex"][2], json!({ "code": "O", "label": "Other" }));

  let (status, stats) = get(&state, "/stats?recent=1").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(stats["total"], 2);
  assert_eq!(stats["by_level"][2]["count"], 2);
  assert_eq!(stats["recent"].as_array().unwrap().len(), 1);
  assert_eq!(stats["recent"][0]["first_name"], "Bo");
}
