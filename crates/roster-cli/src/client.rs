//! Async HTTP client wrapping the roster JSON API.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Method, RequestBuilder, Response};
use roster_core::{
  FieldError,
  admin::BulkAction,
  assessment::{Assessment, Profile, Questionnaire},
  choices::{Choice, ChoiceSet},
  stats::RosterStats,
  student::{NewStudent, Student, StudentPatch},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use uuid::Uuid;

/// Connection settings for the roster API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// Filters for `GET /api/students`; every field maps to a query parameter.
#[derive(Debug, Default, Clone, Serialize, clap::Args)]
pub struct ListFilter {
  /// Case-insensitive match on first or last name.
  #[arg(short, long)]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub search:         Option<String>,
  #[arg(long)]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub level:          Option<String>,
  #[arg(long)]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub room:           Option<String>,
  #[arg(long)]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub sex:            Option<String>,
  #[arg(long, value_name = "DATE")]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub born_after:     Option<String>,
  #[arg(long, value_name = "DATE")]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub born_before:    Option<String>,
  #[arg(long, value_name = "DATE")]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created_after:  Option<String>,
  #[arg(long, value_name = "DATE")]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created_before: Option<String>,
  #[arg(long, value_name = "DATE")]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub updated_after:  Option<String>,
  #[arg(long, value_name = "DATE")]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub updated_before: Option<String>,
  /// Comma-separated sort keys, `-` for descending, e.g. `level,-last_name`.
  #[arg(short, long, allow_hyphen_values = true)]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ordering:       Option<String>,
  #[arg(long)]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub limit:          Option<usize>,
  #[arg(long)]
  #[serde(skip_serializing_if = "Option::is_none")]
  pub offset:         Option<usize>,
}

/// `GET /api/choices`
#[derive(Debug, Clone, Deserialize)]
pub struct Choices {
  pub levels: ChoiceSet,
  pub rooms:  ChoiceSet,
  pub sex:    Vec<Choice>,
}

/// One entry of `GET /api/questionnaires`.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionnaireInfo {
  pub name:      Questionnaire,
  pub questions: usize,
  pub min:       u8,
  pub max:       u8,
}

/// Reply to a named bulk action.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionReply {
  pub updated: usize,
  pub message: String,
}

#[derive(Deserialize)]
struct Updated {
  updated: usize,
}

/// Error body returned by every failing endpoint.
#[derive(Deserialize)]
struct ErrorBody {
  error:  String,
  #[serde(default)]
  fields: Vec<FieldError>,
}

/// Async HTTP client for the roster JSON REST API.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    let req = self.client.request(method, self.url(path));
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  async fn send(&self, method: Method, path: &str, req: RequestBuilder) -> Result<Response> {
    tracing::debug!(%method, path, "sending request");
    let resp = req
      .send()
      .await
      .with_context(|| format!("{method} {path} failed"))?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }

    let mut message = format!("{method} {path} → {status}");
    if let Ok(body) = resp.json::<ErrorBody>().await {
      message.push_str(": ");
      message.push_str(&body.error);
      for FieldError { field, message: m } in body.fields {
        message.push_str(&format!("\n  {field}: {m}"));
      }
    }
    Err(anyhow!(message))
  }

  async fn json<T: DeserializeOwned>(&self, method: Method, path: &str, req: RequestBuilder) -> Result<T> {
    self
      .send(method.clone(), path, req)
      .await?
      .json()
      .await
      .with_context(|| format!("deserialising {method} {path} reply"))
  }

  // ── Students ──────────────────────────────────────────────────────────────

  /// `GET /api/students`
  pub async fn list(&self, filter: &ListFilter) -> Result<Vec<Student>> {
    let req = self.request(Method::GET, "/students").query(filter);
    self.json(Method::GET, "/students", req).await
  }

  /// `GET /api/students/{id}`
  pub async fn get(&self, id: Uuid) -> Result<Student> {
    let path = format!("/students/{id}");
    let req = self.request(Method::GET, &path);
    self.json(Method::GET, &path, req).await
  }

  /// `POST /api/students`
  pub async fn create(&self, input: &NewStudent) -> Result<Student> {
    let req = self.request(Method::POST, "/students").json(input);
    self.json(Method::POST, "/students", req).await
  }

  /// `PATCH /api/students/{id}`
  pub async fn update(&self, id: Uuid, patch: &StudentPatch) -> Result<Student> {
    let path = format!("/students/{id}");
    let req = self.request(Method::PATCH, &path).json(patch);
    self.json(Method::PATCH, &path, req).await
  }

  /// `DELETE /api/students/{id}`
  pub async fn delete(&self, id: Uuid) -> Result<()> {
    let path = format!("/students/{id}");
    let req = self.request(Method::DELETE, &path);
    self.send(Method::DELETE, &path, req).await?;
    Ok(())
  }

  // ── Photos ────────────────────────────────────────────────────────────────

  /// `PUT /api/students/{id}/photo?filename=<name>`
  pub async fn upload_photo(&self, id: Uuid, filename: &str, bytes: Vec<u8>) -> Result<Student> {
    let path = format!("/students/{id}/photo");
    let req = self
      .request(Method::PUT, &path)
      .query(&[("filename", filename)])
      .body(bytes);
    self.json(Method::PUT, &path, req).await
  }

  /// `DELETE /api/students/{id}/photo`
  pub async fn clear_photo(&self, id: Uuid) -> Result<Student> {
    let path = format!("/students/{id}/photo");
    let req = self.request(Method::DELETE, &path);
    self.json(Method::DELETE, &path, req).await
  }

  // ── Assessments ───────────────────────────────────────────────────────────

  /// `POST /api/students/{id}/assessments/{questionnaire}`
  pub async fn assess(
    &self,
    id: Uuid,
    questionnaire: Questionnaire,
    answers: &[u8],
  ) -> Result<Assessment> {
    let path = format!("/students/{id}/assessments/{questionnaire}");
    let req = self.request(Method::POST, &path).json(&json!({ "answers": answers }));
    self.json(Method::POST, &path, req).await
  }

  /// `GET /api/students/{id}/assessments`
  pub async fn assessments(&self, id: Uuid) -> Result<Vec<Assessment>> {
    let path = format!("/students/{id}/assessments");
    let req = self.request(Method::GET, &path);
    self.json(Method::GET, &path, req).await
  }

  /// `GET /api/students/{id}/profile`
  pub async fn profile(&self, id: Uuid) -> Result<Profile> {
    let path = format!("/students/{id}/profile");
    let req = self.request(Method::GET, &path);
    self.json(Method::GET, &path, req).await
  }

  /// `GET /api/questionnaires`
  pub async fn questionnaires(&self) -> Result<Vec<QuestionnaireInfo>> {
    let req = self.request(Method::GET, "/questionnaires");
    self.json(Method::GET, "/questionnaires", req).await
  }

  // ── Bulk actions ──────────────────────────────────────────────────────────

  /// `POST /api/students/set-level`; returns the number of records changed.
  pub async fn set_level(&self, ids: &[Uuid], level: &str) -> Result<usize> {
    let req = self
      .request(Method::POST, "/students/set-level")
      .json(&json!({ "ids": ids, "level": level }));
    let reply: Updated = self.json(Method::POST, "/students/set-level", req).await?;
    Ok(reply.updated)
  }

  /// `GET /api/admin/students/actions`
  pub async fn actions(&self) -> Result<Vec<BulkAction>> {
    let path = "/admin/students/actions";
    let req = self.request(Method::GET, path);
    self.json(Method::GET, path, req).await
  }

  /// `POST /api/admin/students/actions/{name}`
  pub async fn run_action(&self, name: &str, ids: &[Uuid]) -> Result<ActionReply> {
    let path = format!("/admin/students/actions/{name}");
    let req = self.request(Method::POST, &path).json(&json!({ "ids": ids }));
    self.json(Method::POST, &path, req).await
  }

  // ── Reference data ────────────────────────────────────────────────────────

  /// `GET /api/choices`
  pub async fn choices(&self) -> Result<Choices> {
    let req = self.request(Method::GET, "/choices");
    self.json(Method::GET, "/choices", req).await
  }

  /// `GET /api/stats?recent=<n>`
  pub async fn stats(&self, recent: usize) -> Result<RosterStats> {
    let req = self.request(Method::GET, "/stats").query(&[("recent", recent)]);
    self.json(Method::GET, "/stats", req).await
  }
}
