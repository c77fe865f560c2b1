//! `roster`, the command-line client for the Roster student registry.
//!
//! # Usage
//!
//! ```text
//! roster --url http://localhost:8000 --user admin --password secret list --level 2
//! roster --config ~/.config/roster/config.toml set-level --level 3 <ID>...
//! ```

mod client;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use client::{ApiClient, ApiConfig, ListFilter};
use roster_core::{
  assessment::Questionnaire,
  student::{NewStudent, StudentPatch},
};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "roster", about = "Command-line client for the Roster student registry")]
struct Cli {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the roster server (default: http://localhost:8000).
  #[arg(long, env = "ROSTER_URL")]
  url: Option<String>,

  /// API username.
  #[arg(long, env = "ROSTER_USER")]
  user: Option<String>,

  /// API password (plaintext).
  #[arg(long, env = "ROSTER_PASSWORD")]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List students, optionally filtered, searched and ordered.
  List(ListFilter),
  /// Show every field of one student.
  Show { id: Uuid },
  /// Create a student.
  Add(AddArgs),
  /// Change some fields of a student.
  Edit(EditArgs),
  /// Delete a student and their photo.
  Rm { id: Uuid },
  /// Move the given students to a level; unknown ids are skipped.
  SetLevel {
    #[arg(long)]
    level: String,
    #[arg(required = true)]
    ids:   Vec<Uuid>,
  },
  /// Run a named bulk action, or list the available ones.
  Action {
    name: Option<String>,
    ids:  Vec<Uuid>,
  },
  /// Upload a photo file (.png, .jpg, .jpeg) or clear the current one.
  Photo {
    id:    Uuid,
    #[arg(required_unless_present = "clear", conflicts_with = "clear")]
    file:  Option<PathBuf>,
    #[arg(long)]
    clear: bool,
  },
  /// Record a completed questionnaire for a student.
  Assess {
    id:            Uuid,
    /// `holland`, `gardner` or `career-discovery`.
    questionnaire: Questionnaire,
    /// Comma-separated answers, question 1 first.
    #[arg(required = true, value_delimiter = ',')]
    answers:       Vec<u8>,
  },
  /// A student's latest results and their assessment history.
  Results { id: Uuid },
  /// The available questionnaires and their answer scales.
  Questionnaires,
  /// Totals per level, room and sex.
  Stats {
    /// How many recently added students to include.
    #[arg(long, default_value_t = 5)]
    recent: usize,
  },
  /// The configured levels, rooms and sex codes.
  Choices,
}

#[derive(Args, Debug)]
struct AddArgs {
  #[arg(long)]
  first_name:    String,
  #[arg(long)]
  last_name:     String,
  /// `male`, `female`, `other` or `M`, `F`, `O`.
  #[arg(long)]
  sex:           String,
  /// `YYYY-MM-DD`
  #[arg(long)]
  date_of_birth: NaiveDate,
  #[arg(long)]
  level:         String,
  #[arg(long)]
  room:          String,
  #[arg(long)]
  code:          Option<String>,
  #[arg(long)]
  number:        Option<String>,
}

impl AddArgs {
  fn into_new_student(self) -> NewStudent {
    NewStudent {
      student_code:   self.code,
      student_number: self.number,
      photo:          None,
      first_name:     Some(self.first_name),
      last_name:      Some(self.last_name),
      sex:            Some(self.sex),
      date_of_birth:  Some(self.date_of_birth),
      level:          Some(self.level),
      room:           Some(self.room),
    }
  }
}

#[derive(Args, Debug)]
struct EditArgs {
  id:            Uuid,
  #[arg(long)]
  first_name:    Option<String>,
  #[arg(long)]
  last_name:     Option<String>,
  #[arg(long)]
  sex:           Option<String>,
  #[arg(long)]
  date_of_birth: Option<NaiveDate>,
  #[arg(long)]
  level:         Option<String>,
  #[arg(long)]
  room:          Option<String>,
  #[arg(long, conflicts_with = "clear_code")]
  code:          Option<String>,
  #[arg(long)]
  clear_code:    bool,
  #[arg(long, conflicts_with = "clear_number")]
  number:        Option<String>,
  #[arg(long)]
  clear_number:  bool,
}

impl EditArgs {
  fn into_patch(self) -> (Uuid, StudentPatch) {
    let optional = |value: Option<String>, clear: bool| {
      if clear { Some(None) } else { value.map(Some) }
    };
    let patch = StudentPatch {
      student_code:   optional(self.code, self.clear_code),
      student_number: optional(self.number, self.clear_number),
      photo:          None,
      first_name:     self.first_name,
      last_name:      self.last_name,
      sex:            self.sex,
      date_of_birth:  self.date_of_birth,
      level:          self.level,
      room:           self.room,
    };
    (self.id, patch)
  }
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
}

/// Flags and environment override the config file, which overrides defaults.
fn api_config(cli: &Cli, file: ConfigFile) -> ApiConfig {
  let pick = |flag: &Option<String>, from_file: String| {
    flag.clone().or_else(|| (!from_file.is_empty()).then_some(from_file))
  };
  ApiConfig {
    base_url: pick(&cli.url, file.url).unwrap_or_else(|| "http://localhost:8000".to_string()),
    username: pick(&cli.user, file.username).unwrap_or_default(),
    password: pick(&cli.password, file.password).unwrap_or_default(),
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let file_cfg: ConfigFile = if let Some(path) = &cli.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let client = ApiClient::new(api_config(&cli, file_cfg))?;
  let today = Local::now().date_naive();

  let output = match cli.command {
    Command::List(filter) => render::students(&client.list(&filter).await?, today),
    Command::Show { id } => render::student(&client.get(id).await?, today),
    Command::Add(args) => {
      let created = client.create(&args.into_new_student()).await?;
      render::student(&created, today)
    }
    Command::Edit(args) => {
      let (id, patch) = args.into_patch();
      render::student(&client.update(id, &patch).await?, today)
    }
    Command::Rm { id } => {
      client.delete(id).await?;
      format!("Deleted {id}\n")
    }
    Command::SetLevel { level, ids } => {
      let updated = client.set_level(&ids, &level).await?;
      format!("{updated} of {} students updated.\n", ids.len())
    }
    Command::Action { name: None, .. } => render::actions(&client.actions().await?),
    Command::Action { name: Some(name), ids } => {
      if ids.is_empty() {
        bail!("select at least one student for {name}");
      }
      format!("{}\n", client.run_action(&name, &ids).await?.message)
    }
    Command::Photo { id, clear: true, .. } => render::student(&client.clear_photo(id).await?, today),
    Command::Photo { id, file, .. } => {
      let path = file.context("a photo file is required")?;
      let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?
        .to_owned();
      let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
      render::student(&client.upload_photo(id, &filename, bytes).await?, today)
    }
    Command::Assess { id, questionnaire, answers } => {
      render::assessment(&client.assess(id, questionnaire, &answers).await?)
    }
    Command::Results { id } => {
      let (profile, history) = tokio::try_join!(client.profile(id), client.assessments(id))?;
      format!("{}\n{}", render::profile(&profile), render::assessments(&history))
    }
    Command::Questionnaires => render::questionnaires(&client.questionnaires().await?),
    Command::Stats { recent } => render::stats(&client.stats(recent).await?, today),
    Command::Choices => render::choices(&client.choices().await?),
  };

  print!("{output}");
  Ok(())
}
