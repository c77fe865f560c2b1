//! On-disk storage for student photos.
//!
//! Files live under `<root>/student_photos/` and are named after the student
//! and the upload time, e.g. `Ann_Lee_20240901_143000.png`. The database only
//! holds the resulting [`PhotoRef`].

use std::{
  io,
  path::{Component, Path, PathBuf},
};

use chrono::Utc;
use roster_core::{
  ValidationError,
  student::{PhotoRef, Student},
  validate::{PHOTO_MAX_BYTES, photo_extension, photo_media_type},
};
use sha2::{Digest as _, Sha256};
use thiserror::Error;
use tokio::io::AsyncWriteExt as _;

use crate::ApiError;

/// Sub-directory of the media root holding student photos.
pub const PHOTO_DIR: &str = "student_photos";

#[derive(Debug, Error)]
pub enum MediaError {
  #[error(transparent)]
  Invalid(#[from] ValidationError),

  #[error("photo is {0} bytes; the limit is {PHOTO_MAX_BYTES}")]
  TooLarge(usize),

  #[error("media i/o error: {0}")]
  Io(#[from] io::Error),
}

impl From<MediaError> for ApiError {
  fn from(e: MediaError) -> Self {
    match e {
      MediaError::Invalid(v) => ApiError::Invalid(v),
      MediaError::TooLarge(_) => ApiError::PayloadTooLarge(e.to_string()),
      MediaError::Io(_) => ApiError::Store(Box::new(e)),
    }
  }
}

#[derive(Debug, Clone)]
pub struct MediaStore {
  root: PathBuf,
  url:  String,
}

impl MediaStore {
  /// `root` is the directory files are written to; `url` is the public prefix
  /// it is served under (e.g. `/media`).
  pub fn new(root: impl Into<PathBuf>, url: impl Into<String>) -> Self {
    Self { root: root.into(), url: url.into() }
  }

  pub fn root(&self) -> &Path { &self.root }

  /// Public URL of a stored photo.
  pub fn url(&self, photo: &PhotoRef) -> String {
    format!("{}/{}", self.url.trim_end_matches('/'), photo.path)
  }

  /// Absolute location of `photo`, or `None` if its path would escape the
  /// media root.
  pub fn locate(&self, photo: &PhotoRef) -> Option<PathBuf> {
    let rel = Path::new(&photo.path);
    let contained = rel.components().all(|c| matches!(c, Component::Normal(_)));
    (contained && !photo.path.is_empty()).then(|| self.root.join(rel))
  }

  /// Validate and write an uploaded photo for `student`.
  pub async fn save(
    &self,
    student: &Student,
    filename: &str,
    bytes: &[u8],
  ) -> Result<PhotoRef, MediaError> {
    let ext = photo_extension(filename).map_err(|m| ValidationError::single("photo", m))?;
    if bytes.len() > PHOTO_MAX_BYTES {
      return Err(MediaError::TooLarge(bytes.len()));
    }
    if bytes.is_empty() {
      return Err(ValidationError::single("photo", "The submitted file is empty.").into());
    }

    let dir = self.root.join(PHOTO_DIR);
    tokio::fs::create_dir_all(&dir).await?;

    let stem = format!(
      "{}_{}_{}",
      file_safe(&student.first_name),
      file_safe(&student.last_name),
      Utc::now().format("%Y%m%d_%H%M%S"),
    );

    // Two uploads within the same second get numbered suffixes.
    let mut attempt = 0;
    let (name, mut file) = loop {
      let name = match attempt {
        0 => format!("{stem}.{ext}"),
        n => format!("{stem}_{n}.{ext}"),
      };
      let opened = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dir.join(&name))
        .await;
      match opened {
        Ok(file) => break (name, file),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < 100 => attempt += 1,
        Err(e) => return Err(e.into()),
      }
    };
    file.write_all(bytes).await?;
    file.flush().await?;

    let photo = PhotoRef {
      path:         format!("{PHOTO_DIR}/{name}"),
      content_hash: hex::encode(Sha256::digest(bytes)),
      media_type:   photo_media_type(ext).to_owned(),
    };
    tracing::debug!(path = %photo.path, size = bytes.len(), "stored photo");
    Ok(photo)
  }

  /// Delete the file behind `photo`. A file that is already gone is not an
  /// error.
  pub async fn remove(&self, photo: &PhotoRef) -> Result<(), MediaError> {
    let Some(path) = self.locate(photo) else {
      tracing::warn!(path = %photo.path, "refusing to remove photo outside media root");
      return Ok(());
    };
    match tokio::fs::remove_file(&path).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }
}

/// Names may hold spaces and apostrophes; keep letters, digits and hyphens.
fn file_safe(name: &str) -> String {
  name
    .chars()
    .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use roster_core::student::Sex;
  use uuid::Uuid;

  use super::*;

  fn student() -> Student {
    let now = Utc::now();
    Student {
      id:             Uuid::new_v4(),
      student_code:   None,
      student_number: None,
      photo:          None,
      first_name:     "Mary Jo".into(),
      last_name:      "O'Neil".into(),
      sex:            Sex::Female,
      date_of_birth:  NaiveDate::from_ymd_opt(2014, 1, 1).unwrap(),
      level:          "1".into(),
      room:           "1".into(),
      created_at:     now,
      updated_at:     now,
    }
  }

  fn temp_media() -> MediaStore {
    let root = std::env::temp_dir().join(format!("roster-media-{}", Uuid::new_v4()));
    MediaStore::new(root, "/media/")
  }

  #[tokio::test]
  async fn save_names_file_after_student() {
    let media = temp_media();
    let photo = media.save(&student(), "Selfie.PNG", b"\x89PNG").await.unwrap();

    assert!(photo.path.starts_with("student_photos/Mary_Jo_O_Neil_"));
    assert!(photo.path.ends_with(".png"));
    assert_eq!(photo.media_type, "image/png");
    assert_eq!(photo.content_hash, hex::encode(Sha256::digest(b"\x89PNG")));
    assert_eq!(media.url(&photo), format!("/media/{}", photo.path));

    let path = media.locate(&photo).unwrap();
    assert_eq!(tokio::fs::read(&path).await.unwrap(), b"\x89PNG");

    media.remove(&photo).await.unwrap();
    assert!(!path.exists());
    // Removing twice is harmless.
    media.remove(&photo).await.unwrap();
    let _ = std::fs::remove_dir_all(media.root());
  }

  #[tokio::test]
  async fn same_second_uploads_do_not_collide() {
    let media = temp_media();
    let a = media.save(&student(), "a.jpg", b"one").await.unwrap();
    let b = media.save(&student(), "b.jpg", b"two").await.unwrap();
    assert_ne!(a.path, b.path);
    let _ = std::fs::remove_dir_all(media.root());
  }

  #[tokio::test]
  async fn rejects_bad_extension_and_size() {
    let media = temp_media();
    let err = media.save(&student(), "anim.gif", b"GIF89a").await.unwrap_err();
    assert!(matches!(err, MediaError::Invalid(ref v) if v.has_field("photo")));

    let big = vec![0u8; PHOTO_MAX_BYTES + 1];
    let err = media.save(&student(), "big.jpg", &big).await.unwrap_err();
    assert!(matches!(err, MediaError::TooLarge(_)));
    assert!(!media.root().join(PHOTO_DIR).exists());
  }

  #[test]
  fn locate_refuses_escaping_paths() {
    let media = MediaStore::new("/srv/media", "/media");
    let photo = |path: &str| PhotoRef {
      path:         path.into(),
      content_hash: String::new(),
      media_type:   "image/png".into(),
    };
    assert_eq!(
      media.locate(&photo("student_photos/a.png")),
      Some(PathBuf::from("/srv/media/student_photos/a.png"))
    );
    assert_eq!(media.locate(&photo("../etc/passwd")), None);
    assert_eq!(media.locate(&photo("/etc/passwd")), None);
  }
}
