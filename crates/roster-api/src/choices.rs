//! `GET /choices`: the level, room and sex choice sets.

use axum::{Json, extract::State};
use roster_core::{
  choices::{Choice, ChoiceSet},
  store::StudentStore,
  student::Sex,
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;

use crate::ApiState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Choices {
  pub levels: ChoiceSet,
  pub rooms:  ChoiceSet,
  pub sex:    Vec<Choice>,
}

pub async fn handler<S: StudentStore>(State(state): State<ApiState<S>>) -> Json<Choices> {
  let catalog = state.store.catalog();
  Json(Choices {
    levels: catalog.levels.clone(),
    rooms:  catalog.rooms.clone(),
    sex:    Sex::iter().map(|s| Choice::new(s.code(), s.label())).collect(),
  })
}
