use auth::ClaimMap;
use axum::http::StatusCode;
use serde::Serialize;

use super::ApiSuccess;
use crate::inbound::http::context::CurrentUser;
use crate::user::ports::User;

pub async fn current_user(CurrentUser(user): CurrentUser) -> ApiSuccess<UserData> {
    ApiSuccess::new(StatusCode::OK, user.as_ref().into())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserData {
    pub id: String,
    pub name: String,
    pub email: String,
    pub admin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub claims: ClaimMap,
}

impl From<&dyn User> for UserData {
    fn from(user: &dyn User) -> Self {
        Self {
            id: user.id().to_string(),
            name: user.name().to_string(),
            email: user.email().to_string(),
            admin: user.is_admin(),
            domain: user.domain().map(str::to_string),
            claims: user.claims().clone(),
        }
    }
}
