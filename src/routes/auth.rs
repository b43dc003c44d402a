//! Login endpoint
//!
//! `POST /api/auth/login` with `{identity, password}` where identity is a
//! username or an email address.

use hyper::body::Body;
use hyper::{Request, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::auth::TokenInput;
use crate::db::schemas::{UserDoc, ADMIN_ROLE_TAG};
use crate::routes::response::{parse_json_body, success, BoxError, FullBody};
use crate::routes::users::user_view;
use crate::server::AppState;
use crate::types::Result;

#[derive(Deserialize)]
struct LoginInput {
    identity: String,
    password: String,
}

/// Sign a token for `user`; `admin` reflects the roles held right now
pub(crate) fn issue_token(state: &AppState, user: &UserDoc) -> Result<String> {
    state.jwt.generate_token(TokenInput {
        user_id: user.id_hex(),
        username: user.username.clone(),
        roles: user.roles.clone(),
        admin: user.has_role(ADMIN_ROLE_TAG),
    })
}

pub async fn handle_login<B>(state: &AppState, req: Request<B>) -> Result<Response<FullBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let input: LoginInput = parse_json_body(req).await?;

    let user = match state.services.users.authenticate(&input.identity, &input.password).await {
        Ok(user) => user,
        Err(e) => {
            warn!(identity = %input.identity, error = %e, "Login failed");
            return Err(e);
        }
    };

    let token = issue_token(state, &user)?;
    info!(username = %user.username, "User logged in");

    Ok(success(
        "Success login",
        json!({
            "token": token,
            "user": user_view(state, &user).await?,
        }),
    ))
}
