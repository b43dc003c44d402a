//! User endpoints
//!
//! - `POST /api/user` - public registration, returns a token
//! - `GET /api/user[?filters]`, `GET /api/user/:id` - any signed-in user
//! - `PATCH /api/user/:id`, `DELETE /api/user/:id` - the user or an admin
//!
//! Only admins may set or change role sets.

use hyper::body::Body;
use hyper::{Method, Request, Response};
use serde_json::{json, Value};

use crate::auth::AccessGate;
use crate::db::schemas::UserDoc;
use crate::query::{translate, FieldRegistry, QueryParams};
use crate::routes::auth::issue_token;
use crate::routes::response::{
    BoxError, bson_to_json, created, method_not_allowed, not_found_response, optional_caller,
    parse_json_body, require_caller, success, FullBody,
};
use crate::server::AppState;
use crate::services::{UserInput, UserUpdate};
use crate::types::{FolioError, Result};

/// Public view of a user: no password hash, role names resolved
pub(crate) async fn user_view(state: &AppState, user: &UserDoc) -> Result<Value> {
    let role_names = state.services.roles.resolve_names(&user.roles).await?;
    Ok(json!({
        "_id": user.id_hex(),
        "username": user.username,
        "email": user.email,
        "names": user.names,
        "roles": user.roles,
        "role_names": role_names,
        "created_at": user.created_at.map(|dt| bson_to_json(dt.into())),
        "updated_at": user.updated_at.map(|dt| bson_to_json(dt.into())),
    }))
}

fn roles_need_admin() -> FolioError {
    FolioError::Unauthorized("only admins may assign roles".into())
}

pub async fn handle_user_routes<B>(
    state: &AppState,
    req: Request<B>,
    rest: &[&str],
) -> Result<Response<FullBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let users = &state.services.users;

    match (&method, rest) {
        (&Method::POST, []) => {
            let caller = optional_caller(req.headers(), &state.jwt)?;
            let input: UserInput = parse_json_body(req).await?;
            let is_admin = caller.is_some_and(|c| c.admin);
            if !input.roles.is_empty() && !is_admin {
                return Err(roles_need_admin());
            }

            let user = users.create_user(input).await?;
            let token = issue_token(state, &user)?;
            Ok(created(
                "Created user",
                json!({ "token": token, "user": user_view(state, &user).await? }),
            ))
        }

        (&Method::GET, []) => {
            require_caller(req.headers(), &state.jwt)?;
            let params = QueryParams::from_query(req.uri().query())?;
            let filter = translate(&params, &FieldRegistry::users())?;

            let mut views = Vec::new();
            for user in users.get_users(filter).await? {
                views.push(user_view(state, &user).await?);
            }
            Ok(success("Users found", Value::Array(views)))
        }

        (&Method::GET, [id]) => {
            require_caller(req.headers(), &state.jwt)?;
            let user = users.get_user_by_id(id).await?;
            Ok(success("User found", user_view(state, &user).await?))
        }

        (&Method::PATCH, [id]) => {
            let caller = require_caller(req.headers(), &state.jwt)?;
            AccessGate::require_self_or_admin(&caller, id)?;
            let update: UserUpdate = parse_json_body(req).await?;
            if update.roles.is_some() && !caller.admin {
                return Err(roles_need_admin());
            }

            let user = users.update_user(id, update).await?;
            Ok(success("User successfully updated", user_view(state, &user).await?))
        }

        (&Method::DELETE, [id]) => {
            let caller = require_caller(req.headers(), &state.jwt)?;
            AccessGate::require_self_or_admin(&caller, id)?;
            let user = users.delete_user(id).await?;
            Ok(success(
                "User successfully deleted",
                json!({ "_id": user.id_hex(), "username": user.username }),
            ))
        }

        (_, [] | [_]) => Ok(method_not_allowed()),
        _ => Ok(not_found_response(req.uri().path())),
    }
}
