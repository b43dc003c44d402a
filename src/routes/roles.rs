//! Role endpoints
//!
//! Reading roles is public; creating, renaming and deleting them is
//! admin-only. Deleting a role strips it from every user and content type.

use hyper::body::Body;
use hyper::{Method, Request, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::routes::response::{
    BoxError, created, method_not_allowed, not_found_response, parse_json_body, record_to_json,
    require_admin, success, FullBody,
};
use crate::server::AppState;
use crate::types::Result;

#[derive(Deserialize)]
struct RoleInput {
    tag: String,
    name: String,
}

#[derive(Deserialize)]
struct RoleRename {
    name: String,
}

pub async fn handle_role_routes<B>(
    state: &AppState,
    req: Request<B>,
    rest: &[&str],
) -> Result<Response<FullBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let roles = &state.services.roles;

    match (&method, rest) {
        (&Method::GET, []) => {
            let all = roles
                .list_roles()
                .await?
                .iter()
                .map(record_to_json)
                .collect::<Result<Vec<_>>>()?;
            Ok(success("Roles found", Value::Array(all)))
        }

        (&Method::GET, [tag]) => {
            let role = roles.get_role_by_tag(tag).await?;
            Ok(success("Role found", record_to_json(&role)?))
        }

        (&Method::POST, []) => {
            require_admin(req.headers(), &state.jwt)?;
            let input: RoleInput = parse_json_body(req).await?;
            let role = roles.create_role(&input.tag, &input.name).await?;
            Ok(created("Created role", record_to_json(&role)?))
        }

        (&Method::PATCH, [tag]) => {
            require_admin(req.headers(), &state.jwt)?;
            let input: RoleRename = parse_json_body(req).await?;
            let role = roles.update_role_name(tag, &input.name).await?;
            Ok(success("Role successfully updated", record_to_json(&role)?))
        }

        (&Method::DELETE, [tag]) => {
            require_admin(req.headers(), &state.jwt)?;
            let deleted = state.services.delete_role(tag).await?;
            Ok(success(
                "Role successfully deleted",
                json!({ "tag": tag, "deleted": deleted }),
            ))
        }

        (_, [] | [_]) => Ok(method_not_allowed()),
        _ => Ok(not_found_response(req.uri().path())),
    }
}
