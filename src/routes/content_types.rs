//! Content type endpoints
//!
//! Reads are public. Creating, updating and deleting content types is
//! admin-only; deleting one drops its whole collection.

use hyper::body::Body;
use hyper::{Method, Request, Response};
use serde_json::Value;

use crate::query::{translate, FieldRegistry, QueryParams};
use crate::routes::response::{
    BoxError, created, method_not_allowed, not_found_response, parse_json_body, record_to_json,
    require_admin, success, FullBody,
};
use crate::server::AppState;
use crate::services::{ContentTypeInput, ContentTypeUpdate};
use crate::types::Result;

pub async fn handle_content_type_routes<B>(
    state: &AppState,
    req: Request<B>,
    rest: &[&str],
) -> Result<Response<FullBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let types = &state.services.content_types;

    match (&method, rest) {
        (&Method::GET, []) => {
            let params = QueryParams::from_query(req.uri().query())?;
            let filter = translate(&params, &FieldRegistry::content_types())?;
            let found = types
                .list_content_types(filter)
                .await?
                .iter()
                .map(record_to_json)
                .collect::<Result<Vec<_>>>()?;
            Ok(success("Content types found", Value::Array(found)))
        }

        (&Method::GET, [id]) => {
            let content_type = types.get_content_type_by_id(id).await?;
            Ok(success("Content type found", record_to_json(&content_type)?))
        }

        (&Method::POST, []) => {
            require_admin(req.headers(), &state.jwt)?;
            let input: ContentTypeInput = parse_json_body(req).await?;
            let content_type = types.create_content_type(input).await?;
            Ok(created("Created content type", record_to_json(&content_type)?))
        }

        (&Method::PATCH, [id]) => {
            require_admin(req.headers(), &state.jwt)?;
            let update: ContentTypeUpdate = parse_json_body(req).await?;
            let content_type = types.update_content_type(id, update).await?;
            Ok(success(
                "Content type successfully updated",
                record_to_json(&content_type)?,
            ))
        }

        (&Method::DELETE, [id]) => {
            require_admin(req.headers(), &state.jwt)?;
            let content_type = types.delete_content_type(id).await?;
            Ok(success(
                "Content type and its collection deleted",
                record_to_json(&content_type)?,
            ))
        }

        (_, [] | [_]) => Ok(method_not_allowed()),
        _ => Ok(not_found_response(req.uri().path())),
    }
}
