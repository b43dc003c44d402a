//! Content endpoints under `/api/:content`
//!
//! `:content` must name the collection of an existing content type. Reads
//! are public; writes need a token whose roles the content type permits
//! for the request method.

use hyper::body::Body;
use hyper::{Method, Request, Response, StatusCode};
use serde_json::Value;

use crate::db::schemas::{ContentDoc, ContentInput, ContentUpdate};
use crate::query::QueryParams;
use crate::routes::response::{
    BoxError, created, document_to_json, error_response, method_not_allowed, not_found_response,
    parse_json_body, require_caller, success, FullBody,
};
use crate::server::AppState;
use crate::types::Result;

fn view(content: &ContentDoc) -> Value {
    document_to_json(content.to_view())
}

pub async fn handle_content_routes<B>(
    state: &AppState,
    req: Request<B>,
    collection: &str,
    rest: &[&str],
) -> Result<Response<FullBody>>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    let services = &state.services;
    if !services.content_types.is_valid_collection(collection).await? {
        return Ok(error_response(
            StatusCode::NOT_FOUND,
            "Review your route for valid content type",
        ));
    }

    let method = req.method().clone();
    match (&method, rest) {
        (&Method::GET, []) => {
            let params = QueryParams::from_query(req.uri().query())?;
            let found = services.content.query_content(collection, &params).await?;
            Ok(success(
                "Content found",
                Value::Array(found.iter().map(view).collect()),
            ))
        }

        (&Method::GET, [id]) => {
            let content = services.content.get_content_by_id(collection, id).await?;
            Ok(success("Content found", view(&content)))
        }

        (&Method::POST, []) => {
            let caller = require_caller(req.headers(), &state.jwt)?;
            services
                .content_types
                .authorize(&caller, method.as_str(), collection)
                .await?;
            let input: ContentInput = parse_json_body(req).await?;
            let content = services.content.create_content(collection, input).await?;
            Ok(created("Created content", view(&content)))
        }

        (&Method::PATCH, [id]) => {
            let caller = require_caller(req.headers(), &state.jwt)?;
            services
                .content_types
                .authorize(&caller, method.as_str(), collection)
                .await?;
            let update: ContentUpdate = parse_json_body(req).await?;
            let content = services.content.update_content(collection, id, update).await?;
            Ok(success("Content successfully updated", view(&content)))
        }

        (&Method::DELETE, [id]) => {
            let caller = require_caller(req.headers(), &state.jwt)?;
            services
                .content_types
                .authorize(&caller, method.as_str(), collection)
                .await?;
            let content = services.content.delete_content(collection, id).await?;
            Ok(success("Content successfully deleted", view(&content)))
        }

        (_, [] | [_]) => Ok(method_not_allowed()),
        _ => Ok(not_found_response(req.uri().path())),
    }
}
