//! HTTP routes for Folio
//!
//! Everything lives under `/api`:
//! - `/api/` - health
//! - `/api/auth/login`
//! - `/api/user[/:id]`
//! - `/api/role[/:tag]`
//! - `/api/contenttypes[/:id]`
//! - `/api/:content[/:id]` - content of the type whose collection is `:content`

pub mod auth;
pub mod content;
pub mod content_types;
pub mod health;
pub mod response;
pub mod roles;
pub mod users;

pub use response::FullBody;

use hyper::body::Body;
use hyper::{Method, Request, Response};

use crate::server::AppState;
use response::{
    failure, method_not_allowed, not_found_response, preflight_response, BoxError,
};

/// Dispatch one request
///
/// Generic over the body so tests can drive it without a socket.
pub async fn route<B>(state: &AppState, req: Request<B>) -> Response<FullBody>
where
    B: Body,
    B::Error: Into<BoxError>,
{
    if req.method() == Method::OPTIONS {
        return preflight_response();
    }

    let path = req.uri().path().to_string();
    if path == "/health" {
        return health::handle_liveness(state);
    }

    let rest = match path.strip_prefix("/api") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return not_found_response(&path),
    };
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    let result = match segments.as_slice() {
        [] if req.method() == Method::GET => Ok(health::handle_readiness(state).await),
        [] => Ok(method_not_allowed()),
        ["auth", "login"] if req.method() == Method::POST => auth::handle_login(state, req).await,
        ["auth", "login"] => Ok(method_not_allowed()),
        ["user", rest @ ..] => users::handle_user_routes(state, req, rest).await,
        ["role", rest @ ..] => roles::handle_role_routes(state, req, rest).await,
        ["contenttypes", rest @ ..] => {
            content_types::handle_content_type_routes(state, req, rest).await
        }
        [collection, rest @ ..] => content::handle_content_routes(state, req, collection, rest).await,
    };

    result.unwrap_or_else(|e| failure(&e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use clap::Parser;
    use http_body_util::{BodyExt, Full};
    use hyper::StatusCode;
    use serde_json::{json, Value};

    use crate::auth::{JwtValidator, TokenInput};
    use crate::config::Args;
    use crate::db::Database;
    use crate::services::{bootstrap, SeedConfig};

    async fn state() -> AppState {
        let args = Args::parse_from(["folio", "--dev-mode"]);
        let db = Database::in_memory();
        let state = AppState::new(args, db.clone(), JwtValidator::new_dev());
        bootstrap(
            &db,
            &state.services,
            &SeedConfig {
                admin_username: "adminUser".into(),
                admin_email: "admin@sample.com".into(),
                admin_password: "admin-pw".into(),
            },
        )
        .await
        .unwrap();
        state
    }

    fn token(state: &AppState, roles: &[&str], admin: bool) -> String {
        state
            .jwt
            .generate_token(TokenInput {
                user_id: "65f000000000000000000001".into(),
                username: "tester".into(),
                roles: roles.iter().map(|r| r.to_string()).collect(),
                admin,
            })
            .unwrap()
    }

    async fn call(
        state: &AppState,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let body = body.map(|b| b.to_string()).unwrap_or_default();
        let req = builder.body(Full::new(Bytes::from(body))).unwrap();

        let response = route(state, req).await;
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let state = state().await;
        let (status, body) = call(&state, Method::GET, "/api/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["store"], true);

        let (status, _) = call(&state, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&state, Method::OPTIONS, "/api/blogposts", None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_unknown_collection_is_404() {
        let state = state().await;
        let (status, body) = call(&state, Method::GET, "/api/recipes", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Review your route for valid content type");
    }

    #[tokio::test]
    async fn test_post_gated_by_permissions() {
        let state = state().await;
        let admin = token(&state, &["admin"], true);

        // blogpost: only admins may POST
        let (status, body) = call(
            &state,
            Method::GET,
            "/api/contenttypes?typename=blogpost",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let blog_id = body["data"][0]["_id"].as_str().unwrap().to_string();

        let (status, _) = call(
            &state,
            Method::PATCH,
            &format!("/api/contenttypes/{blog_id}"),
            Some(&admin),
            Some(json!({ "permissions": { "POST": ["admin"] } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let post = json!({ "title": "Hello", "published": true, "tags": ["a", "b"], "fields": { "text": "hi" } });

        let member = token(&state, &["default"], false);
        let (status, body) = call(
            &state,
            Method::POST,
            "/api/blogposts",
            Some(&member),
            Some(post.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "error");

        let (status, _) = call(&state, Method::POST, "/api/blogposts", None, Some(post.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let non_admin_with_admin_tag = token(&state, &["admin"], false);
        let (status, body) = call(
            &state,
            Method::POST,
            "/api/blogposts",
            Some(&non_admin_with_admin_tag),
            Some(post),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["content_type_id"], blog_id.as_str());
        let id = body["data"]["_id"].as_str().unwrap().to_string();

        let (status, body) =
            call(&state, Method::GET, &format!("/api/blogposts/{id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["fields"]["text"], "hi");
    }

    #[tokio::test]
    async fn test_content_filters_over_http() {
        let state = state().await;
        let admin = token(&state, &["admin"], true);
        let (status, _) = call(
            &state,
            Method::POST,
            "/api/events",
            Some(&admin),
            Some(json!({
                "title": "Meetup",
                "published": true,
                "tags": ["a", "b"],
                "fields": { "place": "Hall", "date": "2024-05-01T18:00:00Z" }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) =
            call(&state, Method::GET, "/api/events?published=true", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["fields"]["date"], "2024-05-01T18:00:00+00:00");

        let (status, _) =
            call(&state, Method::GET, "/api/events?published=false", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&state, Method::GET, "/api/events?id=zzz", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            call(&state, Method::GET, "/api/events?%24where=sleep(100)", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            call(&state, Method::GET, "/api/events?place=Hall&tags=a", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_update_and_delete_content() {
        let state = state().await;
        let member = token(&state, &["default"], false);
        let (_, body) = call(
            &state,
            Method::POST,
            "/api/events",
            Some(&member),
            Some(json!({ "title": "Meetup", "published": true, "fields": {} })),
        )
        .await;
        let id = body["data"]["_id"].as_str().unwrap().to_string();
        let uri = format!("/api/events/{id}");

        let (status, body) = call(
            &state,
            Method::PATCH,
            &uri,
            Some(&member),
            Some(json!({ "published": false })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["published"], false);
        assert_eq!(body["data"]["title"], "Meetup");

        let (status, _) = call(&state, Method::DELETE, &uri, Some(&member), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&state, Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_content_type_admin_only_and_delete_drops_collection() {
        let state = state().await;
        let member = token(&state, &["default"], false);
        let admin = token(&state, &["admin"], true);
        let input = json!({
            "typename": "recipe",
            "collection": "recipes",
            "permissions": { "POST": ["default"] },
            "field_schema": { "serves": "number" }
        });

        let (status, _) = call(
            &state,
            Method::POST,
            "/api/contenttypes",
            Some(&member),
            Some(input.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) =
            call(&state, Method::POST, "/api/contenttypes", Some(&admin), Some(input.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["_id"].as_str().unwrap().to_string();

        let (status, _) =
            call(&state, Method::POST, "/api/contenttypes", Some(&admin), Some(input)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(
            &state,
            Method::POST,
            "/api/recipes",
            Some(&member),
            Some(json!({ "title": "Soup", "fields": { "serves": 4 } })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = call(
            &state,
            Method::DELETE,
            &format!("/api/contenttypes/{id}"),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&state, Method::GET, "/api/recipes", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!state
            .db
            .collection_names()
            .await
            .unwrap()
            .contains(&"recipes".to_string()));
    }

    #[tokio::test]
    async fn test_login_and_registration() {
        let state = state().await;

        let (status, body) = call(
            &state,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "identity": "admin@sample.com", "password": "admin-pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user"]["role_names"], json!(["admin", "user"]));
        let claims = state
            .jwt
            .verify_token(body["data"]["token"].as_str().unwrap())
            .into_claims()
            .unwrap();
        assert!(claims.admin);

        let (status, _) = call(
            &state,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "identity": "adminUser", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(
            &state,
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "identity": "nobody", "password": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // Self-registration cannot grant roles
        let (status, _) = call(
            &state,
            Method::POST,
            "/api/user",
            None,
            Some(json!({ "username": "eve", "email": "eve@example.com", "password": "pw", "roles": ["admin"] })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(
            &state,
            Method::POST,
            "/api/user",
            None,
            Some(json!({ "username": "ada", "email": "ada@example.com", "password": "pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["user"]["roles"], json!(["default"]));
        assert!(body["data"]["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_user_self_service() {
        let state = state().await;
        let (_, body) = call(
            &state,
            Method::POST,
            "/api/user",
            None,
            Some(json!({ "username": "ada", "email": "ada@example.com", "password": "pw" })),
        )
        .await;
        let ada_token = body["data"]["token"].as_str().unwrap().to_string();
        let ada_id = body["data"]["user"]["_id"].as_str().unwrap().to_string();
        let uri = format!("/api/user/{ada_id}");

        let (status, body) = call(
            &state,
            Method::PATCH,
            &uri,
            Some(&ada_token),
            Some(json!({ "names": "Ada L." })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["names"], "Ada L.");

        let (status, _) = call(
            &state,
            Method::PATCH,
            &uri,
            Some(&ada_token),
            Some(json!({ "roles": ["admin"] })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let stranger = token(&state, &["default"], false);
        let (status, _) = call(&state, Method::DELETE, &uri, Some(&stranger), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) =
            call(&state, Method::GET, "/api/user?username=ada", Some(&stranger), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["email"], "ada@example.com");

        let (status, _) = call(&state, Method::GET, "/api/user", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&state, Method::DELETE, &uri, Some(&ada_token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_role_lifecycle() {
        let state = state().await;
        let admin = token(&state, &["admin"], true);
        let member = token(&state, &["default"], false);

        let (status, _) = call(
            &state,
            Method::POST,
            "/api/role",
            Some(&member),
            Some(json!({ "tag": "editor", "name": "Editor" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(
            &state,
            Method::POST,
            "/api/role",
            Some(&admin),
            Some(json!({ "tag": "editor", "name": "Editor" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(
            &state,
            Method::PATCH,
            "/api/role/editor",
            Some(&admin),
            Some(json!({ "name": "Editors" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Editors");

        let (status, body) = call(&state, Method::GET, "/api/role", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);

        let (status, _) = call(&state, Method::DELETE, "/api/role/editor", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&state, Method::GET, "/api/role/editor", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_method_not_allowed_and_unknown_paths() {
        let state = state().await;
        let (status, _) = call(&state, Method::PUT, "/api/role", None, None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        let (status, _) = call(&state, Method::GET, "/elsewhere", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&state, Method::GET, "/api/events/a/b", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
