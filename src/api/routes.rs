//! API routes

use crate::api::handlers::{
    add_comment, add_user_book, create_book, delete_book, delete_comment, delete_user_book,
    get_book, get_chapter, get_comment, get_me, get_user_by_username, health_check, list_books,
    list_comments, list_user_books, register_admin, register_user, swagger_doc, update_book,
    update_comment, update_me, update_user_book, AppState,
};
use crate::auth::handlers::{create_authentication_token, delete_authentication_tokens};
use crate::auth::middleware::{authenticate, require_admin, require_user};
use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};

/// Build the API routes.
///
/// Every request passes through [`authenticate`]; the user and admin groups
/// additionally carry a guard so anonymous or under-privileged callers are
/// turned away before the handler runs.
pub fn build_api_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/swagger/doc.json", get(swagger_doc))
        .route("/users", get(get_user_by_username).post(register_user))
        .route("/tokens/authentication", post(create_authentication_token))
        .route("/books", get(list_books))
        .route("/books/:id", get(get_book))
        .route("/chapters/:chapter_id", get(get_chapter))
        .route("/chapters/:chapter_id/comments", get(list_comments))
        .route("/chapters/:chapter_id/comments/:id", get(get_comment));

    let user_routes = Router::new()
        .route("/me", get(get_me).patch(update_me))
        .route(
            "/tokens/authentication",
            axum::routing::delete(delete_authentication_tokens),
        )
        .route("/chapters/:chapter_id/comments", post(add_comment))
        .route(
            "/chapters/:chapter_id/comments/:id",
            put(update_comment).delete(delete_comment),
        )
        .route(
            "/users/:user_id/books",
            get(list_user_books).post(add_user_book),
        )
        .route(
            "/user-books/:id",
            patch(update_user_book).delete(delete_user_book),
        )
        .route_layer(middleware::from_fn(require_user));

    let admin_routes = Router::new()
        .route("/admins", post(register_admin))
        .route("/books", post(create_book))
        .route("/books/:id", put(update_book).delete(delete_book))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .with_state(state)
}
