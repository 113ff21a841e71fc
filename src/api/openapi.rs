//! OpenAPI 3 description of the REST API, served at /swagger/doc.json

use crate::core::error::{AppError, Result};
use openapiv3::OpenAPI;
use serde_json::{json, Map, Value};

struct Op {
    method: &'static str,
    path: &'static str,
    tag: &'static str,
    summary: &'static str,
    secured: bool,
    responses: &'static [(u16, &'static str)],
}

const OPERATIONS: &[Op] = &[
    Op { method: "get", path: "/health", tag: "system", summary: "Liveness probe", secured: false, responses: &[(200, "Service is up")] },
    Op { method: "post", path: "/users", tag: "users", summary: "Register a user", secured: false, responses: &[(200, "Created account"), (400, "Validation failed"), (409, "Username or email taken")] },
    Op { method: "get", path: "/users", tag: "users", summary: "Look up a user by username", secured: false, responses: &[(200, "The user"), (400, "Missing username"), (404, "Unknown user")] },
    Op { method: "post", path: "/admins", tag: "users", summary: "Register an admin", secured: true, responses: &[(200, "Created account"), (400, "Validation failed"), (403, "Not an admin"), (409, "Username or email taken")] },
    Op { method: "get", path: "/me", tag: "users", summary: "Current account", secured: true, responses: &[(200, "The caller"), (401, "Not logged in")] },
    Op { method: "patch", path: "/me", tag: "users", summary: "Change username or email", secured: true, responses: &[(200, "Updated account"), (400, "Validation failed"), (401, "Not logged in"), (409, "Username or email taken")] },
    Op { method: "post", path: "/tokens/authentication", tag: "tokens", summary: "Log in", secured: false, responses: &[(201, "Bearer token"), (400, "Malformed body"), (401, "Invalid credentials")] },
    Op { method: "delete", path: "/tokens/authentication", tag: "tokens", summary: "Log out everywhere", secured: true, responses: &[(204, "Tokens revoked"), (401, "Not logged in")] },
    Op { method: "get", path: "/books", tag: "books", summary: "List books", secured: false, responses: &[(200, "One page of books"), (400, "Invalid pagination parameters")] },
    Op { method: "post", path: "/books", tag: "books", summary: "Add a book", secured: true, responses: &[(200, "Created book"), (400, "Validation failed"), (403, "Not an admin"), (409, "Duplicate ISBN")] },
    Op { method: "get", path: "/books/{id}", tag: "books", summary: "Get a book", secured: false, responses: &[(200, "The book"), (400, "Invalid id"), (404, "Unknown book")] },
    Op { method: "put", path: "/books/{id}", tag: "books", summary: "Replace a book", secured: true, responses: &[(200, "Updated book"), (400, "Validation failed"), (403, "Not an admin"), (404, "Unknown book"), (409, "Duplicate ISBN")] },
    Op { method: "delete", path: "/books/{id}", tag: "books", summary: "Delete a book", secured: true, responses: &[(204, "Deleted"), (403, "Not an admin"), (404, "Unknown book")] },
    Op { method: "get", path: "/chapters/{chapter_id}", tag: "chapters", summary: "Get a chapter", secured: false, responses: &[(200, "The chapter"), (404, "Unknown chapter")] },
    Op { method: "get", path: "/chapters/{chapter_id}/comments", tag: "comments", summary: "List a chapter's comments", secured: false, responses: &[(200, "One page of comments"), (404, "Unknown chapter")] },
    Op { method: "post", path: "/chapters/{chapter_id}/comments", tag: "comments", summary: "Comment on a chapter", secured: true, responses: &[(200, "Created comment"), (400, "Empty body"), (401, "Not logged in"), (404, "Unknown chapter")] },
    Op { method: "get", path: "/chapters/{chapter_id}/comments/{id}", tag: "comments", summary: "Get a comment", secured: false, responses: &[(200, "The comment"), (400, "Comment belongs to another chapter"), (404, "Unknown comment")] },
    Op { method: "put", path: "/chapters/{chapter_id}/comments/{id}", tag: "comments", summary: "Edit a comment", secured: true, responses: &[(200, "Updated comment"), (403, "Not the author"), (404, "Unknown comment")] },
    Op { method: "delete", path: "/chapters/{chapter_id}/comments/{id}", tag: "comments", summary: "Delete a comment", secured: true, responses: &[(204, "Deleted"), (403, "Neither author nor admin"), (404, "Unknown comment")] },
    Op { method: "get", path: "/users/{user_id}/books", tag: "user-books", summary: "A reader's list", secured: true, responses: &[(200, "One page of entries"), (400, "Invalid status"), (403, "Someone else's list")] },
    Op { method: "post", path: "/users/{user_id}/books", tag: "user-books", summary: "Put a book on a reader's list", secured: true, responses: &[(200, "Created entry"), (400, "Invalid book id or status"), (404, "Unknown book"), (409, "Already on the list")] },
    Op { method: "patch", path: "/user-books/{id}", tag: "user-books", summary: "Update status or progress", secured: true, responses: &[(200, "Updated entry"), (400, "Validation failed"), (404, "Unknown entry")] },
    Op { method: "delete", path: "/user-books/{id}", tag: "user-books", summary: "Remove an entry", secured: true, responses: &[(204, "Deleted"), (404, "Unknown entry")] },
];

fn path_parameters(path: &str) -> Vec<Value> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .map(|name| {
            json!({
                "name": name,
                "in": "path",
                "required": true,
                "schema": {"type": "integer", "format": "int64"}
            })
        })
        .collect()
}

fn operation(op: &Op) -> Value {
    let responses: Map<String, Value> = op
        .responses
        .iter()
        .map(|(code, description)| {
            let mut response = json!({ "description": description });
            if *code != 204 {
                let schema = if *code >= 400 {
                    json!({"$ref": "#/components/schemas/Error"})
                } else {
                    json!({"type": "object"})
                };
                response["content"] = json!({"application/json": {"schema": schema}});
            }
            (code.to_string(), response)
        })
        .collect();

    let mut value = json!({
        "tags": [op.tag],
        "summary": op.summary,
        "parameters": path_parameters(op.path),
        "responses": responses,
    });
    if op.secured {
        value["security"] = json!([{"bearerAuth": []}]);
    }
    value
}

/// Build the document and check that it parses as OpenAPI 3
pub fn api_document() -> Result<OpenAPI> {
    let mut paths = Map::new();
    for op in OPERATIONS {
        let item = paths
            .entry(op.path.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        item[op.method] = operation(op);
    }

    let doc = json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Book Club API",
            "description": "Catalogue, chapter discussions and reading lists",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": paths,
        "components": {
            "securitySchemes": {
                "bearerAuth": {"type": "http", "scheme": "bearer"}
            },
            "schemas": {
                "Error": {
                    "type": "object",
                    "required": ["error", "message", "trace_id"],
                    "properties": {
                        "error": {"type": "string"},
                        "message": {"type": "string"},
                        "trace_id": {"type": "string"}
                    }
                }
            }
        }
    });

    serde_json::from_value(doc)
        .map_err(|e| AppError::InternalError(format!("invalid OpenAPI document: {}", e)))
}
