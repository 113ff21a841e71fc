//! Request and response bodies of the REST API
//!
//! Store models are serialized as-is where they already have the wire shape;
//! the types here cover requests, query strings and paginated envelopes.

pub mod books;
pub mod comments;
pub mod common;
pub mod user_books;
pub mod users;

pub use books::*;
pub use comments::*;
pub use common::*;
pub use user_books::*;
pub use users::*;
