//! Web front end for the redirector service.

pub mod meta;
pub mod routes;
pub mod status;

pub use routes::create_router;
