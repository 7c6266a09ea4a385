//! Custom `axum::`[`extract`]ors used by the handlers.
//!
//! [`extract`]: axum::extract

mod current_user;

pub use self::current_user::CurrentUser;
