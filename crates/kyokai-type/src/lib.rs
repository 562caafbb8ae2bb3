#![forbid(rust_2018_idioms)]
#![allow(forbidden_lint_groups)]

//! Domain records shared across the Kyokai crates
//!
//! Everything in here is the normalised shape the backend collaborator's
//! rows are mapped into at the boundary.

pub use self::comment::{Comment, NewComment};
pub use self::notification::{
    CategoryPresentation, NewNotification, Notification, NotificationCategory,
};
pub use self::post::{NewPost, Post, PostView};

pub mod comment;
pub mod notification;
pub mod post;
