#![forbid(rust_2018_idioms)]
#![allow(forbidden_lint_groups)]

#[macro_use]
extern crate tracing;

pub mod bell;
pub mod forum;
pub mod notification;
pub mod toast;

const MAX_FETCH_LIMIT: usize = 100;

pub struct LimitContext {
    limit: usize,
}

impl Default for LimitContext {
    fn default() -> Self {
        Self {
            limit: MAX_FETCH_LIMIT,
        }
    }
}
