pub mod app;
pub mod board;
pub mod comments;
pub mod detail;
pub mod filter;
pub mod format;
pub mod map;
pub mod session;
pub mod taxonomy;
pub mod utils;
pub mod votes;

pub mod schema {
    pub mod api;
    pub mod model;
    pub mod source;
}

pub mod api {
    pub mod endpoints;
    pub mod source;
    pub mod store;
}
