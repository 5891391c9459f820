pub mod dispatch;
pub mod entity;
pub mod migrate;
pub mod registry;
pub mod relationship;
pub mod schema;
pub mod shared;
