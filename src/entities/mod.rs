pub mod prelude;

pub mod items;
pub mod users;
