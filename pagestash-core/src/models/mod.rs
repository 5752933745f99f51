pub mod page;
pub mod row;
pub mod summary;
