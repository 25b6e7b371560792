pub mod member;
pub mod project;
pub mod token;
