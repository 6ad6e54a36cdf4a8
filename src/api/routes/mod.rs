//! 按资源分组的路由

pub mod admin;
pub mod analytics;
pub mod aptitude;
pub mod assessments;
pub mod assignments;
pub mod auth;
pub mod questions;
pub mod users;
