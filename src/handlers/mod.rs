// src/handlers/mod.rs

pub mod admin;
pub mod ai;
pub mod auth;
pub mod exams;
pub mod questions;
pub mod results;
pub mod sessions;
