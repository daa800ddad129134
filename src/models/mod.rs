// src/models/mod.rs

pub mod ai;
pub mod exam;
pub mod question;
pub mod result;
pub mod session;
pub mod user;
