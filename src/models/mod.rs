//! 数据模型模块
//! 纯数据结构，由 repository 层读写

pub mod auth;
pub mod refresh_token;
pub mod user;
