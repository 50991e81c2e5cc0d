//! 用户管理服务库
//! JWT 访问令牌 + 轮换式刷新令牌的用户 CRUD API

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
pub mod telemetry;
