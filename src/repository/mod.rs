//! Database repository layer
//! 每个函数都接收显式的连接句柄：连接池中取出的连接或 `&mut *transaction`

pub mod refresh_token_repo;
pub mod user_repo;
