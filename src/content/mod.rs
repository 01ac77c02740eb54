pub mod enforcer;
pub mod fallback;
pub mod limiter;
pub mod openai;
pub mod provider;
pub mod replay;
pub mod schema;
