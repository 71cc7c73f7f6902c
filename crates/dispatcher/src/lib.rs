//! # Dispatcher
//!
//! 上下文存储写入模块。
//!
//! 负责：
//! - Keystone 认证与按租户的令牌状态 (Unauthenticated → Authenticated → Expired)
//! - Orion 实体读取 (`GET /v2/entities/{id}`)
//! - 批量追加写入 (`POST /v2/op/update`)，含有限次重试与节流
//! - Dry-run 与内存存储实现

pub mod auth;
pub mod client;
pub mod dispatcher;
pub mod metrics;
pub mod stores;

pub use auth::{TokenRegistry, TokenState};
pub use client::ContextBrokerClient;
pub use contracts::{Entity, EntityStore};
pub use dispatcher::{create_dispatcher, Dispatcher};
pub use metrics::{StoreMetrics, StoreMetricsSnapshot};
pub use stores::{DryRunStore, MemoryStore, RecordedBatch};
