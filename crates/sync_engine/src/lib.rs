//! # Sync Engine
//!
//! 停车位占用状态同步引擎。
//!
//! 负责：
//! - 发现项目 / 区域 / 设备 / 车位
//! - 按车位水位线拉取事件并转换为 NGSI 实体
//! - 轮询合并各车位更新，分批写入上下文存储
//! - 可选：区域聚合实体 (`OnStreetParking`)
//!
//! ## 使用示例
//!
//! ```ignore
//! use sync_engine::SyncEngine;
//!
//! let mut engine = SyncEngine::new(api, store, "/parking", blueprint.sync);
//! let report = engine.run(Utc::now()).await?;
//! println!("{}", engine.summary());
//! ```

mod batch;
mod engine;
mod geometry;
mod inventory;
mod rotate;
mod transform;
mod watermark;

pub use batch::partition;
pub use engine::SyncEngine;
pub use geometry::{coverage_rectangle, BUFFER_DEGREES};
pub use inventory::{discover, Inventory, ProjectInventory, SkipReason, SkippedSpot, SpotPlan};
pub use rotate::{rotate, RoundRobin};
pub use transform::{spot_updates, to_entity_update, to_zone_entity};
pub use watermark::resolve_watermark;

// Re-export contracts types
pub use contracts::{SyncReport, SyncSettings};
