//! Mock 传感器 API
//!
//! 用于无真实 API 环境的测试。

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use contracts::{Device, Event, Project, SensorApi, Spot, SyncError, Zone};
use tracing::debug;

use crate::window::FetchWindow;

/// 一次事件查询的记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub project_id: String,
    pub pomid: String,
    /// 截断后的有效窗口
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// 内存中的传感器 API
///
/// 与真实客户端一致：事件窗口同样截断到 7 天，且按时间升序返回。
#[derive(Debug, Default)]
pub struct MockSensorApi {
    projects: BTreeMap<String, Project>,
    zones: BTreeMap<String, BTreeMap<String, Zone>>,
    devices: BTreeMap<(String, String), BTreeMap<String, Device>>,
    spots: BTreeMap<String, BTreeMap<String, Spot>>,
    events: BTreeMap<String, Vec<Event>>,
    failing_listings: Vec<String>,
    queries: Mutex<Vec<EventQuery>>,
}

impl MockSensorApi {
    /// 创建空的 Mock API
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加项目
    pub fn with_project(mut self, project: Project) -> Self {
        self.projects.insert(project.projectid.clone(), project);
        self
    }

    /// 添加区域
    pub fn with_zone(mut self, project_id: &str, zone: Zone) -> Self {
        self.zones
            .entry(project_id.to_string())
            .or_default()
            .insert(zone.zoneid.clone(), zone);
        self
    }

    /// 添加设备，未指定 zoneid 时使用所在区域
    pub fn with_device(mut self, project_id: &str, zone_id: &str, mut device: Device) -> Self {
        device.zoneid.get_or_insert_with(|| zone_id.to_string());
        self.devices
            .entry((project_id.to_string(), zone_id.to_string()))
            .or_default()
            .insert(device.elementid.clone(), device);
        self
    }

    /// 添加车位
    pub fn with_spot(mut self, project_id: &str, spot: Spot) -> Self {
        self.spots
            .entry(project_id.to_string())
            .or_default()
            .insert(spot.pomid.clone(), spot);
        self
    }

    /// 设置车位事件
    pub fn with_events(mut self, pomid: &str, events: Vec<Event>) -> Self {
        self.events.entry(pomid.to_string()).or_default().extend(events);
        self
    }

    /// 让某个列表接口返回 500 (如 "projects", "zones", "devices", "spots")
    pub fn failing_listing(mut self, listing: &str) -> Self {
        self.failing_listings.push(listing.to_string());
        self
    }

    /// 已执行的事件查询
    pub fn queries(&self) -> Vec<EventQuery> {
        match self.queries.lock() {
            Ok(queries) => queries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn check_listing(&self, listing: &str, path: String) -> Result<(), SyncError> {
        if self.failing_listings.iter().any(|l| l == listing) {
            return Err(SyncError::endpoint(path, 500, "mock failure"));
        }
        Ok(())
    }
}

impl SensorApi for MockSensorApi {
    async fn projects(&self) -> Result<BTreeMap<String, Project>, SyncError> {
        self.check_listing("projects", "projects".into())?;
        Ok(self.projects.clone())
    }

    async fn zones(&self, project_id: &str) -> Result<BTreeMap<String, Zone>, SyncError> {
        self.check_listing("zones", format!("projects/{project_id}/zones"))?;
        Ok(self.zones.get(project_id).cloned().unwrap_or_default())
    }

    async fn devices(
        &self,
        project_id: &str,
        zone_id: &str,
    ) -> Result<BTreeMap<String, Device>, SyncError> {
        self.check_listing(
            "devices",
            format!("projects/{project_id}/zones/{zone_id}/devices"),
        )?;
        Ok(self
            .devices
            .get(&(project_id.to_string(), zone_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn spots(&self, project_id: &str) -> Result<BTreeMap<String, Spot>, SyncError> {
        self.check_listing("spots", format!("projects/{project_id}/spots"))?;
        Ok(self.spots.get(project_id).cloned().unwrap_or_default())
    }

    async fn events(
        &self,
        project_id: &str,
        pomid: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Event> {
        let window = FetchWindow::clamped(from, to);
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(EventQuery {
                project_id: project_id.to_string(),
                pomid: pomid.to_string(),
                from: window.from,
                to: window.to,
            });
        }

        let mut events: Vec<Event> = self
            .events
            .get(pomid)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.timestamp >= window.from && e.timestamp <= window.to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        events.sort_by_key(|e| e.timestamp);

        debug!(pomid = %pomid, count = events.len(), "mock events served");
        events
    }
}
