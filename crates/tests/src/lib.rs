//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 基于 wiremock 的端到端同步（传感器 API + Keystone + Orion）
//! - 配置文件加载到同步运行

#[cfg(test)]
mod contract_tests {
    use contracts::{Attribute, BatchRequest, Entity, EntityUpdate, GeoJson, ParkingStatus};
    use serde_json::json;

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_entity_update_snapshot() {
        let ts = "2024-03-01T10:00:00Z".parse().unwrap();
        let update = EntityUpdate {
            id: "pomid:10".into(),
            entity_type: contracts::PARKING_SPOT_TYPE.into(),
            time_instant: Attribute::date_time(ts),
            occupancy_modified: Attribute::date_time(ts),
            name: Attribute::text("Carrer Major 1"),
            status: Attribute::new("Text", ParkingStatus::Free),
            ref_on_street_parking: Attribute::text("zoneid:7"),
            ref_device: Attribute::text("elementid:E1"),
            location: Attribute::geo_json(GeoJson::Point {
                coordinates: [2.0, 41.0],
            }),
            occupied: Attribute::new("Number", Some(0)),
        };
        let entities = [Entity::from(update)];

        assert_eq!(
            serde_json::to_value(BatchRequest::append(&entities)).unwrap(),
            json!({
                "actionType": "append",
                "entities": [{
                    "id": "pomid:10",
                    "type": "ParkingSpot",
                    "TimeInstant": { "type": "DateTime", "value": "2024-03-01T10:00:00Z" },
                    "occupancyModified": { "type": "DateTime", "value": "2024-03-01T10:00:00Z" },
                    "name": { "type": "Text", "value": "Carrer Major 1" },
                    "status": { "type": "Text", "value": "free" },
                    "refOnStreetParking": { "type": "Text", "value": "zoneid:7" },
                    "refDevice": { "type": "Text", "value": "elementid:E1" },
                    "location": {
                        "type": "geo:json",
                        "value": { "type": "Point", "coordinates": [2.0, 41.0] }
                    },
                    "occupied": { "type": "Number", "value": 0 }
                }]
            })
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use chrono::{DateTime, Duration, Utc};
    use contracts::{ContextStoreConfig, RateLimitConfig, SensorApiConfig, SyncError, SyncSettings};
    use dispatcher::create_dispatcher;
    use ingestion::SensorApiClient;
    use serde_json::{json, Value};
    use sync_engine::SyncEngine;
    use wiremock::matchers::{header, method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TENANT: &str = "/parking";

    fn sensor_config(server: &MockServer) -> SensorApiConfig {
        SensorApiConfig {
            endpoint: server.uri(),
            organism: "org".into(),
            username: "user".into(),
            password: "pw".into(),
            request_timeout_secs: 5,
            rate_limit: RateLimitConfig::default(),
        }
    }

    fn store_config(server: &MockServer) -> ContextStoreConfig {
        ContextStoreConfig {
            keystone_url: server.uri(),
            orion_url: server.uri(),
            service: "smartcity".into(),
            subservice: TENANT.into(),
            username: "op".into(),
            password: "secret".into(),
            request_timeout_secs: 5,
        }
    }

    /// No sleeps between attempts or batches
    fn settings(retries: u32) -> SyncSettings {
        SyncSettings {
            retries,
            retry_sleep_secs: 0,
            pace_ms: 0,
            ..SyncSettings::default()
        }
    }

    /// One project, one zone, one device, two spots (one without device)
    async fn mount_sensor_api(server: &MockServer, now: DateTime<Utc>) {
        let base = "/v2/organisms/org";
        Mock::given(method("GET"))
            .and(path("/v2/auth/org/user/pw"))
            .respond_with(ResponseTemplate::new(200).set_body_string("\"sensor-token\""))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{base}/projects")))
            .and(header(ingestion::IDENTITY_HEADER, "sensor-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "projectid": 1, "name": "Centre", "timezone": "Europe/Madrid" }
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{base}/projects/1/zones")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "zoneid": 7, "description": "Main street",
                  "lat_ne": "41.01", "lat_sw": "41.0", "long_ne": "2.01", "long_sw": "2.0" }
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{base}/projects/1/zones/7/devices")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "elementid": "E1" }
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{base}/projects/1/spots")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "pomid": 10, "name": "Carrer Major 1", "latitude": "41.0", "longitude": "2.0", "elementid": "E1" },
                { "pomid": 11, "name": "Carrer Major 2", "latitude": "41.1", "longitude": "2.1", "elementid": null }
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{base}/projects/1/spots/10/phenomenons/vehicle_ctrl")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "pomid": 10,
                "measurements": [
                    { "lstamp": (now - Duration::hours(3)).timestamp_millis(), "value": 1 },
                    { "lstamp": (now - Duration::hours(2)).timestamp_millis(), "value": 0 },
                    { "lstamp": (now - Duration::hours(1)).timestamp_millis(), "value": -1 }
                ]
            }])))
            .mount(server)
            .await;
    }

    async fn mount_keystone(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(
                ResponseTemplate::new(201).insert_header("X-Subject-Token", "store-token"),
            )
            .mount(server)
            .await;
    }

    async fn mount_entity_lookup(server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path_regex("^/v2/entities/"))
            .respond_with(response)
            .mount(server)
            .await;
    }

    /// Entities of every batch the store received, in order
    async fn posted_batches(server: &MockServer) -> Vec<Vec<Value>> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == "/v2/op/update")
            .map(|r| {
                let body: Value = serde_json::from_slice(&r.body).unwrap();
                assert_eq!(body["actionType"], "append");
                body["entities"].as_array().cloned().unwrap_or_default()
            })
            .collect()
    }

    /// End-to-end test: sensor API -> SyncEngine -> Orion
    ///
    /// 验证完整的数据流：
    /// 1. 登录两个服务
    /// 2. 发现项目 / 区域 / 设备 / 车位
    /// 3. 拉取事件并转换为 ParkingSpot 更新
    /// 4. 分批写入 Orion
    #[tokio::test]
    async fn test_e2e_sync_run() {
        let now = Utc::now();
        let sensor = MockServer::start().await;
        let store = MockServer::start().await;
        mount_sensor_api(&sensor, now).await;
        mount_keystone(&store).await;
        mount_entity_lookup(&store, ResponseTemplate::new(404)).await;
        Mock::given(method("POST"))
            .and(path("/v2/op/update"))
            .and(header("Fiware-Service", "smartcity"))
            .and(header("Fiware-ServicePath", TENANT))
            .and(header("X-Auth-Token", "store-token"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&store)
            .await;

        let dispatcher =
            create_dispatcher(&store_config(&store), settings(0).retry_policy(), false).unwrap();
        dispatcher.authenticate(TENANT).await.unwrap();
        let api = SensorApiClient::login(&sensor_config(&sensor)).await.unwrap();

        let mut engine = SyncEngine::new(api, dispatcher, TENANT, settings(0));
        let report = engine.run(now).await.unwrap();

        assert_eq!(report.projects, 1);
        assert_eq!(report.zones, 1);
        assert_eq!(report.spots_discovered, 2);
        assert_eq!(report.spots_skipped, 1);
        assert_eq!(report.spots_synced, 1);
        assert_eq!(report.events_fetched, 3);
        assert_eq!(report.updates_sent, 3);

        // one spot: each update has to travel in its own batch
        let batches = posted_batches(&store).await;
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.len() == 1));

        let first = &batches[0][0];
        assert_eq!(first["id"], "pomid:10");
        assert_eq!(first["type"], "ParkingSpot");
        assert_eq!(first["status"]["value"], "occupied");
        assert_eq!(first["refOnStreetParking"]["value"], "zoneid:7");
        assert_eq!(first["refDevice"]["value"], "elementid:E1");
        assert_eq!(first["location"]["value"]["coordinates"], json!([2.0, 41.0]));

        let last = &batches[2][0];
        assert_eq!(last["status"]["value"], "unknown");
        assert_eq!(last["occupied"]["value"], Value::Null);
    }

    #[tokio::test]
    async fn test_e2e_stored_watermark_bounds_fetch() {
        let now = Utc::now();
        let watermark = now - Duration::minutes(150);
        let sensor = MockServer::start().await;
        let store = MockServer::start().await;
        mount_sensor_api(&sensor, now).await;
        mount_keystone(&store).await;
        mount_entity_lookup(
            &store,
            ResponseTemplate::new(200).set_body_json(json!({
                "id": "pomid:10",
                "type": "ParkingSpot",
                "occupancyModified": { "type": "DateTime", "value": watermark.to_rfc3339() }
            })),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/v2/op/update"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&store)
            .await;

        let dispatcher =
            create_dispatcher(&store_config(&store), settings(0).retry_policy(), false).unwrap();
        let api = SensorApiClient::login(&sensor_config(&sensor)).await.unwrap();
        let mut engine = SyncEngine::new(api, dispatcher, TENANT, settings(0));
        engine.run(now).await.unwrap();

        let event_queries: Vec<_> = sensor
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path().ends_with("vehicle_ctrl"))
            .collect();
        assert_eq!(event_queries.len(), 1);
        let start = event_queries[0]
            .url
            .query_pairs()
            .find(|(k, _)| k == "start")
            .map(|(_, v)| v.to_string())
            .unwrap();
        assert_eq!(start, watermark.timestamp().to_string());
    }

    #[tokio::test]
    async fn test_e2e_token_renewal_on_401() {
        let now = Utc::now();
        let sensor = MockServer::start().await;
        let store = MockServer::start().await;
        mount_sensor_api(&sensor, now).await;
        mount_keystone(&store).await;
        mount_entity_lookup(&store, ResponseTemplate::new(404)).await;
        Mock::given(method("POST"))
            .and(path("/v2/op/update"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&store)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/op/update"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&store)
            .await;

        let dispatcher =
            create_dispatcher(&store_config(&store), settings(0).retry_policy(), false).unwrap();
        let store_metrics = dispatcher.metrics();
        let api = SensorApiClient::login(&sensor_config(&sensor)).await.unwrap();
        let mut engine = SyncEngine::new(api, dispatcher, TENANT, settings(0));
        let report = engine.run(now).await.unwrap();

        assert_eq!(report.batches_sent, 3);
        let snapshot = store_metrics.snapshot();
        assert_eq!(snapshot.renewals, 1);
        assert_eq!(snapshot.batches_sent, 3);
    }

    #[tokio::test]
    async fn test_e2e_store_fault_is_fatal() {
        let now = Utc::now();
        let sensor = MockServer::start().await;
        let store = MockServer::start().await;
        mount_sensor_api(&sensor, now).await;
        mount_keystone(&store).await;
        mount_entity_lookup(&store, ResponseTemplate::new(404)).await;
        Mock::given(method("POST"))
            .and(path("/v2/op/update"))
            .respond_with(ResponseTemplate::new(500).set_body_string("orion down"))
            .expect(3)
            .mount(&store)
            .await;

        let dispatcher =
            create_dispatcher(&store_config(&store), settings(2).retry_policy(), false).unwrap();
        let api = SensorApiClient::login(&sensor_config(&sensor)).await.unwrap();
        let mut engine = SyncEngine::new(api, dispatcher, TENANT, settings(2));
        let err = engine.run(now).await.unwrap_err();

        match err {
            SyncError::NetworkFault { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "orion down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_e2e_dry_run_reads_but_never_writes() {
        let now = Utc::now();
        let sensor = MockServer::start().await;
        let store = MockServer::start().await;
        mount_sensor_api(&sensor, now).await;
        mount_keystone(&store).await;
        mount_entity_lookup(&store, ResponseTemplate::new(404)).await;
        Mock::given(method("POST"))
            .and(path("/v2/op/update"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&store)
            .await;

        let dispatcher =
            create_dispatcher(&store_config(&store), settings(0).retry_policy(), true).unwrap();
        let api = SensorApiClient::login(&sensor_config(&sensor)).await.unwrap();
        let mut engine = SyncEngine::new(api, dispatcher, TENANT, settings(0));
        let report = engine.run(now).await.unwrap();
        assert_eq!(report.updates_sent, 3);
    }

    #[tokio::test]
    async fn test_e2e_sensor_login_rejected() {
        let sensor = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/auth/org/user/pw"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&sensor)
            .await;
        let err = SensorApiClient::login(&sensor_config(&sensor)).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, SyncError::Authentication { .. }));
    }

    #[tokio::test]
    async fn test_e2e_event_query_covers_lookback() {
        let now = Utc::now();
        let sensor = MockServer::start().await;
        let store = MockServer::start().await;
        mount_sensor_api(&sensor, now).await;
        mount_keystone(&store).await;
        mount_entity_lookup(&store, ResponseTemplate::new(404)).await;
        Mock::given(method("POST"))
            .and(path("/v2/op/update"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&store)
            .await;

        let dispatcher =
            create_dispatcher(&store_config(&store), settings(0).retry_policy(), false).unwrap();
        let api = SensorApiClient::login(&sensor_config(&sensor)).await.unwrap();
        let mut engine = SyncEngine::new(api, dispatcher, TENANT, settings(0));
        engine.run(now).await.unwrap();

        let expected_start = (now - Duration::days(1)).timestamp().to_string();
        let matched = sensor
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .any(|r| {
                r.url.path().ends_with("vehicle_ctrl")
                    && r.url.query_pairs().any(|(k, v)| k == "start" && v == expected_start)
            });
        assert!(matched, "event query should start one day back");
    }
}

#[cfg(test)]
mod config_tests {
    use std::io::Write;

    use chrono::{TimeZone, Utc};
    use config_loader::ConfigLoader;
    use contracts::{Device, Event, Project, Spot, Zone};
    use dispatcher::MemoryStore;
    use ingestion::MockSensorApi;
    use sync_engine::SyncEngine;

    const CONFIG: &str = r#"
[sensor_api]
organism = "org"
username = "user"
password = "pw"

[context_store]
keystone_url = "https://auth.example.org:15001"
orion_url = "https://context.example.org:1026"
service = "smartcity"
subservice = "/parking"
username = "op"
password = "secret"

[sync]
batch_size = 2
zones = true
"#;

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let blueprint = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(blueprint.sync.batch_size, 2);
        assert!(blueprint.sync.zones);
        assert!(config_loader::validate_credentials(&blueprint).is_ok());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        assert!(ConfigLoader::load_from_path(file.path()).is_err());
    }

    /// 配置文件 -> MockSensorApi -> SyncEngine -> MemoryStore
    #[tokio::test]
    async fn test_config_file_drives_run() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let blueprint = ConfigLoader::load_from_path(file.path()).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let at = |h| Utc.with_ymd_and_hms(2024, 3, 1, h, 0, 0).unwrap();
        let spot = |pomid: &str, lat: f64| Spot {
            pomid: pomid.into(),
            name: format!("spot {pomid}"),
            latitude: lat,
            longitude: 2.0,
            elementid: Some("E1".into()),
        };
        let api = MockSensorApi::new()
            .with_project(Project {
                projectid: "1".into(),
                name: "Centre".into(),
                description: String::new(),
                timezone: String::new(),
            })
            .with_zone(
                "1",
                Zone {
                    zoneid: "7".into(),
                    description: "Main street".into(),
                    lat_ne: 41.01,
                    lat_sw: 41.0,
                    long_ne: 2.01,
                    long_sw: 2.0,
                },
            )
            .with_device(
                "1",
                "7",
                Device {
                    elementid: "E1".into(),
                    zoneid: None,
                },
            )
            .with_spot("1", spot("10", 41.001))
            .with_spot("1", spot("11", 41.002))
            .with_spot("1", spot("12", 41.003))
            .with_events("10", vec![Event { pomid: "10".into(), timestamp: at(9), value: 1 }])
            .with_events("11", vec![Event { pomid: "11".into(), timestamp: at(10), value: 0 }])
            .with_events("12", vec![Event { pomid: "12".into(), timestamp: at(11), value: 1 }]);

        let tenant = blueprint.context_store.subservice.clone();
        let mut engine = SyncEngine::new(api, MemoryStore::new(), tenant, blueprint.sync.clone());
        let report = engine.run(now).await.unwrap();

        assert_eq!(report.updates_sent, 3);
        assert_eq!(report.zone_entities_sent, 1);
        // batch_size 2: [10, 11] [12] then the zone
        let batches = engine.store().batches();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].entities.len(), 2);
        assert!(engine.store().entity("/parking", "zoneid:7").is_some());
    }
}
