//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 -> 回放 -> 融合 e2e 测试（虚拟时间，无需真实设备）
//! - 实时数据源节流与通道配置保护

#[cfg(test)]
mod contract_tests {
    use contracts::{AveragingPolicy, ChannelKind, PipelineConfig, TICKS_PER_SECOND};

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_default_pipeline_config_snapshot() {
        let config = PipelineConfig::default();
        let channels: Vec<_> = config
            .channels
            .iter()
            .map(|(kind, c)| (kind, c.capacity, c.policy, c.min_notify_interval_ms))
            .collect();

        assert_eq!(
            channels,
            vec![
                (ChannelKind::Acceleration, Some(1000), AveragingPolicy::RecencyWeighted, 100),
                (ChannelKind::Orientation, Some(1000), AveragingPolicy::RecencyWeighted, 100),
                (ChannelKind::Location, Some(1000), AveragingPolicy::RecencyWeighted, 100),
                (ChannelKind::Heading, Some(1000), AveragingPolicy::MostRecent, 100),
            ]
        );
        assert_eq!(config.session.fused_min_interval_ms, 0);
        assert_eq!(TICKS_PER_SECOND, 10_000_000);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use approx::assert_abs_diff_eq;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        ChannelKind, FusionPhase, FusionSnapshot, Location, PipelineConfig, Quaternion, Vec3,
        TICKS_PER_SECOND,
    };
    use ingestion::{FeedSet, SampleSource};
    use observability::FusionStatsAggregator;
    use replay::Recording;

    const SESSION_TOML: &str = r#"
[session]
distance_units = "kilometers"

[channels.acceleration]
min_notify_interval_ms = 0
policy = { kind = "count_window", size = 3 }

[channels.orientation]
min_notify_interval_ms = 0
policy = { kind = "most_recent" }

[channels.location]
min_notify_interval_ms = 0

[channels.heading]
min_notify_interval_ms = 0

[replay]
directory = "unused"
speed = 10.0
"#;

    fn load_session(dir: &Path) -> PipelineConfig {
        let mut config = ConfigLoader::load_from_str(SESSION_TOML, ConfigFormat::Toml).unwrap();
        if let Some(replay) = config.replay.as_mut() {
            replay.directory = dir.to_path_buf();
        }
        config
    }

    fn seconds(n: i64) -> i64 {
        n * TICKS_PER_SECOND
    }

    /// Ten seconds of a device lying flat while the vehicle accelerates
    /// diagonally at 0.5 G.
    fn write_drive(dir: &Path) {
        let accel: Recording<Vec3> = (0..10)
            .map(|i| (seconds(i), Vec3::new(0.3, 0.4, 1.0)))
            .collect();
        accel.write(dir.join("acceleration.csv")).unwrap();

        let orientation: Recording<Quaternion> = (0..10)
            .map(|i| (seconds(i), Quaternion::IDENTITY))
            .collect();
        orientation.write(dir.join("orientation.csv")).unwrap();

        let location: Recording<Location> = (0..10)
            .map(|i| {
                let fix = Location::new(51.5 + i as f64 * 1e-4, -0.12, 30.0)
                    .with_motion(12.5, 45.0);
                (seconds(i), fix)
            })
            .collect();
        location.write(dir.join("location.json")).unwrap();

        let heading: Recording<f64> = (0..10).map(|i| (seconds(i), 45.0)).collect();
        heading.write(dir.join("heading.csv")).unwrap();
    }

    fn bind_all(feeds: &FeedSet, config: &PipelineConfig) {
        let replay = config.replay.as_ref().unwrap();
        let accel = Recording::<Vec3>::read(replay.path_for(ChannelKind::Acceleration)).unwrap();
        let orientation =
            Recording::<Quaternion>::read(replay.path_for(ChannelKind::Orientation)).unwrap();
        let location = Recording::<Location>::read(replay.directory.join("location.json")).unwrap();
        let heading = Recording::<f64>::read(replay.path_for(ChannelKind::Heading)).unwrap();

        feeds.bind(SampleSource::Replay(accel.into_session())).unwrap();
        feeds.bind(SampleSource::Replay(orientation.into_session())).unwrap();
        feeds.bind(SampleSource::Replay(location.into_session())).unwrap();
        feeds.bind(SampleSource::Replay(heading.into_session())).unwrap();
    }

    /// End-to-end test: config -> recordings -> FeedSet -> FusionEngine
    ///
    /// 验证完整的数据流：
    /// 1. ConfigLoader 解析会话配置
    /// 2. 四个通道的录制文件按 10 倍速回放
    /// 3. FusionEngine 输出地面坐标系加速度与运动信息
    #[tokio::test(start_paused = true)]
    async fn test_e2e_replay_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        write_drive(dir.path());
        let config = load_session(dir.path());

        let feeds = FeedSet::from_config(&config);
        let aggregator = Arc::new(Mutex::new(FusionStatsAggregator::new()));
        let sink = aggregator.clone();
        feeds.on_fused_update(Arc::new(move |snapshot: &FusionSnapshot| {
            sink.lock().unwrap().update(snapshot);
        }));

        let started = tokio::time::Instant::now();
        bind_all(&feeds, &config);
        let delivered = feeds.wait_replays().await;
        let elapsed = started.elapsed();

        // 9 s of recording at 10x
        assert!(elapsed >= Duration::from_millis(900), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(2), "{elapsed:?}");

        for kind in ChannelKind::ALL {
            assert_eq!(delivered[&kind], 10, "{kind}");
        }

        let snapshot = feeds.engine().snapshot();
        assert_eq!(snapshot.phase, FusionPhase::Active);
        assert_abs_diff_eq!(snapshot.state.horizontal_accel, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(snapshot.state.absolute_acceleration.z, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(snapshot.state.speed, 12.5, epsilon = 1e-12);
        assert_abs_diff_eq!(snapshot.state.angle_of_travel, 45.0, epsilon = 1e-12);
        assert_abs_diff_eq!(snapshot.state.heading, 45.0, epsilon = 1e-12);
        // Fixes are evenly spaced, so ground speed is constant
        assert_abs_diff_eq!(snapshot.state.accel_from_locations, 0.0, epsilon = 1e-6);

        let readings = feeds.engine().display_readings();
        assert_eq!(readings.accel_label, "kph /sec");
        assert_eq!(readings.speed_label, "kph");

        let summary = aggregator.lock().unwrap().summary();
        assert_eq!(summary.total_updates, 40);
        assert!(summary.partial_updates >= 3);
        assert_abs_diff_eq!(summary.horizontal_accel_g.max, 0.5, epsilon = 1e-9);

        // Replays ended, so channels accept configuration again
        let accel = feeds.channel::<Vec3>();
        assert!(!accel.is_monitoring());
        accel
            .set_policy(contracts::AveragingPolicy::MostRecent)
            .unwrap();
    }

    /// 设备绕 z 轴旋转 90°：水平加速度大小不变
    #[tokio::test(start_paused = true)]
    async fn test_e2e_rotated_device_keeps_horizontal_magnitude() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_session(dir.path());

        let half = std::f64::consts::FRAC_PI_4;
        let orientation: Recording<Quaternion> = (0..3)
            .map(|i| (seconds(i), Quaternion::new(0.0, 0.0, half.sin(), half.cos())))
            .collect();
        let accel: Recording<Vec3> = (0..3)
            .map(|i| (seconds(i), Vec3::new(1.0, 0.0, 0.0)))
            .collect();

        let feeds = FeedSet::from_config(&config);
        feeds
            .bind(SampleSource::Replay(orientation.into_session()))
            .unwrap();
        feeds
            .bind(SampleSource::Replay(accel.into_session()))
            .unwrap();
        feeds.wait_replays().await;

        let state = feeds.engine().snapshot().state;
        assert_abs_diff_eq!(state.horizontal_accel, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(state.absolute_acceleration.z, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(state.roll, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(state.pitch, 0.0, epsilon = 1e-9);
    }

    /// 实时采集 -> 录制 -> 回放：回放结果与实时一致
    #[tokio::test(start_paused = true)]
    async fn test_capture_then_replay_matches_live() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_session(dir.path());

        let live_feeds = FeedSet::from_config(&config);
        let accel = live_feeds.live::<Vec3>().unwrap();
        for i in 0..5 {
            accel.push_at(Vec3::new(0.1 * i as f64, 0.0, 1.0), seconds(i));
        }
        let live_value = live_feeds.channel::<Vec3>().current_value();

        let captured = Recording::from_buffer(&live_feeds.channel::<Vec3>().buffer_snapshot());
        assert_eq!(captured.len(), 5);
        let path = dir.path().join("captured.csv");
        captured.write(&path).unwrap();

        let replay_feeds = FeedSet::from_config(&config);
        let recording = Recording::<Vec3>::read(&path).unwrap();
        replay_feeds
            .bind(SampleSource::Replay(recording.into_session()))
            .unwrap();
        replay_feeds.wait_replays().await;

        let replayed = replay_feeds.channel::<Vec3>().current_value();
        assert_abs_diff_eq!(replayed.x, live_value.x, epsilon = 1e-12);
        assert_abs_diff_eq!(replayed.z, live_value.z, epsilon = 1e-12);
        // count_window(3) over 0.2, 0.3, 0.4
        assert_abs_diff_eq!(replayed.x, 0.3, epsilon = 1e-12);
    }
}

#[cfg(test)]
mod live_tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use contracts::{
        AveragingPolicy, ChannelKind, DistanceUnits, PipelineConfig, Quaternion, SharedSettings,
        Vec3, TICKS_PER_MILLISECOND,
    };
    use fusion_engine::ChannelError;
    use ingestion::{FeedSet, IngestionError};

    /// 通道节流：100ms 内的读数只缓冲不通知
    #[test]
    fn test_live_throttling_reaches_engine_once_per_interval() {
        let feeds = FeedSet::from_config(&PipelineConfig::default());
        let fused = Arc::new(AtomicU64::new(0));
        let counter = fused.clone();
        feeds.on_fused_update(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        }));

        let accel = feeds.live::<Vec3>().unwrap();
        for ms in [0, 50, 99, 100, 150, 200] {
            accel.push_at(Vec3::new(0.0, 0.0, 1.0), ms * TICKS_PER_MILLISECOND);
        }

        let stats = feeds.channel::<Vec3>().stats();
        assert_eq!(stats.received, 6);
        assert_eq!(stats.notifications, 3);
        assert_eq!(stats.buffered, 6);
        assert_eq!(fused.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_one_source_per_channel_and_configuration_guard() {
        let feeds = FeedSet::from_config(&PipelineConfig::default());
        let orientation = feeds.live::<Quaternion>().unwrap();
        orientation.push_at(Quaternion::IDENTITY, 0);

        assert!(matches!(
            feeds.live::<Quaternion>(),
            Err(IngestionError::SourceAlreadyBound {
                channel: ChannelKind::Orientation
            })
        ));
        assert_eq!(
            feeds
                .channel::<Quaternion>()
                .set_policy(AveragingPolicy::MostRecent),
            Err(ChannelError::Monitoring {
                channel: ChannelKind::Orientation,
                setting: "policy"
            })
        );

        feeds.unbind(ChannelKind::Orientation).unwrap();
        assert!(!orientation.is_listening());
        assert!(!orientation.push_at(Quaternion::IDENTITY, 1));
        feeds
            .channel::<Quaternion>()
            .set_policy(AveragingPolicy::MostRecent)
            .unwrap();

        assert!(matches!(
            feeds.unbind(ChannelKind::Orientation),
            Err(IngestionError::NotBound { .. })
        ));
        assert!(feeds.live::<Quaternion>().is_ok());
    }

    #[test]
    fn test_display_follows_shared_settings() {
        let settings = Arc::new(SharedSettings::new(DistanceUnits::Miles));
        let feeds = FeedSet::new(&PipelineConfig::default(), settings.clone());

        let accel = feeds.live::<Vec3>().unwrap();
        accel.push_at(Vec3::new(0.0, 0.0, 1.0), 0);
        assert_eq!(feeds.engine().display_readings().accel_label, "mph /sec");

        settings.set_distance_units(DistanceUnits::Kilometers);
        let readings = feeds.engine().display_readings();
        assert_eq!(readings.accel_label, "kph /sec");
        assert!((readings.acceleration_z - 35.305).abs() < 1e-9);
    }
}
