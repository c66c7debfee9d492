//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置 -> 标注器 -> 管道 -> 下游步骤
//! - 各类设备选项下的回退链
//! - 标注过程中并发更新缓存值

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{AnnotatorConfig, DepthUnits};

    #[test]
    fn test_default_config_survives_toml() {
        let toml = ConfigLoader::to_toml(&AnnotatorConfig::default()).unwrap();
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.depth_units.default_units(), DepthUnits::DEFAULT);
        assert_eq!(config.depth_units.metadata_path.to_string(), "header.depth-units");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    use annotator::{AnnotationPipeline, DepthUnitsResolver, DepthUnitsSource, FrameAnnotator};
    use async_channel::{bounded, unbounded, Sender};
    use bytes::Bytes;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        AnnotatorConfig, DepthFrame, FrameMetadataStep, MetadataDocument, OptionId, OptionSource,
    };
    use device_options::{AutoUpdatedOption, MockControlChannel, OptionRegistry, QueryOnlyOption};
    use serde_json::json;

    /// Downstream step forwarding annotated frames
    struct Collect(Sender<DepthFrame>);

    impl FrameMetadataStep for Collect {
        fn add_no_metadata(&self, frame: &mut DepthFrame) {
            let _ = self.0.send_blocking(frame.clone());
        }

        fn add_frame_metadata(&self, frame: &mut DepthFrame, _metadata: MetadataDocument) {
            frame.additional_data.metadata_received = true;
            let _ = self.0.send_blocking(frame.clone());
        }
    }

    /// Downstream step that does nothing
    struct Discard;

    impl FrameMetadataStep for Discard {
        fn add_no_metadata(&self, _frame: &mut DepthFrame) {}

        fn add_frame_metadata(&self, _frame: &mut DepthFrame, _metadata: MetadataDocument) {}
    }

    fn auto_option(channel: Arc<MockControlChannel>, cached: Option<f32>) -> Arc<AutoUpdatedOption> {
        let option = Arc::new(AutoUpdatedOption::new(OptionId::depth_units(), channel));
        if let Some(value) = cached {
            option.update_last_known(value);
        }
        option
    }

    fn units_of(annotator: &FrameAnnotator, metadata: Option<MetadataDocument>) -> f32 {
        let mut frame = DepthFrame::empty("depth", 0);
        annotator.annotate(&mut frame, metadata);
        frame.depth_units().expect("annotated frame carries depth units").get()
    }

    /// End-to-end: TOML config -> AnnotationPipeline -> downstream step
    ///
    /// 验证完整的数据流：
    /// 1. 配置修改元数据字段路径与默认值
    /// 2. 两个流共享同一个自动更新选项
    /// 3. 每个流的帧按提交顺序输出，且深度单位符合预期
    #[tokio::test]
    async fn test_e2e_config_to_annotated_frames() {
        let config = ConfigLoader::load_from_str(
            r#"
            [depth_units]
            default = 0.0005
            metadata_path = ["meta", "scale"]

            [pipeline]
            channel_capacity = 8
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let channel = Arc::new(MockControlChannel::new().with_value(OptionId::depth_units(), 0.0002));
        let registry = Arc::new(OptionRegistry::new());
        registry.register(auto_option(channel.clone(), Some(0.0002)));
        let options: Arc<dyn OptionSource> = registry;

        let (tx, rx) = unbounded();
        let mut pipeline = AnnotationPipeline::new(config.pipeline.clone());
        let depth = pipeline
            .register_stream(
                "depth",
                FrameAnnotator::from_config(options.clone(), &config, Arc::new(Collect(tx.clone()))),
            )
            .unwrap();
        let ir = pipeline
            .register_stream("ir", FrameAnnotator::from_config(options, &config, Arc::new(Collect(tx))))
            .unwrap();
        pipeline.start_all();

        let inputs = vec![
            Some(json!({"meta": {"scale": 0.0001}})),
            Some(json!({"meta": {"scale": "0.0001"}})),
            None,
            Some(json!({"header": {"depth-units": 0.0003}})),
        ];
        let expected = [0.0001_f32, 0.0002, 0.0002, 0.0002];

        let producer = tokio::task::spawn_blocking(move || {
            for (n, metadata) in inputs.into_iter().enumerate() {
                let doc = metadata.map(MetadataDocument::new);
                depth
                    .submit_blocking(DepthFrame::empty("depth", n as u64), doc.clone())
                    .unwrap();
                ir.submit_blocking(DepthFrame::empty("ir", n as u64), doc).unwrap();
            }
            pipeline.stop_all();
            pipeline.metrics().snapshot()
        });

        let mut depth_frames = Vec::new();
        let mut ir_frames = Vec::new();
        while let Ok(frame) = rx.recv().await {
            match frame.stream_id.as_str() {
                "depth" => depth_frames.push(frame),
                _ => ir_frames.push(frame),
            }
        }
        let snapshot = producer.await.unwrap();

        for frames in [&depth_frames, &ir_frames] {
            assert_eq!(frames.len(), expected.len());
            for (n, (frame, units)) in frames.iter().zip(expected).enumerate() {
                assert_eq!(frame.frame_number, n as u64);
                assert_eq!(frame.depth_units().unwrap().get(), units);
            }
            assert!(!frames[2].additional_data.metadata_received);
        }

        assert_eq!(snapshot.frames_annotated, 8);
        assert_eq!(snapshot.count_for(DepthUnitsSource::Metadata), 2);
        assert_eq!(snapshot.count_for(DepthUnitsSource::LastKnown), 6);
        assert_eq!(snapshot.metadata_decode_failures, 2);
        assert_eq!(channel.query_count(), 0);
    }

    /// Undecodable field == absent field == no document == resolver, for every option flavour
    #[test]
    fn test_fallback_equivalence_across_option_kinds() {
        let channel = Arc::new(MockControlChannel::new().with_value(OptionId::depth_units(), 0.00025));

        let auto = OptionRegistry::new();
        auto.register(auto_option(channel.clone(), Some(0.0002)));
        let query_only = OptionRegistry::new();
        query_only.register(Arc::new(QueryOnlyOption::new(OptionId::depth_units(), channel.clone())));
        let absent = OptionRegistry::new();

        let cases: [(OptionRegistry, f32); 3] = [(auto, 0.0002), (query_only, 0.00025), (absent, 0.001)];

        for (registry, expected) in cases {
            let resolver = Arc::new(DepthUnitsResolver::new(Arc::new(registry)));
            let annotator = FrameAnnotator::new(resolver.clone(), Arc::new(Discard));

            let undecodable = [
                json!({"header": {"depth-units": "fast"}}),
                json!({"header": {"depth-units": {"value": 1}}}),
                json!({"header": {"depth-units": null}}),
                json!({"header": {"depth-units": [0.0001]}}),
            ];
            for doc in undecodable {
                assert_eq!(units_of(&annotator, Some(MetadataDocument::new(doc))), expected);
            }
            assert_eq!(units_of(&annotator, Some(MetadataDocument::new(json!({})))), expected);
            assert_eq!(units_of(&annotator, None), expected);
            assert_eq!(resolver.resolve().get(), expected);
        }
    }

    #[test]
    fn test_query_failure_uses_configured_default() {
        let mut config = AnnotatorConfig::default();
        config.depth_units.default = 0.0005;

        let channel = Arc::new(MockControlChannel::new().with_value(OptionId::depth_units(), 0.0002));
        channel.set_failing(true);
        let registry = OptionRegistry::new();
        registry.register(Arc::new(QueryOnlyOption::new(OptionId::depth_units(), channel.clone())));

        let annotator = FrameAnnotator::from_config(Arc::new(registry), &config, Arc::new(Discard));
        assert_eq!(units_of(&annotator, None), 0.0005);

        channel.set_failing(false);
        assert_eq!(units_of(&annotator, None), 0.0002);

        let snapshot = annotator.metrics().snapshot();
        assert_eq!(snapshot.count_for(DepthUnitsSource::Default), 1);
        assert_eq!(snapshot.count_for(DepthUnitsSource::Query), 1);
    }

    /// Writers flip the cached value while frames are annotated; every frame sees one of the two
    #[test]
    fn test_concurrent_cache_updates() {
        let channel = Arc::new(MockControlChannel::new());
        let option = auto_option(channel.clone(), Some(0.001));
        let registry = OptionRegistry::new();
        registry.register(option.clone());
        let annotator = FrameAnnotator::new(
            Arc::new(DepthUnitsResolver::new(Arc::new(registry))),
            Arc::new(Discard),
        );

        let running = Arc::new(AtomicBool::new(true));
        let writer = {
            let running = running.clone();
            thread::spawn(move || {
                let mut flip = false;
                while running.load(Ordering::Relaxed) {
                    option.update_last_known(if flip { 0.001 } else { 0.0001 });
                    flip = !flip;
                }
            })
        };

        for n in 0..10_000 {
            let mut frame = DepthFrame::empty("depth", n);
            annotator.add_no_metadata(&mut frame);
            let units = frame.depth_units().unwrap().get();
            assert!(units == 0.001 || units == 0.0001, "unexpected depth units {units}");
        }

        running.store(false, Ordering::Relaxed);
        writer.join().unwrap();
        assert_eq!(channel.query_count(), 0);
        assert_eq!(annotator.metrics().snapshot().count_for(DepthUnitsSource::LastKnown), 10_000);
    }

    /// Device never answers and never reports: frames get the configured default without
    /// a single control round trip, until the first report arrives
    #[test]
    fn test_unreported_auto_option_never_blocks_frames() {
        let mut config = AnnotatorConfig::default();
        config.depth_units.default = 0.0005;

        let channel = Arc::new(
            MockControlChannel::new()
                .with_value(OptionId::depth_units(), 0.0002)
                .with_latency(Duration::from_millis(50)),
        );
        channel.set_failing(true);
        let option = auto_option(channel.clone(), None);
        let registry = OptionRegistry::new();
        registry.register(option.clone());
        let annotator = FrameAnnotator::from_config(Arc::new(registry), &config, Arc::new(Discard));

        let started = Instant::now();
        for _ in 0..20 {
            assert_eq!(units_of(&annotator, None), 0.0005);
        }
        assert!(started.elapsed() < Duration::from_millis(50));
        assert_eq!(channel.query_count(), 0);

        option.update_last_known(0.0002);
        assert_eq!(units_of(&annotator, None), 0.0002);

        let snapshot = annotator.metrics().snapshot();
        assert_eq!(snapshot.count_for(DepthUnitsSource::Default), 20);
        assert_eq!(snapshot.count_for(DepthUnitsSource::LastKnown), 1);
        assert_eq!(channel.query_count(), 0);
    }

    #[test]
    fn test_auto_report_fills_cache() {
        let channel = Arc::new(MockControlChannel::new().with_value(OptionId::depth_units(), 0.0001));
        let option = auto_option(channel.clone(), None);
        let registry = OptionRegistry::new();
        registry.register(option.clone());
        let resolver = DepthUnitsResolver::new(Arc::new(registry));

        let report = option.spawn_auto_report(Duration::from_millis(5));
        channel.set_value(OptionId::depth_units(), 0.0004);

        let deadline = Instant::now() + Duration::from_secs(2);
        while option.last_known_value() != Some(0.0004) {
            assert!(Instant::now() < deadline, "auto report never refreshed the cache");
            thread::sleep(Duration::from_millis(5));
        }

        report.stop();
        let queries = channel.query_count();
        assert!(queries > 0);

        let resolution = resolver.resolve_detailed();
        assert_eq!(resolution.source, DepthUnitsSource::LastKnown);
        assert_eq!(resolution.value.get(), 0.0004);
        assert!(!report.is_running());
    }

    #[test]
    fn test_distance_uses_annotated_units() {
        let mut data = Vec::new();
        data.extend_from_slice(&1000u16.to_le_bytes());
        data.extend_from_slice(&250u16.to_le_bytes());
        let mut frame = DepthFrame::new("depth", 7, 2, 1, Bytes::from(data));
        assert_eq!(frame.distance_at(0, 0), None);

        let (tx, rx) = bounded(1);
        let annotator = FrameAnnotator::new(
            Arc::new(DepthUnitsResolver::new(Arc::new(OptionRegistry::new()))),
            Arc::new(Collect(tx)),
        );
        let doc = MetadataDocument::new(json!({"header": {"depth-units": 0.0001}}));
        annotator.add_frame_metadata(&mut frame, doc);

        let delivered = rx.try_recv().unwrap();
        assert!(delivered.additional_data.metadata_received);
        assert!((delivered.distance_at(0, 0).unwrap() - 0.1).abs() < 1e-6);
        assert!((delivered.distance_at(1, 0).unwrap() - 0.025).abs() < 1e-6);
        assert_eq!(delivered.distance_at(2, 0), None);
    }
}
