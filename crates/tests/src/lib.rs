//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 端到端流测试：记录源 -> 协调器 -> 接收端

#[cfg(test)]
mod contract_tests {
    use contracts::ContractError;

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(ContractError::scan("orders", "x").kind(), "scan");
        assert_eq!(ContractError::delivery("audit", "x").kind(), "delivery");
        assert_eq!(
            ContractError::source_construction("orders", "x").kind(),
            "construction"
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::{BTreeSet, HashMap};
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        CancellationToken, ContractError, DispatchConfig, ReceiverConfig, ReceiverType,
        StreamerBlueprint,
    };
    use dispatcher::{MultiStreamCoordinator, ReceiverSet, StreamCoordinator};
    use ingestion::{JsonLinesSourceFactory, MemorySource};
    use serde_json::{json, Value};

    fn write_lines(dir: &Path, id: &str, lines: &[&str]) {
        std::fs::write(dir.join(format!("{id}.jsonl")), lines.join("\n") + "\n").unwrap();
    }

    fn read_json_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn blueprint(dir: &Path) -> StreamerBlueprint {
        let content = format!(
            r#"
[sources]
ids = ["orders", "inventory"]
base_path = "{base}"

[dispatch]
max_in_flight = 3
drain_timeout_ms = 1000

[[receivers]]
name = "raw"
receiver_type = "file"
params = {{ path = "{raw}" }}

[[receivers]]
name = "inserts"
receiver_type = "file"
params = {{ path = "{inserts}" }}

[receivers.translation]
paths = {{ "operation" = "op", "payload.structure.dep" = "department" }}
filters = [{{ field = "operation", op = "==", value = "INSERT" }}]
"#,
            base = dir.display(),
            raw = dir.join("out/raw.jsonl").display(),
            inserts = dir.join("out/inserts.jsonl").display(),
        );
        ConfigLoader::load_from_str(&content, ConfigFormat::Toml).unwrap()
    }

    async fn run(
        bp: &StreamerBlueprint,
        ctx: &CancellationToken,
    ) -> (ReceiverSet, Result<(), ContractError>) {
        let receivers = ReceiverSet::from_configs(&bp.receivers).await.unwrap();
        let factory = Arc::new(JsonLinesSourceFactory::from_config(&bp.sources));
        let group = MultiStreamCoordinator::build(ctx, factory, bp.sources.active_ids(), &bp.dispatch)
            .await
            .unwrap();
        let result = group.stream_all(ctx, &receivers.receivers()).await;
        receivers.close_all().await.unwrap();
        (receivers, result)
    }

    /// JSON Lines files -> MultiStreamCoordinator -> file receivers
    ///
    /// 验证：
    /// 1. 每个源的每条记录都送达未转换的接收端
    /// 2. 转换接收端只收到通过过滤的记录，并且字段被重命名
    #[tokio::test]
    async fn test_e2e_multi_source_fan_out() {
        let dir = tempfile::tempdir().unwrap();
        write_lines(
            dir.path(),
            "orders",
            &[
                r#"{"operation":"INSERT","id":1,"payload":{"structure":{"dep":"sales"}}}"#,
                r#"{"operation":"UPDATE","id":2,"payload":{"structure":{"dep":"ops"}}}"#,
                "",
                r#"{"operation":"INSERT","id":3,"payload":{"structure":[{"x":0},{"dep":"hr"}]}}"#,
            ],
        );
        write_lines(
            dir.path(),
            "inventory",
            &[
                r#"{"operation":"DELETE","id":10}"#,
                r#"{"operation":"INSERT","id":11}"#,
            ],
        );

        let bp = blueprint(dir.path());
        let (receivers, result) = run(&bp, &CancellationToken::new()).await;
        result.unwrap();

        let raw = read_json_lines(&dir.path().join("out/raw.jsonl"));
        let raw_ids: BTreeSet<_> = raw.iter().map(|v| v["id"].as_i64().unwrap()).collect();
        assert_eq!(raw_ids, BTreeSet::from([1, 2, 3, 10, 11]));

        let mut inserts = read_json_lines(&dir.path().join("out/inserts.jsonl"));
        inserts.sort_by_key(|v| v["id"].as_i64());
        assert_eq!(
            inserts,
            vec![
                json!({"department": "sales", "id": 1, "op": "INSERT"}),
                json!({"department": "hr", "id": 3, "op": "INSERT"}),
                json!({"id": 11, "op": "INSERT"}),
            ]
        );

        let snapshots: HashMap<_, _> = receivers.snapshots().into_iter().collect();
        assert_eq!(snapshots["raw"].delivered, 5);
        assert_eq!(snapshots["inserts"].delivered, 3);
        assert_eq!(snapshots["inserts"].filtered, 2);
    }

    /// 转换接收端遇到非对象记录：首个错误作为整个调用的结果
    #[tokio::test]
    async fn test_e2e_first_error_propagates() {
        let dir = tempfile::tempdir().unwrap();
        write_lines(dir.path(), "orders", &[r#"{"operation":"INSERT","id":1}"#, "[1,2,3]"]);
        write_lines(dir.path(), "inventory", &[r#"{"operation":"INSERT","id":10}"#]);

        let bp = blueprint(dir.path());
        let (_, result) = run(&bp, &CancellationToken::new()).await;
        let err = result.unwrap_err();
        assert!(
            matches!(err, ContractError::Transform { ref receiver, .. } if receiver == "inserts"),
            "unexpected error: {err}"
        );
    }

    /// 缺失的源文件在流开始前报告构造错误
    #[tokio::test]
    async fn test_e2e_construction_failure() {
        let dir = tempfile::tempdir().unwrap();
        write_lines(dir.path(), "orders", &[r#"{"id":1}"#]);

        let bp = blueprint(dir.path());
        let factory = Arc::new(JsonLinesSourceFactory::from_config(&bp.sources));
        let err = MultiStreamCoordinator::build(
            &CancellationToken::new(),
            factory,
            bp.sources.active_ids(),
            &bp.dispatch,
        )
        .await
        .err()
        .unwrap();
        assert!(
            matches!(err, ContractError::SourceConstruction { ref source_id, .. } if source_id == "inventory")
        );
    }

    /// 调用方取消：流提前结束且返回 Ok
    #[tokio::test]
    async fn test_e2e_cancellation_mid_stream() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("slow.jsonl");
        let receivers = ReceiverSet::from_configs(&[ReceiverConfig {
            name: "slow".to_string(),
            receiver_type: ReceiverType::File,
            params: HashMap::from([("path".to_string(), out.display().to_string())]),
            translation: None,
        }])
        .await
        .unwrap();

        let records: Vec<String> = (0..1000).map(|i| format!(r#"{{"n":{i}}}"#)).collect();
        let source = MemorySource::new("ticks", records).with_interval(Duration::from_millis(5));
        let coordinator = StreamCoordinator::new(source, &DispatchConfig::default());

        let ctx = CancellationToken::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        tokio::time::timeout(
            Duration::from_secs(5),
            coordinator.stream(&ctx, &receivers.receivers()),
        )
        .await
        .expect("stream must stop after cancellation")
        .unwrap();
        receivers.close_all().await.unwrap();

        let delivered = receivers.snapshots()[0].1.delivered;
        assert!(delivered > 0 && delivered < 1000, "delivered {delivered}");
        assert_eq!(read_json_lines(&out).len() as u64, delivered);
    }

    /// 网络接收端：每条记录一个 UDP 数据报
    #[tokio::test]
    async fn test_e2e_network_receiver() {
        let listener = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let receivers = ReceiverSet::from_configs(&[ReceiverConfig {
            name: "udp".to_string(),
            receiver_type: ReceiverType::Network,
            params: HashMap::from([("addr".to_string(), addr.to_string())]),
            translation: None,
        }])
        .await
        .unwrap();

        let source = MemorySource::new("orders", [r#"{"id":1}"#, r#"{"id":2}"#]);
        let coordinator = StreamCoordinator::new(source, &DispatchConfig::default());
        coordinator
            .stream(&CancellationToken::new(), &receivers.receivers())
            .await
            .unwrap();

        let mut received = BTreeSet::new();
        let mut buf = [0u8; 1024];
        for _ in 0..2 {
            let n = tokio::time::timeout(Duration::from_secs(1), listener.recv(&mut buf))
                .await
                .unwrap()
                .unwrap();
            received.insert(String::from_utf8(buf[..n].to_vec()).unwrap());
        }
        assert_eq!(
            received,
            BTreeSet::from([r#"{"id":1}"#.to_string(), r#"{"id":2}"#.to_string()])
        );
        receivers.close_all().await.unwrap();
    }

    /// 配置文件 -> 加载 -> 运行
    #[tokio::test]
    async fn test_e2e_config_file_to_run() {
        let dir = tempfile::tempdir().unwrap();
        write_lines(dir.path(), "orders", &[r#"{"a":"a","b":"b","c":{"d":1}}"#]);

        let config = dir.path().join("kinestream.json");
        let bp = json!({
            "sources": { "ids": ["orders", ""], "base_path": dir.path() },
            "receivers": [{
                "name": "renamed",
                "receiver_type": "file",
                "params": { "path": dir.path().join("renamed.jsonl") },
                "translation": { "paths": { "a": "aa", "c.d": "cd" } }
            }]
        });
        std::fs::write(&config, serde_json::to_string_pretty(&bp).unwrap()).unwrap();

        let bp = ConfigLoader::load_from_path(&config).unwrap();
        assert_eq!(bp.sources.active_ids().collect::<Vec<_>>(), vec!["orders"]);

        let (_, result) = run(&bp, &CancellationToken::new()).await;
        result.unwrap();
        assert_eq!(
            read_json_lines(&dir.path().join("renamed.jsonl")),
            vec![json!({"aa": "a", "b": "b", "cd": 1})]
        );
    }

    /// 配置校验失败不会进入运行阶段
    #[test]
    fn test_e2e_invalid_config_rejected() {
        let err = ConfigLoader::load_from_str(
            r#"
[sources]
ids = ["orders"]

[[receivers]]
name = "udp"
receiver_type = "network"
"#,
            ConfigFormat::Toml,
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { ref field, .. } if field == "receivers[0].params.addr"));
    }
}
