//! 流式分发指标
//!
//! 通过 `metrics` facade 记录，由 Prometheus exporter 导出。
//! 未安装 recorder 时这些调用均为 no-op。

use contracts::ContractError;
use metrics::{counter, gauge, histogram};

/// 记录从上游扫描到一条记录
pub fn record_record_scanned(source_id: &str) {
    counter!(
        "kinestream_records_scanned_total",
        "source" => source_id.to_string()
    )
    .increment(1);
}

/// 记录为某个接收端派发了一个任务
pub fn record_record_dispatched(receiver: &str) {
    counter!(
        "kinestream_records_dispatched_total",
        "receiver" => receiver.to_string()
    )
    .increment(1);
}

/// 记录被过滤规则丢弃的记录
pub fn record_record_filtered(receiver: &str) {
    counter!(
        "kinestream_records_filtered_total",
        "receiver" => receiver.to_string()
    )
    .increment(1);
}

/// 记录投递结果
///
/// 成功时同时记录写入耗时。
pub fn record_delivery(receiver: &str, success: bool, latency_ms: f64) {
    if success {
        counter!(
            "kinestream_records_delivered_total",
            "receiver" => receiver.to_string()
        )
        .increment(1);
        histogram!(
            "kinestream_delivery_latency_ms",
            "receiver" => receiver.to_string()
        )
        .record(latency_ms);
    } else {
        counter!(
            "kinestream_delivery_failures_total",
            "receiver" => receiver.to_string()
        )
        .increment(1);
    }
}

/// 当前在途的派发任务数
pub fn record_dispatch_in_flight(in_flight: usize) {
    gauge!("kinestream_dispatch_in_flight").set(in_flight as f64);
}

/// 记录终止 stream 调用的错误
pub fn record_stream_error(err: &ContractError) {
    counter!(
        "kinestream_stream_errors_total",
        "kind" => err.kind()
    )
    .increment(1);
}
