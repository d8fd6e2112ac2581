//! Ingestion 错误类型

use std::path::PathBuf;

use contracts::ContractError;
use thiserror::Error;

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 未注册的数据源
    #[error("unknown source {source_id}")]
    UnknownSource {
        /// 数据源 ID
        source_id: String,
    },

    /// 数据文件无法打开
    #[error("cannot open {}: {source}", .path.display())]
    OpenFailed {
        /// 数据源 ID
        source_id: String,
        /// 文件路径
        path: PathBuf,
        /// 底层 IO 错误
        source: std::io::Error,
    },

    /// 读取过程中失败
    #[error("read failed after {records} records: {source}")]
    ReadFailed {
        /// 数据源 ID
        source_id: String,
        /// 已读取的记录数
        records: u64,
        /// 底层 IO 错误
        source: std::io::Error,
    },
}

impl From<IngestionError> for ContractError {
    fn from(err: IngestionError) -> Self {
        let message = err.to_string();
        match err {
            IngestionError::UnknownSource { source_id }
            | IngestionError::OpenFailed { source_id, .. } => {
                ContractError::source_construction(source_id, message)
            }
            IngestionError::ReadFailed { source_id, .. } => ContractError::scan(source_id, message),
        }
    }
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_error_mapping() {
        let err: ContractError = IngestionError::UnknownSource {
            source_id: "orders".to_string(),
        }
        .into();
        assert!(matches!(err, ContractError::SourceConstruction { ref source_id, .. } if source_id == "orders"));

        let err: ContractError = IngestionError::ReadFailed {
            source_id: "orders".to_string(),
            records: 3,
            source: std::io::Error::other("disk gone"),
        }
        .into();
        assert_eq!(err.kind(), "scan");
        assert!(err.to_string().contains("after 3 records"));
    }
}
