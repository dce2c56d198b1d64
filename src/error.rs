use thiserror::Error;

/// 对账计算错误
///
/// 校验类错误在任何搜索/分配工作开始之前返回，不会附带部分结果。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// 过滤后没有任何有效发票金额
    #[error("no valid invoice amounts were provided")]
    NoValidInvoices,

    /// 付款金额无法解析或不为正数
    #[error("invalid payment amount: {raw:?}")]
    InvalidPayment { raw: String },

    /// 发票数量超过组合搜索上限
    #[error("{count} invoices exceed the combination search limit of {limit}")]
    TooManyInvoices { count: usize, limit: usize },
}

impl ReconcileError {
    /// 是否为用户可修正的输入错误
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ReconcileError::NoValidInvoices | ReconcileError::InvalidPayment { .. }
        )
    }
}

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid matching tolerance: {0:?}")]
    InvalidTolerance(String),

    #[error("max_results must be at least 1")]
    InvalidMaxResults,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_flagged() {
        assert!(ReconcileError::NoValidInvoices.is_validation());
        assert!(ReconcileError::InvalidPayment { raw: "abc".into() }.is_validation());
        assert!(!ReconcileError::TooManyInvoices { count: 30, limit: 20 }.is_validation());
    }

    #[test]
    fn messages_name_the_offending_input() {
        let err = ReconcileError::InvalidPayment { raw: "-5".into() };
        assert_eq!(err.to_string(), "invalid payment amount: \"-5\"");

        let err = ReconcileError::TooManyInvoices { count: 30, limit: 20 };
        assert_eq!(
            err.to_string(),
            "30 invoices exceed the combination search limit of 20"
        );
    }
}
