use super::Invoice;
use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexSet;
use serde::Serialize;
use std::fmt;

/// 匹配组合: 金额合计落在付款容差范围内的一组发票
///
/// 构造后不可变；排序只调整集合顺序，不修改组合本身。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    invoice_ids: IndexSet<u32>,
    total: BigDecimal,
    difference: BigDecimal,
}

impl Match {
    pub(crate) fn new(invoice_ids: IndexSet<u32>, total: BigDecimal, payment: &BigDecimal) -> Self {
        let difference = (&total - payment).abs();
        Self {
            invoice_ids,
            total,
            difference,
        }
    }

    /// 成员发票ID (按输入顺序)
    pub fn invoice_ids(&self) -> &IndexSet<u32> {
        &self.invoice_ids
    }

    pub fn total(&self) -> &BigDecimal {
        &self.total
    }

    /// |合计 - 付款|
    pub fn difference(&self) -> &BigDecimal {
        &self.difference
    }

    pub fn len(&self) -> usize {
        self.invoice_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoice_ids.is_empty()
    }

    pub fn kind(&self) -> MatchKind {
        if self.difference.is_zero() {
            MatchKind::Exact
        } else {
            MatchKind::Near
        }
    }

    /// 将成员ID解析为发票明细，供展示层使用
    pub fn resolve(&self, invoices: &[Invoice]) -> ResolvedMatch {
        let members = invoices
            .iter()
            .filter(|inv| self.invoice_ids.contains(&inv.id))
            .cloned()
            .collect();

        ResolvedMatch {
            invoices: members,
            total: self.total.clone(),
            difference: self.difference.clone(),
            kind: self.kind(),
        }
    }
}

/// 精确匹配 (差额为 0) 或容差内的近似匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Near,
}

/// 已解析成员发票的匹配组合
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMatch {
    pub invoices: Vec<Invoice>,
    pub total: BigDecimal,
    pub difference: BigDecimal,
    pub kind: MatchKind,
}

/// 顺序分配状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    PaidInFull,
    PartialPayment,
    Unpaid,
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AllocationStatus::PaidInFull => "Paid in Full",
            AllocationStatus::PartialPayment => "Partial Payment",
            AllocationStatus::Unpaid => "Unpaid",
        };
        f.write_str(label)
    }
}

/// 单张发票的分配结果; `due` 仅在部分付款时存在
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocatedInvoice {
    pub invoice: Invoice,
    pub status: AllocationStatus,
    pub paid: BigDecimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<BigDecimal>,
}

/// 按先到先付 (oldest-first) 顺序分配的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationResult {
    pub allocated: Vec<AllocatedInvoice>,
    pub remaining_credit: BigDecimal,
}

impl AllocationResult {
    pub fn total_paid(&self) -> BigDecimal {
        self.allocated
            .iter()
            .fold(BigDecimal::zero(), |acc, a| acc + &a.paid)
    }

    /// 分配后仍未结清的金额 (部分付款的欠款 + 未付发票金额)
    pub fn outstanding(&self) -> BigDecimal {
        self.allocated
            .iter()
            .fold(BigDecimal::zero(), |acc, a| match a.status {
                AllocationStatus::PaidInFull => acc,
                AllocationStatus::PartialPayment => {
                    acc + a.due.as_ref().cloned().unwrap_or_else(BigDecimal::zero)
                }
                AllocationStatus::Unpaid => acc + &a.invoice.amount,
            })
    }
}

/// 组合搜索的执行情况
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    Completed { subsets_examined: u64 },
    /// 发票数量超过上限，按策略跳过搜索
    Skipped { invoice_count: usize, limit: usize },
    /// 超时或被取消；不返回任何匹配组合
    Aborted { elapsed_ms: u64 },
    /// 金额跨度超出整数搜索范围，未执行搜索
    Unrepresentable,
}

impl SearchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SearchOutcome::Completed { .. })
    }
}

/// 一次对账计算的完整结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    pub invoices: Vec<Invoice>,
    pub payment: BigDecimal,
    pub invoice_total: BigDecimal,
    pub matches: Vec<ResolvedMatch>,
    pub oldest_first: AllocationResult,
    pub search: SearchOutcome,
}

impl Reconciliation {
    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }
}
