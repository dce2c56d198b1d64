use crate::config::MatchSettings;
use crate::error::ReconcileError;
use crate::models::{Invoice, Match, SearchOutcome};
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use indexmap::IndexSet;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 子集掩码为 u64，最多可枚举 63 张发票
pub const MAX_ENUMERABLE_INVOICES: usize = 63;

/// 整数单位允许的最大十进制位数 (i128)
const MAX_UNIT_DIGITS: i64 = 38;

/// 每个并行任务处理 2^12 个子集，任务开始前检查预算
const CHUNK_BITS: u32 = 12;

/// 搜索预算: 可选截止时间 + 可共享的取消标志
#[derive(Debug, Clone)]
pub struct SearchBudget {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl SearchBudget {
    pub fn unlimited() -> Self {
        Self {
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::unlimited, Self::with_timeout)
    }

    /// 取消搜索 (所有克隆共享同一标志)
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// 已取消或已过截止时间; 超时会顺带置位取消标志
    pub fn is_exhausted(&self) -> bool {
        if self.is_cancelled() {
            return true;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.cancel();
                true
            }
            _ => false,
        }
    }
}

impl Default for SearchBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// 一次组合搜索的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReport {
    pub matches: Vec<Match>,
    pub outcome: SearchOutcome,
}

/// 金额换算为同一精度下的整数单位，供枚举热循环使用
#[derive(Debug)]
struct MinorUnits {
    amounts: Vec<i128>,
    payment: i128,
    tolerance: i128,
}

impl MinorUnits {
    /// 去掉末尾 0 后取最大小数位数作为公共精度；任一金额或发票合计超出 i128 时返回 None
    fn new(invoices: &[Invoice], payment: &BigDecimal, tolerance: &BigDecimal) -> Option<Self> {
        let invoice_amounts: Vec<BigDecimal> =
            invoices.iter().map(|inv| inv.amount.normalized()).collect();
        let payment = payment.normalized();
        let tolerance = tolerance.normalized();

        let scale = invoice_amounts
            .iter()
            .chain([&payment, &tolerance])
            .map(|amount| amount.as_bigint_and_exponent().1)
            .max()
            .unwrap_or(0)
            .max(0);

        let to_units = |amount: &BigDecimal| -> Option<i128> {
            let (_, exponent) = amount.as_bigint_and_exponent();
            if amount.digits() as i64 - exponent + scale > MAX_UNIT_DIGITS {
                return None;
            }
            amount.with_scale(scale).into_bigint_and_exponent().0.to_i128()
        };

        let amounts = invoice_amounts
            .iter()
            .map(to_units)
            .collect::<Option<Vec<_>>>()?;
        amounts.iter().try_fold(0i128, |acc, a| acc.checked_add(*a))?;

        Some(Self {
            amounts,
            payment: to_units(&payment)?,
            tolerance: to_units(&tolerance)?,
        })
    }

    fn subset_sum(&self, mask: u64) -> i128 {
        let mut sum = 0i128;
        let mut bits = mask;
        while bits != 0 {
            let j = bits.trailing_zeros() as usize;
            sum += self.amounts[j];
            bits &= bits - 1;
        }
        sum
    }

    fn difference(&self, mask: u64) -> i128 {
        (self.subset_sum(mask) - self.payment).abs()
    }
}

/// 排序键: (差额, 发票数量, 掩码)
type RankKey = (i128, u32, u64);

/// 预算耗尽
#[derive(Debug)]
struct Exhausted;

/// 各并行任务的局部结果，只保留排名靠前的若干条
#[derive(Debug, Default)]
struct Ranked {
    best: Vec<RankKey>,
    qualifying: u64,
}

impl Ranked {
    fn push(&mut self, key: RankKey, cap: usize) {
        self.qualifying += 1;
        self.best.push(key);
        if self.best.len() >= cap * 2 + 16 {
            self.trim(cap);
        }
    }

    fn merge(mut self, mut other: Ranked, cap: usize) -> Ranked {
        self.qualifying += other.qualifying;
        self.best.append(&mut other.best);
        self.trim(cap);
        self
    }

    fn trim(&mut self, cap: usize) {
        self.best.sort_unstable();
        self.best.truncate(cap);
    }
}

/// 组合匹配器: 穷举全部非空子集，找出合计落在容差内的组合
///
/// 排序规则: 差额升序，差额相同时发票数量少者优先，再按枚举顺序；结果截断为 `max_results` 条。
/// 复杂度 O(2^n · n)，调用方负责限制 n。
#[derive(Debug, Clone)]
pub struct CombinatorialMatcher {
    tolerance: BigDecimal,
    max_results: usize,
}

impl CombinatorialMatcher {
    pub fn new(tolerance: BigDecimal, max_results: usize) -> Self {
        Self {
            tolerance,
            max_results,
        }
    }

    pub fn from_settings(settings: &MatchSettings) -> Self {
        Self::new(settings.tolerance.clone(), settings.max_results)
    }

    /// 不设预算的完整搜索
    pub fn find_matches(
        &self,
        invoices: &[Invoice],
        payment: &BigDecimal,
    ) -> Result<Vec<Match>, ReconcileError> {
        self.search(invoices, payment, &SearchBudget::unlimited())
            .map(|report| report.matches)
    }

    /// 在预算内搜索
    ///
    /// 预算耗尽时停止剩余任务并返回 `Aborted`；金额无法换算为整数单位时返回 `Unrepresentable`。
    /// 两种情况都不带任何匹配。
    pub fn search(
        &self,
        invoices: &[Invoice],
        payment: &BigDecimal,
        budget: &SearchBudget,
    ) -> Result<SearchReport, ReconcileError> {
        let n = invoices.len();
        if n > MAX_ENUMERABLE_INVOICES {
            return Err(ReconcileError::TooManyInvoices {
                count: n,
                limit: MAX_ENUMERABLE_INVOICES,
            });
        }

        let Some(units) = MinorUnits::new(invoices, payment, &self.tolerance) else {
            tracing::warn!(
                "Skipping combination search: amounts exceed the integer search range ({} invoices)",
                n
            );
            return Ok(SearchReport {
                matches: Vec::new(),
                outcome: SearchOutcome::Unrepresentable,
            });
        };

        let started = Instant::now();
        let end = 1u64 << n;
        let cap = self.max_results;

        // 第 c 块覆盖掩码 [c << CHUNK_BITS, (c + 1) << CHUNK_BITS) ∩ [1, end)
        let ranked = (0..(end >> CHUNK_BITS) + 1)
            .into_par_iter()
            .try_fold(Ranked::default, |mut acc, chunk| {
                if budget.is_exhausted() {
                    return Err(Exhausted);
                }
                let first = (chunk << CHUNK_BITS).max(1);
                let last = ((chunk + 1) << CHUNK_BITS).min(end);
                for mask in first..last {
                    let diff = units.difference(mask);
                    if diff <= units.tolerance {
                        acc.push((diff, mask.count_ones(), mask), cap);
                    }
                }
                Ok(acc)
            })
            .try_reduce(Ranked::default, |a, b| Ok(a.merge(b, cap)));

        let mut ranked = match ranked {
            Ok(ranked) => ranked,
            Err(Exhausted) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                tracing::warn!(
                    "Combination search aborted after {} ms ({} invoices)",
                    elapsed_ms,
                    n
                );
                return Ok(SearchReport {
                    matches: Vec::new(),
                    outcome: SearchOutcome::Aborted { elapsed_ms },
                });
            }
        };
        ranked.trim(cap);

        let matches = ranked
            .best
            .iter()
            .map(|&(_, _, mask)| self.build_match(invoices, payment, mask))
            .collect();

        tracing::info!(
            "Combination search completed: {} subsets, {} qualifying, {:?}",
            end - 1,
            ranked.qualifying,
            started.elapsed()
        );

        Ok(SearchReport {
            matches,
            outcome: SearchOutcome::Completed {
                subsets_examined: end - 1,
            },
        })
    }

    fn build_match(&self, invoices: &[Invoice], payment: &BigDecimal, mask: u64) -> Match {
        let mut ids = IndexSet::new();
        let mut total = BigDecimal::zero();
        for (j, invoice) in invoices.iter().enumerate() {
            if mask & (1u64 << j) != 0 {
                ids.insert(invoice.id);
                total += &invoice.amount;
            }
        }
        Match::new(ids, total, payment)
    }
}
