use crate::config::{MatchSettings, OversizePolicy};
use crate::error::ReconcileError;
use crate::models::{Reconciliation, SearchOutcome};
use crate::service::allocator::allocate_oldest_first;
use crate::service::matcher::{CombinatorialMatcher, SearchBudget};
use crate::service::normalizer::normalize;
use bigdecimal::{BigDecimal, Zero};

/// 对账服务: 输入校验 -> 组合匹配 -> 先到先付分配
///
/// 无共享可变状态，可在多个线程中并发调用。
#[derive(Debug, Clone)]
pub struct ReconcileService {
    settings: MatchSettings,
    matcher: CombinatorialMatcher,
}

impl ReconcileService {
    pub fn new(settings: MatchSettings) -> Self {
        let matcher = CombinatorialMatcher::from_settings(&settings);
        Self { settings, matcher }
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    /// 使用配置的超时执行一次对账
    pub fn reconcile(
        &self,
        invoice_text: &str,
        payment_text: &str,
    ) -> Result<Reconciliation, ReconcileError> {
        let budget = SearchBudget::from_timeout(self.settings.search_timeout);
        self.reconcile_with_budget(invoice_text, payment_text, &budget)
    }

    /// 使用调用方提供的搜索预算执行一次对账
    pub fn reconcile_with_budget(
        &self,
        invoice_text: &str,
        payment_text: &str,
        budget: &SearchBudget,
    ) -> Result<Reconciliation, ReconcileError> {
        let input = normalize(invoice_text, payment_text)?;
        let count = input.invoices.len();
        let limit = self.settings.max_invoices;
        tracing::debug!(
            "Normalized {} invoices ({} lines dropped), payment {}",
            count,
            input.dropped_lines,
            input.payment
        );

        let skip_search = if count > limit {
            match self.settings.oversize_policy {
                OversizePolicy::Reject => {
                    tracing::warn!("Rejecting {} invoices (limit {})", count, limit);
                    return Err(ReconcileError::TooManyInvoices { count, limit });
                }
                OversizePolicy::AllocatorOnly => {
                    tracing::warn!(
                        "Skipping combination search for {} invoices (limit {})",
                        count,
                        limit
                    );
                    true
                }
                OversizePolicy::RunAnyway => {
                    tracing::warn!(
                        "Searching {} invoices above limit {}, relying on timeout",
                        count,
                        limit
                    );
                    false
                }
            }
        } else {
            false
        };

        let (matches, search) = if skip_search {
            (
                Vec::new(),
                SearchOutcome::Skipped {
                    invoice_count: count,
                    limit,
                },
            )
        } else {
            let report = self.matcher.search(&input.invoices, &input.payment, budget)?;
            let resolved = report
                .matches
                .iter()
                .map(|m| m.resolve(&input.invoices))
                .collect();
            (resolved, report.outcome)
        };

        let oldest_first = allocate_oldest_first(&input.invoices, &input.payment);
        let invoice_total = input
            .invoices
            .iter()
            .fold(BigDecimal::zero(), |acc, inv| acc + &inv.amount);

        tracing::info!(
            "Reconciled payment {} against {} invoices: {} matches, credit {}",
            input.payment,
            count,
            matches.len(),
            oldest_first.remaining_credit
        );

        Ok(Reconciliation {
            invoices: input.invoices,
            payment: input.payment,
            invoice_total,
            matches,
            oldest_first,
            search,
        })
    }
}

impl Default for ReconcileService {
    fn default() -> Self {
        Self::new(MatchSettings::default())
    }
}
