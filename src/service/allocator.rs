use crate::models::{AllocatedInvoice, AllocationResult, AllocationStatus, Invoice};
use bigdecimal::{BigDecimal, Zero};

/// 先到先付顺序分配
///
/// 按输入顺序逐张填充：余额足够则全额付清，不足则部分付款并清零余额，余额为 0 后其余发票均为未付。
/// 全部发票处理完后的剩余金额即为贷方余额 (credit)。该策略对合法输入总能给出结果。
pub fn allocate_oldest_first(invoices: &[Invoice], payment: &BigDecimal) -> AllocationResult {
    let zero = BigDecimal::zero();
    let mut remaining = payment.clone();
    let mut allocated = Vec::with_capacity(invoices.len());

    for invoice in invoices {
        let entry = if remaining <= zero {
            AllocatedInvoice {
                invoice: invoice.clone(),
                status: AllocationStatus::Unpaid,
                paid: zero.clone(),
                due: None,
            }
        } else if remaining >= invoice.amount {
            remaining -= &invoice.amount;
            AllocatedInvoice {
                invoice: invoice.clone(),
                status: AllocationStatus::PaidInFull,
                paid: invoice.amount.clone(),
                due: None,
            }
        } else {
            let due = &invoice.amount - &remaining;
            let paid = std::mem::replace(&mut remaining, zero.clone());
            AllocatedInvoice {
                invoice: invoice.clone(),
                status: AllocationStatus::PartialPayment,
                paid,
                due: Some(due),
            }
        };
        allocated.push(entry);
    }

    AllocationResult {
        allocated,
        remaining_credit: remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn invoices(amounts: &[&str]) -> Vec<Invoice> {
        amounts
            .iter()
            .zip(1u32..)
            .map(|(a, id)| Invoice {
                id,
                original_text: a.to_string(),
                amount: dec(a),
            })
            .collect()
    }

    fn statuses(result: &AllocationResult) -> Vec<AllocationStatus> {
        result.allocated.iter().map(|a| a.status).collect()
    }

    #[test]
    fn fills_in_order_then_splits() {
        let result = allocate_oldest_first(&invoices(&["100.00", "200.00", "300.00"]), &dec("250.00"));

        assert_eq!(
            statuses(&result),
            vec![
                AllocationStatus::PaidInFull,
                AllocationStatus::PartialPayment,
                AllocationStatus::Unpaid,
            ]
        );
        assert_eq!(result.allocated[0].paid, dec("100"));
        assert_eq!(result.allocated[1].paid, dec("150"));
        assert_eq!(result.allocated[1].due, Some(dec("50")));
        assert_eq!(result.allocated[2].paid, dec("0"));
        assert!(result.allocated[2].due.is_none());
        assert!(result.remaining_credit.is_zero());
    }

    #[test]
    fn overpayment_leaves_credit() {
        let result = allocate_oldest_first(&invoices(&["500.00"]), &dec("750.00"));
        assert_eq!(statuses(&result), vec![AllocationStatus::PaidInFull]);
        assert_eq!(result.remaining_credit, dec("250.00"));
    }

    #[test]
    fn exact_exhaustion_marks_rest_unpaid() {
        let result = allocate_oldest_first(&invoices(&["100", "100", "100"]), &dec("200"));
        assert_eq!(
            statuses(&result),
            vec![
                AllocationStatus::PaidInFull,
                AllocationStatus::PaidInFull,
                AllocationStatus::Unpaid,
            ]
        );
        assert!(result.remaining_credit.is_zero());
    }

    #[test]
    fn paid_plus_credit_equals_payment() {
        let payment = dec("1234.56");
        let result = allocate_oldest_first(&invoices(&["99.99", "0.01", "1000", "500.50"]), &payment);
        assert_eq!(result.total_paid() + &result.remaining_credit, payment);
    }
}
