use crate::models::Reconciliation;
use bigdecimal::BigDecimal;
use std::io::Write;

/// 将 Option<BigDecimal> 转换为 CSV 字符串
fn option_to_csv(val: &Option<BigDecimal>) -> String {
    val.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

/// 导出先到先付分配明细到 CSV (供审计留档)
///
/// 每张发票一行，末尾追加一行 `credit` 记录贷方余额。
pub fn write_allocation_csv<W: Write>(result: &Reconciliation, output: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(["invoice_id", "original", "amount", "status", "paid", "due"])?;

    for entry in &result.oldest_first.allocated {
        writer.write_record(&[
            entry.invoice.id.to_string(),
            entry.invoice.original_text.clone(),
            entry.invoice.amount.to_string(),
            entry.status.to_string(),
            entry.paid.to_string(),
            option_to_csv(&entry.due),
        ])?;
    }

    writer.write_record(&[
        "credit".to_string(),
        String::new(),
        result.oldest_first.remaining_credit.to_string(),
        String::new(),
        String::new(),
        String::new(),
    ])?;

    writer.flush()?;
    Ok(())
}
