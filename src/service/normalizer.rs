use crate::error::ReconcileError;
use crate::models::Invoice;
use bigdecimal::{BigDecimal, Zero};
use std::str::FromStr;

/// 校验后的输入: 发票列表 (保持输入顺序) 与付款金额
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedInput {
    pub invoices: Vec<Invoice>,
    pub payment: BigDecimal,
    /// 被丢弃的非空发票行数
    pub dropped_lines: usize,
}

/// 解析金额文本: 去掉 `$` 与千分位 `,` 后严格按十进制解析
///
/// 只接受 `[+-]digits[.digits]` 形式，科学计数法 (`1e5`) 视为无效。
pub fn parse_amount(raw: &str) -> Option<BigDecimal> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '$' | ',')).collect();
    let cleaned = cleaned.trim();
    if !is_plain_decimal(cleaned) {
        return None;
    }
    BigDecimal::from_str(cleaned).ok()
}

fn is_plain_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix(&['+', '-'][..]).unwrap_or(text);
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    !(whole.is_empty() && fraction.is_empty()) && all_digits(whole) && all_digits(fraction)
}

fn parse_positive(raw: &str) -> Option<BigDecimal> {
    parse_amount(raw).filter(|amount| *amount > BigDecimal::zero())
}

/// 按行解析发票金额
///
/// 空行、无法解析的行以及金额 <= 0 的行直接丢弃，不报错也不占用编号。
pub fn parse_invoices(text: &str) -> Vec<Invoice> {
    parse_lines(text).0
}

/// 返回保留的发票与被丢弃的非空行数
fn parse_lines(text: &str) -> (Vec<Invoice>, usize) {
    let mut dropped = 0;
    let invoices = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match parse_positive(line) {
            Some(amount) => Some((line, amount)),
            None => {
                dropped += 1;
                None
            }
        })
        .zip(1u32..)
        .map(|((line, amount), id)| Invoice {
            id,
            original_text: line.to_string(),
            amount,
        })
        .collect();
    (invoices, dropped)
}

/// 校验全部输入；任何一项不合法时整体失败，不返回部分结果
pub fn normalize(invoice_text: &str, payment_text: &str) -> Result<NormalizedInput, ReconcileError> {
    let (invoices, dropped_lines) = parse_lines(invoice_text);
    if invoices.is_empty() {
        return Err(ReconcileError::NoValidInvoices);
    }

    let payment = parse_positive(payment_text).ok_or_else(|| ReconcileError::InvalidPayment {
        raw: payment_text.to_string(),
    })?;

    Ok(NormalizedInput {
        invoices,
        payment,
        dropped_lines,
    })
}
