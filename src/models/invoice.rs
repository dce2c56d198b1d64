use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// 待核销发票 (由输入文本的一行生成)
///
/// `id` 为有效行的顺序号，从 1 开始；被丢弃的行不占用编号。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: u32,
    pub original_text: String,
    pub amount: BigDecimal,
}
