// ==========================================
// 医院库存ERP系统 - 解析行模型
// ==========================================
// 依据: 批量导入平台设计文档 - 数据模型
// 用途: 文件解析产物,按文件顺序流经校验与落库
// 生命周期: 仅在校验会话存续期内持有
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// CellValue - 带类型标签的标量值
// ==========================================
// 红线: 解析层不做业务校验,只做结构化提取
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
    Empty,
}

impl CellValue {
    /// 从原始文本构造(空白 → Empty)
    pub fn from_raw_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// 文本视图(数值/布尔/日期按标准格式渲染)
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Number(n) => {
                // 整数值不带小数点渲染,与 Excel 单元格显示一致
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(n.to_string())
                }
            }
            CellValue::Boolean(b) => Some(b.to_string()),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            CellValue::Empty => None,
        }
    }

    /// 数值视图(文本做宽松解析)
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Boolean(_) | CellValue::Date(_) | CellValue::Empty => None,
        }
    }

    /// 布尔视图(接受 true/false/1/0/是/否)
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            CellValue::Boolean(b) => Some(*b),
            CellValue::Number(n) => match *n as i64 {
                1 => Some(true),
                0 => Some(false),
                _ => None,
            },
            CellValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" | "是" | "y" => Some(true),
                "false" | "0" | "否" | "n" => Some(false),
                _ => None,
            },
            CellValue::Date(_) | CellValue::Empty => None,
        }
    }

    /// 日期视图(文本接受 ISO / YYYYMMDD / 斜杠格式)
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y%m%d"))
                    .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y/%m/%d"))
                    .ok()
            }
            _ => None,
        }
    }
}

// ==========================================
// ParsedRow - 单行解析结果
// ==========================================
// 不变量: row_number 为 1 起始的数据行号,与校验问题行号一一对应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedRow {
    pub row_number: usize,
    pub values: BTreeMap<String, CellValue>,
}

impl ParsedRow {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            values: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, column: &str, value: CellValue) {
        self.values.insert(column.to_string(), value);
    }

    /// 列值读取(缺失列等价于空值)
    pub fn get(&self, column: &str) -> &CellValue {
        self.values.get(column).unwrap_or(&CellValue::Empty)
    }

    /// 整行是否为空(解析层据此丢弃尾部空行)
    pub fn is_blank(&self) -> bool {
        self.values.values().all(|v| v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_text_blank() {
        assert_eq!(CellValue::from_raw_text("  "), CellValue::Empty);
        assert_eq!(
            CellValue::from_raw_text(" 阿莫西林 "),
            CellValue::Text("阿莫西林".to_string())
        );
    }

    #[test]
    fn test_as_number_lenient() {
        assert_eq!(CellValue::Text("12.5".to_string()).as_number(), Some(12.5));
        assert_eq!(CellValue::Number(3.0).as_number(), Some(3.0));
        assert_eq!(CellValue::Text("abc".to_string()).as_number(), None);
    }

    #[test]
    fn test_as_boolean_variants() {
        assert_eq!(CellValue::Text("是".to_string()).as_boolean(), Some(true));
        assert_eq!(CellValue::Text("0".to_string()).as_boolean(), Some(false));
        assert_eq!(CellValue::Number(1.0).as_boolean(), Some(true));
        assert_eq!(CellValue::Text("maybe".to_string()).as_boolean(), None);
    }

    #[test]
    fn test_as_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 20).unwrap();
        for raw in ["2025-01-20", "20250120", "2025/01/20"] {
            assert_eq!(
                CellValue::Text(raw.to_string()).as_date(),
                Some(expected),
                "格式 {} 应可解析",
                raw
            );
        }
    }

    #[test]
    fn test_parsed_row_blank() {
        let mut row = ParsedRow::new(1);
        assert!(row.is_blank());
        row.set("drug_code", CellValue::Empty);
        assert!(row.is_blank());
        row.set("drug_name", CellValue::Text("青霉素".to_string()));
        assert!(!row.is_blank());
    }
}
