// ==========================================
// 医院库存ERP系统 - 通用列约束校验
// ==========================================
// 依据: 批量导入平台设计文档 - Row Validator
// 职责: 按列定义执行 必填/类型/长度/范围/枚举/格式 校验
// 用途: 业务模块在自身规则之前复用
// ==========================================

use crate::domain::column::ColumnDef;
use crate::domain::row::{CellValue, ParsedRow};
use crate::domain::types::ColumnType;
use crate::domain::validation::ValidationIssue;
use regex::Regex;
use std::collections::HashMap;

// ===== 机器码 =====
pub const CODE_REQUIRED_MISSING: &str = "REQUIRED_MISSING";
pub const CODE_TYPE_MISMATCH: &str = "TYPE_MISMATCH";
pub const CODE_LENGTH_OUT_OF_RANGE: &str = "LENGTH_OUT_OF_RANGE";
pub const CODE_VALUE_OUT_OF_RANGE: &str = "VALUE_OUT_OF_RANGE";
pub const CODE_VALUE_NOT_ALLOWED: &str = "VALUE_NOT_ALLOWED";
pub const CODE_PATTERN_MISMATCH: &str = "PATTERN_MISMATCH";

// ==========================================
// ColumnRuleValidator - 列约束校验器
// ==========================================
// 正则按列预编译,校验期零编译开销
pub struct ColumnRuleValidator {
    columns: Vec<ColumnDef>,
    patterns: HashMap<String, Regex>,
}

impl ColumnRuleValidator {
    /// 构造校验器,非法正则视为列定义错误
    pub fn new(columns: &[ColumnDef]) -> Result<Self, regex::Error> {
        let mut patterns = HashMap::new();
        for column in columns {
            if let Some(pattern) = &column.pattern {
                patterns.insert(column.name.clone(), Regex::new(pattern)?);
            }
        }
        Ok(Self {
            columns: columns.to_vec(),
            patterns,
        })
    }

    /// 校验单行,返回全部违规(空 Vec 表示整行合规)
    pub fn validate_row(&self, row: &ParsedRow, row_number: usize) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for column in &self.columns {
            let value = row.get(&column.name);

            if value.is_empty() {
                if column.required {
                    issues.push(ValidationIssue::error(
                        row_number,
                        &column.name,
                        CODE_REQUIRED_MISSING,
                        format!("{} 为必填项", column.header()),
                    ));
                }
                continue;
            }

            match column.column_type {
                ColumnType::String => self.check_string(column, value, row_number, &mut issues),
                ColumnType::Number => self.check_number(column, value, row_number, &mut issues),
                ColumnType::Boolean => self.check_boolean(column, value, row_number, &mut issues),
                ColumnType::Date => self.check_date(column, value, row_number, &mut issues),
            }
        }

        issues
    }

    fn check_string(
        &self,
        column: &ColumnDef,
        value: &CellValue,
        row_number: usize,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let text = match value.as_text() {
            Some(t) => t,
            None => return,
        };

        let len = text.chars().count();
        if let Some(min) = column.min_length {
            if len < min {
                issues.push(ValidationIssue::error(
                    row_number,
                    &column.name,
                    CODE_LENGTH_OUT_OF_RANGE,
                    format!("{} 长度 {} 小于下限 {}", column.header(), len, min),
                ));
            }
        }
        if let Some(max) = column.max_length {
            if len > max {
                issues.push(ValidationIssue::error(
                    row_number,
                    &column.name,
                    CODE_LENGTH_OUT_OF_RANGE,
                    format!("{} 长度 {} 超出上限 {}", column.header(), len, max),
                ));
            }
        }

        if let Some(values) = &column.allowed_values {
            if !values.iter().any(|v| v == &text) {
                issues.push(ValidationIssue::error(
                    row_number,
                    &column.name,
                    CODE_VALUE_NOT_ALLOWED,
                    format!(
                        "{} 取值 {} 不在枚举范围({})",
                        column.header(),
                        text,
                        values.join("/")
                    ),
                ));
            }
        }

        if let Some(regex) = self.patterns.get(&column.name) {
            if !regex.is_match(&text) {
                issues.push(ValidationIssue::error(
                    row_number,
                    &column.name,
                    CODE_PATTERN_MISMATCH,
                    format!("{} 取值 {} 不符合格式要求", column.header(), text),
                ));
            }
        }
    }

    fn check_number(
        &self,
        column: &ColumnDef,
        value: &CellValue,
        row_number: usize,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let number = match value.as_number() {
            Some(n) => n,
            None => {
                issues.push(ValidationIssue::error(
                    row_number,
                    &column.name,
                    CODE_TYPE_MISMATCH,
                    format!(
                        "{} 取值 {} 不是有效数值",
                        column.header(),
                        value.as_text().unwrap_or_default()
                    ),
                ));
                return;
            }
        };

        if let Some(min) = column.min_value {
            if number < min {
                issues.push(ValidationIssue::error(
                    row_number,
                    &column.name,
                    CODE_VALUE_OUT_OF_RANGE,
                    format!("{} 取值 {} 小于下限 {}", column.header(), number, min),
                ));
            }
        }
        if let Some(max) = column.max_value {
            if number > max {
                issues.push(ValidationIssue::error(
                    row_number,
                    &column.name,
                    CODE_VALUE_OUT_OF_RANGE,
                    format!("{} 取值 {} 超出上限 {}", column.header(), number, max),
                ));
            }
        }
    }

    fn check_boolean(
        &self,
        column: &ColumnDef,
        value: &CellValue,
        row_number: usize,
        issues: &mut Vec<ValidationIssue>,
    ) {
        if value.as_boolean().is_none() {
            issues.push(ValidationIssue::error(
                row_number,
                &column.name,
                CODE_TYPE_MISMATCH,
                format!(
                    "{} 取值 {} 不是有效布尔值(true/false/1/0/是/否)",
                    column.header(),
                    value.as_text().unwrap_or_default()
                ),
            ));
        }
    }

    fn check_date(
        &self,
        column: &ColumnDef,
        value: &CellValue,
        row_number: usize,
        issues: &mut Vec<ValidationIssue>,
    ) {
        if value.as_date().is_none() {
            issues.push(ValidationIssue::error(
                row_number,
                &column.name,
                CODE_TYPE_MISMATCH,
                format!(
                    "{} 取值 {} 不是有效日期(YYYY-MM-DD)",
                    column.header(),
                    value.as_text().unwrap_or_default()
                ),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> ColumnRuleValidator {
        let columns = vec![
            ColumnDef::new("drug_code", ColumnType::String)
                .display("药品编码")
                .required()
                .length(None, Some(10))
                .pattern(r"^D\d{4}$"),
            ColumnDef::new("unit", ColumnType::String)
                .display("单位")
                .allowed(&["盒", "瓶"]),
            ColumnDef::new("unit_price", ColumnType::Number)
                .display("单价")
                .range(Some(0.0), Some(100000.0)),
            ColumnDef::new("expiry_date", ColumnType::Date).display("效期"),
        ];
        ColumnRuleValidator::new(&columns).expect("列定义应合法")
    }

    fn row_with(pairs: &[(&str, CellValue)]) -> ParsedRow {
        let mut row = ParsedRow::new(1);
        for (name, value) in pairs {
            row.set(name, value.clone());
        }
        row
    }

    #[test]
    fn test_required_missing() {
        let row = row_with(&[("unit", CellValue::Text("盒".to_string()))]);
        let issues = validator().validate_row(&row, 1);
        assert!(issues
            .iter()
            .any(|i| i.field == "drug_code" && i.code == CODE_REQUIRED_MISSING));
    }

    #[test]
    fn test_pattern_mismatch() {
        let row = row_with(&[("drug_code", CellValue::Text("X001".to_string()))]);
        let issues = validator().validate_row(&row, 3);
        let issue = issues
            .iter()
            .find(|i| i.code == CODE_PATTERN_MISMATCH)
            .expect("应产生格式违规");
        assert_eq!(issue.row_number, 3);
    }

    #[test]
    fn test_enum_violation() {
        let row = row_with(&[
            ("drug_code", CellValue::Text("D0001".to_string())),
            ("unit", CellValue::Text("箱".to_string())),
        ]);
        let issues = validator().validate_row(&row, 1);
        assert!(issues.iter().any(|i| i.code == CODE_VALUE_NOT_ALLOWED));
    }

    #[test]
    fn test_number_range_and_type() {
        let row = row_with(&[
            ("drug_code", CellValue::Text("D0001".to_string())),
            ("unit_price", CellValue::Text("-5".to_string())),
        ]);
        let issues = validator().validate_row(&row, 1);
        assert!(issues.iter().any(|i| i.code == CODE_VALUE_OUT_OF_RANGE));

        let row = row_with(&[
            ("drug_code", CellValue::Text("D0001".to_string())),
            ("unit_price", CellValue::Text("abc".to_string())),
        ]);
        let issues = validator().validate_row(&row, 1);
        assert!(issues.iter().any(|i| i.code == CODE_TYPE_MISMATCH));
    }

    #[test]
    fn test_clean_row_passes() {
        let row = row_with(&[
            ("drug_code", CellValue::Text("D0001".to_string())),
            ("unit", CellValue::Text("盒".to_string())),
            ("unit_price", CellValue::Number(12.5)),
            ("expiry_date", CellValue::Text("2026-01-01".to_string())),
        ]);
        assert!(validator().validate_row(&row, 1).is_empty());
    }
}
