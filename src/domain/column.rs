// ==========================================
// 医院库存ERP系统 - 列定义
// ==========================================
// 依据: 批量导入平台设计文档 - 数据模型
// 用途: 模板生成 / 位置映射 / 通用约束校验共用
// 生命周期: 每个业务模块静态提供,运行期不可变
// ==========================================

use crate::domain::types::ColumnType;
use serde::{Deserialize, Serialize};

// ==========================================
// ColumnDef - 单个可导入字段描述
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    // ===== 标识 =====
    pub name: String,                 // 内部字段名(解析行的键)
    pub display_name: Option<String>, // 模板表头显示名(缺省回退 name)

    // ===== 语义 =====
    pub column_type: ColumnType, // 语义类型(string/number/boolean/date)
    pub required: bool,          // 必填标记

    // ===== 约束 =====
    pub min_length: Option<usize>,           // 最小长度(文本)
    pub max_length: Option<usize>,           // 最大长度(文本)
    pub min_value: Option<f64>,              // 最小值(数值)
    pub max_value: Option<f64>,              // 最大值(数值)
    pub allowed_values: Option<Vec<String>>, // 枚举取值列表
    pub pattern: Option<String>,             // 正则约束

    // ===== 模板示例 =====
    pub example: Option<String>, // 显式示例值(缺省按类型生成)
}

impl ColumnDef {
    /// 创建最小列定义(无约束)
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            display_name: None,
            column_type,
            required: false,
            min_length: None,
            max_length: None,
            min_value: None,
            max_value: None,
            allowed_values: None,
            pattern: None,
            example: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn display(mut self, display_name: &str) -> Self {
        self.display_name = Some(display_name.to_string());
        self
    }

    pub fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    pub fn allowed(mut self, values: &[&str]) -> Self {
        self.allowed_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Self {
        self.pattern = Some(pattern.to_string());
        self
    }

    pub fn example(mut self, example: &str) -> Self {
        self.example = Some(example.to_string());
        self
    }

    /// 模板表头显示名(回退内部字段名)
    pub fn header(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// 约束提示文本(模板内嵌说明)
    pub fn constraint_hint(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        parts.push(format!("类型={}", self.column_type));
        if self.required {
            parts.push("必填".to_string());
        }
        match (self.min_length, self.max_length) {
            (Some(min), Some(max)) => parts.push(format!("长度[{}..{}]", min, max)),
            (Some(min), None) => parts.push(format!("长度>={}", min)),
            (None, Some(max)) => parts.push(format!("长度<={}", max)),
            (None, None) => {}
        }
        match (self.min_value, self.max_value) {
            (Some(min), Some(max)) => parts.push(format!("范围[{}..{}]", min, max)),
            (Some(min), None) => parts.push(format!("最小值{}", min)),
            (None, Some(max)) => parts.push(format!("最大值{}", max)),
            (None, None) => {}
        }
        if let Some(values) = &self.allowed_values {
            parts.push(format!("枚举({})", values.join("/")));
        }
        if let Some(pattern) = &self.pattern {
            parts.push(format!("格式 {}", pattern));
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fallback() {
        let col = ColumnDef::new("drug_code", ColumnType::String);
        assert_eq!(col.header(), "drug_code");

        let col = col.display("药品编码");
        assert_eq!(col.header(), "药品编码");
    }

    #[test]
    fn test_constraint_hint() {
        let col = ColumnDef::new("unit", ColumnType::String)
            .required()
            .allowed(&["盒", "瓶", "支"]);
        let hint = col.constraint_hint();
        assert!(hint.contains("必填"));
        assert!(hint.contains("枚举(盒/瓶/支)"));
    }
}
