// ==========================================
// 医院库存ERP系统 - 导入模板生成器
// ==========================================
// 依据: 批量导入平台设计文档 - Template Generator
// 输出: CSV(表头+示例行+约束说明注释) / Excel(列宽+下拉+批注)
// 红线: 示例行必须能通过同一套列约束校验
// ==========================================

use crate::domain::column::ColumnDef;
use crate::domain::types::{ColumnType, FileFormat};
use crate::importer::error::ImportResult;
use rust_xlsxwriter::{DataValidation, Format, Note, Workbook};

pub struct TemplateGenerator;

impl TemplateGenerator {
    /// 生成下载模板
    ///
    /// # 参数
    /// - columns: 列定义列表
    /// - format: csv / excel
    ///
    /// # 返回
    /// - Ok(Vec<u8>): 模板文件字节
    pub fn generate(columns: &[ColumnDef], format: FileFormat) -> ImportResult<Vec<u8>> {
        match format {
            FileFormat::Csv => Self::generate_csv(columns),
            FileFormat::Excel => Self::generate_excel(columns),
        }
    }

    /// 示例值: 显式示例 > 首个枚举值 > 类型占位
    fn example_value(column: &ColumnDef) -> String {
        if let Some(example) = &column.example {
            return example.clone();
        }
        if let Some(values) = &column.allowed_values {
            if let Some(first) = values.first() {
                return first.clone();
            }
        }
        match column.column_type {
            ColumnType::String => format!("示例{}", column.header()),
            ColumnType::Number => match column.min_value {
                // 默认占位可能超出范围约束,回退到最小值
                Some(min) if min > 100.0 => format!("{}", min),
                _ => "100".to_string(),
            },
            ColumnType::Boolean => "true".to_string(),
            ColumnType::Date => chrono::Local::now()
                .date_naive()
                .format("%Y-%m-%d")
                .to_string(),
        }
    }

    /// CSV 模板: 表头行 + 示例行 + '#' 前缀约束说明
    fn generate_csv(columns: &[ColumnDef]) -> ImportResult<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        let headers: Vec<&str> = columns.iter().map(|c| c.header()).collect();
        writer.write_record(&headers)?;

        let example: Vec<String> = columns.iter().map(Self::example_value).collect();
        writer.write_record(&example)?;

        let mut buffer = writer
            .into_inner()
            .map_err(|e| crate::importer::error::ImportError::InternalError(e.to_string()))?;

        // 约束说明段(解析器按 '#' 注释跳过)
        buffer.extend_from_slice("# 填写说明:\n".as_bytes());
        for column in columns {
            let line = format!("# {}: {}\n", column.header(), column.constraint_hint());
            buffer.extend_from_slice(line.as_bytes());
        }

        Ok(buffer)
    }

    /// Excel 模板: 加粗表头 + 列宽 + 枚举下拉 + 表头批注
    fn generate_excel(columns: &[ColumnDef]) -> ImportResult<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        let header_format = Format::new().set_bold();

        for (idx, column) in columns.iter().enumerate() {
            let col = idx as u16;

            worksheet.write_with_format(0, col, column.header(), &header_format)?;
            worksheet.write_string(1, col, Self::example_value(column))?;

            // 列宽按显示名与示例取宽(最低 12 字符)
            let width = column
                .header()
                .chars()
                .count()
                .max(Self::example_value(column).chars().count())
                .max(12) as f64;
            worksheet.set_column_width(col, width * 1.2)?;

            // 枚举列添加下拉约束
            if let Some(values) = &column.allowed_values {
                let list: Vec<&str> = values.iter().map(|v| v.as_str()).collect();
                let validation = DataValidation::new().allow_list_strings(&list)?;
                worksheet.add_data_validation(1, col, 1048575, col, &validation)?;
            }

            // 表头批注: 约束说明
            let note = Note::new(column.constraint_hint()).set_author("导入模板");
            worksheet.insert_note(0, col, &note)?;
        }

        Ok(workbook.save_to_buffer()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::FileFormat;

    fn test_columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("drug_code", ColumnType::String)
                .display("药品编码")
                .required()
                .example("D0001"),
            ColumnDef::new("unit", ColumnType::String)
                .display("单位")
                .allowed(&["盒", "瓶", "支"]),
            ColumnDef::new("unit_price", ColumnType::Number)
                .display("单价")
                .range(Some(0.0), Some(100000.0)),
            ColumnDef::new("expiry_date", ColumnType::Date).display("效期"),
        ]
    }

    #[test]
    fn test_csv_template_structure() {
        let buffer = TemplateGenerator::generate(&test_columns(), FileFormat::Csv)
            .expect("CSV 模板生成应成功");
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        // 表头 + 示例行 + 说明段
        assert!(lines[0].starts_with("药品编码,单位,单价,效期"));
        assert!(lines[1].starts_with("D0001,盒,100,"));
        assert!(lines[2].starts_with("# 填写说明"));
        assert!(lines.iter().any(|l| l.starts_with("# 药品编码:")));
    }

    #[test]
    fn test_example_value_prefers_enum_then_type() {
        let cols = test_columns();
        assert_eq!(TemplateGenerator::example_value(&cols[0]), "D0001");
        assert_eq!(TemplateGenerator::example_value(&cols[1]), "盒");
        assert_eq!(TemplateGenerator::example_value(&cols[2]), "100");
    }

    #[test]
    fn test_excel_template_nonempty() {
        let buffer = TemplateGenerator::generate(&test_columns(), FileFormat::Excel)
            .expect("Excel 模板生成应成功");
        // xlsx 是 zip 容器,以 PK 开头
        assert_eq!(&buffer[..2], b"PK");
    }
}
