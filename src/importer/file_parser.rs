// ==========================================
// 医院库存ERP系统 - 上传文件解析器
// ==========================================
// 依据: 批量导入平台设计文档 - File Parser
// 支持: CSV / Excel(仅第一个工作表)
// 红线: 纯结构化提取,不做业务校验
// 映射: 按列定义顺序位置映射,表头行仅作参考
// ==========================================

use crate::domain::column::ColumnDef;
use crate::domain::row::{CellValue, ParsedRow};
use crate::domain::types::FileFormat;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::io::Cursor;

/// CSV 约束说明行前缀(与模板生成器一致)
pub const CSV_COMMENT_MARKER: u8 = b'#';

pub struct FileParser;

impl FileParser {
    /// 解析上传缓冲区为有序解析行
    ///
    /// # 参数
    /// - buffer: 上传文件字节
    /// - format: csv / excel
    /// - columns: 列定义列表(文件第 N 列映射到第 N 个定义)
    ///
    /// # 返回
    /// - Ok(Vec<ParsedRow>): 按文件顺序的行记录,行号 1 起始
    /// - Err(ParseError): 缓冲区无法按指定格式解码
    pub fn parse_buffer(
        buffer: &[u8],
        format: FileFormat,
        columns: &[ColumnDef],
    ) -> ImportResult<Vec<ParsedRow>> {
        match format {
            FileFormat::Csv => Self::parse_csv(buffer, columns),
            FileFormat::Excel => Self::parse_excel(buffer, columns),
        }
    }

    /// CSV 解析: 首行视为表头跳过,后续行位置映射
    fn parse_csv(buffer: &[u8], columns: &[ColumnDef]) -> ImportResult<Vec<ParsedRow>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .comment(Some(CSV_COMMENT_MARKER))
            .from_reader(buffer);

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;

            let mut row = ParsedRow::new(rows.len() + 1);
            for (idx, column) in columns.iter().enumerate() {
                let value = record
                    .get(idx)
                    .map(CellValue::from_raw_text)
                    .unwrap_or(CellValue::Empty);
                row.set(&column.name, value);
            }

            // 跳过完全空白的行
            if row.is_blank() {
                continue;
            }

            rows.push(row);
        }

        Ok(rows)
    }

    /// Excel 解析: 仅第一个工作表,首行跳过,后续行位置映射
    fn parse_excel(buffer: &[u8], columns: &[ColumnDef]) -> ImportResult<Vec<ParsedRow>> {
        let cursor = Cursor::new(buffer.to_vec());
        let mut workbook: Xlsx<_> = Xlsx::new(cursor)?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ImportError::ParseError("Excel 文件无工作表".to_string()))?
            .map_err(|e| ImportError::ParseError(format!("Excel 解析失败: {}", e)))?;

        let mut rows = Vec::new();
        for excel_row in range.rows().skip(1) {
            let mut row = ParsedRow::new(rows.len() + 1);
            for (idx, column) in columns.iter().enumerate() {
                let value = excel_row
                    .get(idx)
                    .map(Self::convert_cell)
                    .unwrap_or(CellValue::Empty);
                row.set(&column.name, value);
            }

            if row.is_blank() {
                continue;
            }

            rows.push(row);
        }

        Ok(rows)
    }

    /// calamine 单元格 → 带类型标签的标量
    fn convert_cell(cell: &Data) -> CellValue {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::from_raw_text(s),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::Bool(b) => CellValue::Boolean(*b),
            Data::DateTime(dt) => match Self::excel_serial_to_date(dt.as_f64()) {
                Some(date) => CellValue::Date(date),
                None => CellValue::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) => match NaiveDate::parse_from_str(&s[..s.len().min(10)], "%Y-%m-%d")
            {
                Ok(date) => CellValue::Date(date),
                Err(_) => CellValue::from_raw_text(s),
            },
            Data::DurationIso(s) => CellValue::from_raw_text(s),
            Data::Error(e) => CellValue::Text(format!("#ERR:{:?}", e)),
        }
    }

    /// Excel 日期序列号 → NaiveDate(1900 日期系统,纪元 1899-12-30)
    fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
        if serial <= 0.0 {
            return None;
        }
        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
        epoch.checked_add_signed(chrono::Duration::days(serial.trunc() as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::ColumnType;

    fn test_columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("drug_code", ColumnType::String).display("药品编码"),
            ColumnDef::new("drug_name", ColumnType::String).display("药品名称"),
            ColumnDef::new("unit_price", ColumnType::Number).display("单价"),
        ]
    }

    #[test]
    fn test_parse_csv_positional() {
        // 表头名称故意与列定义不一致: 映射必须按位置而非表头
        let csv = "编码,名称,价格\nD001,阿莫西林,12.5\nD002,青霉素,8\n";
        let rows = FileParser::parse_buffer(csv.as_bytes(), FileFormat::Csv, &test_columns())
            .expect("CSV 解析应成功");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 1);
        assert_eq!(
            rows[0].get("drug_code"),
            &CellValue::Text("D001".to_string())
        );
        assert_eq!(rows[1].get("drug_name").as_text().unwrap(), "青霉素");
        assert_eq!(rows[1].get("unit_price").as_number(), Some(8.0));
    }

    #[test]
    fn test_parse_csv_skips_blank_and_comment_lines() {
        let csv = "a,b,c\n# 约束说明: 药品编码 必填\nD001,阿莫西林,12.5\n,,\n";
        let rows = FileParser::parse_buffer(csv.as_bytes(), FileFormat::Csv, &test_columns())
            .expect("CSV 解析应成功");

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_number, 1);
    }

    #[test]
    fn test_parse_csv_short_row_padded_empty() {
        let csv = "a,b,c\nD001,阿莫西林\n";
        let rows = FileParser::parse_buffer(csv.as_bytes(), FileFormat::Csv, &test_columns())
            .expect("CSV 解析应成功");

        assert_eq!(rows.len(), 1);
        assert!(rows[0].get("unit_price").is_empty());
    }

    #[test]
    fn test_parse_excel_invalid_buffer() {
        let result =
            FileParser::parse_buffer(b"not an xlsx file", FileFormat::Excel, &test_columns());
        assert!(matches!(result, Err(ImportError::ParseError(_))));
    }

    #[test]
    fn test_excel_serial_to_date() {
        // 45678 = 2025-01-21
        assert_eq!(
            FileParser::excel_serial_to_date(45678.0),
            NaiveDate::from_ymd_opt(2025, 1, 21)
        );
        assert_eq!(FileParser::excel_serial_to_date(0.0), None);
    }
}
