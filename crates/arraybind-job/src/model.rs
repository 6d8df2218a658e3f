//! Supplier price-list row

use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use arraybind_core::{DbType, Row, Value};
use arraybind_marshal::{bulk_record, convert_value};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// One row of `supplier_price_list`.
///
/// Field names double as the placeholder names of the update statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SupplierPriceEntry {
    pub plan_date: NaiveDateTime,
    pub branch_code: i64,
    pub item_code: i64,
    pub list_seq: i32,
    pub approval_status: i16,
    pub supplier_code: i64,
    pub city_code: i64,
    pub state_code: Option<String>,
    pub price: Decimal,
    pub ipi_pct: Decimal,
    pub icms_pct: Decimal,
    pub freight_type: Option<String>,
    pub approved_at: NaiveDateTime,
    pub icms_invoice_rate: Decimal,
    pub item_origin: i16,
    pub icms_fund_pct: Decimal,
}

bulk_record!(SupplierPriceEntry {
    plan_date: NaiveDateTime,
    branch_code: i64,
    item_code: i64,
    list_seq: i32,
    approval_status: i16,
    supplier_code: i64,
    city_code: i64,
    state_code: Option<String>,
    price: Decimal,
    ipi_pct: Decimal,
    icms_pct: Decimal,
    freight_type: Option<String>,
    approved_at: NaiveDateTime,
    icms_invoice_rate: Decimal,
    item_origin: i16,
    icms_fund_pct: Decimal,
});

impl TryFrom<&Row> for SupplierPriceEntry {
    type Error = anyhow::Error;

    fn try_from(row: &Row) -> Result<Self> {
        Ok(Self {
            plan_date: datetime(row, "plan_date")?,
            branch_code: int64(row, "branch_code")?,
            item_code: int64(row, "item_code")?,
            list_seq: int32(row, "list_seq")?,
            approval_status: int16(row, "approval_status")?,
            supplier_code: int64(row, "supplier_code")?,
            city_code: int64(row, "city_code")?,
            state_code: optional_text(row, "state_code")?,
            price: decimal(row, "price")?,
            ipi_pct: decimal(row, "ipi_pct")?,
            icms_pct: decimal(row, "icms_pct")?,
            freight_type: optional_text(row, "freight_type")?,
            approved_at: datetime(row, "approved_at")?,
            icms_invoice_rate: decimal(row, "icms_invoice_rate")?,
            item_origin: int16(row, "item_origin")?,
            icms_fund_pct: decimal(row, "icms_fund_pct")?,
        })
    }
}

fn column<'a>(row: &'a Row, name: &str) -> Result<Option<&'a Value>> {
    let value = row
        .get_by_name(name)
        .with_context(|| format!("column {} is missing from the result", name))?;
    Ok((!value.is_null()).then_some(value))
}

fn required(row: &Row, name: &str, target: DbType) -> Result<Value> {
    let value = column(row, name)?.with_context(|| format!("column {} is NULL", name))?;
    convert_value(value, target).map_err(|reason| anyhow!("column {}: {}", name, reason))
}

fn int16(row: &Row, name: &str) -> Result<i16> {
    match required(row, name, DbType::Int16)? {
        Value::Int16(v) => Ok(v),
        other => bail!("column {}: unexpected {}", name, other.type_name()),
    }
}

fn int32(row: &Row, name: &str) -> Result<i32> {
    match required(row, name, DbType::Int32)? {
        Value::Int32(v) => Ok(v),
        other => bail!("column {}: unexpected {}", name, other.type_name()),
    }
}

fn int64(row: &Row, name: &str) -> Result<i64> {
    match required(row, name, DbType::Int64)? {
        Value::Int64(v) => Ok(v),
        other => bail!("column {}: unexpected {}", name, other.type_name()),
    }
}

fn decimal(row: &Row, name: &str) -> Result<Decimal> {
    match required(row, name, DbType::Decimal)? {
        Value::Decimal(text) => Decimal::from_str(&text)
            .with_context(|| format!("column {}: '{}' is not a decimal", name, text)),
        other => bail!("column {}: unexpected {}", name, other.type_name()),
    }
}

fn datetime(row: &Row, name: &str) -> Result<NaiveDateTime> {
    match required(row, name, DbType::Date)? {
        Value::DateTime(v) => Ok(v),
        other => bail!("column {}: unexpected {}", name, other.type_name()),
    }
}

fn optional_text(row: &Row, name: &str) -> Result<Option<String>> {
    column(row, name)?
        .map(|value| {
            convert_value(value, DbType::Varchar)
                .map_err(|reason| anyhow!("column {}: {}", name, reason))
                .and_then(|converted| match converted {
                    Value::String(text) => Ok(text),
                    other => bail!("column {}: unexpected {}", name, other.type_name()),
                })
        })
        .transpose()
}
