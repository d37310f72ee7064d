// src/models/report.rs

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

// Mês de calendário no formato "YYYY-MM"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportMonth {
    year: i32,
    month: u32,
}

impl ReportMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, AppError> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|_| Self { year, month })
            .ok_or(AppError::InvalidInput { field: "month", code: "invalid_month" })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn last_day(&self) -> NaiveDate {
        let (y, m) = if self.month == 12 { (self.year + 1, 1) } else { (self.year, self.month + 1) };
        NaiveDate::from_ymd_opt(y, m, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or_default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl FromStr for ReportMonth {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = AppError::InvalidInput { field: "month", code: "invalid_month" };
        let (y, m) = s.split_once('-').ok_or(AppError::InvalidInput {
            field: "month",
            code: "invalid_month",
        })?;
        match (y.parse::<i32>(), m.parse::<u32>()) {
            (Ok(year), Ok(month)) if y.len() == 4 && m.len() == 2 => ReportMonth::new(year, month),
            _ => Err(invalid),
        }
    }
}

impl fmt::Display for ReportMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// Relatório mensal (tela de Relatórios)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    #[schema(example = "2025-08")]
    pub month: String,
    pub appointment_count: i64,
    // Soma dos preços dos agendamentos confirmados
    pub appointment_revenue: Decimal,
    // Soma do valor final das vendas concluídas
    pub sales_revenue: Decimal,
    pub pets_served: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PopularService {
    pub service_id: Uuid,
    pub name: String,
    pub bookings: i64,
}

// Cards do Dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_appointments: i64,
    pub today_appointments: i64,
    pub monthly_revenue: Decimal,
    pub total_pets: i64,
    pub popular_service: Option<PopularService>,
    pub appointments_by_status: StatusBreakdown,
    pub low_stock_products: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_bounds_a_month() {
        let feb: ReportMonth = "2024-02".parse().unwrap();
        assert_eq!(feb.to_string(), "2024-02");
        assert_eq!(feb.first_day(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let dec: ReportMonth = "2025-12".parse().unwrap();
        assert_eq!(dec.last_day(), NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn rejects_malformed_months() {
        for bad in ["2025-13", "2025-8", "25-08", "agosto", ""] {
            assert!(bad.parse::<ReportMonth>().is_err(), "{bad}");
        }
    }
}
