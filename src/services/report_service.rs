// src/services/report_service.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    common::{error::AppError, resilience::StorePolicy},
    db::PetshopStore,
    middleware::tenancy::TenantContext,
    models::{
        appointment::{Appointment, AppointmentFilter, AppointmentStatus},
        catalog::{Product, Service},
        report::{DashboardSummary, MonthlyReport, PopularService, ReportMonth, StatusBreakdown},
        sale::{Sale, SaleStatus},
    },
};

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn PetshopStore>,
    policy: StorePolicy,
}

impl ReportService {
    pub fn new(store: Arc<dyn PetshopStore>, policy: StorePolicy) -> Self {
        Self { store, policy }
    }

    pub async fn monthly(&self, ctx: &TenantContext, month: ReportMonth) -> Result<MonthlyReport, AppError> {
        let (appointments, sales) = self.month_records(ctx, month).await?;
        Ok(monthly_report(month, &appointments, &sales))
    }

    pub async fn dashboard(&self, ctx: &TenantContext, today: NaiveDate) -> Result<DashboardSummary, AppError> {
        let month = ReportMonth::of(today);
        let (_, sales) = self.month_records(ctx, month).await?;

        let all = AppointmentFilter::default();
        let appointments = self
            .policy
            .read("list_appointments", || self.store.list_appointments(ctx, &all))
            .await?;
        let services = self.policy.read("list_services", || self.store.list_services(ctx)).await?;
        let pets = self.policy.read("list_pets", || self.store.list_pets(ctx, None)).await?;
        let products = self.policy.read("list_products", || self.store.list_products(ctx)).await?;

        Ok(dashboard_summary(
            today,
            &appointments,
            &sales,
            &services,
            pets.len() as i64,
            &products,
        ))
    }

    async fn month_records(
        &self,
        ctx: &TenantContext,
        month: ReportMonth,
    ) -> Result<(Vec<Appointment>, Vec<Sale>), AppError> {
        let filter = AppointmentFilter {
            from: Some(month.first_day()),
            to: Some(month.last_day()),
            customer_id: None,
        };
        let appointments = self
            .policy
            .read("list_appointments", || self.store.list_appointments(ctx, &filter))
            .await?;
        let sales = self
            .policy
            .read("list_sales", || self.store.list_sales(ctx, month.first_day(), month.last_day()))
            .await?;
        Ok((appointments, sales))
    }
}

/// Relatório do mês sobre registros já carregados. Sem efeitos colaterais:
/// a mesma entrada sempre produz o mesmo resultado, e entrada vazia dá zeros.
///
/// - agendamentos: todos os do mês, qualquer status
/// - faturamento de agendamentos: só os `confirmed`
/// - faturamento do PDV: `final_amount` das vendas `completed`
/// - pets atendidos: pets distintos entre os agendamentos do mês
pub fn monthly_report(month: ReportMonth, appointments: &[Appointment], sales: &[Sale]) -> MonthlyReport {
    let in_month: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| month.contains(a.appointment_date))
        .collect();

    let appointment_revenue: Decimal = in_month
        .iter()
        .filter(|a| a.status == AppointmentStatus::Confirmed)
        .map(|a| a.price)
        .sum();

    let sales_revenue: Decimal = sales
        .iter()
        .filter(|s| s.status == SaleStatus::Completed && month.contains(s.created_at.date_naive()))
        .map(|s| s.final_amount)
        .sum();

    let pets_served = in_month.iter().map(|a| a.pet_id).collect::<HashSet<_>>().len() as i64;

    MonthlyReport {
        month: month.to_string(),
        appointment_count: in_month.len() as i64,
        appointment_revenue,
        sales_revenue,
        pets_served,
        total_revenue: appointment_revenue + sales_revenue,
    }
}

pub fn dashboard_summary(
    today: NaiveDate,
    appointments: &[Appointment],
    sales: &[Sale],
    services: &[Service],
    total_pets: i64,
    products: &[Product],
) -> DashboardSummary {
    let mut by_status = StatusBreakdown::default();
    for a in appointments {
        match a.status {
            AppointmentStatus::Pending => by_status.pending += 1,
            AppointmentStatus::Confirmed => by_status.confirmed += 1,
            AppointmentStatus::Completed => by_status.completed += 1,
            AppointmentStatus::Cancelled => by_status.cancelled += 1,
        }
    }

    let today_appointments = appointments
        .iter()
        .filter(|a| a.appointment_date == today && a.status.occupies_slot())
        .count() as i64;

    // Serviço mais agendado (cancelados não contam); empate decide pelo nome
    let mut bookings: HashMap<_, i64> = HashMap::new();
    for a in appointments.iter().filter(|a| a.status.occupies_slot()) {
        *bookings.entry(a.service_id).or_insert(0) += 1;
    }
    let popular_service = services
        .iter()
        .filter_map(|s| bookings.get(&s.id).map(|n| (s, *n)))
        .max_by(|(a, na), (b, nb)| na.cmp(nb).then_with(|| b.name.cmp(&a.name)))
        .map(|(s, n)| PopularService { service_id: s.id, name: s.name.clone(), bookings: n });

    let monthly_revenue = monthly_report(ReportMonth::of(today), appointments, sales).total_revenue;

    DashboardSummary {
        total_appointments: appointments.len() as i64,
        today_appointments,
        monthly_revenue,
        total_pets,
        popular_service,
        appointments_by_status: by_status,
        low_stock_products: products.iter().filter(|p| p.is_low_stock()).count() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use crate::{
        models::{
            appointment::TimeSlot,
            customer::PetSize,
            sale::PaymentMethod,
        },
        test_utils::{at, day, Fixture},
    };

    fn august() -> ReportMonth {
        "2025-08".parse().unwrap()
    }

    fn appointment(date: NaiveDate, pet_id: Uuid, status: AppointmentStatus, price: i64) -> Appointment {
        let slot = TimeSlot::from_duration(date, at(9, 0), 60);
        Appointment {
            id: Uuid::new_v4(),
            business_id: Uuid::nil(),
            customer_id: Uuid::new_v4(),
            pet_id,
            service_id: Uuid::new_v4(),
            appointment_date: date,
            start_time: slot.start_time(),
            end_time: slot.end_time(),
            status,
            price: Decimal::from(price),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sale(day: u32, status: SaleStatus, amount: i64) -> Sale {
        let created = Utc.with_ymd_and_hms(2025, 8, day, 15, 0, 0).unwrap();
        Sale {
            id: Uuid::new_v4(),
            business_id: Uuid::nil(),
            customer_id: None,
            total_amount: Decimal::from(amount),
            discount_amount: Decimal::ZERO,
            final_amount: Decimal::from(amount),
            payment_method: PaymentMethod::Card,
            status,
            notes: None,
            idempotency_key: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn empty_month_is_all_zeros() {
        let report = monthly_report(august(), &[], &[]);
        assert_eq!(report.month, "2025-08");
        assert_eq!(report.appointment_count, 0);
        assert_eq!(report.pets_served, 0);
        assert_eq!(report.total_revenue, Decimal::ZERO);
    }

    #[test]
    fn counts_confirmed_revenue_completed_sales_and_distinct_pets() {
        let rex = Uuid::new_v4();
        let mel = Uuid::new_v4();
        let aug = |d| NaiveDate::from_ymd_opt(2025, 8, d).unwrap();
        let appointments = vec![
            appointment(aug(1), rex, AppointmentStatus::Confirmed, 50),
            appointment(aug(2), rex, AppointmentStatus::Pending, 35),
            appointment(aug(3), mel, AppointmentStatus::Confirmed, 25),
            appointment(aug(4), mel, AppointmentStatus::Cancelled, 25),
            // Fora do mês
            appointment(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(), Uuid::new_v4(), AppointmentStatus::Confirmed, 99),
        ];
        let sales = vec![sale(5, SaleStatus::Completed, 40), sale(6, SaleStatus::Voided, 70)];

        let report = monthly_report(august(), &appointments, &sales);
        assert_eq!(report.appointment_count, 4);
        assert_eq!(report.appointment_revenue, Decimal::from(75));
        assert_eq!(report.sales_revenue, Decimal::from(40));
        assert_eq!(report.pets_served, 2);
        assert_eq!(report.total_revenue, Decimal::from(115));

        // Mesma entrada, mesmo resultado
        assert_eq!(monthly_report(august(), &appointments, &sales), report);
    }

    #[tokio::test]
    async fn dashboard_aggregates_the_tenant_records() {
        let fx = Fixture::new().await;
        let customer = fx.customer("Tati").await;
        let pet = fx.pet(customer.id, PetSize::Large).await;
        let bath = fx.bath().await;
        fx.product("Coleira", Decimal::from(15), 1).await;

        let a = fx.book(customer.id, pet.id, bath.id, 9, 0).await.unwrap();
        fx.booking.change_status(&fx.ctx, a.id, AppointmentStatus::Confirmed).await.unwrap();
        fx.book(customer.id, pet.id, bath.id, 11, 0).await.unwrap();

        let summary = fx.reports.dashboard(&fx.ctx, day()).await.unwrap();
        assert_eq!(summary.total_appointments, 2);
        assert_eq!(summary.today_appointments, 2);
        assert_eq!(summary.total_pets, 1);
        assert_eq!(summary.low_stock_products, 1);
        assert_eq!(summary.monthly_revenue, Decimal::from(50));
        assert_eq!(summary.appointments_by_status.confirmed, 1);
        assert_eq!(summary.appointments_by_status.pending, 1);
        let popular = summary.popular_service.unwrap();
        assert_eq!((popular.service_id, popular.bookings), (bath.id, 2));

        let other = fx.other_tenant().await;
        let empty = fx.reports.dashboard(&other, day()).await.unwrap();
        assert_eq!(empty.total_appointments, 0);
        assert!(empty.popular_service.is_none());
    }

    #[tokio::test]
    async fn monthly_report_reads_only_the_requested_month() {
        let fx = Fixture::new().await;
        let customer = fx.customer("Ulisses").await;
        let pet = fx.pet(customer.id, PetSize::Small).await;
        let bath = fx.bath().await;
        let a = fx.book(customer.id, pet.id, bath.id, 9, 0).await.unwrap();
        fx.booking.change_status(&fx.ctx, a.id, AppointmentStatus::Confirmed).await.unwrap();

        let report = fx.reports.monthly(&fx.ctx, august()).await.unwrap();
        assert_eq!(report.appointment_count, 1);
        assert_eq!(report.appointment_revenue, Decimal::from(25));

        let july = fx.reports.monthly(&fx.ctx, "2025-07".parse().unwrap()).await.unwrap();
        assert_eq!(july.appointment_count, 0);
    }
}
