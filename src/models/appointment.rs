// src/models/appointment.rs

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::AppError;

// --- Status (enum fechado + tabela de transições) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "appointment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Pending,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    // pending -> confirmed -> completed; pending/confirmed -> cancelled.
    // Completed e Cancelled são finais.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Confirmed, Completed) | (Pending, Cancelled) | (Confirmed, Cancelled)
        )
    }

    pub fn ensure_transition(self, next: AppointmentStatus) -> Result<(), AppError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::InvalidStatusTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    /// O portal só age sobre o status que viu; se mudou no meio tempo, a transição é recusada.
    pub fn ensure_expected(self, expected: Option<AppointmentStatus>, next: AppointmentStatus) -> Result<(), AppError> {
        match expected {
            Some(expected) if expected != self => Err(AppError::InvalidStatusTransition {
                from: self.to_string(),
                to: next.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Status que um agendamento pode ter ao nascer.
    pub fn is_valid_initial(self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }

    pub fn occupies_slot(self) -> bool {
        self != AppointmentStatus::Cancelled
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Intervalo [início, fim) em horário local do estabelecimento ---
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeSlot {
    /// fim = início + duração, sem normalização de fuso.
    /// 23:30 + 60min termina às 00:30 do dia seguinte.
    pub fn from_duration(date: NaiveDate, start_time: NaiveTime, duration_minutes: i64) -> Self {
        let start = date.and_time(start_time);
        Self {
            start,
            end: start + Duration::minutes(duration_minutes),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start.time()
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end.time()
    }

    pub fn stays_within_day(&self) -> bool {
        self.end.date() == self.start.date()
    }

    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

// --- Agendamento ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    #[schema(ignore)]
    pub business_id: Uuid,
    pub customer_id: Uuid,
    pub pet_id: Uuid,
    pub service_id: Uuid,
    #[schema(example = "2025-08-14")]
    pub appointment_date: NaiveDate,
    #[schema(value_type = String, example = "09:00:00")]
    pub start_time: NaiveTime,
    #[schema(value_type = String, example = "10:00:00")]
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    // Copiado da faixa de preço do serviço na criação, nunca recalculado
    #[schema(example = "50.00")]
    pub price: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn slot(&self) -> TimeSlot {
        let start = self.appointment_date.and_time(self.start_time);
        let mut end = self.appointment_date.and_time(self.end_time);
        // Registros antigos podem ter virado a meia-noite
        if end <= start {
            end += Duration::days(1);
        }
        TimeSlot { start, end }
    }
}

/// Primeiro agendamento ativo que colide com `slot`, ignorando `ignore` (remarcação).
pub fn find_conflict<'a>(
    existing: &'a [Appointment],
    slot: &TimeSlot,
    ignore: Option<Uuid>,
) -> Option<&'a Appointment> {
    existing.iter().find(|a| {
        a.status.occupies_slot() && Some(a.id) != ignore && a.slot().overlaps(slot)
    })
}

pub fn ensure_slot_free(
    existing: &[Appointment],
    slot: &TimeSlot,
    ignore: Option<Uuid>,
) -> Result<(), AppError> {
    match find_conflict(existing, slot, ignore) {
        Some(conflict) => Err(AppError::SlotConflict {
            conflicting_id: conflict.id,
        }),
        None => Ok(()),
    }
}

// Agendamento já precificado, pronto para a operação atômica do store
#[derive(Debug, Clone)]
pub struct AppointmentDraft {
    pub customer_id: Uuid,
    pub pet_id: Uuid,
    pub service_id: Uuid,
    pub slot: TimeSlot,
    pub status: AppointmentStatus,
    pub price: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub customer_id: Option<Uuid>,
}

impl AppointmentFilter {
    pub fn matches(&self, a: &Appointment) -> bool {
        self.from.is_none_or(|d| a.appointment_date >= d)
            && self.to.is_none_or(|d| a.appointment_date <= d)
            && self.customer_id.is_none_or(|c| a.customer_id == c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 14).unwrap()
    }

    fn appointment(start: NaiveTime, minutes: i64, status: AppointmentStatus) -> Appointment {
        let slot = TimeSlot::from_duration(day(), start, minutes);
        Appointment {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            pet_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            appointment_date: day(),
            start_time: slot.start_time(),
            end_time: slot.end_time(),
            status,
            price: Decimal::from(50),
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn end_time_is_start_plus_duration() {
        let slot = TimeSlot::from_duration(day(), at(9, 0), 60);
        assert_eq!(slot.end_time(), at(10, 0));
        assert!(slot.stays_within_day());
    }

    #[test]
    fn end_time_rolls_over_midnight() {
        let slot = TimeSlot::from_duration(day(), at(23, 30), 60);
        assert_eq!(slot.end_time(), at(0, 30));
        assert_eq!(slot.end.date(), day().succ_opt().unwrap());
        assert!(!slot.stays_within_day());
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let a = TimeSlot::from_duration(day(), at(9, 0), 60);
        let b = TimeSlot::from_duration(day(), at(10, 0), 30);
        let c = TimeSlot::from_duration(day(), at(9, 59), 30);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(a.overlaps(&a));
    }

    #[test]
    fn cancelled_and_ignored_appointments_free_the_slot() {
        let cancelled = appointment(at(9, 0), 60, AppointmentStatus::Cancelled);
        let active = appointment(at(9, 0), 60, AppointmentStatus::Confirmed);
        let slot = TimeSlot::from_duration(day(), at(9, 30), 30);

        assert!(ensure_slot_free(std::slice::from_ref(&cancelled), &slot, None).is_ok());
        assert!(ensure_slot_free(std::slice::from_ref(&active), &slot, Some(active.id)).is_ok());
        assert!(matches!(
            ensure_slot_free(&[cancelled, active.clone()], &slot, None),
            Err(AppError::SlotConflict { conflicting_id }) if conflicting_id == active.id
        ));
    }

    #[test]
    fn transition_table() {
        use AppointmentStatus::*;
        let allowed = [(Pending, Confirmed), (Confirmed, Completed), (Pending, Cancelled), (Confirmed, Cancelled)];

        for from in AppointmentStatus::ALL {
            for to in AppointmentStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
        assert!(matches!(
            Completed.ensure_transition(Cancelled),
            Err(AppError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn legacy_rows_crossing_midnight_keep_their_length() {
        let mut a = appointment(at(23, 0), 60, AppointmentStatus::Pending);
        a.end_time = at(0, 30);
        let slot = a.slot();
        assert_eq!(slot.end - slot.start, Duration::minutes(90));
    }
}
