/*
 * Copyright (C) 2026 the project contributors.
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! §4.9 data model: time slots, rooms, teacher availability, per-class-
//! subject period requirements, placed entries, and the draft record a
//! generation run produces. `TimetableEntry`/`TimetableDraft` are the only
//! two tables `sqlx::FromRow`-mapped directly off the schema; everything
//! else the generator needs (candidate pools, per-class used-slot memos) is
//! built in-memory by `generator`/`constraints` from these rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Draft,
    Finalized,
}

#[derive(Debug, Clone, FromRow)]
pub struct TimeSlot {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub day_of_week: i16,
    pub start_minute: i32,
    pub end_minute: i32,
}

#[derive(Debug, Clone, FromRow)]
pub struct Room {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub capacity: i32,
    pub available: bool,
}

/// A teacher's subject qualifications, loaded separately from their
/// per-slot availability (`TeacherAvailability`) since the generator needs
/// the former for difficulty ordering and the latter only during placement.
#[derive(Debug, Clone, FromRow)]
pub struct Teacher {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub subject_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
pub struct TeacherAvailabilityRow {
    pub teacher_id: Uuid,
    pub time_slot_id: Uuid,
    pub available: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct ClassSubjectRequirement {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub academic_year_id: Uuid,
    pub class_id: Uuid,
    pub subject_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub periods_per_week: i32,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimetableEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub academic_year_id: Uuid,
    pub class_id: Uuid,
    pub subject_id: Uuid,
    pub teacher_id: Uuid,
    pub room_id: Uuid,
    pub time_slot_id: Uuid,
    pub is_locked: bool,
    pub locked_by: Option<Uuid>,
    pub locked_at: Option<chrono::DateTime<chrono::Local>>,
    pub is_finalized: bool,
    pub is_active: bool,
    pub version: i32,
    pub created_at: chrono::DateTime<chrono::Local>,
    pub updated_at: chrono::DateTime<chrono::Local>,
    pub deleted_at: Option<chrono::DateTime<chrono::Local>>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimetableDraft {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub academic_year_id: Uuid,
    pub status: DraftStatus,
    pub placed_count: i32,
    pub failed_count: i32,
    pub skipped_count: i32,
    pub created_at: chrono::DateTime<chrono::Local>,
}

/// One period of a class-subject pairing still needing a slot, produced by
/// expanding a `ClassSubjectRequirement`'s `periods_per_week` into
/// individual units (§ Requirement expansion). Not a database row.
#[derive(Debug, Clone)]
pub struct Requirement {
    pub source_id: Uuid,
    pub class_id: Uuid,
    pub subject_id: Uuid,
    pub teacher_id: Option<Uuid>,
    pub period_index: i32,
    pub total_periods: i32,
    /// Count of teachers qualified for `subject_id` (or 1 when `teacher_id`
    /// is fixed) — the difficulty-ordering key computed once up front.
    pub candidate_pool_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    RoomDoubleBooked,
    TeacherDoubleBooked,
    ClassDoubleBooked,
    TeacherUnavailable,
}

impl ConflictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictKind::RoomDoubleBooked => "room_double_booked",
            ConflictKind::TeacherDoubleBooked => "teacher_double_booked",
            ConflictKind::ClassDoubleBooked => "class_double_booked",
            ConflictKind::TeacherUnavailable => "teacher_unavailable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    MaxRetriesExceeded,
    NoValidSlotFound,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::MaxRetriesExceeded => "max_retries_exceeded",
            FailureReason::NoValidSlotFound => "no_valid_slot_found",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedRequirement {
    pub class_id: Uuid,
    pub subject_id: Uuid,
    pub period_index: i32,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedRequirement {
    pub class_id: Uuid,
    pub subject_id: Uuid,
    pub period_index: i32,
}

/// A candidate placement handed to the constraint checker — the same shape
/// used by both the generator (`teacher_id` always `Some`, sourced from the
/// requirement) and the manual-move path (`move` overlays supplied fields
/// onto the current entry to build one of these).
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub academic_year_id: Uuid,
    pub class_id: Uuid,
    pub teacher_id: Uuid,
    pub room_id: Uuid,
    pub time_slot_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_kind_tags_are_stable() {
        assert_eq!(ConflictKind::RoomDoubleBooked.as_str(), "room_double_booked");
        assert_eq!(
            ConflictKind::TeacherUnavailable.as_str(),
            "teacher_unavailable"
        );
    }
}
