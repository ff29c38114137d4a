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

//! Plain query functions over an already tenant-scoped `PgConnection`: each
//! takes the connection the facade hands to the closure passed to
//! `SessionPool::query`/`tx`, so every call site is forced through the
//! tenant-scoped transaction rather than able to reach `session_pool.pool()`
//! directly.

use std::collections::HashMap;

use chrono::Local;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::common::error::{CoreErrorKind, CoreResult};

use super::model::{
    ClassSubjectRequirement, DraftStatus, Room, Teacher, TeacherAvailabilityRow, TimeSlot,
    TimetableDraft, TimetableEntry,
};

pub async fn list_time_slots(conn: &mut PgConnection, tenant_id: Uuid) -> CoreResult<Vec<TimeSlot>> {
    sqlx::query_as::<_, TimeSlot>(
        "SELECT id, tenant_id, day_of_week, start_minute, end_minute \
         FROM timetable_time_slots WHERE tenant_id = $1 ORDER BY day_of_week, start_minute",
    )
    .bind(tenant_id)
    .fetch_all(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
}

pub async fn list_rooms(conn: &mut PgConnection, tenant_id: Uuid) -> CoreResult<Vec<Room>> {
    sqlx::query_as::<_, Room>(
        "SELECT id, tenant_id, capacity, available FROM rooms WHERE tenant_id = $1",
    )
    .bind(tenant_id)
    .fetch_all(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
}

pub async fn list_teachers(conn: &mut PgConnection, tenant_id: Uuid) -> CoreResult<Vec<Teacher>> {
    sqlx::query_as::<_, Teacher>(
        "SELECT u.id AS user_id, u.tenant_id, \
                COALESCE(array_agg(ts.subject_id) FILTER (WHERE ts.subject_id IS NOT NULL), '{}') AS subject_ids \
         FROM users u \
         LEFT JOIN teacher_subjects ts ON ts.teacher_id = u.id \
         WHERE u.tenant_id = $1 AND u.deleted_at IS NULL \
         GROUP BY u.id, u.tenant_id",
    )
    .bind(tenant_id)
    .fetch_all(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
}

pub async fn list_availability(
    conn: &mut PgConnection,
    tenant_id: Uuid,
) -> CoreResult<HashMap<(Uuid, Uuid), bool>> {
    let rows = sqlx::query_as::<_, TeacherAvailabilityRow>(
        "SELECT teacher_id, time_slot_id, available FROM teacher_availability WHERE tenant_id = $1",
    )
    .bind(tenant_id)
    .fetch_all(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;
    Ok(rows
        .into_iter()
        .map(|r| ((r.teacher_id, r.time_slot_id), r.available))
        .collect())
}

pub async fn list_requirements(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    academic_year_id: Uuid,
) -> CoreResult<Vec<ClassSubjectRequirement>> {
    sqlx::query_as::<_, ClassSubjectRequirement>(
        "SELECT id, tenant_id, academic_year_id, class_id, subject_id, teacher_id, periods_per_week \
         FROM class_subject_requirements \
         WHERE tenant_id = $1 AND academic_year_id = $2",
    )
    .bind(tenant_id)
    .bind(academic_year_id)
    .fetch_all(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
}

pub async fn list_entries(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    academic_year_id: Uuid,
) -> CoreResult<Vec<TimetableEntry>> {
    sqlx::query_as::<_, TimetableEntry>(
        "SELECT * FROM timetable_entries \
         WHERE tenant_id = $1 AND academic_year_id = $2 AND deleted_at IS NULL \
         ORDER BY time_slot_id",
    )
    .bind(tenant_id)
    .bind(academic_year_id)
    .fetch_all(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
}

pub async fn get_entry(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    entry_id: Uuid,
) -> CoreResult<TimetableEntry> {
    sqlx::query_as::<_, TimetableEntry>(
        "SELECT * FROM timetable_entries WHERE tenant_id = $1 AND id = $2 AND deleted_at IS NULL",
    )
    .bind(tenant_id)
    .bind(entry_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))?
    .ok_or_else(|| CoreErrorKind::NotFound(format!("timetable entry {entry_id}")))
}

/// Clears the non-locked entries for (tenant, year) by soft-deleting them;
/// when `preserve_locked` is false every active entry, locked or not, is
/// cleared. Returns the entries that remain active afterward, i.e. the seed
/// the generator's ledger starts from.
pub async fn clear_for_regeneration(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    academic_year_id: Uuid,
    preserve_locked: bool,
) -> CoreResult<Vec<TimetableEntry>> {
    let now = Local::now();
    if preserve_locked {
        sqlx::query(
            "UPDATE timetable_entries SET deleted_at = $1, is_active = false \
             WHERE tenant_id = $2 AND academic_year_id = $3 AND is_locked = false AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(tenant_id)
        .bind(academic_year_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;
    } else {
        sqlx::query(
            "UPDATE timetable_entries SET deleted_at = $1, is_active = false \
             WHERE tenant_id = $2 AND academic_year_id = $3 AND deleted_at IS NULL",
        )
        .bind(now)
        .bind(tenant_id)
        .bind(academic_year_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;
    }
    list_entries(conn, tenant_id, academic_year_id).await
}

pub async fn insert_entry(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    academic_year_id: Uuid,
    class_id: Uuid,
    subject_id: Uuid,
    teacher_id: Uuid,
    room_id: Uuid,
    time_slot_id: Uuid,
) -> CoreResult<TimetableEntry> {
    sqlx::query_as::<_, TimetableEntry>(
        "INSERT INTO timetable_entries \
         (id, tenant_id, academic_year_id, class_id, subject_id, teacher_id, room_id, time_slot_id, \
          is_locked, is_finalized, is_active, version, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, false, false, true, 1, now(), now()) \
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(academic_year_id)
    .bind(class_id)
    .bind(subject_id)
    .bind(teacher_id)
    .bind(room_id)
    .bind(time_slot_id)
    .fetch_one(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
}

/// Moves an entry to a new room/slot, enforcing optimistic concurrency via
/// `expected_version`: a row count of zero after the `WHERE version = $n`
/// update means either the entry doesn't exist or was modified since the
/// caller read it, and the service layer distinguishes those two cases.
pub async fn move_entry(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    entry_id: Uuid,
    room_id: Uuid,
    time_slot_id: Uuid,
    teacher_id: Uuid,
    expected_version: i32,
) -> CoreResult<TimetableEntry> {
    let updated = sqlx::query_as::<_, TimetableEntry>(
        "UPDATE timetable_entries SET room_id = $1, time_slot_id = $2, teacher_id = $3, version = version + 1, updated_at = now() \
         WHERE tenant_id = $4 AND id = $5 AND version = $6 AND deleted_at IS NULL AND is_finalized = false \
         RETURNING *",
    )
    .bind(room_id)
    .bind(time_slot_id)
    .bind(teacher_id)
    .bind(tenant_id)
    .bind(entry_id)
    .bind(expected_version)
    .fetch_optional(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;

    match updated {
        Some(entry) => Ok(entry),
        None => {
            let current = get_entry(conn, tenant_id, entry_id).await?;
            if current.is_finalized {
                Err(CoreErrorKind::FinalizedReadOnly)
            } else {
                Err(CoreErrorKind::VersionConflict)
            }
        }
    }
}

pub async fn set_lock(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    entry_id: Uuid,
    locked_by: Uuid,
    locked: bool,
) -> CoreResult<TimetableEntry> {
    let locked_at = if locked { Some(Local::now()) } else { None };
    let locked_by_value = if locked { Some(locked_by) } else { None };
    sqlx::query_as::<_, TimetableEntry>(
        "UPDATE timetable_entries SET is_locked = $1, locked_by = $2, locked_at = $3, \
         version = version + 1, updated_at = now() \
         WHERE tenant_id = $4 AND id = $5 AND deleted_at IS NULL \
         RETURNING *",
    )
    .bind(locked)
    .bind(locked_by_value)
    .bind(locked_at)
    .bind(tenant_id)
    .bind(entry_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))?
    .ok_or_else(|| CoreErrorKind::NotFound(format!("timetable entry {entry_id}")))
}

pub async fn upsert_draft(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    academic_year_id: Uuid,
    placed_count: i32,
    failed_count: i32,
    skipped_count: i32,
) -> CoreResult<TimetableDraft> {
    sqlx::query_as::<_, TimetableDraft>(
        "INSERT INTO timetable_drafts \
         (id, tenant_id, academic_year_id, status, placed_count, failed_count, skipped_count, created_at) \
         VALUES ($1, $2, $3, 'draft', $4, $5, $6, now()) \
         ON CONFLICT (tenant_id, academic_year_id) DO UPDATE SET \
            placed_count = EXCLUDED.placed_count, \
            failed_count = EXCLUDED.failed_count, \
            skipped_count = EXCLUDED.skipped_count, \
            status = 'draft', \
            created_at = now() \
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(academic_year_id)
    .bind(placed_count)
    .bind(failed_count)
    .bind(skipped_count)
    .fetch_one(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
}

pub async fn get_draft(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    academic_year_id: Uuid,
) -> CoreResult<Option<TimetableDraft>> {
    sqlx::query_as::<_, TimetableDraft>(
        "SELECT * FROM timetable_drafts WHERE tenant_id = $1 AND academic_year_id = $2",
    )
    .bind(tenant_id)
    .bind(academic_year_id)
    .fetch_optional(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
}

/// §4.11 finalization latch: only succeeds when the draft's `failed_count`
/// is zero, matching the generator's own finalize-eligibility rule.
pub async fn finalize_draft(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    academic_year_id: Uuid,
) -> CoreResult<TimetableDraft> {
    let draft = get_draft(conn, tenant_id, academic_year_id)
        .await?
        .ok_or_else(|| CoreErrorKind::NotFound("timetable draft".to_string()))?;

    if draft.failed_count != 0 {
        return Err(CoreErrorKind::NotFinalizable);
    }
    if draft.status == DraftStatus::Finalized {
        return Err(CoreErrorKind::FinalizedReadOnly);
    }

    sqlx::query(
        "UPDATE timetable_entries SET is_finalized = true, updated_at = now() \
         WHERE tenant_id = $1 AND academic_year_id = $2 AND deleted_at IS NULL AND is_active = true",
    )
    .bind(tenant_id)
    .bind(academic_year_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))?;

    sqlx::query_as::<_, TimetableDraft>(
        "UPDATE timetable_drafts SET status = 'finalized' \
         WHERE tenant_id = $1 AND academic_year_id = $2 RETURNING *",
    )
    .bind(tenant_id)
    .bind(academic_year_id)
    .fetch_one(conn)
    .await
    .map_err(|e| CoreErrorKind::Internal(e.to_string()))
}
