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

//! Orchestrates the generator/solver and the manual move/lock paths against
//! the tenant-scoped facade. Permission checks happen here rather than in
//! the handler, since the `AuthContext` is already a handler argument and
//! the service is what knows which operation maps to which code.

use std::sync::Arc;

use uuid::Uuid;

use crate::common::authz::model::PermissionMode;
use crate::common::authz::pipeline::AuthContext;
use crate::common::error::{CoreErrorKind, CoreResult};
use crate::common::session::SessionPool;

use super::generator::{self, GenerationInput};
use super::model::{DraftStatus, FailedRequirement, SkippedRequirement, TimetableDraft, TimetableEntry};
use super::repository;

pub const PERMISSION_GENERATE: &str = "timetable:generate";
pub const PERMISSION_READ: &str = "timetable:read";
pub const PERMISSION_WRITE: &str = "timetable:write";
pub const PERMISSION_FINALIZE: &str = "timetable:finalize";

pub struct TimetableService {
    session_pool: Arc<SessionPool>,
}

impl TimetableService {
    pub fn new(session_pool: Arc<SessionPool>) -> Self {
        Self { session_pool }
    }

    pub async fn generate(
        &self,
        ctx: &AuthContext,
        academic_year_id: Uuid,
        preserve_locked: bool,
    ) -> CoreResult<(
        TimetableDraft,
        Vec<TimetableEntry>,
        Vec<FailedRequirement>,
        Vec<SkippedRequirement>,
    )> {
        ctx.require_permission(&[PERMISSION_GENERATE], PermissionMode::Any)
            .map_err(|d| CoreErrorKind::PermissionDenied(d.requirement))?;

        let tenant_id = ctx.tenant_id;
        let actor_id = Some(ctx.user_id);

        self.session_pool
            .tx(tenant_id, actor_id, |conn| async move {
                let locked_entries =
                    repository::clear_for_regeneration(conn, tenant_id, academic_year_id, preserve_locked)
                        .await?;
                let requirements =
                    repository::list_requirements(conn, tenant_id, academic_year_id).await?;
                let teachers = repository::list_teachers(conn, tenant_id).await?;
                let rooms = repository::list_rooms(conn, tenant_id).await?;
                let time_slots = repository::list_time_slots(conn, tenant_id).await?;
                let availability = repository::list_availability(conn, tenant_id).await?;

                let output = generator::generate(GenerationInput {
                    requirements,
                    teachers,
                    rooms,
                    time_slots,
                    availability,
                    locked_entries,
                });

                for placed in &output.placed {
                    repository::insert_entry(
                        conn,
                        tenant_id,
                        academic_year_id,
                        placed.class_id,
                        placed.subject_id,
                        placed.teacher_id,
                        placed.room_id,
                        placed.time_slot_id,
                    )
                    .await?;
                }

                let draft = repository::upsert_draft(
                    conn,
                    tenant_id,
                    academic_year_id,
                    output.placed.len() as i32,
                    output.failed.len() as i32,
                    output.skipped.len() as i32,
                )
                .await?;

                let entries = repository::list_entries(conn, tenant_id, academic_year_id).await?;
                Ok((draft, entries, output.failed, output.skipped))
            })
            .await
    }

    pub async fn status(
        &self,
        ctx: &AuthContext,
        academic_year_id: Uuid,
    ) -> CoreResult<(Option<TimetableDraft>, Vec<TimetableEntry>)> {
        ctx.require_permission(&[PERMISSION_READ], PermissionMode::Any)
            .map_err(|d| CoreErrorKind::PermissionDenied(d.requirement))?;

        let tenant_id = ctx.tenant_id;
        self.session_pool
            .query(tenant_id, Some(ctx.user_id), |conn| async move {
                let draft = repository::get_draft(conn, tenant_id, academic_year_id).await?;
                let entries = repository::list_entries(conn, tenant_id, academic_year_id).await?;
                Ok((draft, entries))
            })
            .await
    }

    /// Moves an existing entry, overlaying whichever of `room_id`/
    /// `time_slot_id`/`teacher_id` the caller supplied onto the entry's
    /// current values (§4.11), re-checking every §4.10 conflict rule
    /// against the tenant's other active entries before the
    /// optimistic-concurrency update is attempted.
    pub async fn move_entry(
        &self,
        ctx: &AuthContext,
        entry_id: Uuid,
        room_id: Option<Uuid>,
        time_slot_id: Option<Uuid>,
        teacher_id: Option<Uuid>,
        expected_version: i32,
    ) -> CoreResult<TimetableEntry> {
        ctx.require_permission(&[PERMISSION_WRITE], PermissionMode::Any)
            .map_err(|d| CoreErrorKind::PermissionDenied(d.requirement))?;

        let tenant_id = ctx.tenant_id;
        self.session_pool
            .tx(tenant_id, Some(ctx.user_id), |conn| async move {
                let current = repository::get_entry(conn, tenant_id, entry_id).await?;
                if current.is_finalized {
                    return Err(CoreErrorKind::FinalizedReadOnly);
                }
                if current.is_locked {
                    return Err(CoreErrorKind::ConflictSet(
                        "entry is locked and cannot be moved".to_string(),
                    ));
                }

                let room_id = room_id.unwrap_or(current.room_id);
                let time_slot_id = time_slot_id.unwrap_or(current.time_slot_id);
                let teacher_id = teacher_id.unwrap_or(current.teacher_id);

                let existing = repository::list_entries(conn, tenant_id, current.academic_year_id).await?;
                let availability = repository::list_availability(conn, tenant_id).await?;
                let candidate = super::model::Candidate {
                    academic_year_id: current.academic_year_id,
                    class_id: current.class_id,
                    teacher_id,
                    room_id,
                    time_slot_id,
                };
                let conflicts = super::constraints::check(
                    &candidate,
                    &existing,
                    &availability,
                    Some(entry_id),
                );
                if !conflicts.is_empty() {
                    let reasons = conflicts
                        .iter()
                        .map(|c| c.as_str())
                        .collect::<Vec<_>>()
                        .join(",");
                    return Err(CoreErrorKind::ConflictSet(reasons));
                }

                repository::move_entry(
                    conn,
                    tenant_id,
                    entry_id,
                    room_id,
                    time_slot_id,
                    teacher_id,
                    expected_version,
                )
                .await
            })
            .await
    }

    pub async fn set_lock(
        &self,
        ctx: &AuthContext,
        entry_id: Uuid,
        locked: bool,
    ) -> CoreResult<TimetableEntry> {
        ctx.require_permission(&[PERMISSION_WRITE], PermissionMode::Any)
            .map_err(|d| CoreErrorKind::PermissionDenied(d.requirement))?;

        let tenant_id = ctx.tenant_id;
        let user_id = ctx.user_id;
        self.session_pool
            .tx(tenant_id, Some(user_id), |conn| async move {
                repository::set_lock(conn, tenant_id, entry_id, user_id, locked).await
            })
            .await
    }

    /// §4.11 finalization latch: refuses while any requirement remains
    /// failed/unplaced, and is a one-way transition once it succeeds.
    pub async fn finalize(
        &self,
        ctx: &AuthContext,
        academic_year_id: Uuid,
    ) -> CoreResult<TimetableDraft> {
        ctx.require_permission(&[PERMISSION_FINALIZE], PermissionMode::Any)
            .map_err(|d| CoreErrorKind::PermissionDenied(d.requirement))?;

        let tenant_id = ctx.tenant_id;
        self.session_pool
            .tx(tenant_id, Some(ctx.user_id), |conn| async move {
                repository::finalize_draft(conn, tenant_id, academic_year_id).await
            })
            .await
    }
}

/// `TimetableDraft::status` as the short string the status endpoint returns,
/// kept separate from `DraftStatus`'s own serde tag so the HTTP shape can
/// diverge from the storage representation if it ever needs to.
pub fn status_label(draft: &Option<TimetableDraft>) -> &'static str {
    match draft {
        None => "not_generated",
        Some(d) if d.status == DraftStatus::Finalized => "finalized",
        Some(_) => "draft",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn draft(status: DraftStatus) -> TimetableDraft {
        TimetableDraft {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            academic_year_id: Uuid::new_v4(),
            status,
            placed_count: 0,
            failed_count: 0,
            skipped_count: 0,
            created_at: Local::now(),
        }
    }

    #[test]
    fn status_label_reflects_draft_lifecycle() {
        assert_eq!(status_label(&None), "not_generated");
        assert_eq!(status_label(&Some(draft(DraftStatus::Draft))), "draft");
        assert_eq!(
            status_label(&Some(draft(DraftStatus::Finalized))),
            "finalized"
        );
    }
}
