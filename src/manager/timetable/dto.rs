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

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::model::{FailedRequirement, SkippedRequirement, TimetableEntry};

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub academic_year_id: Uuid,
    #[serde(default)]
    pub preserve_locked: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub academic_year_id: Uuid,
    pub placed_count: i32,
    pub failed_count: i32,
    pub skipped_count: i32,
    pub failed: Vec<FailedRequirement>,
    pub skipped: Vec<SkippedRequirement>,
    pub entries: Vec<TimetableEntry>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub academic_year_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub academic_year_id: Uuid,
    pub status: &'static str,
    pub placed_count: i32,
    pub failed_count: i32,
    pub skipped_count: i32,
    pub entries: Vec<TimetableEntry>,
}

/// §4.11 `move(entryId, {timeSlotId?, roomId?, teacherId?})`: every field is
/// an optional overlay onto the entry's current values, so a caller can
/// move a class to a new room without touching its slot or teacher.
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    #[serde(default)]
    pub room_id: Option<Uuid>,
    #[serde(default)]
    pub time_slot_id: Option<Uuid>,
    #[serde(default)]
    pub teacher_id: Option<Uuid>,
    pub expected_version: i32,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub academic_year_id: Uuid,
}
