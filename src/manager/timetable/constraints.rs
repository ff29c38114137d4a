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

//! §4.10 conflict checking: a candidate placement is valid only if no
//! active, non-excluded entry in the same academic year already occupies
//! its room, teacher, or class at the same time slot, and the teacher is
//! not marked unavailable for that slot.

use std::collections::HashMap;
use uuid::Uuid;

use super::model::{Candidate, ConflictKind, TimetableEntry};

/// Checks `candidate` against `existing` (active, non-deleted entries for
/// the same academic year) and `availability` (teacher_id, time_slot_id) ->
/// available. `exclude_id` lets a move/re-placement ignore the entry being
/// replaced. Returns every conflict found, not just the first.
pub fn check(
    candidate: &Candidate,
    existing: &[TimetableEntry],
    availability: &HashMap<(Uuid, Uuid), bool>,
    exclude_id: Option<Uuid>,
) -> Vec<ConflictKind> {
    let mut conflicts = Vec::new();

    let is_available = availability
        .get(&(candidate.teacher_id, candidate.time_slot_id))
        .copied()
        .unwrap_or(true);
    if !is_available {
        conflicts.push(ConflictKind::TeacherUnavailable);
    }

    for entry in existing {
        if !entry.is_active || Some(entry.id) == exclude_id {
            continue;
        }
        if entry.time_slot_id != candidate.time_slot_id {
            continue;
        }
        if entry.room_id == candidate.room_id {
            conflicts.push(ConflictKind::RoomDoubleBooked);
        }
        if entry.teacher_id == candidate.teacher_id {
            conflicts.push(ConflictKind::TeacherDoubleBooked);
        }
        if entry.class_id == candidate.class_id {
            conflicts.push(ConflictKind::ClassDoubleBooked);
        }
    }

    conflicts
}

pub fn is_clear(
    candidate: &Candidate,
    existing: &[TimetableEntry],
    availability: &HashMap<(Uuid, Uuid), bool>,
    exclude_id: Option<Uuid>,
) -> bool {
    check(candidate, existing, availability, exclude_id).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::timetable::model::DraftStatus;
    use chrono::Local;

    fn entry(room: Uuid, teacher: Uuid, class: Uuid, slot: Uuid) -> TimetableEntry {
        let _ = DraftStatus::Draft;
        TimetableEntry {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            academic_year_id: Uuid::new_v4(),
            class_id: class,
            subject_id: Uuid::new_v4(),
            teacher_id: teacher,
            room_id: room,
            time_slot_id: slot,
            is_locked: false,
            locked_by: None,
            locked_at: None,
            is_finalized: false,
            is_active: true,
            version: 1,
            created_at: Local::now(),
            updated_at: Local::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn detects_room_double_booking() {
        let room = Uuid::new_v4();
        let slot = Uuid::new_v4();
        let existing = vec![entry(room, Uuid::new_v4(), Uuid::new_v4(), slot)];
        let candidate = Candidate {
            academic_year_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            room_id: room,
            time_slot_id: slot,
        };
        let conflicts = check(&candidate, &existing, &HashMap::new(), None);
        assert_eq!(conflicts, vec![ConflictKind::RoomDoubleBooked]);
    }

    #[test]
    fn excluded_entry_does_not_conflict_with_itself() {
        let room = Uuid::new_v4();
        let teacher = Uuid::new_v4();
        let class = Uuid::new_v4();
        let slot = Uuid::new_v4();
        let existing_entry = entry(room, teacher, class, slot);
        let existing = vec![existing_entry.clone()];
        let candidate = Candidate {
            academic_year_id: existing_entry.academic_year_id,
            class_id: class,
            teacher_id: teacher,
            room_id: room,
            time_slot_id: slot,
        };
        let conflicts = check(&candidate, &existing, &HashMap::new(), Some(existing_entry.id));
        assert!(conflicts.is_empty());
    }

    #[test]
    fn unavailable_teacher_is_flagged() {
        let teacher = Uuid::new_v4();
        let slot = Uuid::new_v4();
        let mut availability = HashMap::new();
        availability.insert((teacher, slot), false);
        let candidate = Candidate {
            academic_year_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            teacher_id: teacher,
            room_id: Uuid::new_v4(),
            time_slot_id: slot,
        };
        let conflicts = check(&candidate, &[], &availability, None);
        assert_eq!(conflicts, vec![ConflictKind::TeacherUnavailable]);
    }

    #[test]
    fn inactive_entries_are_ignored() {
        let room = Uuid::new_v4();
        let slot = Uuid::new_v4();
        let mut stale = entry(room, Uuid::new_v4(), Uuid::new_v4(), slot);
        stale.is_active = false;
        let candidate = Candidate {
            academic_year_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            room_id: room,
            time_slot_id: slot,
        };
        assert!(is_clear(&candidate, &[stale], &HashMap::new(), None));
    }
}
