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

//! §4.11 generator/solver: a greedy, non-backtracking placement pass. Once a
//! requirement is placed its slot is never revisited to make room for a
//! later, harder requirement — the bound on total work comes from
//! `MAX_RETRIES_PER_ENTRY`/`MAX_GLOBAL_RETRIES`, not from search depth.

use std::collections::HashMap;
use uuid::Uuid;

use super::model::{
    Candidate, ClassSubjectRequirement, FailedRequirement, FailureReason, Requirement, Room,
    SkippedRequirement, Teacher, TimeSlot, TimetableEntry,
};
use super::constraints;

/// Per entry, how many candidate (room, slot) pairs the generator will try
/// before giving up on that one requirement and recording a failure.
pub const MAX_RETRIES_PER_ENTRY: u32 = 10;
/// Across the whole run, how many failed placement attempts (summed over
/// every requirement) the generator tolerates before aborting early rather
/// than grinding through an unsatisfiable input.
pub const MAX_GLOBAL_RETRIES: u32 = 500;

pub struct GenerationInput {
    pub requirements: Vec<ClassSubjectRequirement>,
    pub teachers: Vec<Teacher>,
    pub rooms: Vec<Room>,
    pub time_slots: Vec<TimeSlot>,
    pub availability: HashMap<(Uuid, Uuid), bool>,
    /// Entries carried over from a prior run when `preserve_locked` is set;
    /// these seed `placed` and are never cleared or re-placed.
    pub locked_entries: Vec<TimetableEntry>,
}

pub struct GenerationOutput {
    pub placed: Vec<PlacedEntry>,
    pub failed: Vec<FailedRequirement>,
    pub skipped: Vec<SkippedRequirement>,
}

#[derive(Debug, Clone)]
pub struct PlacedEntry {
    pub class_id: Uuid,
    pub subject_id: Uuid,
    pub teacher_id: Uuid,
    pub room_id: Uuid,
    pub time_slot_id: Uuid,
}

/// Expands each requirement's `periods_per_week` into one `Requirement` per
/// period, skipping periods already covered by a locked entry for the same
/// class/subject when `preserve_locked` keeps those entries in place (each
/// such period is recorded in the returned `skipped` list per §4.9's
/// Outputs — "Skipped requirements (already locked)"), and computing the
/// difficulty-ordering key (qualified-teacher pool size) up front so later
/// sorting doesn't need repeated lookups.
pub fn expand_requirements(
    requirements: &[ClassSubjectRequirement],
    teachers: &[Teacher],
    already_placed_periods: &HashMap<(Uuid, Uuid), i32>,
) -> (Vec<Requirement>, Vec<SkippedRequirement>) {
    let mut expanded = Vec::new();
    let mut skipped = Vec::new();
    for req in requirements {
        let pool_size = match req.teacher_id {
            Some(_) => 1,
            None => teachers
                .iter()
                .filter(|t| t.subject_ids.contains(&req.subject_id))
                .count(),
        };
        let already = already_placed_periods
            .get(&(req.class_id, req.subject_id))
            .copied()
            .unwrap_or(0);
        for period_index in 0..already.min(req.periods_per_week) {
            skipped.push(SkippedRequirement {
                class_id: req.class_id,
                subject_id: req.subject_id,
                period_index,
            });
        }
        for period_index in already..req.periods_per_week {
            expanded.push(Requirement {
                source_id: req.id,
                class_id: req.class_id,
                subject_id: req.subject_id,
                teacher_id: req.teacher_id,
                period_index,
                total_periods: req.periods_per_week,
                candidate_pool_size: pool_size,
            });
        }
    }
    (expanded, skipped)
}

/// Difficulty-first ordering (§4.11): requirements with the smallest
/// qualified-teacher pool are placed first, since they have the fewest
/// candidate slots and benefit least from being deferred. Among equally hard
/// requirements, more periods to place comes first. Ties on both keys keep
/// their original (class, subject, period) order — `sort_by` is stable.
fn order_by_difficulty(requirements: &mut [Requirement]) {
    requirements.sort_by(|a, b| {
        a.candidate_pool_size
            .cmp(&b.candidate_pool_size)
            .then(b.total_periods.cmp(&a.total_periods))
    });
}

/// Counts already-locked periods per (class, subject) so `expand_requirements`
/// doesn't re-generate periods a preserved entry already covers.
pub fn locked_period_counts(locked: &[TimetableEntry]) -> HashMap<(Uuid, Uuid), i32> {
    let mut counts = HashMap::new();
    for entry in locked {
        *counts.entry((entry.class_id, entry.subject_id)).or_insert(0) += 1;
    }
    counts
}

/// Runs the full placement pass described in §4.11: expand, order by
/// difficulty, then place one requirement at a time against a live,
/// in-memory ledger of entries (seeded with any locked/preserved entries)
/// that is updated immediately after each successful placement so every
/// later candidate is checked against everything placed so far.
pub fn generate(input: GenerationInput) -> GenerationOutput {
    let already_placed = locked_period_counts(&input.locked_entries);
    let (mut requirements, skipped) =
        expand_requirements(&input.requirements, &input.teachers, &already_placed);
    order_by_difficulty(&mut requirements);

    let mut ledger: Vec<TimetableEntry> = input.locked_entries.clone();
    let mut placed = Vec::new();
    let mut failed = Vec::new();
    let mut global_retries: u32 = 0;

    // usage[room_id] counts how many slots a room has already taken on, used
    // to spread placements across rooms rather than always taking the first
    // free one the candidate loop encounters.
    let mut room_usage: HashMap<Uuid, u32> = input
        .rooms
        .iter()
        .map(|r| (r.id, 0))
        .collect();
    for entry in &ledger {
        *room_usage.entry(entry.room_id).or_insert(0) += 1;
    }

    let available_rooms: Vec<&Room> = input.rooms.iter().filter(|r| r.available).collect();

    'requirement: for req in &requirements {
        if global_retries >= MAX_GLOBAL_RETRIES {
            failed.push(FailedRequirement {
                class_id: req.class_id,
                subject_id: req.subject_id,
                period_index: req.period_index,
                reason: FailureReason::MaxRetriesExceeded.as_str(),
            });
            continue;
        }

        let candidate_teachers: Vec<Uuid> = match req.teacher_id {
            Some(id) => vec![id],
            None => input
                .teachers
                .iter()
                .filter(|t| t.subject_ids.contains(&req.subject_id))
                .map(|t| t.user_id)
                .collect(),
        };

        if candidate_teachers.is_empty() || available_rooms.is_empty() {
            failed.push(FailedRequirement {
                class_id: req.class_id,
                subject_id: req.subject_id,
                period_index: req.period_index,
                reason: FailureReason::NoValidSlotFound.as_str(),
            });
            continue;
        }

        let mut rooms_by_load: Vec<&Room> = available_rooms.clone();
        rooms_by_load.sort_by_key(|r| room_usage.get(&r.id).copied().unwrap_or(0));

        let mut attempts: u32 = 0;
        for teacher_id in &candidate_teachers {
            for room in &rooms_by_load {
                for slot in &input.time_slots {
                    if attempts >= MAX_RETRIES_PER_ENTRY {
                        break;
                    }
                    attempts += 1;
                    global_retries += 1;

                    let candidate = Candidate {
                        academic_year_id: req_academic_year(req, &input.requirements),
                        class_id: req.class_id,
                        teacher_id: *teacher_id,
                        room_id: room.id,
                        time_slot_id: slot.id,
                    };

                    if constraints::is_clear(&candidate, &ledger, &input.availability, None) {
                        let placed_entry = PlacedEntry {
                            class_id: req.class_id,
                            subject_id: req.subject_id,
                            teacher_id: *teacher_id,
                            room_id: room.id,
                            time_slot_id: slot.id,
                        };
                        ledger.push(as_provisional_entry(&placed_entry, candidate.academic_year_id));
                        *room_usage.entry(room.id).or_insert(0) += 1;
                        placed.push(placed_entry);
                        continue 'requirement;
                    }
                }
                if attempts >= MAX_RETRIES_PER_ENTRY {
                    break;
                }
            }
            if attempts >= MAX_RETRIES_PER_ENTRY {
                break;
            }
        }

        failed.push(FailedRequirement {
            class_id: req.class_id,
            subject_id: req.subject_id,
            period_index: req.period_index,
            reason: FailureReason::MaxRetriesExceeded.as_str(),
        });
    }

    GenerationOutput {
        placed,
        failed,
        skipped,
    }
}

fn req_academic_year(req: &Requirement, source: &[ClassSubjectRequirement]) -> Uuid {
    source
        .iter()
        .find(|r| r.id == req.source_id)
        .map(|r| r.academic_year_id)
        .unwrap_or_default()
}

/// A placed candidate, wrapped as a `TimetableEntry` stand-in so the
/// in-memory ledger can be checked with the same `constraints::check` the
/// persisted path uses, without writing anything to the database yet.
fn as_provisional_entry(placed: &PlacedEntry, academic_year_id: Uuid) -> TimetableEntry {
    let now = chrono::Local::now();
    TimetableEntry {
        id: Uuid::new_v4(),
        tenant_id: Uuid::nil(),
        academic_year_id,
        class_id: placed.class_id,
        subject_id: placed.subject_id,
        teacher_id: placed.teacher_id,
        room_id: placed.room_id,
        time_slot_id: placed.time_slot_id,
        is_locked: false,
        locked_by: None,
        locked_at: None,
        is_finalized: false,
        is_active: true,
        version: 1,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teacher(subject: Uuid) -> Teacher {
        Teacher {
            user_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            subject_ids: vec![subject],
        }
    }

    fn slot() -> TimeSlot {
        TimeSlot {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            day_of_week: 1,
            start_minute: 480,
            end_minute: 525,
        }
    }

    fn room() -> Room {
        Room {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            capacity: 30,
            available: true,
        }
    }

    #[test]
    fn places_a_single_period_requirement() {
        let subject = Uuid::new_v4();
        let class = Uuid::new_v4();
        let year = Uuid::new_v4();
        let t = teacher(subject);
        let requirement = ClassSubjectRequirement {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            academic_year_id: year,
            class_id: class,
            subject_id: subject,
            teacher_id: None,
            periods_per_week: 1,
        };
        let input = GenerationInput {
            requirements: vec![requirement],
            teachers: vec![t],
            rooms: vec![room(), room()],
            time_slots: vec![slot(), slot()],
            availability: HashMap::new(),
            locked_entries: vec![],
        };
        let output = generate(input);
        assert_eq!(output.placed.len(), 1);
        assert!(output.failed.is_empty());
        assert!(output.skipped.is_empty());
    }

    #[test]
    fn fails_when_no_teacher_is_qualified() {
        let subject = Uuid::new_v4();
        let requirement = ClassSubjectRequirement {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            academic_year_id: Uuid::new_v4(),
            class_id: Uuid::new_v4(),
            subject_id: subject,
            teacher_id: None,
            periods_per_week: 1,
        };
        let input = GenerationInput {
            requirements: vec![requirement],
            teachers: vec![teacher(Uuid::new_v4())],
            rooms: vec![room()],
            time_slots: vec![slot()],
            availability: HashMap::new(),
            locked_entries: vec![],
        };
        let output = generate(input);
        assert!(output.placed.is_empty());
        assert_eq!(output.failed.len(), 1);
        assert_eq!(output.failed[0].reason, FailureReason::NoValidSlotFound.as_str());
    }

    #[test]
    fn second_period_on_same_class_subject_avoids_double_booking() {
        let subject = Uuid::new_v4();
        let class = Uuid::new_v4();
        let t = teacher(subject);
        let requirement = ClassSubjectRequirement {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            academic_year_id: Uuid::new_v4(),
            class_id: class,
            subject_id: subject,
            teacher_id: None,
            periods_per_week: 2,
        };
        let input = GenerationInput {
            requirements: vec![requirement],
            teachers: vec![t],
            rooms: vec![room()],
            time_slots: vec![slot(), slot()],
            availability: HashMap::new(),
            locked_entries: vec![],
        };
        let output = generate(input);
        assert_eq!(output.placed.len(), 2);
        let slots: std::collections::HashSet<_> =
            output.placed.iter().map(|p| p.time_slot_id).collect();
        assert_eq!(slots.len(), 2, "each period must land on a distinct slot");
    }

    #[test]
    fn locked_entries_are_preserved_and_not_reissued() {
        let subject = Uuid::new_v4();
        let class = Uuid::new_v4();
        let teacher_id = Uuid::new_v4();
        let room_id = Uuid::new_v4();
        let slot_id = Uuid::new_v4();
        let now = chrono::Local::now();
        let locked = TimetableEntry {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            academic_year_id: Uuid::new_v4(),
            class_id: class,
            subject_id: subject,
            teacher_id,
            room_id,
            time_slot_id: slot_id,
            is_locked: true,
            locked_by: None,
            locked_at: Some(now),
            is_finalized: false,
            is_active: true,
            version: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let requirement = ClassSubjectRequirement {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            academic_year_id: Uuid::new_v4(),
            class_id: class,
            subject_id: subject,
            teacher_id: Some(teacher_id),
            periods_per_week: 1,
        };
        let input = GenerationInput {
            requirements: vec![requirement],
            teachers: vec![Teacher {
                user_id: teacher_id,
                tenant_id: Uuid::new_v4(),
                subject_ids: vec![subject],
            }],
            rooms: vec![Room {
                id: room_id,
                tenant_id: Uuid::new_v4(),
                capacity: 30,
                available: true,
            }],
            time_slots: vec![TimeSlot {
                id: slot_id,
                tenant_id: Uuid::new_v4(),
                day_of_week: 1,
                start_minute: 480,
                end_minute: 525,
            }],
            availability: HashMap::new(),
            locked_entries: vec![locked],
        };
        let output = generate(input);
        assert!(output.placed.is_empty());
        assert!(output.failed.is_empty());
        assert_eq!(output.skipped.len(), 1, "the locked-covered period is reported as skipped");
    }

    #[test]
    fn exceeding_global_retry_cap_fails_rather_than_skips_outstanding_requirements() {
        let subject = Uuid::new_v4();
        let class = Uuid::new_v4();
        let t = teacher(subject);
        // One room and one slot means there's exactly one candidate
        // combination per period, so each requirement (placed or not) burns
        // exactly one global retry; enough periods exhausts
        // MAX_GLOBAL_RETRIES well before they're all placed.
        let requirement = ClassSubjectRequirement {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            academic_year_id: Uuid::new_v4(),
            class_id: class,
            subject_id: subject,
            teacher_id: None,
            periods_per_week: MAX_GLOBAL_RETRIES as i32 + 5,
        };
        let input = GenerationInput {
            requirements: vec![requirement],
            teachers: vec![t],
            rooms: vec![room()],
            time_slots: vec![slot()],
            availability: HashMap::new(),
            locked_entries: vec![],
        };
        let output = generate(input);
        assert!(output.skipped.is_empty(), "global-cap abort must not use the skipped bucket");
        assert!(!output.failed.is_empty());
        assert!(
            output
                .failed
                .iter()
                .all(|f| f.reason == FailureReason::MaxRetriesExceeded.as_str()),
            "outstanding requirements past the global cap must fail with max_retries_exceeded"
        );
    }
}
