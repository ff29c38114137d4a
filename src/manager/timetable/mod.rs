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

//! §4.9-4.11: the timetable generator. `model` holds the data shapes,
//! `constraints` the conflict rules the generator and the manual move path
//! both call, `generator` the greedy non-backtracking placement pass, and
//! `repository`/`service`/`handler`/`routes` the usual facade-backed CRUD
//! layering the rest of the crate follows.

pub(crate) mod constraints;
pub(crate) mod dto;
pub(crate) mod generator;
mod handler;
pub(crate) mod model;
pub(crate) mod repository;
pub mod routes;
pub(crate) mod service;
