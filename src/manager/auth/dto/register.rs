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

use serde::Deserialize;
use uuid::Uuid;

use crate::common::types::{Email, FirstName, LastName, Password, ValueObject};

/// A tenant is provisioned ahead of registration (see `manager::tenants`) so
/// a new user always registers into a known tenant rather than one being
/// implicitly created for them.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub tenant_id: Uuid,
    pub email: ValueObject<Email>,
    pub password: ValueObject<Password>,
    pub first_name: ValueObject<FirstName>,
    pub last_name: ValueObject<LastName>,
}

#[derive(Debug, Deserialize)]
pub struct ResendEmailValidationRequest {
    pub email: ValueObject<Email>,
}

#[derive(Debug, Deserialize)]
pub struct ForgottenPasswordRequest {
    pub email: ValueObject<Email>,
}

#[derive(Debug, Deserialize)]
pub struct NewPasswordRequest {
    pub token: Uuid,
    pub password: ValueObject<Password>,
}
