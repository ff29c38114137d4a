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

use super::value_object::ValueObjectable;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Password(pub String);

impl ValueObjectable for Password {
    type DataType = String;

    fn validate(&self) -> Result<(), String> {
        if self.0.chars().count() < 8 {
            Err("A jelszónak legalább 8 karakter hosszúnak kell lennie".to_string())
        } else {
            Ok(())
        }
    }

    fn get_value(&self) -> &Self::DataType {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::ValueObject;

    #[test]
    fn rejects_short_password() {
        assert!(ValueObject::new(Password("short".to_string())).is_err());
    }

    #[test]
    fn accepts_long_enough_password() {
        assert!(ValueObject::new(Password("longenough".to_string())).is_ok());
    }
}
