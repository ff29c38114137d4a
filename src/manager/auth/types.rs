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

use crate::common::types::value_object::ValueObjectable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Otp(pub String);

impl ValueObjectable for Otp {
    type DataType = String;

    fn validate(&self) -> Result<(), String> {
        if self.0.len() == 6 && self.0.chars().all(|c| c.is_ascii_digit()) {
            Ok(())
        } else {
            Err("Az egyszer használatos kódnak 6 számjegyből kell állnia".to_string())
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
    fn rejects_non_numeric() {
        assert!(ValueObject::new(Otp("abcdef".to_string())).is_err());
    }

    #[test]
    fn accepts_six_digits() {
        assert!(ValueObject::new(Otp("123456".to_string())).is_ok());
    }
}
