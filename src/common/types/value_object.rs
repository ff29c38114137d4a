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

use serde::de::{Deserialize, Deserializer};
use std::fmt::Display;

pub trait ValueObjectable {
    type DataType;
    fn validate(&self) -> Result<(), String>;
    fn get_value(&self) -> &Self::DataType;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueObject<DataType>(DataType);

impl<DataType> ValueObject<DataType>
where
    DataType: ValueObjectable,
{
    pub fn new(data: DataType) -> Result<Self, String> {
        data.validate()?;
        Ok(Self(data))
    }
    pub fn extract(&self) -> &DataType {
        &self.0
    }
}

impl<DataType> Display for ValueObject<DataType>
where
    DataType: ValueObjectable,
    DataType::DataType: Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.get_value())
    }
}

impl<'de, DataType> Deserialize<'de> for ValueObject<DataType>
where
    DataType: ValueObjectable + Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = DataType::deserialize(deserializer)?;
        ValueObject::new(data).map_err(serde::de::Error::custom)
    }
}

impl<DataType> serde::Serialize for ValueObject<DataType>
where
    DataType: ValueObjectable + serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize as DeriveDeserialize;

    #[derive(Debug, DeriveDeserialize, serde::Serialize)]
    struct SampleObject(String);

    impl ValueObjectable for SampleObject {
        type DataType = String;
        fn validate(&self) -> Result<(), String> {
            if self.0.is_empty() {
                Err("must not be empty".to_string())
            } else {
                Ok(())
            }
        }
        fn get_value(&self) -> &Self::DataType {
            &self.0
        }
    }

    #[test]
    fn sample_object_test() {
        assert!(ValueObject::new(SampleObject("ok".to_string())).is_ok());
        assert!(ValueObject::new(SampleObject(String::new())).is_err());
    }
}
