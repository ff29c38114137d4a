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

use crate::common::types::value_object::ValueObjectable;

/// Lowercase, hyphen-separated identifier used for subdomain resolution
/// (`common::authz::tenant_resolver::subdomain_slug`). Kept short since it
/// ends up as a DNS label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSlug(pub String);

impl ValueObjectable for TenantSlug {
    type DataType = String;

    fn validate(&self) -> Result<(), String> {
        let valid = !self.0.is_empty()
            && self.0.len() <= 63
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !self.0.starts_with('-')
            && !self.0.ends_with('-');
        if valid {
            Ok(())
        } else {
            Err("a tenant slug must be 1-63 lowercase alphanumeric/hyphen characters, \
                 and may not start or end with a hyphen"
                .to_string())
        }
    }

    fn get_value(&self) -> &Self::DataType {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantsOrderBy {
    Name,
    Slug,
    CreatedAt,
}

impl TenantsOrderBy {
    pub fn column(&self) -> &'static str {
        match self {
            TenantsOrderBy::Name => "name",
            TenantsOrderBy::Slug => "slug",
            TenantsOrderBy::CreatedAt => "created_at",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::ValueObject;

    #[test]
    fn accepts_simple_slug() {
        assert!(ValueObject::new(TenantSlug("riverside-high".to_string())).is_ok());
    }

    #[test]
    fn rejects_uppercase_and_leading_hyphen() {
        assert!(ValueObject::new(TenantSlug("Riverside".to_string())).is_err());
        assert!(ValueObject::new(TenantSlug("-riverside".to_string())).is_err());
    }
}
