//! Query parameter helpers shared by the list endpoints.
//!
//! Follows Rocket's `FromForm` conventions and derives `JsonSchema` so the
//! generated OpenAPI document reflects the available parameters and their
//! defaults.

use rocket_okapi::okapi::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const fn default_offset() -> i64 {
    0
}

const fn default_limit() -> i64 {
    10
}

const MAX_LIMIT: i64 = 100;

/// Offset/limit pagination applied to every list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, rocket::form::FromForm)]
pub struct PageParams {
    /// Number of rows to skip (defaults to 0).
    #[field(default = 0)]
    #[serde(default = "default_offset")]
    pub offset: i64,
    /// Number of rows per page (clamped between 1 and 100, default 10).
    #[field(default = 10)]
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            offset: default_offset(),
            limit: default_limit(),
        }
    }
}

impl PageParams {
    /// Normalized non-negative offset.
    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }

    /// Normalized limit capped at [`MAX_LIMIT`].
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, MAX_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::form::Form;

    #[test]
    fn parses_offset_and_limit_with_defaults() {
        let parsed: PageParams = Form::parse("offset=20&limit=5").unwrap();
        assert_eq!(parsed.offset(), 20);
        assert_eq!(parsed.limit(), 5);

        let defaults: PageParams = Form::parse("").unwrap();
        assert_eq!(defaults.offset(), 0);
        assert_eq!(defaults.limit(), 10);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let parsed: PageParams = Form::parse("offset=-3&limit=5000").unwrap();
        assert_eq!(parsed.offset(), 0);
        assert_eq!(parsed.limit(), 100);

        let zero_limit: PageParams = Form::parse("limit=0").unwrap();
        assert_eq!(zero_limit.limit(), 1);
    }
}
