use sea_orm::{ActiveEnum, Iterable};
use serde::{Deserialize, Deserializer};

use crate::error::{ApiError, ApiResult};

/// Parses a stored enum from its string value, ignoring case.
///
/// `code` is the error code returned when nothing matches, e.g. `INVALID_ROLE`.
pub fn parse_enum<E>(value: &str, code: &'static str) -> ApiResult<E>
where
    E: ActiveEnum<Value = String> + Iterable,
{
    let wanted = value.trim();
    E::iter()
        .find(|candidate| candidate.to_value().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| {
            let allowed: Vec<String> = E::iter().map(|v| v.to_value()).collect();
            ApiError::bad_request(
                code,
                format!("'{}' is not one of: {}", value, allowed.join(", ")),
            )
        })
}

/// Parses an optional enum value.
pub fn parse_optional_enum<E>(value: Option<&str>, code: &'static str) -> ApiResult<Option<E>>
where
    E: ActiveEnum<Value = String> + Iterable,
{
    value.map(|v| parse_enum(v, code)).transpose()
}

/// The string stored for an enum value.
pub fn enum_name<E>(value: &E) -> String
where
    E: ActiveEnum<Value = String>,
{
    value.to_value()
}

/// Deserializes a nullable field of a partial update.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`: an
/// absent field stays `None`, an explicit `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::entities::account::AccountKind;
    use model::entities::recurring_transaction::Frequency;
    use model::entities::user::Role;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(parse_enum::<Role>("admin", "INVALID_ROLE").unwrap(), Role::Admin);
        assert_eq!(
            parse_enum::<AccountKind>(" creditcard ", "INVALID_ACCOUNT_KIND").unwrap(),
            AccountKind::CreditCard
        );
        assert_eq!(
            parse_enum::<Frequency>("MONTHLY", "INVALID_FREQUENCY").unwrap(),
            Frequency::Monthly
        );
    }

    #[test]
    fn test_unknown_value_is_rejected() {
        let err = parse_enum::<Role>("superuser", "INVALID_ROLE").unwrap_err();
        let (_, code) = err.status_and_code();
        assert_eq!(code, "INVALID_ROLE");
        assert!(err.to_string().contains("Owner"));
    }

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        parent_id: Option<Option<i32>>,
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.parent_id, None);
        let cleared: Patch = serde_json::from_str(r#"{"parent_id": null}"#).unwrap();
        assert_eq!(cleared.parent_id, Some(None));
        let set: Patch = serde_json::from_str(r#"{"parent_id": 4}"#).unwrap();
        assert_eq!(set.parent_id, Some(Some(4)));
    }

    #[test]
    fn test_optional_and_name() {
        assert_eq!(parse_optional_enum::<Role>(None, "INVALID_ROLE").unwrap(), None);
        assert_eq!(enum_name(&Role::Viewer), "Viewer");
    }
}
