use crate::context::TransientMap;

use super::AppError;

/// Pull the value of a private mutation out of the transient map.
///
/// With `key` set, that entry is used and any other entries are ignored.
/// Without it, the map must hold exactly one entry so the choice never
/// depends on iteration order.
pub fn extract_transient(transient: &TransientMap, key: Option<&str>) -> Result<String, AppError> {
    if transient.is_empty() {
        return Err(AppError::NoTransientData);
    }

    let (key, bytes) = match key {
        Some(key) => transient
            .get_key_value(key)
            .ok_or_else(|| AppError::MissingTransientKey(key.to_string()))?,
        None => {
            if transient.len() > 1 {
                return Err(AppError::AmbiguousTransientData(transient.len()));
            }
            transient.iter().next().ok_or(AppError::NoTransientData)?
        }
    };

    let value =
        String::from_utf8(bytes.clone()).map_err(|source| AppError::InvalidTransientEncoding {
            key: key.clone(),
            source,
        })?;

    if value.is_empty() {
        return Err(AppError::EmptyTransientValue(key.clone()));
    }

    Ok(value)
}
