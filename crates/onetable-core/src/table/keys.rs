//! Key attribute values for writes and point lookups.

use crate::{
    client::ScalarType,
    error::InternalError,
    key::KeyCodec,
    model::index::{Index, KeyAttribute, KeySource},
    value::{AttributeValue, Fields, Item},
};

/// Encoded value of one key attribute, or `None` when some slot has no
/// populated value.
pub(crate) fn attribute_value(
    attribute: &KeyAttribute,
    type_name: &str,
    fields: &Fields,
    codec: &KeyCodec,
) -> Result<Option<AttributeValue>, InternalError> {
    let Some(key) = attribute.key_fields(type_name) else {
        return Ok(None);
    };

    let mut parts = Vec::with_capacity(key.len());
    for kf in key.iter() {
        let part = match &kf.source {
            KeySource::Literal(literal) => Some(literal.clone()),
            KeySource::Field(name) => fields
                .get(name)
                .filter(|v| v.is_scalar() && !v.is_zero())
                .and_then(AttributeValue::as_key_text),
        };
        let Some(part) = part else {
            return Ok(None);
        };
        parts.push(part);
    }

    let encoded = codec.encode(type_name, &parts)?;
    let value = if attribute.scalar_type == ScalarType::N && !key.is_composite() {
        AttributeValue::N(encoded)
    } else {
        AttributeValue::S(encoded)
    };

    Ok(Some(value))
}

/// Every key attribute of `index`, or `None` if the record does not
/// populate all of them (sparse index).
pub(crate) fn index_key(
    index: &Index,
    type_name: &str,
    fields: &Fields,
    codec: &KeyCodec,
) -> Result<Option<Item>, InternalError> {
    let mut key = Item::new();
    for attribute in index.key_attributes() {
        match attribute_value(attribute, type_name, fields, codec)? {
            Some(value) => {
                key.insert(attribute.name.clone(), value);
            }
            None => return Ok(None),
        }
    }

    Ok(Some(key))
}

/// Primary key of a record; every primary key slot must be populated.
pub(crate) fn primary_key(
    primary: &Index,
    type_name: &str,
    fields: &Fields,
    codec: &KeyCodec,
) -> Result<Item, InternalError> {
    index_key(primary, type_name, fields, codec)?.ok_or_else(|| {
        let missing = primary
            .key_attributes()
            .filter_map(|attribute| attribute.key_fields(type_name))
            .flat_map(|key| key.iter())
            .filter_map(|kf| kf.field_name())
            .filter(|name| fields.get(*name).is_none_or(AttributeValue::is_zero))
            .collect::<Vec<_>>()
            .join(", ");

        InternalError::key_validation(format!(
            "{type_name} is missing primary key fields: {missing}"
        ))
    })
}

/// Whether a stored item has the same primary key values.
pub(crate) fn same_primary_key(primary: &Index, key: &Item, item: &Item) -> bool {
    primary
        .key_attributes()
        .all(|attribute| key.get(&attribute.name) == item.get(&attribute.name))
}
