//! Redirect URI query building.
use iref::{UriBuf, uri::Query};
use serde::Serialize;

use crate::error::ValidationError;

/// Parses a redirect URI as sent by a client.
pub fn parse_redirect_uri(uri: &str) -> Result<UriBuf, ValidationError> {
	UriBuf::new(uri.as_bytes().to_vec()).map_err(|_| ValidationError::MalformedRedirectUri)
}

/// Appends `value`, serialized as `application/x-www-form-urlencoded`, to the
/// query of `uri`.
///
/// Parameters already present on the URI are preserved.
pub fn extend_uri_query<T: Serialize>(uri: &mut UriBuf, value: T) -> Result<(), ValidationError> {
	let params = serde_html_form::to_string(value)
		.map_err(|e| ValidationError::MalformedRequest(e.to_string()))?;

	let query = concat_query(uri.query().map(Query::as_str).unwrap_or_default(), &params);
	let query = Query::new(query.as_str()).map_err(|_| ValidationError::MalformedRedirectUri)?;
	uri.set_query(Some(query));
	Ok(())
}

/// Concatenates two query strings with `&` as separator.
///
/// If either query is empty, the other is returned as-is.
pub fn concat_query(query: &str, other: &str) -> String {
	let mut query = query.to_owned();

	if !query.is_empty() && !other.is_empty() {
		query.push('&')
	}

	query.push_str(other);
	query
}
