use std::sync::Arc;

use axum::{
	body::{Body, Bytes},
	extract::State,
	http::HeaderMap,
	response::{IntoResponse, Response},
	routing::post,
};

use crate::{grant::GrantEngine, hasher::CredentialHasher, store::CredentialStore};

pub trait GrantRouter<S, H> {
	/// Mounts the token endpoint on `/token`.
	fn token_route(self) -> Self;
}

impl<S, H> GrantRouter<S, H> for axum::Router<Arc<GrantEngine<S, H>>>
where
	S: CredentialStore + 'static,
	H: CredentialHasher + 'static,
{
	fn token_route(self) -> Self {
		self.route("/token", post(token::<S, H>))
	}
}

/// Token Request endpoint.
async fn token<S, H>(
	State(engine): State<Arc<GrantEngine<S, H>>>,
	headers: HeaderMap,
	body: Bytes,
) -> Response
where
	S: CredentialStore,
	H: CredentialHasher,
{
	let mut request = http::Request::new(body.to_vec());
	*request.headers_mut() = headers;

	super::token_endpoint(&engine, &request)
		.await
		.map(Body::from)
		.into_response()
}
