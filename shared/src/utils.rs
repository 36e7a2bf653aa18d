use lambda_http::http::StatusCode;
use lambda_http::{Body, Error, Response};
use serde::Serialize;

pub fn json_response<T: Serialize>(status: &StatusCode, body: &T) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status.as_u16())
        .header("Content-Type", "application/json")
        .body(Body::Text(serde_json::to_string(body)?))?)
}
