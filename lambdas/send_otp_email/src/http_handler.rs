use lambda_http::request::RequestContext;
use lambda_http::{
    http::StatusCode, tracing, Error, IntoResponse, Request, RequestExt, RequestPayloadExt,
};
use serde::{Deserialize, Serialize};
use shared::core::{EmailMessage, EmailSender};
use shared::utils::json_response;

#[derive(Serialize, Deserialize)]
pub struct SendOtpRequest {
    pub email: Option<String>,
    pub code: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

#[derive(Serialize)]
struct SuccessBody {
    success: bool,
}

pub(crate) struct HandlerDeps<E: EmailSender> {
    pub email_sender: E,
    pub from_address: String,
}

pub(crate) async fn function_handler<E: EmailSender>(
    deps: &HandlerDeps<E>,
    event: Request,
) -> Result<impl IntoResponse, Error> {
    // Authentication itself is the gateway authorizer's job; the handler only
    // refuses requests that reached it without a forwarded principal.
    let Some(principal) = caller_principal(&event) else {
        return json_response(
            &StatusCode::UNAUTHORIZED,
            &ErrorBody {
                error: "unauthenticated",
            },
        );
    };

    let payload = match event.payload::<SendOtpRequest>() {
        Ok(Some(payload)) => payload,
        Ok(None) | Err(_) => {
            return json_response(
                &StatusCode::BAD_REQUEST,
                &ErrorBody {
                    error: "invalid-argument",
                },
            )
        }
    };
    let (email, code) = match (payload.email, payload.code) {
        (Some(email), Some(code)) if !email.is_empty() && !code.is_empty() => (email, code),
        _ => {
            return json_response(
                &StatusCode::BAD_REQUEST,
                &ErrorBody {
                    error: "invalid-argument",
                },
            )
        }
    };

    let message = EmailMessage {
        to: email.clone(),
        from: deps.from_address.clone(),
        subject: "Your SeneMarket verification code".to_string(),
        text: format!(
            "Your SeneMarket verification code is {}. It expires shortly, do not share it with anyone.",
            code
        ),
    };
    match deps.email_sender.send_email(&message).await {
        Ok(()) => {
            tracing::info!("OTP email sent to {} for caller {}", email, principal);
            json_response(&StatusCode::OK, &SuccessBody { success: true })
        }
        Err(detail) => {
            // Provider detail stays server-side; the caller only sees a
            // generic internal error.
            tracing::error!("Failed to send OTP email to {}: {}", email, detail);
            json_response(
                &StatusCode::INTERNAL_SERVER_ERROR,
                &ErrorBody { error: "internal" },
            )
        }
    }
}

fn caller_principal(event: &Request) -> Option<String> {
    match event.request_context_ref()? {
        RequestContext::ApiGatewayV1(context) => context
            .authorizer
            .fields
            .get("principalId")
            .and_then(|value| value.as_str().map(str::to_string)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{function_handler, HandlerDeps};
    use lambda_http::aws_lambda_events::event::apigw::ApiGatewayProxyRequestContext;
    use lambda_http::http::Request as HttpRequest;
    use lambda_http::request::RequestContext;
    use lambda_http::{Body, IntoResponse, Request, RequestExt};
    use serde_json::{json, Value};
    use shared::core::MockEmailSender;

    fn deps(email_sender: MockEmailSender) -> HandlerDeps<MockEmailSender> {
        HandlerDeps {
            email_sender,
            from_address: "senemarket.notifications@gmail.com".to_string(),
        }
    }

    fn request(body: Value) -> Request {
        HttpRequest::builder()
            .header("Content-Type", "application/json")
            .body(body.to_string().into())
            .unwrap()
    }

    fn authenticated(request: Request) -> Request {
        let mut context = ApiGatewayProxyRequestContext::default();
        context
            .authorizer
            .fields
            .insert("principalId".to_string(), json!("user-123"));
        request.with_request_context(RequestContext::ApiGatewayV1(context))
    }

    async fn status_and_body(
        deps: &HandlerDeps<MockEmailSender>,
        request: Request,
    ) -> (u16, Value) {
        let response = function_handler(deps, request)
            .await
            .unwrap()
            .into_response()
            .await;
        let status = response.status().as_u16();
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn when_caller_is_unauthenticated_should_reject_without_sending() {
        let mut email_sender = MockEmailSender::new();
        email_sender.expect_send_email().times(0);
        let deps = deps(email_sender);

        let (status, body) = status_and_body(
            &deps,
            request(json!({"email": "a@x.com", "code": "123456"})),
        )
        .await;

        assert_eq!(status, 401);
        assert_eq!(body, json!({"error": "unauthenticated"}));
    }

    #[tokio::test]
    async fn when_code_is_missing_should_reject_with_invalid_argument() {
        let mut email_sender = MockEmailSender::new();
        email_sender.expect_send_email().times(0);
        let deps = deps(email_sender);

        let (status, body) =
            status_and_body(&deps, authenticated(request(json!({"email": "a@x.com"})))).await;

        assert_eq!(status, 400);
        assert_eq!(body, json!({"error": "invalid-argument"}));
    }

    #[tokio::test]
    async fn when_body_is_not_json_should_reject_with_invalid_argument() {
        let mut email_sender = MockEmailSender::new();
        email_sender.expect_send_email().times(0);
        let deps = deps(email_sender);

        let request = authenticated(
            HttpRequest::builder()
                .header("Content-Type", "application/json")
                .body(Body::Text("not json".to_string()))
                .unwrap(),
        );
        let (status, body) = status_and_body(&deps, request).await;

        assert_eq!(status, 400);
        assert_eq!(body, json!({"error": "invalid-argument"}));
    }

    #[tokio::test]
    async fn when_request_is_valid_should_send_exactly_one_email_with_the_code() {
        let mut email_sender = MockEmailSender::new();
        email_sender
            .expect_send_email()
            .times(1)
            .withf(|message| {
                message.to == "a@x.com"
                    && message.from == "senemarket.notifications@gmail.com"
                    && message.text.contains("123456")
            })
            .returning(|_| Ok(()));
        let deps = deps(email_sender);

        let (status, body) = status_and_body(
            &deps,
            authenticated(request(json!({"email": "a@x.com", "code": "123456"}))),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body, json!({"success": true}));
    }

    #[tokio::test]
    async fn when_the_provider_fails_should_return_internal_without_detail() {
        let mut email_sender = MockEmailSender::new();
        email_sender
            .expect_send_email()
            .times(1)
            .returning(|_| Err("SendGrid rejected the send: 401 bad key".to_string()));
        let deps = deps(email_sender);

        let (status, body) = status_and_body(
            &deps,
            authenticated(request(json!({"email": "a@x.com", "code": "123456"}))),
        )
        .await;

        assert_eq!(status, 500);
        assert_eq!(body, json!({"error": "internal"}));
    }
}
