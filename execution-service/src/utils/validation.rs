use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;
use validator::Validate;

/// JSON body that is parsed and validated before the handler runs. Both
/// failures answer 400 with the usual `{error, details?}` body.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_error)?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

fn rejection_error(rejection: JsonRejection) -> AppError {
    tracing::debug!(status = %rejection.status(), "Rejected JSON body: {}", rejection.body_text());
    AppError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, response::IntoResponse, routing::post, Router};
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct Order {
        #[validate(range(min = 1, message = "At least one unit"))]
        units: u32,
    }

    async fn create(ValidatedJson(order): ValidatedJson<Order>) -> impl IntoResponse {
        order.units.to_string()
    }

    async fn send(body: &str, content_type: &str) -> (StatusCode, serde_json::Value) {
        let app = Router::new().route("/orders", post(create));
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/orders")
            .header("content-type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null))
    }

    #[tokio::test]
    async fn type_mismatch_is_a_json_400() {
        let (status, body) = send(r#"{"units":"lots"}"#, "application/json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error = body["error"].as_str().unwrap();
        assert!(error.starts_with("Invalid request body"), "{}", error);
        assert!(error.contains("units"), "{}", error);
    }

    #[tokio::test]
    async fn syntax_errors_and_missing_content_type_are_400() {
        let (status, body) = send("{", "application/json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = send(r#"{"units":2}"#, "text/plain").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn failed_rules_are_validation_errors() {
        let (status, body) = send(r#"{"units":0}"#, "application/json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Validation error");
    }
}
