//! API router.
//!
//! Layer order (outermost → innermost):
//! 1. CORS → 2. Access log → 3. Request deadline (Q&A routes only) → Handler
//!
//! The deadline replies 408 with a JSON error body. The Q&A pipeline is
//! given a slightly shorter budget so it returns text before that happens.
//!
//! Synthesized audio is served from the audio store directory under
//! `/static/audio`.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::assistant::audio_store::AUDIO_URL_PREFIX;
use crate::core_state::CoreState;

/// Build the full application router.
pub fn api_router(core: Arc<CoreState>) -> Router {
    let deadline = Duration::from_secs(core.config.request_timeout_secs);
    let audio_dir = core.audio_store().dir().to_path_buf();
    let ctx = ApiContext::new(core);

    let prediction = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/features", get(endpoints::health::features))
        .route("/api", get(endpoints::info::index))
        .route("/api/model/info", get(endpoints::info::model))
        .route("/predict", post(endpoints::predict::single))
        .route("/predict/batch", post(endpoints::predict::batch))
        .route("/predict/explain", post(endpoints::predict::explain))
        .with_state(ctx.clone());

    // Q&A routes wait on external services; bound the whole request.
    let qa = Router::new()
        .route("/qa_audio", post(endpoints::qa::qa_audio))
        .route("/api/chat", post(endpoints::qa::chat))
        .route("/api/health/advice", post(endpoints::qa::advice))
        .with_state(ctx)
        .layer(axum::middleware::from_fn_with_state(
            deadline,
            middleware::deadline::enforce,
        ));

    Router::new()
        .merge(prediction)
        .merge(qa)
        .nest_service(AUDIO_URL_PREFIX, ServeDir::new(audio_dir))
        .layer(axum::middleware::from_fn(middleware::access_log::log_access))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::assistant::llm::MockTextGenerator;
    use crate::assistant::speech::{MockSpeech, MockSynthesizer};
    use crate::core_state::tests::{test_config, test_state, test_state_with_config};
    use std::time::Duration;

    fn router_with(
        dir: &std::path::Path,
        generator: MockTextGenerator,
        synth: MockSynthesizer,
        with_model: bool,
    ) -> Router {
        api_router(Arc::new(test_state(dir, generator, synth, with_model)))
    }

    fn default_router(dir: &std::path::Path) -> Router {
        router_with(
            dir,
            MockTextGenerator::answering("Keep your blood pressure in check."),
            MockSynthesizer::always(MockSpeech::Audio(b"RIFFWAVE".to_vec())),
            true,
        )
    }

    fn patient(ap_hi: f64) -> Value {
        json!({
            "age": 50, "gender": 2, "height": 170, "weight": 70,
            "ap_hi": ap_hi, "ap_lo": 80, "cholesterol": 1, "gluc": 1,
            "smoke": 0, "alco": 0, "active": 1
        })
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    // ── prediction ───────────────────────────────────────────

    #[tokio::test]
    async fn health_reports_loaded_model() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(default_router(dir.path()), get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model_loaded"], true);
        assert_eq!(json["features_count"], 11);
    }

    #[tokio::test]
    async fn health_reports_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_with(
            dir.path(),
            MockTextGenerator::answering("x"),
            MockSynthesizer::always(MockSpeech::Timeout),
            false,
        );
        let (status, json) = send(app, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "error");
        assert_eq!(json["features_count"], 0);
    }

    #[tokio::test]
    async fn features_lists_model_order() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(default_router(dir.path()), get_req("/features")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 11);
        assert_eq!(json["features"][0], "age");
        assert_eq!(json["features"][4], "ap_hi");
    }

    #[tokio::test]
    async fn predict_healthy_patient() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(default_router(dir.path()), post_json("/predict", &patient(120.0))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["prediction"], 0);
        assert_eq!(json["prediction_label"], "healthy");
        assert_eq!(json["risk_level"], "low");
        let disease = json["probability"]["disease"].as_f64().unwrap();
        let healthy = json["probability"]["healthy"].as_f64().unwrap();
        assert!((disease + healthy - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn predict_high_blood_pressure_is_very_high_risk() {
        let dir = tempfile::tempdir().unwrap();
        let (_, json) = send(default_router(dir.path()), post_json("/predict", &patient(160.0))).await;
        assert_eq!(json["prediction_label"], "disease");
        assert_eq!(json["risk_level"], "very-high");
    }

    #[tokio::test]
    async fn predict_missing_feature_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = patient(120.0);
        body.as_object_mut().unwrap().remove("cholesterol");
        let (status, json) = send(default_router(dir.path()), post_json("/predict", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "MISSING_FEATURES");
        assert!(json["error"].as_str().unwrap().contains("cholesterol"));
    }

    #[tokio::test]
    async fn predict_non_numeric_value_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = patient(120.0);
        body["age"] = json!("fifty");
        let (status, json) = send(default_router(dir.path()), post_json("/predict", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "INVALID_VALUE");
    }

    #[tokio::test]
    async fn predict_malformed_body_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/predict")
            .header("Content-Type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, json) = send(default_router(dir.path()), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn predict_without_model_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_with(
            dir.path(),
            MockTextGenerator::answering("x"),
            MockSynthesizer::always(MockSpeech::Timeout),
            false,
        );
        let (status, json) = send(app, post_json("/predict", &patient(120.0))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["code"], "MODEL_UNAVAILABLE");
    }

    #[tokio::test]
    async fn batch_reports_each_row_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let body = json!({"rows": [patient(120.0), {"age": 50}, "oops", patient(140.0)]});
        let (status, json) = send(default_router(dir.path()), post_json("/predict/batch", &body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 4);
        let results = json["results"].as_array().unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0]["risk_level"], "low");
        assert_eq!(results[1]["success"], false);
        assert_eq!(results[1]["code"], "MISSING_FEATURES");
        assert_eq!(results[2]["code"], "INVALID_ROW");
        assert_eq!(results[3]["risk_level"], "high");
    }

    #[tokio::test]
    async fn explain_returns_top_features() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(default_router(dir.path()), post_json("/predict/explain", &patient(120.0))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["prediction_label"], "healthy");
        assert_eq!(json["top_features"][0]["feature"], "ap_hi");
        assert!(json["top_features"].as_array().unwrap().len() <= 5);
        assert_eq!(json["input_features"].as_array().unwrap().len(), 11);
    }

    #[tokio::test]
    async fn model_info_lists_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(default_router(dir.path()), get_req("/api/model/info")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["feature_count"], 11);
        assert_eq!(json["data"]["risk_tiers"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn api_index_lists_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(default_router(dir.path()), get_req("/api")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["endpoints"]["qa_audio"], "/qa_audio");
    }

    // ── Q&A ──────────────────────────────────────────────────

    #[tokio::test]
    async fn qa_audio_returns_text_and_audio() {
        let dir = tempfile::tempdir().unwrap();
        let app = default_router(dir.path());
        let (status, json) = send(
            app.clone(),
            post_json("/qa_audio", &json!({"question": "How do I prevent heart disease?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["text"], "Keep your blood pressure in check.");
        assert!(json.get("warning").is_none());

        // The returned URL is served by the static route.
        let url = json["audio_url"].as_str().unwrap().to_string();
        let response = app.oneshot(get_req(&url)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"RIFFWAVE");
    }

    #[tokio::test]
    async fn qa_audio_degrades_to_text() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_with(
            dir.path(),
            MockTextGenerator::answering("Eat more vegetables."),
            MockSynthesizer::always(MockSpeech::Fail(401)),
            true,
        );
        let (status, json) = send(app, post_json("/qa_audio", &json!({"question": "diet?"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["text"], "Eat more vegetables.");
        assert!(json.as_object().unwrap().contains_key("audio_url"));
        assert!(json["audio_url"].is_null());
        assert_eq!(json["warning"], "speech synthesis failed, text-only");
    }

    #[tokio::test]
    async fn qa_audio_slow_services_still_return_text_before_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::AppConfig {
            request_timeout_secs: 2,
            ..test_config(dir.path())
        };
        // Unbounded, 600 ms of generation plus three 600 ms speech timeouts
        // would overrun the 2 s deadline.
        let app = api_router(Arc::new(test_state_with_config(
            config,
            MockTextGenerator::answering("Sleep eight hours.").with_delay(Duration::from_millis(600)),
            MockSynthesizer::always(MockSpeech::Timeout).with_delay(Duration::from_millis(600)),
            true,
        )));

        let (status, json) = send(app, post_json("/qa_audio", &json!({"question": "sleep?"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["text"], "Sleep eight hours.");
        assert!(json["audio_url"].is_null());
        assert_eq!(json["warning"], "speech synthesis failed, text-only");
    }

    #[tokio::test]
    async fn qa_deadline_overrun_is_json_408() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::AppConfig {
            request_timeout_secs: 1,
            ..test_config(dir.path())
        };
        let app = api_router(Arc::new(test_state_with_config(
            config,
            MockTextGenerator::answering("late").with_delay(Duration::from_millis(1500)),
            MockSynthesizer::always(MockSpeech::Audio(b"x".to_vec())),
            true,
        )));

        let (status, json) = send(app, post_json("/api/chat", &json!({"question": "q"}))).await;
        assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "TIMEOUT");
    }

    #[tokio::test]
    async fn qa_audio_generation_failure_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_with(
            dir.path(),
            MockTextGenerator::failing("api.deepseek.com"),
            MockSynthesizer::always(MockSpeech::Audio(b"x".to_vec())),
            true,
        );
        let (status, json) = send(app, post_json("/qa_audio", &json!({"question": "q"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().starts_with("generation failed"));
    }

    #[tokio::test]
    async fn qa_audio_requires_question() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(default_router(dir.path()), post_json("/qa_audio", &json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "BAD_REQUEST");

        let (status, _) = send(default_router(dir.path()), post_json("/qa_audio", &json!({"question": "   "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn chat_returns_text_only() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(
            default_router(dir.path()),
            post_json("/api/chat", &json!({"question": "Is salt bad?", "context": "high risk"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["question"], "Is salt bad?");
        assert_eq!(json["answer"], "Keep your blood pressure in check.");
        assert!(json.get("audio_url").is_none());
    }

    #[tokio::test]
    async fn advice_combines_prediction_and_answer() {
        let dir = tempfile::tempdir().unwrap();
        let (status, json) = send(
            default_router(dir.path()),
            post_json("/api/health/advice", &json!({"user_data": patient(140.0)})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["prediction"]["risk_level"], "high");
        assert_eq!(json["advice"], "Keep your blood pressure in check.");
    }

    #[tokio::test]
    async fn advice_with_invalid_user_data_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = send(
            default_router(dir.path()),
            post_json("/api/health/advice", &json!({"user_data": {"age": 50}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let response = default_router(dir.path()).oneshot(get_req("/nonexistent")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_audio_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let response = default_router(dir.path())
            .oneshot(get_req("/static/audio/nothing.wav"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
