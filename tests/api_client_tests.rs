// Integration tests for the HTTP transport
// A local axum app stands in for the architecture API

#[cfg(test)]
mod api_client_integration_tests {
    use archgen_lib::config::ClientConfig;
    use archgen_lib::services::Services;
    use archgen_lib::transport::{ApiClient, Method, RequestOptions, Transport};
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Arc;

    async fn whoami(headers: HeaderMap) -> Json<Value> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Json(json!({
            "authorization": header("authorization"),
            "request_id": header("x-request-id"),
        }))
    }

    async fn get_project(Path(id): Path<String>) -> axum::response::Response {
        match id.as_str() {
            "42" => Json(json!({
                "id": 42,
                "project_name": "Shop",
                "architecture_data": {"services": {"compute": "Lambda"}, "estimated_cost": 125},
                "created_at": "2024-03-01T10:00:00",
            }))
            .into_response(),
            "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response(),
            _ => (
                StatusCode::NOT_FOUND,
                Json(json!({"detail": "Project not found"})),
            )
                .into_response(),
        }
    }

    async fn list_projects(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
        let limit: usize = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(0);
        let rows: Vec<Value> = (1..=3)
            .take(limit)
            .map(|i| json!({"id": i, "project_name": format!("Project {}", i)}))
            .collect();
        Json(Value::Array(rows))
    }

    async fn delete_project() -> StatusCode {
        StatusCode::NO_CONTENT
    }

    async fn validate(Json(body): Json<Value>) -> axum::response::Response {
        if body.get("project_name").and_then(Value::as_str).is_some() {
            return Json(body).into_response();
        }
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [
                {"loc": ["body", "project_name"], "msg": "field required"},
                {"loc": ["body", "questionnaire_data"], "msg": "field required"},
            ]})),
        )
            .into_response()
    }

    async fn serve() -> String {
        let app = Router::new()
            .route("/api/v1/whoami", get(whoami))
            .route("/api/v1/projects/", get(list_projects).post(validate))
            .route("/api/v1/projects/:id", get(get_project).delete(delete_project))
            .route("/api/v1/echo", post(|Json(body): Json<Value>| async move { Json(body) }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api/v1/", addr)
    }

    async fn client() -> Arc<ApiClient> {
        let config = ClientConfig {
            api_base_url: serve().await,
            ..ClientConfig::default()
        };
        Arc::new(ApiClient::new(&config).unwrap())
    }

    #[tokio::test]
    async fn test_bearer_token_and_request_id_are_sent() {
        let client = client().await;

        let anonymous = client.get("/whoami", RequestOptions::new()).await.unwrap();
        assert!(anonymous["authorization"].is_null());
        assert_eq!(anonymous["request_id"].as_str().unwrap().len(), 36);

        client.set_auth_token(Some("jwt-abc".to_string()));
        let signed = client.get("whoami", RequestOptions::new()).await.unwrap();
        assert_eq!(signed["authorization"], "Bearer jwt-abc");
        assert_ne!(signed["request_id"], anonymous["request_id"]);
    }

    #[tokio::test]
    async fn test_json_body_round_trips() {
        let client = client().await;
        let reply = client
            .send(
                Method::Post,
                "/echo",
                RequestOptions::with_body(json!({"answers": {"traffic_volume": "high"}})),
            )
            .await
            .unwrap();
        assert_eq!(reply, json!({"answers": {"traffic_volume": "high"}}));
    }

    #[tokio::test]
    async fn test_services_decode_server_records() {
        let services = Services::new(client().await);

        let project = services.projects.get("42").await.unwrap();
        assert_eq!(project.id, "42");
        assert_eq!(project.project_name, "Shop");
        let architecture = project.architecture_data.unwrap();
        assert_eq!(architecture.services["compute"], "Lambda");
        assert_eq!(architecture.estimated_cost.as_deref(), Some("125"));
        assert!(project.created_at.is_some());

        let rows = services.projects.list(0, 2).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].project_name, "Project 2");
    }

    #[tokio::test]
    async fn test_no_content_reply_is_success() {
        let services = Services::new(client().await);
        services.projects.delete("42").await.unwrap();
    }

    #[tokio::test]
    async fn test_server_detail_becomes_message() {
        let services = Services::new(client().await);

        let err = services.projects.get("missing").await.unwrap_err();
        assert_eq!(err.message, "Project not found");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_validation_detail_list_is_joined() {
        let client = client().await;
        let err = client
            .post("/projects/", RequestOptions::with_body(json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(422));
        assert_eq!(
            archgen_lib::errors::to_api_message(&err, "Failed to create project"),
            "field required, field required"
        );
    }

    #[tokio::test]
    async fn test_plain_text_error_body_is_kept() {
        let client = client().await;
        let err = client
            .get("/projects/broken", RequestOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(500));
        assert_eq!(err.body, Some(Value::String("upstream exploded".into())));
        assert!(err.detail().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let config = ClientConfig {
            api_base_url: "http://127.0.0.1:9/api/v1".to_string(),
            ..ClientConfig::default()
        };
        let client = ApiClient::new(&config).unwrap();
        let err = client.get("/whoami", RequestOptions::new()).await.unwrap_err();
        assert!(err.is_network());
    }
}
