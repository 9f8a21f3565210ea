//! HTTPクライアント・アップローダーの結合テスト（モックサーバー）

use formgen::error::FormgenError;
use formgen::http::{HttpClient, ReqwestClient};
use formgen::upload::{FileUploader, HttpUploader};
use formgen_common::{Part, Payload, PendingUpload, SelectedFile};
use serde_json::{json, Map};
use std::collections::BTreeMap;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(token: Option<&str>) -> ReqwestClient {
    ReqwestClient::new(token.map(String::from), 5).unwrap()
}

#[tokio::test]
async fn test_get_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/1"))
        .and(header("authorization", "Bearer t0ken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": 1, "title": "Lamp"}})))
        .expect(1)
        .mount(&server)
        .await;

    let value = client(Some("t0ken"))
        .get(&format!("{}/products/1", server.uri()))
        .await
        .unwrap();

    assert_eq!(value["data"]["title"], "Lamp");
}

#[tokio::test]
async fn test_post_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/products"))
        .and(body_json(json!({"title": "Hi", "due": "2024-03-05"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": 9}})))
        .expect(1)
        .mount(&server)
        .await;

    let mut map = Map::new();
    map.insert("title".into(), json!("Hi"));
    map.insert("due".into(), json!("2024-03-05"));
    let value = client(None)
        .post(&format!("{}/products", server.uri()), Payload::Json(map))
        .await
        .unwrap();

    assert_eq!(value["data"]["id"], 9);
}

#[tokio::test]
async fn test_put_multipart_parts() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/products"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let payload = Payload::Multipart(vec![
        ("title".into(), Part::Text("Hi".into())),
        ("id".into(), Part::Text("42".into())),
        (
            "photo".into(),
            Part::File(SelectedFile::from_bytes("a.png", "image/png", vec![1, 2, 3])),
        ),
    ]);
    let value = client(None)
        .put(&format!("{}/products", server.uri()), payload)
        .await
        .unwrap();
    assert!(value.is_null());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let content_type = requests[0].headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"title\""));
    assert!(body.contains("name=\"id\""));
    assert!(body.contains("filename=\"a.png\""));
}

#[tokio::test]
async fn test_error_body_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "message": "The given data was invalid.",
            "errors": {"title": ["The title field is required."]}
        })))
        .mount(&server)
        .await;

    let err = client(None)
        .post(&format!("{}/products", server.uri()), Payload::Json(Map::new()))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(422));
    match &err {
        FormgenError::Http { body: Some(body), .. } => {
            assert_eq!(body.message.as_deref(), Some("The given data was invalid."));
            assert_eq!(body.errors.as_ref().unwrap()["title"], vec!["The title field is required."]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.to_string().contains("title: The title field is required."));
}

#[tokio::test]
async fn test_non_json_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let err = client(None).get(&server.uri()).await.unwrap_err();

    assert!(matches!(err, FormgenError::Http { status: 500, body: None }));
}

#[tokio::test]
async fn test_uploader_posts_each_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"fullPath": "/media/products/a.png"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"fullPath": "/media/documents/b.pdf"}})))
        .expect(1)
        .mount(&server)
        .await;

    let uploader = HttpUploader::new(Arc::new(client(None)));
    let uploads = BTreeMap::from([
        (
            "photo".to_string(),
            PendingUpload {
                file: SelectedFile::from_bytes("a.png", "image/png", vec![1]),
                url: format!("{}/upload/products", server.uri()),
            },
        ),
        (
            "manual".to_string(),
            PendingUpload {
                file: SelectedFile::from_bytes("b.pdf", "application/pdf", vec![2]),
                url: format!("{}/upload/documents", server.uri()),
            },
        ),
    ]);

    let results = uploader.upload(&uploads).await.unwrap();

    let paths: BTreeMap<String, String> = results
        .into_iter()
        .map(|r| (r.key, r.response.full_path))
        .collect();
    assert_eq!(paths["photo"], "/media/products/a.png");
    assert_eq!(paths["manual"], "/media/documents/b.pdf");
}

#[tokio::test]
async fn test_uploader_fails_when_any_upload_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"fullPath": "/media/a.png"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let uploader = HttpUploader::new(Arc::new(client(None)));
    let uploads = BTreeMap::from([
        (
            "a".to_string(),
            PendingUpload {
                file: SelectedFile::from_bytes("a.png", "image/png", vec![1]),
                url: format!("{}/upload/ok", server.uri()),
            },
        ),
        (
            "b".to_string(),
            PendingUpload {
                file: SelectedFile::from_bytes("b.png", "image/png", vec![2]),
                url: format!("{}/upload/broken", server.uri()),
            },
        ),
    ]);

    let err = uploader.upload(&uploads).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
}
