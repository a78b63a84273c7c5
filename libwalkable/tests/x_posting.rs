//! X media upload and post creation against a mock API

use libwalkable::config::XConfig;
use libwalkable::platforms::x::XClient;
use libwalkable::platforms::Platform;
use libwalkable::types::{ImageMimeType, Post};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_json, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UPLOAD: &str = "/1.1/media/upload.json";
const TWEETS: &str = "/2/tweets";
const MEDIA_ID: &str = "710511363345354753";

fn client(server: &MockServer) -> XClient {
    let config = XConfig {
        consumer_key: "consumer-key".to_string(),
        consumer_secret: SecretString::from("consumer-secret".to_string()),
        access_token: "access-token".to_string(),
        access_token_secret: SecretString::from("access-token-secret".to_string()),
    };
    XClient::with_endpoints(config, &server.uri(), &server.uri())
}

fn post() -> Post {
    Post::new(
        vec![0xFF, 0xD8, 0xFF, 0xD9],
        ImageMimeType::Jpeg,
        "Park St\nIt could be: 328 feet\n".to_string(),
    )
}

async fn mount_upload(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(UPLOAD))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "media_id": 710511363345354753u64,
            "media_id_string": MEDIA_ID,
            "size": 4,
            "image": { "image_type": "image/jpeg", "w": 1, "h": 1 }
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_publish_uploads_then_posts() {
    let server = MockServer::start().await;

    mount_upload(&server).await;
    Mock::given(method("POST"))
        .and(path(TWEETS))
        .and(header_exists("authorization"))
        .and(body_json(json!({
            "text": "Park St\nIt could be: 328 feet\n",
            "media": { "media_ids": [MEDIA_ID] }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": { "id": "1445880548472328192", "text": "Park St\nIt could be: 328 feet" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = client(&server).publish(&post()).await.unwrap();

    assert!(report.is_clean(), "errors: {:?}", report.errors);
    assert_eq!(report.platform, "x");
    assert_eq!(report.post_id.as_deref(), Some("1445880548472328192"));
    assert!(report.purge.is_none());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url.path(), UPLOAD);
    assert_eq!(requests[1].url.path(), TWEETS);

    for request in &requests {
        let authorization = request.headers.get("authorization").unwrap().to_str().unwrap();
        assert!(authorization.starts_with("OAuth "));
        assert!(authorization.contains("oauth_consumer_key=\"consumer-key\""));
        assert!(authorization.contains("oauth_token=\"access-token\""));
        assert!(authorization.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(!authorization.contains("consumer-secret"));
    }

    let upload = &requests[0];
    let content_type = upload.headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&upload.body).to_lowercase();
    assert!(body.contains("name=\"media\""));
    assert!(body.contains("content-type: image/jpeg"));
}

#[tokio::test]
async fn test_upload_failure_skips_post() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPLOAD))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{ "code": 324, "message": "Invalid media" }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TWEETS))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let report = client(&server).publish(&post()).await.unwrap();

    assert!(!report.posted);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("Media upload failed"));
    assert!(report.errors[0].contains("400"));
}

#[tokio::test]
async fn test_rejected_credentials_on_post() {
    let server = MockServer::start().await;

    mount_upload(&server).await;
    Mock::given(method("POST"))
        .and(path(TWEETS))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "title": "Unauthorized",
            "status": 401,
            "detail": "Unauthorized"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let report = client(&server).publish(&post()).await.unwrap();

    assert!(!report.posted);
    assert!(report.errors[0].contains("Authentication failed"));
    assert!(report.errors[0].contains("create post"));
}

#[tokio::test]
async fn test_malformed_upload_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(UPLOAD))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"media_id\": 1"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .upload_media(&post().media, ImageMimeType::Jpeg)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("malformed X media upload response"));
}
