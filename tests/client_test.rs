//! Tests for DriveClient against a mocked Drive API.

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

use drive_facade::{
    CancellationToken, DriveClient, DriveConfig, DriveError, GetOptions, Payload, PayloadObject,
    ResponseType, Retrieved,
};

const TEST_KEY: &str = include_str!("fixtures/test_key.pem");
const PARENT_ID: &str = "parent-folder";
const CREATE_PATH: &str = "/upload/drive/v3/files";

fn credentials(server: &ServerGuard) -> serde_json::Value {
    json!({
        "client_email": "uploader@project.iam.gserviceaccount.com",
        "private_key": TEST_KEY,
        "token_uri": format!("{}/token", server.url())
    })
}

fn config(server: &ServerGuard) -> DriveConfig {
    DriveConfig::default()
        .with_parent_id(PARENT_ID)
        .with_api_base(format!("{}/drive/v3", server.url()))
        .with_upload_base(format!("{}/upload/drive/v3", server.url()))
        .with_content_base(server.url())
}

fn client(server: &ServerGuard) -> DriveClient {
    DriveClient::with_config(credentials(server), config(server)).unwrap()
}

async fn mock_token(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "test-token",
                "token_type": "Bearer",
                "expires_in": 3600
            })
            .to_string(),
        )
        .create_async()
        .await
}

async fn mock_redirect(server: &mut ServerGuard, id: &str, location: &str) -> Mock {
    server
        .mock("HEAD", "/uc")
        .match_query(Matcher::UrlEncoded("id".into(), id.into()))
        .with_status(302)
        .with_header("location", location)
        .create_async()
        .await
}

/// A host that accepts connections and never answers them.
async fn silent_host() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{}", addr)
}

async fn mock_create(server: &mut ServerGuard, id: &str) -> Mock {
    server
        .mock("POST", CREATE_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(created_body(id))
        .create_async()
        .await
}

fn created_body(id: &str) -> String {
    json!({
        "id": id,
        "name": "1718000000000",
        "mimeType": "application/octet-stream",
        "parents": [PARENT_ID],
        "size": "10"
    })
    .to_string()
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn test_buffer_without_filter_projects_all_fields() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        let create = server
            .mock("POST", CREATE_PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("uploadType".into(), "multipart".into()),
                Matcher::UrlEncoded("fields".into(), "*".into()),
            ]))
            .match_header("authorization", "Bearer test-token")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#""parents":\["parent-folder"\]"#.into()),
                Matcher::Regex("0123456789".into()),
            ]))
            .with_status(200)
            .with_body(created_body("file-1"))
            .create_async()
            .await;
        let probe = mock_redirect(&mut server, "file-1", "https://cdn.example.com/file-1").await;

        let payload = PayloadObject::new().with_buffer(&b"0123456789"[..]);
        let stored = client(&server).upload(payload, None).await.unwrap().unwrap();

        create.assert_async().await;
        probe.assert_async().await;
        assert_eq!(stored.id, "file-1");
        assert_eq!(stored.parents, Some(vec![PARENT_ID.to_string()]));
        assert_eq!(stored.size, Some(10));
        assert_eq!(
            stored.web_content_link.as_deref(),
            Some("https://cdn.example.com/file-1")
        );
    }

    #[tokio::test]
    async fn test_string_filter_gets_id_prefix() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        let create = server
            .mock("POST", CREATE_PATH)
            .match_query(Matcher::UrlEncoded("fields".into(), "id,name,size".into()))
            .with_status(200)
            .with_body(json!({"id": "file-2", "name": "n", "size": "10"}).to_string())
            .create_async()
            .await;
        mock_redirect(&mut server, "file-2", "https://cdn.example.com/file-2").await;

        let payload = PayloadObject::new().with_buffer(&b"0123456789"[..]);
        let stored = client(&server)
            .upload(payload, Some("name,size".into()))
            .await
            .unwrap()
            .unwrap();

        create.assert_async().await;
        assert_eq!(stored.name.as_deref(), Some("n"));
        assert!(stored.mime_type.is_none());
    }

    #[tokio::test]
    async fn test_list_filter_gets_id_prefix() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        let create = server
            .mock("POST", CREATE_PATH)
            .match_query(Matcher::UrlEncoded("fields".into(), "id,webViewLink".into()))
            .with_status(200)
            .with_body(json!({"id": "file-3"}).to_string())
            .create_async()
            .await;
        mock_redirect(&mut server, "file-3", "https://cdn.example.com/file-3").await;

        let stored = client(&server)
            .upload(b"abc".to_vec(), Some(vec!["webViewLink"].into()))
            .await
            .unwrap();

        create.assert_async().await;
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn test_empty_payload_makes_no_requests() {
        let mut server = Server::new_async().await;
        let token = server.mock("POST", "/token").expect(0).create_async().await;
        let create = server.mock("POST", CREATE_PATH).expect(0).create_async().await;

        let client = client(&server);
        assert!(client.upload(PayloadObject::new(), None).await.unwrap().is_none());
        assert!(client.upload(Bytes::new(), None).await.unwrap().is_none());

        token.assert_async().await;
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_probe_without_redirect_returns_canonical_url() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        server
            .mock("POST", CREATE_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(created_body("file-4"))
            .create_async()
            .await;
        server
            .mock("HEAD", "/uc")
            .match_query(Matcher::UrlEncoded("id".into(), "file-4".into()))
            .with_status(200)
            .create_async()
            .await;

        let stored = client(&server)
            .upload(b"abc".to_vec(), None)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            stored.web_content_link,
            Some(format!("{}/uc?id=file-4", server.url()))
        );
    }

    #[tokio::test]
    async fn test_unreachable_content_host_discards_result() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        let create = server
            .mock("POST", CREATE_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(created_body("file-5"))
            .create_async()
            .await;

        let client = DriveClient::with_config(
            credentials(&server),
            config(&server).with_content_base("http://127.0.0.1:1"),
        )
        .unwrap();

        let result = client.upload(b"abc".to_vec(), None).await.unwrap();

        create.assert_async().await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_create_failure_is_an_error() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        server
            .mock("POST", CREATE_PATH)
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(json!({"error": {"code": 403, "message": "Storage quota exceeded"}}).to_string())
            .create_async()
            .await;
        let probe = server.mock("HEAD", "/uc").match_query(Matcher::Any).expect(0).create_async().await;

        let err = client(&server)
            .upload(b"abc".to_vec(), None)
            .await
            .unwrap_err();

        probe.assert_async().await;
        match err {
            DriveError::ApiError { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "Storage quota exceeded");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_token_refresh_failure_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body("invalid_grant")
            .create_async()
            .await;

        let err = client(&server)
            .upload(b"abc".to_vec(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DriveError::TokenRefreshError(_)));
    }

    #[tokio::test]
    async fn test_stream_payload_is_uploaded() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        let create = server
            .mock("POST", CREATE_PATH)
            .match_query(Matcher::Any)
            .match_body(Matcher::Regex("first-chunk.second-chunk".into()))
            .with_status(200)
            .with_body(created_body("file-6"))
            .create_async()
            .await;
        mock_redirect(&mut server, "file-6", "https://cdn.example.com/file-6").await;

        let chunks = futures::stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"first-chunk.")),
            Ok(Bytes::from_static(b"second-chunk")),
        ]);
        let stored = client(&server)
            .upload(Payload::from_stream(chunks), None)
            .await
            .unwrap();

        create.assert_async().await;
        assert_eq!(stored.unwrap().id, "file-6");
    }

    #[tokio::test]
    async fn test_token_is_reused_across_uploads() {
        let mut server = Server::new_async().await;
        let token = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(json!({"access_token": "test-token", "expires_in": 3600}).to_string())
            .expect(1)
            .create_async()
            .await;
        server
            .mock("POST", CREATE_PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(created_body("file-7"))
            .expect(2)
            .create_async()
            .await;
        mock_redirect(&mut server, "file-7", "https://cdn.example.com/file-7").await;

        let client = client(&server);
        assert!(client.upload(b"one".to_vec(), None).await.unwrap().is_some());
        assert!(client.upload(b"two".to_vec(), None).await.unwrap().is_some());

        token.assert_async().await;
    }

    #[tokio::test]
    async fn test_cancelled_upload() {
        let mut server = Server::new_async().await;
        let create = server.mock("POST", CREATE_PATH).expect(0).create_async().await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client(&server)
            .upload_cancellable(b"abc".to_vec(), None, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, DriveError::Cancelled));
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_unparseable_mimetype_attribute_still_uploads() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        let create = server
            .mock("POST", CREATE_PATH)
            .match_query(Matcher::Any)
            .match_body(Matcher::Regex("application/octet-stream".into()))
            .with_status(200)
            .with_body(created_body("file-9"))
            .create_async()
            .await;
        mock_redirect(&mut server, "file-9", "https://cdn.example.com/file-9").await;

        let payload = PayloadObject::new()
            .with_buffer(&b"0123456789"[..])
            .with_attribute("mimetype", "not a mime");
        let stored = client(&server).upload(payload, None).await.unwrap();

        create.assert_async().await;
        assert_eq!(stored.unwrap().id, "file-9");
    }

    #[tokio::test]
    async fn test_redirect_without_location_discards_result() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        let create = mock_create(&mut server, "file-10").await;
        let probe = server
            .mock("HEAD", "/uc")
            .match_query(Matcher::UrlEncoded("id".into(), "file-10".into()))
            .with_status(302)
            .create_async()
            .await;

        let result = client(&server).upload(b"abc".to_vec(), None).await.unwrap();

        create.assert_async().await;
        probe.assert_async().await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_during_link_resolution() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        let create = mock_create(&mut server, "file-11").await;

        let client = DriveClient::with_config(
            credentials(&server),
            config(&server).with_content_base(silent_host().await),
        )
        .unwrap();

        let cancel = CancellationToken::new();
        let cancel_after_create = async {
            while !create.matched_async().await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        };

        let (result, ()) = tokio::join!(
            client.upload_cancellable(b"abc".to_vec(), None, &cancel),
            cancel_after_create
        );

        assert!(result.unwrap().is_none());
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_timeout_bounds_link_resolution() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        let create = mock_create(&mut server, "file-12").await;

        let client = DriveClient::with_config(
            credentials(&server),
            config(&server)
                .with_content_base(silent_host().await)
                .with_request_timeout(Duration::from_secs(2)),
        )
        .unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            client.upload(b"abc".to_vec(), None),
        )
        .await
        .expect("upload should be bounded by the request timeout");

        assert!(result.unwrap().is_none());
        create.assert_async().await;
    }
}

mod get {
    use super::*;

    #[tokio::test]
    async fn test_remote_failure_resolves_to_none() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        let get = server
            .mock("GET", "/drive/v3/files/abc123")
            .match_query(Matcher::UrlEncoded("fields".into(), "name".into()))
            .with_status(404)
            .with_body(json!({"error": {"code": 404, "message": "File not found: abc123."}}).to_string())
            .create_async()
            .await;

        let result = client(&server)
            .get("abc123", GetOptions::new().with_fields("name"))
            .await;

        get.assert_async().await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_api_resolves_to_none() {
        let server = Server::new_async().await;
        let client = DriveClient::with_config(
            json!({
                "client_email": "uploader@project.iam.gserviceaccount.com",
                "private_key": TEST_KEY,
                "token_uri": "http://127.0.0.1:1/token"
            }),
            config(&server),
        )
        .unwrap();

        assert!(client.get("abc123", GetOptions::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_metadata_as_json() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        server
            .mock("GET", "/drive/v3/files/abc123")
            .match_query(Matcher::UrlEncoded("fields".into(), "id,name".into()))
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_body(json!({"id": "abc123", "name": "report"}).to_string())
            .create_async()
            .await;

        let result = client(&server)
            .get("abc123", GetOptions::new().with_fields("id,name"))
            .await
            .unwrap();

        assert_eq!(result.as_json().unwrap()["name"], "report");
    }

    #[tokio::test]
    async fn test_upload_then_fetch_media_round_trip() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        let content = b"round trip payload";
        server
            .mock("POST", CREATE_PATH)
            .match_query(Matcher::Any)
            .match_body(Matcher::Regex("round trip payload".into()))
            .with_status(200)
            .with_body(created_body("file-8"))
            .create_async()
            .await;
        mock_redirect(&mut server, "file-8", "https://cdn.example.com/file-8").await;
        server
            .mock("GET", "/drive/v3/files/file-8")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .with_status(200)
            .with_body(content)
            .create_async()
            .await;

        let client = client(&server);
        let stored = client
            .upload(PayloadObject::new().with_data(&content[..]), None)
            .await
            .unwrap()
            .unwrap();

        let fetched = client.get(&stored.id, GetOptions::media()).await.unwrap();
        assert_eq!(fetched.as_bytes().unwrap().as_ref(), content);
    }

    #[tokio::test]
    async fn test_media_as_stream() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        server
            .mock("GET", "/drive/v3/files/abc123")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .with_status(200)
            .with_body("streamed bytes")
            .create_async()
            .await;

        let result = client(&server)
            .get(
                "abc123",
                GetOptions::media().with_response_type(ResponseType::Stream),
            )
            .await;

        let Some(Retrieved::Stream(stream)) = result else {
            panic!("expected a stream");
        };
        let chunks: Vec<Bytes> = stream.map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks.concat(), b"streamed bytes");
    }

    #[tokio::test]
    async fn test_cancelled_get_resolves_to_none() {
        let mut server = Server::new_async().await;
        let get = server
            .mock("GET", "/drive/v3/files/abc123")
            .expect(0)
            .create_async()
            .await;

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client(&server)
            .get_cancellable("abc123", GetOptions::new(), &cancel)
            .await;

        assert!(result.is_none());
        get.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_object_id_makes_no_request() {
        let mut server = Server::new_async().await;
        mock_token(&mut server).await;
        let any_get = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = client(&server);
        assert!(client.get("x?alt=media&", GetOptions::new()).await.is_none());
        assert!(client.get("a/b", GetOptions::new()).await.is_none());

        any_get.assert_async().await;
    }
}

mod construction {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_from_key_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let creds_json = json!({
            "client_email": "test@project.iam.gserviceaccount.com",
            "private_key": TEST_KEY
        });
        temp_file
            .write_all(creds_json.to_string().as_bytes())
            .unwrap();

        assert!(DriveClient::new(temp_file.path()).is_ok());
    }

    #[test]
    fn test_invalid_key_files() {
        let mut empty = NamedTempFile::new().unwrap();
        empty.write_all(b"{}").unwrap();
        let mut garbage = NamedTempFile::new().unwrap();
        garbage.write_all(b"not valid json").unwrap();

        for path in [empty.path(), garbage.path()] {
            assert!(matches!(
                DriveClient::new(path),
                Err(DriveError::InvalidCredential(_))
            ));
        }
        assert!(matches!(
            DriveClient::new("/nonexistent/path/credentials.json"),
            Err(DriveError::InvalidCredential(_))
        ));
    }

    #[test]
    fn test_invalid_inline_values() {
        for value in [json!(null), json!({}), json!(true), json!("")] {
            assert!(matches!(
                DriveClient::new(value),
                Err(DriveError::InvalidCredential(_))
            ));
        }
    }

    #[test]
    fn test_error_display() {
        let err = DriveError::ApiError {
            status: 404,
            message: "File not found".to_string(),
        };
        let display = format!("{}", err);
        assert!(display.contains("404"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_json_error_conversion() {
        let err: DriveError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, DriveError::JsonError(_)));
        assert!(format!("{}", err).contains("JSON"));
    }
}
