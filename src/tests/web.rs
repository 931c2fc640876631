use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;

use crate::items::{ItemDraft, ItemStore, ItemType};
use crate::tests::app::create_service;
use crate::web;

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn create_then_list_roundtrip() {
    let (service, _tmp) = create_service();
    let router = web::router(service);

    let resp = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/items",
            r#"{"title":"A note","content":"hello world","type":"note","tags":["t1"]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["message"], "Item saved successfully");
    assert_eq!(body["item"]["type"], "note");
    assert!(body["item"]["id"].is_string());

    let resp = router
        .clone()
        .oneshot(get("/api/items?q=hello"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let resp = router
        .clone()
        .oneshot(get("/api/items?type=todo"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_type_filter_matches_nothing() {
    let (service, _tmp) = create_service();
    service
        .create(ItemDraft {
            content: Some("short".into()),
            item_type: Some(ItemType::Note),
            ..Default::default()
        })
        .unwrap();
    let router = web::router(service);

    let resp = router
        .oneshot(get("/api/items?type=banana"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blank_search_query_is_rejected() {
    let (service, _tmp) = create_service();
    let router = web::router(service);

    let resp = router
        .clone()
        .oneshot(get("/api/items/search"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = router
        .clone()
        .oneshot(get("/api/items/search?query=%20%20"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = router
        .oneshot(get("/api/items/semantic-search"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn nl_search_reports_parsed_params() {
    let (service, _tmp) = create_service();
    service
        .create(ItemDraft {
            title: Some("Rust ownership guide".into()),
            item_type: Some(ItemType::Article),
            ..Default::default()
        })
        .unwrap();
    let router = web::router(service);

    let resp = router
        .oneshot(get("/api/items/search?query=show%20me%20the%20rust%20guide"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["query"], "show me the rust guide");
    assert_eq!(body["count"], 1);
    assert!(body["parsedParams"]["keywords"]
        .as_array()
        .unwrap()
        .iter()
        .any(|kw| kw == "rust"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn semantic_search_annotates_similarity() {
    let (service, _tmp) = create_service();

    let near = service
        .create(ItemDraft {
            content: Some("near".into()),
            item_type: Some(ItemType::Note),
            ..Default::default()
        })
        .unwrap();
    let far = service
        .create(ItemDraft {
            content: Some("far".into()),
            item_type: Some(ItemType::Note),
            ..Default::default()
        })
        .unwrap();

    service
        .store
        .attach_embedding(&near.id, vec![0.9, 0.436])
        .unwrap();
    service
        .store
        .attach_embedding(&far.id, vec![0.1, 0.995])
        .unwrap();

    let router = web::router(service);
    let resp = router
        .oneshot(get("/api/items/semantic-search?query=anything&limit=1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["totalItemsSearched"], 2);

    let hit = &body["items"][0];
    assert_eq!(hit["id"], near.id.to_string());
    assert_eq!(hit["type"], "note");
    assert!(hit["similarity"].as_f64().unwrap() > 0.8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn update_and_delete_unknown_ids_answer_404() {
    let (service, _tmp) = create_service();
    let router = web::router(service);

    let resp = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/items/01J00000000000000000000000",
            r#"{"title":"nope"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = router
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/items/01J00000000000000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn update_changes_the_item() {
    let (service, _tmp) = create_service();
    let item = service
        .create(ItemDraft {
            title: Some("before".into()),
            item_type: Some(ItemType::Note),
            ..Default::default()
        })
        .unwrap();
    let router = web::router(service);

    let resp = router
        .oneshot(json_request(
            "PUT",
            &format!("/api/items/{}", item.id),
            r#"{"title":"after"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["item"]["title"], "after");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn upload_without_file_is_rejected() {
    let (service, _tmp) = create_service();
    let router = web::router(service);

    let resp = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/items/upload")
                .header(
                    "content-type",
                    "multipart/form-data; boundary=----boundary",
                )
                .body(Body::from("------boundary--\r\n"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn upload_stores_the_image_field() {
    let (service, _tmp) = create_service();
    let router = web::router(service);

    let png: Vec<u8> = [0x89u8, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
        .into_iter()
        .chain([0u8; 16])
        .collect();

    let mut body = Vec::new();
    body.extend_from_slice(b"------boundary\r\n");
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"image\"; filename=\"shot.png\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(&png);
    body.extend_from_slice(b"\r\n------boundary--\r\n");

    let resp = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/items/upload")
                .header(
                    "content-type",
                    "multipart/form-data; boundary=----boundary",
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["message"], "File uploaded successfully");
    assert!(body["imageUrl"].as_str().unwrap().starts_with("/uploads/"));
    assert!(body["filename"].as_str().unwrap().ends_with(".png"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_endpoint_answers_ok() {
    let (service, _tmp) = create_service();
    let router = web::router(service);

    let resp = router.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
}
