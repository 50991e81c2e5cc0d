//! 用户管理 API 集成测试

use axum::http::StatusCode;
use serde_json::json;
use user_service::repository::refresh_token_repo;

mod common;
use common::{
    create_test_app, create_test_config, create_test_user, get_request, json_request, login,
    send, setup_test_db, unique_email, unreachable_pool, TEST_PASSWORD,
};

#[tokio::test]
async fn test_create_user() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let app = create_test_app(pool);

    let email = unique_email("Signup");
    let (status, json) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users",
            None,
            json!({ "email": email, "password": TEST_PASSWORD, "full_name": "Jane Doe" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["email"], email.to_lowercase());
    assert_eq!(json["full_name"], "Jane Doe");
    assert_eq!(json["is_active"], true);
    assert_eq!(json["is_superuser"], false);
    assert!(json["id"].is_string());
    assert!(json.get("password_hash").is_none());
    assert!(json.get("password").is_none());
}

#[tokio::test]
async fn test_create_user_duplicate_email() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let email = unique_email("dup");
    create_test_user(&pool, &email, TEST_PASSWORD).await;
    let app = create_test_app(pool);

    // 大小写不同的同一邮箱也视为重复
    let (status, json) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users",
            None,
            json!({ "email": email.to_uppercase(), "password": TEST_PASSWORD }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["message"], "Email already registered");
}

#[tokio::test]
async fn test_create_user_concurrent_duplicates() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;
    let app = create_test_app(pool);

    let email = unique_email("concurrent");
    let body = json!({ "email": email, "password": TEST_PASSWORD });

    let (first, second) = futures::join!(
        send(&app, json_request("POST", "/api/v1/users", None, body.clone())),
        send(&app, json_request("POST", "/api/v1/users", None, body.clone())),
    );

    let mut statuses = vec![first.0.as_u16(), second.0.as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![201, 409]);
}

#[tokio::test]
async fn test_create_user_password_window() {
    let app = create_test_app(unreachable_pool());

    let too_long = "x".repeat(73);
    for password in ["short", too_long.as_str()] {
        let (status, json) = send(
            &app,
            json_request(
                "POST",
                "/api/v1/users",
                None,
                json!({ "email": "window@example.com", "password": password }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["error"]["code"], 422);
    }
}

#[tokio::test]
async fn test_create_user_invalid_email() {
    let app = create_test_app(unreachable_pool());

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/users",
            None,
            json!({ "email": "not-an-email", "password": TEST_PASSWORD }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_get_current_user() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let email = unique_email("me");
    let user = create_test_user(&pool, &email, TEST_PASSWORD).await;
    let app = create_test_app(pool);

    let tokens = login(&app, &email, TEST_PASSWORD).await;
    let access = tokens["access_token"].as_str().unwrap();

    let (status, json) = send(&app, get_request("/api/v1/users/me", Some(access))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], user.id.to_string());
    assert_eq!(json["email"], email);
}

#[tokio::test]
async fn test_get_user_by_id() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let email = unique_email("reader");
    create_test_user(&pool, &email, TEST_PASSWORD).await;
    let other = create_test_user(&pool, &unique_email("target"), TEST_PASSWORD).await;
    let app = create_test_app(pool);

    let tokens = login(&app, &email, TEST_PASSWORD).await;
    let access = tokens["access_token"].as_str().unwrap();

    let (status, json) = send(
        &app,
        get_request(&format!("/api/v1/users/{}", other.id), Some(access)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], other.id.to_string());

    let (status, _) = send(
        &app,
        get_request(&format!("/api/v1/users/{}", uuid::Uuid::new_v4()), Some(access)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get_request("/api/v1/users/not-a-uuid", Some(access))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_list_users_pagination() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let email = unique_email("lister");
    create_test_user(&pool, &email, TEST_PASSWORD).await;
    for i in 0..3 {
        create_test_user(&pool, &unique_email(&format!("page{i}")), TEST_PASSWORD).await;
    }
    let app = create_test_app(pool);

    let tokens = login(&app, &email, TEST_PASSWORD).await;
    let access = tokens["access_token"].as_str().unwrap();

    let (status, json) = send(&app, get_request("/api/v1/users?page=2&limit=2", Some(access))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["limit"], 2);
    assert_eq!(json["offset"], 2);
    assert!(json["total"].as_i64().unwrap() >= 4);
    assert!(json["items"].as_array().unwrap().len() <= 2);

    let (status, json) = send(&app, get_request("/api/v1/users", Some(access))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["limit"], 20);
    assert_eq!(json["offset"], 0);

    for query in ["limit=0", "limit=101", "page=0", "limit=abc"] {
        let (status, _) = send(
            &app,
            get_request(&format!("/api/v1/users?{query}"), Some(access)),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{query}");
    }
}

#[tokio::test]
async fn test_update_user() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let email = unique_email("updater");
    let user = create_test_user(&pool, &email, TEST_PASSWORD).await;
    let app = create_test_app(pool);

    let tokens = login(&app, &email, TEST_PASSWORD).await;
    let access = tokens["access_token"].as_str().unwrap();
    let uri = format!("/api/v1/users/{}", user.id);

    let (status, json) = send(
        &app,
        json_request("PATCH", &uri, Some(access), json!({ "full_name": "Renamed" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["full_name"], "Renamed");
    // 未提供的字段保持不变
    assert_eq!(json["email"], email);
    assert_eq!(json["is_active"], true);

    let updated_at: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(json["updated_at"].clone()).unwrap();
    assert!(updated_at >= user.updated_at);
}

#[tokio::test]
async fn test_update_user_email_conflict() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let email = unique_email("owner");
    let user = create_test_user(&pool, &email, TEST_PASSWORD).await;
    let taken = unique_email("taken");
    create_test_user(&pool, &taken, TEST_PASSWORD).await;
    let app = create_test_app(pool);

    let tokens = login(&app, &email, TEST_PASSWORD).await;
    let access = tokens["access_token"].as_str().unwrap();
    let uri = format!("/api/v1/users/{}", user.id);

    let (status, _) = send(
        &app,
        json_request("PATCH", &uri, Some(access), json!({ "email": taken })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // 改回自己当前的邮箱不算冲突
    let (status, _) = send(
        &app,
        json_request("PATCH", &uri, Some(access), json!({ "email": email })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_update_missing_user() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let email = unique_email("caller");
    create_test_user(&pool, &email, TEST_PASSWORD).await;
    let taken = unique_email("claimed");
    create_test_user(&pool, &taken, TEST_PASSWORD).await;
    let app = create_test_app(pool);

    let tokens = login(&app, &email, TEST_PASSWORD).await;
    let access = tokens["access_token"].as_str().unwrap();
    let uri = format!("/api/v1/users/{}", uuid::Uuid::new_v4());

    // 目标不存在时优先返回 404，即使邮箱已被占用
    let (status, json) = send(
        &app,
        json_request("PATCH", &uri, Some(access), json!({ "email": taken })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["message"], "User not found");

    let (status, _) = send(
        &app,
        json_request("PATCH", &uri, Some(access), json!({ "full_name": "Nobody" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_password_revokes_refresh_tokens() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let email = unique_email("pwchange");
    let user = create_test_user(&pool, &email, TEST_PASSWORD).await;
    let app = create_test_app(pool);

    let tokens = login(&app, &email, TEST_PASSWORD).await;
    let access = tokens["access_token"].as_str().unwrap();
    let refresh = tokens["refresh_token"].as_str().unwrap();

    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/v1/users/{}", user.id),
            Some(access),
            json!({ "password": "BrandNewPass456" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/v1/auth/refresh", None, json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    login(&app, &email, "BrandNewPass456").await;
}

#[tokio::test]
async fn test_update_password_too_short() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let email = unique_email("shortpw");
    let user = create_test_user(&pool, &email, TEST_PASSWORD).await;
    let app = create_test_app(pool);

    let tokens = login(&app, &email, TEST_PASSWORD).await;
    let access = tokens["access_token"].as_str().unwrap();

    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/v1/users/{}", user.id),
            Some(access),
            json!({ "password": "short" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_deactivated_user_loses_access() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let email = unique_email("deactivate");
    let user = create_test_user(&pool, &email, TEST_PASSWORD).await;
    let app = create_test_app(pool);

    let tokens = login(&app, &email, TEST_PASSWORD).await;
    let access = tokens["access_token"].as_str().unwrap();
    let refresh = tokens["refresh_token"].as_str().unwrap();

    let (status, json) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/api/v1/users/{}", user.id),
            Some(access),
            json!({ "is_active": false }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_active"], false);

    // 访问令牌仍在有效期内，但账户已停用
    let (status, json) = send(&app, get_request("/api/v1/users/me", Some(access))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["message"], "Inactive user");

    let (status, _) = send(
        &app,
        json_request("POST", "/api/v1/auth/refresh", None, json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_delete_user_cascades_refresh_tokens() {
    let config = create_test_config();
    let pool = setup_test_db(&config).await;

    let admin_email = unique_email("admin");
    create_test_user(&pool, &admin_email, TEST_PASSWORD).await;
    let victim_email = unique_email("victim");
    let victim = create_test_user(&pool, &victim_email, TEST_PASSWORD).await;
    let app = create_test_app(pool.clone());

    login(&app, &victim_email, TEST_PASSWORD).await;
    login(&app, &victim_email, TEST_PASSWORD).await;

    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(
        refresh_token_repo::count_for_user(&mut conn, victim.id).await.unwrap(),
        2
    );

    let tokens = login(&app, &admin_email, TEST_PASSWORD).await;
    let access = tokens["access_token"].as_str().unwrap();
    let uri = format!("/api/v1/users/{}", victim.id);

    let delete = axum::http::Request::builder()
        .method("DELETE")
        .uri(&uri)
        .header("authorization", format!("Bearer {}", access))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, json) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(json.is_null());

    assert_eq!(
        refresh_token_repo::count_for_user(&mut conn, victim.id).await.unwrap(),
        0
    );

    let (status, _) = send(&app, get_request(&uri, Some(access))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let delete_again = axum::http::Request::builder()
        .method("DELETE")
        .uri(&uri)
        .header("authorization", format!("Bearer {}", access))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete_again).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
