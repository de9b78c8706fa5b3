mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

fn set_cookies(res: &reqwest::Response) -> Vec<String> {
    res.headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .collect()
}

#[tokio::test]
async fn login_sets_role_namespaced_cookies() -> Result<()> {
    let stack = common::spawn().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/login", stack.gateway_url))
        .json(&json!({
            "email": "admin@springfield.edu",
            "password": "ok",
            "role": "tenant-admin",
        }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let cookies = set_cookies(&res);

    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with("tn_accessToken=issued-token-123")),
        "missing token cookie: {:?}",
        cookies
    );
    assert!(
        cookies
            .iter()
            .any(|c| c.starts_with(&format!("tn_tenantId={}", common::TENANT_UUID))),
        "missing tenant cookie: {:?}",
        cookies
    );
    // Session cookies are HttpOnly
    assert!(cookies.iter().all(|c| c.contains("HttpOnly")));

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["role"], "tenant-admin");
    Ok(())
}

#[tokio::test]
async fn login_default_role_uses_generic_cookie() -> Result<()> {
    let stack = common::spawn().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/login", stack.gateway_url))
        .json(&json!({
            "email": "teacher@springfield.edu",
            "password": "ok",
            "role": "teacher",
        }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let cookies = set_cookies(&res);
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("accessToken=issued-token-123")));
    assert!(!cookies.iter().any(|c| c.starts_with("tn_accessToken=")));
    Ok(())
}

#[tokio::test]
async fn failed_login_relays_backend_status_and_body() -> Result<()> {
    let stack = common::spawn().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/login", stack.gateway_url))
        .json(&json!({
            "email": "admin@springfield.edu",
            "password": "wrong",
        }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    // No cookies are issued on failure
    assert!(set_cookies(&res).is_empty());

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["message"], "Invalid credentials");
    Ok(())
}

#[tokio::test]
async fn garbled_backend_login_reply_returns_500() -> Result<()> {
    let stack = common::spawn().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/login", stack.gateway_url))
        .json(&json!({
            "email": "admin@springfield.edu",
            "password": "garbled",
        }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    // No cookies are issued from a reply the gateway could not read
    assert!(set_cookies(&res).is_empty());

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");
    Ok(())
}

#[tokio::test]
async fn logout_clears_every_session_cookie() -> Result<()> {
    let stack = common::spawn().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/auth/logout", stack.gateway_url))
        .header(
            "cookie",
            format!("tn_accessToken=tok; tn_tenantId={}", common::TENANT_UUID),
        )
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let cookies = set_cookies(&res);

    // Removal cookies for at least the namespaced credential slots
    for name in ["tn_accessToken", "sa_accessToken", "accessToken"] {
        assert!(
            cookies.iter().any(|c| c.starts_with(&format!("{}=", name))),
            "no removal cookie for {}: {:?}",
            name,
            cookies
        );
    }
    Ok(())
}
