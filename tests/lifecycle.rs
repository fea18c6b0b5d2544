use salvo_core::http::cookie::time::Duration;
use salvo_core::http::cookie::Cookie;
use salvo_core::{Request, Response};
use salvo_redb_session::{Config, KeyPair, RedbStore, SessionError, SessionStore};
use tempfile::TempDir;

fn store_at(dir: &TempDir, key_pairs: &[KeyPair]) -> RedbStore {
    let config = Config::new(dir.path().join("sessions.db"))
        .with_bucket_name("sessions")
        .with_max_age(3600);
    RedbStore::new(config, key_pairs).expect("store opens")
}

fn request_with(cookie: &Cookie<'static>) -> Request {
    let mut req = Request::new();
    req.cookies_mut().add(cookie.clone());
    req
}

#[tokio::test]
async fn test_login_then_logout() {
    let dir = TempDir::new().unwrap();
    let store = store_at(&dir, &[KeyPair::signed("hash-key")]);

    // First request: no cookie, new session.
    let mut req = Request::new();
    let mut res = Response::new();
    let (session, error) = store.get_session(&mut req, "app").await;
    assert!(error.is_none());
    assert!(session.is_new());
    session.set("uid", "42").unwrap();
    store.save(&mut res, &session).await.unwrap();

    let cookie = res.cookie("app").expect("session cookie set").clone();
    assert!(!cookie.value().is_empty());
    assert_eq!(cookie.path(), Some("/"));
    let id = session.id();

    // Second request carries the cookie.
    let mut req = request_with(&cookie);
    let (session, error) = store.get_session(&mut req, "app").await;
    assert!(error.is_none());
    assert!(!session.is_new());
    assert_eq!(session.id(), id);
    assert_eq!(session.get::<String>("uid"), Some("42".to_string()));

    // Logging out deletes the record and expires the cookie.
    session.set_max_age(-1);
    let mut res = Response::new();
    store.save(&mut res, &session).await.unwrap();
    assert_eq!(store.backend().get(&id).await.unwrap(), None);

    let expired = res.cookie("app").expect("expiry cookie set");
    assert_eq!(expired.value(), "");
    assert_eq!(expired.max_age(), Some(Duration::seconds(-1)));

    // The old cookie no longer yields data.
    let mut req = request_with(&cookie);
    let (session, _) = store.get_session(&mut req, "app").await;
    assert!(session.is_new());
    assert!(session.is_empty());
}

#[tokio::test]
async fn test_sessions_survive_restart() {
    let dir = TempDir::new().unwrap();

    let store = store_at(&dir, &[KeyPair::encrypted("hash-key", [3u8; 16])]);
    let mut res = Response::new();
    let (session, _) = store.new_session(&mut Request::new(), "app").await;
    session.set("cart", vec![1, 2, 3]).unwrap();
    store.save(&mut res, &session).await.unwrap();
    let cookie = res.cookie("app").unwrap().clone();
    store.close().unwrap();
    drop(store);

    let store = store_at(&dir, &[KeyPair::encrypted("hash-key", [3u8; 16])]);
    let mut req = request_with(&cookie);
    let (session, error) = store.new_session(&mut req, "app").await;
    assert!(error.is_none());
    assert_eq!(session.get::<Vec<i32>>("cart"), Some(vec![1, 2, 3]));
}

#[tokio::test]
async fn test_rotated_keys_still_read_old_cookies() {
    let dir = TempDir::new().unwrap();
    let old = KeyPair::signed("old-key");

    let store = store_at(&dir, &[old.clone()]);
    let mut res = Response::new();
    let (session, _) = store.new_session(&mut Request::new(), "app").await;
    session.set("uid", "7").unwrap();
    store.save(&mut res, &session).await.unwrap();
    let cookie = res.cookie("app").unwrap().clone();
    store.close().unwrap();
    drop(store);

    let store = store_at(&dir, &[KeyPair::signed("new-key"), old]);
    let mut req = request_with(&cookie);
    let (session, error) = store.get_session(&mut req, "app").await;
    assert!(error.is_none());
    assert_eq!(session.get::<String>("uid"), Some("7".to_string()));

    // Re-saving issues a cookie only the new key accepts.
    let mut res = Response::new();
    store.save(&mut res, &session).await.unwrap();
    let reissued = res.cookie("app").unwrap().clone();
    store.close().unwrap();
    drop(store);

    let store = store_at(&dir, &[KeyPair::signed("old-key")]);
    let mut req = request_with(&reissued);
    let (session, error) = store.get_session(&mut req, "app").await;
    assert!(matches!(error, Some(SessionError::CookieDecode(_))));
    assert!(session.is_new());
}

#[tokio::test]
async fn test_cookie_from_other_name_rejected() {
    let dir = TempDir::new().unwrap();
    let store = store_at(&dir, &[KeyPair::signed("hash-key")]);

    let mut res = Response::new();
    let (session, _) = store.new_session(&mut Request::new(), "admin").await;
    session.set("role", "admin").unwrap();
    store.save(&mut res, &session).await.unwrap();
    let token = res.cookie("admin").unwrap().value().to_string();

    let mut req = Request::new();
    req.cookies_mut().add(Cookie::new("app", token));
    let (session, error) = store.get_session(&mut req, "app").await;
    assert!(error.is_some());
    assert!(session.is_new());
}

#[tokio::test]
async fn test_identifiers_are_unique() {
    let dir = TempDir::new().unwrap();
    let store = store_at(&dir, &[KeyPair::signed("hash-key")]);

    let mut ids = std::collections::HashSet::new();
    for _ in 0..50 {
        let (session, _) = store.new_session(&mut Request::new(), "app").await;
        store.save(&mut Response::new(), &session).await.unwrap();
        let id = session.id();
        assert_eq!(id.len(), 52);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(ids.insert(id));
    }
}
