use predicates::prelude::*;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod fixtures;

use fixtures::parlor;

async fn mount_chat_list(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/chats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            ["11", "Rust lifetimes explained"],
            ["12", "A very long title that definitely exceeds the display limit"],
            ["13", "Dinner ideas"]
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_chats_list_truncates_long_titles() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    mount_chat_list(&mock_server).await;

    parlor(home.path())
        .env("PARLOR_BASE_URL", mock_server.uri())
        .args(["chats", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("11  Rust lifetimes explained\n"))
        .stdout(predicate::str::contains(
            "12  A very long title that definitely exceed...\n",
        ))
        .stdout(predicate::str::contains("13  Dinner ideas\n"));
}

#[tokio::test]
async fn test_chats_list_empty() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path("/chats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    parlor(home.path())
        .env("PARLOR_BASE_URL", mock_server.uri())
        .args(["chats", "list"])
        .assert()
        .success()
        .stdout("No chats found.\n");
}

#[tokio::test]
async fn test_chats_search_is_case_insensitive() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    mount_chat_list(&mock_server).await;

    parlor(home.path())
        .env("PARLOR_BASE_URL", mock_server.uri())
        .args(["chats", "search", "RUST"])
        .assert()
        .success()
        .stdout("11  Rust lifetimes explained\n");

    parlor(home.path())
        .env("PARLOR_BASE_URL", mock_server.uri())
        .args(["chats", "search", "python"])
        .assert()
        .success()
        .stdout("No chats match 'python'.\n");
}

#[tokio::test]
async fn test_chats_show_renders_assistant_messages() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path("/history/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            ["user", "what is 'static?"],
            ["assistant", "A **lifetime** for `<T>`."]
        ])))
        .mount(&mock_server)
        .await;

    parlor(home.path())
        .env("PARLOR_BASE_URL", mock_server.uri())
        .args(["chats", "show", "11"])
        .assert()
        .success()
        .stdout(
            "[user]\nwhat is 'static?\n\n[assistant]\n<p>A <strong>lifetime</strong> for <code>&lt;T&gt;</code>.</p>\n",
        );

    parlor(home.path())
        .env("PARLOR_BASE_URL", mock_server.uri())
        .args(["chats", "show", "11", "--raw"])
        .assert()
        .success()
        .stdout(predicate::str::contains("A **lifetime** for `<T>`."));
}

#[tokio::test]
async fn test_chats_show_unknown_chat() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path("/history/missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    parlor(home.path())
        .env("PARLOR_BASE_URL", mock_server.uri())
        .args(["chats", "show", "missing"])
        .assert()
        .success()
        .stdout("Chat 'missing' is empty or not found.\n");
}

#[tokio::test]
async fn test_chats_delete() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    Mock::given(method("DELETE"))
        .and(path("/delete/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    parlor(home.path())
        .env("PARLOR_BASE_URL", mock_server.uri())
        .args(["chats", "delete", "11"])
        .assert()
        .success()
        .stdout("Deleted chat 11\n");
}

#[tokio::test]
async fn test_chats_clear_requires_confirmation() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    mount_chat_list(&mock_server).await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    parlor(home.path())
        .env("PARLOR_BASE_URL", mock_server.uri())
        .args(["chats", "clear"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
}

#[tokio::test]
async fn test_chats_clear_deletes_every_chat() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    mount_chat_list(&mock_server).await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
        .expect(3)
        .mount(&mock_server)
        .await;

    parlor(home.path())
        .env("PARLOR_BASE_URL", mock_server.uri())
        .args(["chats", "clear", "--yes"])
        .assert()
        .success()
        .stdout("Deleted 3 of 3 chats.\n");
}

#[tokio::test]
async fn test_chats_list_unauthorized() {
    let mock_server = MockServer::start().await;
    let home = tempdir().unwrap();
    Mock::given(method("GET"))
        .and(path("/chats"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({"error": "Unauthorized"})))
        .mount(&mock_server)
        .await;

    parlor(home.path())
        .env("PARLOR_BASE_URL", mock_server.uri())
        .args(["chats", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("list chats: HTTP 401: Unauthorized"));
}
