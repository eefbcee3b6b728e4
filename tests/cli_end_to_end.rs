use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;

fn claplog() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("claplog"));
    cmd.env_remove("CLAPLOG__BACKEND__URL")
        .env_remove("CLAPLOG_ADMIN_EMAIL")
        .env_remove("CLAPLOG_ADMIN_PASSWORD")
        .env("CLAPLOG__LOGGING__LEVEL", "error");
    cmd
}

#[test]
fn list_prints_the_demo_posts() {
    claplog()
        .args(["list", "--tag", "design"])
        .assert()
        .success()
        .stdout(contains("[#design]"));
}

#[test]
fn list_renders_html_on_request() {
    claplog()
        .args(["list", "--html"])
        .assert()
        .success()
        .stdout(contains("class=\"post-card\""));
}

#[test]
fn show_unknown_post_fails() {
    claplog()
        .args(["show", "does-not-exist"])
        .assert()
        .failure()
        .stderr(contains("This post no longer exists."));
}

#[test]
fn admin_without_credentials_is_rejected() {
    claplog()
        .args(["admin", "posts"])
        .assert()
        .failure()
        .stderr(contains("email and password are required"));
}

#[test]
fn admin_lists_posts_with_demo_account() {
    claplog()
        .args([
            "admin",
            "--email",
            "demo@claplog.local",
            "--password",
            "claplog",
            "posts",
        ])
        .assert()
        .success()
        .stdout(contains("Claps"));
}

#[test]
fn list_reads_from_a_remote_backend() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/rest/v1/posts")
            .query_param("order", "created_at.desc")
            .header("apikey", "anon");
        then.status(200)
            .header("content-type", "application/json")
            .body(
                r#"[{"id":1,"title":"Remote post","content":"<p>hi</p>","tags":["net"],"created_at":"2024-05-01T00:00:00Z","updated_at":"2024-05-01T00:00:00Z","claps":3}]"#,
            );
    });

    claplog()
        .args(["list", "--backend-url", &server.base_url(), "--anon-key", "anon"])
        .assert()
        .success()
        .stdout(contains("Remote post"));
    mock.assert();
}

#[test]
fn browse_toggles_tags_from_stdin() {
    claplog()
        .arg("browse")
        .write_stdin("#design\n:q\n")
        .assert()
        .success()
        .stdout(contains("[#design]"));
}

#[test]
fn browse_applies_pending_search_when_input_closes() {
    let output = claplog()
        .arg("browse")
        .write_stdin("debouncing\n")
        .output()
        .expect("browse runs");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf-8 output");
    // Initial render plus the settled search.
    assert_eq!(stdout.matches("Debouncing search input").count(), 2);
    assert_eq!(stdout.matches("Animating a filtered grid").count(), 1);
}

#[test]
fn admin_provider_sign_in_prints_the_authorize_url() {
    claplog()
        .args(["admin", "--provider", "github", "posts"])
        .assert()
        .success()
        .stdout(contains("provider=github"));
}

#[test]
fn admin_redirect_fragment_opens_the_dashboard() {
    claplog()
        .args([
            "admin",
            "--redirect-fragment",
            "#email=octo%40example.com",
            "posts",
        ])
        .assert()
        .success()
        .stdout(contains("Claps"));
}
