//! GitHub change sources against a fake REST API.

mod support;

use rag_sync::changes::ChangeSource;
use rag_sync::changes_github::{
    GithubClient, GithubCommitSource, GithubPullRequestSource, PER_PAGE,
};
use rag_sync::error::SyncError;
use support::{modified, renamed, FakeGithub};

fn client(port: u16, token: &str) -> GithubClient {
    GithubClient::new(&format!("http://127.0.0.1:{}", port), "acme", "app", token).unwrap()
}

fn names(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}/f{}.go", prefix, i)).collect()
}

#[test]
fn test_commit_files_preserve_order() {
    let files = vec![
        "b.go".to_string(),
        "docs/readme.md".to_string(),
        "a.go".to_string(),
        "b.go".to_string(),
    ];
    let port = FakeGithub::start("tok", files.clone(), Vec::new());

    let source = GithubCommitSource::new(client(port, "tok"), "abc123".to_string());
    assert_eq!(source.name(), "github-commit");
    assert_eq!(source.changed_files().unwrap(), files);
}

#[test]
fn test_commit_files_follow_pages() {
    let files = names("src", PER_PAGE + 50);
    let port = FakeGithub::start("tok", files.clone(), Vec::new());

    let listed = client(port, "tok").commit_files("abc123").unwrap();
    assert_eq!(listed.len(), PER_PAGE + 50);
    assert_eq!(listed, files);
}

#[test]
fn test_exact_page_boundary() {
    let files = names("src", PER_PAGE);
    let port = FakeGithub::start("tok", files.clone(), Vec::new());

    let listed = client(port, "tok").commit_files("abc123").unwrap();
    assert_eq!(listed, files);
}

#[test]
fn test_empty_filenames_are_dropped() {
    let files = vec!["a.go".to_string(), String::new(), "b.go".to_string()];
    let port = FakeGithub::start("tok", files, Vec::new());

    let listed = client(port, "tok").commit_files("abc123").unwrap();
    assert_eq!(listed, vec!["a.go".to_string(), "b.go".to_string()]);
}

#[test]
fn test_pull_request_files() {
    let pulls = names("pkg", 3);
    let port = FakeGithub::start("tok", Vec::new(), pulls.clone());

    let source = GithubPullRequestSource::new(client(port, "tok"), 42);
    assert_eq!(source.name(), "github-pr");
    assert_eq!(source.changed_files().unwrap(), pulls);
}

#[test]
fn test_bad_token_is_remote_status() {
    let port = FakeGithub::start("tok", vec!["a.go".to_string()], Vec::new());

    let err = client(port, "wrong").commit_files("abc123").unwrap_err();
    match err {
        SyncError::RemoteStatus { context, status } => {
            assert_eq!(context, "failed to get commit files");
            assert!(status.starts_with("401"));
        }
        other => panic!("expected RemoteStatus, got {:?}", other),
    }
}

#[test]
fn test_unknown_repository_fails_closed() {
    let port = FakeGithub::start("tok", vec!["a.go".to_string()], Vec::new());
    let other = GithubClient::new(&format!("http://127.0.0.1:{}", port), "acme", "other", "tok")
        .unwrap();

    let source = GithubPullRequestSource::new(other, 7);
    assert!(matches!(
        source.changed_files(),
        Err(SyncError::RemoteStatus { .. })
    ));
}

#[test]
fn test_rename_lists_old_and_new_path() {
    let port = FakeGithub::start_entries(
        "tok",
        vec![renamed("pkg/old.go", "pkg/new.go"), modified("a.go")],
        vec![renamed("old.go", "new.go")],
    );
    let client = client(port, "tok");

    assert_eq!(
        client.commit_files("abc123").unwrap(),
        vec![
            "pkg/new.go".to_string(),
            "pkg/old.go".to_string(),
            "a.go".to_string()
        ]
    );
    assert_eq!(
        client.pull_request_files(9).unwrap(),
        vec!["new.go".to_string(), "old.go".to_string()]
    );
}
