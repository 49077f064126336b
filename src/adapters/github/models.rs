//! GitHub REST payloads and their mapping to candidate items.
//!
//! Only the fields the notifications use are deserialized.

use crate::domain::{Commit, Issue, Release};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct GhUser {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct GhCommit {
    pub sha: String,
    pub commit: GhCommitDetail,
    /// Linked GitHub account; null when the commit email matches no account.
    pub author: Option<GhUser>,
    pub html_url: String,
}

#[derive(Debug, Deserialize)]
pub struct GhCommitDetail {
    pub message: String,
    pub author: Option<GhGitAuthor>,
}

#[derive(Debug, Deserialize)]
pub struct GhGitAuthor {
    pub name: String,
}

impl GhCommit {
    pub fn into_item(self, repo: &str) -> Commit {
        let author = self
            .author
            .map(|u| u.login)
            .or_else(|| self.commit.author.map(|a| a.name))
            .unwrap_or_default();
        Commit {
            repo: repo.to_string(),
            sha: self.sha,
            author,
            message: self.commit.message,
            url: self.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GhIssue {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub user: Option<GhUser>,
    pub html_url: String,
}

impl GhIssue {
    pub fn into_item(self, repo: &str) -> Issue {
        Issue {
            repo: repo.to_string(),
            number: self.number,
            title: self.title,
            author: self.user.map(|u| u.login).unwrap_or_default(),
            state: self.state,
            url: self.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GhRelease {
    pub tag_name: String,
    pub name: Option<String>,
    pub author: Option<GhUser>,
    pub html_url: String,
}

impl GhRelease {
    pub fn into_item(self, repo: &str) -> Release {
        Release {
            repo: repo.to_string(),
            tag: self.tag_name,
            name: self.name.unwrap_or_default(),
            author: self.author.map(|u| u.login).unwrap_or_default(),
            url: self.html_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Observable;

    #[test]
    fn commit_without_linked_account_uses_git_author_name() {
        let json = r#"{
            "sha": "6dcb09b",
            "commit": {"message": "Fix all the bugs\n\nbody", "author": {"name": "Monalisa", "email": "m@x"}},
            "author": null,
            "html_url": "https://github.com/octocat/Hello-World/commit/6dcb09b"
        }"#;
        let commit: GhCommit = serde_json::from_str(json).unwrap();
        let item = commit.into_item("Hello");
        assert_eq!(item.author, "Monalisa");
        assert_eq!(item.fields()["message"], "Fix all the bugs");
    }

    #[test]
    fn issue_maps_state_and_user() {
        let json = r#"[{
            "number": 1347,
            "title": "Found a bug",
            "state": "open",
            "user": {"login": "octocat", "id": 1},
            "html_url": "https://github.com/octocat/Hello-World/issues/1347",
            "labels": []
        }]"#;
        let issues: Vec<GhIssue> = serde_json::from_str(json).unwrap();
        let item = issues.into_iter().next().unwrap().into_item("Hello");
        assert_eq!(item.identity(), "issue-1347");
        assert_eq!(item.fields()["state"], "open");
        assert_eq!(item.author, "octocat");
    }

    #[test]
    fn release_with_null_name_uses_tag_as_title() {
        let json = r#"{
            "tag_name": "v1.0.0",
            "name": null,
            "author": {"login": "octocat"},
            "html_url": "https://github.com/octocat/Hello-World/releases/v1.0.0",
            "draft": false
        }"#;
        let release: GhRelease = serde_json::from_str(json).unwrap();
        let item = release.into_item("Hello");
        assert_eq!(item.fields()["title"], "v1.0.0");
        assert_eq!(item.identity(), "release-v1.0.0");
    }
}
