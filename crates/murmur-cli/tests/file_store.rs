//! CLI integration tests against the file-backed store.

mod common;

use common::{PASSWORD, Sandbox, field, first_line};

#[test]
fn create_account_and_login() {
    let sandbox = Sandbox::new();

    let created = sandbox.run_success("ada", &["create-account", "--password", PASSWORD, "--name", "Ada", "ada"]);
    assert_eq!(field(&created, "Username").as_deref(), Some("ada"));
    assert!(created.contains("Account created successfully"));

    let login = sandbox.run_success("ada", &["login", "--identity", "ada", "--password", PASSWORD]);
    assert!(login.contains("Logged in successfully"));
    assert!(field(&login, "Actor").is_some());
}

#[test]
fn login_with_unknown_account_fails() {
    let sandbox = Sandbox::new();

    let output = sandbox.run("ada", &["login", "--identity", "nobody", "--password", "ignored"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("invalid credentials"),
        "Expected 'invalid credentials' error, got: {}",
        stderr
    );
}

#[test]
fn commands_require_a_session() {
    let sandbox = Sandbox::new();
    sandbox.sign_up("ada");

    sandbox.run_success("ada", &["logout"]);

    let output = sandbox.run("ada", &["feed"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No active session"));
}

#[cfg(unix)]
#[test]
fn session_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let sandbox = Sandbox::new();
    sandbox.sign_up("ada");

    let path = sandbox.home("ada").join("data").join("murmur").join("session.json");
    let mode = std::fs::metadata(path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn post_shows_up_in_feed() {
    let sandbox = Sandbox::new();
    let ada = sandbox.sign_up("ada");

    let id = first_line(&sandbox.run_success("ada", &["post", "hello world"]));
    assert!(!id.is_empty());

    let feed = sandbox.run_success("ada", &["feed", "--json"]);
    let posts: Vec<serde_json::Value> = feed
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["id"], id.as_str());
    assert_eq!(posts[0]["content"], "hello world");
    assert_eq!(posts[0]["user_id"], ada.as_str());
    assert_eq!(posts[0]["like_count"], 0);
}

#[test]
fn blank_post_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox.sign_up("ada");

    let output = sandbox.run("ada", &["post", "   "]);
    assert!(!output.status.success());
}

#[test]
fn feed_pages_and_filters_by_user() {
    let sandbox = Sandbox::new();
    let ada = sandbox.sign_up("ada");
    sandbox.sign_up("bob");

    for i in 0..12 {
        sandbox.run_success("ada", &["post", &format!("post {}", i)]);
    }
    sandbox.run_success("bob", &["post", "from bob"]);

    let first = sandbox.run("ada", &["feed", "--json"]);
    assert_eq!(String::from_utf8_lossy(&first.stdout).lines().count(), 10);
    assert!(String::from_utf8_lossy(&first.stderr).contains("More posts available"));

    let all = sandbox.run_success("ada", &["feed", "--json", "--pages", "2"]);
    assert_eq!(all.lines().count(), 13);
    assert!(all.lines().next().unwrap().contains("from bob"));

    let mine = sandbox.run_success("bob", &["feed", "--json", "--pages", "3", "--user", &ada]);
    assert_eq!(mine.lines().count(), 12);
    assert!(!mine.contains("from bob"));
}

#[test]
fn like_toggles_and_notifies_author() {
    let sandbox = Sandbox::new();
    sandbox.sign_up("ada");
    sandbox.sign_up("bob");

    let post = first_line(&sandbox.run_success("ada", &["post", "like me"]));

    let liked = sandbox.run_success("bob", &["like", &post]);
    assert!(liked.contains("Liked (1 likes)"), "got: {}", liked);

    let feed = sandbox.run_success("bob", &["feed", "--json"]);
    let card: serde_json::Value = serde_json::from_str(feed.lines().next().unwrap()).unwrap();
    assert_eq!(card["like_count"], 1);
    assert_eq!(card["liked_by_actor"], true);

    let unliked = sandbox.run_success("bob", &["like", &post]);
    assert!(unliked.contains("Unliked (0 likes)"), "got: {}", unliked);

    let inbox = sandbox.run_success("ada", &["notifications"]);
    assert!(inbox.contains("liked your post"), "got: {}", inbox);
    assert_eq!(field(&inbox, "Unread").as_deref(), Some("1"));
}

#[test]
fn follow_shows_on_profile_and_in_notifications() {
    let sandbox = Sandbox::new();
    let ada = sandbox.sign_up("ada");
    sandbox.sign_up("bob");

    let followed = sandbox.run_success("bob", &["follow", &ada]);
    assert!(followed.contains("Following"), "got: {}", followed);
    assert!(followed.contains("(1 followers)"));

    let profile = sandbox.run_success("bob", &["profile", &ada]);
    assert_eq!(field(&profile, "Followers").as_deref(), Some("1"));
    assert_eq!(field(&profile, "You follow").as_deref(), Some("yes"));

    let own = sandbox.run_success("ada", &["profile"]);
    assert_eq!(field(&own, "Followers").as_deref(), Some("1"));
    assert_eq!(field(&own, "You follow"), None);

    let output = sandbox.run("ada", &["follow", &ada]);
    assert!(!output.status.success());

    let inbox = sandbox.run_success("ada", &["notifications", "--mark-all-read"]);
    assert!(inbox.contains("started following you"), "got: {}", inbox);
    assert!(inbox.contains("Marked 1 as read"));

    let after = sandbox.run_success("ada", &["notifications"]);
    assert_eq!(field(&after, "Unread").as_deref(), Some("0"));
}

#[test]
fn comments_are_listed_oldest_first() {
    let sandbox = Sandbox::new();
    sandbox.sign_up("ada");
    sandbox.sign_up("bob");

    let post = first_line(&sandbox.run_success("ada", &["post", "discuss"]));

    let added = sandbox.run("bob", &["comment", &post, "first!"]);
    assert!(added.status.success());
    assert!(String::from_utf8_lossy(&added.stderr).contains("Comment added"));
    sandbox.run_success("ada", &["comment", &post, "thanks"]);

    let thread = sandbox.run_success("ada", &["comments", &post]);
    let first = thread.find("first!").unwrap();
    let second = thread.find("thanks").unwrap();
    assert!(first < second);

    let blank = sandbox.run("bob", &["comment", &post, "  "]);
    assert!(!blank.status.success());

    let inbox = sandbox.run_success("ada", &["notifications"]);
    assert!(inbox.contains("commented on your post"));
    assert_eq!(field(&inbox, "Unread").as_deref(), Some("1"));
}

#[test]
fn delete_post_removes_it() {
    let sandbox = Sandbox::new();
    sandbox.sign_up("ada");
    sandbox.sign_up("bob");

    let post = first_line(&sandbox.run_success("ada", &["post", "short lived"]));

    let output = sandbox.run("bob", &["delete-post", &post]);
    assert!(!output.status.success());

    let deleted = sandbox.run_success("ada", &["delete-post", &post]);
    assert!(deleted.contains("Post deleted"));

    let feed = sandbox.run("ada", &["feed"]);
    assert!(feed.status.success());
    assert!(String::from_utf8_lossy(&feed.stderr).contains("No posts yet."));
}

#[test]
fn edit_profile_changes_name_and_bio() {
    let sandbox = Sandbox::new();
    sandbox.sign_up("ada");

    let edited = sandbox.run_success("ada", &["edit-profile", "--name", "Ada L.", "--bio", "Writes engines"]);
    assert!(edited.contains("Profile updated"));

    let profile = sandbox.run_success("ada", &["profile"]);
    assert_eq!(field(&profile, "Name").as_deref(), Some("Ada L."));
    assert_eq!(field(&profile, "Bio").as_deref(), Some("Writes engines"));

    sandbox.run_success("ada", &["edit-profile", "--bio", ""]);
    let profile = sandbox.run_success("ada", &["profile"]);
    assert_eq!(field(&profile, "Bio"), None);

    let output = sandbox.run("ada", &["edit-profile"]);
    assert!(!output.status.success());
}
