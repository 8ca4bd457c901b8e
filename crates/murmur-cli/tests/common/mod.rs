use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;
use url::Url;

pub const PASSWORD: &str = "test-password";

/// A scratch file store plus a separate home directory per user.
pub struct Sandbox {
    dir: TempDir,
    pub store_url: String,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = dir.path().join("store");
        std::fs::create_dir_all(&store).unwrap();
        let store_url = Url::from_directory_path(&store)
            .expect("Failed to convert path to file URL")
            .to_string();
        Self { dir, store_url }
    }

    pub fn home(&self, user: &str) -> PathBuf {
        let home = self.dir.path().join("home").join(user);
        std::fs::create_dir_all(&home).unwrap();
        home
    }

    /// Run the CLI as `user`, with session and config kept under their home.
    pub fn run(&self, user: &str, args: &[&str]) -> Output {
        run_cli_with_env(args, &self.home(user), &self.store_url)
    }

    /// Run the CLI as `user` and expect success.
    pub fn run_success(&self, user: &str, args: &[&str]) -> String {
        let output = self.run(user, args);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("CLI command failed: {:?}\nstderr: {}", args, stderr);
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    /// Create an account for `user`, log in, and return their actor id.
    pub fn sign_up(&self, user: &str) -> String {
        self.run_success(user, &["create-account", "--password", PASSWORD, user]);
        self.run_success(user, &["login", "--identity", user, "--password", PASSWORD]);
        let whoami = self.run_success(user, &["whoami"]);
        field(&whoami, "Actor").expect("whoami prints the actor")
    }
}

/// Run the CLI binary with an isolated HOME.
pub fn run_cli_with_env(args: &[&str], home: &Path, store_url: &str) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_murmur"));
    cmd.args(args);
    cmd.env("HOME", home);
    cmd.env("XDG_DATA_HOME", home.join("data"));
    cmd.env("XDG_CONFIG_HOME", home.join("config"));
    cmd.env("MURMUR_STORE", store_url);
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("RUST_LOG");
    cmd.output().expect("Failed to execute CLI")
}

/// Value of a `Label: value` line.
pub fn field(stdout: &str, label: &str) -> Option<String> {
    let prefix = format!("{}: ", label);
    stdout
        .lines()
        .find_map(|line| line.strip_prefix(&prefix))
        .map(|value| value.trim().to_string())
}

/// First line of stdout, where commands print the id they created.
pub fn first_line(stdout: &str) -> String {
    stdout.lines().next().unwrap_or_default().trim().to_string()
}
