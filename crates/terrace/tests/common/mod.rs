use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const STACK: &str = r#"
name: test-stack
settings:
  concurrency: 2
  retry:
    max_attempts: 2
    initial_delay_ms: 1
resources:
  vpc:
    kind: network.vpc
    properties:
      cidr: 10.0.0.0/16
  role:
    kind: iam.role
    properties:
      policy: airflow
  airflow:
    kind: workflow.environment
    depends_on: [role]
    properties:
      vpc_id: "${vpc.id}"
"#;

pub struct TestProject {
    pub root: TempDir,
}

#[allow(dead_code)]
impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn with_stack() -> Self {
        let project = Self::new();
        project.write_declaration(STACK);
        project
    }

    pub fn write_declaration(&self, content: &str) {
        fs::write(self.declaration(), content).unwrap();
    }

    pub fn declaration(&self) -> PathBuf {
        self.root.path().join("terrace.yaml")
    }

    pub fn sandbox_dir(&self) -> PathBuf {
        self.root.path().join(".terrace").join("sandbox")
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.path().join(".terrace").join("state.json")
    }

    /// `terrace -f <declaration> <args>` with colours off
    #[allow(deprecated)]
    pub fn terrace(&self, args: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("terrace").unwrap();
        cmd.env_remove("TERRACE_CONFIG")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .arg("-f")
            .arg(self.declaration())
            .args(args);
        cmd
    }

    /// Make the sandbox fail the next calls of `op` on `kind`.
    pub fn inject_fault(&self, op: &str, kind: &str, fault: &str) {
        fs::create_dir_all(self.sandbox_dir()).unwrap();
        let plan = serde_json::json!({ format!("{}:{}", op, kind): [fault] });
        fs::write(self.sandbox_dir().join("faults.json"), plan.to_string()).unwrap();
    }

    /// Delete every sandbox object of `kind` behind terrace's back.
    pub fn remove_objects(&self, kind: &str) {
        let dir = self.sandbox_dir().join(kind);
        for entry in fs::read_dir(dir).unwrap() {
            fs::remove_file(entry.unwrap().path()).unwrap();
        }
    }

    pub fn state(&self) -> serde_json::Value {
        let content = fs::read_to_string(self.state_file()).unwrap();
        serde_json::from_str(&content).unwrap()
    }
}
