//! Concrete effects behind each tool: file reads, writes, exact-string edits
//! and shell commands.

use std::fmt::Display;
use std::fs;
use std::process::{Command, Stdio};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Leading glyph of every action line.
pub const MARKER: &str = "● ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Safety {
    ReadOnly,
    Modifying,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReadFileArgs {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WriteFileArgs {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EditFileArgs {
    pub path: String,
    pub old_string: String,
    pub new_string: String,
    #[serde(default)]
    pub replace_all: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunCommandArgs {
    pub command: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub safety: Option<String>,
}

impl RunCommandArgs {
    fn description_label(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("(no description)")
    }

    fn safety_label(&self) -> &str {
        self.safety
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("modify")
    }
}

/// A tool call with validated arguments, ready to confirm and run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    ReadFile(ReadFileArgs),
    WriteFile(WriteFileArgs),
    EditFile(EditFileArgs),
    RunCommand(RunCommandArgs),
}

/// Status line for the terminal and payload for the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: String,
    pub payload: String,
}

impl Outcome {
    pub fn new(status: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            payload: payload.into(),
        }
    }

    /// Recoverable failure; the model sees the same text as the user.
    pub fn fail(reason: impl Display) -> Self {
        let status = format!("fail: {reason}");
        Self {
            payload: status.clone(),
            status,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status.starts_with("fail")
    }
}

impl Action {
    pub fn parse(name: &str, raw_args: &str) -> Result<Self> {
        let raw = if raw_args.trim().is_empty() { "{}" } else { raw_args };
        let action = match name {
            "read_file" => Action::ReadFile(parse_args(name, raw)?),
            "write_file" => Action::WriteFile(parse_args(name, raw)?),
            "edit_file" => Action::EditFile(parse_args(name, raw)?),
            "run_command" => Action::RunCommand(parse_args(name, raw)?),
            other => bail!("unknown tool '{other}'"),
        };
        Ok(action)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::ReadFile(_) => "read_file",
            Action::WriteFile(_) => "write_file",
            Action::EditFile(_) => "edit_file",
            Action::RunCommand(_) => "run_command",
        }
    }

    /// Only reads skip confirmation. A command's own `safety` field is
    /// display metadata and does not change this.
    pub fn safety(&self) -> Safety {
        match self {
            Action::ReadFile(_) => Safety::ReadOnly,
            _ => Safety::Modifying,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Action::ReadFile(args) => format!("{MARKER}Read('{}')", args.path),
            Action::WriteFile(args) => format!(
                "{MARKER}Write('{}', {} lines)",
                args.path,
                count_lines(&args.content)
            ),
            Action::EditFile(args) => format!("{MARKER}Edit('{}')", args.path),
            Action::RunCommand(args) => format!(
                "{MARKER}Bash('{}') # {}, {}",
                single_line(&args.command),
                args.description_label(),
                args.safety_label()
            ),
        }
    }

    pub fn execute(&self) -> Outcome {
        match self {
            Action::ReadFile(args) => read_file(args),
            Action::WriteFile(args) => write_file(args),
            Action::EditFile(args) => edit_file(args),
            Action::RunCommand(args) => run_command(args),
        }
    }
}

fn parse_args<T: DeserializeOwned>(name: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("invalid arguments for {name}"))
}

pub fn count_lines(text: &str) -> usize {
    text.lines().count()
}

fn single_line(text: &str) -> String {
    text.trim_end().replace('\n', "\\n")
}

fn read_file(args: &ReadFileArgs) -> Outcome {
    match fs::read_to_string(&args.path) {
        Ok(content) => Outcome::new(format!("{} lines", count_lines(&content)), content),
        Err(err) => Outcome::fail(format!("cannot read {}: {err}", args.path)),
    }
}

fn write_file(args: &WriteFileArgs) -> Outcome {
    let lines = count_lines(&args.content);
    match fs::write(&args.path, &args.content) {
        Ok(()) => Outcome::new(
            format!("wrote {lines} lines"),
            format!("wrote {lines} lines to {}", args.path),
        ),
        Err(err) => Outcome::fail(format!("cannot write {}: {err}", args.path)),
    }
}

fn edit_file(args: &EditFileArgs) -> Outcome {
    if args.old_string.is_empty() {
        return Outcome::fail("old_string must not be empty");
    }
    let content = match fs::read_to_string(&args.path) {
        Ok(content) => content,
        Err(err) => return Outcome::fail(format!("cannot read {}: {err}", args.path)),
    };

    let count = content.matches(args.old_string.as_str()).count();
    if count == 0 {
        return Outcome::fail("string not found");
    }
    if count > 1 && !args.replace_all {
        return Outcome::fail(format!("{count} matches (use replace_all)"));
    }

    let updated = if args.replace_all {
        content.replace(&args.old_string, &args.new_string)
    } else {
        content.replacen(&args.old_string, &args.new_string, 1)
    };
    if let Err(err) = fs::write(&args.path, updated) {
        return Outcome::fail(format!("cannot write {}: {err}", args.path));
    }

    let summary = format!("replaced {count} occurrence(s)");
    Outcome::new(format!("ok: {summary}"), summary)
}

fn run_command(args: &RunCommandArgs) -> Outcome {
    let started = Instant::now();
    let output = match shell(&args.command).output() {
        Ok(output) => output,
        Err(err) => return Outcome::fail(format!("cannot launch shell: {err}")),
    };
    let elapsed = started.elapsed().as_secs_f64();

    let mut payload = String::from_utf8_lossy(&output.stdout).into_owned();
    payload.push_str(&String::from_utf8_lossy(&output.stderr));
    if payload.is_empty() {
        payload.push_str("(no output)");
    }

    let verdict = if output.status.success() {
        "ok"
    } else {
        if !payload.ends_with('\n') {
            payload.push('\n');
        }
        match output.status.code() {
            Some(code) => payload.push_str(&format!("(exit code {code})")),
            None => payload.push_str("(terminated by signal)"),
        }
        "fail"
    };
    Outcome::new(format!("{verdict} ({elapsed:.1}s)"), payload)
}

fn shell(command: &str) -> Command {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("powershell");
        c.args(["-NoProfile", "-Command", command]);
        c
    } else {
        let mut c = Command::new("sh");
        c.args(["-c", command]);
        c
    };
    // stdin stays with the confirmation prompt.
    cmd.stdin(Stdio::null());
    cmd
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    fn path_str(path: &Path) -> String {
        path.display().to_string()
    }

    fn edit(path: &Path, old: &str, new: &str, replace_all: bool) -> Outcome {
        Action::EditFile(EditFileArgs {
            path: path_str(path),
            old_string: old.to_string(),
            new_string: new.to_string(),
            replace_all,
        })
        .execute()
    }

    #[test]
    fn parse_validates_arguments() {
        let action = Action::parse("edit_file", r#"{"path":"a","old_string":"x","new_string":"y"}"#)
            .unwrap();
        assert_eq!(
            action,
            Action::EditFile(EditFileArgs {
                path: "a".into(),
                old_string: "x".into(),
                new_string: "y".into(),
                replace_all: false,
            })
        );
        assert_eq!(action.safety(), Safety::Modifying);

        let err = Action::parse("write_file", r#"{"path":"a"}"#).unwrap_err();
        assert!(format!("{err:#}").contains("invalid arguments for write_file"));
        let err = Action::parse("delete_everything", "{}").unwrap_err();
        assert!(err.to_string().contains("unknown tool"));
        assert!(Action::parse("read_file", "not json").is_err());
    }

    #[test]
    fn only_reads_are_read_only() {
        let read = Action::parse("read_file", r#"{"path":"a"}"#).unwrap();
        assert_eq!(read.safety(), Safety::ReadOnly);
        let cmd = Action::parse("run_command", r#"{"command":"ls","safety":"read-only"}"#).unwrap();
        assert_eq!(cmd.safety(), Safety::Modifying);
    }

    #[test]
    fn describes_actions_on_one_line() {
        let write = Action::parse("write_file", r#"{"path":"foo.txt","content":"a\nb\n"}"#).unwrap();
        assert_eq!(write.describe(), "● Write('foo.txt', 2 lines)");
        let cmd = Action::parse("run_command", r#"{"command":"ls -la"}"#).unwrap();
        assert_eq!(cmd.describe(), "● Bash('ls -la') # (no description), modify");
        let cmd = Action::parse(
            "run_command",
            r#"{"command":"echo a\necho b","description":"print","safety":"read-only"}"#,
        )
        .unwrap();
        assert_eq!(cmd.describe(), "● Bash('echo a\\necho b') # print, read-only");
        let read = Action::parse("read_file", r#"{"path":"src/main.rs"}"#).unwrap();
        assert_eq!(read.describe(), "● Read('src/main.rs')");
    }

    #[test]
    fn read_reports_line_count_and_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "one\ntwo\nthree\n").unwrap();
        let out = Action::ReadFile(ReadFileArgs { path: path_str(&path) }).execute();
        assert_eq!(out.status, "3 lines");
        assert_eq!(out.payload, "one\ntwo\nthree\n");
    }

    #[test]
    fn unreadable_file_is_a_recoverable_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.txt");
        let out = Action::ReadFile(ReadFileArgs { path: path_str(&path) }).execute();
        assert!(out.is_failure());
        assert!(out.status.starts_with("fail: cannot read"));
        assert_eq!(out.payload, out.status);
    }

    #[test]
    fn write_creates_file_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foo.txt");
        let out = Action::WriteFile(WriteFileArgs {
            path: path_str(&path),
            content: "hi\n".into(),
        })
        .execute();
        assert_eq!(out.status, "wrote 1 lines");
        assert!(out.payload.starts_with("wrote 1 lines to "));
        assert_eq!(fs::read_to_string(&path).unwrap(), "hi\n");
    }

    #[test]
    fn edit_without_match_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"alpha\nbeta\n").unwrap();
        let out = edit(&path, "gamma", "delta", false);
        assert_eq!(out.status, "fail: string not found");
        assert_eq!(fs::read(&path).unwrap(), b"alpha\nbeta\n");
    }

    #[test]
    fn edit_with_ambiguous_match_requires_replace_all() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "x = 1\nx = 2\n").unwrap();
        let out = edit(&path, "x", "y", false);
        assert_eq!(out.status, "fail: 2 matches (use replace_all)");
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 1\nx = 2\n");
    }

    #[test]
    fn edit_single_match() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "fn main() {}\n").unwrap();
        let out = edit(&path, "main", "start", false);
        assert_eq!(out.status, "ok: replaced 1 occurrence(s)");
        assert_eq!(out.payload, "replaced 1 occurrence(s)");
        assert_eq!(fs::read_to_string(&path).unwrap(), "fn start() {}\n");
    }

    #[test]
    fn replace_all_removes_every_occurrence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "foo bar foo\nfoofoo\n").unwrap();
        let out = edit(&path, "foo", "baz", true);
        assert_eq!(out.status, "ok: replaced 4 occurrence(s)");
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("foo").count(), 0);
        assert_eq!(content, "baz bar baz\nbazbaz\n");
    }

    #[test]
    fn noop_edit_never_corrupts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "same\n").unwrap();
        let out = edit(&path, "same", "same", false);
        assert!(!out.is_failure());
        assert_eq!(fs::read_to_string(&path).unwrap(), "same\n");

        fs::write(&path, "aa aa\n").unwrap();
        let out = edit(&path, "aa", "aa", false);
        assert_eq!(out.status, "fail: 2 matches (use replace_all)");
        assert_eq!(fs::read_to_string(&path).unwrap(), "aa aa\n");
    }

    #[test]
    fn empty_old_string_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "abc").unwrap();
        let out = edit(&path, "", "x", true);
        assert_eq!(out.status, "fail: old_string must not be empty");
        assert_eq!(fs::read_to_string(&path).unwrap(), "abc");
    }

    #[cfg(unix)]
    #[test]
    fn command_captures_stdout_then_stderr() {
        let out = Action::RunCommand(RunCommandArgs {
            command: "echo out; echo err 1>&2".into(),
            description: None,
            safety: None,
        })
        .execute();
        assert!(out.status.starts_with("ok ("), "{}", out.status);
        assert!(out.status.ends_with("s)"));
        assert_eq!(out.payload, "out\nerr\n");
    }

    #[cfg(unix)]
    #[test]
    fn failing_command_reports_fail_and_exit_code() {
        let out = Action::RunCommand(RunCommandArgs {
            command: "exit 3".into(),
            description: Some("boom".into()),
            safety: None,
        })
        .execute();
        assert!(out.status.starts_with("fail ("), "{}", out.status);
        assert_eq!(out.payload, "(no output)\n(exit code 3)");
    }
}
