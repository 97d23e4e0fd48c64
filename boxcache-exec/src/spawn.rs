use crate::errors::BoxError;
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// The process-execution contract the driver depends on (§4.I), narrow enough to be replaced in
/// tests without a real child process. `args[0]` is the program, `args[1..]` its arguments; `cwd`
/// is passed explicitly rather than mutating the process-wide working directory (§5).
pub trait Spawn: std::fmt::Debug {
    fn run(
        &self,
        args: &[String],
        env: &HashMap<String, String>,
        cwd: &Path,
        shell: bool,
        timeout: Option<Duration>,
    ) -> Result<i32, BoxError>;
}

/// The default [`Spawn`]: shells out via [`std::process::Command`], replacing the inherited
/// environment with exactly the invocation's `typed_env` (so the fingerprint's claim that only
/// `typed_env` affects the call stays true of what the child actually sees), merging the child's
/// stderr into the parent's stdout, and enforcing `timeout` with a polling watcher that kills the
/// child on expiry.
#[derive(Debug, Default)]
pub struct ProcessSpawn;

impl Spawn for ProcessSpawn {
    fn run(
        &self,
        args: &[String],
        env: &HashMap<String, String>,
        cwd: &Path,
        shell: bool,
        timeout: Option<Duration>,
    ) -> Result<i32, BoxError> {
        let mut command = build_command(args, shell);
        command.current_dir(cwd);
        command.env_clear();
        command.envs(env);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command.spawn()?;
        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");
        let sink = Arc::new(Mutex::new(io::stdout()));
        let out_thread = copy_to_sink(stdout, sink.clone());
        let err_thread = copy_to_sink(stderr, sink);

        let status = match timeout {
            Some(timeout) => wait_with_timeout(&mut child, timeout)?,
            None => child.wait()?,
        };
        let _ = out_thread.join();
        let _ = err_thread.join();

        Ok(status.code().unwrap_or(-1))
    }
}

fn build_command(args: &[String], shell: bool) -> Command {
    if shell {
        let mut command = Command::new("/bin/sh");
        command.arg("-c").arg(args.join(" "));
        command
    } else {
        let mut iter = args.iter();
        let program = iter.next().expect("args always names a program at [0]");
        let mut command = Command::new(program);
        command.args(iter);
        command
    }
}

fn copy_to_sink<R: Read + Send + 'static>(
    mut reader: R,
    sink: Arc<Mutex<io::Stdout>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) | Err(_) => return,
                Ok(n) => {
                    let mut out = sink.lock().unwrap();
                    let _ = out.write_all(&buf[..n]);
                }
            }
        }
    })
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<ExitStatus, BoxError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(BoxError::Timeout(timeout));
        }
        thread::sleep(Duration::from_millis(20));
    }
}

/// One recorded call to [`RecordingSpawn::run`], kept for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: PathBuf,
    pub shell: bool,
    pub timeout: Option<Duration>,
}

/// A [`Spawn`] test double that never touches a real process: it records every call it receives
/// and returns a fixed exit status. Cache-hit tests assert `calls()` is empty after a call that
/// should have been satisfied entirely from the cache.
#[derive(Debug)]
pub struct RecordingSpawn {
    exit_status: i32,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingSpawn {
    pub fn new(exit_status: i32) -> RecordingSpawn {
        RecordingSpawn {
            exit_status,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for RecordingSpawn {
    fn default() -> Self {
        RecordingSpawn::new(0)
    }
}

impl Spawn for RecordingSpawn {
    fn run(
        &self,
        args: &[String],
        env: &HashMap<String, String>,
        cwd: &Path,
        shell: bool,
        timeout: Option<Duration>,
    ) -> Result<i32, BoxError> {
        self.calls.lock().unwrap().push(RecordedCall {
            args: args.to_vec(),
            env: env.clone(),
            cwd: cwd.to_path_buf(),
            shell,
            timeout,
        });
        Ok(self.exit_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_spawn_reports_exit_status() {
        let spawn = ProcessSpawn::default();
        let status = spawn
            .run(
                &["/bin/sh".to_owned(), "-c".to_owned(), "exit 7".to_owned()],
                &HashMap::new(),
                Path::new("/"),
                false,
                None,
            )
            .unwrap();
        assert_eq!(status, 7);
    }

    #[test]
    fn process_spawn_respects_timeout() {
        let spawn = ProcessSpawn::default();
        let err = spawn
            .run(
                &["sleep 5".to_owned()],
                &HashMap::new(),
                Path::new("/"),
                true,
                Some(Duration::from_millis(50)),
            )
            .unwrap_err();
        assert!(matches!(err, BoxError::Timeout(_)));
    }

    #[test]
    fn recording_spawn_records_every_call() {
        let spawn = RecordingSpawn::new(0);
        spawn
            .run(
                &["true".to_owned()],
                &HashMap::new(),
                Path::new("/tmp"),
                false,
                None,
            )
            .unwrap();
        assert_eq!(spawn.calls().len(), 1);
        assert_eq!(spawn.calls()[0].args, vec!["true".to_owned()]);
    }
}
