use super::error::TranscodeError;
use super::params::ResolvedParams;
use crate::config::profile::{AudioStop, DeploymentProfile, ValidationStrictness};
use crate::config::settings::EngineCommand;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const TAIL_LINES: usize = 40;
const DIAGNOSTIC_CHARS: usize = 1500;
const READER_GRACE: Duration = Duration::from_secs(2);

/// Files involved in one encode.
#[derive(Clone, Copy, Debug)]
pub struct EngineJob<'a> {
    pub source: &'a Path,
    pub audio: Option<&'a Path>,
    pub output: &'a Path,
    pub params: &'a ResolvedParams,
}

/// Argument list for the engine. Order matters to ffmpeg: input options sit
/// before their `-i`, output options before the output path.
pub fn build_args(profile: &DeploymentProfile, job: &EngineJob<'_>) -> Vec<OsString> {
    let mut args = vec![arg("-y")];

    if let Some(input_fps) = profile.input_fps {
        args.extend([arg("-framerate"), arg(input_fps.to_string())]);
    }
    args.extend([arg("-loop"), arg("1"), arg("-i"), arg(job.source)]);

    if let Some(audio) = job.audio {
        args.extend([arg("-i"), arg(audio)]);
    }

    match (job.audio, profile.audio_stop) {
        (Some(_), AudioStop::Shortest) => args.push(arg("-shortest")),
        _ => args.extend([arg("-t"), arg(job.params.duration.to_string())]),
    }

    args.extend([
        arg("-r"),
        arg(job.params.fps.to_string()),
        arg("-vf"),
        arg(profile.filter.filter_graph()),
        arg("-c:v"),
        arg("libx264"),
        arg("-preset"),
        arg(profile.preset),
        arg("-crf"),
        arg(profile.crf.to_string()),
        arg("-threads"),
        arg(profile.threads.to_string()),
        arg("-pix_fmt"),
        arg("yuv420p"),
    ]);

    if job.audio.is_some() {
        args.extend([arg("-c:a"), arg("aac"), arg("-b:a"), arg("128k")]);
    }

    args.extend([arg("-movflags"), arg("+faststart"), arg(job.output)]);
    args
}

fn arg(value: impl Into<OsString>) -> OsString {
    value.into()
}

#[derive(Debug)]
pub enum EngineStatus {
    Exited(ExitStatus),
    TimedOut,
}

#[derive(Debug)]
pub struct EngineRun {
    pub status: EngineStatus,
    pub diagnostics: String,
    pub elapsed: Duration,
}

/// Spawns and supervises the external engine.
#[derive(Clone, Debug)]
pub struct EngineRunner {
    command: EngineCommand,
    timeout: Duration,
}

impl EngineRunner {
    pub fn new(command: EngineCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves once the engine exits, fails to start, or hits the wall-clock
    /// limit (in which case it is killed). Dropping the future kills it too.
    pub async fn run(&self, args: &[OsString]) -> Result<EngineRun, TranscodeError> {
        let started = Instant::now();
        let mut child = Command::new(&self.command.program)
            .args(&self.command.leading_args)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TranscodeError::Spawn(e.to_string()))?;

        debug!("🎬 Engine started (pid {:?})", child.id());

        let tail = Arc::new(Mutex::new(VecDeque::with_capacity(TAIL_LINES)));
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_line_reader(stdout, "stdout", tail.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_line_reader(stderr, "stderr", tail.clone()));
        }

        let status = match timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => EngineStatus::Exited(status),
            Ok(Err(e)) => return Err(TranscodeError::Io(e)),
            Err(_) => {
                warn!("⏱️ Engine exceeded {}s, killing it", self.timeout.as_secs());
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill engine: {}", e);
                }
                EngineStatus::TimedOut
            }
        };

        // Grandchildren may keep the pipes open after a kill.
        for reader in readers {
            let abort = reader.abort_handle();
            if timeout(READER_GRACE, reader).await.is_err() {
                abort.abort();
            }
        }

        let diagnostics = tail
            .lock()
            .map(|lines| lines.iter().cloned().collect::<Vec<_>>().join("\n"))
            .unwrap_or_default();

        Ok(EngineRun {
            status,
            diagnostics,
            elapsed: started.elapsed(),
        })
    }
}

fn spawn_line_reader<R>(pipe: R, stream: &'static str, tail: Arc<Mutex<VecDeque<String>>>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        // Engine output echoes file names and metadata verbatim, so lines are
        // not guaranteed to be UTF-8. The pipe is drained until EOF either way;
        // closing it early would kill the engine with SIGPIPE.
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("Engine {} unreadable: {}", stream, e);
                    break;
                }
            }
            let line = String::from_utf8_lossy(&buf)
                .trim_end_matches(['\n', '\r'])
                .to_string();
            debug!(target: "slowmo::engine", "[{}] {}", stream, line);
            if let Ok(mut tail) = tail.lock() {
                if tail.len() == TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
        }
    })
}

fn describe_exit(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// Applies the outcome rules, in order: timeout, missing output, undersized
/// output, then the exit status according to the strictness level.
/// Returns the output size.
pub async fn validate_output(
    run: &EngineRun,
    output: &Path,
    profile: &DeploymentProfile,
    limit: Duration,
    diagnostics: String,
) -> Result<u64, TranscodeError> {
    let status = match &run.status {
        EngineStatus::TimedOut => return Err(TranscodeError::Timeout { limit, diagnostics }),
        EngineStatus::Exited(status) => status,
    };

    let size = match tokio::fs::metadata(output).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(TranscodeError::Engine {
                reason: format!("{}, no output produced", describe_exit(status)),
                diagnostics,
            });
        }
        Err(e) => return Err(TranscodeError::Io(e)),
    };

    if size < profile.min_output_bytes {
        return Err(TranscodeError::Engine {
            reason: format!("{}, output is empty or undersized ({} bytes)", describe_exit(status), size),
            diagnostics,
        });
    }

    if !status.success() {
        match profile.strictness {
            ValidationStrictness::Strict => {
                return Err(TranscodeError::Engine {
                    reason: describe_exit(status),
                    diagnostics,
                });
            }
            ValidationStrictness::Resilient => {
                warn!(
                    "Engine ended with {} but produced {} bytes, accepting",
                    describe_exit(status),
                    size
                );
            }
        }
    }

    info!("✅ Engine output validated ({} bytes in {:?})", size, run.elapsed);
    Ok(size)
}

/// Keeps the end of the engine log, with the request's private paths replaced.
pub fn scrub_diagnostics(raw: &str, private: &[(&Path, &str)]) -> String {
    let mut text = raw.to_string();
    for (path, label) in private {
        let needle = path.to_string_lossy();
        if !needle.is_empty() {
            text = text.replace(needle.as_ref(), label);
        }
    }

    let total = text.chars().count();
    if total <= DIAGNOSTIC_CHARS {
        return text;
    }
    let start = text
        .char_indices()
        .nth(total - DIAGNOSTIC_CHARS)
        .map(|(i, _)| i)
        .unwrap_or(0);
    format!("…{}", &text[start..])
}
