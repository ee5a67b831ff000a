//! Playwright browser automation
//!
//! Each [`PlaywrightSession`] owns one Node process running a small driver
//! script. The driver keeps a single page open and answers one JSON request
//! per line on stdin with one JSON reply per line on stdout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::session::{Download, Session, SessionFactory};
use crate::workflow::Locator;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }

    /// Parse a browser name, falling back to Chromium
    pub fn from_name(name: &str) -> Self {
        match name {
            "firefox" => Browser::Firefox,
            "webkit" => Browser::Webkit,
            _ => Browser::Chromium,
        }
    }
}

/// Configuration for Playwright sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Playwright's own per-action timeout inside the driver
    pub action_timeout_ms: u64,

    /// How long to wait for any single driver reply
    pub reply_timeout_ms: u64,

    /// How long to wait for the browser to launch
    pub startup_timeout_ms: u64,

    /// Saved authentication state to load into every new context
    pub storage_state: Option<PathBuf>,

    /// Directory whose `node_modules` provides `playwright`
    pub node_modules_dir: Option<PathBuf>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            action_timeout_ms: 10_000,
            reply_timeout_ms: 60_000,
            startup_timeout_ms: 30_000,
            storage_state: None,
            node_modules_dir: None,
        }
    }
}

#[derive(Debug, Serialize)]
struct DriverRequest<'a> {
    id: u64,
    #[serde(flatten)]
    command: DriverCommand<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum DriverCommand<'a> {
    Goto { url: &'a str },
    Click { target: &'a Locator },
    Fill { target: &'a Locator, value: &'a str },
    Press { key: &'a str },
    Type { text: &'a str },
    Select { target: &'a Locator, value: &'a str },
    Count { target: &'a Locator },
    Text { target: &'a Locator },
    InputValue { target: &'a Locator },
    TakeDownload,
    Url,
    Screenshot { path: &'a str },
    Close,
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

/// Options handed to the driver script at launch
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LaunchOptions<'a> {
    browser: &'a str,
    headless: bool,
    viewport: Viewport,
    action_timeout: u64,
    storage_state: Option<String>,
}

#[derive(Debug, Serialize)]
struct Viewport {
    width: u32,
    height: u32,
}

const DRIVER_BODY: &str = r#"
const { chromium, firefox, webkit } = require('playwright');
const readline = require('readline');

const engines = { chromium, firefox, webkit };

function reply(msg) {
  process.stdout.write(JSON.stringify(msg) + '\n');
}

(async () => {
  const browser = await engines[OPTIONS.browser].launch({ headless: OPTIONS.headless });
  const contextOptions = { viewport: OPTIONS.viewport, acceptDownloads: true };
  if (OPTIONS.storageState) {
    contextOptions.storageState = OPTIONS.storageState;
  }
  const context = await browser.newContext(contextOptions);
  const page = await context.newPage();
  page.setDefaultTimeout(OPTIONS.actionTimeout);

  const downloads = [];
  page.on('download', (download) => {
    downloads.push(download.suggestedFilename());
  });

  const root = (t) => (t.frame ? page.frameLocator(t.frame) : page);
  const all = (t) => root(t).locator(t.selector);
  const one = (t) => (t.nth === undefined || t.nth === null ? all(t).first() : all(t).nth(t.nth));

  const ops = {
    goto: async (r) => { await page.goto(r.url); return null; },
    click: async (r) => { await one(r.target).click(); return null; },
    fill: async (r) => { await one(r.target).fill(r.value); return null; },
    press: async (r) => { await page.keyboard.press(r.key); return null; },
    type: async (r) => { await page.keyboard.type(r.text); return null; },
    select: async (r) => { await one(r.target).selectOption(r.value); return null; },
    count: async (r) => all(r.target).count(),
    text: async (r) => one(r.target).innerText(),
    input_value: async (r) => one(r.target).inputValue(),
    take_download: async () => (downloads.length ? downloads.shift() : null),
    url: async () => page.url(),
    screenshot: async (r) => { await page.screenshot({ path: r.path, fullPage: true }); return null; },
    close: async () => { await browser.close(); return null; },
  };

  reply({ id: 0, ok: true, value: 'ready' });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    let request;
    try {
      request = JSON.parse(line);
    } catch (error) {
      reply({ id: -1, ok: false, error: 'bad request: ' + error.message });
      continue;
    }
    const handler = ops[request.op];
    if (!handler) {
      reply({ id: request.id, ok: false, error: 'unknown op: ' + request.op });
      continue;
    }
    try {
      const value = await handler(request);
      reply({ id: request.id, ok: true, value });
    } catch (error) {
      reply({ id: request.id, ok: false, error: error.message });
    }
    if (request.op === 'close') break;
  }
  process.exit(0);
})().catch((error) => {
  reply({ id: 0, ok: false, error: error.message });
  process.exit(1);
});
"#;

/// Build the driver script for a configuration
pub fn build_driver_script(config: &PlaywrightConfig) -> E2eResult<String> {
    let options = LaunchOptions {
        browser: config.browser.as_str(),
        headless: config.headless,
        viewport: Viewport {
            width: config.viewport_width,
            height: config.viewport_height,
        },
        action_timeout: config.action_timeout_ms,
        storage_state: config
            .storage_state
            .as_ref()
            .map(|p| p.to_string_lossy().to_string()),
    };

    let mut script = format!("const OPTIONS = {};\n", serde_json::to_string(&options)?);
    script.push_str(DRIVER_BODY);
    Ok(script)
}

/// Read driver output until the reply to `id` arrives.
///
/// A probe cut off by a wait deadline leaves its reply in the pipe; that
/// reply and any non-JSON output from the page are skipped.
async fn read_reply<R>(lines: &mut Lines<R>, id: u64, wait: Duration) -> E2eResult<DriverReply>
where
    R: AsyncBufRead + Unpin,
{
    let deadline = tokio::time::Instant::now() + wait;

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        let line = match timeout(remaining, lines.next_line()).await {
            Ok(line) => line?,
            Err(_) => {
                return Err(E2eError::Driver(format!(
                    "no reply to request {} within {} ms",
                    id,
                    wait.as_millis()
                )))
            }
        };

        let Some(line) = line else {
            return Err(E2eError::Driver("driver exited unexpectedly".to_string()));
        };

        match serde_json::from_str::<DriverReply>(&line) {
            Ok(reply) if reply.id == id => return Ok(reply),
            Ok(reply) => warn!("Discarding stale driver reply {}", reply.id),
            Err(_) => debug!("[driver stdout] {}", line),
        }
    }
}

/// Check if Playwright is installed
fn check_playwright_installed() -> E2eResult<()> {
    let output = Command::new("npx")
        .args(["playwright", "--version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match output {
        Ok(status) if status.success() => Ok(()),
        _ => Err(E2eError::PlaywrightNotFound),
    }
}

/// A live browser page driven through the Node driver
pub struct PlaywrightSession {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    reply_timeout: Duration,
    closed: bool,

    // Holds the driver script for the life of the process
    _script_dir: tempfile::TempDir,
}

impl PlaywrightSession {
    /// Launch a browser and open one page
    pub async fn launch(config: &PlaywrightConfig) -> E2eResult<Self> {
        check_playwright_installed()?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, build_driver_script(config)?)?;

        debug!("Starting Playwright driver: {}", script_path.display());

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.node_modules_dir {
            cmd.env("NODE_PATH", dir.join("node_modules")).current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| E2eError::Driver(format!("Failed to spawn node: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Driver("driver stdout unavailable".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[driver] {}", line);
                }
            });
        }

        let mut session = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
            reply_timeout: Duration::from_millis(config.reply_timeout_ms),
            closed: false,
            _script_dir: script_dir,
        };

        let ready = read_reply(
            &mut session.stdout,
            0,
            Duration::from_millis(config.startup_timeout_ms),
        )
        .await?;
        if !ready.ok {
            return Err(E2eError::Driver(format!(
                "Browser launch failed: {}",
                ready.error.unwrap_or_default()
            )));
        }

        info!(
            "Playwright session ready ({}, {}x{})",
            config.browser.as_str(),
            config.viewport_width,
            config.viewport_height
        );
        Ok(session)
    }

    async fn request(&mut self, command: DriverCommand<'_>) -> E2eResult<serde_json::Value> {
        if self.closed {
            return Err(E2eError::Driver("session is closed".to_string()));
        }

        let id = self.next_id;
        self.next_id += 1;

        let mut line = serde_json::to_string(&DriverRequest { id, command })?;
        line.push('\n');
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        let reply = read_reply(&mut self.stdout, id, self.reply_timeout).await?;
        if reply.ok {
            Ok(reply.value)
        } else {
            Err(E2eError::Driver(reply.error.unwrap_or_else(|| "unknown driver error".to_string())))
        }
    }

    fn expect_string(value: serde_json::Value, what: &str) -> E2eResult<String> {
        match value {
            serde_json::Value::String(s) => Ok(s),
            other => Err(E2eError::Driver(format!("expected {} string, got {}", what, other))),
        }
    }
}

#[async_trait]
impl Session for PlaywrightSession {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        self.request(DriverCommand::Goto { url })
            .await
            .map(|_| ())
            .map_err(|e| E2eError::NavigationFailure {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn click(&mut self, target: &Locator) -> E2eResult<()> {
        self.request(DriverCommand::Click { target }).await.map(|_| ())
    }

    async fn fill(&mut self, target: &Locator, value: &str) -> E2eResult<()> {
        self.request(DriverCommand::Fill { target, value }).await.map(|_| ())
    }

    async fn press_key(&mut self, key: &str) -> E2eResult<()> {
        self.request(DriverCommand::Press { key }).await.map(|_| ())
    }

    async fn type_text(&mut self, text: &str) -> E2eResult<()> {
        self.request(DriverCommand::Type { text }).await.map(|_| ())
    }

    async fn select_option(&mut self, target: &Locator, value: &str) -> E2eResult<()> {
        self.request(DriverCommand::Select { target, value }).await.map(|_| ())
    }

    async fn count(&mut self, target: &Locator) -> E2eResult<usize> {
        let value = self.request(DriverCommand::Count { target }).await?;
        value
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| E2eError::Driver(format!("expected count, got {}", value)))
    }

    async fn inner_text(&mut self, target: &Locator) -> E2eResult<String> {
        let value = self.request(DriverCommand::Text { target }).await?;
        Self::expect_string(value, "text")
    }

    async fn input_value(&mut self, target: &Locator) -> E2eResult<String> {
        let value = self.request(DriverCommand::InputValue { target }).await?;
        Self::expect_string(value, "input value")
    }

    async fn take_download(&mut self) -> E2eResult<Option<Download>> {
        match self.request(DriverCommand::TakeDownload).await? {
            serde_json::Value::Null => Ok(None),
            value => Ok(Some(Download {
                suggested_filename: Self::expect_string(value, "filename")?,
            })),
        }
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        let value = self.request(DriverCommand::Url).await?;
        Self::expect_string(value, "url")
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let path = path.to_string_lossy();
        self.request(DriverCommand::Screenshot { path: &path }).await.map(|_| ())
    }

    async fn close(&mut self) -> E2eResult<()> {
        if self.closed {
            return Ok(());
        }
        let result = self.request(DriverCommand::Close).await;
        self.closed = true;
        if let Err(e) = &result {
            warn!("Driver close failed, killing process: {}", e);
            let _ = self.child.start_kill();
        }
        let _ = self.child.wait().await;
        result.map(|_| ())
    }
}

/// Opens one Playwright session per scenario
#[derive(Debug, Clone, Default)]
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
}

impl PlaywrightLauncher {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for PlaywrightLauncher {
    type Session = PlaywrightSession;

    async fn open(&self) -> E2eResult<PlaywrightSession> {
        PlaywrightSession::launch(&self.config).await
    }
}
