//! Line-oriented console shared by the commands
//!
//! Output goes to one writer so prompts, summaries and job logs interleave in
//! the order they are produced.

use crate::error::SyncError;
use crate::job::{JobEvent, Prompter, SyncObserver};
use crate::plan::{SyncGroup, SyncGroupKind};
use async_trait::async_trait;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};

type Input = Arc<Mutex<Box<dyn BufRead + Send>>>;
type Output = Arc<Mutex<dyn Write + Send>>;

#[derive(Clone)]
pub struct Console {
	input: Input,
	output: Output,
}

impl Console {
	pub fn new(input: Box<dyn BufRead + Send>, output: Output) -> Self {
		Self { input: Arc::new(Mutex::new(input)), output }
	}

	/// Console on the process' stdin and stdout
	pub fn stdio() -> Self {
		Self::new(Box::new(io::BufReader::new(io::stdin())), Arc::new(Mutex::new(io::stdout())))
	}

	/// Console reading `input` and collecting output in the returned buffer
	pub fn captured(input: &str) -> (Self, Arc<Mutex<Vec<u8>>>) {
		let buffer = Arc::new(Mutex::new(Vec::new()));
		let console = Self::new(Box::new(io::Cursor::new(input.as_bytes().to_vec())), buffer.clone());
		(console, buffer)
	}

	pub fn println(&self, line: impl AsRef<str>) {
		let mut out = self.output.lock().unwrap_or_else(|e| e.into_inner());
		let _ = writeln!(out, "{}", line.as_ref());
		let _ = out.flush();
	}

	/// Run `f` against the output writer
	pub fn write_with<F>(&self, f: F) -> io::Result<()>
	where
		F: FnOnce(&mut dyn Write) -> io::Result<()>,
	{
		let mut out = self.output.lock().unwrap_or_else(|e| e.into_inner());
		f(&mut *out)?;
		out.flush()
	}

	async fn read_line(&self) -> Result<String, SyncError> {
		let input = self.input.clone();
		tokio::task::spawn_blocking(move || -> Result<String, SyncError> {
			let mut input = input.lock().unwrap_or_else(|e| e.into_inner());
			let mut line = String::new();
			if input.read_line(&mut line)? == 0 {
				return Err(SyncError::Other { message: "end of input".to_string() });
			}
			Ok(line.trim_end().to_string())
		})
		.await?
	}

	/// Ask until the answer is one of y, yes, n, no
	pub async fn ask_for_confirmation(&self, prompt: &str) -> Result<bool, SyncError> {
		loop {
			self.println(format!("{} [y/n]: ", prompt));
			match self.read_line().await?.to_lowercase().as_str() {
				"y" | "yes" => return Ok(true),
				"n" | "no" => return Ok(false),
				_ => {}
			}
		}
	}
}

/// Confirms plan groups on the console
pub struct ConsolePrompter {
	console: Console,
	operation: String,
}

impl ConsolePrompter {
	pub fn new(console: Console, operation: impl Into<String>) -> Self {
		Self { console, operation: operation.into() }
	}
}

#[async_trait]
impl Prompter for ConsolePrompter {
	async fn confirm(&self, group: &SyncGroup) -> Result<bool, SyncError> {
		let prompt = match group.kind() {
			SyncGroupKind::AdditiveRelocations => {
				format!("Do you want to {} in additive duplicating mode?", self.operation)
			}
			SyncGroupKind::MoveApply => format!("Do you want to {} moves?", self.operation),
			SyncGroupKind::NewFiles => format!("Do you want to {} new files?", self.operation),
		};
		self.console.ask_for_confirmation(&prompt).await
	}
}

/// Prints sync job events
pub struct SyncLogger {
	console: Console,
}

impl SyncLogger {
	pub fn new(console: Console) -> Self {
		Self { console }
	}
}

impl SyncObserver for SyncLogger {
	fn on_event(&self, event: JobEvent) {
		match event {
			JobEvent::FileStored { path } => self.console.println(format!("file stored: {}", path)),
			JobEvent::FileMoved { from, to } => self.console.println(format!("file moved: {} -> {}", from, to)),
			JobEvent::FileDeleted { path } => self.console.println(format!("file deleted: {}", path)),
			_ => {}
		}
	}
}


// vim: ts=4
