//! Terminal-aware line buffer
//!
//! Turns a stream of terminal output chunks into complete rendered lines.
//! Carriage-return overwrites, cursor addressing and style changes are
//! resolved on a single-line grid before the line is handed to the callback.
//!
//! ```
//! use linegrid::{FlushTimeout, LineBuffer};
//! use std::sync::{Arc, Mutex};
//!
//! let lines = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&lines);
//! let mut buffer = LineBuffer::new(
//!     move |line| sink.lock().unwrap().push(line),
//!     FlushTimeout::Never,
//! );
//!
//! buffer.write("Progress: 10%\rProgress: 100%\n");
//! assert_eq!(*lines.lock().unwrap(), vec!["Progress: 100%"]);
//! ```

use std::borrow::Cow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use super::term::{LineState, ParserEvent, SequenceParser};
use super::timer::FlushTimer;

/// When a partial line with no newline is emitted on its own
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlushTimeout {
    /// Only a newline or an explicit flush emits
    #[default]
    Never,
    /// Emit a partial line after this long without further writes
    After(Duration),
}

impl FlushTimeout {
    /// Zero or negative disables auto-flush, same as `Never`
    pub fn from_millis(ms: i64) -> Self {
        match u64::try_from(ms) {
            Ok(ms) if ms > 0 => Self::After(Duration::from_millis(ms)),
            _ => Self::Never,
        }
    }

    /// The delay to schedule, if auto-flush is enabled
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Self::After(delay) if !delay.is_zero() => Some(*delay),
            _ => None,
        }
    }
}

impl From<Option<u64>> for FlushTimeout {
    fn from(ms: Option<u64>) -> Self {
        match ms {
            Some(ms) if ms > 0 => Self::After(Duration::from_millis(ms)),
            _ => Self::Never,
        }
    }
}

type LineCallback = Box<dyn FnMut(String) + Send>;

/// State shared with the flush timer thread
struct Shared {
    decoder: Utf8Decoder,
    parser: SequenceParser,
    line: LineState,
    on_line: LineCallback,
    /// Bumped on every arm and cancel; a fire only counts for the current one
    epoch: u64,
    armed: bool,
}

impl Shared {
    fn cancel_timer(&mut self) {
        self.armed = false;
        self.epoch = self.epoch.wrapping_add(1);
    }

    fn arm_timer(&mut self) -> u64 {
        self.epoch = self.epoch.wrapping_add(1);
        self.armed = true;
        self.epoch
    }

    fn feed(&mut self, text: &str) {
        let Self {
            parser,
            line,
            on_line,
            epoch,
            armed,
            ..
        } = self;

        parser.feed_str(text, line, |event, line| match event {
            ParserEvent::LineFeed => {
                *armed = false;
                *epoch = epoch.wrapping_add(1);
                let rendered = line.take_line();
                on_line(rendered);
            }
        });
    }

    fn emit_line(&mut self) {
        self.cancel_timer();
        let rendered = self.line.take_line();
        (self.on_line)(rendered);
    }

    fn on_timer(&mut self, epoch: u64) {
        if self.armed && self.epoch == epoch && !self.line.is_empty() {
            self.emit_line();
        }
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    // A panicking callback must not take the whole stream down with it
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Streaming line buffer with an optional inactivity flush.
///
/// The callback runs synchronously inside [`LineBuffer::write`] and
/// [`LineBuffer::flush`], or on the timer thread for timed-out partial
/// lines. It must not call back into the same buffer.
pub struct LineBuffer {
    shared: Arc<Mutex<Shared>>,
    timeout: FlushTimeout,
    timer: Option<FlushTimer>,
    disposed: bool,
}

impl std::fmt::Debug for LineBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineBuffer")
            .field("timeout", &self.timeout)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl LineBuffer {
    pub fn new<F>(on_line: F, timeout: FlushTimeout) -> Self
    where
        F: FnMut(String) + Send + 'static,
    {
        let shared = Shared {
            decoder: Utf8Decoder::default(),
            parser: SequenceParser::new(),
            line: LineState::new(),
            on_line: Box::new(on_line),
            epoch: 0,
            armed: false,
        };

        Self {
            shared: Arc::new(Mutex::new(shared)),
            timeout,
            timer: None,
            disposed: false,
        }
    }

    pub fn timeout(&self) -> FlushTimeout {
        self.timeout
    }

    /// True when no partial line is buffered
    pub fn is_empty(&self) -> bool {
        lock(&self.shared).line.is_empty()
    }

    /// Feed a chunk of raw output. UTF-8 characters split across chunks are
    /// reassembled; invalid bytes become U+FFFD.
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) {
        let epoch = {
            let mut shared = lock(&self.shared);
            shared.cancel_timer();
            let text = shared.decoder.decode(chunk.as_ref());
            shared.feed(&text);
            self.next_arm(&mut shared)
        };
        self.schedule(epoch);
    }

    /// Feed already-decoded text. Bytes left incomplete by an earlier
    /// [`write`](Self::write) are completed by it or replaced with U+FFFD,
    /// never reordered.
    pub fn write_str(&mut self, text: &str) {
        self.write(text.as_bytes());
    }

    /// Emit the partial line, if any. Never emits an empty grid.
    pub fn flush(&mut self) {
        {
            let mut shared = lock(&self.shared);
            shared.cancel_timer();
            if shared.decoder.has_pending() {
                shared.decoder.clear();
                shared.line.put_char(char::REPLACEMENT_CHARACTER);
            }
            shared.parser.reset();
            if !shared.line.is_empty() {
                shared.emit_line();
            }
        }
        if let Some(timer) = &self.timer {
            timer.cancel();
        }
    }

    /// Cancel any pending flush without emitting. Safe to call repeatedly
    /// and after the stream has ended.
    pub fn dispose(&mut self) {
        lock(&self.shared).cancel_timer();
        if let Some(mut timer) = self.timer.take() {
            timer.shutdown();
        }
        self.disposed = true;
    }

    fn next_arm(&self, shared: &mut Shared) -> Option<u64> {
        if self.disposed || self.timeout.delay().is_none() || shared.line.is_empty() {
            return None;
        }
        Some(shared.arm_timer())
    }

    fn schedule(&mut self, epoch: Option<u64>) {
        match (epoch, self.timeout.delay()) {
            (Some(epoch), Some(delay)) => {
                if let Some(timer) = self.timer() {
                    timer.arm(epoch, delay);
                }
            }
            _ => {
                if let Some(timer) = &self.timer {
                    timer.cancel();
                }
            }
        }
    }

    /// The flush timer, started on first use
    fn timer(&mut self) -> Option<&FlushTimer> {
        if self.timer.is_none() {
            let shared: Weak<Mutex<Shared>> = Arc::downgrade(&self.shared);
            let spawned = FlushTimer::spawn(move |epoch| {
                if let Some(shared) = shared.upgrade() {
                    lock(&shared).on_timer(epoch);
                }
            });
            match spawned {
                Ok(timer) => self.timer = Some(timer),
                Err(e) => {
                    tracing::error!("Failed to start flush timer, auto-flush disabled: {}", e);
                    self.timeout = FlushTimeout::Never;
                    return None;
                }
            }
        }
        self.timer.as_ref()
    }
}

impl Drop for LineBuffer {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Incremental UTF-8 decoder that carries an incomplete trailing character
/// over to the next chunk
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn clear(&mut self) {
        self.pending.clear();
    }

    fn decode<'a>(&mut self, chunk: &'a [u8]) -> Cow<'a, str> {
        let input: Cow<'_, [u8]> = if self.pending.is_empty() {
            // Fast path: the whole chunk is valid
            if let Ok(text) = std::str::from_utf8(chunk) {
                return Cow::Borrowed(text);
            }
            Cow::Borrowed(chunk)
        } else {
            let mut joined = std::mem::take(&mut self.pending);
            joined.extend_from_slice(chunk);
            Cow::Owned(joined)
        };

        let mut out = String::with_capacity(input.len());
        let mut rest: &[u8] = &input;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending.extend_from_slice(after);
                            break;
                        }
                    }
                }
            }
        }
        Cow::Owned(out)
    }
}
