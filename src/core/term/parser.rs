//! Escape sequence parser
//!
//! Classifies incoming characters as plain text, a CSI command or a
//! discardable string sequence, and applies the result to a [`LineState`].
//!
//! The parser is a streaming state machine: a sequence split across two
//! chunks is held in `pending` and completed by the next call to
//! [`SequenceParser::feed`].

use super::state::LineState;

const ESC: char = '\x1b';
const BEL: char = '\x07';
const CAN: char = '\x18';
const SUB: char = '\x1a';

/// Event that the owner of the line must act on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserEvent {
    /// A line feed was seen: the current line is complete
    LineFeed,
}

/// Parser state machine
#[derive(Debug, Default)]
pub struct SequenceParser {
    state: ParserState,
    /// Raw text of the sequence in progress, starting with ESC
    pending: String,
    params: Vec<u16>,
    current_param: u16,
    /// A private marker (`?`, `>`, `=`, `<`) opened the CSI
    private: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum ParserState {
    #[default]
    Ground,
    Escape,
    CsiEntry,
    CsiParam,
    /// OSC, DCS, PM or APC body
    StringSequence,
    /// ESC received within a string sequence, waiting for backslash
    EscapeInString,
}

impl SequenceParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Ground,
            pending: String::with_capacity(16),
            params: Vec::with_capacity(4),
            current_param: 0,
            private: false,
        }
    }

    /// True while a sequence is partially received
    pub fn in_sequence(&self) -> bool {
        self.state != ParserState::Ground
    }

    /// Drop any partially received sequence
    pub fn reset(&mut self) {
        if self.in_sequence() {
            tracing::trace!("Dropping incomplete sequence {:?}", self.pending);
        }
        self.state = ParserState::Ground;
        self.pending.clear();
        self.params.clear();
        self.current_param = 0;
        self.private = false;
    }

    /// Feed every character of `text`, invoking `on_event` for each event
    pub fn feed_str(
        &mut self,
        text: &str,
        line: &mut LineState,
        mut on_event: impl FnMut(ParserEvent, &mut LineState),
    ) {
        for ch in text.chars() {
            if let Some(event) = self.feed(ch, line) {
                on_event(event, line);
            }
        }
    }

    /// Feed a single character to the parser
    pub fn feed(&mut self, ch: char, line: &mut LineState) -> Option<ParserEvent> {
        match self.state {
            ParserState::Ground => self.ground(ch, line),
            ParserState::Escape => self.escape(ch, line),
            ParserState::CsiEntry => self.csi_entry(ch, line),
            ParserState::CsiParam => self.csi_param(ch, line),
            ParserState::StringSequence => self.string_sequence(ch, line),
            ParserState::EscapeInString => self.escape_in_string(ch, line),
        }
    }

    fn ground(&mut self, ch: char, line: &mut LineState) -> Option<ParserEvent> {
        match ch {
            ESC => {
                self.enter_escape();
                None
            }
            '\r' => {
                line.carriage_return();
                None
            }
            '\n' => Some(ParserEvent::LineFeed),
            '\x08' => {
                line.backspace();
                None
            }
            '\t' => {
                line.horizontal_tab();
                None
            }
            // Remaining C0 controls are ignored
            '\x00'..='\x1f' => None,
            _ => {
                line.put_char(ch);
                None
            }
        }
    }

    fn enter_escape(&mut self) {
        self.state = ParserState::Escape;
        self.pending.clear();
        self.pending.push(ESC);
        self.params.clear();
        self.current_param = 0;
        self.private = false;
    }

    fn escape(&mut self, ch: char, line: &mut LineState) -> Option<ParserEvent> {
        match ch {
            '[' => {
                self.pending.push(ch);
                self.state = ParserState::CsiEntry;
                None
            }
            ']' | 'P' | '^' | '_' => {
                self.pending.clear();
                self.state = ParserState::StringSequence;
                None
            }
            _ => {
                // Lone ESC: drop it and treat the character as ordinary input
                self.pending.clear();
                self.state = ParserState::Ground;
                self.ground(ch, line)
            }
        }
    }

    fn csi_entry(&mut self, ch: char, line: &mut LineState) -> Option<ParserEvent> {
        match ch {
            '?' | '>' | '=' | '<' => {
                self.pending.push(ch);
                self.private = true;
                self.state = ParserState::CsiParam;
                None
            }
            _ => {
                self.state = ParserState::CsiParam;
                self.csi_param(ch, line)
            }
        }
    }

    fn csi_param(&mut self, ch: char, line: &mut LineState) -> Option<ParserEvent> {
        match ch {
            '0'..='9' => {
                let digit = ch as u16 - '0' as u16;
                self.current_param = self.current_param.saturating_mul(10).saturating_add(digit);
                self.pending.push(ch);
                None
            }
            ';' => {
                self.params.push(self.current_param);
                self.current_param = 0;
                self.pending.push(ch);
                None
            }
            'A'..='Z' | 'a'..='z' | '@' => {
                self.params.push(self.current_param);
                self.pending.push(ch);
                if self.private {
                    tracing::trace!("Discarding private CSI {:?}", self.pending);
                } else {
                    line.execute_csi(&self.params, ch, &self.pending);
                }
                self.state = ParserState::Ground;
                self.pending.clear();
                None
            }
            _ => self.abort_csi(ch, line),
        }
    }

    /// Not a CSI after all: drop the ESC, print what followed it and
    /// reprocess `ch` from ground state.
    fn abort_csi(&mut self, ch: char, line: &mut LineState) -> Option<ParserEvent> {
        self.state = ParserState::Ground;
        for printable in self.pending.chars().skip(1) {
            line.put_char(printable);
        }
        self.pending.clear();
        self.ground(ch, line)
    }

    /// String bodies never span lines: a line feed ends an unterminated
    /// sequence and is then handled as ordinary input. CAN and SUB abort it.
    fn string_sequence(&mut self, ch: char, line: &mut LineState) -> Option<ParserEvent> {
        match ch {
            BEL | CAN | SUB => {
                tracing::trace!("Discarded string sequence");
                self.state = ParserState::Ground;
                None
            }
            '\n' => {
                tracing::trace!("Unterminated string sequence ended by line feed");
                self.state = ParserState::Ground;
                self.ground(ch, line)
            }
            ESC => {
                self.state = ParserState::EscapeInString;
                None
            }
            _ => None,
        }
    }

    fn escape_in_string(&mut self, ch: char, line: &mut LineState) -> Option<ParserEvent> {
        tracing::trace!("Discarded string sequence");
        if ch == '\\' {
            // ST (ESC \) - String Terminator
            self.state = ParserState::Ground;
            None
        } else {
            // Unterminated: the ESC starts a new sequence
            self.enter_escape();
            self.escape(ch, line)
        }
    }
}
