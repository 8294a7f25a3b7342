//! Control messages, dynamic atoms and patch paths
//!
//! A control message targets a named receiver inside the graph and carries
//! nothing back. The atom surface mirrors how messages arrive from dynamic
//! callers (a command line, a scripting binding): a list of untyped values
//! whose arity and types are checked before anything reaches the graph.

use std::fmt;
use std::path::PathBuf;

/// A fire-and-forget message addressed to a receiver in the graph
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    Bang { receiver: String },
    Float { receiver: String, value: f32 },
    Symbol { receiver: String, text: String },
}

impl ControlMessage {
    /// The receiver this message is addressed to
    pub fn receiver(&self) -> &str {
        match self {
            ControlMessage::Bang { receiver }
            | ControlMessage::Float { receiver, .. }
            | ControlMessage::Symbol { receiver, .. } => receiver,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            ControlMessage::Bang { .. } => MessageKind::Bang,
            ControlMessage::Float { .. } => MessageKind::Float,
            ControlMessage::Symbol { .. } => MessageKind::Symbol,
        }
    }

    /// Build a message from dynamic atoms
    ///
    /// `atoms[0]` is the receiver and must be a non-empty symbol. Bang takes
    /// nothing else, Float exactly one float, Symbol exactly one symbol.
    pub fn from_atoms(kind: MessageKind, atoms: &[Atom]) -> Result<Self, ArgumentError> {
        let (receiver, rest) = match atoms.split_first() {
            Some((Atom::Symbol(receiver), rest)) => (receiver, rest),
            Some((Atom::Float(_), _)) => return Err(ArgumentError::ReceiverNotSymbol),
            None => return Err(ArgumentError::MissingReceiver),
        };
        if receiver.is_empty() {
            return Err(ArgumentError::EmptyReceiver);
        }
        let receiver = receiver.clone();

        match (kind, rest) {
            (MessageKind::Bang, []) => Ok(ControlMessage::Bang { receiver }),
            (MessageKind::Float, [Atom::Float(value)]) => Ok(ControlMessage::Float {
                receiver,
                value: *value as f32,
            }),
            (MessageKind::Symbol, [Atom::Symbol(text)]) => {
                Ok(ControlMessage::Symbol { receiver, text: text.clone() })
            }
            (MessageKind::Bang, _) => Err(ArgumentError::Arity {
                kind,
                expected: 0,
                actual: rest.len(),
            }),
            (MessageKind::Float | MessageKind::Symbol, [_]) => {
                Err(ArgumentError::WrongType { kind })
            }
            (MessageKind::Float | MessageKind::Symbol, _) => Err(ArgumentError::Arity {
                kind,
                expected: 1,
                actual: rest.len(),
            }),
        }
    }
}

/// Message selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Bang,
    Float,
    Symbol,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageKind::Bang => "bang",
            MessageKind::Float => "float",
            MessageKind::Symbol => "symbol",
        };
        f.write_str(name)
    }
}

/// An untyped message argument
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Float(f64),
    Symbol(String),
}

impl Atom {
    /// Parse a word: finite numbers become floats, everything else a symbol
    pub fn parse(word: &str) -> Self {
        match word.parse::<f64>() {
            Ok(value) if value.is_finite() => Atom::Float(value),
            _ => Atom::Symbol(word.to_string()),
        }
    }
}

impl From<&str> for Atom {
    fn from(text: &str) -> Self {
        Atom::Symbol(text.to_string())
    }
}

impl From<f64> for Atom {
    fn from(value: f64) -> Self {
        Atom::Float(value)
    }
}

/// Why a set of message arguments was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    MissingReceiver,
    ReceiverNotSymbol,
    EmptyReceiver,
    Arity {
        kind: MessageKind,
        expected: usize,
        actual: usize,
    },
    WrongType { kind: MessageKind },
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentError::MissingReceiver => write!(f, "receiver name string required"),
            ArgumentError::ReceiverNotSymbol => write!(f, "receiver must be a string"),
            ArgumentError::EmptyReceiver => write!(f, "receiver name must not be empty"),
            ArgumentError::Arity {
                kind,
                expected,
                actual,
            } => write!(
                f,
                "{} takes {} argument(s) after the receiver, got {}",
                kind, expected, actual
            ),
            ArgumentError::WrongType { kind: MessageKind::Float } => {
                write!(f, "(receiver: string, value: number)")
            }
            ArgumentError::WrongType { kind } => {
                write!(f, "(receiver: string, {}: string)", kind)
            }
        }
    }
}

/// A patch location split into directory and file name
///
/// Splits on the last `/` or `\`; the directory keeps its trailing
/// separator so that `directory + file_name` is the original path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPath {
    pub directory: String,
    pub file_name: String,
}

impl PatchPath {
    pub fn split(path: &str) -> Self {
        match path.rfind(['/', '\\']) {
            Some(idx) => Self {
                directory: path[..=idx].to_string(),
                file_name: path[idx + 1..].to_string(),
            },
            None => Self {
                directory: String::new(),
                file_name: path.to_string(),
            },
        }
    }

    /// The full path as given by the caller
    pub fn full_path(&self) -> PathBuf {
        PathBuf::from(format!("{}{}", self.directory, self.file_name))
    }
}

impl fmt::Display for PatchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.directory, self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_unix_path() {
        let patch = PatchPath::split("/a/b/c.pd");
        assert_eq!(patch.directory, "/a/b/");
        assert_eq!(patch.file_name, "c.pd");
        assert_eq!(patch.full_path(), PathBuf::from("/a/b/c.pd"));
    }

    #[test]
    fn test_split_bare_file_name() {
        let patch = PatchPath::split("c.pd");
        assert_eq!(patch.directory, "");
        assert_eq!(patch.file_name, "c.pd");
    }

    #[test]
    fn test_split_uses_last_separator_of_either_kind() {
        let patch = PatchPath::split("C:\\patches\\synth\\main.pd");
        assert_eq!(patch.directory, "C:\\patches\\synth\\");
        assert_eq!(patch.file_name, "main.pd");

        let patch = PatchPath::split("C:\\patches/mixed\\main.pd");
        assert_eq!(patch.directory, "C:\\patches/mixed\\");
        assert_eq!(patch.file_name, "main.pd");
    }

    #[test]
    fn test_atom_parse() {
        assert_eq!(Atom::parse("440"), Atom::Float(440.0));
        assert_eq!(Atom::parse("-0.5"), Atom::Float(-0.5));
        assert_eq!(Atom::parse("saw"), Atom::Symbol("saw".to_string()));
        assert_eq!(Atom::parse("NaN"), Atom::Symbol("NaN".to_string()));
        assert_eq!(Atom::parse("inf"), Atom::Symbol("inf".to_string()));
    }

    #[test]
    fn test_from_atoms_accepts_well_formed_messages() {
        let bang = ControlMessage::from_atoms(MessageKind::Bang, &["play".into()]).unwrap();
        assert_eq!(bang, ControlMessage::Bang { receiver: "play".to_string() });

        let float =
            ControlMessage::from_atoms(MessageKind::Float, &["freq".into(), 220.0.into()]).unwrap();
        assert_eq!(
            float,
            ControlMessage::Float {
                receiver: "freq".to_string(),
                value: 220.0
            }
        );

        let symbol =
            ControlMessage::from_atoms(MessageKind::Symbol, &["wave".into(), "saw".into()]).unwrap();
        assert_eq!(symbol.receiver(), "wave");
        assert_eq!(symbol.kind(), MessageKind::Symbol);
    }

    #[test]
    fn test_from_atoms_rejects_malformed_messages() {
        assert_eq!(
            ControlMessage::from_atoms(MessageKind::Float, &["recv".into(), "not-a-number".into()]),
            Err(ArgumentError::WrongType { kind: MessageKind::Float })
        );
        assert_eq!(
            ControlMessage::from_atoms(MessageKind::Float, &["".into(), 1.0.into()]),
            Err(ArgumentError::EmptyReceiver)
        );
        assert_eq!(
            ControlMessage::from_atoms(MessageKind::Bang, &[]),
            Err(ArgumentError::MissingReceiver)
        );
        assert_eq!(
            ControlMessage::from_atoms(MessageKind::Bang, &[1.0.into()]),
            Err(ArgumentError::ReceiverNotSymbol)
        );
        assert_eq!(
            ControlMessage::from_atoms(MessageKind::Symbol, &["recv".into(), 3.0.into()]),
            Err(ArgumentError::WrongType { kind: MessageKind::Symbol })
        );
        assert!(matches!(
            ControlMessage::from_atoms(MessageKind::Float, &["recv".into()]),
            Err(ArgumentError::Arity { expected: 1, actual: 0, .. })
        ));
        assert!(matches!(
            ControlMessage::from_atoms(MessageKind::Bang, &["recv".into(), "extra".into()]),
            Err(ArgumentError::Arity { expected: 0, actual: 1, .. })
        ));
    }
}
