//! Editor commands and their text form.
//!
//! Every input the engine reacts to is one [`EditorCommand`], dispatched
//! through `EditingSession::dispatch`. The text form is what the `yolabel`
//! binary reads from a script or stdin.

use std::collections::BTreeSet;
use std::str::FromStr;

use thiserror::Error;

use crate::model::{LabelId, Point};

/// Commands accepted by an editing session.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    // Drawing and selection
    /// Draw a rectangle between two display-space corners
    Draw { start: Point, end: Point },
    /// Select by dragging in display space and delete the selection.
    /// `extend` switches from contained to overlapping selection.
    SelectDrag { start: Point, end: Point, extend: bool },
    /// Delete every rectangle on the current image (undoable)
    ClearAnnotations,

    // History
    Undo,
    Redo,

    // Navigation
    NextImage,
    PrevImage,
    GoToImage(usize),
    /// Save the current image
    Save,
    /// Save the current image, then advance
    SaveAndNext,

    // Viewport
    ZoomIn,
    ZoomOut,
    SetZoom(f64),

    // Labels
    SelectLabel(LabelId),
    /// Select the n-th label in registry order
    SelectLabelByIndex(usize),
    /// Define a label with the next unused id
    CreateLabel { name: String },
    /// Define a label with id `index`, only if `index` equals the label count
    CreateLabelAtIndex { index: usize, name: String },
    DeleteActiveLabel,

    // Detection
    SetConfidence(f32),
    SetAcceptedClasses(BTreeSet<LabelId>),
    RunDetection,
}

/// Errors from parsing a text command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}'")]
    Unknown(String),

    /// Too few arguments
    #[error("'{command}' expects {expected}")]
    MissingArgument {
        command: String,
        expected: &'static str,
    },

    #[error("'{command}': invalid number '{value}'")]
    InvalidNumber { command: String, value: String },
}

/// Cursor over the arguments of one command line.
struct Args<'a> {
    command: &'a str,
    rest: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn next_str(&mut self, expected: &'static str) -> Result<&'a str, CommandParseError> {
        self.rest.next().ok_or_else(|| CommandParseError::MissingArgument {
            command: self.command.to_string(),
            expected,
        })
    }

    fn next_num<T: FromStr>(&mut self, expected: &'static str) -> Result<T, CommandParseError> {
        let value = self.next_str(expected)?;
        value.parse().map_err(|_| CommandParseError::InvalidNumber {
            command: self.command.to_string(),
            value: value.to_string(),
        })
    }

    fn next_point(&mut self) -> Result<Point, CommandParseError> {
        Ok(Point::new(self.next_num("x y")?, self.next_num("x y")?))
    }

    fn remainder(self) -> String {
        self.rest.collect::<Vec<_>>().join(" ")
    }
}

impl FromStr for EditorCommand {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(CommandParseError::Empty)?;
        let mut args = Args { command, rest: words };

        let parsed = match command {
            "draw" => EditorCommand::Draw {
                start: args.next_point()?,
                end: args.next_point()?,
            },
            "erase" => EditorCommand::SelectDrag {
                start: args.next_point()?,
                end: args.next_point()?,
                extend: args.rest.next() == Some("extend"),
            },
            "click" => {
                let p = args.next_point()?;
                EditorCommand::SelectDrag {
                    start: p,
                    end: p,
                    extend: false,
                }
            }
            "clear" => EditorCommand::ClearAnnotations,
            "undo" => EditorCommand::Undo,
            "redo" => EditorCommand::Redo,
            "next" => EditorCommand::NextImage,
            "prev" => EditorCommand::PrevImage,
            "goto" => EditorCommand::GoToImage(args.next_num("an image index")?),
            "save" => EditorCommand::Save,
            "savenext" => EditorCommand::SaveAndNext,
            "zoom" => match args.next_str("in, out or a factor")? {
                "in" => EditorCommand::ZoomIn,
                "out" => EditorCommand::ZoomOut,
                value => EditorCommand::SetZoom(value.parse().map_err(|_| {
                    CommandParseError::InvalidNumber {
                        command: command.to_string(),
                        value: value.to_string(),
                    }
                })?),
            },
            "label" => EditorCommand::SelectLabelByIndex(args.next_num("a label index")?),
            "labelid" => EditorCommand::SelectLabel(args.next_num("a label id")?),
            "newlabel" => {
                let name = args.remainder();
                if name.is_empty() {
                    return Err(CommandParseError::MissingArgument {
                        command: command.to_string(),
                        expected: "a label name",
                    });
                }
                EditorCommand::CreateLabel { name }
            }
            "addlabel" => {
                let index = args.next_num("an index and a name")?;
                let name = args.remainder();
                if name.is_empty() {
                    return Err(CommandParseError::MissingArgument {
                        command: command.to_string(),
                        expected: "an index and a name",
                    });
                }
                EditorCommand::CreateLabelAtIndex { index, name }
            }
            "dellabel" => EditorCommand::DeleteActiveLabel,
            "detect" => EditorCommand::RunDetection,
            "conf" => EditorCommand::SetConfidence(args.next_num("a threshold")?),
            "classes" => {
                let mut classes: BTreeSet<LabelId> = BTreeSet::new();
                for value in args.rest.by_ref().flat_map(|w| w.split(',')).filter(|w| !w.is_empty()) {
                    classes.insert(value.parse().map_err(|_| CommandParseError::InvalidNumber {
                        command: command.to_string(),
                        value: value.to_string(),
                    })?);
                }
                EditorCommand::SetAcceptedClasses(classes)
            }
            other => return Err(CommandParseError::Unknown(other.to_string())),
        };
        Ok(parsed)
    }
}
