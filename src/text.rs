//! Source positions and intervals.
//!
//! Every token (and, further down the pipeline, every syntax node) is
//! attributed to a byte range of one source file.
//! Lines and columns are 0-based internally; `Display` renders them 1-based,
//! which is what a user expects to see in a message.

/// A cursor into a source file.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextPosition {
    pub file_id: u32,
    /// Byte offset of the first byte of the current line.
    pub offset_to_line: u32,
    pub line: u32,
    /// Byte column within the line. Tabs count as a single column.
    pub column: u32,
}

impl TextPosition {
    /// The position of the first byte of the given file.
    pub const fn start_of(file_id: u32) -> Self {
        TextPosition {
            file_id,
            offset_to_line: 0,
            line: 0,
            column: 0,
        }
    }

    /// Absolute byte offset from the start of the file.
    pub const fn offset(&self) -> u32 {
        self.offset_to_line + self.column
    }
}

impl std::fmt::Display for TextPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file_id, self.line + 1, self.column + 1)
    }
}

/// A byte range of a source file: a starting position plus a length.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextInterval {
    pub position: TextPosition,
    pub size: u32,
}

impl TextInterval {
    pub const fn new(position: TextPosition, size: u32) -> Self {
        TextInterval { position, size }
    }

    /// Absolute offset one past the last byte of the interval.
    pub const fn end_offset(&self) -> u32 {
        self.position.offset() + self.size
    }

    /// The smallest interval covering both inputs.
    ///
    /// Both intervals must come from the same file.
    pub fn merge(i0: TextInterval, i1: TextInterval) -> TextInterval {
        assert_eq!(
            i0.position.file_id, i1.position.file_id,
            "cannot merge intervals from different files"
        );

        let p0 = i0.position;
        let p1 = i1.position;
        let start = if (p0.line, p0.column) <= (p1.line, p1.column) {
            p0
        } else {
            p1
        };
        let end = i0.end_offset().max(i1.end_offset());

        TextInterval {
            position: start,
            size: end - start.offset(),
        }
    }

    /// The interval spanning two positions, given in either order.
    pub fn from_end_points(p0: TextPosition, p1: TextPosition) -> TextInterval {
        assert_eq!(
            p0.file_id, p1.file_id,
            "cannot span positions from different files"
        );

        let (start, end) = if p0.offset() <= p1.offset() {
            (p0, p1)
        } else {
            (p1, p0)
        };
        TextInterval {
            position: start,
            size: end.offset() - start.offset(),
        }
    }
}

impl std::fmt::Display for TextInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (+{})", self.position, self.size)
    }
}
