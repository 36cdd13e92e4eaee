//! Wire command set
//!
//! Every TCP exchange opens with one newline-terminated ASCII command line.
//! The set is closed: dispatch goes through this enum, and a line that does
//! not parse closes the connection.

/// The recognized command lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Handshake opener from the initiating side.
    SyncRequest,
    /// Handshake return channel from the responding side.
    SyncAnswer,
    ListDirectories,
    /// Takes an identity argument line.
    ListDirectoriesId,
    /// Takes an `id/dir` argument line.
    ListDirectory,
    ListKnownIds,
    ListConnectedIds,
    /// Takes a substring argument line.
    Search,
    SearchDirectory,
    SearchFile,
    /// Takes an `id/dir/filename` argument line.
    OpenFile,
}

impl Command {
    /// Parse one trimmed command line.
    pub fn parse(line: &str) -> Option<Self> {
        match line {
            "General TCP" => Some(Self::SyncRequest),
            "General ANSWER" => Some(Self::SyncAnswer),
            "List Directories" => Some(Self::ListDirectories),
            "List Directories ID" => Some(Self::ListDirectoriesId),
            "List Directory" => Some(Self::ListDirectory),
            "List Known IDs" => Some(Self::ListKnownIds),
            "List Connected IDs" => Some(Self::ListConnectedIds),
            "Search" => Some(Self::Search),
            "Search Directory" => Some(Self::SearchDirectory),
            "Search File" => Some(Self::SearchFile),
            "Open File" => Some(Self::OpenFile),
            _ => None,
        }
    }

    /// The exact line written on the wire (without the newline).
    pub fn line(&self) -> &'static str {
        match self {
            Self::SyncRequest => "General TCP",
            Self::SyncAnswer => "General ANSWER",
            Self::ListDirectories => "List Directories",
            Self::ListDirectoriesId => "List Directories ID",
            Self::ListDirectory => "List Directory",
            Self::ListKnownIds => "List Known IDs",
            Self::ListConnectedIds => "List Connected IDs",
            Self::Search => "Search",
            Self::SearchDirectory => "Search Directory",
            Self::SearchFile => "Search File",
            Self::OpenFile => "Open File",
        }
    }

    /// Whether a newline-terminated argument line follows the command.
    pub fn takes_argument(&self) -> bool {
        matches!(
            self,
            Self::ListDirectoriesId
                | Self::ListDirectory
                | Self::Search
                | Self::SearchDirectory
                | Self::SearchFile
                | Self::OpenFile
        )
    }
}
