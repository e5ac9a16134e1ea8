use blobscope_core::{CacheLayout, OpenCacheRequest, ParseViewerKindError, ViewerKind};
use thiserror::Error;

/// One line of shell input, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(OpenCacheRequest),
    /// Filter text is kept verbatim after the command word.
    Filter(String),
    Select(Option<String>),
    Viewer(ViewerKind),
    Keys,
    Refresh,
    Recent,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command '{0}' (type 'help' for a list)")]
    Unknown(String),

    #[error("'{command}' needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error(transparent)]
    Viewer(#[from] ParseViewerKindError),
}

/// Parse a shell line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_start();
    if trimmed.trim().is_empty() {
        return Ok(None);
    }

    let (word, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest),
        None => (trimmed, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "open" | "o" => Command::Open(parse_open(rest)?),
        "filter" | "f" => Command::Filter(rest.to_string()),
        "select" | "s" => {
            let key = rest.trim();
            Command::Select((!key.is_empty()).then(|| key.to_string()))
        }
        "viewer" | "v" => {
            if rest.trim().is_empty() {
                return Err(CommandError::MissingArgument {
                    command: "viewer",
                    what: "one of text, json or image",
                });
            }
            Command::Viewer(rest.parse()?)
        }
        "keys" | "ls" => Command::Keys,
        "refresh" | "r" => Command::Refresh,
        "recent" => Command::Recent,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

/// The path is everything after `open`, trimmed, minus one trailing
/// `--dir`/`-d` flag. Inner whitespace is kept as typed.
fn parse_open(rest: &str) -> Result<OpenCacheRequest, CommandError> {
    let mut path = rest.trim();
    let mut layout = CacheLayout::DatabaseFile;

    for flag in ["--dir", "-d"] {
        if let Some(stripped) = path.strip_suffix(flag)
            && stripped.ends_with(char::is_whitespace)
        {
            path = stripped.trim_end();
            layout = CacheLayout::Directory;
            break;
        }
    }

    if path.is_empty() {
        return Err(CommandError::MissingArgument {
            command: "open",
            what: "a cache path",
        });
    }

    Ok(OpenCacheRequest::new(path).with_layout(layout))
}

pub const HELP: &str = "\
Commands:
  open <path> [--dir]       open a cache database (or a cache directory)
  filter [text]             show only keys equal to text, ignoring case
  select [key]              show the value of key (no key clears)
  viewer <text|json|image>  change how the value is decoded
  keys                      list the filtered keys
  refresh                   reload keys and the selected value
  recent                    list recently opened caches
  status                    show the current cache, selection and tasks
  help                      show this help
  quit                      leave";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_command(""), Ok(None));
        assert_eq!(parse_command("   \n"), Ok(None));
    }

    #[test]
    fn filter_keeps_text_verbatim() {
        assert_eq!(
            parse_command("filter Alpha"),
            Ok(Some(Command::Filter("Alpha".to_string())))
        );
        assert_eq!(
            parse_command("filter  two words "),
            Ok(Some(Command::Filter(" two words ".to_string())))
        );
        assert_eq!(
            parse_command("filter"),
            Ok(Some(Command::Filter(String::new())))
        );
    }

    #[test]
    fn select_without_key_clears_selection() {
        assert_eq!(parse_command("select"), Ok(Some(Command::Select(None))));
        assert_eq!(
            parse_command("s user:42"),
            Ok(Some(Command::Select(Some("user:42".to_string()))))
        );
    }

    #[test]
    fn viewer_is_parsed_at_the_boundary() {
        assert_eq!(
            parse_command("viewer JSON"),
            Ok(Some(Command::Viewer(ViewerKind::Json)))
        );
        assert!(matches!(
            parse_command("viewer hex"),
            Err(CommandError::Viewer(_))
        ));
        assert!(matches!(
            parse_command("viewer"),
            Err(CommandError::MissingArgument { command: "viewer", .. })
        ));
    }

    #[test]
    fn open_accepts_directory_flag() {
        assert_eq!(
            parse_command("open /tmp/cache --dir"),
            Ok(Some(Command::Open(
                OpenCacheRequest::new("/tmp/cache").with_layout(CacheLayout::Directory)
            )))
        );
        assert_eq!(
            parse_command("open /tmp/blobs.db"),
            Ok(Some(Command::Open(OpenCacheRequest::new("/tmp/blobs.db"))))
        );
        assert!(matches!(
            parse_command("open   "),
            Err(CommandError::MissingArgument { command: "open", .. })
        ));
    }

    #[test]
    fn open_keeps_path_whitespace_and_flag_like_names() {
        assert_eq!(
            parse_command("open  /tmp/my  cache\tdir  "),
            Ok(Some(Command::Open(OpenCacheRequest::new("/tmp/my  cache\tdir"))))
        );
        assert_eq!(
            parse_command("open -d"),
            Ok(Some(Command::Open(OpenCacheRequest::new("-d"))))
        );
        assert_eq!(
            parse_command("open -d -d"),
            Ok(Some(Command::Open(
                OpenCacheRequest::new("-d").with_layout(CacheLayout::Directory)
            )))
        );
        assert_eq!(
            parse_command("open /tmp/dir--dir"),
            Ok(Some(Command::Open(OpenCacheRequest::new("/tmp/dir--dir"))))
        );
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert_eq!(
            parse_command("frobnicate"),
            Err(CommandError::Unknown("frobnicate".to_string()))
        );
    }
}
