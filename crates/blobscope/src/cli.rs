use blobscope_core::{CacheLayout, OpenCacheRequest};

pub const USAGE: &str = "Usage: blobscope [PATH] [--dir]

Browse the keys and values of a read-only blob cache.

  PATH    cache database file to open at startup
  --dir   treat PATH as a cache directory holding blobs.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    Browse(Option<OpenCacheRequest>),
    Help,
}

pub fn parse_args(args: &[String]) -> Result<Launch, String> {
    let mut path = None;
    let mut layout = CacheLayout::DatabaseFile;

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Launch::Help),
            "-d" | "--dir" => layout = CacheLayout::Directory,
            flag if flag.starts_with('-') => return Err(format!("Unknown option '{}'", flag)),
            value => {
                if path.replace(value.to_string()).is_some() {
                    return Err("Only one cache path may be given".to_string());
                }
            }
        }
    }

    Ok(Launch::Browse(
        path.map(|path| OpenCacheRequest::new(path).with_layout(layout)),
    ))
}
