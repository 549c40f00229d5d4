use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::ConvertOptions;
use crate::error::{ConvertError, Result};
use crate::model::Conversation;
use crate::render::render_document;

const OUTPUT_SUFFIX: &str = "_chat.html";

pub fn convert(input: &Path, output: Option<&Path>, options: &ConvertOptions) -> Result<PathBuf> {
    let conversation = load_conversation(input)?;
    let html = render_document(&conversation, options);

    let output = output.map_or_else(|| default_output_path(input), Path::to_path_buf);
    write_document(&output, &html)?;

    debug!(input = %input.display(), output = %output.display(), "wrote chat page");
    Ok(output)
}

pub fn default_output_path(input: &Path) -> PathBuf {
    let mut name = OsString::from(input.with_extension(""));
    name.push(OUTPUT_SUFFIX);
    PathBuf::from(name)
}

pub fn load_conversation(path: &Path) -> Result<Conversation> {
    let bytes = fs::read(path).map_err(|source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let raw = String::from_utf8(bytes).map_err(|_| ConvertError::NonUtf8Input {
        path: path.to_path_buf(),
    })?;

    let conversation =
        serde_json::from_str::<Conversation>(&raw).map_err(|source| ConvertError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(
        path = %path.display(),
        messages = conversation.messages().len(),
        "loaded conversation"
    );
    Ok(conversation)
}

fn write_document(path: &Path, html: &str) -> Result<()> {
    fs::write(path, html).map_err(|source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    })
}
