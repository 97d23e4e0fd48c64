use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Removes any line-leading occurrence of `<prefix>/` from the text at `path`, rewriting the file
/// atomically (§4.H). Used for tools that embed the sandbox's input directory in generated text
/// output. A no-op (and not an error) if `path` isn't valid UTF-8 text, since binary outputs must
/// not be edited.
pub fn strip_line_prefix(path: &Path, prefix: &str) -> io::Result<()> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::InvalidData => return Ok(()),
        Err(e) => return Err(e),
    };

    let needle = format!("{}/", prefix);
    let mut rewritten = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        match line.strip_prefix(needle.as_str()) {
            Some(rest) => rewritten.push_str(rest),
            None => rewritten.push_str(line),
        }
    }
    if rewritten == content {
        return Ok(());
    }

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(rewritten.as_bytes())?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Applies [`strip_line_prefix`] to every named output under `outputs_dir`.
pub fn scrub_outputs(outputs_dir: &Path, boxed_names: &[&Path], prefix: &str) -> io::Result<()> {
    for name in boxed_names {
        strip_line_prefix(&outputs_dir.join(name), prefix)?;
    }
    Ok(())
}
