//! Scans assistant output for fenced code blocks annotated with a file path
//! on the opening fence line and writes them to disk.
//!
//! Recognized form: ` ```lang path/to/file.ext ` followed by the block body
//! up to the closing ` ``` `.

use std::fs;
use std::path::Path;

use hostwatch_logring::LogRing;

pub fn save_fenced_files(content: &str, ring: &LogRing) {
    let lines: Vec<&str> = content.lines().collect();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if let Some(rest) = line.strip_prefix("```") {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            if parts.len() >= 2 {
                let path = parts[1];
                if looks_like_path(path) {
                    let mut body = String::new();
                    let mut j = i + 1;
                    while j < lines.len() && lines[j] != "```" {
                        body.push_str(lines[j]);
                        body.push('\n');
                        j += 1;
                    }
                    if j < lines.len() {
                        write_file(path, &body, ring);
                        i = j;
                    }
                }
            }
        }
        i += 1;
    }
}

fn looks_like_path(candidate: &str) -> bool {
    candidate.contains('/') || candidate.contains('.')
}

fn write_file(path: &str, body: &str, ring: &LogRing) {
    let target = Path::new(path);
    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            let _ = fs::create_dir_all(parent);
        }
    }
    match fs::write(target, body) {
        Ok(()) => ring.append(format!("chat: saved file {path}")),
        Err(err) => ring.append(format!("chat: failed to save file {path}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> LogRing {
        let dir = tempfile::tempdir().unwrap();
        LogRing::new(dir.into_path(), "test.log")
    }

    #[test]
    fn saves_annotated_fenced_block() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.txt");
        let content = format!("here you go:\n```text {}\nhello world\n```\ndone", target.display());

        let ring = ring();
        save_fenced_files(&content, &ring);

        assert_eq!(fs::read_to_string(&target).unwrap(), "hello world\n");
        assert!(ring.snapshot().iter().any(|e| e.text.contains("saved file")));
    }

    #[test]
    fn ignores_unannotated_fenced_block() {
        let content = "```rust\nfn main() {}\n```";
        let ring = ring();
        save_fenced_files(content, &ring);
        assert!(ring.is_empty());
    }
}
