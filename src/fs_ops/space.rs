use anyhow::anyhow;
use std::path::Path;

use crate::platform::free_space_bytes;

/// Slack kept free on top of the tree size.
const CUSHION: u64 = 16 * 1024 * 1024;

pub fn format_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let f = n as f64;
    if f >= GB {
        format!("{:.1} GiB", f / GB)
    } else if f >= MB {
        format!("{:.1} MiB", f / MB)
    } else if f >= KB {
        format!("{:.1} KiB", f / KB)
    } else {
        format!("{n} B")
    }
}

/// Fail when `dir`'s filesystem cannot hold `required` more bytes.
/// A failed free-space query is not treated as a shortage.
pub(crate) fn ensure_space_for_copy(dir: &Path, required: u64) -> anyhow::Result<()> {
    let Ok(free) = free_space_bytes(dir) else {
        return Ok(());
    };
    if free < required.saturating_add(CUSHION) {
        return Err(anyhow!(
            "not enough free space in '{}': need ~{}, free {}",
            dir.display(),
            format_bytes(required),
            format_bytes(free)
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }

    #[test]
    fn absurd_requirement_is_refused() {
        let td = tempfile::tempdir().unwrap();
        let err = ensure_space_for_copy(td.path(), u64::MAX - 1).unwrap_err();
        assert!(err.to_string().contains("not enough free space"));
    }
}
